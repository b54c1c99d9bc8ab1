//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `protocol` - JSON-RPC envelope, error codes and MCP payload types
//! - `handler` - Provider traits for tools, resources and prompts
//! - `registry` - Name-keyed provider registries
//! - `server` - Dispatch engine shared by every transport
//! - `transport` - Newline-delimited duplex transport (stdio)

pub mod handler;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use handler::{PromptProvider, ResourceProvider, ToolHandler};
pub use protocol::*;
pub use registry::{PromptRegistry, ResourceRegistry, ToolRegistry};
pub use server::McpServer;
pub use transport::{StdioTransport, StreamTransport, Transport};
