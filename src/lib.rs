//! MCP Hub - a Model Context Protocol server with pluggable providers.
//!
//! One dispatch engine serves three transport bindings: newline-delimited
//! JSON over stdio, a synchronous HTTP endpoint, and a Server-Sent Events
//! stream with per-connection delivery, broadcast and heartbeats.
//!
//! # Architecture
//!
//! 1. **Protocol** (`mcp::protocol`) - JSON-RPC envelope and MCP payloads
//! 2. **Registries** (`mcp::registry`) - Tools, resource and prompt providers
//! 3. **Dispatch** (`mcp::server`) - Method table, error mapping, session state
//! 4. **Transports** (`mcp::transport`, `http`) - stdio, HTTP and SSE bindings
//! 5. **Plugins** (`tools`, `resources`, `prompts`) - Bundled providers

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod metrics;
pub mod prompts;
pub mod resources;
pub mod tools;

use std::sync::Arc;

pub use error::{Error, Result};

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a server with every bundled provider registered.
pub fn build_server(config: &Arc<config::Config>) -> mcp::McpServer {
    let server = mcp::McpServer::new(config);
    tools::register_all_tools(server.tools(), config);
    resources::register_all_resources(server.resources(), config);
    prompts::register_all_prompts(server.prompts());
    server
}
