//! Bundled MCP resource providers.

pub mod config;
pub mod file;

use std::sync::Arc;

use crate::config::Config;
use crate::mcp::registry::ResourceRegistry;

pub use config::ConfigResourceProvider;
pub use file::FileResourceProvider;

/// Register all bundled resource providers.
pub fn register_all_resources(registry: &ResourceRegistry, config: &Arc<Config>) {
    registry.register("config", Arc::new(ConfigResourceProvider::new(config.clone())));
    registry.register("file", Arc::new(FileResourceProvider::new(config.data_dir.clone())));
}
