//! Bundled MCP prompt providers.

pub mod template;

use std::sync::Arc;

use crate::mcp::registry::PromptRegistry;

pub use template::TemplatePromptProvider;

/// Register all bundled prompt providers.
pub fn register_all_prompts(registry: &PromptRegistry) {
    registry.register("template", Arc::new(TemplatePromptProvider::new()));
}
