//! Bundled MCP tools.
//!
//! - `calculator` - Basic arithmetic
//! - `weather` - Mock weather conditions
//! - `file_operation` - File access confined to the data directory

pub mod calculator;
pub mod file_operation;
pub mod weather;

use crate::config::Config;
use crate::mcp::registry::ToolRegistry;

pub use calculator::CalculatorTool;
pub use file_operation::FileOperationTool;
pub use weather::WeatherTool;

/// Register all bundled tools.
pub fn register_all_tools(registry: &ToolRegistry, config: &Config) {
    registry.register_tool(CalculatorTool::new());
    registry.register_tool(WeatherTool::new());
    registry.register_tool(FileOperationTool::new(config.data_dir.clone()));
}
