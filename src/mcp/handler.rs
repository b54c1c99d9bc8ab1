//! Collaborator contracts for tools, resource providers and prompt providers.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::mcp::protocol::{
    Arguments, ContentBlock, GetPromptResult, Prompt, Resource, ResourceContents, Tool,
};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Registry key. Tools are keyed by their own declared name.
    fn name(&self) -> String {
        self.definition().name
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Arguments) -> Result<Vec<ContentBlock>>;
}

/// A source of URI-addressable resources.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Descriptors of every resource this provider exposes.
    fn list(&self) -> Vec<Resource>;

    /// Whether `uri` belongs to this provider.
    fn can_handle(&self, uri: &str) -> bool;

    /// Read the contents behind `uri`.
    async fn read(&self, uri: &str) -> Result<Vec<ResourceContents>>;
}

/// A source of named prompt templates.
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// Descriptors of every prompt this provider serves.
    fn list(&self) -> Vec<Prompt>;

    /// Whether this provider serves the prompt called `name`.
    fn has(&self, name: &str) -> bool {
        self.list().iter().any(|p| p.name == name)
    }

    /// Render the prompt called `name` with `arguments`.
    async fn get(&self, name: &str, arguments: &Arguments) -> Result<GetPromptResult>;
}

/// Helper macro for creating tool input schemas.
#[macro_export]
macro_rules! tool_schema {
    (required: [$($req:expr),* $(,)?], $($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            },
            "required": [$($req),*]
        })
    };
    ($($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            }
        })
    };
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to render a serializable value as a pretty-printed text block.
pub fn json_content<T: Serialize>(value: &T) -> Result<ContentBlock> {
    Ok(text_content(serde_json::to_string_pretty(value)?))
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &Arguments, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| {
            Error::InvalidToolArguments(format!("Required parameter '{}' is missing", name))
        })
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &Arguments, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract a required numeric argument.
pub fn get_number_arg(args: &Arguments, name: &str) -> Result<f64> {
    match args.get(name) {
        None | Some(Value::Null) => Err(Error::InvalidToolArguments(format!(
            "Required parameter '{}' is missing",
            name
        ))),
        Some(v) => v.as_f64().ok_or_else(|| {
            Error::InvalidToolArguments(format!("Parameter '{}' must be a number", name))
        }),
    }
}

/// Helper to extract a boolean argument with a default.
pub fn get_bool_arg(args: &Arguments, name: &str, default: bool) -> bool {
    args.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
}

/// Helper to extract a string array argument.
pub fn get_string_array_arg(args: &Arguments, name: &str) -> Vec<String> {
    args.get(name)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
