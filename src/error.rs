//! Error types for the MCP hub.

use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::protocol::{error_codes, JsonRpcError};

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the hub.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Protocol Errors =====
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Capability not supported: {0}")]
    CapabilityNotSupported(String),

    // ===== Provider Errors =====
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource read failed: {0}")]
    ResourceReadFailed(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Prompt generation failed: {0}")]
    PromptGenerationFailed(String),

    // ===== Service Errors =====
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File too large: {path} ({size} bytes)")]
    FileTooLarge { path: String, size: u64 },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Transport Errors =====
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP server error: {0}")]
    HttpServer(String),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Protocol error code this error is reported with.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) | Self::ToolNotFound(_) | Self::PromptNotFound(_) => {
                error_codes::METHOD_NOT_FOUND
            }
            Self::InvalidParams(_)
            | Self::InvalidToolArguments(_)
            | Self::InvalidPath(_)
            | Self::FileTooLarge { .. } => error_codes::INVALID_PARAMS,
            Self::CapabilityNotSupported(_) => error_codes::CAPABILITY_NOT_SUPPORTED,
            Self::ToolExecutionFailed(_) => error_codes::TOOL_EXECUTION_FAILED,
            Self::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            Self::PromptGenerationFailed(_) => error_codes::PROMPT_GENERATION_FAILED,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Structured detail naming the offending method, tool, prompt or uri.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::MethodNotFound(method) => Some(json!({ "method": method })),
            Self::ToolNotFound(name) => Some(json!({ "tool": name })),
            Self::PromptNotFound(name) => Some(json!({ "prompt": name })),
            Self::ResourceNotFound(uri) => Some(json!({ "uri": uri })),
            Self::CapabilityNotSupported(capability) => {
                Some(json!({ "capability": capability }))
            }
            _ => None,
        }
    }

    /// Convert into the wire error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string(), self.data())
    }

    /// Whether the failure came from the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code(),
            error_codes::PARSE_ERROR
                | error_codes::INVALID_REQUEST
                | error_codes::METHOD_NOT_FOUND
                | error_codes::INVALID_PARAMS
        )
    }
}

impl From<&Error> for JsonRpcError {
    fn from(err: &Error) -> Self {
        err.to_rpc_error()
    }
}

impl From<Error> for JsonRpcError {
    fn from(err: Error) -> Self {
        err.to_rpc_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ToolNotFound("unknown_tool".to_string());
        assert_eq!(err.to_string(), "Tool not found: unknown_tool");

        let err = Error::InvalidParams("Missing tool name".to_string());
        assert_eq!(err.to_string(), "Invalid params: Missing tool name");

        let err = Error::FileTooLarge {
            path: "big.bin".to_string(),
            size: 2_000_000,
        };
        assert!(err.to_string().contains("2000000 bytes"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Parse("x".into()).code(), -32700);
        assert_eq!(Error::InvalidRequest("x".into()).code(), -32600);
        assert_eq!(Error::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(Error::ToolNotFound("x".into()).code(), -32601);
        assert_eq!(Error::PromptNotFound("x".into()).code(), -32601);
        assert_eq!(Error::InvalidToolArguments("x".into()).code(), -32602);
        assert_eq!(Error::Internal("x".into()).code(), -32603);
        assert_eq!(Error::ResourceReadFailed("x".into()).code(), -32603);
        assert_eq!(
            Error::ToolExecutionFailed("x".into()).code(),
            error_codes::TOOL_EXECUTION_FAILED
        );
        assert_eq!(
            Error::ResourceNotFound("x".into()).code(),
            error_codes::RESOURCE_NOT_FOUND
        );
        assert_eq!(
            Error::PromptGenerationFailed("x".into()).code(),
            error_codes::PROMPT_GENERATION_FAILED
        );
        assert_eq!(
            Error::CapabilityNotSupported("x".into()).code(),
            error_codes::CAPABILITY_NOT_SUPPORTED
        );
    }

    #[test]
    fn test_error_data_names_offender() {
        let err = Error::MethodNotFound("foo/bar".to_string()).to_rpc_error();
        assert_eq!(err.data, Some(json!({ "method": "foo/bar" })));

        let err = Error::ToolNotFound("hammer".to_string()).to_rpc_error();
        assert_eq!(err.data, Some(json!({ "tool": "hammer" })));

        let err = Error::ResourceNotFound("config://nope".to_string()).to_rpc_error();
        assert_eq!(err.data, Some(json!({ "uri": "config://nope" })));

        assert!(Error::Internal("boom".into()).data().is_none());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidParams("x".into()).is_client_error());
        assert!(Error::ToolNotFound("x".into()).is_client_error());
        assert!(!Error::ToolExecutionFailed("x".into()).is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.code(), error_codes::INTERNAL_ERROR);
        assert!(err.to_string().starts_with("IO error"));
    }
}
