//! MCP protocol types and message definitions.
//!
//! Every wire message is a [`JsonRpcMessage`] envelope. Whether it is a
//! request, a notification or a response is derived purely from which fields
//! are present, see [`JsonRpcMessage::kind`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// JSON-RPC version.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version.
pub const MCP_VERSION: &str = "2025-06-18";

// ===== JSON-RPC Base Types =====

/// Request ID (can be string or number).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

/// A JSON-RPC error object. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn parse_error(details: impl fmt::Display) -> Self {
        Self::new(
            error_codes::PARSE_ERROR,
            format!("Parse error: {}", details),
            None,
        )
    }

    pub fn invalid_request(details: impl fmt::Display) -> Self {
        Self::new(
            error_codes::INVALID_REQUEST,
            format!("Invalid Request: {}", details),
            None,
        )
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
            Some(serde_json::json!({ "method": method })),
        )
    }

    pub fn internal_error(details: impl fmt::Display) -> Self {
        Self::new(
            error_codes::INTERNAL_ERROR,
            format!("Internal error: {}", details),
            None,
        )
    }
}

/// Classification of an envelope by field presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Notification,
    Response,
    Invalid,
}

/// A single protocol message: request, notification or response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default, deserialize_with = "present_value")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl Serialize for JsonRpcMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", &self.jsonrpc)?;
        match &self.id {
            Some(id) => map.serialize_entry("id", id)?,
            // Error responses to unreadable requests carry an explicit null id.
            None if self.error.is_some() => map.serialize_entry("id", &Value::Null)?,
            None => {}
        }
        if let Some(method) = &self.method {
            map.serialize_entry("method", method)?;
        }
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        if let Some(result) = &self.result {
            map.serialize_entry("result", result)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

/// Keeps an explicit `null` distinct from an absent field.
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcMessage {
    fn empty() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    /// Build a request expecting exactly one response.
    pub fn request(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id),
            method: Some(method.into()),
            params,
            ..Self::empty()
        }
    }

    /// Build a notification (no id, never answered).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: Some(method.into()),
            params,
            ..Self::empty()
        }
    }

    /// Build a success response.
    pub fn response(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::empty()
        }
    }

    /// Build an error response. The id is absent only when the request id
    /// could not be recovered (parse failures).
    pub fn error_response(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            id,
            error: Some(error),
            ..Self::empty()
        }
    }

    pub fn kind(&self) -> MessageKind {
        match (&self.method, &self.id) {
            (Some(_), Some(_)) if self.result.is_none() && self.error.is_none() => {
                MessageKind::Request
            }
            (Some(_), None) if self.result.is_none() && self.error.is_none() => {
                MessageKind::Notification
            }
            (None, Some(_)) if self.result.is_some() != self.error.is_some() => {
                MessageKind::Response
            }
            _ => MessageKind::Invalid,
        }
    }

    pub fn is_request(&self) -> bool {
        self.kind() == MessageKind::Request
    }

    pub fn is_notification(&self) -> bool {
        self.kind() == MessageKind::Notification
    }

    pub fn is_response(&self) -> bool {
        self.kind() == MessageKind::Response
    }

    pub fn is_success_response(&self) -> bool {
        self.is_response() && self.result.is_some()
    }

    pub fn is_error_response(&self) -> bool {
        self.is_response() && self.error.is_some()
    }

    /// Whether the protocol tag is the supported JSON-RPC version.
    pub fn has_valid_version(&self) -> bool {
        self.jsonrpc == JSONRPC_VERSION
    }

    /// Serialize to a single-line JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Why raw input could not become an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    /// Not JSON at all.
    Malformed(String),
    /// Valid JSON, but not an envelope. Carries the id when one was readable.
    InvalidEnvelope {
        id: Option<RequestId>,
        reason: String,
    },
}

impl ParseFailure {
    /// Error object to answer this failure with.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            Self::Malformed(reason) => JsonRpcError::parse_error(reason),
            Self::InvalidEnvelope { reason, .. } => JsonRpcError::invalid_request(reason),
        }
    }

    /// Error response envelope to send back to the peer.
    pub fn to_response(&self) -> JsonRpcMessage {
        let id = match self {
            Self::Malformed(_) => None,
            Self::InvalidEnvelope { id, .. } => id.clone(),
        };
        JsonRpcMessage::error_response(id, self.to_rpc_error())
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed JSON: {}", reason),
            Self::InvalidEnvelope { reason, .. } => write!(f, "invalid envelope: {}", reason),
        }
    }
}

/// Decode one envelope from text. Never panics on any input.
pub fn parse(raw: &str) -> std::result::Result<JsonRpcMessage, ParseFailure> {
    parse_slice(raw.as_bytes())
}

/// Decode one envelope from raw bytes. Never panics on any input.
pub fn parse_slice(raw: &[u8]) -> std::result::Result<JsonRpcMessage, ParseFailure> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
    from_value(value)
}

/// Build an envelope from an already-decoded JSON value.
pub fn from_value(value: Value) -> std::result::Result<JsonRpcMessage, ParseFailure> {
    if !value.is_object() {
        return Err(ParseFailure::InvalidEnvelope {
            id: None,
            reason: "message must be a JSON object".to_string(),
        });
    }

    let id = value
        .get("id")
        .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());

    serde_json::from_value(value).map_err(|e| ParseFailure::InvalidEnvelope {
        id,
        reason: e.to_string(),
    })
}

// ===== MCP-Specific Types =====

/// Server capabilities. Disabled features are omitted entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
}

/// Tools capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

/// Resources capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    #[serde(default)]
    pub subscribe: bool,
    #[serde(default)]
    pub list_changed: bool,
}

/// Prompts capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

/// Logging capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingCapability {}

/// Server info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Tool arguments as received on the wire.
pub type Arguments = Map<String, Value>;

/// Tool descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Content block produced by tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: ResourceContents,
    },
}

/// List tools result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Call tool params.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Arguments>,
}

/// Call tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
}

/// A resource exposed by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Params of resources/read.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// A prompt argument definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A prompt descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// Prompt content types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
}

/// A prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Params of prompts/get.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Arguments>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Params of logging/setLevel.
#[derive(Debug, Clone, Deserialize)]
pub struct SetLevelParams {
    pub level: String,
}

// ===== Error Codes =====

/// Standard JSON-RPC error codes plus the hub's domain codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const TOOL_EXECUTION_FAILED: i32 = -32001;
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
    pub const PROMPT_GENERATION_FAILED: i32 = -32003;
    pub const CAPABILITY_NOT_SUPPORTED: i32 = -32004;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_kinds(msg: &JsonRpcMessage) -> [bool; 3] {
        [msg.is_request(), msg.is_notification(), msg.is_response()]
    }

    #[test]
    fn test_constructors_are_mutually_exclusive() {
        let messages = [
            JsonRpcMessage::request(RequestId::Number(1), "tools/list", None),
            JsonRpcMessage::notification("notifications/initialized", None),
            JsonRpcMessage::response(RequestId::Number(1), json!({})),
            JsonRpcMessage::error_response(
                Some(RequestId::from("a")),
                JsonRpcError::internal_error("boom"),
            ),
        ];

        for msg in &messages {
            let flags = all_kinds(msg);
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{:?}", msg);
        }
    }

    #[test]
    fn test_parse_request() {
        let msg = parse(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert!(msg.is_request());
        assert_eq!(msg.id, Some(RequestId::Number(7)));
        assert_eq!(msg.method.as_deref(), Some("ping"));
    }

    #[test]
    fn test_parse_notification() {
        let msg = parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(msg.is_notification());
    }

    #[test]
    fn test_parse_null_result_is_still_a_response() {
        let msg = parse(r#"{"jsonrpc":"2.0","id":"x","result":null}"#).unwrap();
        assert!(msg.is_response());
        assert!(msg.is_success_response());
        assert_eq!(msg.result, Some(Value::Null));
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, ParseFailure::Malformed(_)));

        let response = err.to_response();
        assert!(response.id.is_none());
        let wire: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(wire.get("id"), Some(&Value::Null));
        assert_eq!(response.error.unwrap().code, error_codes::PARSE_ERROR);
    }

    #[test]
    fn test_parse_non_object() {
        let err = parse("[1,2,3]").unwrap_err();
        assert!(matches!(err, ParseFailure::InvalidEnvelope { id: None, .. }));
        assert_eq!(err.to_rpc_error().code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_parse_bad_field_type_recovers_id() {
        let err = parse(r#"{"jsonrpc":"2.0","id":3,"method":42}"#).unwrap_err();
        match &err {
            ParseFailure::InvalidEnvelope { id, .. } => {
                assert_eq!(id, &Some(RequestId::Number(3)));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
        assert_eq!(err.to_response().id, Some(RequestId::Number(3)));
    }

    #[test]
    fn test_parse_arbitrary_bytes_never_panics() {
        let inputs: [&[u8]; 8] = [
            b"",
            b"\xff\xfe\x00",
            b"null",
            b"42",
            b"\"str\"",
            b"{}",
            b"{\"id\":{}}",
            b"{\"jsonrpc\":\"2.0\",\"id\":1.5,\"method\":\"x\"}",
        ];
        for input in inputs {
            match parse_slice(input) {
                Ok(msg) => assert_eq!(msg.kind(), MessageKind::Invalid),
                Err(failure) => {
                    let resp = failure.to_response();
                    assert!(resp.error.is_some());
                }
            }
        }
    }

    #[test]
    fn test_invalid_combinations() {
        let mut msg = JsonRpcMessage::response(RequestId::Number(1), json!(1));
        msg.error = Some(JsonRpcError::internal_error("x"));
        assert_eq!(msg.kind(), MessageKind::Invalid);

        let mut msg = JsonRpcMessage::request(RequestId::Number(1), "ping", None);
        msg.result = Some(json!({}));
        assert_eq!(msg.kind(), MessageKind::Invalid);

        let msg = JsonRpcMessage {
            id: None,
            result: Some(json!(1)),
            ..JsonRpcMessage::notification("x", None)
        };
        assert_eq!(msg.kind(), MessageKind::Invalid);
    }

    #[test]
    fn test_serialize_parse_equivalence() {
        let raw = json!({
            "jsonrpc": "2.0",
            "id": "req-9",
            "method": "tools/call",
            "params": { "name": "calculator", "arguments": { "a": 1, "b": 2 } }
        });
        let msg = from_value(raw.clone()).unwrap();
        let back: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(back, raw);

        let raw = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "error": { "code": -32601, "message": "Method not found: x", "data": { "method": "x" } }
        });
        let msg = from_value(raw.clone()).unwrap();
        let back: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_version_check() {
        let msg = parse(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).unwrap();
        assert!(!msg.has_valid_version());

        let msg = parse(r#"{"id":1,"method":"ping"}"#).unwrap();
        assert!(!msg.has_valid_version());
    }

    #[test]
    fn test_request_id_variants() {
        assert_eq!(serde_json::to_string(&RequestId::Number(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&RequestId::from("request-1")).unwrap(),
            "\"request-1\""
        );
    }

    #[test]
    fn test_tool_definition_uses_camel_case() {
        let tool = Tool {
            name: "test_tool".to_string(),
            description: "A test tool".to_string(),
            input_schema: json!({ "type": "object" }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("\"inputSchema\""));
    }

    #[test]
    fn test_content_block_variants() {
        let text = serde_json::to_value(ContentBlock::Text { text: "hi".into() }).unwrap();
        assert_eq!(text, json!({ "type": "text", "text": "hi" }));

        let image = serde_json::to_value(ContentBlock::Image {
            data: "b64".into(),
            mime_type: "image/png".into(),
        })
        .unwrap();
        assert_eq!(image["mimeType"], "image/png");
    }

    #[test]
    fn test_capabilities_omit_disabled_features() {
        let caps = ServerCapabilities {
            tools: Some(ToolsCapability { list_changed: false }),
            ..Default::default()
        };
        let json = serde_json::to_value(&caps).unwrap();
        assert_eq!(json, json!({ "tools": { "listChanged": false } }));
    }

    #[test]
    fn test_call_tool_params_without_arguments() {
        let params: CallToolParams =
            serde_json::from_value(json!({ "name": "calculator" })).unwrap();
        assert!(params.arguments.is_none());

        assert!(serde_json::from_value::<CallToolParams>(json!({ "arguments": {} })).is_err());
    }
}
