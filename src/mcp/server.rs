//! MCP server implementation.
//!
//! [`McpServer`] is the dispatch engine shared by every transport binding. It
//! validates envelopes, routes them through a fixed method table, delegates to
//! the provider registries and always produces a well-formed response for a
//! request, or nothing at all for a notification.

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{CapabilityConfig, Config};
use crate::error::{Error, Result};
use crate::logging::{self, LogLevel};
use crate::mcp::protocol::*;
use crate::mcp::registry::{PromptRegistry, ResourceRegistry, ToolRegistry};
use crate::mcp::transport::Transport;
use crate::metrics::{Metrics, MetricsSnapshot};

/// Methods answered by the dispatch table.
pub const METHODS: [&str; 9] = [
    "initialize",
    "ping",
    "tools/list",
    "tools/call",
    "resources/list",
    "resources/read",
    "prompts/list",
    "prompts/get",
    "logging/setLevel",
];

/// Capacity of the server-initiated notification channel.
const NOTIFICATION_BUFFER: usize = 64;

/// Session lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
}

/// MCP server.
pub struct McpServer {
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    info: ServerInfo,
    capabilities: CapabilityConfig,
    require_initialize: bool,
    initialized: AtomicBool,
    metrics: Arc<Metrics>,
    notifications: broadcast::Sender<JsonRpcMessage>,
}

impl McpServer {
    /// Create a server with empty registries.
    pub fn new(config: &Config) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            tools: ToolRegistry::new("tool"),
            resources: ResourceRegistry::new("resource provider"),
            prompts: PromptRegistry::new("prompt provider"),
            info: ServerInfo {
                name: config.name.clone(),
                version: config.version.clone(),
            },
            capabilities: config.capabilities,
            require_initialize: config.require_initialize,
            initialized: AtomicBool::new(false),
            metrics: Metrics::new(),
            notifications,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn session_state(&self) -> SessionState {
        if self.initialized.load(Ordering::Acquire) {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }

    /// Capabilities advertised to clients. Disabled features are omitted.
    pub fn capabilities(&self) -> ServerCapabilities {
        let caps = &self.capabilities;
        ServerCapabilities {
            tools: caps.tools.then(|| ToolsCapability {
                list_changed: false,
            }),
            resources: caps.resources.then(|| ResourcesCapability {
                subscribe: false,
                list_changed: false,
            }),
            prompts: caps.prompts.then(|| PromptsCapability {
                list_changed: false,
            }),
            logging: caps.logging.then(LoggingCapability::default),
        }
    }

    /// Subscribe to server-initiated notifications.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<JsonRpcMessage> {
        self.notifications.subscribe()
    }

    /// Publish a server-initiated notification to every subscribed binding.
    pub fn notify(&self, method: &str, params: Value) {
        let msg = JsonRpcMessage::notification(method, Some(params));
        if self.notifications.send(msg).is_err() {
            debug!("No subscribers for notification: {}", method);
        }
    }

    /// Run the server over a duplex transport until the peer disconnects.
    ///
    /// Each inbound frame is dispatched on its own task; responses are written
    /// in completion order through the transport's single writer.
    pub async fn run<T: Transport>(self: Arc<Self>, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.info.name, self.info.version);

        let (mut incoming, outgoing) = transport.start().await?;
        let mut notifications = self.subscribe_notifications();
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                frame = incoming.recv() => {
                    let Some(raw) = frame else { break };
                    let server = self.clone();
                    let outgoing = outgoing.clone();
                    in_flight.spawn(async move {
                        if let Some(response) = server.handle_raw(&raw).await {
                            if outgoing.send(response).await.is_err() {
                                warn!("Transport closed before response could be sent");
                            }
                        }
                    });
                }
                note = notifications.recv() => match note {
                    Ok(msg) => {
                        if outgoing.send(msg).await.is_err() {
                            warn!("Transport closed, dropping notification");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} server notifications", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                },
                Some(joined) = in_flight.join_next() => {
                    if let Err(e) = joined {
                        error!("Request task failed: {}", e);
                    }
                }
            }
        }

        debug!("Input closed, waiting for {} in-flight requests", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Request task failed: {}", e);
            }
        }
        drop(outgoing);

        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Parse and dispatch one raw frame.
    pub async fn handle_raw(&self, raw: &str) -> Option<JsonRpcMessage> {
        match parse(raw) {
            Ok(msg) => self.handle_message(msg).await,
            Err(failure) => {
                warn!("Rejected inbound frame: {}", failure);
                Some(failure.to_response())
            }
        }
    }

    /// Dispatch one envelope. Returns the response to deliver, if any.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<JsonRpcMessage> {
        if !msg.has_valid_version() {
            warn!("Unsupported jsonrpc version: {:?}", msg.jsonrpc);
            return Some(JsonRpcMessage::error_response(
                msg.id,
                JsonRpcError::invalid_request(format!(
                    "jsonrpc must be \"{}\"",
                    JSONRPC_VERSION
                )),
            ));
        }

        match msg.kind() {
            MessageKind::Request => Some(self.handle_request(msg).await),
            MessageKind::Notification => {
                self.handle_notification(msg).await;
                None
            }
            MessageKind::Response => {
                warn!("Received unexpected response (id: {:?})", msg.id);
                None
            }
            MessageKind::Invalid => Some(JsonRpcMessage::error_response(
                msg.id,
                JsonRpcError::invalid_request("message is neither a request, notification nor response"),
            )),
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&self, req: JsonRpcMessage) -> JsonRpcMessage {
        let JsonRpcMessage {
            id, method, params, ..
        } = req;
        // Only requests reach here, so both are present.
        let id = id.unwrap_or(RequestId::Number(0));
        let method = method.unwrap_or_default();

        debug!("Handling request: {} (id: {})", method, id);
        self.metrics.inc_requests();

        let outcome = AssertUnwindSafe(self.dispatch(&method, params))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                Err(Error::Internal(detail))
            });

        match outcome {
            Ok(value) => {
                self.metrics.inc_success();
                JsonRpcMessage::response(id, value)
            }
            Err(e) => {
                self.metrics.inc_failed();
                if e.is_client_error() {
                    debug!("Request {} ({}) rejected: {}", id, method, e);
                } else {
                    error!("Request {} ({}) failed: {}", id, method, e);
                }
                JsonRpcMessage::error_response(Some(id), e.to_rpc_error())
            }
        }
    }

    /// Handle a notification. Never produces a response.
    async fn handle_notification(&self, notif: JsonRpcMessage) {
        let method = notif.method.unwrap_or_default();
        debug!("Handling notification: {}", method);
        self.metrics.inc_notifications();

        match method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                debug!("Client cancelled a request: {:?}", notif.params);
            }
            m if METHODS.contains(&m) => {
                let outcome = AssertUnwindSafe(self.dispatch(m, notif.params))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(_)) => debug!("Notification {} handled", m),
                    Ok(Err(e)) => warn!("Notification {} failed: {}", m, e),
                    Err(_) => error!("Notification {} handler panicked", m),
                }
            }
            _ => {
                warn!("Unknown notification method: {}", method);
            }
        }
    }

    /// Route a method to its handler.
    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.require_initialize
            && method != "initialize"
            && method != "ping"
            && self.session_state() == SessionState::Uninitialized
        {
            return Err(Error::InvalidRequest("Server not initialized".to_string()));
        }

        match method {
            // Core
            "initialize" => self.handle_initialize(params),
            "ping" => Ok(json!({})),
            // Tools
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(params).await,
            // Resources
            "resources/list" => self.handle_list_resources(),
            "resources/read" => self.handle_read_resource(params).await,
            // Prompts
            "prompts/list" => self.handle_list_prompts(),
            "prompts/get" => self.handle_get_prompt(params).await,
            // Logging
            "logging/setLevel" => self.handle_set_level(params),
            // Unknown
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }

    fn require(&self, enabled: bool, capability: &str) -> Result<()> {
        if enabled {
            Ok(())
        } else {
            Err(Error::CapabilityNotSupported(capability.to_string()))
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        if let Some(client) = params.as_ref().and_then(|p| p.get("clientInfo")) {
            info!("Initialize from client: {}", client);
        }

        let was_ready = self.initialized.swap(true, Ordering::AcqRel);
        if was_ready {
            debug!("Re-initializing an already initialized session");
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.capabilities(),
            server_info: self.info.clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request.
    fn handle_list_tools(&self) -> Result<Value> {
        self.require(self.capabilities.tools, "tools")?;
        let tools = self.tools.all().iter().map(|t| t.definition()).collect();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    /// Handle call tool request.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        self.require(self.capabilities.tools, "tools")?;
        let params: CallToolParams = parse_params(params)?;

        let handler = self
            .tools
            .get(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        self.metrics.inc_tool_calls();
        let content = handler
            .execute(params.arguments.unwrap_or_default())
            .await
            .map_err(|e| match e {
                Error::InvalidToolArguments(_)
                | Error::InvalidParams(_)
                | Error::InvalidPath(_)
                | Error::FileTooLarge { .. }
                | Error::ToolExecutionFailed(_) => e,
                other => Error::ToolExecutionFailed(format!("{}: {}", params.name, other)),
            })?;

        debug!("Tool {} executed successfully", params.name);
        Ok(serde_json::to_value(CallToolResult { content })?)
    }

    /// Handle list resources request.
    fn handle_list_resources(&self) -> Result<Value> {
        self.require(self.capabilities.resources, "resources")?;
        let resources = self
            .resources
            .all()
            .iter()
            .flat_map(|provider| provider.list())
            .collect();
        Ok(serde_json::to_value(ListResourcesResult { resources })?)
    }

    /// Handle read resource request.
    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        self.require(self.capabilities.resources, "resources")?;
        let params: ReadResourceParams = parse_params(params)?;

        let provider = self
            .resources
            .all()
            .into_iter()
            .find(|p| p.can_handle(&params.uri))
            .ok_or_else(|| Error::ResourceNotFound(params.uri.clone()))?;

        let contents = provider.read(&params.uri).await.map_err(|e| match e {
            Error::ResourceNotFound(_) | Error::InvalidParams(_) | Error::InvalidPath(_) => e,
            other => Error::ResourceReadFailed(format!("{}: {}", params.uri, other)),
        })?;

        Ok(serde_json::to_value(ReadResourceResult { contents })?)
    }

    /// Handle list prompts request.
    fn handle_list_prompts(&self) -> Result<Value> {
        self.require(self.capabilities.prompts, "prompts")?;
        let prompts = self
            .prompts
            .all()
            .iter()
            .flat_map(|provider| provider.list())
            .collect();
        Ok(serde_json::to_value(ListPromptsResult { prompts })?)
    }

    /// Handle get prompt request.
    async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        self.require(self.capabilities.prompts, "prompts")?;
        let params: GetPromptParams = parse_params(params)?;

        let provider = self
            .prompts
            .all()
            .into_iter()
            .find(|p| p.has(&params.name))
            .ok_or_else(|| Error::PromptNotFound(params.name.clone()))?;

        let arguments = params.arguments.unwrap_or_default();
        let result = provider
            .get(&params.name, &arguments)
            .await
            .map_err(|e| match e {
                Error::InvalidToolArguments(_)
                | Error::InvalidParams(_)
                | Error::PromptGenerationFailed(_) => e,
                other => Error::PromptGenerationFailed(format!("{}: {}", params.name, other)),
            })?;

        Ok(serde_json::to_value(result)?)
    }

    /// Handle logging/setLevel request.
    fn handle_set_level(&self, params: Option<Value>) -> Result<Value> {
        self.require(self.capabilities.logging, "logging")?;
        let params: SetLevelParams = parse_params(params)?;
        let level: LogLevel = params.level.parse()?;

        logging::set_level(level)?;
        info!("Log level set to {}", level);

        self.notify(
            "notifications/message",
            json!({
                "level": level.as_mcp_str(),
                "logger": self.info.name,
                "data": format!("Log level set to {}", level),
            }),
        );

        Ok(json!({}))
    }
}

/// Deserialize request params, reporting any mismatch as InvalidParams.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let params = params.ok_or_else(|| Error::InvalidParams("Missing parameters".to_string()))?;
    serde_json::from_value(params).map_err(|e| Error::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::{text_content, PromptProvider, ResourceProvider, ToolHandler};
    use async_trait::async_trait;
    use std::time::Duration;

    struct AddTool;

    #[async_trait]
    impl ToolHandler for AddTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "add".to_string(),
                description: "Add two numbers".to_string(),
                input_schema: json!({ "type": "object" }),
            }
        }

        async fn execute(&self, args: Arguments) -> Result<Vec<ContentBlock>> {
            let a = crate::mcp::handler::get_number_arg(&args, "a")?;
            let b = crate::mcp::handler::get_number_arg(&args, "b")?;
            Ok(vec![text_content(format!("{}", a + b))])
        }
    }

    struct SlowTool {
        name: &'static str,
        delay_ms: u64,
    }

    #[async_trait]
    impl ToolHandler for SlowTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.name.to_string(),
                description: "Sleeps".to_string(),
                input_schema: json!({ "type": "object" }),
            }
        }

        async fn execute(&self, _args: Arguments) -> Result<Vec<ContentBlock>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(vec![text_content(self.name)])
        }
    }

    struct PanicTool;

    #[async_trait]
    impl ToolHandler for PanicTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "explode".to_string(),
                description: "Always panics".to_string(),
                input_schema: json!({ "type": "object" }),
            }
        }

        async fn execute(&self, _args: Arguments) -> Result<Vec<ContentBlock>> {
            panic!("kaboom");
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "broken".to_string(),
                description: "Always fails".to_string(),
                input_schema: json!({ "type": "object" }),
            }
        }

        async fn execute(&self, _args: Arguments) -> Result<Vec<ContentBlock>> {
            Err(Error::Io(std::io::Error::other("disk on fire")))
        }
    }

    struct MemoryResources {
        prefix: &'static str,
        body: &'static str,
    }

    #[async_trait]
    impl ResourceProvider for MemoryResources {
        fn list(&self) -> Vec<Resource> {
            vec![Resource {
                uri: format!("{}doc", self.prefix),
                name: "doc".to_string(),
                description: None,
                mime_type: Some("text/plain".to_string()),
            }]
        }

        fn can_handle(&self, uri: &str) -> bool {
            uri.starts_with(self.prefix)
        }

        async fn read(&self, uri: &str) -> Result<Vec<ResourceContents>> {
            if uri.ends_with("broken") {
                return Err(Error::Internal("backing store offline".to_string()));
            }
            Ok(vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: self.body.to_string(),
            }])
        }
    }

    struct GreetingPrompts;

    #[async_trait]
    impl PromptProvider for GreetingPrompts {
        fn list(&self) -> Vec<Prompt> {
            vec![Prompt {
                name: "greet".to_string(),
                description: "Greet someone".to_string(),
                arguments: vec![PromptArgument {
                    name: "who".to_string(),
                    description: "Name".to_string(),
                    required: true,
                }],
            }]
        }

        async fn get(&self, _name: &str, arguments: &Arguments) -> Result<GetPromptResult> {
            let who = crate::mcp::handler::get_string_arg(arguments, "who")?;
            Ok(GetPromptResult {
                description: Some("Greet someone".to_string()),
                messages: vec![PromptMessage {
                    role: "user".to_string(),
                    content: PromptContent::Text {
                        text: format!("Say hello to {}", who),
                    },
                }],
            })
        }
    }

    fn server_with(config: Config) -> McpServer {
        let server = McpServer::new(&config);
        server.tools().register_tool(AddTool);
        server.tools().register_tool(PanicTool);
        server.tools().register_tool(FailingTool);
        server.resources().register(
            "first",
            Arc::new(MemoryResources {
                prefix: "mem://",
                body: "first",
            }),
        );
        server.resources().register(
            "second",
            Arc::new(MemoryResources {
                prefix: "mem://",
                body: "second",
            }),
        );
        server.prompts().register("greetings", Arc::new(GreetingPrompts));
        server
    }

    fn server() -> McpServer {
        server_with(Config::default())
    }

    async fn call(server: &McpServer, method: &str, params: Value) -> JsonRpcMessage {
        server
            .handle_message(JsonRpcMessage::request(
                RequestId::Number(1),
                method,
                Some(params),
            ))
            .await
            .expect("requests always get a response")
    }

    fn error_code(msg: &JsonRpcMessage) -> i32 {
        msg.error.as_ref().expect("expected error").code
    }

    #[tokio::test]
    async fn test_initialize_result_shape() {
        let server = server();
        assert_eq!(server.session_state(), SessionState::Uninitialized);

        for _ in 0..2 {
            let resp = call(&server, "initialize", json!({})).await;
            let result = resp.result.unwrap();
            assert_eq!(result["protocolVersion"], MCP_VERSION);
            assert_eq!(result["serverInfo"]["name"], "mcp-hub");
            assert!(result["capabilities"]["tools"].is_object());
            assert!(result["capabilities"]["logging"].is_object());
        }
        assert_eq!(server.session_state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_initialize_reports_configured_identity() {
        let server = server_with(Config {
            name: "edge-hub".to_string(),
            version: "9.1.0".to_string(),
            ..Config::default()
        });

        let resp = call(&server, "initialize", json!({})).await;
        let info = &resp.result.unwrap()["serverInfo"];
        assert_eq!(info["name"], "edge-hub");
        assert_eq!(info["version"], "9.1.0");
    }

    #[tokio::test]
    async fn test_disabled_capability_is_omitted_and_rejected() {
        let mut config = Config::default();
        config.capabilities.prompts = false;
        let server = server_with(config);

        let resp = call(&server, "initialize", json!({})).await;
        let caps = &resp.result.unwrap()["capabilities"];
        assert!(caps.get("prompts").is_none());
        assert!(caps.get("tools").is_some());

        let resp = call(&server, "prompts/list", json!({})).await;
        assert_eq!(error_code(&resp), error_codes::CAPABILITY_NOT_SUPPORTED);
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = call(&server(), "ping", json!({})).await;
        assert_eq!(resp.result, Some(json!({})));
        assert_eq!(resp.id, Some(RequestId::Number(1)));
    }

    #[tokio::test]
    async fn test_unknown_method_request_and_notification() {
        let server = server();
        let resp = call(&server, "does/not/exist", json!({})).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.data, Some(json!({ "method": "does/not/exist" })));

        let none = server
            .handle_message(JsonRpcMessage::notification("does/not/exist", None))
            .await;
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_bad_version_is_invalid_request() {
        let resp = server()
            .handle_raw(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(error_code(&resp), error_codes::INVALID_REQUEST);
        assert_eq!(resp.id, Some(RequestId::Number(5)));
    }

    #[tokio::test]
    async fn test_malformed_frames() {
        let server = server();
        let resp = server.handle_raw("this is not json").await.unwrap();
        assert_eq!(error_code(&resp), error_codes::PARSE_ERROR);

        let resp = server.handle_raw(r#"{"jsonrpc":"2.0"}"#).await.unwrap();
        assert_eq!(error_code(&resp), error_codes::INVALID_REQUEST);

        let resp = server
            .handle_raw(r#"{"jsonrpc":"2.0","id":9,"method":"ping","result":1}"#)
            .await
            .unwrap();
        assert_eq!(error_code(&resp), error_codes::INVALID_REQUEST);
        assert_eq!(resp.id, Some(RequestId::Number(9)));
    }

    #[tokio::test]
    async fn test_inbound_response_is_dropped() {
        let resp = server()
            .handle_raw(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let server = server();
        let resp = call(&server, "tools/list", json!({})).await;
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "add");
        assert!(tools[0].get("inputSchema").is_some());

        let resp = call(
            &server,
            "tools/call",
            json!({ "name": "add", "arguments": { "a": 2, "b": 3 } }),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "5");
        assert_eq!(server.metrics().tool_calls, 1);
    }

    #[tokio::test]
    async fn test_tools_call_param_errors() {
        let server = server();

        let resp = call(&server, "tools/call", json!({ "arguments": {} })).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);

        let resp = server
            .handle_message(JsonRpcMessage::request(RequestId::Number(2), "tools/call", None))
            .await
            .unwrap();
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);

        let resp = call(&server, "tools/call", json!({ "name": "nope" })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.data, Some(json!({ "tool": "nope" })));

        // Missing arguments default to an empty map, so the tool itself rejects it.
        let resp = call(&server, "tools/call", json!({ "name": "add" })).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_failures_never_escape() {
        let server = server();

        let resp = call(&server, "tools/call", json!({ "name": "explode" })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
        assert!(err.message.contains("kaboom"));

        let resp = call(&server, "tools/call", json!({ "name": "broken" })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::TOOL_EXECUTION_FAILED);
        assert!(err.message.contains("disk on fire"));

        // The server keeps serving after a panic.
        let resp = call(&server, "ping", json!({})).await;
        assert!(resp.is_success_response());
    }

    #[tokio::test]
    async fn test_resources() {
        let server = server();

        let resp = call(&server, "resources/list", json!({})).await;
        let resources = resp.result.unwrap()["resources"].as_array().unwrap().clone();
        assert_eq!(resources.len(), 2);

        // First registered provider that can handle the uri wins.
        let resp = call(&server, "resources/read", json!({ "uri": "mem://doc" })).await;
        assert_eq!(resp.result.unwrap()["contents"][0]["text"], "first");

        let resp = call(&server, "resources/read", json!({})).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);

        let resp = call(&server, "resources/read", json!({ "uri": "nowhere://x" })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::RESOURCE_NOT_FOUND);
        assert_eq!(err.data, Some(json!({ "uri": "nowhere://x" })));

        let resp = call(&server, "resources/read", json!({ "uri": "mem://broken" })).await;
        assert_eq!(error_code(&resp), error_codes::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn test_prompts() {
        let server = server();

        let resp = call(&server, "prompts/list", json!({})).await;
        assert_eq!(resp.result.unwrap()["prompts"][0]["name"], "greet");

        let resp = call(
            &server,
            "prompts/get",
            json!({ "name": "greet", "arguments": { "who": "Ada" } }),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["messages"][0]["content"]["text"], "Say hello to Ada");

        let resp = call(&server, "prompts/get", json!({ "name": "missing" })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.data, Some(json!({ "prompt": "missing" })));

        let resp = call(&server, "prompts/get", json!({ "name": "greet" })).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);

        let resp = call(&server, "prompts/get", json!({ "arguments": {} })).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_set_level() {
        let server = server();
        let mut notes = server.subscribe_notifications();

        let resp = call(&server, "logging/setLevel", json!({ "level": "VERBOSE" })).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);

        let resp = call(&server, "logging/setLevel", json!({})).await;
        assert_eq!(error_code(&resp), error_codes::INVALID_PARAMS);

        let resp = call(&server, "logging/setLevel", json!({ "level": "DEBUG" })).await;
        assert!(resp.is_success_response());
        assert_eq!(logging::current_level(), LogLevel::Debug);

        let note = notes.recv().await.unwrap();
        assert!(note.is_notification());
        assert_eq!(note.method.as_deref(), Some("notifications/message"));
        assert_eq!(note.params.unwrap()["level"], "debug");
    }

    #[tokio::test]
    async fn test_strict_initialize_policy() {
        let config = Config {
            require_initialize: true,
            ..Config::default()
        };
        let server = server_with(config);

        let resp = call(&server, "tools/list", json!({})).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::INVALID_REQUEST);
        assert!(err.message.contains("not initialized"));

        assert!(call(&server, "ping", json!({})).await.is_success_response());
        assert!(call(&server, "initialize", json!({})).await.is_success_response());
        assert!(call(&server, "tools/list", json!({})).await.is_success_response());
    }

    #[tokio::test]
    async fn test_lenient_policy_by_default() {
        let resp = call(&server(), "tools/list", json!({})).await;
        assert!(resp.is_success_response());
    }

    #[tokio::test]
    async fn test_concurrent_requests_complete_independently() {
        let server = Arc::new(server());
        server.tools().register_tool(SlowTool {
            name: "slow",
            delay_ms: 200,
        });
        server.tools().register_tool(SlowTool {
            name: "fast",
            delay_ms: 1,
        });

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        for (i, name) in ["slow", "fast"].into_iter().enumerate() {
            let server = server.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let resp = server
                    .handle_message(JsonRpcMessage::request(
                        RequestId::Number(i as i64),
                        "tools/call",
                        Some(json!({ "name": name })),
                    ))
                    .await
                    .unwrap();
                tx.send(resp).await.unwrap();
            });
        }

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.id, Some(RequestId::Number(1)));
        assert_eq!(second.id, Some(RequestId::Number(0)));
    }

    #[tokio::test]
    async fn test_known_method_as_notification_gets_no_response() {
        let server = server();
        let resp = server
            .handle_message(JsonRpcMessage::notification(
                "tools/call",
                Some(json!({ "name": "explode" })),
            ))
            .await;
        assert!(resp.is_none());
        assert_eq!(server.metrics().notifications_total, 1);
    }
}
