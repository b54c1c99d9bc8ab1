//! Server configuration and runtime resources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::handler::ResourceProvider;
use crate::mcp::protocol::{Resource, ResourceContents};

const SCHEME: &str = "config://";

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Resource provider for `config://` URIs.
pub struct ConfigResourceProvider {
    config: Arc<Config>,
    started_at: DateTime<Utc>,
}

impl ConfigResourceProvider {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            started_at: Utc::now(),
        }
    }

    fn server(&self) -> Result<ResourceContents> {
        Ok(ResourceContents {
            uri: format!("{}server", SCHEME),
            mime_type: Some("application/json".to_string()),
            text: serde_json::to_string_pretty(self.config.as_ref())?,
        })
    }

    fn runtime(&self) -> Result<ResourceContents> {
        let processors = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let working_dir = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let info = json!({
            "process": {
                "pid": std::process::id(),
                "version": crate::VERSION,
                "startedAt": self.started_at.to_rfc3339(),
                "uptimeSeconds": (Utc::now() - self.started_at).num_seconds(),
            },
            "system": {
                "os": std::env::consts::OS,
                "family": std::env::consts::FAMILY,
                "arch": std::env::consts::ARCH,
                "processors": processors,
            },
            "environment": {
                "workingDir": working_dir,
                "dataDir": self.config.data_dir.display().to_string(),
            },
        });

        Ok(ResourceContents {
            uri: format!("{}runtime", SCHEME),
            mime_type: Some("application/json".to_string()),
            text: serde_json::to_string_pretty(&info)?,
        })
    }

    fn status(&self) -> Result<ResourceContents> {
        let config = &self.config;
        let caps = &config.capabilities;
        let uptime = Utc::now() - self.started_at;

        let mut text = String::new();
        let _ = writeln!(text, "MCP Hub Status");
        let _ = writeln!(text, "Status: Running");
        let _ = writeln!(text, "Current Time: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(text, "Uptime: {}s", uptime.num_seconds());
        let _ = writeln!(text, "Server Name: {}", config.name);
        let _ = writeln!(text, "Version: {}", config.version);
        let _ = writeln!(text, "Transport: {:?}", config.transport);
        let _ = writeln!(text, "Capabilities:");
        let _ = writeln!(text, "  Tools: {}", flag(caps.tools));
        let _ = writeln!(text, "  Resources: {}", flag(caps.resources));
        let _ = writeln!(text, "  Prompts: {}", flag(caps.prompts));
        let _ = writeln!(text, "  Logging: {}", flag(caps.logging));

        Ok(ResourceContents {
            uri: format!("{}status", SCHEME),
            mime_type: Some("text/plain".to_string()),
            text,
        })
    }
}

#[async_trait]
impl ResourceProvider for ConfigResourceProvider {
    fn list(&self) -> Vec<Resource> {
        let resource = |name: &str, title: &str, description: &str, mime: &str| Resource {
            uri: format!("{}{}", SCHEME, name),
            name: title.to_string(),
            description: Some(description.to_string()),
            mime_type: Some(mime.to_string()),
        };

        vec![
            resource(
                "server",
                "Server Configuration",
                "Current server configuration",
                "application/json",
            ),
            resource(
                "runtime",
                "Runtime Information",
                "Process and system runtime information",
                "application/json",
            ),
            resource(
                "status",
                "Server Status",
                "Current server status and uptime",
                "text/plain",
            ),
        ]
    }

    fn can_handle(&self, uri: &str) -> bool {
        uri.starts_with(SCHEME)
    }

    async fn read(&self, uri: &str) -> Result<Vec<ResourceContents>> {
        let contents = match uri.strip_prefix(SCHEME) {
            Some("server") => self.server()?,
            Some("runtime") => self.runtime()?,
            Some("status") => self.status()?,
            _ => return Err(Error::ResourceNotFound(uri.to_string())),
        };
        Ok(vec![contents])
    }
}
