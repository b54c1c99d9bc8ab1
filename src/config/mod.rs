//! Configuration management for the hub.

use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::logging::LogLevel;

/// Command-line arguments for the hub server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing pluggable tools, resources and prompts")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "MCP_HUB_TRANSPORT")]
    pub transport: Transport,

    /// HTTP bind address (only for http transport)
    #[arg(long, default_value = "0.0.0.0", env = "MCP_HUB_HOST")]
    pub host: String,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "8080", env = "MCP_HUB_PORT")]
    pub port: u16,

    /// Enable debug logging (shorthand for --log-level DEBUG)
    #[arg(short, long, env = "MCP_HUB_DEBUG")]
    pub debug: bool,

    /// Initial log level: TRACE, DEBUG, INFO, WARN or ERROR
    #[arg(long, default_value = "INFO", env = "MCP_HUB_LOG_LEVEL", value_parser = LogLevel::from_str)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, env = "MCP_HUB_LOG_JSON")]
    pub log_json: bool,

    /// Server name reported during initialize
    #[arg(long, default_value = "mcp-hub", env = "MCP_HUB_NAME")]
    pub name: String,

    /// Server version reported during initialize and on the info endpoints
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"), env = "MCP_HUB_SERVER_VERSION")]
    pub server_version: String,

    /// Directory served by the file tool and file resources
    #[arg(long, default_value = "./data", env = "MCP_HUB_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Seconds between SSE heartbeats
    #[arg(long, default_value = "30", env = "MCP_HUB_HEARTBEAT_SECS")]
    pub heartbeat_secs: u64,

    /// Per-connection SSE outbound buffer (events)
    #[arg(long, default_value = "256", env = "MCP_HUB_SSE_BUFFER")]
    pub sse_buffer: usize,

    /// Expose tools
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "MCP_HUB_TOOLS")]
    pub tools: bool,

    /// Expose resources
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "MCP_HUB_RESOURCES")]
    pub resources: bool,

    /// Expose prompts
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "MCP_HUB_PROMPTS")]
    pub prompts: bool,

    /// Expose logging/setLevel
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "MCP_HUB_LOGGING")]
    pub logging: bool,

    /// Reject requests other than initialize and ping until initialize has run
    #[arg(long, env = "MCP_HUB_REQUIRE_INITIALIZE")]
    pub require_initialize: bool,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Which protocol features are advertised and served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
    pub logging: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            tools: true,
            resources: true,
            prompts: true,
            logging: true,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Initial log level
    pub log_level: LogLevel,
    /// JSON log output
    pub log_json: bool,
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
    /// Data directory for file tool/resources
    pub data_dir: PathBuf,
    /// SSE heartbeat interval in seconds
    pub heartbeat_secs: u64,
    /// SSE per-connection buffer
    pub sse_buffer: usize,
    /// Enabled features
    pub capabilities: CapabilityConfig,
    /// Strict initialize-before-use policy
    pub require_initialize: bool,
}

impl Config {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            host: args.host,
            port: args.port,
            log_level: if args.debug {
                LogLevel::Debug.min(args.log_level)
            } else {
                args.log_level
            },
            log_json: args.log_json,
            name: args.name,
            version: args.server_version,
            data_dir: args.data_dir,
            heartbeat_secs: args.heartbeat_secs,
            sse_buffer: args.sse_buffer.max(1),
            capabilities: CapabilityConfig {
                tools: args.tools,
                resources: args.resources,
                prompts: args.prompts,
                logging: args.logging,
            },
            require_initialize: args.require_initialize,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: LogLevel::Info,
            log_json: false,
            name: "mcp-hub".to_string(),
            version: crate::VERSION.to_string(),
            data_dir: PathBuf::from("./data"),
            heartbeat_secs: 30,
            sse_buffer: 256,
            capabilities: CapabilityConfig::default(),
            require_initialize: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_default() {
        assert_eq!(Transport::default(), Transport::Stdio);
    }

    #[test]
    fn test_transport_serialization() {
        let transports = [
            (Transport::Stdio, "\"stdio\""),
            (Transport::Http, "\"http\""),
        ];

        for (transport, expected) in &transports {
            let json = serde_json::to_string(transport).unwrap();
            assert_eq!(json, *expected);
        }
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.sse_buffer, 256);
        assert_eq!(config.capabilities, CapabilityConfig::default());
        assert!(!config.require_initialize);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_args_defaults_match_config_defaults() {
        let args = Args::parse_from(["mcp-hub"]);
        let config: Config = args.into();
        let default = Config::default();

        assert_eq!(config.transport, default.transport);
        assert_eq!(config.port, default.port);
        assert_eq!(config.log_level, default.log_level);
        assert_eq!(config.data_dir, default.data_dir);
        assert_eq!(config.capabilities, default.capabilities);
        assert_eq!(config.version, default.version);
    }

    #[test]
    fn test_server_version_argument() {
        let args = Args::parse_from(["mcp-hub", "--server-version", "2.3.4-rc1", "--name", "hub-a"]);
        let config: Config = args.into();

        assert_eq!(config.version, "2.3.4-rc1");
        assert_eq!(config.name, "hub-a");
    }

    #[test]
    fn test_args_to_config() {
        let args = Args::parse_from([
            "mcp-hub",
            "--transport",
            "http",
            "--port",
            "4000",
            "--debug",
            "--prompts",
            "false",
            "--heartbeat-secs",
            "5",
            "--require-initialize",
        ]);
        let config: Config = args.into();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.port, 4000);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!config.capabilities.prompts);
        assert!(config.capabilities.tools);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(5));
        assert!(config.require_initialize);
    }

    #[test]
    fn test_log_level_argument() {
        let args = Args::parse_from(["mcp-hub", "--log-level", "warn"]);
        assert_eq!(args.log_level, LogLevel::Warn);

        assert!(Args::try_parse_from(["mcp-hub", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_heartbeat_never_zero() {
        let config = Config {
            heartbeat_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            transport: Transport::Http,
            port: 9000,
            ..Config::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"transport\":\"http\""));
        assert!(json.contains("\"port\":9000"));
        assert!(json.contains("\"log_level\":\"INFO\""));
    }
}
