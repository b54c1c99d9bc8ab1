//! Subscriber setup and the process-wide current log level.
//!
//! The level lives in one atomic cell. When the subscriber was installed via
//! [`init`], changing the level also reloads the active filter so the running
//! process logs at the new level immediately.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tracing_fmt, reload, Registry};

use crate::error::{Error, Result};

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static FILTER_HANDLE: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

/// Closed set of log levels a client may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Trace,
            1 => Self::Debug,
            2 => Self::Info,
            3 => Self::Warn,
            _ => Self::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Level name as used by MCP `notifications/message`.
    pub fn as_mcp_str(&self) -> &'static str {
        match self {
            Self::Trace | Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
        }
    }

    pub fn as_filter(&self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            _ => Err(Error::InvalidParams(format!(
                "Invalid log level '{}', expected one of TRACE, DEBUG, INFO, WARN, ERROR",
                s
            ))),
        }
    }
}

/// Install the global subscriber writing to stderr.
///
/// Stdout is never used for logs since the stdio transport owns it.
pub fn init(level: LogLevel, json: bool) -> Result<()> {
    let (filter, handle) = reload::Layer::new(level.as_filter());

    let json_layer = json.then(|| tracing_fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| tracing_fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to set tracing subscriber: {}", e)))?;

    let _ = FILTER_HANDLE.set(handle);
    set_level(level)
}

/// The current process-wide level.
pub fn current_level() -> LogLevel {
    LogLevel::from_u8(CURRENT_LEVEL.load(Ordering::Acquire))
}

/// Change the process-wide level, reloading the active filter if any.
pub fn set_level(level: LogLevel) -> Result<()> {
    CURRENT_LEVEL.store(level as u8, Ordering::Release);
    if let Some(handle) = FILTER_HANDLE.get() {
        handle
            .modify(|filter| *filter = level.as_filter())
            .map_err(|e| Error::Internal(format!("Failed to reload log filter: {}", e)))?;
    }
    Ok(())
}
