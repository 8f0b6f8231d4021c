//! Logging setup for provider processes
//!
//! Stdout belongs to the engine, so the subscriber always writes to stderr.
//! The library never installs a subscriber itself; the process embedding a
//! provider calls [`init_logging`] once at startup (see
//! `hwcloud/examples/list_zones.rs`).

use std::str::FromStr;

/// Log level for the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Reads `TF_LOG`; unset or unrecognised values fall back to INFO
pub fn level_from_env() -> LogLevel {
    std::env::var("TF_LOG")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Installs the global subscriber. Returns false if one was already set
pub fn try_init_logging(level: LogLevel) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Installs the global subscriber at the level from `TF_LOG`
pub fn init_logging() {
    if !try_init_logging(level_from_env()) {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
