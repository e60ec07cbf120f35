//! Logging setup for provider processes
//!
//! Terraform captures a plugin's stderr and shows it when `TF_LOG` is set, so
//! the subscriber writes there and takes its level from the same variable.

use crate::error::{Result, TfplugError};
use tracing_subscriber::EnvFilter;

pub const LOG_LEVEL_ENV: &str = "TF_LOG";

/// Log level for the provider process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Terraform accepts `JSON` as an alias for trace output
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "JSON" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(LogLevel::Info)
    }

    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(level: LogLevel) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.as_filter()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| TfplugError::LoggingSetup(e.to_string()))
}

pub fn init_from_env() -> Result<()> {
    init(LogLevel::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_terraform_levels() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("JSON"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse(" warn "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    #[serial]
    fn level_defaults_to_info() {
        std::env::remove_var(LOG_LEVEL_ENV);
        assert_eq!(LogLevel::from_env(), LogLevel::Info);

        std::env::set_var(LOG_LEVEL_ENV, "ERROR");
        assert_eq!(LogLevel::from_env(), LogLevel::Error);
        std::env::remove_var(LOG_LEVEL_ENV);
    }
}
