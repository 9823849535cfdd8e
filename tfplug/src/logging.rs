//! Logging setup for provider processes
//!
//! Stdout carries the plugin handshake, so logs always go to stderr. The
//! process serving the plugin protocol owns startup and calls
//! `init(LogLevel::from_env())` once before handing off to `ProviderHost`;
//! nothing inside the library installs a subscriber on its own.

use crate::error::{Result, TfplugError};
use tracing_subscriber::EnvFilter;

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
    /// Reads Terraform's TF_LOG, defaulting to Info
    pub fn from_env() -> Self {
        std::env::var("TF_LOG")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(LogLevel::Info)
    }

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

/// Installs a global fmt subscriber writing to stderr
pub fn init(level: LogLevel) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.as_filter()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| TfplugError::LoggingError(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parse_accepts_terraform_levels() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("JSON"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse(" warn "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    #[serial]
    fn from_env_defaults_to_info() {
        std::env::remove_var("TF_LOG");
        assert_eq!(LogLevel::from_env(), LogLevel::Info);

        std::env::set_var("TF_LOG", "ERROR");
        assert_eq!(LogLevel::from_env(), LogLevel::Error);

        std::env::set_var("TF_LOG", "nonsense");
        assert_eq!(LogLevel::from_env(), LogLevel::Info);

        std::env::remove_var("TF_LOG");
    }

    #[test]
    fn init_installs_subscriber_once() {
        let _ = init(LogLevel::Debug);

        assert!(matches!(
            init(LogLevel::Debug),
            Err(TfplugError::LoggingError(_))
        ));
    }
}
