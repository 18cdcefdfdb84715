//! Logging setup shared by replcheck binaries.
//!
//! Logs always go to stderr; stdout is reserved for assessment output.
//! Filter precedence: `RUST_LOG`, then `REPLCHECK_LOG_LEVEL`, then the
//! caller's default. An optional JSON log file is written through a
//! non-blocking appender; keep the returned [`LoggingGuards`] alive until
//! exit or buffered lines are lost.

use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{EnvError, EnvParser};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("log file path {0} has no file name")]
    InvalidFile(PathBuf),

    #[error("failed to install global subscriber: {0}")]
    Init(String),
}

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// Additional JSON log file.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Read `REPLCHECK_LOG_LEVEL`, `REPLCHECK_LOG_FORMAT` and
    /// `REPLCHECK_LOG_FILE`, falling back to `default_level`.
    ///
    /// Invalid values fall back to their defaults and are returned so the
    /// caller can report them once a subscriber is installed.
    pub fn from_env(default_level: &str) -> (Self, Vec<EnvError>) {
        let mut parser = EnvParser::new();
        let level = parser.get_log_level("LOG_LEVEL", default_level).value;
        let format = parser.get_string("LOG_FORMAT", "human");
        let format = match format.value.to_ascii_lowercase().as_str() {
            "human" => LogFormat::Human,
            "json" => LogFormat::Json,
            _ => {
                parser.push_error(EnvError::InvalidValue {
                    var: "REPLCHECK_LOG_FORMAT".to_string(),
                    expected: "human or json".to_string(),
                    value: format.value,
                });
                LogFormat::Human
            }
        };
        let file = parser.get_path("LOG_FILE").map(|s| s.value);
        let config = Self {
            level,
            format,
            file,
        };
        (config, parser.take_errors())
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Flush guards for non-blocking writers.
#[must_use = "dropping the guards stops the log file writer"]
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
            filter: config.level.clone(),
            reason: e.to_string(),
        })?,
    };

    let mut guards = Vec::new();
    let file_layer = match &config.file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| LoggingError::InvalidFile(path.clone()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    let (human_layer, json_layer) = match config.format {
        LogFormat::Human => (
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(human_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuards { _guards: guards })
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::config::env_test_lock;

    #[test]
    fn test_from_env_defaults() {
        let _guard = env_test_lock();
        // SAFETY: env mutation is serialized by env_test_lock
        unsafe {
            std::env::remove_var("REPLCHECK_LOG_LEVEL");
            std::env::remove_var("REPLCHECK_LOG_FORMAT");
            std::env::remove_var("REPLCHECK_LOG_FILE");
        }
        let (config, errors) = LogConfig::from_env("warn");
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Human);
        assert!(config.file.is_none());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_from_env_reports_invalid_values() {
        let _guard = env_test_lock();
        // SAFETY: env mutation is serialized by env_test_lock
        unsafe {
            std::env::set_var("REPLCHECK_LOG_LEVEL", "loud");
            std::env::set_var("REPLCHECK_LOG_FORMAT", "xml");
            std::env::remove_var("REPLCHECK_LOG_FILE");
        }
        let (config, errors) = LogConfig::from_env("warn");
        // SAFETY: env mutation is serialized by env_test_lock
        unsafe {
            std::env::remove_var("REPLCHECK_LOG_LEVEL");
            std::env::remove_var("REPLCHECK_LOG_FORMAT");
        }

        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            &errors[0],
            EnvError::InvalidLogLevel { var, value } if var == "REPLCHECK_LOG_LEVEL" && value == "loud"
        ));
        assert!(matches!(
            &errors[1],
            EnvError::InvalidValue { var, value, .. } if var == "REPLCHECK_LOG_FORMAT" && value == "xml"
        ));
    }

    #[test]
    fn test_from_env_json() {
        let _guard = env_test_lock();
        // SAFETY: env mutation is serialized by env_test_lock
        unsafe {
            std::env::set_var("REPLCHECK_LOG_FORMAT", "json");
            std::env::set_var("REPLCHECK_LOG_LEVEL", "trace");
        }
        let (config, errors) = LogConfig::from_env("info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "trace");
        assert!(errors.is_empty());
        // SAFETY: env mutation is serialized by env_test_lock
        unsafe {
            std::env::remove_var("REPLCHECK_LOG_FORMAT");
            std::env::remove_var("REPLCHECK_LOG_LEVEL");
        }
    }

    #[test]
    fn test_builders() {
        let _guard = env_test_lock();
        let (config, _) = LogConfig::from_env("info");
        let config = config
            .with_level("debug")
            .with_format(LogFormat::Json);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }
}
