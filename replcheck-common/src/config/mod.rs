//! Configuration system for replcheck.
//!
//! Effective settings are layered, later layers winning:
//! built-in defaults → TOML file → `REPLCHECK_*` environment → CLI flags.
//! Every value remembers its source for `--show-config`.

pub mod env;
pub mod file;
pub mod source;

pub use env::{EnvError, EnvParser, parse_duration};
pub use file::{ConfigError, FileConfig, default_config_path};
pub use source::{ConfigSource, Sourced};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::transport::DEFAULT_TIMEOUT;

/// Pause between wait-loop iterations.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(20);

/// Replica lag tolerated before it is reported stale.
pub const DEFAULT_STALENESS_WINDOW_SECS: u64 = 1200;

const MAX_STALENESS_WINDOW_SECS: u64 = 7 * 24 * 3600;

/// Effective configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    pub timeout: Sourced<Duration>,
    pub wait_interval: Sourced<Duration>,
    pub staleness_window_secs: Sourced<u64>,
    pub user_agent: Sourced<String>,
    pub aliases: BTreeMap<String, String>,
    /// File the configuration was read from, if any.
    pub file: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            timeout: Sourced::default_value(DEFAULT_TIMEOUT),
            wait_interval: Sourced::default_value(DEFAULT_WAIT_INTERVAL),
            staleness_window_secs: Sourced::default_value(DEFAULT_STALENESS_WINDOW_SECS),
            user_agent: Sourced::default_value(
                concat!("replcheck/", env!("CARGO_PKG_VERSION")).to_string(),
            ),
            aliases: BTreeMap::new(),
            file: None,
        }
    }
}

impl AuditConfig {
    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicitly requested file must exist; the default location is
    /// optional. Environment problems are returned, not fatal.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Vec<EnvError>), ConfigError> {
        let mut config = Self::default();
        let mut parser = EnvParser::new();

        let env_path = parser.get_path("CONFIG").map(|s| s.value);
        let path = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Some(path),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(path) = path {
            debug!(path = %path.display(), "loading config file");
            let file = FileConfig::load(&path)?;
            config.apply_file(&file, &path)?;
        }

        config.apply_env(&mut parser);
        Ok((config, parser.take_errors()))
    }

    /// Overlay values from a parsed file.
    pub fn apply_file(&mut self, file: &FileConfig, path: &Path) -> Result<(), ConfigError> {
        if let Some(raw) = &file.timeout {
            let value = parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
                path: path.to_path_buf(),
                key: "timeout",
                value: raw.clone(),
            })?;
            self.timeout = Sourced::from_file(value, path);
        }
        if let Some(raw) = &file.wait_interval {
            let value = parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
                path: path.to_path_buf(),
                key: "wait_interval",
                value: raw.clone(),
            })?;
            self.wait_interval = Sourced::from_file(value, path);
        }
        if let Some(secs) = file.staleness_window_secs {
            if secs == 0 || secs > MAX_STALENESS_WINDOW_SECS {
                return Err(ConfigError::OutOfRange {
                    path: path.to_path_buf(),
                    key: "staleness_window_secs",
                    value: secs,
                    min: 1,
                    max: MAX_STALENESS_WINDOW_SECS,
                });
            }
            self.staleness_window_secs = Sourced::from_file(secs, path);
        }
        if let Some(agent) = &file.user_agent {
            self.user_agent = Sourced::from_file(agent.clone(), path);
        }
        self.aliases.extend(
            file.aliases
                .iter()
                .map(|(host, alias)| (host.to_ascii_lowercase(), alias.clone())),
        );
        self.file = Some(path.to_path_buf());
        Ok(())
    }

    /// Overlay `REPLCHECK_*` environment variables.
    pub fn apply_env(&mut self, parser: &mut EnvParser) {
        if let Some(timeout) = parser.get_duration("TIMEOUT") {
            self.timeout = timeout;
        }
        if let Some(interval) = parser.get_duration("WAIT_INTERVAL") {
            self.wait_interval = interval;
        }
        if let Some(window) =
            parser.get_u64_range("STALENESS_WINDOW_SECS", 1, MAX_STALENESS_WINDOW_SECS)
        {
            self.staleness_window_secs = window;
        }
        if let Some(agent) = parser.get_optional_string("USER_AGENT") {
            self.user_agent = agent;
        }
    }

    /// One line per setting, with its source.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "timeout = {} ({})",
                humantime::format_duration(self.timeout.value),
                self.timeout.source
            ),
            format!(
                "wait_interval = {} ({})",
                humantime::format_duration(self.wait_interval.value),
                self.wait_interval.source
            ),
            format!(
                "staleness_window_secs = {} ({})",
                self.staleness_window_secs.value, self.staleness_window_secs.source
            ),
            format!("user_agent = {} ({})", self.user_agent.value, self.user_agent.source),
        ];
        for (host, alias) in &self.aliases {
            lines.push(format!("alias {host} = {alias}"));
        }
        lines
    }
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
