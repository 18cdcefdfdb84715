//! Blocking HTTP transport used by the prober.
//!
//! Everything the assessment needs from the network goes through the
//! [`Fetcher`] trait, so tests can substitute [`crate::MockFetcher`].

use std::time::Duration;
use tracing::debug;

use crate::errors::FetchError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on response body size (manifests and metainfo are tiny).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Network access as seen by the assessment pipeline.
pub trait Fetcher {
    /// GET a resource. `Ok(None)` means the server answered but the
    /// resource does not exist.
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError>;

    /// HEAD a resource. `Ok(true)` on a 2xx answer.
    fn head(&self, url: &str) -> Result<bool, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        (**self).get(url)
    }

    fn head(&self, url: &str) -> Result<bool, FetchError> {
        (**self).head(url)
    }
}

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Bound on every request, connect included.
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("replcheck/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// [`Fetcher`] backed by a `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(options: &TransportOptions) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            user_agent: options.user_agent.clone(),
            max_body_bytes: options.max_body_bytes,
        }
    }
}

fn transport_error(url: &str, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Timeout(_) => FetchError::Timeout {
            url: url.to_string(),
        },
        other => FetchError::Transport {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "GET");
        if status.is_client_error() {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(body))
    }

    fn head(&self, url: &str) -> Result<bool, FetchError> {
        let response = self
            .agent
            .head(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| transport_error(url, e))?;
        debug!(url, status = response.status().as_u16(), "HEAD");
        Ok(response.status().is_success())
    }
}
