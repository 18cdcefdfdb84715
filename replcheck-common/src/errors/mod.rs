//! Error types shared by the transport and the endpoint prober.
//!
//! | Error                 | Scope                                             |
//! |-----------------------|---------------------------------------------------|
//! | `FetchError`          | One HTTP request (timeout, refused, bad status)   |
//! | `ProbeError`          | One endpoint; fatal for that endpoint             |
//!
//! Missing optional resources (meta.json, contact, port 8000, geo API) are
//! never errors: they become degradation messages on the endpoint record.

use thiserror::Error;

/// Failure of a single transport request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("cannot reach {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. } => url,
        }
    }
}

/// Endpoint-fatal probe failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("{url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("malformed manifest at {url}: {reason}")]
    MalformedManifest { url: String, reason: String },

    #[error("malformed whitelist at {url}: {reason}")]
    MalformedWhitelist { url: String, reason: String },

    #[error("cannot decode metainfo object {url}: {reason}")]
    DecompressionFailure { url: String, reason: String },
}

impl ProbeError {
    /// Whether the endpoint simply could not be reached.
    ///
    /// Unreachable endpoints are recorded as `down` even when they are the
    /// primary target; every other variant aborts the run on the primary.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    pub fn unreachable(url: &str, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<FetchError> for ProbeError {
    fn from(err: FetchError) -> Self {
        let url = err.url().to_string();
        Self::Unreachable {
            url,
            reason: err.to_string(),
        }
    }
}
