//! Shared types, wire formats and transport for replcheck.
//!
//! The `replcheck` crate builds the assessment pipeline on top of these
//! pieces; everything here is free of decision logic.

pub mod config;
pub mod errors;
pub mod formats;
pub mod logging;
pub mod mock_endpoint;
pub mod timestamp;
pub mod transport;
pub mod types;
pub mod urls;

pub use config::{AuditConfig, ConfigError, ConfigSource, EnvError, EnvParser, FileConfig, Sourced};
pub use errors::{FetchError, ProbeError};
pub use formats::{FormatError, Manifest, Metainfo, Whitelist};
pub use logging::{LogConfig, LogFormat, LoggingError, LoggingGuards, init_logging};
pub use mock_endpoint::{MockFetcher, MockRequest};
pub use transport::{Fetcher, HttpFetcher, TransportOptions};
pub use types::{
    DegradationSet, EndpointRecord, EndpointStatus, RepositoryAssessment, Role, Verdict,
};
