//! Replication health audit for stratum 0 / stratum 1 repository mirrors.
//!
//! Pipeline: [`prober`] → [`classifier`] → [`staleness`] → [`aggregate`],
//! driven by [`pipeline::Auditor`] and optionally repeated by [`wait`].

pub mod aggregate;
pub mod alias;
pub mod classifier;
pub mod clock;
pub mod pipeline;
pub mod prober;
pub mod render;
pub mod staleness;
pub mod wait;

pub use alias::AliasTable;
pub use clock::{Clock, Sleeper, SystemClock, ThreadSleeper};
pub use pipeline::{AuditError, Auditor};
pub use wait::{WaitOutcome, wait_for_revision};
