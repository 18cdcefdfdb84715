//! Revision-wait loop.

use std::time::Duration;

use replcheck_common::{Fetcher, RepositoryAssessment, Verdict};
use tracing::{info, warn};

use crate::clock::{Clock, Sleeper};
use crate::pipeline::{AuditError, Auditor};

/// Final assessment of a wait loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome {
    pub assessment: RepositoryAssessment,
    /// Number of assessments performed, at least one.
    pub attempts: u32,
    /// Every reachable endpoint serves the target. Always true without a target.
    pub target_reached: bool,
}

/// Assess `url` until the lowest reachable revision is at least `target`,
/// sleeping `interval` between attempts.
///
/// Returns after a single assessment when `target` is `None`, and as soon
/// as an assessment comes back `DOWN!`.
pub fn wait_for_revision<F: Fetcher, C: Clock, S: Sleeper + ?Sized>(
    auditor: &Auditor<F, C>,
    url: &str,
    target: Option<u64>,
    interval: Duration,
    sleeper: &S,
) -> Result<WaitOutcome, AuditError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let assessment = auditor.assess(url)?;

        let Some(target) = target else {
            return Ok(WaitOutcome {
                assessment,
                attempts,
                target_reached: true,
            });
        };

        if assessment.verdict == Verdict::Down {
            warn!(attempt = attempts, target, "repository is down, giving up");
            return Ok(WaitOutcome {
                assessment,
                attempts,
                target_reached: false,
            });
        }

        let min_revision = assessment.min_revision();
        if min_revision >= i64::try_from(target).unwrap_or(i64::MAX) {
            info!(attempt = attempts, min_revision, target, "target revision reached");
            return Ok(WaitOutcome {
                assessment,
                attempts,
                target_reached: true,
            });
        }

        info!(
            attempt = attempts,
            min_revision,
            target,
            interval = %humantime::format_duration(interval),
            "waiting for revision to propagate"
        );
        sleeper.sleep(interval);
    }
}
