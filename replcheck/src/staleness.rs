//! Cross-endpoint staleness detection.
//!
//! A replica whose revision trails the origin is tolerated while the
//! origin published recently and the replica snapshotted recently.
//! Once either instant falls outside the window the replica is `stale`.

use chrono::{DateTime, TimeDelta, Utc};
use replcheck_common::{EndpointRecord, EndpointStatus};
use tracing::warn;

/// Default propagation window.
pub const STALENESS_WINDOW_SECS: u64 = 1200;

pub const LAGGING: &str = "synchronization is lagging";

/// Mark lagging replicas `stale`. Returns whether any replica was marked.
///
/// No-op when no reachable endpoint carries the origin role. Down and
/// synchronizing replicas are left alone.
pub fn detect_staleness(endpoints: &mut [EndpointRecord], now: DateTime<Utc>, window_secs: u64) -> bool {
    let Some((origin_revision, origin_update)) = endpoints
        .iter()
        .find(|e| e.role.includes_origin())
        .filter(|origin| !origin.is_down())
        .map(|origin| (origin.revision, origin.last_update))
    else {
        return false;
    };

    let window = TimeDelta::seconds(i64::try_from(window_secs).unwrap_or(i64::MAX));
    let outside = |instant: Option<DateTime<Utc>>| instant.is_some_and(|t| now - t > window);
    let origin_outside = outside(origin_update);

    let mut stale = false;
    for replica in endpoints.iter_mut().filter(|e| e.role.includes_replica()) {
        if replica.revision == origin_revision
            || matches!(
                replica.status,
                EndpointStatus::Synchronizing | EndpointStatus::Down
            )
        {
            continue;
        }
        if origin_outside || outside(replica.last_snapshot) {
            warn!(
                url = %replica.url,
                revision = replica.revision,
                origin_revision,
                "replica is lagging behind origin"
            );
            replica.status = EndpointStatus::Stale;
            replica.degradations.push(LAGGING.to_string());
            stale = true;
        }
    }
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use replcheck_common::Role;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_705_314_600, 0).unwrap()
    }

    fn endpoint(role: Role, revision: u64) -> EndpointRecord {
        let mut record = EndpointRecord::down("http://h/cvmfs/r", "h", "h", role, "");
        record.degradations.clear();
        record.status = EndpointStatus::Online;
        record.revision = revision;
        record
    }

    fn pair(origin_age: i64, snapshot_age: i64, replica_revision: u64) -> Vec<EndpointRecord> {
        let mut origin = endpoint(Role::Origin, 42);
        origin.last_update = Some(now() - TimeDelta::seconds(origin_age));
        let mut replica = endpoint(Role::Replica, replica_revision);
        replica.last_snapshot = Some(now() - TimeDelta::seconds(snapshot_age));
        vec![origin, replica]
    }

    #[test]
    fn test_threshold_boundary() {
        let mut endpoints = pair(60, 1199, 41);
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
        assert_eq!(endpoints[1].status, EndpointStatus::Online);

        let mut endpoints = pair(60, 1201, 41);
        assert!(detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
        assert_eq!(endpoints[1].status, EndpointStatus::Stale);
        assert_eq!(endpoints[1].degradations, vec![LAGGING.to_string()]);
    }

    #[test]
    fn test_exactly_at_window_is_not_stale() {
        let mut endpoints = pair(1200, 1200, 41);
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
    }

    #[test]
    fn test_old_origin_update_marks_lagging_replica() {
        let mut endpoints = pair(25 * 60, 30, 40);
        assert!(detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
        assert_eq!(endpoints[1].status, EndpointStatus::Stale);
        assert_eq!(endpoints[0].status, EndpointStatus::Online);
    }

    #[test]
    fn test_same_revision_never_stale() {
        let mut endpoints = pair(25 * 60, 25 * 60, 42);
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
    }

    #[test]
    fn test_synchronizing_and_down_are_skipped() {
        let mut endpoints = pair(25 * 60, 25 * 60, 40);
        endpoints[1].status = EndpointStatus::Synchronizing;
        let mut down = endpoint(Role::Replica, 0);
        down.status = EndpointStatus::Down;
        endpoints.push(down);
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
        assert_eq!(endpoints[1].status, EndpointStatus::Synchronizing);
        assert_eq!(endpoints[2].status, EndpointStatus::Down);
    }

    #[test]
    fn test_stale_overrides_degraded() {
        let mut endpoints = pair(25 * 60, 30, 40);
        endpoints[1].status = EndpointStatus::Degraded;
        endpoints[1].degradations.push("no meta.json exported".into());
        assert!(detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
        assert_eq!(endpoints[1].status, EndpointStatus::Stale);
        assert_eq!(endpoints[1].degradations.len(), 2);
    }

    #[test]
    fn test_no_origin_is_noop() {
        let mut endpoints = pair(25 * 60, 25 * 60, 40);
        endpoints[0].role = Role::Unknown;
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));

        let mut endpoints = pair(25 * 60, 25 * 60, 40);
        endpoints[0].status = EndpointStatus::Down;
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
    }

    #[test]
    fn test_unknown_role_ignored() {
        let mut endpoints = pair(25 * 60, 25 * 60, 40);
        endpoints[1].role = Role::Unknown;
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
    }

    #[test]
    fn test_never_snapshotted_replica_within_origin_window() {
        let mut endpoints = pair(60, 0, 40);
        endpoints[1].last_snapshot = None;
        assert!(!detect_staleness(&mut endpoints, now(), STALENESS_WINDOW_SECS));
    }

    proptest! {
        #[test]
        fn prop_stale_iff_snapshot_outside_window(age in 0i64..5000, window in 1u64..3000) {
            let mut endpoints = pair(0, age, 41);
            let stale = detect_staleness(&mut endpoints, now(), window);
            prop_assert_eq!(stale, age > window as i64);
        }
    }
}
