//! Folds endpoint statuses into one repository verdict.

use replcheck_common::{DegradationSet, EndpointRecord, EndpointStatus, Verdict};

/// Replicas still serving clients.
pub fn count_up(endpoints: &[EndpointRecord]) -> usize {
    endpoints
        .iter()
        .filter(|e| e.role.includes_replica() && e.status.is_serving())
        .count()
}

pub fn aggregate(
    endpoints: &[EndpointRecord],
    repository_degradations: &DegradationSet,
    stale: bool,
) -> Verdict {
    if count_up(endpoints) == 0 {
        return Verdict::Down;
    }
    if stale {
        return Verdict::Stale;
    }
    let worst = endpoints
        .iter()
        .map(|e| e.status.severity())
        .max()
        .unwrap_or(0);
    if worst >= EndpointStatus::Degraded.severity() || !repository_degradations.is_empty() {
        return Verdict::Degraded;
    }
    Verdict::Healthy
}

#[cfg(test)]
mod tests {
    use super::*;
    use replcheck_common::Role;

    fn endpoint(role: Role, status: EndpointStatus) -> EndpointRecord {
        let mut record = EndpointRecord::down("http://h/cvmfs/r", "h", "h", role, "");
        record.degradations.clear();
        record.status = status;
        record
    }

    #[test]
    fn test_healthy() {
        let endpoints = vec![
            endpoint(Role::Origin, EndpointStatus::Online),
            endpoint(Role::Replica, EndpointStatus::Synchronizing),
        ];
        assert_eq!(count_up(&endpoints), 1);
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Healthy);
    }

    #[test]
    fn test_no_replicas_is_down() {
        let endpoints = vec![endpoint(Role::Origin, EndpointStatus::Online)];
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Down);
        assert_eq!(aggregate(&[], &DegradationSet::new(), false), Verdict::Down);
    }

    #[test]
    fn test_down_and_degraded_replicas() {
        let mut endpoints = vec![
            endpoint(Role::Origin, EndpointStatus::Online),
            endpoint(Role::Replica, EndpointStatus::Down),
            endpoint(Role::Replica, EndpointStatus::Degraded),
        ];
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Degraded);

        endpoints[2].status = EndpointStatus::Down;
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Down);
    }

    #[test]
    fn test_expired_replica_does_not_count_as_up() {
        let endpoints = vec![
            endpoint(Role::Origin, EndpointStatus::Online),
            endpoint(Role::Replica, EndpointStatus::Expired),
        ];
        assert_eq!(count_up(&endpoints), 0);
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Down);
    }

    #[test]
    fn test_stale_beats_degraded() {
        let endpoints = vec![
            endpoint(Role::Origin, EndpointStatus::Degraded),
            endpoint(Role::Replica, EndpointStatus::Stale),
        ];
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), true), Verdict::Stale);
    }

    #[test]
    fn test_repository_degradation_alone() {
        let endpoints = vec![endpoint(Role::OriginReplica, EndpointStatus::Online)];
        let mut repo = DegradationSet::new();
        repo.insert("no recommended replicas published");
        assert_eq!(count_up(&endpoints), 1);
        assert_eq!(aggregate(&endpoints, &repo, false), Verdict::Degraded);
    }

    #[test]
    fn test_down_origin_degrades_serving_repository() {
        let endpoints = vec![
            endpoint(Role::Origin, EndpointStatus::Down),
            endpoint(Role::Replica, EndpointStatus::Online),
        ];
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Degraded);
    }

    #[test]
    fn test_expired_origin_degrades_serving_repository() {
        let endpoints = vec![
            endpoint(Role::Origin, EndpointStatus::Expired),
            endpoint(Role::Replica, EndpointStatus::Synchronizing),
        ];
        assert_eq!(aggregate(&endpoints, &DegradationSet::new(), false), Verdict::Degraded);
    }

    #[test]
    fn test_unknown_role_not_counted() {
        let endpoints = vec![endpoint(Role::Unknown, EndpointStatus::Online)];
        assert_eq!(count_up(&endpoints), 0);
    }
}
