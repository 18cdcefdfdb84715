//! Common types used across replcheck components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of an endpoint within the repository's declared topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// URL matches neither the declared origin nor any declared replica.
    #[default]
    Unknown,
    /// Stratum 0: the authoritative publisher.
    Origin,
    /// Stratum 1: a read-only mirror.
    Replica,
    /// Declared both as origin and as one of the replicas.
    OriginReplica,
}

impl Role {
    pub fn includes_origin(self) -> bool {
        matches!(self, Self::Origin | Self::OriginReplica)
    }

    pub fn includes_replica(self) -> bool {
        matches!(self, Self::Replica | Self::OriginReplica)
    }

    /// Build a role from the two independent membership tests.
    pub fn from_membership(is_origin: bool, is_replica: bool) -> Self {
        match (is_origin, is_replica) {
            (true, true) => Self::OriginReplica,
            (true, false) => Self::Origin,
            (false, true) => Self::Replica,
            (false, false) => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Origin => write!(f, "origin"),
            Self::Replica => write!(f, "replica"),
            Self::OriginReplica => write!(f, "origin+replica"),
        }
    }
}

/// Condition of a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    /// Reachable, current, nothing to report.
    Online,
    /// A snapshot from the origin is running right now.
    Synchronizing,
    /// Reachable, but at least one degradation was recorded.
    Degraded,
    /// The whitelist (trust anchor) expiry lies in the past.
    Expired,
    /// Replica trails the origin beyond the staleness window.
    Stale,
    /// Manifest or whitelist could not be loaded.
    Down,
}

impl EndpointStatus {
    /// Aggregation precedence; higher wins.
    ///
    /// `down` > `stale` > `degraded`/`expired` > `synchronizing`/`online`.
    pub fn severity(self) -> u8 {
        match self {
            Self::Online | Self::Synchronizing => 0,
            Self::Degraded | Self::Expired => 1,
            Self::Stale => 2,
            Self::Down => 3,
        }
    }

    /// Whether a replica in this state still serves clients.
    ///
    /// `expired` does not count: content behind an expired whitelist
    /// cannot be verified by clients.
    pub fn is_serving(self) -> bool {
        matches!(
            self,
            Self::Online | Self::Synchronizing | Self::Degraded | Self::Stale
        )
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Synchronizing => write!(f, "synchronizing"),
            Self::Degraded => write!(f, "degraded"),
            Self::Expired => write!(f, "expired"),
            Self::Stale => write!(f, "stale"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Overall verdict for a repository. The numeric codes are a stable
/// contract for automation (they double as process exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Healthy,
    Degraded,
    Stale,
    Down,
}

impl Verdict {
    pub fn code(self) -> i32 {
        match self {
            Self::Healthy => 0,
            Self::Degraded => 1,
            Self::Stale => 2,
            Self::Down => 3,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Degraded => "DEGRADED!",
            Self::Stale => "STALE!",
            Self::Down => "DOWN!",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Insertion-ordered set of degradation messages, deduplicated by text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DegradationSet {
    messages: Vec<String>,
}

impl DegradationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message. Returns `false` if it was already present.
    pub fn insert(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.messages.contains(&message) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Merge another set into this one, keeping first-seen order.
    pub fn merge(&mut self, other: DegradationSet) {
        for message in other.messages {
            self.insert(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn contains(&self, message: &str) -> bool {
        self.messages.iter().any(|m| m == message)
    }
}

/// Fully classified state of one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Base URL of the repository on this host.
    pub url: String,
    pub host: String,
    /// Human-friendly host name; the host itself when no alias is known.
    pub alias: String,
    pub role: Role,
    /// Published revision; `0` when the endpoint could not be reached.
    pub revision: u64,
    /// Last manifest publication.
    pub last_update: Option<DateTime<Utc>>,
    /// Last successful snapshot; `None` when the endpoint never synced.
    pub last_snapshot: Option<DateTime<Utc>>,
    pub ttl_seconds: Option<u64>,
    /// Expiry of the repository whitelist.
    pub whitelist_expiry: Option<DateTime<Utc>>,
    /// Maintainer contact; `None` when not exported.
    pub contact: Option<String>,
    /// Repository name from the manifest (`N`).
    pub repository: Option<String>,
    /// Root catalog hash from the manifest (`C`).
    pub catalog_hash: Option<String>,
    /// Garbage-collection marker from the manifest (`G`).
    pub gc_enabled: Option<bool>,
    /// Metainfo object hash from the manifest (`M`).
    pub metainfo_hash: Option<String>,
    pub degradations: Vec<String>,
    pub status: EndpointStatus,
}

impl EndpointRecord {
    /// Record for an endpoint whose manifest or whitelist could not be loaded.
    pub fn down(
        url: impl Into<String>,
        host: impl Into<String>,
        alias: impl Into<String>,
        role: Role,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
            alias: alias.into(),
            role,
            revision: 0,
            last_update: None,
            last_snapshot: None,
            ttl_seconds: None,
            whitelist_expiry: None,
            contact: None,
            repository: None,
            catalog_hash: None,
            gc_enabled: None,
            metainfo_hash: None,
            degradations: vec![reason.into()],
            status: EndpointStatus::Down,
        }
    }

    pub fn is_down(&self) -> bool {
        self.status == EndpointStatus::Down
    }
}

/// The whole endpoint set for one repository at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAssessment {
    /// URL the caller asked about.
    pub primary_url: String,
    /// Repository name as published by the primary target, if reachable.
    pub repository: Option<String>,
    pub endpoints: Vec<EndpointRecord>,
    /// Degradations that belong to the repository rather than one endpoint.
    pub repository_degradations: DegradationSet,
    /// Set by the staleness detector when any replica lags.
    pub stale: bool,
    /// Replicas still serving clients.
    pub num_up: usize,
    pub verdict: Verdict,
    pub assessed_at: DateTime<Utc>,
}

impl RepositoryAssessment {
    /// Lowest revision among reachable endpoints; `-1` if none are reachable.
    pub fn min_revision(&self) -> i64 {
        self.endpoints
            .iter()
            .filter(|e| !e.is_down())
            .map(|e| i64::try_from(e.revision).unwrap_or(i64::MAX))
            .min()
            .unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(revision: u64, status: EndpointStatus) -> EndpointRecord {
        let mut r = EndpointRecord::down("http://h/cvmfs/r", "h", "h", Role::Replica, "x");
        r.revision = revision;
        r.status = status;
        r.degradations.clear();
        r
    }

    fn assessment(endpoints: Vec<EndpointRecord>) -> RepositoryAssessment {
        RepositoryAssessment {
            primary_url: "http://h/cvmfs/r".into(),
            repository: None,
            endpoints,
            repository_degradations: DegradationSet::new(),
            stale: false,
            num_up: 0,
            verdict: Verdict::Healthy,
            assessed_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_membership() {
        assert_eq!(Role::from_membership(true, true), Role::OriginReplica);
        assert_eq!(Role::from_membership(true, false), Role::Origin);
        assert_eq!(Role::from_membership(false, true), Role::Replica);
        assert_eq!(Role::from_membership(false, false), Role::Unknown);
        assert!(Role::OriginReplica.includes_origin());
        assert!(Role::OriginReplica.includes_replica());
        assert!(!Role::Unknown.includes_replica());
        assert_eq!(Role::OriginReplica.to_string(), "origin+replica");
    }

    #[test]
    fn test_status_severity_order() {
        use EndpointStatus::*;
        assert!(Down.severity() > Stale.severity());
        assert!(Stale.severity() > Degraded.severity());
        assert_eq!(Degraded.severity(), Expired.severity());
        assert!(Degraded.severity() > Synchronizing.severity());
        assert_eq!(Online.severity(), Synchronizing.severity());
    }

    #[test]
    fn test_expired_is_not_serving() {
        assert!(!EndpointStatus::Expired.is_serving());
        assert!(!EndpointStatus::Down.is_serving());
        assert!(EndpointStatus::Stale.is_serving());
        assert!(EndpointStatus::Synchronizing.is_serving());
    }

    #[test]
    fn test_verdict_codes_are_stable() {
        assert_eq!(Verdict::Healthy.code(), 0);
        assert_eq!(Verdict::Degraded.code(), 1);
        assert_eq!(Verdict::Stale.code(), 2);
        assert_eq!(Verdict::Down.code(), 3);
        assert_eq!(Verdict::Down.to_string(), "DOWN!");
        assert_eq!(Verdict::Healthy.text(), "HEALTHY");
    }

    #[test]
    fn test_degradation_set_dedups_by_text() {
        let mut set = DegradationSet::new();
        assert!(set.insert("no recommended replicas published"));
        assert!(!set.insert("no recommended replicas published"));
        assert!(set.insert("no recommended origin published"));

        let mut other = DegradationSet::new();
        other.insert("no recommended origin published");
        other.insert("something else");
        set.merge(other);

        let messages: Vec<&str> = set.iter().collect();
        assert_eq!(
            messages,
            vec![
                "no recommended replicas published",
                "no recommended origin published",
                "something else"
            ]
        );
    }

    #[test]
    fn test_down_record_has_zero_revision() {
        let r = EndpointRecord::down("u", "h", "a", Role::Replica, "unreachable");
        assert_eq!(r.revision, 0);
        assert_eq!(r.status, EndpointStatus::Down);
        assert_eq!(r.degradations, vec!["unreachable".to_string()]);
    }

    #[test]
    fn test_min_revision_ignores_down_endpoints() {
        let a = assessment(vec![
            record(5, EndpointStatus::Online),
            record(7, EndpointStatus::Degraded),
            record(0, EndpointStatus::Down),
        ]);
        assert_eq!(a.min_revision(), 5);
    }

    #[test]
    fn test_min_revision_all_down_is_negative_one() {
        let a = assessment(vec![record(0, EndpointStatus::Down)]);
        assert_eq!(a.min_revision(), -1);
        assert_eq!(assessment(Vec::new()).min_revision(), -1);
    }

    #[test]
    fn test_min_revision_saturates_instead_of_wrapping() {
        let a = assessment(vec![record(u64::MAX, EndpointStatus::Online)]);
        assert_eq!(a.min_revision(), i64::MAX);

        let a = assessment(vec![
            record(u64::MAX, EndpointStatus::Online),
            record(9, EndpointStatus::Online),
        ]);
        assert_eq!(a.min_revision(), 9);
    }

    #[test]
    fn test_json_shape_uses_snake_case() {
        let r = record(42, EndpointStatus::Synchronizing);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "synchronizing");
        assert_eq!(json["role"], "replica");
        assert_eq!(json["revision"], 42);
    }
}
