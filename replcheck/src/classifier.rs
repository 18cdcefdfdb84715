//! Endpoint classifier: turns a [`RawEndpoint`] into an [`EndpointRecord`].

use chrono::{DateTime, Utc};
use replcheck_common::formats::{Metainfo, metainfo_object_path};
use replcheck_common::timestamp::parse_published_timestamp;
use replcheck_common::{
    DegradationSet, EndpointRecord, EndpointStatus, Fetcher, ProbeError, Role, urls,
};
use tracing::{debug, warn};

use crate::alias::AliasTable;
use crate::prober::{RawEndpoint, fetch_optional};

/// Contact address shipped in the default metainfo template.
pub const PLACEHOLDER_CONTACT: &str = "you@organisation.org";

pub const NO_CONTACT: &str = "no contact exported";
pub const CONTACT_NOT_CONFIGURED: &str = "contact not configured";
pub const NO_ALT_PORT: &str = "doesn't listen on port 8000";
pub const NO_GEO_API: &str = "doesn't run geo-routing service";
pub const NO_RECOMMENDED_ORIGIN: &str = "no recommended origin published";
pub const NO_RECOMMENDED_REPLICAS: &str = "no recommended replicas published";

/// Origin and replica URLs the repository advertises in its metainfo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredTopology {
    pub origin: Option<String>,
    pub replicas: Option<Vec<String>>,
}

impl DeclaredTopology {
    pub fn from_metainfo(metainfo: Option<&Metainfo>) -> Self {
        match metainfo {
            Some(info) => Self {
                origin: info.recommended_origin.clone(),
                replicas: info.recommended_replicas.clone(),
            },
            None => Self::default(),
        }
    }

    /// Repository-wide issues implied by missing lists.
    pub fn degradations(&self) -> DegradationSet {
        let mut set = DegradationSet::new();
        if self.origin.is_none() {
            set.insert(NO_RECOMMENDED_ORIGIN);
        }
        if self.replicas.is_none() {
            set.insert(NO_RECOMMENDED_REPLICAS);
        }
        set
    }

    /// Declared origin first, then replicas, in published order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.origin
            .iter()
            .chain(self.replicas.iter().flatten())
            .map(String::as_str)
    }
}

/// Result of classifying one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub record: EndpointRecord,
    /// Topology used for role inference. For the primary target this is
    /// read from its own metainfo.
    pub topology: DeclaredTopology,
    pub repository_degradations: DegradationSet,
}

/// Role of `url` within `topology`, by normalized string equality.
pub fn classify_role(url: &str, topology: &DeclaredTopology) -> Role {
    let url = urls::normalize(url);
    let is_origin = topology
        .origin
        .as_deref()
        .is_some_and(|origin| urls::normalize(origin) == url);
    let is_replica = topology
        .replicas
        .iter()
        .flatten()
        .any(|replica| urls::normalize(replica) == url);
    Role::from_membership(is_origin, is_replica)
}

/// Per-endpoint status before cross-endpoint staleness is applied.
pub fn evaluate_status(is_snapshotting: bool, has_degradations: bool, expired: bool) -> EndpointStatus {
    let mut status = EndpointStatus::Online;
    if is_snapshotting {
        status = EndpointStatus::Synchronizing;
    }
    if has_degradations {
        status = EndpointStatus::Degraded;
    }
    if expired {
        status = EndpointStatus::Expired;
    }
    status
}

/// Fetch and decode the metainfo object named by the manifest.
///
/// A missing object yields `None`. An object that cannot be decompressed
/// or decoded is a [`ProbeError::DecompressionFailure`].
pub fn resolve_metainfo<F: Fetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    metainfo_hash: Option<&str>,
) -> Result<Option<Metainfo>, ProbeError> {
    let Some(hash) = metainfo_hash else {
        return Ok(None);
    };
    let Some(path) = metainfo_object_path(hash) else {
        return Err(ProbeError::MalformedManifest {
            url: urls::join(url, urls::MANIFEST),
            reason: format!("metainfo hash '{hash}' is not a content hash"),
        });
    };
    let object_url = urls::join(url, &path);
    let Some(body) = fetch_optional(fetcher, &object_url) else {
        warn!(url = %object_url, "metainfo object not available");
        return Ok(None);
    };
    Metainfo::decode(&body)
        .map(Some)
        .map_err(|e| ProbeError::DecompressionFailure {
            url: object_url,
            reason: e.to_string(),
        })
}

/// Classify one probed endpoint.
///
/// `declared` is the topology published by the primary target; pass `None`
/// when classifying the primary itself so its own metainfo is used.
pub fn classify<F: Fetcher + ?Sized>(
    fetcher: &F,
    raw: RawEndpoint,
    declared: Option<&DeclaredTopology>,
    aliases: &AliasTable,
    now: DateTime<Utc>,
) -> Result<Classification, ProbeError> {
    let RawEndpoint {
        url,
        host,
        manifest,
        whitelist,
        last_snapshot,
        is_snapshotting,
        mut degradations,
        ..
    } = raw;

    let last_update = manifest.published.as_deref().and_then(|text| {
        let parsed = parse_published_timestamp(text);
        if parsed.is_none() {
            warn!(url = %url, value = text, "unparseable manifest timestamp");
        }
        parsed
    });

    let last_snapshot = match last_snapshot.as_deref() {
        Some(text) => {
            let parsed = parse_published_timestamp(text);
            if parsed.is_none() {
                warn!(url = %url, value = text, "unparseable last-snapshot marker");
                degradations.push("last snapshot marker is unreadable".to_string());
            }
            parsed
        }
        None => None,
    };

    let metainfo = resolve_metainfo(fetcher, &url, manifest.metainfo_hash.as_deref())?;

    let contact = metainfo.as_ref().and_then(|info| info.email.clone());
    match contact.as_deref() {
        None => degradations.push(NO_CONTACT.to_string()),
        Some(PLACEHOLDER_CONTACT) => degradations.push(CONTACT_NOT_CONFIGURED.to_string()),
        Some(_) => {}
    }

    let topology = match declared {
        Some(topology) => topology.clone(),
        None => DeclaredTopology::from_metainfo(metainfo.as_ref()),
    };
    let role = classify_role(&url, &topology);
    let repository_degradations = topology.degradations();

    let alt_port_ok = urls::with_port(&url, urls::ALT_PORT)
        .map(|alt| head_ok(fetcher, &urls::join(&alt, urls::MANIFEST)))
        .unwrap_or(false);
    if !alt_port_ok {
        degradations.push(NO_ALT_PORT.to_string());
    }

    if role.includes_replica() && !head_ok(fetcher, &urls::geo_api(&url, &host)) {
        degradations.push(NO_GEO_API.to_string());
    }

    let expired = whitelist.is_expired(now);
    let status = evaluate_status(is_snapshotting, !degradations.is_empty(), expired);
    if status != EndpointStatus::Online {
        debug!(url = %url, status = %status, issues = ?degradations, "endpoint not fully healthy");
    }

    let record = EndpointRecord {
        alias: aliases.resolve(&host),
        url,
        host,
        role,
        revision: manifest.revision,
        last_update,
        last_snapshot,
        ttl_seconds: manifest.ttl_seconds,
        whitelist_expiry: Some(whitelist.expires_at),
        contact,
        repository: manifest.repository,
        catalog_hash: manifest.catalog_hash,
        gc_enabled: manifest.gc_enabled,
        metainfo_hash: manifest.metainfo_hash,
        degradations,
        status,
    };

    Ok(Classification {
        record,
        topology,
        repository_degradations,
    })
}

/// Fold the role a declared URL implies into an already classified
/// record for the same host.
///
/// A reachable record that only now becomes a replica gets the geo API
/// check it skipped during classification.
pub fn adopt_declared_role<F: Fetcher + ?Sized>(
    fetcher: &F,
    record: &mut EndpointRecord,
    declared: Role,
) {
    let merged = Role::from_membership(
        record.role.includes_origin() || declared.includes_origin(),
        record.role.includes_replica() || declared.includes_replica(),
    );
    if merged == record.role {
        return;
    }
    debug!(url = %record.url, from = %record.role, to = %merged, "host declared under another URL");
    let gained_replica = merged.includes_replica() && !record.role.includes_replica();
    record.role = merged;

    if gained_replica && !record.is_down() && !head_ok(fetcher, &urls::geo_api(&record.url, &record.host)) {
        record.degradations.push(NO_GEO_API.to_string());
        if matches!(record.status, EndpointStatus::Online | EndpointStatus::Synchronizing) {
            record.status = EndpointStatus::Degraded;
        }
    }
}

/// HEAD probe where transport errors count as absence.
fn head_ok<F: Fetcher + ?Sized>(fetcher: &F, url: &str) -> bool {
    match fetcher.head(url) {
        Ok(found) => found,
        Err(e) => {
            debug!(url, error = %e, "HEAD probe failed");
            false
        }
    }
}
