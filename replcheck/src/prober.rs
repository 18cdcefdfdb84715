//! Endpoint prober: the raw fetches that describe one repository URL.
//!
//! Manifest and whitelist are load-bearing; failing to load or parse
//! either one fails the probe. Everything else is best effort and turns
//! into a degradation message on the raw record.

use replcheck_common::formats::{Manifest, Whitelist};
use replcheck_common::{Fetcher, ProbeError, urls};
use tracing::{debug, warn};

/// Host-wide info documents and the message recorded when one is missing.
const INFO_DOCUMENTS: [(&str, &str); 2] = [
    ("meta.json", "no meta.json exported"),
    ("repositories.json", "no repositories.json exported"),
];

/// Everything fetched from one endpoint, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEndpoint {
    /// Normalized base URL.
    pub url: String,
    pub host: String,
    pub manifest: Manifest,
    pub whitelist: Whitelist,
    pub meta_json: Option<serde_json::Value>,
    pub repositories_json: Option<serde_json::Value>,
    /// Raw content of the last-snapshot marker, trimmed.
    pub last_snapshot: Option<String>,
    /// The snapshot-in-progress marker exists.
    pub is_snapshotting: bool,
    /// Issues found while probing, in discovery order.
    pub degradations: Vec<String>,
}

/// Fetch and parse the state of the repository at `url`.
pub fn probe<F: Fetcher + ?Sized>(fetcher: &F, url: &str) -> Result<RawEndpoint, ProbeError> {
    let url = urls::normalize(url).to_string();
    let host = urls::host_of(&url).ok_or_else(|| ProbeError::unreachable(&url, "not a valid URL"))?;
    debug!(url = %url, "probing endpoint");

    let manifest_url = urls::join(&url, urls::MANIFEST);
    let manifest = Manifest::parse(&fetch_required(fetcher, &manifest_url)?).map_err(|e| {
        ProbeError::MalformedManifest {
            url: manifest_url.clone(),
            reason: e.to_string(),
        }
    })?;

    let whitelist_url = urls::join(&url, urls::WHITELIST);
    let whitelist = Whitelist::parse(&fetch_required(fetcher, &whitelist_url)?).map_err(|e| {
        ProbeError::MalformedWhitelist {
            url: whitelist_url.clone(),
            reason: e.to_string(),
        }
    })?;

    let mut degradations = Vec::new();
    let [meta_json, repositories_json] = INFO_DOCUMENTS.map(|(document, missing)| {
        let Some(doc_url) = urls::info_document(&url, document) else {
            degradations.push(missing.to_string());
            return None;
        };
        match fetch_optional(fetcher, &doc_url) {
            Some(body) => match serde_json::from_slice::<serde_json::Value>(&body) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(url = %doc_url, error = %e, "info document is not valid JSON");
                    degradations.push(format!("{document} is not valid JSON"));
                    None
                }
            },
            None => {
                degradations.push(missing.to_string());
                None
            }
        }
    });

    let last_snapshot = fetch_optional(fetcher, &urls::join(&url, urls::LAST_SNAPSHOT))
        .map(|body| String::from_utf8_lossy(&body).trim().to_string())
        .filter(|text| !text.is_empty());
    let is_snapshotting =
        fetch_optional(fetcher, &urls::join(&url, urls::IS_SNAPSHOTTING)).is_some();

    debug!(
        url = %url,
        revision = manifest.revision,
        snapshotting = is_snapshotting,
        issues = degradations.len(),
        "probe complete"
    );

    Ok(RawEndpoint {
        url,
        host,
        manifest,
        whitelist,
        meta_json,
        repositories_json,
        last_snapshot,
        is_snapshotting,
        degradations,
    })
}

/// A resource the endpoint cannot be assessed without.
fn fetch_required<F: Fetcher + ?Sized>(fetcher: &F, url: &str) -> Result<Vec<u8>, ProbeError> {
    match fetcher.get(url) {
        Ok(Some(body)) => Ok(body),
        Ok(None) => Err(ProbeError::unreachable(url, "not found")),
        Err(e) => Err(e.into()),
    }
}

/// A resource whose absence is only a degradation.
pub(crate) fn fetch_optional<F: Fetcher + ?Sized>(fetcher: &F, url: &str) -> Option<Vec<u8>> {
    match fetcher.get(url) {
        Ok(body) => body,
        Err(e) => {
            debug!(url, error = %e, "optional resource unavailable");
            None
        }
    }
}
