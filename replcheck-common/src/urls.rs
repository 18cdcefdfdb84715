//! URL helpers for repository endpoints.
//!
//! A repository URL has the shape `http://<host>[:port]/cvmfs/<repo>`.
//! Every file the prober needs is addressed relative to it, except the
//! host-wide info documents under `/cvmfs/info/v1/`.

use url::Url;

/// Manifest file name.
pub const MANIFEST: &str = ".cvmfspublished";
/// Whitelist file name.
pub const WHITELIST: &str = ".cvmfswhitelist";
/// Written by a replica after each successful snapshot.
pub const LAST_SNAPSHOT: &str = ".cvmfs_last_snapshot";
/// Present while a replica snapshot is running.
pub const IS_SNAPSHOTTING: &str = ".cvmfs_is_snapshotting";
/// Port replicas are expected to serve on besides 80.
pub const ALT_PORT: u16 = 8000;

/// Trim a trailing slash so URLs compare by string equality.
pub fn normalize(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// Host component of a URL, lower-cased.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(normalize(url)).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// `<base>/<relative>`.
pub fn join(base: &str, relative: &str) -> String {
    format!("{}/{}", normalize(base), relative.trim_start_matches('/'))
}

/// Same URL, served on another port.
pub fn with_port(url: &str, port: u16) -> Option<String> {
    let mut parsed = Url::parse(normalize(url)).ok()?;
    parsed.set_port(Some(port)).ok()?;
    Some(normalize(parsed.as_str()).to_string())
}

/// Host-wide info document, e.g. `http://<host>/cvmfs/info/v1/meta.json`.
pub fn info_document(url: &str, document: &str) -> Option<String> {
    let mut parsed = Url::parse(normalize(url)).ok()?;
    parsed.set_path(&format!("/cvmfs/info/v1/{document}"));
    parsed.set_query(None);
    Some(parsed.to_string())
}

/// Geo-routing API probe path for this endpoint.
pub fn geo_api(url: &str, host: &str) -> String {
    join(url, &format!("api/v1.0/geo/{host}/{host}"))
}
