//! Shared helpers for replcheck integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::sync::Once;

use chrono::{DateTime, TimeDelta, Utc};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use replcheck::Auditor;
use replcheck::clock::FixedClock;
use replcheck_common::{MockFetcher, urls};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("replcheck=debug,replcheck_common=debug"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer().with_target(true))
            .with(filter)
            .init();
    });
}

pub fn fixture(name: &str) -> &'static str {
    match name {
        "cvmfspublished_sample.txt" => include_str!("../fixtures/cvmfspublished_sample.txt"),
        "cvmfswhitelist_sample.txt" => include_str!("../fixtures/cvmfswhitelist_sample.txt"),
        other => panic!("unknown fixture: {other}"),
    }
}

pub const REPO: &str = "repo.example.org";
pub const METAINFO_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4";

/// 2024-01-15 10:30:00 UTC
pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_705_314_600, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - TimeDelta::minutes(minutes)
}

pub fn repo_url(host: &str) -> String {
    format!("http://{host}/cvmfs/{REPO}")
}

pub fn auditor(mock: &MockFetcher) -> Auditor<MockFetcher, FixedClock> {
    Auditor::new(mock.clone()).with_clock(FixedClock(now()))
}

/// One endpoint served by a [`MockFetcher`]. Defaults describe an endpoint
/// with nothing to complain about.
#[derive(Debug, Clone)]
pub struct EndpointFixture {
    pub host: String,
    pub revision: u64,
    pub published: DateTime<Utc>,
    pub last_snapshot: Option<DateTime<Utc>>,
    pub whitelist_expiry: &'static str,
    pub contact: Option<String>,
    pub declared_origin: Option<String>,
    pub declared_replicas: Option<Vec<String>>,
    pub snapshotting: bool,
    pub alt_port: bool,
    pub geo_api: bool,
}

impl EndpointFixture {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            revision: 42,
            published: minutes_ago(5),
            last_snapshot: None,
            whitelist_expiry: "20990101000000",
            contact: Some("ops@example.org".to_string()),
            declared_origin: None,
            declared_replicas: None,
            snapshotting: false,
            alt_port: true,
            geo_api: true,
        }
    }

    pub fn url(&self) -> String {
        repo_url(&self.host)
    }

    pub fn revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published = at;
        self
    }

    pub fn last_snapshot(mut self, at: DateTime<Utc>) -> Self {
        self.last_snapshot = Some(at);
        self
    }

    pub fn declares(mut self, origin: &str, replicas: &[String]) -> Self {
        self.declared_origin = Some(origin.to_string());
        self.declared_replicas = Some(replicas.to_vec());
        self
    }

    pub fn without_geo_api(mut self) -> Self {
        self.geo_api = false;
        self
    }

    pub fn serve(&self, mock: &MockFetcher) {
        self.serve_at(mock, &self.url());
    }

    /// Serve this endpoint's repository files under `base` instead of
    /// [`Self::url`]. Host-wide documents still use `self.host`.
    pub fn serve_at(&self, mock: &MockFetcher, base: &str) {
        mock.serve(
            urls::join(base, urls::MANIFEST),
            format!(
                "C600230b0ba7620426f2e898f1e1f43c5466abf55\nB15360\nD240\nGno\nM{METAINFO_HASH}\nN{REPO}\nS{}\nT{}\n--\n0123abcd\nsignature-bytes",
                self.revision,
                self.published.timestamp()
            ),
        );
        mock.serve(
            urls::join(base, urls::WHITELIST),
            format!(
                "20240101000000\nE{}\nN{REPO}\n2D:6A:1B:11:8D:64:2F:C1\n--\n0123abcd\nsignature-bytes",
                self.whitelist_expiry
            ),
        );
        mock.serve(format!("http://{}/cvmfs/info/v1/meta.json", self.host), "{}");
        mock.serve(
            format!("http://{}/cvmfs/info/v1/repositories.json", self.host),
            r#"{"schema":1,"repositories":[]}"#,
        );
        mock.serve(
            urls::join(base, &format!("data/{}/{}M", &METAINFO_HASH[..2], &METAINFO_HASH[2..])),
            zlib(&self.metainfo_json()),
        );
        if let Some(at) = self.last_snapshot {
            mock.serve(
                urls::join(base, urls::LAST_SNAPSHOT),
                format!("{}\n", at.format("%a %b %d %H:%M:%S UTC %Y")),
            );
        }
        if self.snapshotting {
            mock.serve(urls::join(base, urls::IS_SNAPSHOTTING), "");
        }
        if self.alt_port {
            let alt = urls::with_port(base, urls::ALT_PORT).unwrap();
            mock.serve_head(urls::join(&alt, urls::MANIFEST));
        }
        if self.geo_api {
            mock.serve_head(urls::geo_api(base, &self.host));
        }
    }

    fn metainfo_json(&self) -> String {
        let mut doc = serde_json::json!({
            "administrator": "Repository Operations",
            "organisation": "Example Lab",
            "description": "test repository",
        });
        if let Some(contact) = &self.contact {
            doc["email"] = contact.clone().into();
        }
        if let Some(origin) = &self.declared_origin {
            doc["recommended-stratum0"] = origin.clone().into();
        }
        if let Some(replicas) = &self.declared_replicas {
            doc["recommended-stratum1s"] = replicas.clone().into();
        }
        doc.to_string()
    }
}

fn zlib(json: &str) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).unwrap();
    encoder.finish().unwrap()
}
