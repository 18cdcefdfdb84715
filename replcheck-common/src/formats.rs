//! Repository wire formats: manifest, whitelist and metainfo.
//!
//! Manifest and whitelist share a line format: one field per line, the
//! first byte is the key and the rest of the line is the value. A line
//! consisting of exactly `--` separates the fields from the binary
//! signature block, which is never inspected.
//!
//! ```text
//! C600230b0ba7620426f2e898f1e1f43c5466abf55
//! D240
//! S42
//! Natlas.cern.ch
//! T1704110400
//! --
//! <signature bytes>
//! ```

use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

use crate::timestamp::parse_whitelist_expiry;

/// Errors raised while parsing a repository file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing required field '{0}'")]
    MissingField(char),

    #[error("invalid value for field '{key}': {value}")]
    InvalidValue { key: char, value: String },

    #[error("zlib stream is corrupt: {0}")]
    Decompression(String),

    #[error("metainfo is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Iterate `(key, value)` pairs up to the signature separator.
fn fields(content: &[u8]) -> impl Iterator<Item = (char, String)> + '_ {
    content
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .take_while(|line| *line != b"--")
        .filter_map(|line| {
            let text = String::from_utf8_lossy(line);
            let mut chars = text.chars();
            let key = chars.next()?;
            Some((key, chars.as_str().trim().to_string()))
        })
}

/// Parsed `.cvmfspublished`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// `C`: root catalog hash.
    pub catalog_hash: Option<String>,
    /// `D`: time-to-live of the root catalog in seconds.
    pub ttl_seconds: Option<u64>,
    /// `G`: whether garbage collection is enabled.
    pub gc_enabled: Option<bool>,
    /// `M`: hash of the metainfo object.
    pub metainfo_hash: Option<String>,
    /// `N`: fully qualified repository name.
    pub repository: Option<String>,
    /// `S`: published revision.
    pub revision: u64,
    /// `T`: raw last-update timestamp.
    pub published: Option<String>,
}

impl Manifest {
    /// Parse manifest content. The first occurrence of each key wins.
    pub fn parse(content: &[u8]) -> Result<Self, FormatError> {
        let mut manifest = Manifest::default();
        let mut revision = None;

        for (key, value) in fields(content) {
            match key {
                'C' if manifest.catalog_hash.is_none() => manifest.catalog_hash = Some(value),
                'D' if manifest.ttl_seconds.is_none() => {
                    let ttl = value
                        .parse::<u64>()
                        .map_err(|_| FormatError::InvalidValue { key, value })?;
                    manifest.ttl_seconds = Some(ttl);
                }
                'G' if manifest.gc_enabled.is_none() => {
                    manifest.gc_enabled = Some(value.eq_ignore_ascii_case("yes"));
                }
                'M' if manifest.metainfo_hash.is_none() && !value.is_empty() => {
                    manifest.metainfo_hash = Some(value)
                }
                'N' if manifest.repository.is_none() => manifest.repository = Some(value),
                'S' if revision.is_none() => {
                    let parsed = value
                        .parse::<u64>()
                        .map_err(|_| FormatError::InvalidValue { key, value })?;
                    revision = Some(parsed);
                }
                'T' if manifest.published.is_none() => manifest.published = Some(value),
                _ => {}
            }
        }

        manifest.revision = revision.ok_or(FormatError::MissingField('S'))?;
        Ok(manifest)
    }
}

/// Parsed `.cvmfswhitelist`. Only the expiry matters here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    pub expires_at: DateTime<Utc>,
}

impl Whitelist {
    /// Parse whitelist content; the first `E` line is authoritative.
    pub fn parse(content: &[u8]) -> Result<Self, FormatError> {
        let (key, value) = fields(content)
            .find(|(key, _)| *key == 'E')
            .ok_or(FormatError::MissingField('E'))?;
        let expires_at =
            parse_whitelist_expiry(&value).ok_or(FormatError::InvalidValue { key, value })?;
        Ok(Self { expires_at })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Repository metainfo, stored compressed in the content-addressed store.
///
/// Only the keys the audit reads are kept; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metainfo {
    /// Maintainer contact address.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "recommended-stratum0")]
    pub recommended_origin: Option<String>,
    #[serde(default, rename = "recommended-stratum1s")]
    pub recommended_replicas: Option<Vec<String>>,
}

impl Metainfo {
    /// Inflate and decode a metainfo object.
    pub fn decode(compressed: &[u8]) -> Result<Self, FormatError> {
        let mut json = Vec::new();
        ZlibDecoder::new(compressed)
            .read_to_end(&mut json)
            .map_err(|e| FormatError::Decompression(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| FormatError::InvalidJson(e.to_string()))
    }
}

/// Relative path of a metainfo object: `data/<hh>/<rest>M`.
pub fn metainfo_object_path(hash: &str) -> Option<String> {
    if hash.len() <= 2 || !hash.is_ascii() {
        return None;
    }
    let (shard, rest) = hash.split_at(2);
    Some(format!("data/{shard}/{rest}M"))
}
