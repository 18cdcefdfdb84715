//! Timestamp formats found on repository endpoints.
//!
//! - whitelist expiry: compact `YYYYMMDDHHMMSS`, always UTC
//! - manifest `T` line: seconds since the epoch
//! - snapshot marker and older manifests: `date`-style text,
//!   `Www Mon DD HH:MM:SS TZ YYYY`

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

const WHITELIST_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a whitelist expiry (`20240101120000`) as a UTC instant.
pub fn parse_whitelist_expiry(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, WHITELIST_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Inverse of [`parse_whitelist_expiry`].
pub fn format_whitelist_expiry(instant: &DateTime<Utc>) -> String {
    instant.format(WHITELIST_FORMAT).to_string()
}

/// Parse a publication or snapshot timestamp.
///
/// All-digit values are epoch seconds; anything else goes through
/// [`parse_verbose_timestamp`].
pub fn parse_published_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = value.parse().ok()?;
        return Utc.timestamp_opt(secs, 0).single();
    }
    parse_verbose_timestamp(value)
}

/// Parse `date`-style text such as `Mon Jan 15 10:30:00 UTC 2024`.
///
/// A `UTC`/`GMT` zone token is honoured. Any other zone name (or none)
/// is interpreted in the local timezone of this process.
pub fn parse_verbose_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_verbose_timestamp_in(value, &Local)
}

/// [`parse_verbose_timestamp`] with `fallback` standing in for the local
/// timezone.
pub fn parse_verbose_timestamp_in<Tz: TimeZone>(value: &str, fallback: &Tz) -> Option<DateTime<Utc>> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let (month, day, time, zone, year) = match tokens.as_slice() {
        [_weekday, month, day, time, zone, year] => (*month, *day, *time, Some(*zone), *year),
        [_weekday, month, day, time, year] => (*month, *day, *time, None, *year),
        _ => {
            debug!(value, "unrecognised timestamp layout");
            return None;
        }
    };

    let normalized = format!("{month} {day} {time} {year}");
    let naive = match NaiveDateTime::parse_from_str(&normalized, "%b %d %H:%M:%S %Y") {
        Ok(naive) => naive,
        Err(e) => {
            debug!(value, error = %e, "failed to parse timestamp");
            return None;
        }
    };

    match zone {
        Some(z) if is_utc_zone(z) => Some(naive.and_utc()),
        _ => fallback
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc)),
    }
}

fn is_utc_zone(zone: &str) -> bool {
    matches!(zone.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z" | "UCT")
}
