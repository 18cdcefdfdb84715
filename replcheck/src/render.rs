//! Human table and JSON output for an assessment.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use replcheck_common::RepositoryAssessment;
use replcheck_common::timestamp::format_whitelist_expiry;

const HEADERS: [&str; 9] = [
    "ALIAS",
    "ROLE",
    "STATUS",
    "REVISION",
    "LAST UPDATE",
    "LAST SNAPSHOT",
    "WHITELIST EXPIRY",
    "TTL",
    "CONTACT",
];

/// Placeholder for values that were not published.
const MISSING: &str = "-";

fn instant(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Aligned table, issue list and verdict line.
pub fn render_table(assessment: &RepositoryAssessment) -> String {
    let rows: Vec<[String; 9]> = assessment
        .endpoints
        .iter()
        .map(|e| {
            [
                e.alias.clone(),
                e.role.to_string(),
                e.status.to_string(),
                e.revision.to_string(),
                instant(e.last_update),
                instant(e.last_snapshot),
                e.whitelist_expiry
                    .as_ref()
                    .map(format_whitelist_expiry)
                    .unwrap_or_else(|| MISSING.to_string()),
                e.ttl_seconds
                    .map(|ttl| format!("{ttl}s"))
                    .unwrap_or_else(|| MISSING.to_string()),
                e.contact.clone().unwrap_or_else(|| MISSING.to_string()),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    let has_issues = !assessment.repository_degradations.is_empty()
        || assessment.endpoints.iter().any(|e| !e.degradations.is_empty());
    if has_issues {
        out.push_str("\nIssues:\n");
        for endpoint in &assessment.endpoints {
            for message in &endpoint.degradations {
                let _ = writeln!(out, "  {}: {}", endpoint.alias, message);
            }
        }
        for message in assessment.repository_degradations.iter() {
            let _ = writeln!(out, "  repository: {message}");
        }
    }

    let _ = writeln!(
        out,
        "\n{} ({})  replicas up: {}  min revision: {}",
        assessment.verdict,
        assessment.verdict.code(),
        assessment.num_up,
        assessment.min_revision()
    );
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

pub fn render_json(assessment: &RepositoryAssessment) -> serde_json::Result<String> {
    serde_json::to_string_pretty(assessment)
}
