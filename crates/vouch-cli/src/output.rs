// crates/vouch-cli/src/output.rs
//
// Output formatting utilities for the Vouch CLI.
// Supports table and JSON output modes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use vouch_core::{ProofRecord, ProofSubmission, StoredWitnessSummary};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Print rows as a table, or `value` as JSON.
pub fn emit<T: Serialize, R: Tabled>(format: OutputFormat, value: &T, rows: &[R]) {
    match format {
        OutputFormat::Json => println!("{}", format_json(value)),
        OutputFormat::Table => println!("{}", format_table(rows)),
    }
}

/// RFC 3339 rendering of Unix seconds.
pub fn format_secs(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

/// RFC 3339 rendering of Unix milliseconds.
pub fn format_millis(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

#[derive(Tabled)]
pub struct WitnessRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

impl From<&StoredWitnessSummary> for WitnessRow {
    fn from(s: &StoredWitnessSummary) -> Self {
        Self {
            id: s.id.clone(),
            created: format_millis(s.timestamp),
            hash: s.hash.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct SubmissionRow {
    #[tabled(rename = "Proof ID")]
    proof_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Threshold")]
    threshold: f64,
    #[tabled(rename = "Tx")]
    tx_hash: String,
    #[tabled(rename = "Confirmed")]
    confirmed_at: String,
    #[tabled(rename = "Expires")]
    expires_at: String,
}

impl From<&ProofSubmission> for SubmissionRow {
    fn from(s: &ProofSubmission) -> Self {
        let status = match &s.failure_reason {
            Some(reason) => format!("{} ({})", s.status, reason),
            None => s.status.to_string(),
        };
        Self {
            proof_id: s.proof_id.clone(),
            status,
            threshold: s.threshold,
            tx_hash: s.tx_hash.clone().unwrap_or_else(|| "--".to_string()),
            confirmed_at: s.confirmed_at.map(format_secs).unwrap_or_else(|| "--".to_string()),
            expires_at: format_secs(s.expires_at),
        }
    }
}

#[derive(Tabled)]
pub struct ProofRow {
    #[tabled(rename = "Nullifier")]
    nullifier: String,
    #[tabled(rename = "Threshold")]
    threshold: f64,
    #[tabled(rename = "Issued")]
    timestamp: String,
    #[tabled(rename = "Expires")]
    expires_at: String,
    #[tabled(rename = "Valid")]
    is_valid: String,
    #[tabled(rename = "Expired")]
    is_expired: String,
}

impl From<&ProofRecord> for ProofRow {
    fn from(r: &ProofRecord) -> Self {
        Self {
            nullifier: r.nullifier.clone(),
            threshold: r.threshold,
            timestamp: format_secs(r.timestamp),
            expires_at: format_secs(r.expires_at),
            is_valid: yes_no(r.is_valid),
            is_expired: yes_no(r.is_expired),
        }
    }
}

/// Two-column key/value table for single records.
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl FieldRow {
    pub fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }

    pub fn flag(field: &'static str, value: bool) -> Self {
        Self::new(field, yes_no(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_render_utc() {
        assert_eq!(format_secs(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_millis(1_500), "1970-01-01T00:00:01.500+00:00");
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_number() {
        assert_eq!(format_secs(i64::MAX), i64::MAX.to_string());
        assert_eq!(format_millis(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn test_table_has_headers() {
        let table = format_table(&[FieldRow::flag("Valid", true)]);
        assert!(table.contains("Field"));
        assert!(table.contains("yes"));
    }
}
