//! Error taxonomy for the ETL job.

use serde::Serialize;
use std::fmt;

/// Why a row was excluded from the loaded set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Field count differs from the header.
    ColumnCount,
    /// Non-numeric (or non-finite) text in a numeric column.
    InvalidNumber,
    /// Season is not one of Kharif, Rabi, Zaid.
    InvalidSeason,
    /// Year or season cell is empty.
    MissingRequired,
    /// Location is not in the configured region list.
    UnknownLocation,
    /// The CSV reader could not decode the record.
    Unreadable,
    /// A value lies outside its documented domain.
    OutOfRange,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ColumnCount => "column_count",
            SkipReason::InvalidNumber => "invalid_number",
            SkipReason::InvalidSeason => "invalid_season",
            SkipReason::MissingRequired => "missing_required",
            SkipReason::UnknownLocation => "unknown_location",
            SkipReason::Unreadable => "unreadable",
            SkipReason::OutOfRange => "out_of_range",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Errors that can occur while loading, cleaning, or aggregating records.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Required header columns are absent. Always fatal.
    #[error("Schema error: missing required column(s): {}", .missing.join(", "))]
    Schema {
        /// Canonical names of the missing columns.
        missing: Vec<String>,
    },

    /// A single row could not be parsed.
    #[error("Parse error on line {line} ({reason}): {detail}")]
    Parse {
        line: u64,
        reason: SkipReason,
        detail: String,
    },

    /// A value lies outside its documented domain.
    #[error("Range error on line {line}: {field} = {value} outside {bounds}")]
    Range {
        line: u64,
        field: &'static str,
        value: f64,
        bounds: &'static str,
    },

    /// The requested grouping is not usable.
    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    /// Job configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer failure outside of row-level parsing.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl EtlError {
    /// The skip reason for row-level errors, `None` for fatal ones.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            EtlError::Parse { reason, .. } => Some(*reason),
            EtlError::Range { .. } => Some(SkipReason::OutOfRange),
            _ => None,
        }
    }

    /// Source line of a row-level error.
    pub fn line(&self) -> Option<u64> {
        match self {
            EtlError::Parse { line, .. } | EtlError::Range { line, .. } => Some(*line),
            _ => None,
        }
    }
}
