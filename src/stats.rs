use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{EtlError, SkipReason};

/// A row excluded during load, kept for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub line: u64,
    pub reason: SkipReason,
    pub message: String,
}

/// Counters produced by [`crate::parser::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,

    // clamp policy
    pub values_clamped: usize,

    // first N row errors, in line order
    pub row_errors: Vec<RowError>,
    pub row_errors_truncated: bool,
}

impl LoadReport {
    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn skipped_pct(&self) -> f64 {
        Self::pct(self.rows_skipped, self.rows_read)
    }

    /// Records a skipped row; `keep` caps how many messages are retained.
    pub fn record_skip(&mut self, err: &EtlError, keep: usize) {
        let reason = err.skip_reason().unwrap_or(SkipReason::Unreadable);
        self.rows_skipped += 1;
        *self.skipped_by_reason.entry(reason).or_default() += 1;

        if self.row_errors.len() < keep {
            self.row_errors.push(RowError {
                line: err.line().unwrap_or(0),
                reason,
                message: err.to_string(),
            });
        } else {
            self.row_errors_truncated = true;
        }
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped_by_reason.get(&reason).copied().unwrap_or(0)
    }
}

/// Counters produced by [`crate::clean::clean`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub missing_dropped: usize,
    pub values_imputed: usize,
    pub duplicates_removed: usize,
}

impl CleanReport {
    /// True when cleaning changed nothing.
    pub fn is_noop(&self) -> bool {
        self.rows_in == self.rows_out && self.values_imputed == 0
    }
}
