//! Data types used by the aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::{GroupField, GroupKey, Metric};
use crate::stats::{CleanReport, LoadReport};

/// One derived aggregate: a grouping key and its rounded average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub metric: Metric,
    pub average: f64,
    /// Records that contributed to the average.
    pub count: usize,
}

/// All groups for one `(group_by, metric)` pair, sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub group_by: Vec<GroupField>,
    pub metric: Metric,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// File stem such as `avg_yields_by_season_crop`.
    pub fn name(&self) -> String {
        let fields: Vec<&str> = self.group_by.iter().map(GroupField::as_str).collect();
        if fields.is_empty() {
            format!("avg_{}", self.metric)
        } else {
            format!("avg_{}_by_{}", self.metric, fields.join("_"))
        }
    }
}

/// Top-level summary written as `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryIndex {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub precision: u32,
    pub load: LoadReport,
    pub clean: CleanReport,
    pub tables: Vec<SummaryTable>,
}
