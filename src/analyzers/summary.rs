use tracing::debug;

use crate::analyzers::aggregate::aggregate_table;
use crate::analyzers::types::SummaryTable;
use crate::error::EtlError;
use crate::record::{AgriRecord, GroupField, Metric};

/// The sixteen dashboard tables: each dashboard metric averaged by each
/// dashboard dimension, metric-major in a fixed order.
pub fn summarize(records: &[AgriRecord], precision: u32) -> Result<Vec<SummaryTable>, EtlError> {
    let mut tables = Vec::with_capacity(Metric::DASHBOARD.len() * GroupField::DASHBOARD.len());

    for metric in Metric::DASHBOARD {
        for field in GroupField::DASHBOARD {
            let table = aggregate_table(records, &[field], metric, precision)?;
            debug!(table = %table.name(), groups = table.rows.len(), "Summary table built");
            tables.push(table);
        }
    }

    Ok(tables)
}
