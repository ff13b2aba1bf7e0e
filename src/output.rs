//! Output formatting and persistence for summary tables and run reports.
//!
//! Supports a plain-text run report, JSON serialization, and CSV tables.

use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::SummaryTable;
use crate::error::EtlError;
use crate::stats::{CleanReport, LoadReport};

/// Renders the run report shown before any output is written.
pub fn render_report(load: &LoadReport, clean: Option<&CleanReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "rows read:      {}", load.rows_read);
    let _ = writeln!(out, "rows loaded:    {}", load.rows_loaded);
    let _ = writeln!(
        out,
        "rows skipped:   {} ({:.1}%)",
        load.rows_skipped,
        load.skipped_pct()
    );
    for (reason, count) in &load.skipped_by_reason {
        let _ = writeln!(out, "  {reason:<18} {count}");
    }
    if load.values_clamped > 0 {
        let _ = writeln!(out, "values clamped: {}", load.values_clamped);
    }
    for row in &load.row_errors {
        let _ = writeln!(out, "  line {}: {}", row.line, row.message);
    }
    if load.row_errors_truncated {
        let _ = writeln!(out, "  ... further row errors omitted");
    }
    if let Some(clean) = clean {
        let _ = writeln!(out, "missing dropped:    {}", clean.missing_dropped);
        let _ = writeln!(out, "values imputed:     {}", clean.values_imputed);
        let _ = writeln!(out, "duplicates removed: {}", clean.duplicates_removed);
        let _ = writeln!(out, "rows after clean:   {}", clean.rows_out);
    }
    out
}

/// Logs the load report with structured fields, one event per skip reason.
pub fn log_report(load: &LoadReport) {
    info!(
        rows_read = load.rows_read,
        rows_skipped = load.rows_skipped,
        values_clamped = load.values_clamped,
        "Run report"
    );
    for (reason, count) in &load.skipped_by_reason {
        info!(reason = %reason, count, "Skipped rows");
    }
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<(), EtlError> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a value as pretty-printed JSON to `path`.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<(), EtlError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    debug!(path = %path.display(), "JSON written");
    Ok(())
}

/// Writes one table as CSV: grouping columns, then `metric`, then `average`.
pub fn write_table<W: std::io::Write>(
    writer: W,
    table: &SummaryTable,
    precision: u32,
) -> Result<(), EtlError> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut header: Vec<&str> = table.group_by.iter().map(|f| f.as_str()).collect();
    header.push("metric");
    header.push("average");
    writer.write_record(&header)?;

    let precision = precision as usize;
    for row in &table.rows {
        let mut fields: Vec<String> = row.key.iter().map(ToString::to_string).collect();
        fields.push(row.metric.to_string());
        fields.push(format!("{:.*}", precision, row.average));
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes every table to `<dir>/<name>.csv`, creating `dir` if needed.
///
/// Returns the written paths in table order.
pub fn write_tables(
    dir: &Path,
    tables: &[SummaryTable],
    precision: u32,
) -> Result<Vec<PathBuf>, EtlError> {
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(tables.len());
    for table in tables {
        let path = dir.join(format!("{}.csv", table.name()));
        write_table(File::create(&path)?, table, precision)?;
        debug!(path = %path.display(), rows = table.rows.len(), "Table written");
        paths.push(path);
    }

    info!(dir = %dir.display(), tables = paths.len(), "Tables written");
    Ok(paths)
}
