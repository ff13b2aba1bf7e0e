use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::aggregate::aggregate_table;
use crate::analyzers::summary::summarize;
use crate::analyzers::types::{SummaryIndex, SummaryTable};
use crate::analyzers::writetos3::publish_files;
use crate::clean::clean;
use crate::config::JobConfig;
use crate::error::EtlError;
use crate::fetch::{HttpClient, read_source};
use crate::output::{log_report, render_report, write_json, write_tables};
use crate::parser::load;
use crate::record::{AgriRecord, GroupField, Metric};
use crate::stats::{CleanReport, LoadReport};
use crate::warehouse::StarSchema;

/// Which tables a run produces.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRequest {
    /// The sixteen dashboard tables.
    Dashboard,
    /// One table for an explicit grouping and metric.
    Single {
        group_by: Vec<GroupField>,
        metric: Metric,
    },
}

/// Where to upload produced files.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub bucket: String,
    pub prefix: String,
    pub gzip: bool,
}

/// Loaded and cleaned records with both reports.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub records: Vec<AgriRecord>,
    pub load: LoadReport,
    pub clean: CleanReport,
}

impl Prepared {
    /// Human-readable run report covering both load and clean.
    pub fn render(&self) -> String {
        render_report(&self.load, Some(&self.clean))
    }
}

/// Everything a `run` produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub prepared: Prepared,
    pub tables: Vec<SummaryTable>,
    pub written: Vec<PathBuf>,
    pub uploaded: usize,
}

/// Loads and cleans `bytes` and logs the load counts.
///
/// Nothing is written here, so callers can show [`Prepared::render`] before
/// any output exists.
pub fn prepare(bytes: &[u8], config: &JobConfig) -> Result<Prepared, EtlError> {
    let loaded = load(bytes, config)?;
    let (records, clean_report) = clean(loaded.records, config.missing_policy);

    log_report(&loaded.report);

    Ok(Prepared {
        records,
        load: loaded.report,
        clean: clean_report,
    })
}

/// Computes the requested tables.
pub fn build_tables(
    records: &[AgriRecord],
    request: &TableRequest,
    precision: u32,
) -> Result<Vec<SummaryTable>, EtlError> {
    match request {
        TableRequest::Dashboard => summarize(records, precision),
        TableRequest::Single { group_by, metric } => {
            Ok(vec![aggregate_table(records, group_by, *metric, precision)?])
        }
    }
}

/// Writes each table as CSV plus `summary.json` into `dir`.
pub fn write_outputs(
    dir: &Path,
    source: &str,
    precision: u32,
    prepared: &Prepared,
    tables: Vec<SummaryTable>,
) -> Result<(Vec<PathBuf>, Vec<SummaryTable>), EtlError> {
    let mut written = write_tables(dir, &tables, precision)?;

    let index = SummaryIndex {
        generated_at: Utc::now(),
        source: source.to_string(),
        precision,
        load: prepared.load.clone(),
        clean: prepared.clean.clone(),
        tables,
    };
    let index_path = dir.join("summary.json");
    write_json(&index_path, &index)?;
    written.push(index_path);

    Ok((written, index.tables))
}

/// Aggregates prepared records, writes the tables, and optionally publishes them.
#[tracing::instrument(skip(prepared, output_dir, config, publish), fields(output_dir = %output_dir.display()))]
pub async fn analyze(
    prepared: Prepared,
    source: &str,
    output_dir: &Path,
    request: &TableRequest,
    config: &JobConfig,
    publish: Option<&PublishTarget>,
) -> Result<RunOutcome> {
    let tables = build_tables(&prepared.records, request, config.precision)?;
    let (written, tables) =
        write_outputs(output_dir, source, config.precision, &prepared, tables)?;

    let uploaded = match publish {
        Some(target) => {
            let aws = aws_config::load_from_env().await;
            let s3 = aws_sdk_s3::Client::new(&aws);
            publish_files(&s3, &target.bucket, &target.prefix, &written, target.gzip).await?
        }
        None => {
            info!("S3 bucket not specified, skipping upload");
            0
        }
    };

    info!(
        tables = tables.len(),
        files = written.len(),
        uploaded,
        "Run complete"
    );

    Ok(RunOutcome {
        prepared,
        tables,
        written,
        uploaded,
    })
}

/// Reads `source`, then loads and cleans it; nothing is written.
#[tracing::instrument(skip(client, config))]
pub async fn validate<C: HttpClient>(
    client: &C,
    source: &str,
    config: &JobConfig,
) -> Result<Prepared> {
    let bytes = read_source(client, source).await?;
    Ok(prepare(&bytes, config)?)
}

/// Writes the cleaned records as a star schema into `output_dir`.
#[tracing::instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn export_star(prepared: &Prepared, output_dir: &Path) -> Result<Vec<PathBuf>, EtlError> {
    StarSchema::build(&prepared.records).write(output_dir)
}
