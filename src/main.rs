//! CLI entry point for the agricultural ETL job.
//!
//! Provides subcommands for producing summary tables, validating a dataset
//! without writing anything, and exporting a star schema.

use agri_etl::analyzers::analyzer::{PublishTarget, TableRequest, analyze, export_star, validate};
use agri_etl::config::{JobConfig, MissingPolicy, RangePolicy};
use agri_etl::fetch::BasicClient;
use agri_etl::output::print_json;
use agri_etl::record::{GroupField, Metric};
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "agri_etl")]
#[command(about = "Clean and aggregate the agricultural yield dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args)]
struct JobArgs {
    /// Path to CSV file, URL to fetch, or "-" for stdin
    #[arg(short, long, value_name = "FILE_OR_URL")]
    input: String,

    /// JSON job config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Abort on the first malformed row instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Out-of-range values: reject the row or clamp the value
    #[arg(long, value_enum)]
    range_policy: Option<RangePolicy>,

    /// Empty cells: drop the record or impute numeric columns
    #[arg(long, value_enum)]
    missing_policy: Option<MissingPolicy>,

    /// Decimal places kept in averages
    #[arg(long)]
    precision: Option<u32>,
}

impl JobArgs {
    /// File config (or defaults) with command-line overrides applied.
    fn resolve(&self) -> Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };
        if self.strict {
            config.strict = true;
        }
        if let Some(policy) = self.range_policy {
            config.range_policy = policy;
        }
        if let Some(policy) = self.missing_policy {
            config.missing_policy = policy;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load, clean, and write summary tables
    Run {
        #[command(flatten)]
        job: JobArgs,

        /// Grouping fields, e.g. "season,crop" (default: all dashboard tables)
        #[arg(short, long)]
        group_by: Option<String>,

        /// Metric to average (required with --group-by)
        #[arg(short, long)]
        metric: Option<String>,

        /// Directory for output tables
        #[arg(short, long, default_value = "summary")]
        output_dir: PathBuf,

        /// Optional: S3 bucket name to upload outputs to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Key prefix for uploaded objects
        #[arg(long, default_value = "agri_etl/")]
        s3_prefix: String,

        /// Optional: Gzip compress files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Load and clean only, printing the run report
    Validate {
        #[command(flatten)]
        job: JobArgs,
    },
    /// Export cleaned records as fact and dimension tables
    Star {
        #[command(flatten)]
        job: JobArgs,

        /// Directory for the star-schema CSVs
        #[arg(short, long, default_value = "warehouse")]
        output_dir: PathBuf,
    },
}

fn table_request(group_by: Option<&str>, metric: Option<&str>) -> Result<TableRequest> {
    match (group_by, metric) {
        (None, None) => Ok(TableRequest::Dashboard),
        (Some(fields), Some(metric)) => Ok(TableRequest::Single {
            group_by: GroupField::parse_list(fields)?,
            metric: metric.parse::<Metric>()?,
        }),
        (None, Some(metric)) => Ok(TableRequest::Single {
            group_by: Vec::new(),
            metric: metric.parse::<Metric>()?,
        }),
        (Some(_), None) => bail!("--group-by requires --metric"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/agri_etl.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("agri_etl.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let client = BasicClient::new()?;

    match cli.command {
        Commands::Run {
            job,
            group_by,
            metric,
            output_dir,
            s3_bucket,
            s3_prefix,
            gzip,
        } => {
            let config = job.resolve()?;
            let request = table_request(group_by.as_deref(), metric.as_deref())?;
            let prepared = validate(&client, &job.input, &config).await?;
            print!("{}", prepared.render());

            let publish = s3_bucket
                .filter(|b| !b.is_empty())
                .map(|bucket| PublishTarget {
                    bucket,
                    prefix: s3_prefix,
                    gzip,
                });

            let outcome = analyze(
                prepared,
                &job.input,
                &output_dir,
                &request,
                &config,
                publish.as_ref(),
            )
            .await?;

            for path in &outcome.written {
                println!("wrote {}", path.display());
            }
        }
        Commands::Validate { job } => {
            let config = job.resolve()?;
            let prepared = validate(&client, &job.input, &config).await?;
            print!("{}", prepared.render());
            print_json(&prepared.load)?;
            info!(records = prepared.records.len(), "Validation complete");
        }
        Commands::Star { job, output_dir } => {
            let config = job.resolve()?;
            let prepared = validate(&client, &job.input, &config).await?;
            print!("{}", prepared.render());
            let paths = export_star(&prepared, &output_dir)?;
            for path in &paths {
                println!("wrote {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_request_defaults_to_dashboard() {
        assert_eq!(table_request(None, None).unwrap(), TableRequest::Dashboard);
    }

    #[test]
    fn test_table_request_single() {
        let request = table_request(Some("season,crop"), Some("yields")).unwrap();
        assert_eq!(
            request,
            TableRequest::Single {
                group_by: vec![GroupField::Season, GroupField::Crop],
                metric: Metric::Yields,
            }
        );
    }

    #[test]
    fn test_table_request_requires_metric() {
        assert!(table_request(Some("season"), None).is_err());
        assert!(table_request(Some("season"), Some("colour")).is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "agri_etl",
            "run",
            "--input",
            "data.csv",
            "--group-by",
            "season,crop",
            "--metric",
            "yields",
            "--range-policy",
            "clamp",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { job, group_by, .. } => {
                assert_eq!(job.input, "data.csv");
                assert_eq!(group_by.as_deref(), Some("season,crop"));
                let config = job.resolve().unwrap();
                assert_eq!(config.range_policy, RangePolicy::Clamp);
            }
            _ => panic!("expected run"),
        }
    }
}
