//! CSV parser for the raw agricultural dataset.
//!
//! Header columns are matched by name (trimmed, case-insensitive) so column
//! order is free and extra columns are ignored. Row-level failures are either
//! skipped and counted or, in strict mode, abort the load.

use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{JobConfig, RangePolicy};
use crate::error::{EtlError, SkipReason};
use crate::record::{AgriRecord, Season};
use crate::stats::LoadReport;

/// Canonical header names, in dataset order.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "Year",
    "Location",
    "Area",
    "Rainfall",
    "Temperature",
    "Soil_type",
    "Irrigation",
    "Yields",
    "Humidity",
    "Crops",
    "Price",
    "Season",
];

const YEAR: usize = 0;
const LOCATION: usize = 1;
const AREA: usize = 2;
const RAINFALL: usize = 3;
const TEMPERATURE: usize = 4;
const SOIL_TYPE: usize = 5;
const IRRIGATION: usize = 6;
const YIELDS: usize = 7;
const HUMIDITY: usize = 8;
const CROPS: usize = 9;
const PRICE: usize = 10;
const SEASON: usize = 11;

/// Records that survived parsing, plus what happened to the rest.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub records: Vec<AgriRecord>,
    pub report: LoadReport,
}

/// Maps each required column to its position in the input header.
#[derive(Debug)]
struct ColumnMap {
    positions: [usize; 12],
    width: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, EtlError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();

        let mut positions = [0usize; 12];
        let mut missing = Vec::new();

        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            let wanted = name.to_ascii_lowercase();
            match normalized.iter().position(|h| *h == wanted) {
                Some(pos) => positions[slot] = pos,
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(EtlError::Schema { missing });
        }

        Ok(Self {
            positions,
            width: headers.len(),
        })
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: usize) -> &'r str {
        record.get(self.positions[column]).unwrap_or_default()
    }
}

/// Loads the dataset from a file on disk.
pub fn load_path(path: impl AsRef<Path>, config: &JobConfig) -> Result<Loaded, EtlError> {
    let file = File::open(path.as_ref())?;
    load(file, config)
}

/// Parses the tabular source into [`AgriRecord`]s.
///
/// # Errors
///
/// Returns [`EtlError::Schema`] before reading any row if a required column is
/// absent. In strict mode the first row-level [`EtlError::Parse`] or
/// [`EtlError::Range`] is returned; otherwise those rows are skipped and
/// counted in the [`LoadReport`]. I/O failures are always fatal.
pub fn load<R: Read>(source: R, config: &JobConfig) -> Result<Loaded, EtlError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;
    debug!(columns = columns.width, "Header validated");

    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for result in reader.records() {
        report.rows_read += 1;

        let parsed = match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                parse_row(&record, line, &columns, config, &mut report.values_clamped)
            }
            Err(e) if e.is_io_error() => return Err(EtlError::Csv(e)),
            Err(e) => Err(EtlError::Parse {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                reason: SkipReason::Unreadable,
                detail: e.to_string(),
            }),
        };

        match parsed {
            Ok(record) => records.push(record),
            Err(e) if config.strict => return Err(e),
            Err(e) => {
                warn!(line = e.line(), reason = ?e.skip_reason(), error = %e, "Row skipped");
                report.record_skip(&e, config.max_row_errors);
            }
        }
    }

    report.rows_loaded = records.len();

    info!(
        rows_read = report.rows_read,
        rows_loaded = report.rows_loaded,
        rows_skipped = report.rows_skipped,
        values_clamped = report.values_clamped,
        "Load complete"
    );

    Ok(Loaded { records, report })
}

fn parse_row(
    record: &StringRecord,
    line: u64,
    columns: &ColumnMap,
    config: &JobConfig,
    clamped: &mut usize,
) -> Result<AgriRecord, EtlError> {
    if record.len() != columns.width {
        return Err(EtlError::Parse {
            line,
            reason: SkipReason::ColumnCount,
            detail: format!("expected {} fields, found {}", columns.width, record.len()),
        });
    }

    let cell = |column: usize| columns.cell(record, column);
    let mut range = RangeCheck {
        line,
        policy: config.range_policy,
        clamped,
    };

    let year = parse_year(cell(YEAR), line, config)?;
    let season = parse_season(cell(SEASON), line)?;

    let location = text(cell(LOCATION));
    if let Some(location) = &location {
        if !config.allows_location(location) {
            return Err(EtlError::Parse {
                line,
                reason: SkipReason::UnknownLocation,
                detail: format!("Location = {location:?}"),
            });
        }
    }

    let area = parse_number(cell(AREA), "Area", line)?;
    let rainfall = parse_number(cell(RAINFALL), "Rainfall", line)?;
    let temperature = parse_number(cell(TEMPERATURE), "Temperature", line)?;
    let yields = parse_number(cell(YIELDS), "Yields", line)?;
    let humidity = parse_number(cell(HUMIDITY), "Humidity", line)?;
    let price = parse_number(cell(PRICE), "Price", line)?;

    if let Some(p) = price {
        if p.fract() != 0.0 {
            return Err(EtlError::Parse {
                line,
                reason: SkipReason::InvalidNumber,
                detail: format!("Price = {p} is not an integer"),
            });
        }
    }

    Ok(AgriRecord {
        year,
        location,
        area: range.positive("Area", area)?,
        rainfall: range.bounded("Rainfall", rainfall, 0.0, f64::INFINITY, ">= 0")?,
        temperature,
        soil_type: text(cell(SOIL_TYPE)),
        irrigation: text(cell(IRRIGATION)),
        yields: range.bounded("Yields", yields, 0.0, f64::INFINITY, ">= 0")?,
        humidity: range.bounded("Humidity", humidity, 0.0, 100.0, "[0, 100]")?,
        crop: text(cell(CROPS)),
        price: range
            .bounded("Price", price, 0.0, u64::MAX as f64, ">= 0")?
            .map(|p| p as u64),
        season,
    })
}

fn text(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

fn parse_number(cell: &str, field: &str, line: u64) -> Result<Option<f64>, EtlError> {
    if cell.is_empty() {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v + 0.0)),
        _ => Err(EtlError::Parse {
            line,
            reason: SkipReason::InvalidNumber,
            detail: format!("{field} = {cell:?}"),
        }),
    }
}

fn parse_year(cell: &str, line: u64, config: &JobConfig) -> Result<u16, EtlError> {
    if cell.is_empty() {
        return Err(EtlError::Parse {
            line,
            reason: SkipReason::MissingRequired,
            detail: "Year is empty".into(),
        });
    }
    let year = cell.parse::<i64>().map_err(|_| EtlError::Parse {
        line,
        reason: SkipReason::InvalidNumber,
        detail: format!("Year = {cell:?}"),
    })?;

    // Year is a grouping key; it is rejected under every range policy.
    if year < i64::from(config.min_year) || year > i64::from(config.max_year) {
        return Err(EtlError::Range {
            line,
            field: "Year",
            value: year as f64,
            bounds: "the supported year range",
        });
    }
    Ok(year as u16)
}

fn parse_season(cell: &str, line: u64) -> Result<Season, EtlError> {
    if cell.is_empty() {
        return Err(EtlError::Parse {
            line,
            reason: SkipReason::MissingRequired,
            detail: "Season is empty".into(),
        });
    }
    cell.parse::<Season>().map_err(|_| EtlError::Parse {
        line,
        reason: SkipReason::InvalidSeason,
        detail: format!("Season = {cell:?}"),
    })
}

/// Applies the configured [`RangePolicy`] to measurement values.
struct RangeCheck<'a> {
    line: u64,
    policy: RangePolicy,
    clamped: &'a mut usize,
}

impl RangeCheck<'_> {
    fn bounded(
        &mut self,
        field: &'static str,
        value: Option<f64>,
        min: f64,
        max: f64,
        bounds: &'static str,
    ) -> Result<Option<f64>, EtlError> {
        let Some(v) = value else {
            return Ok(None);
        };
        if (min..=max).contains(&v) {
            return Ok(Some(v));
        }
        match self.policy {
            RangePolicy::Reject => Err(self.error(field, v, bounds)),
            RangePolicy::Clamp => {
                let c = v.clamp(min, max);
                warn!(line = self.line, field, value = v, clamped = c, "Value clamped");
                *self.clamped += 1;
                Ok(Some(c))
            }
        }
    }

    /// Area must be strictly positive; with no clamp target it becomes missing.
    fn positive(&mut self, field: &'static str, value: Option<f64>) -> Result<Option<f64>, EtlError> {
        match value {
            Some(v) if v <= 0.0 => match self.policy {
                RangePolicy::Reject => Err(self.error(field, v, "> 0")),
                RangePolicy::Clamp => {
                    warn!(line = self.line, field, value = v, "Value cleared");
                    *self.clamped += 1;
                    Ok(None)
                }
            },
            other => Ok(other),
        }
    }

    fn error(&self, field: &'static str, value: f64, bounds: &'static str) -> EtlError {
        EtlError::Range {
            line: self.line,
            field,
            value,
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RangePolicy;

    const HEADER: &str =
        "Year,Location,Area,Rainfall,Temperature,Soil_type,Irrigation,Yields,Humidity,Crops,Price,Season";

    fn csv_of(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for row in rows {
            s.push('\n');
            s.push_str(row);
        }
        s.push('\n');
        s
    }

    fn load_str(input: &str, config: &JobConfig) -> Result<Loaded, EtlError> {
        load(input.as_bytes(), config)
    }

    #[test]
    fn test_load_valid_rows() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2017,Mysuru,2.0,50,22.0,Red,Flood,2100,70,Paddy,1800,Rabi",
        ]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.report.rows_read, 2);
        assert_eq!(loaded.report.rows_skipped, 0);

        let first = &loaded.records[0];
        assert_eq!(first.year, 2018);
        assert_eq!(first.location.as_deref(), Some("Bangalore"));
        assert_eq!(first.rainfall, Some(100.0));
        assert_eq!(first.price, Some(1500));
        assert_eq!(first.season, Season::Kharif);
    }

    #[test]
    fn test_missing_column_is_schema_error_before_rows() {
        let input = "Year,Location,Area,Temperature,Soil_type,Irrigation,Yields,Humidity,Crops,Price\n\
                     not,even,close\n";
        let err = load_str(input, &JobConfig::default()).unwrap_err();

        match err {
            EtlError::Schema { missing } => assert_eq!(missing, vec!["Rainfall", "Season"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_schema_error() {
        let err = load_str("", &JobConfig::default()).unwrap_err();
        assert!(matches!(err, EtlError::Schema { ref missing } if missing.len() == 12));
    }

    #[test]
    fn test_headers_reordered_and_case_insensitive() {
        let input = "season, CROPS ,price,humidity,yields,irrigation,soil_type,temperature,rainfall,area,location,year,extra\n\
                     Rabi,Paddy,1800,70,2100,Flood,Red,22,50,2,Mysuru,2017,ignored\n";
        let loaded = load_str(input, &JobConfig::default()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        let r = &loaded.records[0];
        assert_eq!(r.year, 2017);
        assert_eq!(r.crop.as_deref(), Some("Paddy"));
        assert_eq!(r.rainfall, Some(50.0));
        assert_eq!(r.season, Season::Rabi);
    }

    #[test]
    fn test_non_numeric_rainfall_is_skipped_and_counted() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2018,Bangalore,1.5,abc,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
        ]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.report.rows_read, 2);
        assert_eq!(loaded.report.rows_skipped, 1);
        assert_eq!(loaded.report.skipped(SkipReason::InvalidNumber), 1);
        assert_eq!(loaded.report.row_errors[0].line, 3);
    }

    #[test]
    fn test_wrong_column_count_is_skipped() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500",
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif,extra",
        ]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert!(loaded.records.is_empty());
        assert_eq!(loaded.report.skipped(SkipReason::ColumnCount), 2);
    }

    #[test]
    fn test_strict_mode_aborts_on_first_bad_row() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Monsoon",
        ]);
        let config = JobConfig {
            strict: true,
            ..Default::default()
        };
        let err = load_str(&input, &config).unwrap_err();

        assert!(matches!(
            err,
            EtlError::Parse {
                line: 3,
                reason: SkipReason::InvalidSeason,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_range_rejected_by_default() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,-5,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,101,Ragi,1500,Kharif",
            "2003,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
        ]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert!(loaded.records.is_empty());
        assert_eq!(loaded.report.skipped(SkipReason::OutOfRange), 3);
        assert_eq!(loaded.report.values_clamped, 0);
    }

    #[test]
    fn test_clamp_policy_keeps_rows() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,-5,27.5,Alluvial,Drip,3200,101,Ragi,1500,Kharif",
            "2018,Bangalore,0,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2019,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
        ]);
        let config = JobConfig {
            range_policy: RangePolicy::Clamp,
            ..Default::default()
        };
        let loaded = load_str(&input, &config).unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].rainfall, Some(0.0));
        assert_eq!(loaded.records[0].humidity, Some(100.0));
        assert_eq!(loaded.records[1].area, None);
        assert_eq!(loaded.report.values_clamped, 3);
        // year is never clamped
        assert_eq!(loaded.report.skipped(SkipReason::OutOfRange), 1);
    }

    #[test]
    fn test_empty_cells_become_missing() {
        let input = csv_of(&["2018,,1.5,,27.5,Alluvial,,3200,60,Ragi,,Kharif"]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        let r = &loaded.records[0];
        assert_eq!(r.location, None);
        assert_eq!(r.rainfall, None);
        assert_eq!(r.irrigation, None);
        assert_eq!(r.price, None);
        assert!(!r.is_complete());
    }

    #[test]
    fn test_missing_year_or_season_is_required() {
        let input = csv_of(&[
            ",Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,",
        ]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert_eq!(loaded.report.skipped(SkipReason::MissingRequired), 2);
    }

    #[test]
    fn test_fractional_price_is_invalid() {
        let input = csv_of(&["2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,15.5,Kharif"]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert_eq!(loaded.report.skipped(SkipReason::InvalidNumber), 1);
    }

    #[test]
    fn test_unknown_location_when_configured() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2018,Atlantis,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
        ]);
        let config = JobConfig {
            locations: Some(["Bangalore".to_string()].into_iter().collect()),
            ..Default::default()
        };
        let loaded = load_str(&input, &config).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.report.skipped(SkipReason::UnknownLocation), 1);
    }

    #[test]
    fn test_invalid_utf8_row_is_unreadable() {
        let mut input = csv_of(&["2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif"])
            .into_bytes();
        input.extend_from_slice(b"2017,Mys\xffuru,2.0,50,22.0,Red,Flood,2100,70,Paddy,1800,Rabi\n");

        let loaded = load(&input[..], &JobConfig::default()).unwrap();
        assert_eq!(loaded.report.rows_read, 2);
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.report.skipped(SkipReason::Unreadable), 1);
    }

    #[test]
    fn test_bom_header_accepted() {
        let input = format!(
            "\u{feff}{}",
            csv_of(&["2018,Bangalore,1.5,100,27.5,Alluvial,Drip,3200,60,Ragi,1500,Kharif"])
        );
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].year, 2018);
    }

    #[test]
    fn test_negative_zero_loads_as_zero() {
        let input = csv_of(&[
            "2018,Bangalore,1.5,100,0,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
            "2018,Bangalore,1.5,100,-0,Alluvial,Drip,3200,60,Ragi,1500,Kharif",
        ]);
        let loaded = load_str(&input, &JobConfig::default()).unwrap();

        let temperature = loaded.records[1].temperature.unwrap();
        assert_eq!(temperature.to_bits(), 0.0f64.to_bits());
    }
}
