//! Missing-value handling and duplicate removal.

use std::collections::HashSet;
use tracing::info;

use crate::analyzers::aggregate::MeanAccumulator;
use crate::config::MissingPolicy;
use crate::record::{AgriRecord, Season};
use crate::stats::CleanReport;

/// Hashable identity of a record; floats compare by bit pattern with `-0`
/// folded into `0` so the key agrees with `AgriRecord`'s equality.
#[derive(PartialEq, Eq, Hash)]
struct RecordKey {
    year: u16,
    location: Option<String>,
    soil_type: Option<String>,
    irrigation: Option<String>,
    crop: Option<String>,
    season: Season,
    price: Option<u64>,
    measures: [Option<u64>; 5],
}

impl From<&AgriRecord> for RecordKey {
    fn from(r: &AgriRecord) -> Self {
        let bits = |v: Option<f64>| v.map(|x| (x + 0.0).to_bits());
        Self {
            year: r.year,
            location: r.location.clone(),
            soil_type: r.soil_type.clone(),
            irrigation: r.irrigation.clone(),
            crop: r.crop.clone(),
            season: r.season,
            price: r.price,
            measures: [
                bits(r.area),
                bits(r.rainfall),
                bits(r.temperature),
                bits(r.yields),
                bits(r.humidity),
            ],
        }
    }
}

/// Column means used to fill numeric gaps.
#[derive(Debug, Default)]
struct ColumnMeans {
    area: Option<f64>,
    rainfall: Option<f64>,
    temperature: Option<f64>,
    yields: Option<f64>,
    humidity: Option<f64>,
    price: Option<u64>,
}

impl ColumnMeans {
    fn from_records(records: &[AgriRecord]) -> Self {
        fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
            let mut acc = MeanAccumulator::default();
            values.for_each(|v| acc.push(v));
            acc.mean()
        }

        Self {
            area: mean_of(records.iter().filter_map(|r| r.area)),
            rainfall: mean_of(records.iter().filter_map(|r| r.rainfall)),
            temperature: mean_of(records.iter().filter_map(|r| r.temperature)),
            yields: mean_of(records.iter().filter_map(|r| r.yields)),
            humidity: mean_of(records.iter().filter_map(|r| r.humidity)),
            price: mean_of(records.iter().filter_map(|r| r.price.map(|p| p as f64)))
                .map(|m| m.round() as u64),
        }
    }

    /// Fills numeric gaps in `record`; returns how many cells were filled.
    fn fill(&self, record: &mut AgriRecord) -> usize {
        fn fill_one<T: Copy>(slot: &mut Option<T>, mean: Option<T>) -> usize {
            if slot.is_none() && mean.is_some() {
                *slot = mean;
                1
            } else {
                0
            }
        }

        fill_one(&mut record.area, self.area)
            + fill_one(&mut record.rainfall, self.rainfall)
            + fill_one(&mut record.temperature, self.temperature)
            + fill_one(&mut record.yields, self.yields)
            + fill_one(&mut record.humidity, self.humidity)
            + fill_one(&mut record.price, self.price)
    }
}

/// Resolves missing values per `policy`, then removes exact duplicates.
///
/// Duplicates are detected after imputation, so a second pass over the output
/// removes and imputes nothing. The first occurrence of each record is kept
/// and survivor order is preserved.
pub fn clean(records: Vec<AgriRecord>, policy: MissingPolicy) -> (Vec<AgriRecord>, CleanReport) {
    let mut report = CleanReport {
        rows_in: records.len(),
        ..Default::default()
    };

    let means = match policy {
        MissingPolicy::Drop => None,
        MissingPolicy::Impute => Some(ColumnMeans::from_records(&records)),
    };

    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());

    for mut record in records {
        if let Some(means) = &means {
            report.values_imputed += means.fill(&mut record);
        }

        if !record.is_complete() {
            report.missing_dropped += 1;
            continue;
        }

        if !seen.insert(RecordKey::from(&record)) {
            report.duplicates_removed += 1;
            continue;
        }

        out.push(record);
    }

    report.rows_out = out.len();

    info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        missing_dropped = report.missing_dropped,
        values_imputed = report.values_imputed,
        duplicates_removed = report.duplicates_removed,
        ?policy,
        "Clean complete"
    );

    (out, report)
}
