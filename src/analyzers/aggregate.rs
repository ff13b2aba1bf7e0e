use std::collections::{BTreeMap, HashSet};

use crate::analyzers::types::{SummaryRow, SummaryTable};
use crate::analyzers::utility::round_to;
use crate::config::JobConfig;
use crate::error::EtlError;
use crate::record::{AgriRecord, GroupField, GroupKey, Metric};

/// Running sum and count for one group.
///
/// Accumulators from disjoint record shards can be merged in any order and
/// yield the same mean as a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    pub sum: f64,
    pub count: usize,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &MeanAccumulator) {
        self.sum += other.sum;
        self.count += other.count;
    }

    /// `None` when nothing was pushed.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Partial aggregate keyed by group.
pub type Partial = BTreeMap<GroupKey, MeanAccumulator>;

fn check_grouping(group_by: &[GroupField]) -> Result<(), EtlError> {
    let mut seen = HashSet::new();
    for field in group_by {
        if !seen.insert(field) {
            return Err(EtlError::InvalidGrouping(format!(
                "field '{field}' listed more than once"
            )));
        }
    }
    Ok(())
}

fn check_precision(precision: u32) -> Result<(), EtlError> {
    if precision > JobConfig::MAX_PRECISION {
        return Err(EtlError::Config(format!(
            "precision {precision} exceeds maximum of {}",
            JobConfig::MAX_PRECISION
        )));
    }
    Ok(())
}

/// Builds per-group accumulators for `metric`.
///
/// Records missing the metric or any key component are excluded.
pub fn accumulate(
    records: &[AgriRecord],
    group_by: &[GroupField],
    metric: Metric,
) -> Result<Partial, EtlError> {
    check_grouping(group_by)?;

    let mut groups = Partial::new();
    for record in records {
        let Some(value) = record.metric(metric) else {
            continue;
        };
        let Some(key) = group_by
            .iter()
            .map(|f| record.key_part(*f))
            .collect::<Option<GroupKey>>()
        else {
            continue;
        };
        groups.entry(key).or_default().push(value);
    }
    Ok(groups)
}

/// Merges `other` into `into`.
pub fn merge_partials(into: &mut Partial, other: &Partial) {
    for (key, acc) in other {
        into.entry(key.clone()).or_default().merge(acc);
    }
}

/// Finalizes accumulators into rounded means.
pub fn finalize(partial: &Partial, precision: u32) -> BTreeMap<GroupKey, f64> {
    partial
        .iter()
        .filter_map(|(key, acc)| acc.mean().map(|m| (key.clone(), round_to(m, precision))))
        .collect()
}

/// Mean of `metric` per grouping key, rounded to `precision` decimal places.
///
/// Keys are the ordered tuple of `group_by` values. Groups without
/// contributing records are absent. An empty `group_by` yields one group with
/// an empty key.
///
/// # Errors
///
/// Returns [`EtlError::InvalidGrouping`] if a field is repeated, and
/// [`EtlError::Config`] if `precision` exceeds [`JobConfig::MAX_PRECISION`].
pub fn aggregate(
    records: &[AgriRecord],
    group_by: &[GroupField],
    metric: Metric,
    precision: u32,
) -> Result<BTreeMap<GroupKey, f64>, EtlError> {
    check_precision(precision)?;
    let partial = accumulate(records, group_by, metric)?;
    Ok(finalize(&partial, precision))
}

/// Same as [`aggregate`], shaped as a [`SummaryTable`] with per-group counts.
pub fn aggregate_table(
    records: &[AgriRecord],
    group_by: &[GroupField],
    metric: Metric,
    precision: u32,
) -> Result<SummaryTable, EtlError> {
    check_precision(precision)?;
    let partial = accumulate(records, group_by, metric)?;
    let rows = partial
        .into_iter()
        .filter_map(|(key, acc)| {
            acc.mean().map(|m| SummaryRow {
                key,
                metric,
                average: round_to(m, precision),
                count: acc.count,
            })
        })
        .collect();

    Ok(SummaryTable {
        group_by: group_by.to_vec(),
        metric,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{KeyPart, Season};

    fn record(year: u16, location: &str, season: Season, rainfall: f64) -> AgriRecord {
        AgriRecord {
            year,
            location: Some(location.to_string()),
            area: Some(1.0),
            rainfall: Some(rainfall),
            temperature: Some(25.0),
            soil_type: Some("Red".into()),
            irrigation: Some("Drip".into()),
            yields: Some(2000.0),
            humidity: Some(60.0),
            crop: Some("Ragi".into()),
            price: Some(1000),
            season,
        }
    }

    fn fixture() -> Vec<AgriRecord> {
        vec![
            record(2018, "Bangalore", Season::Kharif, 100.0),
            record(2018, "Bangalore", Season::Kharif, 300.0),
            record(2017, "Mysuru", Season::Rabi, 50.0),
        ]
    }

    fn key(year: i64, season: &str) -> GroupKey {
        vec![KeyPart::Int(year), KeyPart::Text(season.into())]
    }

    #[test]
    fn test_rainfall_by_year_season() {
        let result = aggregate(
            &fixture(),
            &[GroupField::Year, GroupField::Season],
            Metric::Rainfall,
            2,
        )
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[&key(2018, "Kharif")], 200.0);
        assert_eq!(result[&key(2017, "Rabi")], 50.0);
    }

    #[test]
    fn test_key_follows_requested_order() {
        let result = aggregate(
            &fixture(),
            &[GroupField::Season, GroupField::Year],
            Metric::Rainfall,
            2,
        )
        .unwrap();

        let keys: Vec<_> = result.keys().cloned().collect();
        assert_eq!(
            keys[0],
            vec![KeyPart::Text("Kharif".into()), KeyPart::Int(2018)]
        );
    }

    #[test]
    fn test_empty_group_by_is_overall_mean() {
        let result = aggregate(&fixture(), &[], Metric::Rainfall, 2).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[&GroupKey::new()], 150.0);
    }

    #[test]
    fn test_missing_values_are_excluded_not_zero_filled() {
        let mut records = fixture();
        records[1].rainfall = None;
        records[2].location = None;

        let result = aggregate(&records, &[GroupField::Location], Metric::Rainfall, 2).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[&vec![KeyPart::Text("Bangalore".into())]], 100.0);
    }

    #[test]
    fn test_no_records_no_groups() {
        let result = aggregate(&[], &[GroupField::Year], Metric::Yields, 2).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_duplicate_group_field_rejected() {
        let err = aggregate(
            &fixture(),
            &[GroupField::Year, GroupField::Year],
            Metric::Rainfall,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::InvalidGrouping(_)));
    }

    #[test]
    fn test_precision_applied() {
        let records = vec![
            record(2018, "Bangalore", Season::Kharif, 1.0),
            record(2018, "Bangalore", Season::Kharif, 2.0),
            record(2018, "Bangalore", Season::Kharif, 2.0),
        ];
        let result = aggregate(&records, &[GroupField::Year], Metric::Rainfall, 3).unwrap();
        assert_eq!(result[&vec![KeyPart::Int(2018)]], 1.667);
    }

    #[test]
    fn test_precision_above_maximum_rejected() {
        let records = fixture();
        let fields = [GroupField::Year];

        for precision in [JobConfig::MAX_PRECISION + 1, 400, u32::MAX] {
            let err = aggregate(&records, &fields, Metric::Rainfall, precision).unwrap_err();
            assert!(matches!(err, EtlError::Config(_)));
            assert!(aggregate_table(&records, &fields, Metric::Rainfall, precision).is_err());
        }

        let result =
            aggregate(&records, &fields, Metric::Rainfall, JobConfig::MAX_PRECISION).unwrap();
        assert_eq!(result[&vec![KeyPart::Int(2018)]], 200.0);
    }

    #[test]
    fn test_merged_shards_match_single_pass() {
        let records = fixture();
        let fields = [GroupField::Year, GroupField::Season];

        let mut left = accumulate(&records[..1], &fields, Metric::Rainfall).unwrap();
        let right = accumulate(&records[1..], &fields, Metric::Rainfall).unwrap();
        merge_partials(&mut left, &right);

        let whole = aggregate(&records, &fields, Metric::Rainfall, 2).unwrap();
        assert_eq!(finalize(&left, 2), whole);
    }

    #[test]
    fn test_aggregate_table_counts() {
        let table =
            aggregate_table(&fixture(), &[GroupField::Location], Metric::Rainfall, 2).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].key, vec![KeyPart::Text("Bangalore".into())]);
        assert_eq!(table.rows[0].count, 2);
        assert_eq!(table.rows[0].average, 200.0);
        assert_eq!(table.rows[1].count, 1);
    }

    #[test]
    fn test_deterministic() {
        let a = aggregate_table(&fixture(), &[GroupField::Season], Metric::Rainfall, 4).unwrap();
        let b = aggregate_table(&fixture(), &[GroupField::Season], Metric::Rainfall, 4).unwrap();
        assert_eq!(a, b);
    }
}
