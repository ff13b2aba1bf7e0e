//! Star-schema export: one fact table referencing per-attribute dimensions.
//!
//! Dimension ids are assigned over the sorted distinct values, starting at 1,
//! so the same input always yields the same ids. Id 0 is the "unknown" member
//! that facts reference when the attribute is missing.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::EtlError;
use crate::record::AgriRecord;

/// Id referenced by facts whose attribute is missing.
pub const UNKNOWN_ID: u32 = 0;
const UNKNOWN_LABEL: &str = "Unknown";

/// Distinct values of one categorical attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: &'static str,
    ids: BTreeMap<String, u32>,
}

#[derive(Serialize)]
struct DimensionRow<'a> {
    id: u32,
    value: &'a str,
}

impl Dimension {
    fn build<'a>(name: &'static str, values: impl Iterator<Item = Option<&'a str>>) -> Self {
        let distinct: BTreeSet<&str> = values.flatten().collect();
        let ids = distinct
            .into_iter()
            .zip(1u32..)
            .map(|(v, id)| (v.to_string(), id))
            .collect();
        Self { name, ids }
    }

    /// Id for `value`, [`UNKNOWN_ID`] when missing.
    pub fn id_of(&self, value: Option<&str>) -> u32 {
        value
            .and_then(|v| self.ids.get(v).copied())
            .unwrap_or(UNKNOWN_ID)
    }

    /// Number of members, excluding the unknown member.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn write(&self, path: &Path) -> Result<(), EtlError> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer.serialize(DimensionRow {
            id: UNKNOWN_ID,
            value: UNKNOWN_LABEL,
        })?;

        let mut rows: Vec<(&String, &u32)> = self.ids.iter().collect();
        rows.sort_by_key(|(_, id)| **id);
        for (value, id) in rows {
            writer.serialize(DimensionRow { id: *id, value })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// One fact row: dimension ids plus measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub year: u16,
    pub location_id: u32,
    pub crop_id: u32,
    pub season_id: u32,
    pub soil_type_id: u32,
    pub irrigation_id: u32,
    pub area: Option<f64>,
    pub rainfall: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub yields: Option<f64>,
    pub price: Option<u64>,
}

/// Fact table plus its dimensions.
#[derive(Debug, Clone)]
pub struct StarSchema {
    pub location: Dimension,
    pub crop: Dimension,
    pub season: Dimension,
    pub soil_type: Dimension,
    pub irrigation: Dimension,
    pub facts: Vec<Fact>,
}

impl StarSchema {
    pub fn build(records: &[AgriRecord]) -> Self {
        let location = Dimension::build("location", records.iter().map(|r| r.location.as_deref()));
        let crop = Dimension::build("crop", records.iter().map(|r| r.crop.as_deref()));
        let season = Dimension::build("season", records.iter().map(|r| Some(r.season.as_str())));
        let soil_type =
            Dimension::build("soil_type", records.iter().map(|r| r.soil_type.as_deref()));
        let irrigation =
            Dimension::build("irrigation", records.iter().map(|r| r.irrigation.as_deref()));

        let facts = records
            .iter()
            .map(|r| Fact {
                year: r.year,
                location_id: location.id_of(r.location.as_deref()),
                crop_id: crop.id_of(r.crop.as_deref()),
                season_id: season.id_of(Some(r.season.as_str())),
                soil_type_id: soil_type.id_of(r.soil_type.as_deref()),
                irrigation_id: irrigation.id_of(r.irrigation.as_deref()),
                area: r.area,
                rainfall: r.rainfall,
                temperature: r.temperature,
                humidity: r.humidity,
                yields: r.yields,
                price: r.price,
            })
            .collect();

        Self {
            location,
            crop,
            season,
            soil_type,
            irrigation,
            facts,
        }
    }

    pub fn dimensions(&self) -> [&Dimension; 5] {
        [
            &self.location,
            &self.crop,
            &self.season,
            &self.soil_type,
            &self.irrigation,
        ]
    }

    /// Writes `dim_<name>.csv` per dimension and `fact_agri.csv` into `dir`.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>, EtlError> {
        fs::create_dir_all(dir)?;
        let mut paths = Vec::new();

        for dim in self.dimensions() {
            let path = dir.join(format!("dim_{}.csv", dim.name));
            dim.write(&path)?;
            paths.push(path);
        }

        let path = dir.join("fact_agri.csv");
        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        for fact in &self.facts {
            writer.serialize(fact)?;
        }
        writer.flush()?;
        paths.push(path);

        info!(
            dir = %dir.display(),
            facts = self.facts.len(),
            locations = self.location.len(),
            crops = self.crop.len(),
            "Star schema written"
        );
        Ok(paths)
    }
}
