//! Domain types for the agricultural dataset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EtlError;

/// Cropping season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Kharif,
    Rabi,
    Zaid,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Zaid => "Zaid",
        }
    }
}

impl FromStr for Season {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kharif" => Ok(Season::Kharif),
            "rabi" => Ok(Season::Rabi),
            "zaid" => Ok(Season::Zaid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the raw dataset.
///
/// Optional fields hold `None` for empty cells until [`crate::clean::clean`]
/// resolves them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgriRecord {
    pub year: u16,
    pub location: Option<String>,
    pub area: Option<f64>,
    pub rainfall: Option<f64>,
    pub temperature: Option<f64>,
    pub soil_type: Option<String>,
    pub irrigation: Option<String>,
    pub yields: Option<f64>,
    pub humidity: Option<f64>,
    pub crop: Option<String>,
    pub price: Option<u64>,
    pub season: Season,
}

impl AgriRecord {
    /// Numeric value of `metric`, if present.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Area => self.area,
            Metric::Rainfall => self.rainfall,
            Metric::Temperature => self.temperature,
            Metric::Yields => self.yields,
            Metric::Humidity => self.humidity,
            Metric::Price => self.price.map(|p| p as f64),
        }
    }

    /// Grouping-key component for `field`, if present.
    pub fn key_part(&self, field: GroupField) -> Option<KeyPart> {
        let text = |v: &Option<String>| v.as_ref().map(|s| KeyPart::Text(s.clone()));
        match field {
            GroupField::Year => Some(KeyPart::Int(i64::from(self.year))),
            GroupField::Season => Some(KeyPart::Text(self.season.as_str().to_string())),
            GroupField::Crop => text(&self.crop),
            GroupField::Location => text(&self.location),
            GroupField::SoilType => text(&self.soil_type),
            GroupField::Irrigation => text(&self.irrigation),
        }
    }

    /// True when every optional field holds a value.
    pub fn is_complete(&self) -> bool {
        self.location.is_some()
            && self.area.is_some()
            && self.rainfall.is_some()
            && self.temperature.is_some()
            && self.soil_type.is_some()
            && self.irrigation.is_some()
            && self.yields.is_some()
            && self.humidity.is_some()
            && self.crop.is_some()
            && self.price.is_some()
    }
}

/// Categorical fields usable in a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Year,
    Season,
    Crop,
    Location,
    SoilType,
    Irrigation,
}

impl GroupField {
    /// The four dimensions the dashboards slice by.
    pub const DASHBOARD: [GroupField; 4] = [
        GroupField::Year,
        GroupField::Season,
        GroupField::Crop,
        GroupField::Location,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupField::Year => "year",
            GroupField::Season => "season",
            GroupField::Crop => "crop",
            GroupField::Location => "location",
            GroupField::SoilType => "soil_type",
            GroupField::Irrigation => "irrigation",
        }
    }

    /// Parses a comma-separated field list such as `"season,crop"`.
    pub fn parse_list(s: &str) -> Result<Vec<GroupField>, EtlError> {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for GroupField {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(GroupField::Year),
            "season" => Ok(GroupField::Season),
            "crop" | "crops" => Ok(GroupField::Crop),
            "location" => Ok(GroupField::Location),
            "soil_type" => Ok(GroupField::SoilType),
            "irrigation" => Ok(GroupField::Irrigation),
            other => Err(EtlError::InvalidGrouping(format!(
                "unknown grouping field '{other}'"
            ))),
        }
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric fields that can be averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Rainfall,
    Temperature,
    Humidity,
    Yields,
    Area,
    Price,
}

impl Metric {
    /// The four metrics the dashboards chart.
    pub const DASHBOARD: [Metric; 4] = [
        Metric::Rainfall,
        Metric::Temperature,
        Metric::Humidity,
        Metric::Yields,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rainfall => "rainfall",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Yields => "yields",
            Metric::Area => "area",
            Metric::Price => "price",
        }
    }
}

impl FromStr for Metric {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rainfall" => Ok(Metric::Rainfall),
            "temperature" => Ok(Metric::Temperature),
            "humidity" => Ok(Metric::Humidity),
            "yields" | "yield" => Ok(Metric::Yields),
            "area" => Ok(Metric::Area),
            "price" => Ok(Metric::Price),
            other => Err(EtlError::InvalidGrouping(format!("unknown metric '{other}'"))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One component of a grouping key.
///
/// Integers sort before text, so keys mixing both still have a total order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum KeyPart {
    Int(i64),
    Text(String),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{v}"),
            KeyPart::Text(v) => f.write_str(v),
        }
    }
}

/// Ordered tuple of key components, one per requested grouping field.
pub type GroupKey = Vec<KeyPart>;
