use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::EtlError;

/// Oldest year present in the historical dataset.
pub const MIN_YEAR: u16 = 2004;
/// Newest year present in the historical dataset.
pub const MAX_YEAR: u16 = 2018;

/// What to do with a value outside its documented domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Skip the whole row.
    #[default]
    Reject,
    /// Pull the value back into its domain and keep the row.
    Clamp,
}

/// What `clean` does with empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Drop records with any empty cell.
    #[default]
    Drop,
    /// Fill numeric cells with the column mean; drop records missing categorical cells.
    Impute,
}

/// Job configuration.
///
/// Stored as a JSON object on disk; every key is optional:
/// ```json
/// {
///   "strict": false,
///   "range_policy": "clamp",
///   "missing_policy": "impute",
///   "precision": 2,
///   "locations": ["Bangalore", "Mysuru"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Abort the load on the first malformed row.
    pub strict: bool,
    pub range_policy: RangePolicy,
    pub missing_policy: MissingPolicy,
    /// Decimal places kept in averages.
    pub precision: u32,
    pub min_year: u16,
    pub max_year: u16,
    /// Allowed regions. Any non-empty location is accepted when unset.
    pub locations: Option<BTreeSet<String>>,
    /// Row errors kept in the load report for display; counts are always complete.
    pub max_row_errors: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            strict: false,
            range_policy: RangePolicy::Reject,
            missing_policy: MissingPolicy::Drop,
            precision: 2,
            min_year: MIN_YEAR,
            max_year: MAX_YEAR,
            locations: None,
            max_row_errors: 50,
        }
    }
}

impl JobConfig {
    /// Largest supported precision; beyond this `10^p` stops being exact in f64.
    pub const MAX_PRECISION: u32 = 10;

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EtlError> {
        let content = std::fs::read_to_string(path)?;
        let config: JobConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), EtlError> {
        if self.min_year > self.max_year {
            return Err(EtlError::Config(format!(
                "min_year {} is after max_year {}",
                self.min_year, self.max_year
            )));
        }
        if self.precision > Self::MAX_PRECISION {
            return Err(EtlError::Config(format!(
                "precision {} exceeds maximum of {}",
                self.precision,
                Self::MAX_PRECISION
            )));
        }
        if let Some(locations) = &self.locations {
            if locations.is_empty() {
                return Err(EtlError::Config("locations list is empty".into()));
            }
        }
        Ok(())
    }

    /// True when `location` is accepted by this config.
    pub fn allows_location(&self, location: &str) -> bool {
        match &self.locations {
            Some(allowed) => allowed.contains(location),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_defaults() {
        let config = JobConfig::default();
        assert!(!config.strict);
        assert_eq!(config.range_policy, RangePolicy::Reject);
        assert_eq!(config.missing_policy, MissingPolicy::Drop);
        assert_eq!(config.precision, 2);
        assert_eq!((config.min_year, config.max_year), (2004, 2018));
        assert!(config.allows_location("Anywhere"));
        config.validate().unwrap();
    }

    #[test]
    fn test_load_partial_file() {
        let path = temp_path("agri_etl_test_config.json");
        fs::write(
            &path,
            r#"{"range_policy": "clamp", "precision": 3, "locations": ["Mysuru"]}"#,
        )
        .unwrap();

        let config = JobConfig::load(&path).unwrap();
        assert_eq!(config.range_policy, RangePolicy::Clamp);
        assert_eq!(config.precision, 3);
        assert_eq!(config.missing_policy, MissingPolicy::Drop);
        assert!(config.allows_location("Mysuru"));
        assert!(!config.allows_location("Bangalore"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let path = temp_path("agri_etl_test_config_unknown.json");
        fs::write(&path, r#"{"precison": 3}"#).unwrap();

        assert!(matches!(JobConfig::load(&path), Err(EtlError::Json(_))));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate_year_range_and_precision() {
        let config = JobConfig {
            min_year: 2018,
            max_year: 2004,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));

        let config = JobConfig {
            precision: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
