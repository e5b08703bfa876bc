//! Configuration for expansion and compaction.

use std::path::Path;

use cf_dataset::{TimeUnit, TimeUnits};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DsgError, Result};
use crate::metadata::AttributeConfig;

/// Default time units written by compaction.
pub const DEFAULT_TIME_UNITS: &str = "seconds since 1990-01-01 00:00:00Z";

/// Default fill value written by compaction, cast to each variable's type.
pub const DEFAULT_FILL_VALUE: f64 = -9999.9;

/// Column names used for the logical axes of a tabular relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisNames {
    pub t: String,
    pub x: String,
    pub y: String,
    pub z: String,
    pub profile: String,
    pub station: String,
}

impl Default for AxisNames {
    fn default() -> Self {
        Self {
            t: "t".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            z: "z".to_string(),
            profile: "profile".to_string(),
            station: "station".to_string(),
        }
    }
}

impl AxisNames {
    /// All reserved column names.
    pub fn reserved(&self) -> [&str; 6] {
        [
            self.t.as_str(),
            self.x.as_str(),
            self.y.as_str(),
            self.z.as_str(),
            self.profile.as_str(),
            self.station.as_str(),
        ]
    }

    pub fn is_reserved(&self, column: &str) -> bool {
        self.reserved().contains(&column)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let names = self.reserved();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err("axis column names must not be empty".to_string());
            }
            if names[i + 1..].contains(name) {
                return Err(format!("axis column name '{}' is used twice", name));
            }
        }
        Ok(())
    }
}

/// Options for turning a dataset into a tabular relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOptions {
    pub axes: AxisNames,
    /// Drop columns whose cells are all masked.
    pub clean_cols: bool,
    /// Drop rows where every contributing data variable is masked.
    pub clean_rows: bool,
}

impl ExpandOptions {
    pub fn new(clean_cols: bool, clean_rows: bool) -> Self {
        Self {
            axes: AxisNames::default(),
            clean_cols,
            clean_rows,
        }
    }

    pub fn with_axes(mut self, axes: AxisNames) -> Self {
        self.axes = axes;
        self
    }
}

/// Options for turning a tabular relation back into a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactOptions {
    pub axes: AxisNames,
    /// Units of the written time coordinate and of time-typed data columns.
    pub time_units: TimeUnits,
    pub fill_value: f64,
    /// Caller attributes, applied over the computed defaults.
    pub attributes: AttributeConfig,
}

impl Default for CompactOptions {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            time_units: default_time_units(),
            fill_value: DEFAULT_FILL_VALUE,
            attributes: AttributeConfig::default(),
        }
    }
}

impl CompactOptions {
    pub fn with_attributes(mut self, attributes: AttributeConfig) -> Self {
        self.attributes = attributes;
        self
    }
}

/// `seconds since 1990-01-01 00:00:00Z`
fn default_time_units() -> TimeUnits {
    let epoch = DateTime::<Utc>::default() + Duration::days(7305);
    TimeUnits::new(TimeUnit::Seconds, epoch)
}

/// Top-level configuration, loaded from defaults, a YAML file or the
/// environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DsgConfig {
    pub axes: AxisNames,

    /// Override the per-geometry default for dropping empty columns.
    pub clean_cols: Option<bool>,

    /// Override the per-geometry default for dropping empty rows.
    pub clean_rows: Option<bool>,

    /// Time units written by compaction.
    pub time_units: String,

    /// Fill value written by compaction.
    pub fill_value: f64,
}

impl Default for DsgConfig {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            clean_cols: None,
            clean_rows: None,
            time_units: DEFAULT_TIME_UNITS.to_string(),
            fill_value: DEFAULT_FILL_VALUE,
        }
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl DsgConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Override fields from environment variables that are set.
    pub fn apply_env(&mut self) {
        let axis_vars = [
            ("DSG_AXIS_T", &mut self.axes.t),
            ("DSG_AXIS_X", &mut self.axes.x),
            ("DSG_AXIS_Y", &mut self.axes.y),
            ("DSG_AXIS_Z", &mut self.axes.z),
            ("DSG_AXIS_PROFILE", &mut self.axes.profile),
            ("DSG_AXIS_STATION", &mut self.axes.station),
        ];
        for (key, field) in axis_vars {
            if let Ok(val) = std::env::var(key) {
                *field = val;
            }
        }

        if let Ok(val) = std::env::var("DSG_CLEAN_COLS") {
            self.clean_cols = Some(parse_bool(&val));
        }

        if let Ok(val) = std::env::var("DSG_CLEAN_ROWS") {
            self.clean_rows = Some(parse_bool(&val));
        }

        if let Ok(val) = std::env::var("DSG_TIME_UNITS") {
            self.time_units = val;
        }

        if let Ok(val) = std::env::var("DSG_FILL_VALUE") {
            if let Ok(fill) = val.parse() {
                self.fill_value = fill;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.axes.validate()?;

        if let Err(e) = self.time_units.parse::<TimeUnits>() {
            return Err(format!("time_units: {}", e));
        }

        if !self.fill_value.is_finite() {
            return Err("fill_value must be finite".to_string());
        }

        Ok(())
    }

    /// Expansion options, using the given geometry defaults for unset flags.
    pub fn expand_options(&self, defaults: &ExpandOptions) -> ExpandOptions {
        ExpandOptions {
            axes: self.axes.clone(),
            clean_cols: self.clean_cols.unwrap_or(defaults.clean_cols),
            clean_rows: self.clean_rows.unwrap_or(defaults.clean_rows),
        }
    }

    /// Compaction options carrying the given caller attributes.
    pub fn compact_options(&self, attributes: AttributeConfig) -> Result<CompactOptions> {
        let time_units = self
            .time_units
            .parse::<TimeUnits>()
            .map_err(|e| DsgError::config(format!("time_units: {}", e)))?;
        Ok(CompactOptions {
            axes: self.axes.clone(),
            time_units,
            fill_value: self.fill_value,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DsgConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.axes.profile, "profile");
        assert_eq!(config.time_units, DEFAULT_TIME_UNITS);
    }

    #[test]
    fn test_validate_rejects_duplicate_axes() {
        let mut config = DsgConfig::default();
        config.axes.z = "t".to_string();
        assert!(config.validate().unwrap_err().contains("used twice"));
    }

    #[test]
    fn test_validate_rejects_bad_units() {
        let config = DsgConfig {
            time_units: "eons since forever".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(config.compact_options(AttributeConfig::default()).is_err());
    }

    #[test]
    fn test_yaml_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsg.yaml");
        std::fs::write(&path, "axes:\n  t: time\nclean_rows: false\n").unwrap();

        let config = DsgConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.axes.t, "time");
        assert_eq!(config.axes.x, "x");
        assert_eq!(config.clean_rows, Some(false));
        assert_eq!(config.fill_value, DEFAULT_FILL_VALUE);
    }

    #[test]
    fn test_expand_options_fall_back_to_defaults() {
        let config = DsgConfig {
            clean_rows: Some(false),
            ..Default::default()
        };
        let opts = config.expand_options(&ExpandOptions::new(true, true));
        assert!(opts.clean_cols);
        assert!(!opts.clean_rows);
    }

    #[test]
    fn test_compact_options_default_units() {
        let opts = CompactOptions::default();
        assert_eq!(opts.time_units.to_string(), DEFAULT_TIME_UNITS);
        assert_eq!(opts.fill_value, -9999.9);
    }
}
