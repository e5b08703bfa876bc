//! Attribute configuration, default CF attributes and variable naming.
//!
//! An [`AttributeConfig`] is a nested map: `global` holds dataset
//! attributes and every other key holds the attributes of the variable with
//! that name.
//!
//! ```json
//! {
//!     "global": {"title": "Buoy data"},
//!     "temperature": {"units": "degC", "standard_name": "sea_water_temperature"}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use cf_dataset::{AttrValue, Attributes, Dataset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub global: Attributes,
    #[serde(flatten)]
    pub variables: BTreeMap<String, Attributes>,
}

impl AttributeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load attribute configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.global.insert(name.into(), value.into());
    }

    pub fn set(
        &mut self,
        variable: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) {
        self.variables
            .entry(variable.into())
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Attributes> {
        self.variables.get(name)
    }

    /// Merge `other` into `self`. Keys in `other` win; nested maps are
    /// merged key by key.
    pub fn merge(&mut self, other: &AttributeConfig) {
        self.global
            .extend(other.global.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (var, attrs) in &other.variables {
            self.variables
                .entry(var.clone())
                .or_default()
                .extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    /// `self` merged with `overlay`, leaving both untouched.
    pub fn merged(&self, overlay: &AttributeConfig) -> AttributeConfig {
        let mut out = self.clone();
        out.merge(overlay);
        out
    }

    /// Write the attributes into a dataset. Entries for variables the
    /// dataset does not have are ignored.
    pub fn apply(&self, ds: &mut Dataset) {
        for (name, value) in &self.global {
            ds.set_attribute(name.clone(), value.clone());
        }
        for (var_name, attrs) in &self.variables {
            match ds.variable_mut(var_name) {
                Some(var) => {
                    for (name, value) in attrs {
                        var.set_attribute(name.clone(), value.clone());
                    }
                }
                None => debug!(variable = %var_name, "No such variable, attributes ignored"),
            }
        }
    }
}

/// Default attributes of an orthogonal multidimensional timeseries file.
pub fn timeseries_defaults(time_units: &str) -> AttributeConfig {
    let mut attrs = AttributeConfig::new();
    attrs.set_global("featureType", "timeSeries");
    attrs.set_global("cdm_data_type", "Station");
    attrs.set_global("Conventions", "CF-1.6");

    attrs.set("station", "cf_role", "timeseries_id");
    attrs.set("station", "long_name", "station identifier");

    attrs.set("time", "units", time_units);
    attrs.set("time", "standard_name", "time");
    attrs.set("time", "axis", "T");
    attrs.set("time", "calendar", "standard");

    attrs.set("latitude", "units", "degrees_north");
    attrs.set("latitude", "standard_name", "latitude");
    attrs.set("latitude", "axis", "Y");

    attrs.set("longitude", "units", "degrees_east");
    attrs.set("longitude", "standard_name", "longitude");
    attrs.set("longitude", "axis", "X");

    attrs.set("z", "axis", "Z");
    attrs.set("z", "long_name", "z");

    attrs.set("crs", "grid_mapping_name", "latitude_longitude");
    attrs.set("crs", "epsg_code", "EPSG:4326");
    attrs.set("crs", "semi_major_axis", 6378137.0);
    attrs.set("crs", "inverse_flattening", 298.257223563);
    attrs
}

/// Turn a column name into a valid CF variable name.
///
/// Characters outside `[A-Za-z0-9_]` become `_`; names starting with a
/// digit or `_` get a `v_` prefix.
pub fn cf_safe_name(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if safe.is_empty() || safe.starts_with(|c: char| c.is_ascii_digit() || c == '_') {
        safe.insert_str(0, "v_");
    }
    safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_dataset::{ArrayData, Variable};

    #[test]
    fn test_cf_safe_name() {
        assert_eq!(cf_safe_name("temperature"), "temperature");
        assert_eq!(cf_safe_name("sea water temp (C)"), "sea_water_temp__C_");
        assert_eq!(cf_safe_name("1st"), "v_1st");
        assert_eq!(cf_safe_name("_hidden"), "v__hidden");
        assert_eq!(cf_safe_name(""), "v_");
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = timeseries_defaults("seconds since 1990-01-01 00:00:00Z");
        let mut caller = AttributeConfig::new();
        caller.set_global("featureType", "TimeSeries");
        caller.set_global("title", "Buoys");
        caller.set("latitude", "long_name", "Latitude");
        base.merge(&caller);

        assert_eq!(base.global["featureType"], AttrValue::from("TimeSeries"));
        assert_eq!(base.global["title"], AttrValue::from("Buoys"));
        let lat = base.variable("latitude").unwrap();
        assert_eq!(lat["long_name"], AttrValue::from("Latitude"));
        assert_eq!(lat["units"], AttrValue::from("degrees_north"));
    }

    #[test]
    fn test_json_layout() {
        let config: AttributeConfig = serde_json::from_str(
            r#"{"global": {"title": "x"}, "temp": {"units": "degC", "valid_min": -5}}"#,
        )
        .unwrap();
        assert_eq!(config.global["title"], AttrValue::from("x"));
        assert_eq!(config.variable("temp").unwrap()["valid_min"], AttrValue::Int(-5));
    }

    #[test]
    fn test_apply_ignores_unknown_variables() {
        let mut ds = Dataset::new();
        ds.add_dimension("station", 1).unwrap();
        ds.insert_variable(Variable::new("temp", &["station"], ArrayData::Double(vec![1.0])))
            .unwrap();

        let mut config = AttributeConfig::new();
        config.set_global("title", "t");
        config.set("temp", "units", "degC");
        config.set("missing", "units", "m");
        config.apply(&mut ds);

        assert_eq!(ds.attribute("title"), Some(&AttrValue::from("t")));
        assert_eq!(
            ds.variable("temp").unwrap().attribute("units"),
            Some(&AttrValue::from("degC"))
        );
    }
}
