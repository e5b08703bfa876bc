//! Attribute values and CF (Climate and Forecast) attribute extraction.
//!
//! Masking decisions read `_FillValue`, `missing_value`, `valid_range`,
//! `valid_min` and `valid_max`; time decoding reads `units` and `calendar`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{json_float, Value};

/// Attributes attached to a variable or to the dataset itself.
pub type Attributes = BTreeMap<String, AttrValue>;

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    #[serde(
        serialize_with = "json_float::serialize_one",
        deserialize_with = "json_float::deserialize_one"
    )]
    Double(f64),
    Text(String),
    IntArray(Vec<i64>),
    #[serde(with = "json_float")]
    DoubleArray(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar numeric view; single-element arrays count as scalars.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Double(v) => Some(*v),
            AttrValue::IntArray(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::DoubleArray(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::Int(v) => Some(vec![*v as f64]),
            AttrValue::Double(v) => Some(vec![*v]),
            AttrValue::IntArray(v) => Some(v.iter().map(|x| *x as f64).collect()),
            AttrValue::DoubleArray(v) => Some(v.clone()),
            AttrValue::Text(_) => None,
        }
    }

    /// Convert to a cell value, used for fill values.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            AttrValue::Text(s) => Some(Value::Text(s.clone())),
            AttrValue::Int(v) => Some(Value::Int64(*v)),
            AttrValue::Double(v) => Some(Value::Double(*v)),
            AttrValue::IntArray(v) => v.first().map(|x| Value::Int64(*x)),
            AttrValue::DoubleArray(v) => v.first().map(|x| Value::Double(*x)),
        }
    }

    /// Attribute form of a cell value. Times have no attribute form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Byte(v) => Some(AttrValue::Int(*v as i64)),
            Value::Short(v) => Some(AttrValue::Int(*v as i64)),
            Value::Int(v) => Some(AttrValue::Int(*v as i64)),
            Value::Int64(v) => Some(AttrValue::Int(*v)),
            Value::Float(v) => Some(AttrValue::Double(*v as f64)),
            Value::Double(v) => Some(AttrValue::Double(*v)),
            Value::Text(v) => Some(AttrValue::Text(v.clone())),
            Value::Time(_) => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Text(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Double(v) => write!(f, "{}", v),
            AttrValue::IntArray(v) => write!(f, "{:?}", v),
            AttrValue::DoubleArray(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Double(v)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        AttrValue::DoubleArray(v)
    }
}

/// Standard CF attributes that drive masking and time decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfAttributes {
    /// Fill value indicating missing data.
    pub fill_value: Option<AttrValue>,
    /// Alternative missing value indicator(s).
    pub missing_value: Option<AttrValue>,
    /// Lower bound of valid data, from `valid_range` or `valid_min`.
    pub valid_min: Option<f64>,
    /// Upper bound of valid data, from `valid_range` or `valid_max`.
    pub valid_max: Option<f64>,
    /// Physical units (also carries CF time units).
    pub units: Option<String>,
    /// Calendar for time variables.
    pub calendar: Option<String>,
}

/// Extract the CF attributes from an attribute map.
pub fn extract_cf_attributes(attrs: &Attributes) -> CfAttributes {
    let (mut valid_min, mut valid_max) = (None, None);
    if let Some(range) = attrs.get("valid_range").and_then(AttrValue::as_f64_vec) {
        if range.len() >= 2 {
            valid_min = Some(range[0]);
            valid_max = Some(range[1]);
        }
    }
    if valid_min.is_none() {
        valid_min = attrs.get("valid_min").and_then(AttrValue::as_f64);
    }
    if valid_max.is_none() {
        valid_max = attrs.get("valid_max").and_then(AttrValue::as_f64);
    }

    CfAttributes {
        fill_value: attrs.get("_FillValue").cloned(),
        missing_value: attrs.get("missing_value").cloned(),
        valid_min,
        valid_max,
        units: get_string(attrs, "units"),
        calendar: get_string(attrs, "calendar"),
    }
}

fn get_string(attrs: &Attributes, key: &str) -> Option<String> {
    attrs.get(key).and_then(AttrValue::as_str).map(str::to_string)
}
