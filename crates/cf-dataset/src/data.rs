//! Storage types, typed arrays and scalar cell values.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// netCDF default fill values, applied when a variable declares no `_FillValue`.
pub const NC_FILL_BYTE: i8 = -127;
pub const NC_FILL_CHAR: u8 = 0;
pub const NC_FILL_SHORT: i16 = -32767;
pub const NC_FILL_INT: i32 = -2147483647;
pub const NC_FILL_INT64: i64 = -9223372036854775806;
pub const NC_FILL_FLOAT: f32 = 9.969_209_968_386_869e36;
pub const NC_FILL_DOUBLE: f64 = 9.969_209_968_386_869e36;

/// Storage type of a variable, named after the netCDF types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// NC_BYTE: signed 8-bit integer
    Byte,
    /// NC_SHORT: signed 16-bit integer
    Short,
    /// NC_INT: signed 32-bit integer
    Int,
    /// NC_INT64: signed 64-bit integer
    Int64,
    /// NC_FLOAT: 32-bit float
    Float,
    /// NC_DOUBLE: 64-bit float
    Double,
    /// NC_CHAR: single character, strings are stored along a trailing dimension
    Char,
    /// NC_STRING: variable length string
    String,
}

impl DataType {
    /// netCDF type name.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Char => "char",
            DataType::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::Char | DataType::String)
    }

    /// The netCDF library default fill value for this type.
    pub fn default_fill(&self) -> Value {
        match self {
            DataType::Byte => Value::Byte(NC_FILL_BYTE),
            DataType::Short => Value::Short(NC_FILL_SHORT),
            DataType::Int => Value::Int(NC_FILL_INT),
            DataType::Int64 => Value::Int64(NC_FILL_INT64),
            DataType::Float => Value::Float(NC_FILL_FLOAT),
            DataType::Double => Value::Double(NC_FILL_DOUBLE),
            DataType::Char => Value::Text(String::new()),
            DataType::String => Value::Text(String::new()),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Time(DateTime<Utc>),
}

impl Value {
    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(v) => Some(*v as f64),
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Text(_) | Value::Time(_) => None,
        }
    }

    /// Integer view of the value. Floats convert only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::Float(_) | Value::Double(_) => {
                let v = self.as_f64()?;
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.2e18 {
                    Some(v as i64)
                } else {
                    None
                }
            }
            Value::Text(_) | Value::Time(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

/// Flat, row-major contents of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ArrayData {
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Int64(Vec<i64>),
    #[serde(with = "json_float")]
    Float(Vec<f32>),
    #[serde(with = "json_float")]
    Double(Vec<f64>),
    Char(Vec<u8>),
    String(Vec<String>),
}

impl ArrayData {
    /// Build an array of `len` copies of `fill`, or of the type default.
    ///
    /// Returns `None` when `fill` cannot be represented in `dtype`.
    pub fn filled(dtype: DataType, len: usize, fill: Option<&Value>) -> Option<Self> {
        let fill = fill.cloned().unwrap_or_else(|| dtype.default_fill());
        let data = match dtype {
            DataType::Byte => ArrayData::Byte(vec![to_i8(&fill)?; len]),
            DataType::Short => ArrayData::Short(vec![to_i16(&fill)?; len]),
            DataType::Int => ArrayData::Int(vec![to_i32(&fill)?; len]),
            DataType::Int64 => ArrayData::Int64(vec![fill.as_i64()?; len]),
            DataType::Float => ArrayData::Float(vec![fill.as_f64()? as f32; len]),
            DataType::Double => ArrayData::Double(vec![fill.as_f64()?; len]),
            DataType::Char => ArrayData::Char(vec![to_char(&fill)?; len]),
            DataType::String => ArrayData::String(vec![fill.as_str()?.to_string(); len]),
        };
        Some(data)
    }

    /// Fixed-width character data from a list of strings, padded with NULs.
    pub fn chars<S: AsRef<str>>(strings: &[S], width: usize) -> Self {
        let mut bytes = Vec::with_capacity(strings.len() * width);
        for s in strings {
            let raw = s.as_ref().as_bytes();
            let n = raw.len().min(width);
            bytes.extend_from_slice(&raw[..n]);
            bytes.extend(std::iter::repeat(NC_FILL_CHAR).take(width - n));
        }
        ArrayData::Char(bytes)
    }

    pub fn dtype(&self) -> DataType {
        match self {
            ArrayData::Byte(_) => DataType::Byte,
            ArrayData::Short(_) => DataType::Short,
            ArrayData::Int(_) => DataType::Int,
            ArrayData::Int64(_) => DataType::Int64,
            ArrayData::Float(_) => DataType::Float,
            ArrayData::Double(_) => DataType::Double,
            ArrayData::Char(_) => DataType::Char,
            ArrayData::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Byte(v) => v.len(),
            ArrayData::Short(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Double(v) => v.len(),
            ArrayData::Char(v) => v.len(),
            ArrayData::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a single cell.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            ArrayData::Byte(v) => v.get(index).map(|x| Value::Byte(*x)),
            ArrayData::Short(v) => v.get(index).map(|x| Value::Short(*x)),
            ArrayData::Int(v) => v.get(index).map(|x| Value::Int(*x)),
            ArrayData::Int64(v) => v.get(index).map(|x| Value::Int64(*x)),
            ArrayData::Float(v) => v.get(index).map(|x| Value::Float(*x)),
            ArrayData::Double(v) => v.get(index).map(|x| Value::Double(*x)),
            ArrayData::Char(v) => v
                .get(index)
                .map(|x| Value::Text(String::from_utf8_lossy(&[*x]).into_owned())),
            ArrayData::String(v) => v.get(index).map(|x| Value::Text(x.clone())),
        }
    }

    /// Write a single cell, converting numeric values where lossless enough.
    ///
    /// Returns `false` when the value cannot be stored in this array's type
    /// or the index is out of range.
    pub fn set(&mut self, index: usize, value: &Value) -> bool {
        if index >= self.len() {
            return false;
        }
        match self {
            ArrayData::Byte(v) => to_i8(value).map(|x| v[index] = x).is_some(),
            ArrayData::Short(v) => to_i16(value).map(|x| v[index] = x).is_some(),
            ArrayData::Int(v) => to_i32(value).map(|x| v[index] = x).is_some(),
            ArrayData::Int64(v) => value.as_i64().map(|x| v[index] = x).is_some(),
            ArrayData::Float(v) => value.as_f64().map(|x| v[index] = x as f32).is_some(),
            ArrayData::Double(v) => value.as_f64().map(|x| v[index] = x).is_some(),
            ArrayData::Char(v) => to_char(value).map(|x| v[index] = x).is_some(),
            ArrayData::String(v) => value
                .as_str()
                .map(|x| v[index] = x.to_string())
                .is_some(),
        }
    }

    /// All values widened to f64, for numeric arrays only.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let out = match self {
            ArrayData::Byte(v) => v.iter().map(|x| *x as f64).collect(),
            ArrayData::Short(v) => v.iter().map(|x| *x as f64).collect(),
            ArrayData::Int(v) => v.iter().map(|x| *x as f64).collect(),
            ArrayData::Int64(v) => v.iter().map(|x| *x as f64).collect(),
            ArrayData::Float(v) => v.iter().map(|x| *x as f64).collect(),
            ArrayData::Double(v) => v.clone(),
            ArrayData::Char(_) | ArrayData::String(_) => return None,
        };
        Some(out)
    }
}

fn to_i8(value: &Value) -> Option<i8> {
    value.as_i64().and_then(|x| i8::try_from(x).ok())
}

fn to_i16(value: &Value) -> Option<i16> {
    value.as_i64().and_then(|x| i16::try_from(x).ok())
}

fn to_i32(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|x| i32::try_from(x).ok())
}

fn to_char(value: &Value) -> Option<u8> {
    match value {
        Value::Text(s) if s.is_empty() => Some(NC_FILL_CHAR),
        Value::Text(s) if s.len() == 1 => s.bytes().next(),
        Value::Byte(b) => Some(*b as u8),
        _ => None,
    }
}

/// JSON encoding of floating point cells. JSON has no NaN or infinity, so
/// those are written as the strings `"NaN"`, `"inf"` and `"-inf"`; `null`
/// reads back as NaN.
pub(crate) mod json_float {
    use serde::de::{self, Deserializer};
    use serde::ser::{SerializeSeq, Serializer};
    use serde::{Deserialize, Serialize};

    pub trait Float: Copy + Serialize {
        fn to_f64(self) -> f64;
        fn from_f64(v: f64) -> Self;
    }

    impl Float for f32 {
        fn to_f64(self) -> f64 {
            self as f64
        }
        fn from_f64(v: f64) -> Self {
            v as f32
        }
    }

    impl Float for f64 {
        fn to_f64(self) -> f64 {
            self
        }
        fn from_f64(v: f64) -> Self {
            v
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Number(f64),
        Text(String),
    }

    fn special(v: f64) -> Option<&'static str> {
        if v.is_nan() {
            Some("NaN")
        } else if v == f64::INFINITY {
            Some("inf")
        } else if v == f64::NEG_INFINITY {
            Some("-inf")
        } else {
            None
        }
    }

    pub fn parse_special(s: &str) -> Option<f64> {
        match s {
            "NaN" | "nan" => Some(f64::NAN),
            "inf" | "+inf" | "Infinity" => Some(f64::INFINITY),
            "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        }
    }

    fn from_cell<E: de::Error>(cell: Option<Cell>) -> Result<f64, E> {
        match cell {
            None => Ok(f64::NAN),
            Some(Cell::Number(v)) => Ok(v),
            Some(Cell::Text(s)) => parse_special(&s).ok_or_else(|| {
                E::invalid_value(de::Unexpected::Str(&s), &"a number, \"NaN\", \"inf\" or \"-inf\"")
            }),
        }
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<T: Float, S: Serializer>(values: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            match special(v.to_f64()) {
                Some(text) => seq.serialize_element(text)?,
                None => seq.serialize_element(v)?,
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, T: Float, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<T>, D::Error> {
        Vec::<Option<Cell>>::deserialize(deserializer)?
            .into_iter()
            .map(|cell| from_cell(cell).map(T::from_f64))
            .collect()
    }

    pub fn serialize_one<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        match special(*v) {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_f64(*v),
        }
    }

    pub fn deserialize_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        from_cell(Option::<Cell>::deserialize(deserializer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_uses_type_default() {
        let data = ArrayData::filled(DataType::Int, 3, None).unwrap();
        assert_eq!(data, ArrayData::Int(vec![NC_FILL_INT; 3]));

        let data = ArrayData::filled(DataType::Double, 2, Some(&Value::Double(-9999.9))).unwrap();
        assert_eq!(data, ArrayData::Double(vec![-9999.9, -9999.9]));
    }

    #[test]
    fn test_filled_rejects_incompatible_fill() {
        assert!(ArrayData::filled(DataType::Byte, 1, Some(&Value::Int(1000))).is_none());
        assert!(ArrayData::filled(DataType::Int, 1, Some(&Value::from("x"))).is_none());
    }

    #[test]
    fn test_set_converts_numeric_values() {
        let mut data = ArrayData::Int(vec![0; 2]);
        assert!(data.set(0, &Value::Double(4.0)));
        assert!(!data.set(1, &Value::Double(4.5)));
        assert!(!data.set(2, &Value::Int(1)));
        assert!(!data.set(1, &Value::from("text")));
        assert_eq!(data, ArrayData::Int(vec![4, 0]));
    }

    #[test]
    fn test_chars_pads_with_nul() {
        let data = ArrayData::chars(&["ab", "c"], 3);
        assert_eq!(data, ArrayData::Char(vec![b'a', b'b', 0, b'c', 0, 0]));
    }

    #[test]
    fn test_array_data_json_shape() {
        let data = ArrayData::Double(vec![1.0, 2.5]);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"type":"double","values":[1.0,2.5]}"#);
        let back: ArrayData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_non_finite_cells_as_strings() {
        let data = ArrayData::Float(vec![1.5, f32::NAN, f32::INFINITY, f32::NEG_INFINITY]);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"type":"float","values":[1.5,"NaN","inf","-inf"]}"#);

        let ArrayData::Float(back) = serde_json::from_str(&json).unwrap() else {
            panic!("expected float data");
        };
        assert_eq!(back[0], 1.5);
        assert!(back[1].is_nan());
        assert_eq!(back[2], f32::INFINITY);
        assert_eq!(back[3], f32::NEG_INFINITY);
    }

    #[test]
    fn test_null_cell_reads_as_nan() {
        let data: ArrayData = serde_json::from_str(r#"{"type":"double","values":[2,null]}"#).unwrap();
        let ArrayData::Double(values) = data else {
            panic!("expected double data");
        };
        assert_eq!(values[0], 2.0);
        assert!(values[1].is_nan());

        let err = serde_json::from_str::<ArrayData>(r#"{"type":"double","values":["warm"]}"#);
        assert!(err.is_err());
    }
}
