//! Masked arrays and the fill-value/valid-range normalizer.
//!
//! A masked cell is `None`. Normalization turns raw variable contents into
//! masked arrays, flagging fill values, `missing_value`, values outside
//! `valid_range`/`valid_min`/`valid_max`, NaNs and empty strings.

use chrono::{DateTime, Utc};

use crate::attributes::{extract_cf_attributes, AttrValue, CfAttributes};
use crate::data::{ArrayData, DataType, Value};
use crate::dataset::Variable;
use crate::error::{DatasetError, DatasetResult};

/// A typed one-dimensional array where `None` marks an invalid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskedArray {
    Byte(Vec<Option<i8>>),
    Short(Vec<Option<i16>>),
    Int(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Time(Vec<Option<DateTime<Utc>>>),
}

/// Run an expression against the inner vector, whatever the variant.
macro_rules! with_cells {
    ($array:expr, $cells:ident => $body:expr) => {
        match $array {
            MaskedArray::Byte($cells) => $body,
            MaskedArray::Short($cells) => $body,
            MaskedArray::Int($cells) => $body,
            MaskedArray::Int64($cells) => $body,
            MaskedArray::Float($cells) => $body,
            MaskedArray::Double($cells) => $body,
            MaskedArray::Text($cells) => $body,
            MaskedArray::Time($cells) => $body,
        }
    };
}

/// Build a new array of the same variant from the inner vector.
macro_rules! map_cells {
    ($array:expr, $cells:ident => $body:expr) => {
        match $array {
            MaskedArray::Byte($cells) => MaskedArray::Byte($body),
            MaskedArray::Short($cells) => MaskedArray::Short($body),
            MaskedArray::Int($cells) => MaskedArray::Int($body),
            MaskedArray::Int64($cells) => MaskedArray::Int64($body),
            MaskedArray::Float($cells) => MaskedArray::Float($body),
            MaskedArray::Double($cells) => MaskedArray::Double($body),
            MaskedArray::Text($cells) => MaskedArray::Text($body),
            MaskedArray::Time($cells) => MaskedArray::Time($body),
        }
    };
}

impl MaskedArray {
    /// An array of `len` masked cells that would store `dtype` values.
    pub fn masked(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::Byte => MaskedArray::Byte(vec![None; len]),
            DataType::Short => MaskedArray::Short(vec![None; len]),
            DataType::Int => MaskedArray::Int(vec![None; len]),
            DataType::Int64 => MaskedArray::Int64(vec![None; len]),
            DataType::Float => MaskedArray::Float(vec![None; len]),
            DataType::Double => MaskedArray::Double(vec![None; len]),
            DataType::Char | DataType::String => MaskedArray::Text(vec![None; len]),
        }
    }

    /// `len` copies of a single value.
    pub fn broadcast(value: &Value, len: usize) -> Self {
        match value {
            Value::Byte(v) => MaskedArray::Byte(vec![Some(*v); len]),
            Value::Short(v) => MaskedArray::Short(vec![Some(*v); len]),
            Value::Int(v) => MaskedArray::Int(vec![Some(*v); len]),
            Value::Int64(v) => MaskedArray::Int64(vec![Some(*v); len]),
            Value::Float(v) => MaskedArray::Float(vec![Some(*v); len]),
            Value::Double(v) => MaskedArray::Double(vec![Some(*v); len]),
            Value::Text(v) => MaskedArray::Text(vec![Some(v.clone()); len]),
            Value::Time(v) => MaskedArray::Time(vec![Some(*v); len]),
        }
    }

    /// Storage type a variable holding these cells would use.
    ///
    /// Times are stored as doubles relative to an epoch.
    pub fn storage_type(&self) -> DataType {
        match self {
            MaskedArray::Byte(_) => DataType::Byte,
            MaskedArray::Short(_) => DataType::Short,
            MaskedArray::Int(_) => DataType::Int,
            MaskedArray::Int64(_) => DataType::Int64,
            MaskedArray::Float(_) => DataType::Float,
            MaskedArray::Double(_) | MaskedArray::Time(_) => DataType::Double,
            MaskedArray::Text(_) => DataType::String,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            MaskedArray::Time(_) => "time",
            MaskedArray::Text(_) => "text",
            other => other.storage_type().name(),
        }
    }

    pub fn len(&self) -> usize {
        with_cells!(self, cells => cells.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the cell is masked or out of range.
    pub fn is_masked(&self, index: usize) -> bool {
        with_cells!(self, cells => cells.get(index).map_or(true, |c| c.is_none()))
    }

    /// Per-cell mask, `true` where masked.
    pub fn mask(&self) -> Vec<bool> {
        with_cells!(self, cells => cells.iter().map(Option::is_none).collect())
    }

    pub fn count_valid(&self) -> usize {
        with_cells!(self, cells => cells.iter().filter(|c| c.is_some()).count())
    }

    /// True when every cell is masked (also true for an empty array).
    pub fn is_fully_masked(&self) -> bool {
        self.count_valid() == 0
    }

    /// Read one cell; `None` when masked or out of range.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            MaskedArray::Byte(v) => v.get(index).copied().flatten().map(Value::Byte),
            MaskedArray::Short(v) => v.get(index).copied().flatten().map(Value::Short),
            MaskedArray::Int(v) => v.get(index).copied().flatten().map(Value::Int),
            MaskedArray::Int64(v) => v.get(index).copied().flatten().map(Value::Int64),
            MaskedArray::Float(v) => v.get(index).copied().flatten().map(Value::Float),
            MaskedArray::Double(v) => v.get(index).copied().flatten().map(Value::Double),
            MaskedArray::Text(v) => v.get(index).cloned().flatten().map(Value::Text),
            MaskedArray::Time(v) => v.get(index).copied().flatten().map(Value::Time),
        }
    }

    /// Repeat every cell `n` times: `[a, b]` becomes `[a, a, b, b]` for `n = 2`.
    pub fn repeat_each(&self, n: usize) -> Self {
        map_cells!(self, cells => cells
            .iter()
            .flat_map(|c| std::iter::repeat(c.clone()).take(n))
            .collect())
    }

    /// Repeat the whole array `n` times: `[a, b]` becomes `[a, b, a, b]`.
    pub fn tile(&self, n: usize) -> Self {
        map_cells!(self, cells => {
            let mut out = Vec::with_capacity(cells.len() * n);
            for _ in 0..n {
                out.extend(cells.iter().cloned());
            }
            out
        })
    }

    /// Swap the axes of a row-major `rows x cols` array.
    ///
    /// Returns `None` when the length does not match `rows * cols`.
    pub fn transpose(&self, rows: usize, cols: usize) -> Option<Self> {
        if self.len() != rows * cols {
            return None;
        }
        Some(map_cells!(self, cells => {
            let mut out = Vec::with_capacity(cells.len());
            for c in 0..cols {
                for r in 0..rows {
                    out.push(cells[r * cols + c].clone());
                }
            }
            out
        }))
    }

    /// Keep the cells where `keep` is true.
    pub fn filter(&self, keep: &[bool]) -> Self {
        map_cells!(self, cells => cells
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(c, _)| c.clone())
            .collect())
    }

    /// Gather cells by index; out-of-range indices become masked.
    pub fn take(&self, indices: &[usize]) -> Self {
        map_cells!(self, cells => indices
            .iter()
            .map(|i| cells.get(*i).cloned().flatten())
            .collect())
    }

    /// Numeric cells widened to f64. `None` for text and time arrays.
    pub fn to_f64(&self) -> Option<Vec<Option<f64>>> {
        let out = match self {
            MaskedArray::Byte(v) => v.iter().map(|c| c.map(|x| x as f64)).collect(),
            MaskedArray::Short(v) => v.iter().map(|c| c.map(|x| x as f64)).collect(),
            MaskedArray::Int(v) => v.iter().map(|c| c.map(|x| x as f64)).collect(),
            MaskedArray::Int64(v) => v.iter().map(|c| c.map(|x| x as f64)).collect(),
            MaskedArray::Float(v) => v.iter().map(|c| c.map(|x| x as f64)).collect(),
            MaskedArray::Double(v) => v.clone(),
            MaskedArray::Text(_) | MaskedArray::Time(_) => return None,
        };
        Some(out)
    }
}

/// Normalize a variable's contents into a flat masked array.
///
/// Character variables collapse their trailing dimension into strings.
pub fn normalize(var: &Variable) -> MaskedArray {
    let cf = extract_cf_attributes(var.attributes());
    let bounds = Bounds::new(&cf, var.dtype());

    match var.data() {
        ArrayData::Byte(v) => MaskedArray::Byte(mask_numeric(v, &bounds, |x| x as f64)),
        ArrayData::Short(v) => MaskedArray::Short(mask_numeric(v, &bounds, |x| x as f64)),
        ArrayData::Int(v) => MaskedArray::Int(mask_numeric(v, &bounds, |x| x as f64)),
        ArrayData::Int64(v) => MaskedArray::Int64(mask_numeric(v, &bounds, |x| x as f64)),
        ArrayData::Float(v) => MaskedArray::Float(mask_numeric(v, &bounds, |x| x as f64)),
        ArrayData::Double(v) => MaskedArray::Double(mask_numeric(v, &bounds, |x| x)),
        ArrayData::Char(bytes) => {
            let width = var.shape().last().copied().unwrap_or(1).max(1);
            let strings = bytes
                .chunks(width)
                .map(|chunk| {
                    let s = String::from_utf8_lossy(chunk);
                    s.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
                        .to_string()
                })
                .collect::<Vec<_>>();
            MaskedArray::Text(mask_text(strings, &cf))
        }
        ArrayData::String(v) => MaskedArray::Text(mask_text(v.clone(), &cf)),
    }
}

/// Normalize an identifier variable (profile or station ids).
///
/// Fails when any identifier is masked or when floating point identifiers
/// are not integral, so callers can fall back to a synthetic `0..N` range.
pub fn normalize_countable(var: &Variable) -> DatasetResult<MaskedArray> {
    let ids = normalize(var);
    if ids.count_valid() != ids.len() {
        return Err(DatasetError::not_countable(
            var.name(),
            format!("{} of {} identifiers are masked", ids.len() - ids.count_valid(), ids.len()),
        ));
    }
    if matches!(ids, MaskedArray::Float(_) | MaskedArray::Double(_)) {
        let values = ids.to_f64().unwrap_or_default();
        if values.iter().flatten().any(|v| v.fract() != 0.0) {
            return Err(DatasetError::not_countable(var.name(), "non-integral identifiers"));
        }
    }
    Ok(ids)
}

/// Numeric masking criteria for one variable.
struct Bounds {
    fill: Vec<f64>,
    valid_min: Option<f64>,
    valid_max: Option<f64>,
}

impl Bounds {
    fn new(cf: &CfAttributes, dtype: DataType) -> Self {
        let mut fill = Vec::new();
        match cf.fill_value.as_ref().and_then(AttrValue::as_f64) {
            Some(v) => fill.push(v),
            // Byte variables have no implicit fill, matching libnetcdf.
            None if dtype.is_numeric() && dtype != DataType::Byte => {
                if let Some(v) = dtype.default_fill().as_f64() {
                    fill.push(v);
                }
            }
            None => {}
        }
        if let Some(missing) = cf.missing_value.as_ref().and_then(AttrValue::as_f64_vec) {
            fill.extend(missing);
        }
        Self {
            fill,
            valid_min: cf.valid_min,
            valid_max: cf.valid_max,
        }
    }

    fn is_valid(&self, v: f64) -> bool {
        if v.is_nan() {
            return false;
        }
        if self.fill.iter().any(|f| *f == v || (v - f).abs() <= f.abs() * 1e-7) {
            return false;
        }
        if self.valid_min.map_or(false, |min| v < min) {
            return false;
        }
        if self.valid_max.map_or(false, |max| v > max) {
            return false;
        }
        true
    }
}

fn mask_numeric<T: Copy>(raw: &[T], bounds: &Bounds, widen: impl Fn(T) -> f64) -> Vec<Option<T>> {
    raw.iter()
        .map(|v| if bounds.is_valid(widen(*v)) { Some(*v) } else { None })
        .collect()
}

fn mask_text(raw: Vec<String>, cf: &CfAttributes) -> Vec<Option<String>> {
    let fill = cf.fill_value.as_ref().and_then(AttrValue::as_str);
    raw.into_iter()
        .map(|s| {
            if s.is_empty() || Some(s.as_str()) == fill {
                None
            } else {
                Some(s)
            }
        })
        .collect()
}
