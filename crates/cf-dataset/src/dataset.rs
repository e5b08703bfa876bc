//! Dimensions, variables and datasets.
//!
//! A [`Dataset`] mirrors the structure of a netCDF file held in memory:
//! named dimensions, named variables bound to an ordered tuple of those
//! dimensions, and attributes on both. Variables keep their insertion order,
//! which is the order expansion walks them in.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttrValue, Attributes};
use crate::data::{ArrayData, DataType, Value};
use crate::error::{DatasetError, DatasetResult};

/// A named dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub size: usize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// A named, typed array bound to an ordered tuple of dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    dimensions: Vec<String>,
    #[serde(skip)]
    shape: Vec<usize>,
    #[serde(default)]
    attributes: Attributes,
    data: ArrayData,
}

impl Variable {
    /// Create a detached variable. Its shape is resolved when it is
    /// inserted into a dataset.
    pub fn new(name: impl Into<String>, dimensions: &[&str], data: ArrayData) -> Self {
        Self {
            name: name.into(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: Vec::new(),
            attributes: Attributes::new(),
            data,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension signature, in order.
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of stored cells (1 for scalars).
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of logical values: character variables count one value per
    /// string rather than per character.
    pub fn logical_size(&self) -> usize {
        if self.dtype() == DataType::Char {
            self.shape.iter().rev().skip(1).product()
        } else {
            self.size()
        }
    }

    /// Dimension signature of the logical values, i.e. without the string
    /// length dimension of character variables.
    pub fn signature(&self) -> &[String] {
        if self.dtype() == DataType::Char && !self.dimensions.is_empty() {
            &self.dimensions[..self.dimensions.len() - 1]
        } else {
            &self.dimensions
        }
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The declared `_FillValue`, if any.
    pub fn fill_value(&self) -> Option<Value> {
        self.attribute("_FillValue").and_then(AttrValue::to_value)
    }

    /// Write one cell addressed by a multi-dimensional index.
    pub fn put(&mut self, index: &[usize], value: &Value) -> DatasetResult<()> {
        let offset = self.offset(index)?;
        if self.data.set(offset, value) {
            Ok(())
        } else {
            Err(DatasetError::type_mismatch(&self.name, self.dtype(), value))
        }
    }

    /// Read one cell addressed by a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> DatasetResult<Value> {
        let offset = self.offset(index)?;
        self.data.get(offset).ok_or_else(|| self.out_of_bounds(index))
    }

    fn offset(&self, index: &[usize]) -> DatasetResult<usize> {
        if index.len() != self.shape.len() {
            return Err(self.out_of_bounds(index));
        }
        let mut offset = 0;
        for (i, size) in index.iter().zip(&self.shape) {
            if i >= size {
                return Err(self.out_of_bounds(index));
            }
            offset = offset * size + i;
        }
        Ok(offset)
    }

    fn out_of_bounds(&self, index: &[usize]) -> DatasetError {
        DatasetError::IndexOutOfBounds {
            variable: self.name.clone(),
            index: index.to_vec(),
            shape: self.shape.clone(),
        }
    }
}

/// An in-memory dataset: dimensions, variables and global attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    attributes: Attributes,
}

/// Unvalidated form used while deserializing.
#[derive(Deserialize)]
struct RawDataset {
    #[serde(default)]
    dimensions: Vec<Dimension>,
    #[serde(default)]
    variables: Vec<Variable>,
    #[serde(default)]
    attributes: Attributes,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = DatasetError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        let mut ds = Dataset::new();
        for dim in raw.dimensions {
            ds.add_dimension(dim.name, dim.size)?;
        }
        for var in raw.variables {
            ds.insert_variable(var)?;
        }
        ds.attributes = raw.attributes;
        Ok(ds)
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn add_dimension(&mut self, name: impl Into<String>, size: usize) -> DatasetResult<()> {
        let name = name.into();
        if self.dimension(&name).is_some() {
            return Err(DatasetError::DimensionExists(name));
        }
        self.dimensions.push(Dimension::new(name, size));
        Ok(())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// Create a variable whose cells all hold `fill`, or the type's default
    /// fill value. A provided fill value is also recorded as `_FillValue`.
    pub fn add_variable(
        &mut self,
        name: &str,
        dimensions: &[&str],
        dtype: DataType,
        fill: Option<Value>,
    ) -> DatasetResult<&mut Variable> {
        if self.variable(name).is_some() {
            return Err(DatasetError::VariableExists(name.to_string()));
        }
        let shape = self.resolve_shape(dimensions.iter().copied())?;
        let len = shape.iter().product();
        let data = ArrayData::filled(dtype, len, fill.as_ref()).ok_or_else(|| {
            DatasetError::type_mismatch(
                name,
                dtype,
                fill.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            )
        })?;

        let mut var = Variable::new(name, dimensions, data);
        var.shape = shape;
        if let Some(attr) = fill.as_ref().and_then(AttrValue::from_value) {
            var.attributes.insert("_FillValue".to_string(), attr);
        }
        self.variables.push(var);
        let last = self.variables.len() - 1;
        Ok(&mut self.variables[last])
    }

    /// Insert a fully populated variable, validating its dimensions and
    /// data length.
    pub fn insert_variable(&mut self, mut var: Variable) -> DatasetResult<()> {
        if self.variable(&var.name).is_some() {
            return Err(DatasetError::VariableExists(var.name));
        }
        let shape = self.resolve_shape(var.dimensions.iter().map(String::as_str))?;
        let expected: usize = shape.iter().product();
        if var.data.len() != expected {
            return Err(DatasetError::shape_mismatch(&var.name, expected, var.data.len()));
        }
        var.shape = shape;
        self.variables.push(var);
        Ok(())
    }

    fn resolve_shape<'a>(&self, dims: impl Iterator<Item = &'a str>) -> DatasetResult<Vec<usize>> {
        dims.map(|d| {
            self.dimension(d)
                .map(|dim| dim.size)
                .ok_or_else(|| DatasetError::MissingDimension(d.to_string()))
        })
        .collect()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The CF `featureType` global attribute.
    pub fn feature_type(&self) -> Option<&str> {
        self.attribute("featureType").and_then(AttrValue::as_str)
    }

    /// Variables carrying attribute `name` whose value satisfies `predicate`.
    pub fn filter_by_attr<F>(&self, name: &str, predicate: F) -> Vec<&Variable>
    where
        F: Fn(&AttrValue) -> bool,
    {
        self.variables
            .iter()
            .filter(|v| v.attribute(name).map_or(false, &predicate))
            .collect()
    }

    /// Variables whose attribute `name` is a string equal to `value`.
    pub fn filter_by_attr_value(&self, name: &str, value: &str) -> Vec<&Variable> {
        self.filter_by_attr(name, |a| a.as_str() == Some(value))
    }

    /// True when any variable carries attribute `name`.
    pub fn has_variable_attr(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.attribute(name).is_some())
    }

    /// CF data variables: they declare `coordinates`, `units` and
    /// `standard_name`, and are not flag variables.
    pub fn data_vars(&self) -> Vec<&Variable> {
        self.variables
            .iter()
            .filter(|v| {
                v.attribute("coordinates").is_some()
                    && v.attribute("units").is_some()
                    && v.attribute("standard_name").is_some()
                    && v.attribute("flag_values").is_none()
                    && v.attribute("flag_masks").is_none()
                    && v.attribute("flag_meanings").is_none()
            })
            .collect()
    }

    pub fn to_json(&self) -> DatasetResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> DatasetResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a dataset from a JSON file.
    pub fn read_json<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save a dataset as a JSON file.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> DatasetResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_dimension("station", 2).unwrap();
        ds.add_dimension("time", 3).unwrap();
        ds.insert_variable(
            Variable::new("temp", &["station", "time"], ArrayData::Double(vec![0.0; 6]))
                .with_attribute("units", "degC"),
        )
        .unwrap();
        ds.set_attribute("featureType", "timeSeries");
        ds
    }

    #[test]
    fn test_insert_validates_length() {
        let mut ds = sample();
        let err = ds
            .insert_variable(Variable::new("bad", &["time"], ArrayData::Int(vec![1, 2])))
            .unwrap_err();
        assert!(matches!(err, DatasetError::ShapeMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_insert_unknown_dimension() {
        let mut ds = sample();
        let err = ds
            .insert_variable(Variable::new("bad", &["depth"], ArrayData::Int(vec![1])))
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingDimension(d) if d == "depth"));
    }

    #[test]
    fn test_add_variable_prefills() {
        let mut ds = sample();
        let var = ds
            .add_variable("flag", &["station"], DataType::Int, Some(Value::Int(-9999)))
            .unwrap();
        assert_eq!(var.data(), &ArrayData::Int(vec![-9999, -9999]));
        assert_eq!(var.fill_value(), Some(Value::Int64(-9999)));
        assert!(ds.add_variable("flag", &[], DataType::Int, None).is_err());
    }

    #[test]
    fn test_put_and_get_by_index() {
        let mut ds = sample();
        let var = ds.variable_mut("temp").unwrap();
        var.put(&[1, 2], &Value::Double(7.5)).unwrap();
        assert_eq!(var.get(&[1, 2]).unwrap(), Value::Double(7.5));
        assert_eq!(var.data().get(5), Some(Value::Double(7.5)));
        assert!(var.put(&[2, 0], &Value::Double(1.0)).is_err());
        assert!(var.put(&[0], &Value::Double(1.0)).is_err());
        assert!(matches!(
            var.put(&[0, 0], &Value::from("x")),
            Err(DatasetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_variable() {
        let mut ds = sample();
        let var = ds.add_variable("crs", &[], DataType::Int, None).unwrap();
        assert_eq!(var.size(), 1);
        assert_eq!(var.rank(), 0);
        var.put(&[], &Value::Int(4326)).unwrap();
    }

    #[test]
    fn test_char_signature() {
        let mut ds = sample();
        ds.add_dimension("strlen", 4).unwrap();
        ds.insert_variable(Variable::new(
            "name",
            &["station", "strlen"],
            ArrayData::chars(&["a", "b"], 4),
        ))
        .unwrap();
        let var = ds.variable("name").unwrap();
        assert_eq!(var.size(), 8);
        assert_eq!(var.logical_size(), 2);
        assert_eq!(var.signature(), &["station".to_string()]);
    }

    #[test]
    fn test_json_roundtrip_restores_shapes() {
        let ds = sample();
        let json = ds.to_json().unwrap();
        let back = Dataset::from_json(&json).unwrap();
        assert_eq!(back, ds);
        assert_eq!(back.variable("temp").unwrap().shape(), &[2, 3]);
    }

    #[test]
    fn test_json_rejects_inconsistent_shapes() {
        let json = r#"{
            "dimensions": [{"name": "obs", "size": 2}],
            "variables": [{"name": "v", "dimensions": ["obs"], "data": {"type": "int", "values": [1]}}]
        }"#;
        assert!(Dataset::from_json(json).is_err());
    }

    #[test]
    fn test_filter_by_attr() {
        let ds = sample();
        assert_eq!(ds.filter_by_attr_value("units", "degC").len(), 1);
        assert!(ds.filter_by_attr("units", |a| a.as_str() == Some("K")).is_empty());
        assert!(ds.has_variable_attr("units"));
        assert!(!ds.has_variable_attr("sample_dimension"));
        assert_eq!(ds.feature_type(), Some("timeSeries"));
    }
}
