//! Native netCDF reading and writing through libnetcdf.
//!
//! Only available with the `netcdf` feature. Unsigned integer types are
//! widened to the next signed type on read; character variables are written
//! back as variable-length strings over their logical dimensions.

use std::path::Path;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use tracing::{debug, warn};

use crate::attributes::AttrValue;
use crate::data::{ArrayData, DataType};
use crate::dataset::{Dataset, Variable};
use crate::error::{DatasetError, DatasetResult};
use crate::masked::{normalize, MaskedArray};

fn nc_err(context: &str, e: netcdf::Error) -> DatasetError {
    DatasetError::NetCdf(format!("{}: {}", context, e))
}

/// Read a whole netCDF file into memory.
pub fn read_netcdf<P: AsRef<Path>>(path: P) -> DatasetResult<Dataset> {
    let path = path.as_ref();
    let file = netcdf::open(path).map_err(|e| nc_err("failed to open netCDF", e))?;

    let mut ds = Dataset::new();
    for dim in file.dimensions() {
        ds.add_dimension(dim.name(), dim.len())?;
    }

    for attr in file.attributes() {
        match attr.value() {
            Ok(value) => {
                if let Some(value) = convert_attribute(value) {
                    ds.set_attribute(attr.name(), value);
                }
            }
            Err(e) => warn!(attribute = %attr.name(), error = %e, "Skipping unreadable global attribute"),
        }
    }

    for var in file.variables() {
        let name = var.name();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();

        let data = match read_data(&var) {
            Ok(Some(data)) => data,
            Ok(None) => {
                warn!(variable = %name, "Skipping variable with unsupported type");
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut out = Variable::new(name.as_str(), &dim_refs, data);
        for attr in var.attributes() {
            if let Some(value) = attr.value().ok().and_then(convert_attribute) {
                out.set_attribute(attr.name(), value);
            }
        }
        ds.insert_variable(out)?;
    }

    debug!(
        path = %path.display(),
        dimensions = ds.dimensions().len(),
        variables = ds.variables().len(),
        "Read netCDF file"
    );
    Ok(ds)
}

fn read_data(var: &netcdf::Variable) -> DatasetResult<Option<ArrayData>> {
    let name = var.name();
    let ctx = |e: netcdf::Error| nc_err(&format!("failed to read '{}'", name), e);

    let data = match var.vartype() {
        NcVariableType::Int(IntType::I8) => ArrayData::Byte(var.get_values(..).map_err(ctx)?),
        NcVariableType::Int(IntType::I16) => ArrayData::Short(var.get_values(..).map_err(ctx)?),
        NcVariableType::Int(IntType::I32) => ArrayData::Int(var.get_values(..).map_err(ctx)?),
        NcVariableType::Int(IntType::I64) => ArrayData::Int64(var.get_values(..).map_err(ctx)?),
        NcVariableType::Int(IntType::U8) => {
            let raw: Vec<u8> = var.get_values(..).map_err(ctx)?;
            ArrayData::Short(raw.into_iter().map(i16::from).collect())
        }
        NcVariableType::Int(IntType::U16) => {
            let raw: Vec<u16> = var.get_values(..).map_err(ctx)?;
            ArrayData::Int(raw.into_iter().map(i32::from).collect())
        }
        NcVariableType::Int(IntType::U32) => {
            let raw: Vec<u32> = var.get_values(..).map_err(ctx)?;
            ArrayData::Int64(raw.into_iter().map(i64::from).collect())
        }
        NcVariableType::Int(IntType::U64) => {
            let raw: Vec<u64> = var.get_values(..).map_err(ctx)?;
            ArrayData::Int64(raw.into_iter().map(|v| v as i64).collect())
        }
        NcVariableType::Float(FloatType::F32) => ArrayData::Float(var.get_values(..).map_err(ctx)?),
        NcVariableType::Float(FloatType::F64) => ArrayData::Double(var.get_values(..).map_err(ctx)?),
        NcVariableType::Char => ArrayData::Char(var.get_raw_values(..).map_err(ctx)?),
        NcVariableType::String => {
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            let total: usize = shape.iter().product();
            let mut strings = Vec::with_capacity(total);
            for flat in 0..total {
                let index = unravel(flat, &shape);
                strings.push(var.get_string(&index[..]).map_err(ctx)?);
            }
            ArrayData::String(strings)
        }
        _ => return Ok(None),
    };
    Ok(Some(data))
}

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let converted = match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(s) => AttrValue::Text(s.join(",")),
        AttributeValue::Schar(v) => AttrValue::Int(v.into()),
        AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
        AttributeValue::Short(v) => AttrValue::Int(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
        AttributeValue::Int(v) => AttrValue::Int(v.into()),
        AttributeValue::Uint(v) => AttrValue::Int(v.into()),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Ulonglong(v) => AttrValue::Int(v as i64),
        AttributeValue::Float(v) => AttrValue::Double(v.into()),
        AttributeValue::Double(v) => AttrValue::Double(v),
        AttributeValue::Schars(v) => AttrValue::IntArray(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uchars(v) => AttrValue::IntArray(v.into_iter().map(i64::from).collect()),
        AttributeValue::Shorts(v) => AttrValue::IntArray(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ushorts(v) => AttrValue::IntArray(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::IntArray(v.into_iter().map(i64::from).collect()),
        AttributeValue::Uints(v) => AttrValue::IntArray(v.into_iter().map(i64::from).collect()),
        AttributeValue::Longlongs(v) => AttrValue::IntArray(v),
        AttributeValue::Ulonglongs(v) => AttrValue::IntArray(v.into_iter().map(|x| x as i64).collect()),
        AttributeValue::Floats(v) => AttrValue::DoubleArray(v.into_iter().map(f64::from).collect()),
        AttributeValue::Doubles(v) => AttrValue::DoubleArray(v),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}

fn to_nc_attribute(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Int(v) => AttributeValue::Longlong(*v),
        AttrValue::Double(v) => AttributeValue::Double(*v),
        AttrValue::IntArray(v) => AttributeValue::Longlongs(v.clone()),
        AttrValue::DoubleArray(v) => AttributeValue::Doubles(v.clone()),
    }
}

fn typed_fill(dtype: DataType, value: &AttrValue) -> Option<AttributeValue> {
    let v = value.as_f64()?;
    let converted = match dtype {
        DataType::Byte => AttributeValue::Schar(v as i8),
        DataType::Short => AttributeValue::Short(v as i16),
        DataType::Int => AttributeValue::Int(v as i32),
        DataType::Int64 => AttributeValue::Longlong(v as i64),
        DataType::Float => AttributeValue::Float(v as f32),
        DataType::Double => AttributeValue::Double(v),
        DataType::Char | DataType::String => return None,
    };
    Some(converted)
}

/// Row-major multi-index of a flat offset.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (i, size) in shape.iter().enumerate().rev() {
        if *size > 0 {
            index[i] = flat % size;
            flat /= size;
        }
    }
    index
}

/// Write a dataset to a new netCDF-4 file, replacing any existing file.
pub fn write_netcdf<P: AsRef<Path>>(ds: &Dataset, path: P) -> DatasetResult<()> {
    let path = path.as_ref();
    let mut file = netcdf::create(path).map_err(|e| nc_err("failed to create netCDF", e))?;

    for dim in ds.dimensions() {
        file.add_dimension(&dim.name, dim.size)
            .map_err(|e| nc_err(&format!("failed to add dimension '{}'", dim.name), e))?;
    }

    for var in ds.variables() {
        write_variable(&mut file, var)?;
    }

    for (name, value) in ds.attributes() {
        file.add_attribute(name, to_nc_attribute(value))
            .map_err(|e| nc_err(&format!("failed to write global attribute '{}'", name), e))?;
    }

    debug!(path = %path.display(), variables = ds.variables().len(), "Wrote netCDF file");
    Ok(())
}

fn write_variable(file: &mut netcdf::FileMut, var: &Variable) -> DatasetResult<()> {
    let name = var.name();
    let dims: Vec<&str> = var.dimensions().iter().map(String::as_str).collect();

    match var.data() {
        ArrayData::Byte(v) => put(file, var, &dims, v),
        ArrayData::Short(v) => put(file, var, &dims, v),
        ArrayData::Int(v) => put(file, var, &dims, v),
        ArrayData::Int64(v) => put(file, var, &dims, v),
        ArrayData::Float(v) => put(file, var, &dims, v),
        ArrayData::Double(v) => put(file, var, &dims, v),
        ArrayData::String(v) => put_strings(file, var, &dims, var.shape(), v),
        ArrayData::Char(_) => {
            let strings: Vec<String> = match normalize(var) {
                MaskedArray::Text(cells) => cells.into_iter().map(Option::unwrap_or_default).collect(),
                _ => Vec::new(),
            };
            let sig: Vec<&str> = var.signature().iter().map(String::as_str).collect();
            let shape = &var.shape()[..sig.len()];
            debug!(variable = %name, "Writing character variable as strings");
            put_strings(file, var, &sig, shape, &strings)
        }
    }
}

/// Attributes go in before data so `_FillValue` is accepted by libnetcdf.
fn put_attributes(out: &mut netcdf::VariableMut<'_>, var: &Variable) -> DatasetResult<()> {
    for (key, value) in var.attributes() {
        let value = if key == "_FillValue" {
            // must match the variable type; string variables take none
            match typed_fill(var.dtype(), value) {
                Some(v) => v,
                None => continue,
            }
        } else {
            to_nc_attribute(value)
        };
        out.put_attribute(key, value)
            .map_err(|e| nc_err(&format!("failed to write attribute '{}' of '{}'", key, var.name()), e))?;
    }
    Ok(())
}

fn put<T>(file: &mut netcdf::FileMut, var: &Variable, dims: &[&str], values: &[T]) -> DatasetResult<()>
where
    T: netcdf::NcTypeDescriptor + Copy,
{
    let ctx = |e: netcdf::Error| nc_err(&format!("failed to write '{}'", var.name()), e);
    let mut out = file.add_variable::<T>(var.name(), dims).map_err(ctx)?;
    put_attributes(&mut out, var)?;
    out.put_values(values, ..).map_err(ctx)?;
    Ok(())
}

fn put_strings(
    file: &mut netcdf::FileMut,
    var: &Variable,
    dims: &[&str],
    shape: &[usize],
    values: &[String],
) -> DatasetResult<()> {
    let ctx = |e: netcdf::Error| nc_err(&format!("failed to write '{}'", var.name()), e);
    let mut out = file.add_string_variable(var.name(), dims).map_err(ctx)?;
    put_attributes(&mut out, var)?;
    for (flat, s) in values.iter().enumerate() {
        let index = unravel(flat, shape);
        out.put_string(s, &index[..]).map_err(ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unravel_row_major() {
        assert_eq!(unravel(5, &[2, 3]), vec![1, 2]);
        assert_eq!(unravel(0, &[]), Vec::<usize>::new());
    }

    #[test]
    fn test_netcdf_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.nc");

        let mut ds = Dataset::new();
        ds.add_dimension("station", 2).unwrap();
        ds.insert_variable(
            Variable::new("temp", &["station"], ArrayData::Double(vec![1.5, 2.5]))
                .with_attribute("units", "degC"),
        )
        .unwrap();
        ds.insert_variable(Variable::new(
            "name",
            &["station"],
            ArrayData::String(vec!["a".into(), "b".into()]),
        ))
        .unwrap();
        ds.set_attribute("featureType", "timeSeries");

        write_netcdf(&ds, &path).unwrap();
        let back = read_netcdf(&path).unwrap();
        assert_eq!(back.variable("temp").unwrap().data(), &ArrayData::Double(vec![1.5, 2.5]));
        assert_eq!(back.feature_type(), Some("timeSeries"));
    }
}
