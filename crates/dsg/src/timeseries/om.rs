//! Orthogonal multidimensional timeseries (CF H.2.1).
//!
//! All stations share one time coordinate `time(time)`. Station
//! coordinates are dimensioned by the station dimension and data variables
//! by `(station, time)`.

use std::collections::HashMap;

use cf_dataset::{
    axes, normalize, ArrayData, Axis, DataType, Dataset, DatasetError,
    DatasetResult, MaskedArray, TimeUnits, Value, Variable,
};
use tracing::{debug, info, trace};

use super::{CF_ROLE, FEATURE_TYPE};
use crate::config::{AxisNames, CompactOptions, ExpandOptions};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{DsgError, Result};
use crate::expand::{axis_times, finish, instance_ids, Layout};
use crate::frame::DataFrame;
use crate::geometry::{Compacted, Expanded};
use crate::metadata::{cf_safe_name, timeseries_defaults, AttributeConfig};

const GEOMETRY: &str = "orthogonal_multidimensional_timeseries";
const STATION_DIM: &str = "station";
const TIME_DIM: &str = "time";
const COORDINATES: &str = "time latitude longitude z";

/// Defaults: keep empty columns and empty rows.
pub fn default_options() -> ExpandOptions {
    ExpandOptions::new(false, false)
}

/// True when `ds` is an orthogonal multidimensional timeseries dataset.
pub fn is_mine(ds: &Dataset) -> bool {
    match check(ds) {
        Ok(()) => true,
        Err(reason) => {
            trace!(reason = %reason, "Not an orthogonal multidimensional timeseries");
            false
        }
    }
}

/// Structural checks, first failure wins.
///
/// Each of t, x and y must have exactly one candidate. A dataset with a
/// second `latitude` (a nominal position next to the measured one, say) is
/// not claimed, matching the ambiguity error from `axes::resolve`.
fn check(ds: &Dataset) -> std::result::Result<(), String> {
    let svars = ds.filter_by_attr_value("cf_role", CF_ROLE);
    ensure!(svars.len() == 1, "{} variables with cf_role={}", svars.len(), CF_ROLE);

    let feature_type = ds.feature_type().map(str::to_lowercase);
    ensure!(
        feature_type.as_deref() == Some(FEATURE_TYPE),
        "featureType is {:?}",
        feature_type
    );

    let (ts, xs, ys, zs) = (
        axes::t_axes(ds),
        axes::x_axes(ds),
        axes::y_axes(ds),
        axes::z_axes(ds),
    );
    ensure!(
        ts.len() == 1 && xs.len() == 1 && ys.len() == 1 && zs.len() <= 1,
        "axis counts t={} x={} y={} z={}",
        ts.len(),
        xs.len(),
        ys.len(),
        zs.len()
    );

    ensure!(
        !ds.has_variable_attr("sample_dimension"),
        "contiguous ragged array (sample_dimension present)"
    );
    ensure!(
        !ds.has_variable_attr("instance_dimension"),
        "indexed ragged array (instance_dimension present)"
    );

    ensure!(ts[0].rank() == 1, "time variable has rank {}", ts[0].rank());

    let svar = svars[0];
    ensure!(svar.rank() <= 2, "station variable has rank {}", svar.rank());

    Ok(())
}

/// Expand a timeseries dataset into one row per (station, time).
pub fn to_dataframe(ds: &Dataset, options: &ExpandOptions) -> Result<Expanded> {
    let names = &options.axes;
    let mut diagnostics = Diagnostics::new();

    let axes = axes::resolve(ds, CF_ROLE)?;
    let t = axes.required(Axis::T)?;
    let x = axes.required(Axis::X)?;
    let y = axes.required(Axis::Y)?;
    let svar = axes.required(Axis::Instance)?;

    if t.rank() != 1 {
        return Err(DsgError::Layout(format!(
            "time variable {} has rank {}",
            t.name(),
            t.rank()
        )));
    }
    let time_dim = &t.dimensions()[0];
    let times = t.size();

    let ids = instance_ids(svar, &mut diagnostics);
    let layout = Layout::new(svar.signature(), time_dim.clone(), ids.len(), times);
    debug!(
        stations = layout.instances(),
        times = layout.elements(),
        rows = layout.rows(),
        "Expanding orthogonal multidimensional timeseries"
    );

    let mut frame = DataFrame::new();
    frame.insert(&names.t, layout.per_element(t.name(), axis_times(GEOMETRY, t)?)?)?;
    frame.insert(&names.x, layout.per_instance(x.name(), normalize(x))?)?;
    frame.insert(&names.y, layout.per_instance(y.name(), normalize(y))?)?;
    let z = match axes.z {
        Some(z) if z.signature() == std::slice::from_ref(time_dim) => {
            layout.per_element(z.name(), normalize(z))?
        }
        Some(z) => layout.per_instance(z.name(), normalize(z))?,
        None => MaskedArray::masked(DataType::Double, layout.rows()),
    };
    frame.insert(&names.z, z)?;
    frame.insert(&names.station, ids.repeat_each(times))?;

    let droppable = layout.sweep(ds.variables(), &axes.names(), &mut frame, &mut diagnostics)?;

    Ok(Expanded {
        frame: finish(frame, &droppable, options),
        diagnostics,
    })
}

/// Rows of one station, in first-seen order.
struct Group {
    key: Value,
    /// `(row, time index)` pairs, one per distinct time.
    cells: Vec<(usize, usize)>,
}

/// Build an orthogonal multidimensional timeseries dataset from a frame.
///
/// The time dimension is the sorted union of every time in the frame;
/// cells a station does not observe keep the fill value.
pub fn from_dataframe(frame: &DataFrame, options: &CompactOptions) -> Result<Compacted> {
    let names = &options.axes;
    let mut diagnostics = Diagnostics::new();

    let stations = frame.require(&names.station)?;
    let times = encode_times(&names.t, frame.require(&names.t)?, &options.time_units)?;
    let xs = frame.require(&names.x)?;
    let ys = frame.require(&names.y)?;
    let zs = frame.column(&names.z);

    let (groups, axis) = group_rows(names, stations, &times, &mut diagnostics);
    info!(
        stations = groups.len(),
        times = axis.len(),
        rows = frame.len(),
        "Compacting orthogonal multidimensional timeseries"
    );

    let mut ds = Dataset::new();
    ds.add_dimension(STATION_DIM, groups.len())?;
    ds.add_dimension(TIME_DIM, axis.len())?;

    ds.add_variable("crs", &[], DataType::Int, None)?;
    let station_type = match stations {
        MaskedArray::Time(_) => {
            return Err(DsgError::column_type(&names.station, "identifier", "time"))
        }
        other => other.storage_type(),
    };
    ds.add_variable("station", &[STATION_DIM], station_type, None)?;
    ds.insert_variable(Variable::new(
        "time",
        &[TIME_DIM],
        ArrayData::Double(axis.clone()),
    ))?;
    ds.add_variable("latitude", &[STATION_DIM], numeric_type(&names.y, ys)?, None)?;
    ds.add_variable("longitude", &[STATION_DIM], numeric_type(&names.x, xs)?, None)?;
    let z_type = match zs {
        Some(column) => numeric_type(&names.z, column)?,
        None => DataType::Double,
    };
    ds.add_variable("z", &[STATION_DIM], z_type, typed_fill(z_type, options.fill_value))?;

    for (i, group) in groups.iter().enumerate() {
        let Some(&(first, _)) = group.cells.first() else {
            continue;
        };
        let coordinates = [
            ("station", Some(group.key.clone())),
            ("latitude", ys.get(first)),
            ("longitude", xs.get(first)),
            ("z", zs.and_then(|c| c.get(first))),
        ];
        for (var, value) in coordinates {
            let Some(value) = value else { continue };
            if let Err(e) = put(&mut ds, var, &[i], &value) {
                diagnostics.push(Diagnostic::WriteFailed {
                    variable: var.to_string(),
                    instance: i,
                    cells: 1,
                    error: e.to_string(),
                });
            }
        }
    }

    let mut defaults = timeseries_defaults(&options.time_units.to_string());
    let mut coordinates = AttributeConfig::new();
    for column in frame.columns() {
        if is_reserved(names, &column.name) {
            continue;
        }
        let var_name = cf_safe_name(&column.name);
        if ds.variable(&var_name).is_none() {
            let dtype = column.values.storage_type();
            ds.add_variable(
                &var_name,
                &[STATION_DIM, TIME_DIM],
                dtype,
                typed_fill(dtype, options.fill_value),
            )?;
            coordinates.set(&var_name, "coordinates", COORDINATES);
            if matches!(column.values, MaskedArray::Time(_)) {
                defaults.set(&var_name, "units", options.time_units.to_string());
            }
        } else {
            debug!(column = %column.name, variable = %var_name, "Writing into existing variable");
        }

        for (i, group) in groups.iter().enumerate() {
            let mut failed = 0;
            let mut first_error = None;
            for &(row, j) in &group.cells {
                let Some(value) = column.values.get(row) else {
                    continue;
                };
                let value = match value {
                    Value::Time(t) => Value::Double(options.time_units.encode(&t)),
                    other => other,
                };
                if let Err(e) = put(&mut ds, &var_name, &[i, j], &value) {
                    failed += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
            if let Some(error) = first_error {
                diagnostics.push(Diagnostic::WriteFailed {
                    variable: var_name.clone(),
                    instance: i,
                    cells: failed,
                    error,
                });
            }
        }
    }

    defaults.merge(&options.attributes);
    defaults.merge(&coordinates);
    defaults.apply(&mut ds);

    Ok(Compacted {
        dataset: ds,
        diagnostics,
    })
}

fn is_reserved(names: &AxisNames, column: &str) -> bool {
    [&names.t, &names.x, &names.y, &names.z, &names.station]
        .iter()
        .any(|n| n.as_str() == column)
}

/// Encode the time column as numbers in `units`.
fn encode_times(column: &str, values: &MaskedArray, units: &TimeUnits) -> Result<Vec<Option<f64>>> {
    match values {
        MaskedArray::Time(cells) => Ok(cells
            .iter()
            .map(|c| c.as_ref().map(|t| units.encode(t)))
            .collect()),
        other => other
            .to_f64()
            .ok_or_else(|| DsgError::column_type(column, "time", other.type_name())),
    }
}

/// Storage type of a coordinate column, which must be numeric.
fn numeric_type(column: &str, values: &MaskedArray) -> Result<DataType> {
    match values {
        MaskedArray::Text(_) | MaskedArray::Time(_) => {
            Err(DsgError::column_type(column, "numeric", values.type_name()))
        }
        other => Ok(other.storage_type()),
    }
}

/// Partition rows by station and build the shared time axis.
///
/// Rows with a masked station or time are dropped. Within a station only
/// the first row of each time is kept.
fn group_rows(
    names: &AxisNames,
    stations: &MaskedArray,
    times: &[Option<f64>],
    diagnostics: &mut Diagnostics,
) -> (Vec<Group>, Vec<f64>) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut members: Vec<(Value, Vec<usize>)> = Vec::new();
    let (mut masked_stations, mut masked_times) = (0, 0);

    for (row, time) in times.iter().enumerate() {
        let Some(key) = stations.get(row) else {
            masked_stations += 1;
            continue;
        };
        if time.is_none() {
            masked_times += 1;
            continue;
        }
        let slot = *index.entry(key.to_string()).or_insert_with(|| {
            members.push((key.clone(), Vec::new()));
            members.len() - 1
        });
        members[slot].1.push(row);
    }

    if masked_stations > 0 {
        diagnostics.push(Diagnostic::MaskedKey {
            column: names.station.clone(),
            rows: masked_stations,
        });
    }
    if masked_times > 0 {
        diagnostics.push(Diagnostic::MaskedKey {
            column: names.t.clone(),
            rows: masked_times,
        });
    }

    let mut axis: Vec<f64> = members
        .iter()
        .flat_map(|(_, rows)| rows.iter().filter_map(|r| times[*r]))
        .collect();
    axis.sort_by(f64::total_cmp);
    axis.dedup();

    let groups = members
        .into_iter()
        .map(|(key, rows)| {
            let mut seen = vec![false; axis.len()];
            let mut cells = Vec::with_capacity(rows.len());
            let mut duplicates = 0;
            for row in rows {
                let Some(j) = times[row].and_then(|t| axis.binary_search_by(|a| a.total_cmp(&t)).ok())
                else {
                    continue;
                };
                if seen[j] {
                    duplicates += 1;
                } else {
                    seen[j] = true;
                    cells.push((row, j));
                }
            }
            if duplicates > 0 {
                diagnostics.push(Diagnostic::DuplicateCell {
                    instance: key.to_string(),
                    rows: duplicates,
                });
            }
            Group { key, cells }
        })
        .collect();

    (groups, axis)
}

fn put(ds: &mut Dataset, variable: &str, index: &[usize], value: &Value) -> DatasetResult<()> {
    ds.variable_mut(variable)
        .ok_or_else(|| DatasetError::MissingVariable(variable.to_string()))?
        .put(index, value)
}

/// Fill value for a compacted variable of type `dtype`.
///
/// Integer types use the truncated fill when it fits, otherwise the netCDF
/// default. Text variables get none.
fn typed_fill(dtype: DataType, fill: f64) -> Option<Value> {
    let whole = fill.trunc();
    let fits = |min: f64, max: f64| whole.is_finite() && whole >= min && whole <= max;
    let value = match dtype {
        DataType::Byte if fits(i8::MIN as f64, i8::MAX as f64) => Value::Byte(whole as i8),
        DataType::Short if fits(i16::MIN as f64, i16::MAX as f64) => Value::Short(whole as i16),
        DataType::Int if fits(i32::MIN as f64, i32::MAX as f64) => Value::Int(whole as i32),
        DataType::Int64 if fits(-9.2e18, 9.2e18) => Value::Int64(whole as i64),
        DataType::Byte | DataType::Short | DataType::Int | DataType::Int64 => dtype.default_fill(),
        DataType::Float => Value::Float(fill as f32),
        DataType::Double => Value::Double(fill),
        DataType::Char | DataType::String => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stations() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_dimension("station", 2).unwrap();
        ds.add_dimension("time", 3).unwrap();
        ds.insert_variable(
            Variable::new(
                "station",
                &["station"],
                ArrayData::String(vec!["a".into(), "b".into()]),
            )
            .with_attribute("cf_role", CF_ROLE),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("time", &["time"], ArrayData::Double(vec![0.0, 1.0, 2.0]))
                .with_attribute("standard_name", "time")
                .with_attribute("units", "hours since 2020-01-01 00:00:00"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("lon", &["station"], ArrayData::Double(vec![-70.0, -71.0]))
                .with_attribute("standard_name", "longitude"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("lat", &["station"], ArrayData::Double(vec![40.0, 41.0]))
                .with_attribute("standard_name", "latitude"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new(
                "temp",
                &["station", "time"],
                ArrayData::Float(vec![1.0, 2.0, 3.0, 4.0, -9999.0, 6.0]),
            )
            .with_attribute("_FillValue", -9999.0),
        )
        .unwrap();
        ds.set_attribute("featureType", "timeSeries");
        ds
    }

    #[test]
    fn test_is_mine() {
        let mut ds = stations();
        assert!(is_mine(&ds));

        ds.variable_mut("temp")
            .unwrap()
            .set_attribute("sample_dimension", "obs");
        assert!(!is_mine(&ds));
    }

    #[test]
    fn test_unsupported_calendar() {
        let mut ds = stations();
        ds.variable_mut("time")
            .unwrap()
            .set_attribute("calendar", "360_day");
        let err = to_dataframe(&ds, &default_options()).unwrap_err();
        assert!(matches!(
            err,
            DsgError::UnsupportedCalendar { geometry: GEOMETRY, ref calendar, .. } if calendar == "360_day"
        ));
    }

    #[test]
    fn test_second_latitude_is_rejected() {
        let mut ds = stations();
        ds.insert_variable(
            Variable::new("nominal_lat", &["station"], ArrayData::Double(vec![40.0, 41.0]))
                .with_attribute("standard_name", "latitude"),
        )
        .unwrap();
        assert_eq!(check(&ds), Err("axis counts t=1 x=1 y=2 z=0".to_string()));
        assert!(to_dataframe(&ds, &default_options()).is_err());
    }

    #[test]
    fn test_expand_without_z() {
        let out = to_dataframe(&stations(), &default_options()).unwrap();
        let frame = &out.frame;
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.column_names(), vec!["t", "x", "y", "z", "station", "temp"]);
        assert!(frame.column("z").unwrap().is_fully_masked());
        assert_eq!(frame.get("station", 3), Some(Value::from("b")));
        assert_eq!(frame.get("x", 4), Some(Value::Double(-71.0)));
        assert_eq!(
            frame.get("t", 2),
            Some(Value::Time(Utc.with_ymd_and_hms(2020, 1, 1, 2, 0, 0).unwrap()))
        );
        assert!(frame.column("temp").unwrap().is_masked(4));
    }

    #[test]
    fn test_transposed_data_variable() {
        let mut ds = stations();
        ds.insert_variable(
            Variable::new(
                "sal",
                &["time", "station"],
                ArrayData::Int(vec![10, 20, 11, 21, 12, 22]),
            )
            .with_attribute("units", "1"),
        )
        .unwrap();
        let out = to_dataframe(&ds, &default_options()).unwrap();
        let sal = out.frame.column("sal").unwrap();
        assert_eq!(
            sal,
            &MaskedArray::Int([10, 11, 12, 20, 21, 22].into_iter().map(Some).collect())
        );
    }

    #[test]
    fn test_typed_fill() {
        assert_eq!(typed_fill(DataType::Int, -9999.9), Some(Value::Int(-9999)));
        assert_eq!(typed_fill(DataType::Byte, -9999.9), Some(DataType::Byte.default_fill()));
        assert_eq!(typed_fill(DataType::Float, -9999.9), Some(Value::Float(-9999.9)));
        assert_eq!(typed_fill(DataType::String, -9999.9), None);
    }

    #[test]
    fn test_group_rows_time_union() {
        let names = AxisNames::default();
        let stations = MaskedArray::Text(vec![
            Some("b".into()),
            Some("a".into()),
            Some("b".into()),
            None,
            Some("b".into()),
        ]);
        let times = vec![Some(20.0), Some(10.0), Some(10.0), Some(5.0), Some(20.0)];
        let mut diags = Diagnostics::new();
        let (groups, axis) = group_rows(&names, &stations, &times, &mut diags);

        assert_eq!(axis, vec![10.0, 20.0]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, Value::from("b"));
        assert_eq!(groups[0].cells, vec![(0, 1), (2, 0)]);
        assert_eq!(groups[1].cells, vec![(1, 0)]);
        assert_eq!(diags.of_kind("masked_key").count(), 1);
        assert_eq!(diags.of_kind("duplicate_cell").count(), 1);
    }

    #[test]
    fn test_compact_requires_numeric_coordinates() {
        let frame = DataFrame::from_columns([
            ("station", MaskedArray::Int(vec![Some(1)])),
            ("t", MaskedArray::Double(vec![Some(0.0)])),
            ("x", MaskedArray::Text(vec![Some("east".into())])),
            ("y", MaskedArray::Double(vec![Some(1.0)])),
        ])
        .unwrap();
        let err = from_dataframe(&frame, &CompactOptions::default()).err().unwrap();
        assert!(matches!(err, DsgError::ColumnType { expected: "numeric", .. }));
    }
}
