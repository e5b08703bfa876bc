//! Integration test: write a dataset to JSON on disk, read it back and
//! check that masking and time decoding see the same values.

use cf_dataset::{
    axes, decode_times, normalize, ArrayData, Axis, DataType, Dataset, MaskedArray, Value,
    Variable,
};
use chrono::{TimeZone, Utc};

fn build_station_dataset() -> Dataset {
    let mut ds = Dataset::new();
    ds.add_dimension("station", 2).unwrap();
    ds.add_dimension("time", 3).unwrap();
    ds.add_dimension("name_strlen", 4).unwrap();

    ds.insert_variable(
        Variable::new("station", &["station", "name_strlen"], ArrayData::chars(&["A1", "B22"], 4))
            .with_attribute("cf_role", "timeseries_id"),
    )
    .unwrap();
    ds.insert_variable(
        Variable::new("time", &["time"], ArrayData::Double(vec![0.0, 3600.0, 7200.0]))
            .with_attribute("standard_name", "time")
            .with_attribute("units", "seconds since 2024-01-01 00:00:00Z"),
    )
    .unwrap();
    ds.insert_variable(
        Variable::new("lon", &["station"], ArrayData::Double(vec![-70.5, -71.0]))
            .with_attribute("units", "degrees_east"),
    )
    .unwrap();
    ds.insert_variable(
        Variable::new("lat", &["station"], ArrayData::Double(vec![41.0, 42.5]))
            .with_attribute("units", "degrees_north"),
    )
    .unwrap();

    let temp = ds
        .add_variable("temperature", &["station", "time"], DataType::Float, Some(Value::Double(-9999.9)))
        .unwrap();
    temp.set_attribute("units", "degC");
    temp.put(&[0, 0], &Value::Double(10.5)).unwrap();
    temp.put(&[1, 2], &Value::Double(12.0)).unwrap();

    ds.set_attribute("featureType", "timeSeries");
    ds
}

#[test]
fn test_json_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations.json");

    let ds = build_station_dataset();
    ds.write_json(&path).unwrap();
    let back = Dataset::read_json(&path).unwrap();

    assert_eq!(back, ds);
    assert_eq!(back.variable("temperature").unwrap().shape(), &[2, 3]);
}

#[test]
fn test_masking_after_reload() {
    let ds = Dataset::from_json(&build_station_dataset().to_json().unwrap()).unwrap();

    let temp = normalize(ds.variable("temperature").unwrap());
    assert_eq!(temp.count_valid(), 2);
    assert_eq!(temp.get(0), Some(Value::Float(10.5)));
    assert!(temp.is_masked(1));
    assert_eq!(temp.get(5), Some(Value::Float(12.0)));

    let names = normalize(ds.variable("station").unwrap());
    assert_eq!(
        names,
        MaskedArray::Text(vec![Some("A1".to_string()), Some("B22".to_string())])
    );
}

#[test]
fn test_time_and_axes_after_reload() {
    let ds = Dataset::from_json(&build_station_dataset().to_json().unwrap()).unwrap();

    let axes = axes::resolve(&ds, "timeseries_id").unwrap();
    let t = axes.required(Axis::T).unwrap();
    assert_eq!(t.name(), "time");
    assert_eq!(axes.required(Axis::X).unwrap().name(), "lon");
    assert_eq!(axes.required(Axis::Y).unwrap().name(), "lat");
    assert!(axes.z.is_none());

    let times = decode_times(t).unwrap();
    assert_eq!(
        times.get(1),
        Some(Value::Time(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()))
    );
}

#[test]
fn test_non_finite_values_survive_reload() {
    let mut ds = Dataset::new();
    ds.add_dimension("time", 4).unwrap();
    ds.insert_variable(
        Variable::new(
            "temp",
            &["time"],
            ArrayData::Double(vec![1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY]),
        )
        .with_attribute("_FillValue", f64::NAN),
    )
    .unwrap();
    ds.insert_variable(Variable::new(
        "salinity",
        &["time"],
        ArrayData::Float(vec![f32::NAN, 35.0, 35.5, f32::NAN]),
    ))
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nan.json");
    ds.write_json(&path).unwrap();
    let back = Dataset::read_json(&path).unwrap();

    let ArrayData::Double(temp) = back.variable("temp").unwrap().data() else {
        panic!("temp should stay double");
    };
    assert_eq!(temp[0], 1.0);
    assert!(temp[1].is_nan());
    assert_eq!(temp[2], f64::INFINITY);
    assert_eq!(temp[3], f64::NEG_INFINITY);

    let temp = normalize(back.variable("temp").unwrap());
    assert_eq!(temp.get(0), Some(Value::Double(1.0)));
    assert!(temp.is_masked(1));

    let salinity = normalize(back.variable("salinity").unwrap());
    assert_eq!(salinity.count_valid(), 2);
    assert!(salinity.is_masked(0));
    assert!(salinity.is_masked(3));
}
