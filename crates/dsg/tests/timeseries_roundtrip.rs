//! Integration test: expand orthogonal multidimensional timeseries, compact
//! the table back into a dataset and expand it again.

use cf_dataset::{AttrValue, MaskedArray, Value};
use dsg::{
    AttributeConfig, CompactOptions, DataFrame, Diagnostic, ExpandOptions, Geometry,
};
use test_utils::{om_timeseries_multi, om_timeseries_single, STATION_IDS};

const TIMESERIES: Geometry = Geometry::OrthogonalMultidimensionalTimeseries;

fn text(values: &[&str]) -> MaskedArray {
    MaskedArray::Text(values.iter().map(|s| Some(s.to_string())).collect())
}

fn doubles(values: &[f64]) -> MaskedArray {
    MaskedArray::Double(values.iter().copied().map(Some).collect())
}

#[test]
fn test_expand_single_station() {
    let out = TIMESERIES
        .to_dataframe(&om_timeseries_single(5), &TIMESERIES.default_expand_options())
        .unwrap();
    assert_eq!(out.frame.len(), 5);
    for row in 0..5 {
        assert_eq!(out.frame.get("station", row), Some(Value::from("buoy-a")));
        assert_eq!(out.frame.get("temperature", row), Some(Value::Double(row as f64)));
    }
}

#[test]
fn test_compact_then_expand_reproduces_frame() {
    let ds = om_timeseries_multi(5);
    let expanded = TIMESERIES
        .to_dataframe(&ds, &TIMESERIES.default_expand_options())
        .unwrap();
    assert_eq!(expanded.frame.len(), 15);
    assert_eq!(expanded.frame.get("station", 5), Some(Value::from(STATION_IDS[1])));

    let compacted = TIMESERIES
        .from_dataframe(&expanded.frame, &CompactOptions::default())
        .unwrap();
    assert!(compacted.diagnostics.is_empty());

    let out = &compacted.dataset;
    assert_eq!(out.dimension("station").unwrap().size, 3);
    assert_eq!(out.dimension("time").unwrap().size, 5);
    assert_eq!(Geometry::detect(out).unwrap(), TIMESERIES);

    let again = TIMESERIES
        .to_dataframe(out, &TIMESERIES.default_expand_options())
        .unwrap();
    assert_eq!(again.frame, expanded.frame);
    assert_eq!(again.diagnostics.skipped_variables(), vec!["crs"]);
}

#[test]
fn test_stations_with_different_times() {
    let frame = DataFrame::from_columns([
        ("station", text(&["a", "a", "b", "b"])),
        ("t", doubles(&[0.0, 3600.0, 3600.0, 7200.0])),
        ("x", doubles(&[-70.0, -70.0, -71.0, -71.0])),
        ("y", doubles(&[40.0, 40.0, 41.0, 41.0])),
        ("temp", doubles(&[1.0, 2.0, 3.0, 4.0])),
    ])
    .unwrap();

    let compacted = TIMESERIES
        .from_dataframe(&frame, &CompactOptions::default())
        .unwrap();
    let ds = &compacted.dataset;
    assert_eq!(ds.dimension("time").unwrap().size, 3);

    let full = TIMESERIES
        .to_dataframe(ds, &TIMESERIES.default_expand_options())
        .unwrap();
    assert_eq!(full.frame.len(), 6);
    let temp = full.frame.column("temp").unwrap();
    assert!(temp.is_masked(2));
    assert!(temp.is_masked(3));
    assert_eq!(full.frame.get("temp", 4), Some(Value::Double(3.0)));

    let cleaned = TIMESERIES
        .to_dataframe(ds, &ExpandOptions::new(false, true))
        .unwrap();
    assert_eq!(cleaned.frame.len(), 4);
    assert_eq!(
        cleaned.frame.column("temp").unwrap(),
        &doubles(&[1.0, 2.0, 3.0, 4.0])
    );
}

#[test]
fn test_write_failure_does_not_abort() {
    let frame = DataFrame::from_columns([
        ("station", MaskedArray::Int(vec![Some(1), Some(1), Some(2)])),
        ("t", doubles(&[0.0, 60.0, 0.0])),
        ("x", doubles(&[-70.0, -70.0, -71.0])),
        ("y", doubles(&[40.0, 40.0, 41.0])),
        ("latitude", doubles(&[5.0, 6.0, 7.0])),
        ("temp", doubles(&[10.0, 11.0, 12.0])),
    ])
    .unwrap();

    let compacted = TIMESERIES
        .from_dataframe(&frame, &CompactOptions::default())
        .unwrap();
    let failures: Vec<_> = compacted.diagnostics.of_kind("write_failed").collect();
    assert_eq!(failures.len(), 2);
    assert!(matches!(
        failures[0],
        Diagnostic::WriteFailed { variable, instance: 0, cells: 2, .. } if variable == "latitude"
    ));

    let ds = &compacted.dataset;
    let temp = ds.variable("temp").unwrap();
    assert_eq!(temp.get(&[0, 1]).unwrap(), Value::Double(11.0));
    assert_eq!(temp.get(&[1, 0]).unwrap(), Value::Double(12.0));
    assert_eq!(ds.variable("latitude").unwrap().get(&[1]).unwrap(), Value::Double(41.0));
    assert!(ds.variable("latitude").unwrap().attribute("coordinates").is_none());
}

#[test]
fn test_attributes_and_metadata() {
    let mut attributes = AttributeConfig::new();
    attributes.set_global("title", "Harbor buoys");
    attributes.set("sea temp", "units", "ignored");
    attributes.set("sea_temp", "units", "degC");

    let frame = DataFrame::from_columns([
        ("station", MaskedArray::Int(vec![Some(7)])),
        ("t", doubles(&[0.0])),
        ("x", doubles(&[-70.0])),
        ("y", doubles(&[40.0])),
        ("z", MaskedArray::Float(vec![Some(2.5)])),
        ("sea temp", MaskedArray::Int(vec![None])),
    ])
    .unwrap();
    let compacted = TIMESERIES
        .from_dataframe(&frame, &CompactOptions::default().with_attributes(attributes))
        .unwrap();
    let ds = &compacted.dataset;

    assert_eq!(ds.attribute("title"), Some(&AttrValue::from("Harbor buoys")));
    assert_eq!(ds.feature_type(), Some("timeSeries"));
    assert_eq!(
        ds.variable("station").unwrap().attribute("cf_role"),
        Some(&AttrValue::from("timeseries_id"))
    );

    let temp = ds.variable("sea_temp").unwrap();
    assert_eq!(temp.attribute("units"), Some(&AttrValue::from("degC")));
    assert_eq!(
        temp.attribute("coordinates"),
        Some(&AttrValue::from("time latitude longitude z"))
    );
    assert_eq!(temp.get(&[0, 0]).unwrap(), Value::Int(-9999));
    assert_eq!(ds.variable("z").unwrap().get(&[0]).unwrap(), Value::Float(2.5));
    assert_eq!(
        ds.variable("time").unwrap().attribute("units"),
        Some(&AttrValue::from("seconds since 1990-01-01 00:00:00Z"))
    );
}

#[test]
fn test_masked_keys_and_duplicates() {
    let frame = DataFrame::from_columns([
        ("station", MaskedArray::Text(vec![Some("a".into()), None, Some("a".into())])),
        ("t", doubles(&[0.0, 0.0, 0.0])),
        ("x", doubles(&[-70.0, -70.0, -70.0])),
        ("y", doubles(&[40.0, 40.0, 40.0])),
        ("temp", doubles(&[1.0, 2.0, 3.0])),
    ])
    .unwrap();

    let compacted = TIMESERIES
        .from_dataframe(&frame, &CompactOptions::default())
        .unwrap();
    let kinds: Vec<&str> = compacted.diagnostics.iter().map(Diagnostic::kind).collect();
    assert_eq!(kinds, vec!["masked_key", "duplicate_cell"]);
    assert_eq!(
        compacted.dataset.variable("temp").unwrap().get(&[0, 0]).unwrap(),
        Value::Double(1.0)
    );
}
