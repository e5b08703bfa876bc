//! Synthetic datasets for every geometry under test.
//!
//! The builders produce small, fully in-memory datasets. Besides the two
//! orthogonal multidimensional geometries there are look-alikes that no
//! classifier may claim: ragged timeseries, an incomplete profile and a
//! trajectory.

use std::path::PathBuf;

use cf_dataset::{ArrayData, Dataset, Variable};
use tempfile::TempDir;

use crate::generators::{
    create_depth_levels, create_hourly_times, create_temperature_profiles, create_test_series,
    mask_instance,
};

/// Fill value used by fixture data variables.
pub const FILL: f64 = -9999.0;

/// Time units used by fixture time variables.
pub const TIME_UNITS: &str = "seconds since 1990-01-01 00:00:00";

/// Identifiers of the multi-profile fixtures.
pub const PROFILE_IDS: [i32; 3] = [101, 102, 103];

/// Identifiers of the multi-station fixture.
pub const STATION_IDS: [&str; 3] = ["buoy-a", "buoy-b", "buoy-c"];

fn add(ds: &mut Dataset, var: Variable) {
    ds.insert_variable(var).expect("valid fixture variable");
}

fn dim(ds: &mut Dataset, name: &str, size: usize) {
    ds.add_dimension(name, size).expect("valid fixture dimension");
}

fn time(dims: &[&str], values: Vec<f64>) -> Variable {
    Variable::new("time", dims, ArrayData::Double(values))
        .with_attribute("standard_name", "time")
        .with_attribute("units", TIME_UNITS)
        .with_attribute("axis", "T")
}

fn latitude(dims: &[&str], values: Vec<f64>) -> Variable {
    Variable::new("lat", dims, ArrayData::Double(values))
        .with_attribute("standard_name", "latitude")
        .with_attribute("units", "degrees_north")
}

fn longitude(dims: &[&str], values: Vec<f64>) -> Variable {
    Variable::new("lon", dims, ArrayData::Double(values))
        .with_attribute("standard_name", "longitude")
        .with_attribute("units", "degrees_east")
}

fn depth(dims: &[&str], values: Vec<f64>) -> Variable {
    Variable::new("z", dims, ArrayData::Double(values))
        .with_attribute("standard_name", "depth")
        .with_attribute("units", "m")
        .with_attribute("positive", "down")
        .with_attribute("axis", "Z")
}

fn data_variable(name: &str, dims: &[&str], values: Vec<f64>, coordinates: &str) -> Variable {
    Variable::new(name, dims, ArrayData::Double(values))
        .with_attribute("_FillValue", FILL)
        .with_attribute("units", "degC")
        .with_attribute("standard_name", "sea_water_temperature")
        .with_attribute("coordinates", coordinates)
}

/// One profile of `depths` levels, without a profile dimension.
pub fn om_profile_single(depths: usize) -> Dataset {
    let mut ds = Dataset::new();
    dim(&mut ds, "z", depths);

    let levels = create_depth_levels(depths, 1.0);
    add(
        &mut ds,
        Variable::new("profile", &[], ArrayData::Int(vec![PROFILE_IDS[0]]))
            .with_attribute("cf_role", "profile_id"),
    );
    add(&mut ds, time(&[], vec![0.0]));
    add(&mut ds, latitude(&[], vec![42.5]));
    add(&mut ds, longitude(&[], vec![-70.25]));
    add(&mut ds, depth(&["z"], levels.clone()));
    add(
        &mut ds,
        data_variable(
            "temperature",
            &["z"],
            create_temperature_profiles(1, &levels),
            "time lat lon z",
        ),
    );
    ds.set_attribute("featureType", "profile");
    ds
}

/// Three profiles sharing `depths` levels `0, 1, 2, ...`.
///
/// `temperature(profile, z)` holds `profile * 1000 + level`.
pub fn om_profile_multi(depths: usize) -> Dataset {
    build_om_profiles(depths, None)
}

/// Like [`om_profile_multi`] but every temperature of profile
/// `masked_profile` is the fill value.
pub fn om_profile_masked(depths: usize, masked_profile: usize) -> Dataset {
    build_om_profiles(depths, Some(masked_profile))
}

fn build_om_profiles(depths: usize, masked_profile: Option<usize>) -> Dataset {
    let profiles = PROFILE_IDS.len();
    let mut ds = Dataset::new();
    dim(&mut ds, "profile", profiles);
    dim(&mut ds, "z", depths);

    add(
        &mut ds,
        Variable::new("profile", &["profile"], ArrayData::Int(PROFILE_IDS.to_vec()))
            .with_attribute("cf_role", "profile_id"),
    );
    add(&mut ds, time(&["profile"], create_hourly_times(0.0, profiles)));
    add(&mut ds, latitude(&["profile"], vec![40.0, 41.0, 42.0]));
    add(&mut ds, longitude(&["profile"], vec![-70.0, -71.0, -72.0]));
    add(&mut ds, depth(&["z"], create_depth_levels(depths, 1.0)));

    let mut values = create_test_series(profiles, depths);
    if let Some(p) = masked_profile {
        mask_instance(&mut values, depths, p, FILL);
    }
    add(
        &mut ds,
        data_variable("temperature", &["profile", "z"], values, "time lat lon z"),
    );
    ds.set_attribute("featureType", "Profile");
    ds
}

/// One station with `times` hourly samples and a scalar station id.
pub fn om_timeseries_single(times: usize) -> Dataset {
    let mut ds = Dataset::new();
    dim(&mut ds, "time", times);

    add(
        &mut ds,
        Variable::new("station", &[], ArrayData::String(vec![STATION_IDS[0].to_string()]))
            .with_attribute("cf_role", "timeseries_id"),
    );
    add(&mut ds, time(&["time"], create_hourly_times(0.0, times)));
    add(&mut ds, latitude(&[], vec![42.5]));
    add(&mut ds, longitude(&[], vec![-70.25]));
    add(
        &mut ds,
        data_variable(
            "temperature",
            &["time"],
            create_test_series(1, times),
            "time lat lon",
        ),
    );
    ds.set_attribute("featureType", "timeSeries");
    ds
}

/// Three stations with `times` hourly samples, fixed-width character ids,
/// a per-station depth and `temperature(station, time)`.
pub fn om_timeseries_multi(times: usize) -> Dataset {
    let stations = STATION_IDS.len();
    let mut ds = Dataset::new();
    dim(&mut ds, "station", stations);
    dim(&mut ds, "time", times);
    dim(&mut ds, "name_strlen", 8);

    add(
        &mut ds,
        Variable::new(
            "station",
            &["station", "name_strlen"],
            ArrayData::chars(&STATION_IDS, 8),
        )
        .with_attribute("cf_role", "timeseries_id"),
    );
    add(&mut ds, time(&["time"], create_hourly_times(0.0, times)));
    add(&mut ds, latitude(&["station"], vec![40.0, 41.0, 42.0]));
    add(&mut ds, longitude(&["station"], vec![-70.0, -71.0, -72.0]));
    add(&mut ds, depth(&["station"], vec![0.5, 1.0, 1.5]));
    add(
        &mut ds,
        data_variable(
            "temperature",
            &["station", "time"],
            create_test_series(stations, times),
            "time lat lon z",
        ),
    );
    ds.set_attribute("featureType", "timeSeries");
    ds
}

/// Two stations stored as a contiguous ragged array (3 + 4 observations).
pub fn cr_timeseries() -> Dataset {
    let mut ds = Dataset::new();
    dim(&mut ds, "station", 2);
    dim(&mut ds, "obs", 7);

    add(
        &mut ds,
        Variable::new("station", &["station"], ArrayData::Int(vec![1, 2]))
            .with_attribute("cf_role", "timeseries_id"),
    );
    add(
        &mut ds,
        Variable::new("row_size", &["station"], ArrayData::Int(vec![3, 4]))
            .with_attribute("sample_dimension", "obs"),
    );
    add(&mut ds, time(&["obs"], create_hourly_times(0.0, 7)));
    add(&mut ds, latitude(&["station"], vec![40.0, 41.0]));
    add(&mut ds, longitude(&["station"], vec![-70.0, -71.0]));
    add(
        &mut ds,
        data_variable("temperature", &["obs"], create_test_series(1, 7), "time lat lon"),
    );
    ds.set_attribute("featureType", "timeSeries");
    ds
}

/// Two stations stored as an indexed ragged array.
pub fn ir_timeseries() -> Dataset {
    let mut ds = Dataset::new();
    dim(&mut ds, "station", 2);
    dim(&mut ds, "obs", 5);

    add(
        &mut ds,
        Variable::new("station", &["station"], ArrayData::Int(vec![1, 2]))
            .with_attribute("cf_role", "timeseries_id"),
    );
    add(
        &mut ds,
        Variable::new("station_index", &["obs"], ArrayData::Int(vec![0, 1, 0, 1, 1]))
            .with_attribute("instance_dimension", "station"),
    );
    add(&mut ds, time(&["obs"], create_hourly_times(0.0, 5)));
    add(&mut ds, latitude(&["station"], vec![40.0, 41.0]));
    add(&mut ds, longitude(&["station"], vec![-70.0, -71.0]));
    add(
        &mut ds,
        data_variable("temperature", &["obs"], create_test_series(1, 5), "time lat lon"),
    );
    ds.set_attribute("featureType", "timeSeries");
    ds
}

/// Three profiles whose depth levels differ per profile: `z(profile, z)`.
pub fn im_profile(depths: usize) -> Dataset {
    let profiles = PROFILE_IDS.len();
    let mut ds = Dataset::new();
    dim(&mut ds, "profile", profiles);
    dim(&mut ds, "z", depths);

    let levels: Vec<f64> = (0..profiles)
        .flat_map(|p| create_depth_levels(depths, 1.0 + p as f64))
        .collect();
    add(
        &mut ds,
        Variable::new("profile", &["profile"], ArrayData::Int(PROFILE_IDS.to_vec()))
            .with_attribute("cf_role", "profile_id"),
    );
    add(&mut ds, time(&["profile"], create_hourly_times(0.0, profiles)));
    add(&mut ds, latitude(&["profile"], vec![40.0, 41.0, 42.0]));
    add(&mut ds, longitude(&["profile"], vec![-70.0, -71.0, -72.0]));
    add(&mut ds, depth(&["profile", "z"], levels));
    add(
        &mut ds,
        data_variable(
            "temperature",
            &["profile", "z"],
            create_test_series(profiles, depths),
            "time lat lon z",
        ),
    );
    ds.set_attribute("featureType", "profile");
    ds
}

/// A single trajectory of `points` samples.
pub fn trajectory(points: usize) -> Dataset {
    let mut ds = Dataset::new();
    dim(&mut ds, "obs", points);

    add(
        &mut ds,
        Variable::new("trajectory", &[], ArrayData::Int(vec![1]))
            .with_attribute("cf_role", "trajectory_id"),
    );
    add(&mut ds, time(&["obs"], create_hourly_times(0.0, points)));
    add(&mut ds, latitude(&["obs"], create_depth_levels(points, 0.1)));
    add(&mut ds, longitude(&["obs"], create_depth_levels(points, -0.1)));
    add(
        &mut ds,
        data_variable(
            "temperature",
            &["obs"],
            create_test_series(1, points),
            "time lat lon",
        ),
    );
    ds.set_attribute("featureType", "trajectory");
    ds
}

/// Every fixture with the geometry name expected to claim it, or `None`
/// when no orthogonal multidimensional classifier should.
pub fn all_fixtures() -> Vec<(&'static str, Dataset, Option<&'static str>)> {
    let profile = Some("orthogonal_multidimensional_profile");
    let timeseries = Some("orthogonal_multidimensional_timeseries");
    vec![
        ("om_profile_single", om_profile_single(10), profile),
        ("om_profile_multi", om_profile_multi(10), profile),
        ("om_profile_masked", om_profile_masked(10, 1), profile),
        ("om_timeseries_single", om_timeseries_single(5), timeseries),
        ("om_timeseries_multi", om_timeseries_multi(5), timeseries),
        ("cr_timeseries", cr_timeseries(), None),
        ("ir_timeseries", ir_timeseries(), None),
        ("im_profile", im_profile(4), None),
        ("trajectory", trajectory(6), None),
    ]
}

/// Write `ds` as JSON into a fresh temporary directory.
///
/// Keep the returned directory alive for as long as the file is needed.
pub fn write_json_fixture(ds: &Dataset, name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join(format!("{}.json", name));
    ds.write_json(&path).expect("fixture written");
    (dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_consistent() {
        for (name, ds, _) in all_fixtures() {
            assert!(ds.feature_type().is_some(), "{} has no featureType", name);
            assert!(!ds.data_vars().is_empty(), "{} has no data variables", name);
        }
    }

    #[test]
    fn test_masked_profile() {
        let ds = om_profile_masked(10, 1);
        let temp = ds.variable("temperature").unwrap();
        assert_eq!(temp.shape(), &[3, 10]);
        assert_eq!(temp.get(&[1, 4]).unwrap().as_f64(), Some(FILL));
        assert_eq!(temp.get(&[2, 4]).unwrap().as_f64(), Some(2004.0));
    }

    #[test]
    fn test_char_station_ids() {
        let ds = om_timeseries_multi(5);
        let station = ds.variable("station").unwrap();
        assert_eq!(station.rank(), 2);
        assert_eq!(station.logical_size(), 3);
    }

    #[test]
    fn test_write_json_fixture() {
        let ds = om_profile_single(4);
        let (_dir, path) = write_json_fixture(&ds, "single");
        let loaded = Dataset::read_json(&path).unwrap();
        assert_eq!(loaded, ds);
    }
}
