//! Orthogonal multidimensional profiles (CF H.3.1).
//!
//! Every profile shares one vertical coordinate `z(z)`. Per-profile
//! coordinates are dimensioned by the profile dimension and data variables
//! by `(profile, z)`. A file holding a single profile may drop the profile
//! dimension entirely.

use cf_dataset::{axes, normalize, Axis, Dataset, DatasetError};
use tracing::{debug, trace};

use super::{CF_ROLE, FEATURE_TYPE};
use crate::config::{CompactOptions, ExpandOptions};
use crate::diagnostics::Diagnostics;
use crate::error::{DsgError, Result};
use crate::expand::{axis_times, finish, instance_ids, Layout};
use crate::frame::DataFrame;
use crate::geometry::{Compacted, Expanded};

const GEOMETRY: &str = "orthogonal_multidimensional_profile";

/// Defaults: drop empty columns and empty rows.
pub fn default_options() -> ExpandOptions {
    ExpandOptions::new(true, true)
}

/// True when `ds` is an orthogonal multidimensional profile dataset.
pub fn is_mine(ds: &Dataset) -> bool {
    match check(ds) {
        Ok(()) => true,
        Err(reason) => {
            trace!(reason = %reason, "Not an orthogonal multidimensional profile");
            false
        }
    }
}

fn check(ds: &Dataset) -> std::result::Result<(), String> {
    let pvars = ds.filter_by_attr_value("cf_role", CF_ROLE);
    ensure!(pvars.len() == 1, "{} variables with cf_role={}", pvars.len(), CF_ROLE);

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
        ts.len() == 1 && xs.len() == 1 && ys.len() == 1 && zs.len() == 1,
        "axis counts t={} x={} y={} z={}",
        ts.len(),
        xs.len(),
        ys.len(),
        zs.len()
    );
    let (t, x, y, z) = (ts[0], xs[0], ys[0], zs[0]);

    let pvar = pvars[0];
    ensure!(pvar.rank() <= 2, "profile variable has rank {}", pvar.rank());
    let profiles = pvar.logical_size();
    let is_single = profiles == 1;

    ensure!(z.rank() == 1, "z variable has rank {}", z.rank());
    let z_dim = &z.dimensions()[0];
    let z_size = z.size();

    let data_vars = ds.data_vars();
    if is_single {
        ensure!(
            t.size() == 1 && x.size() == 1 && y.size() == 1,
            "single profile with t/x/y sizes {}/{}/{}",
            t.size(),
            x.size(),
            y.size()
        );
        for dv in &data_vars {
            ensure!(
                dv.rank() == 1 && &dv.dimensions()[0] == z_dim && dv.size() == z_size,
                "data variable {} is not dimensioned by {}",
                dv.name(),
                z_dim
            );
        }
    } else {
        ensure!(
            t.size() == profiles && x.size() == profiles && y.size() == profiles,
            "{} profiles with t/x/y sizes {}/{}/{}",
            profiles,
            t.size(),
            x.size(),
            y.size()
        );
        let p_dim = &pvar.dimensions()[0];
        let p_size = ds.dimension(p_dim).map_or(0, |d| d.size);
        for dv in &data_vars {
            ensure!(
                dv.rank() == 2
                    && dv.dimensions().contains(z_dim)
                    && dv.dimensions().contains(p_dim)
                    && dv.size() == z_size * p_size,
                "data variable {} is not dimensioned by ({}, {})",
                dv.name(),
                p_dim,
                z_dim
            );
        }
    }

    Ok(())
}

/// Expand a profile dataset into one row per (profile, depth).
pub fn to_dataframe(ds: &Dataset, options: &ExpandOptions) -> Result<Expanded> {
    let names = &options.axes;
    let mut diagnostics = Diagnostics::new();

    let axes = axes::resolve(ds, CF_ROLE)?;
    let t = axes.required(Axis::T)?;
    let x = axes.required(Axis::X)?;
    let y = axes.required(Axis::Y)?;
    let z = axes.required(Axis::Z)?;
    let pvar = axes.required(Axis::Instance)?;

    let instance_dims = pvar.signature();
    let z_dim = z
        .signature()
        .iter()
        .find(|d| !instance_dims.contains(*d))
        .ok_or_else(|| {
            DsgError::Layout(format!("z variable {} has no depth dimension", z.name()))
        })?;
    let depths = ds
        .dimension(z_dim)
        .map(|d| d.size)
        .ok_or_else(|| DatasetError::MissingDimension(z_dim.clone()))?;

    let ids = instance_ids(pvar, &mut diagnostics);
    let layout = Layout::new(instance_dims, z_dim.clone(), ids.len(), depths);
    debug!(
        profiles = layout.instances(),
        depths = layout.elements(),
        rows = layout.rows(),
        "Expanding orthogonal multidimensional profiles"
    );

    let mut frame = DataFrame::new();
    frame.insert(&names.t, layout.per_instance(t.name(), axis_times(GEOMETRY, t)?)?)?;
    frame.insert(&names.x, layout.per_instance(x.name(), normalize(x))?)?;
    frame.insert(&names.y, layout.per_instance(y.name(), normalize(y))?)?;
    frame.insert(&names.z, layout.per_element(z.name(), normalize(z))?)?;
    frame.insert(&names.profile, ids.repeat_each(depths))?;

    let droppable = layout.sweep(ds.variables(), &axes.names(), &mut frame, &mut diagnostics)?;

    Ok(Expanded {
        frame: finish(frame, &droppable, options),
        diagnostics,
    })
}

/// Building profile datasets from a table is not supported.
pub fn from_dataframe(_frame: &DataFrame, _options: &CompactOptions) -> Result<Compacted> {
    Err(DsgError::unsupported(GEOMETRY, "from_dataframe"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_dataset::{ArrayData, Value, Variable};

    fn single_profile() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_dimension("z", 4).unwrap();
        ds.insert_variable(
            Variable::new("profile", &[], ArrayData::Int(vec![5])).with_attribute("cf_role", CF_ROLE),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("time", &[], ArrayData::Double(vec![0.0]))
                .with_attribute("standard_name", "time")
                .with_attribute("units", "hours since 2020-01-01"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("lon", &[], ArrayData::Double(vec![-70.0]))
                .with_attribute("units", "degrees_east"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("lat", &[], ArrayData::Double(vec![40.0]))
                .with_attribute("units", "degrees_north"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("z", &["z"], ArrayData::Double(vec![0.0, 5.0, 10.0, 15.0]))
                .with_attribute("axis", "Z")
                .with_attribute("positive", "down"),
        )
        .unwrap();
        ds.insert_variable(
            Variable::new("temp", &["z"], ArrayData::Float(vec![10.0, 9.0, 8.0, -9999.0]))
                .with_attribute("_FillValue", -9999.0)
                .with_attribute("units", "degC")
                .with_attribute("standard_name", "sea_water_temperature")
                .with_attribute("coordinates", "time lat lon z"),
        )
        .unwrap();
        ds.set_attribute("featureType", "Profile");
        ds
    }

    #[test]
    fn test_single_profile_matches() {
        assert!(is_mine(&single_profile()));
    }

    #[test]
    fn test_single_profile_rejects_wrong_data_shape() {
        let mut ds = single_profile();
        ds.add_dimension("other", 4).unwrap();
        ds.insert_variable(
            Variable::new("sal", &["other"], ArrayData::Double(vec![1.0; 4]))
                .with_attribute("units", "1")
                .with_attribute("standard_name", "sea_water_salinity")
                .with_attribute("coordinates", "time lat lon z"),
        )
        .unwrap();
        assert!(!is_mine(&ds));
    }

    #[test]
    fn test_feature_type_required() {
        let mut ds = single_profile();
        ds.set_attribute("featureType", "timeSeries");
        assert!(!is_mine(&ds));
    }

    #[test]
    fn test_single_profile_expand() {
        let out = to_dataframe(&single_profile(), &default_options()).unwrap();
        // the masked bottom cell is the only data in its row
        assert_eq!(out.frame.len(), 3);
        assert_eq!(out.frame.column_names(), vec!["t", "x", "y", "z", "profile", "temp"]);
        assert_eq!(out.frame.get("profile", 2), Some(Value::Int(5)));
        assert_eq!(out.frame.get("z", 1), Some(Value::Double(5.0)));
        assert!(out.diagnostics.is_empty());

        let raw = to_dataframe(&single_profile(), &ExpandOptions::new(false, false)).unwrap();
        assert_eq!(raw.frame.len(), 4);
        assert!(raw.frame.column("temp").unwrap().is_masked(3));
    }

    #[test]
    fn test_compaction_is_unsupported() {
        assert!(matches!(
            from_dataframe(&DataFrame::new(), &CompactOptions::default()),
            Err(DsgError::UnsupportedDirection { operation: "from_dataframe", .. })
        ));
    }
}
