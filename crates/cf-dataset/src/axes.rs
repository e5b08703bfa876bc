//! Logical axis resolution.
//!
//! CF coordinate variables are recognised by their `axis` attribute, their
//! `standard_name`, their units (longitude/latitude) or their `positive`
//! attribute (vertical). The feature instance axis is the variable carrying
//! the requested `cf_role`.

use std::fmt;

use crate::dataset::{Dataset, Variable};
use crate::error::{DatasetError, DatasetResult};

const T_NAMES: &[&str] = &["time", "forecast_reference_time"];

const X_NAMES: &[&str] = &["longitude", "grid_longitude", "projection_x_coordinate"];
const X_UNITS: &[&str] = &[
    "degrees_east",
    "degree_east",
    "degree_E",
    "degrees_E",
    "degreeE",
    "degreesE",
];

const Y_NAMES: &[&str] = &["latitude", "grid_latitude", "projection_y_coordinate"];
const Y_UNITS: &[&str] = &[
    "degrees_north",
    "degree_north",
    "degree_N",
    "degrees_N",
    "degreeN",
    "degreesN",
];

const Z_NAMES: &[&str] = &[
    "atmosphere_ln_pressure_coordinate",
    "atmosphere_sigma_coordinate",
    "atmosphere_hybrid_sigma_pressure_coordinate",
    "atmosphere_hybrid_height_coordinate",
    "atmosphere_sleve_coordinate",
    "ocean_sigma_coordinate",
    "ocean_s_coordinate",
    "ocean_s_coordinate_g1",
    "ocean_s_coordinate_g2",
    "ocean_sigma_z_coordinate",
    "ocean_double_sigma_coordinate",
    "altitude",
    "height",
    "height_above_geopotential_datum",
    "height_above_reference_ellipsoid",
    "height_above_mean_sea_level",
    "depth",
    "depth_below_geoid",
    "air_pressure",
];

/// A logical axis of a discrete sampling geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    T,
    X,
    Y,
    Z,
    /// Feature instance identifier (profile id, station id).
    Instance,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::T => "t",
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Instance => "instance",
        };
        write!(f, "{}", name)
    }
}

fn text_attr<'a>(var: &'a Variable, name: &str) -> Option<&'a str> {
    var.attribute(name).and_then(|a| a.as_str())
}

fn has_axis(var: &Variable, axis: &str) -> bool {
    text_attr(var, "axis").map_or(false, |a| a.eq_ignore_ascii_case(axis))
}

fn standard_name_in(var: &Variable, names: &[&str]) -> bool {
    text_attr(var, "standard_name").map_or(false, |s| names.contains(&s))
}

fn units_in(var: &Variable, units: &[&str]) -> bool {
    text_attr(var, "units").map_or(false, |u| units.contains(&u))
}

fn candidates<'a>(ds: &'a Dataset, pred: impl Fn(&Variable) -> bool) -> Vec<&'a Variable> {
    ds.variables().iter().filter(|v| pred(*v)).collect()
}

/// Time coordinate candidates.
pub fn t_axes(ds: &Dataset) -> Vec<&Variable> {
    candidates(ds, |v| has_axis(v, "t") || standard_name_in(v, T_NAMES))
}

/// Longitude-like coordinate candidates.
pub fn x_axes(ds: &Dataset) -> Vec<&Variable> {
    candidates(ds, |v| {
        has_axis(v, "x") || standard_name_in(v, X_NAMES) || units_in(v, X_UNITS)
    })
}

/// Latitude-like coordinate candidates.
pub fn y_axes(ds: &Dataset) -> Vec<&Variable> {
    candidates(ds, |v| {
        has_axis(v, "y") || standard_name_in(v, Y_NAMES) || units_in(v, Y_UNITS)
    })
}

/// Vertical coordinate candidates.
pub fn z_axes(ds: &Dataset) -> Vec<&Variable> {
    candidates(ds, |v| {
        has_axis(v, "z")
            || standard_name_in(v, Z_NAMES)
            || text_attr(v, "positive")
                .map_or(false, |p| p.eq_ignore_ascii_case("up") || p.eq_ignore_ascii_case("down"))
    })
}

/// Variables carrying `cf_role = <role>`.
pub fn instance_axes<'a>(ds: &'a Dataset, cf_role: &str) -> Vec<&'a Variable> {
    ds.filter_by_attr_value("cf_role", cf_role)
}

/// The variables bound to each logical axis of a dataset.
#[derive(Debug, Clone, Copy)]
pub struct AxisVariables<'a> {
    pub t: Option<&'a Variable>,
    pub x: Option<&'a Variable>,
    pub y: Option<&'a Variable>,
    pub z: Option<&'a Variable>,
    pub instance: Option<&'a Variable>,
}

impl<'a> AxisVariables<'a> {
    pub fn get(&self, axis: Axis) -> Option<&'a Variable> {
        match axis {
            Axis::T => self.t,
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::Instance => self.instance,
        }
    }

    /// The variable bound to `axis`, or [`DatasetError::MissingAxis`].
    pub fn required(&self, axis: Axis) -> DatasetResult<&'a Variable> {
        self.get(axis)
            .ok_or_else(|| DatasetError::MissingAxis(axis.to_string()))
    }

    /// Names of every bound variable.
    pub fn names(&self) -> Vec<&'a str> {
        [self.t, self.x, self.y, self.z, self.instance]
            .into_iter()
            .flatten()
            .map(Variable::name)
            .collect()
    }

    /// True when `name` is bound to any axis.
    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }
}

fn at_most_one<'a>(axis: Axis, found: Vec<&'a Variable>) -> DatasetResult<Option<&'a Variable>> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.into_iter().next()),
        _ => Err(DatasetError::AmbiguousAxis {
            axis: axis.to_string(),
            candidates: found.iter().map(|v| v.name().to_string()).collect(),
        }),
    }
}

/// Resolve every logical axis of `ds`, using `cf_role` to find the instance
/// variable.
///
/// Absent axes resolve to `None`; more than one candidate for any axis is an
/// error.
pub fn resolve<'a>(ds: &'a Dataset, cf_role: &str) -> DatasetResult<AxisVariables<'a>> {
    Ok(AxisVariables {
        t: at_most_one(Axis::T, t_axes(ds))?,
        x: at_most_one(Axis::X, x_axes(ds))?,
        y: at_most_one(Axis::Y, y_axes(ds))?,
        z: at_most_one(Axis::Z, z_axes(ds))?,
        instance: at_most_one(Axis::Instance, instance_axes(ds, cf_role))?,
    })
}
