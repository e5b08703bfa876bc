//! In-memory CF/netCDF dataset model.
//!
//! This crate holds a netCDF-shaped dataset in memory and provides the
//! collaborators discrete sampling geometry code needs on top of it:
//!
//! - **Masking**: fill values, `missing_value` and valid ranges become masked cells
//! - **Time**: CF `<unit> since <epoch>` decoding to UTC datetimes
//! - **Axes**: t/x/y/z and feature instance variables resolved from CF attributes
//!
//! Datasets serialize to JSON. With the `netcdf` feature they can also be
//! read from and written to netCDF files.
//!
//! # Example
//!
//! ```ignore
//! use cf_dataset::{axes, normalize, Dataset};
//!
//! let ds = Dataset::read_json("profiles.json")?;
//! let axes = axes::resolve(&ds, "profile_id")?;
//! let depths = normalize(axes.required(axes::Axis::Z)?);
//! ```

pub mod attributes;
pub mod axes;
pub mod data;
pub mod dataset;
pub mod error;
pub mod masked;
pub mod time;

#[cfg(feature = "netcdf")]
pub mod native;

pub use attributes::{extract_cf_attributes, AttrValue, Attributes, CfAttributes};
pub use axes::{Axis, AxisVariables};
pub use data::{ArrayData, DataType, Value};
pub use dataset::{Dataset, Dimension, Variable};
pub use error::{DatasetError, DatasetResult};
pub use masked::{normalize, normalize_countable, MaskedArray};
pub use time::{decode_times, Calendar, TimeError, TimeUnit, TimeUnits};

#[cfg(feature = "netcdf")]
pub use native::{read_netcdf, write_netcdf};
