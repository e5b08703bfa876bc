//! Discrete Sampling Geometry classification and conversion
//!
//! This crate recognizes CF discrete sampling geometry encodings in a
//! [`cf_dataset::Dataset`] and converts between the compact array encoding
//! and a flat table:
//!
//! - **Classification**: every [`Geometry`] has a structural `is_mine` check;
//!   [`Geometry::detect`] requires exactly one to match
//! - **Expansion**: `to_dataframe` broadcasts coordinates and data variables
//!   onto one row per (instance, element)
//! - **Compaction**: `from_dataframe` groups rows by instance and writes the
//!   orthogonal array layout back out
//!
//! # Architecture
//!
//! ```text
//! Dataset
//!    │
//!    ▼
//! Geometry::detect ──► profile::om / timeseries::om
//!    │
//!    ├─► to_dataframe(ds)     ──► Expanded { frame, diagnostics }
//!    │
//!    └─► from_dataframe(frame) ──► Compacted { dataset, diagnostics }
//! ```
//!
//! Secondary variables that cannot be placed are skipped, not fatal. Every
//! such case is logged and recorded in the returned [`Diagnostics`].
//!
//! # Example
//!
//! ```ignore
//! use cf_dataset::Dataset;
//! use dsg::Geometry;
//!
//! let ds = Dataset::read_json("profiles.json")?;
//! let geometry = Geometry::detect(&ds)?;
//! let expanded = geometry.to_dataframe(&ds, &geometry.default_expand_options())?;
//! for diagnostic in &expanded.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

/// Return `Err(reason)` from a structural check when `cond` does not hold.
macro_rules! ensure {
    ($cond:expr, $($reason:tt)+) => {
        if !$cond {
            return Err(format!($($reason)+));
        }
    };
}

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expand;
pub mod frame;
pub mod geometry;
pub mod metadata;
pub mod profile;
pub mod timeseries;

// Re-export commonly used types at crate root
pub use config::{AxisNames, CompactOptions, DsgConfig, ExpandOptions};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{DsgError, Result};
pub use frame::{Column, DataFrame};
pub use geometry::{Compacted, Expanded, Geometry};
pub use metadata::{cf_safe_name, AttributeConfig};
