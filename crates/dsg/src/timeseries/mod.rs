//! Timeseries feature types: series of observations at fixed stations.

pub mod om;

/// `cf_role` of the station identifier variable.
pub const CF_ROLE: &str = "timeseries_id";

/// Lowercased `featureType` of timeseries datasets.
pub const FEATURE_TYPE: &str = "timeseries";
