//! Profile feature types: series of observations along a vertical line at
//! a fixed horizontal position and time.

pub mod om;

/// `cf_role` of the profile identifier variable.
pub const CF_ROLE: &str = "profile_id";

/// Lowercased `featureType` of profile datasets.
pub const FEATURE_TYPE: &str = "profile";
