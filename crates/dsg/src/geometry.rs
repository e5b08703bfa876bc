//! Registry of supported discrete sampling geometries.

use std::fmt;
use std::str::FromStr;

use cf_dataset::Dataset;
use tracing::debug;

use crate::config::{CompactOptions, ExpandOptions};
use crate::diagnostics::Diagnostics;
use crate::error::{DsgError, Result};
use crate::frame::DataFrame;
use crate::{profile, timeseries};

/// Result of expanding a dataset into a table.
#[derive(Debug, Clone)]
pub struct Expanded {
    pub frame: DataFrame,
    pub diagnostics: Diagnostics,
}

/// Result of compacting a table into a dataset.
#[derive(Debug, Clone)]
pub struct Compacted {
    pub dataset: Dataset,
    pub diagnostics: Diagnostics,
}

/// A discrete sampling geometry encoding.
///
/// Classifiers are evaluated in the order of [`Geometry::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geometry {
    OrthogonalMultidimensionalProfile,
    OrthogonalMultidimensionalTimeseries,
}

impl Geometry {
    pub const ALL: [Geometry; 2] = [
        Geometry::OrthogonalMultidimensionalProfile,
        Geometry::OrthogonalMultidimensionalTimeseries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => "orthogonal_multidimensional_profile",
            Geometry::OrthogonalMultidimensionalTimeseries => {
                "orthogonal_multidimensional_timeseries"
            }
        }
    }

    /// Expected `featureType`, lowercased.
    pub fn feature_type(&self) -> &'static str {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => profile::FEATURE_TYPE,
            Geometry::OrthogonalMultidimensionalTimeseries => timeseries::FEATURE_TYPE,
        }
    }

    /// `cf_role` of the instance identifier variable.
    pub fn cf_role(&self) -> &'static str {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => profile::CF_ROLE,
            Geometry::OrthogonalMultidimensionalTimeseries => timeseries::CF_ROLE,
        }
    }

    pub fn default_expand_options(&self) -> ExpandOptions {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => profile::om::default_options(),
            Geometry::OrthogonalMultidimensionalTimeseries => timeseries::om::default_options(),
        }
    }

    /// Structural check; never fails.
    pub fn is_mine(&self, ds: &Dataset) -> bool {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => profile::om::is_mine(ds),
            Geometry::OrthogonalMultidimensionalTimeseries => timeseries::om::is_mine(ds),
        }
    }

    pub fn to_dataframe(&self, ds: &Dataset, options: &ExpandOptions) -> Result<Expanded> {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => profile::om::to_dataframe(ds, options),
            Geometry::OrthogonalMultidimensionalTimeseries => {
                timeseries::om::to_dataframe(ds, options)
            }
        }
    }

    pub fn from_dataframe(&self, frame: &DataFrame, options: &CompactOptions) -> Result<Compacted> {
        match self {
            Geometry::OrthogonalMultidimensionalProfile => {
                profile::om::from_dataframe(frame, options)
            }
            Geometry::OrthogonalMultidimensionalTimeseries => {
                timeseries::om::from_dataframe(frame, options)
            }
        }
    }

    /// Every geometry whose classifier accepts `ds`, in registry order.
    pub fn matching(ds: &Dataset) -> Vec<Geometry> {
        Self::ALL.into_iter().filter(|g| g.is_mine(ds)).collect()
    }

    /// The single geometry that accepts `ds`.
    pub fn detect(ds: &Dataset) -> Result<Geometry> {
        let matches = Self::matching(ds);
        debug!(matches = ?matches, "Classified dataset");
        match matches.as_slice() {
            [] => Err(DsgError::NoMatch),
            [one] => Ok(*one),
            many => Err(DsgError::AmbiguousMatch(
                many.iter().map(|g| g.name().to_string()).collect(),
            )),
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Geometry {
    type Err = DsgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "orthogonal_multidimensional_profile" | "om_profile" | "omp" => {
                Ok(Geometry::OrthogonalMultidimensionalProfile)
            }
            "orthogonal_multidimensional_timeseries" | "om_timeseries" | "omt" => {
                Ok(Geometry::OrthogonalMultidimensionalTimeseries)
            }
            _ => Err(DsgError::UnknownGeometry(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for g in Geometry::ALL {
            assert_eq!(g.name().parse::<Geometry>().unwrap(), g);
            assert_eq!(g.to_string(), g.name());
        }
        assert_eq!(
            "OM-Timeseries".parse::<Geometry>().unwrap(),
            Geometry::OrthogonalMultidimensionalTimeseries
        );
        assert_eq!("omp".parse::<Geometry>().unwrap(), Geometry::OrthogonalMultidimensionalProfile);
        assert!(matches!(
            "ragged".parse::<Geometry>(),
            Err(DsgError::UnknownGeometry(_))
        ));
    }

    #[test]
    fn test_defaults_differ_per_geometry() {
        let p = Geometry::OrthogonalMultidimensionalProfile.default_expand_options();
        let t = Geometry::OrthogonalMultidimensionalTimeseries.default_expand_options();
        assert!(p.clean_cols && p.clean_rows);
        assert!(!t.clean_cols && !t.clean_rows);
    }

    #[test]
    fn test_detect_empty_dataset() {
        assert!(matches!(Geometry::detect(&Dataset::new()), Err(DsgError::NoMatch)));
    }

    #[test]
    fn test_roles() {
        assert_eq!(Geometry::OrthogonalMultidimensionalProfile.cf_role(), "profile_id");
        assert_eq!(Geometry::OrthogonalMultidimensionalTimeseries.feature_type(), "timeseries");
    }
}
