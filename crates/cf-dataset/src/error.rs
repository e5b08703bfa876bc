//! Error types for dataset operations.

use thiserror::Error;

use crate::data::DataType;
use crate::time::TimeError;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised by the in-memory dataset model and its helpers.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A dimension referenced by a variable does not exist.
    #[error("dimension not found: {0}")]
    MissingDimension(String),

    /// A dimension with this name already exists.
    #[error("dimension already exists: {0}")]
    DimensionExists(String),

    /// A variable with this name already exists.
    #[error("variable already exists: {0}")]
    VariableExists(String),

    /// Variable not found.
    #[error("variable not found: {0}")]
    MissingVariable(String),

    /// Data length does not match the product of the dimension sizes.
    #[error("variable '{variable}' expects {expected} values, got {actual}")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    /// Index is outside of the variable shape.
    #[error("index {index:?} is out of bounds for variable '{variable}' with shape {shape:?}")]
    IndexOutOfBounds {
        variable: String,
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    /// A value cannot be stored in a variable of the given type.
    #[error("cannot store {value} in variable '{variable}' of type {dtype}")]
    TypeMismatch {
        variable: String,
        dtype: DataType,
        value: String,
    },

    /// The variable cannot be reduced to a countable identifier array.
    #[error("variable '{variable}' is not countable: {reason}")]
    NotCountable { variable: String, reason: String },

    /// A required logical axis could not be found.
    #[error("no variable found for the {0} axis")]
    MissingAxis(String),

    /// More than one variable qualifies for a logical axis.
    #[error("ambiguous {axis} axis, candidates: {candidates:?}")]
    AmbiguousAxis {
        axis: String,
        candidates: Vec<String>,
    },

    /// Time decoding or encoding failed.
    #[error("time error on variable '{variable}': {source}")]
    Time {
        variable: String,
        #[source]
        source: TimeError,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the netCDF library.
    #[error("netCDF error: {0}")]
    NetCdf(String),
}

impl DatasetError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(variable: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            variable: variable.into(),
            expected,
            actual,
        }
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(variable: impl Into<String>, dtype: DataType, value: impl ToString) -> Self {
        Self::TypeMismatch {
            variable: variable.into(),
            dtype,
            value: value.to_string(),
        }
    }

    /// Create a NotCountable error.
    pub fn not_countable(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotCountable {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    /// Attach a variable name to a time error.
    pub fn time(variable: impl Into<String>, source: TimeError) -> Self {
        Self::Time {
            variable: variable.into(),
            source,
        }
    }
}
