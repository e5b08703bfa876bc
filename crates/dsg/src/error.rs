//! Error types for discrete sampling geometry operations.

use cf_dataset::DatasetError;
use thiserror::Error;

/// Result type for DSG operations.
pub type Result<T> = std::result::Result<T, DsgError>;

/// Errors that can occur while classifying or converting datasets.
#[derive(Error, Debug)]
pub enum DsgError {
    /// Error from the underlying dataset model.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// No registered geometry claims the dataset.
    #[error("no geometry matches the dataset")]
    NoMatch,

    /// More than one geometry claims the dataset.
    #[error("dataset matches several geometries: {0:?}")]
    AmbiguousMatch(Vec<String>),

    /// Geometry name not known to the registry.
    #[error("unknown geometry: {0}")]
    UnknownGeometry(String),

    /// The geometry does not implement this conversion direction.
    #[error("{geometry} does not support {operation}")]
    UnsupportedDirection {
        geometry: String,
        operation: &'static str,
    },

    /// The dimensions of the axis variables do not describe this geometry.
    #[error("invalid layout: {0}")]
    Layout(String),

    /// An axis variable cannot be broadcast onto the expanded rows.
    #[error("cannot broadcast {variable} ({len} values) onto {rows} rows")]
    Broadcast {
        variable: String,
        len: usize,
        rows: usize,
    },

    /// A column length does not match the frame length.
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A required column is absent from the frame.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A column holds values of the wrong kind for its role.
    #[error("column '{column}' has type {actual}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The time axis uses a calendar that cannot be decoded.
    #[error(
        "cannot expand {geometry}: time variable '{variable}' uses unsupported calendar \
         '{calendar}' (supported: standard, gregorian, proleptic_gregorian)"
    )]
    UnsupportedCalendar {
        geometry: &'static str,
        variable: String,
        calendar: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DsgError {
    /// Create an UnsupportedDirection error.
    pub fn unsupported(geometry: impl Into<String>, operation: &'static str) -> Self {
        Self::UnsupportedDirection {
            geometry: geometry.into(),
            operation,
        }
    }

    /// Create a Broadcast error.
    pub fn broadcast(variable: impl Into<String>, len: usize, rows: usize) -> Self {
        Self::Broadcast {
            variable: variable.into(),
            len,
            rows,
        }
    }

    /// Create a ColumnType error.
    pub fn column_type(
        column: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::ColumnType {
            column: column.into(),
            expected,
            actual,
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
