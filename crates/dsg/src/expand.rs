//! Broadcasting of orthogonal multidimensional arrays onto table rows.
//!
//! An orthogonal geometry has `instances` features (profiles, stations),
//! each with the same `elements` samples (depths, times). The expanded
//! table has one row per (instance, element) pair, instance-major.
//! Variables are placed according to their dimension signature:
//!
//! | signature              | expansion                   |
//! |------------------------|-----------------------------|
//! | instance               | repeat each value `elements` times |
//! | element                | tile the array `instances` times   |
//! | instance x element     | flatten row-major           |
//! | element x instance     | transpose, then flatten     |
//! | anything else          | kept only if single-valued  |

use cf_dataset::{
    decode_times, normalize, normalize_countable, DatasetError, MaskedArray, TimeError,
    TimeUnits, Variable,
};
use tracing::debug;

use crate::config::ExpandOptions;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{DsgError, Result};
use crate::frame::DataFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Instance,
    Element,
    InstanceElement,
    ElementInstance,
    Other,
}

/// Dimension layout of one orthogonal multidimensional dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    instance_dims: Vec<String>,
    element_dim: String,
    instances: usize,
    elements: usize,
}

impl Layout {
    pub fn new(
        instance_dims: &[String],
        element_dim: impl Into<String>,
        instances: usize,
        elements: usize,
    ) -> Self {
        Self {
            instance_dims: instance_dims.to_vec(),
            element_dim: element_dim.into(),
            instances,
            elements,
        }
    }

    pub fn instances(&self) -> usize {
        self.instances
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn rows(&self) -> usize {
        self.instances * self.elements
    }

    fn placement(&self, signature: &[String]) -> Placement {
        let instance = self.instance_dims.as_slice();
        let element = std::slice::from_ref(&self.element_dim);
        if signature.is_empty() {
            Placement::Other
        } else if signature == element {
            Placement::Element
        } else if signature == instance {
            Placement::Instance
        } else if signature.len() == instance.len() + 1 {
            let (head, tail) = signature.split_at(instance.len());
            let (first, rest) = signature.split_at(1);
            if head == instance && tail == element {
                Placement::InstanceElement
            } else if first == element && rest == instance {
                Placement::ElementInstance
            } else {
                Placement::Other
            }
        } else {
            Placement::Other
        }
    }

    /// Broadcast an axis that holds one value per instance.
    pub fn per_instance(&self, variable: &str, values: MaskedArray) -> Result<MaskedArray> {
        let len = values.len();
        if len == self.instances {
            Ok(values.repeat_each(self.elements))
        } else if len == 1 {
            Ok(values.tile(self.rows()))
        } else if len == self.rows() {
            Ok(values)
        } else {
            Err(DsgError::broadcast(variable, len, self.rows()))
        }
    }

    /// Broadcast an axis that holds one value per element, or one value per
    /// (instance, element) pair.
    pub fn per_element(&self, variable: &str, values: MaskedArray) -> Result<MaskedArray> {
        let len = values.len();
        if len == self.elements {
            Ok(values.tile(self.instances))
        } else if len == self.rows() {
            Ok(values)
        } else if len == 1 {
            Ok(values.tile(self.rows()))
        } else {
            Err(DsgError::broadcast(variable, len, self.rows()))
        }
    }

    /// Expand every variable not in `skip` into `frame`. A variable named
    /// like a column already in `frame` is left out.
    ///
    /// Returns the droppable-row mask: a row is droppable when every
    /// variable that placed values on it has that cell masked. Rows no
    /// variable contributed to are kept.
    pub fn sweep<'a, I>(
        &self,
        variables: I,
        skip: &[&str],
        frame: &mut DataFrame,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<bool>>
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        let rows = self.rows();
        let mut droppable: Option<Vec<bool>> = None;

        for var in variables {
            if skip.contains(&var.name()) {
                continue;
            }
            if frame.contains(var.name()) {
                diagnostics.push(Diagnostic::ColumnCollision {
                    variable: var.name().to_string(),
                });
                continue;
            }

            let values = column_values(var);
            let placed = match self.placement(var.signature()) {
                Placement::Instance => Some(values.repeat_each(self.elements)),
                Placement::Element => Some(values.tile(self.instances)),
                Placement::InstanceElement => Some(values.clone()),
                Placement::ElementInstance => values.transpose(self.elements, self.instances),
                Placement::Other => None,
            };

            match placed {
                Some(column) if column.len() == rows => {
                    let mask = column.mask();
                    droppable = Some(match droppable {
                        Some(d) => d.iter().zip(&mask).map(|(a, b)| *a && *b).collect(),
                        None => mask,
                    });
                    frame.insert(var.name(), column)?;
                }
                _ if values.len() == 1 => match values.get(0) {
                    Some(value) => {
                        debug!(variable = %var.name(), "Broadcasting single value to all rows");
                        frame.insert(var.name(), MaskedArray::broadcast(&value, rows))?;
                    }
                    None => diagnostics.push(Diagnostic::MaskedScalar {
                        variable: var.name().to_string(),
                    }),
                },
                _ => diagnostics.push(Diagnostic::SkippedVariable {
                    variable: var.name().to_string(),
                    dimensions: var.dimensions().to_vec(),
                    size: var.logical_size(),
                }),
            }
        }

        Ok(droppable.unwrap_or_else(|| vec![false; rows]))
    }
}

/// Masked values of a variable, decoded to datetimes when its units are CF
/// time units.
pub fn column_values(var: &Variable) -> MaskedArray {
    let is_time = var
        .attribute("units")
        .and_then(|u| u.as_str())
        .map_or(false, |u| u.parse::<TimeUnits>().is_ok());
    if is_time {
        match decode_times(var) {
            Ok(times) => return times,
            Err(e) => debug!(variable = %var.name(), error = %e, "Keeping raw time values"),
        }
    }
    normalize(var)
}

/// Decoded time axis of a `geometry` dataset.
pub fn axis_times(geometry: &'static str, var: &Variable) -> Result<MaskedArray> {
    decode_times(var).map_err(|e| match e {
        DatasetError::Time {
            variable,
            source: TimeError::UnsupportedCalendar(calendar),
        } => DsgError::UnsupportedCalendar {
            geometry,
            variable,
            calendar,
        },
        other => other.into(),
    })
}

/// Instance identifiers, or `0..n` when they are not usable.
pub fn instance_ids(var: &Variable, diagnostics: &mut Diagnostics) -> MaskedArray {
    match normalize_countable(var) {
        Ok(ids) => ids,
        Err(e) => {
            let count = var.logical_size();
            diagnostics.push(Diagnostic::FallbackInstanceIds {
                variable: var.name().to_string(),
                count,
                reason: e.to_string(),
            });
            MaskedArray::Int64((0..count as i64).map(Some).collect())
        }
    }
}

/// Apply the column and row cleaning requested in `options`.
pub fn finish(mut frame: DataFrame, droppable: &[bool], options: &ExpandOptions) -> DataFrame {
    if options.clean_cols {
        let dropped = frame.drop_empty_columns();
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Dropped empty columns");
        }
    }
    if options.clean_rows && !frame.columns().is_empty() {
        let keep: Vec<bool> = droppable.iter().map(|d| !d).collect();
        let before = frame.len();
        frame = frame.filter_rows(&keep);
        debug!(dropped = before - frame.len(), kept = frame.len(), "Dropped empty rows");
    }
    frame
}
