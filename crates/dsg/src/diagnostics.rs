//! Recoverable problems found during expansion and compaction.
//!
//! Conversions degrade instead of failing on secondary variables. Each
//! degradation is logged through `tracing` and recorded in a
//! [`Diagnostics`] sink returned alongside the result.

use std::fmt;

use serde::Serialize;
use tracing::warn;

/// One recoverable problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A variable whose dimensions fit no broadcasting rule was left out.
    SkippedVariable {
        variable: String,
        dimensions: Vec<String>,
        size: usize,
    },
    /// A single-valued variable was left out because its value is masked.
    MaskedScalar { variable: String },
    /// A variable was left out because an axis column already has its name.
    ColumnCollision { variable: String },
    /// Instance identifiers could not be used; `0..n` was substituted.
    FallbackInstanceIds {
        variable: String,
        count: usize,
        reason: String,
    },
    /// Writing values of a column into a variable failed.
    WriteFailed {
        variable: String,
        instance: usize,
        cells: usize,
        error: String,
    },
    /// Rows were dropped because a key column (instance id, time) is masked.
    MaskedKey { column: String, rows: usize },
    /// Several rows map onto the same instance and time; the first one wins.
    DuplicateCell { instance: String, rows: usize },
}

impl Diagnostic {
    /// Short machine-friendly name of the diagnostic kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::SkippedVariable { .. } => "skipped_variable",
            Diagnostic::MaskedScalar { .. } => "masked_scalar",
            Diagnostic::ColumnCollision { .. } => "column_collision",
            Diagnostic::FallbackInstanceIds { .. } => "fallback_instance_ids",
            Diagnostic::WriteFailed { .. } => "write_failed",
            Diagnostic::MaskedKey { .. } => "masked_key",
            Diagnostic::DuplicateCell { .. } => "duplicate_cell",
        }
    }

    /// The variable or column the diagnostic is about.
    pub fn subject(&self) -> &str {
        match self {
            Diagnostic::SkippedVariable { variable, .. }
            | Diagnostic::MaskedScalar { variable }
            | Diagnostic::ColumnCollision { variable }
            | Diagnostic::FallbackInstanceIds { variable, .. }
            | Diagnostic::WriteFailed { variable, .. } => variable,
            Diagnostic::MaskedKey { column, .. } => column,
            Diagnostic::DuplicateCell { instance, .. } => instance,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SkippedVariable {
                variable,
                dimensions,
                size,
            } => write!(
                f,
                "skipping variable {} with dimensions {:?} ({} values): no matching dimension layout",
                variable, dimensions, size
            ),
            Diagnostic::MaskedScalar { variable } => {
                write!(f, "skipping variable {} that is completely masked", variable)
            }
            Diagnostic::ColumnCollision { variable } => write!(
                f,
                "skipping variable {}: the table already has a column with that name",
                variable
            ),
            Diagnostic::FallbackInstanceIds {
                variable,
                count,
                reason,
            } => write!(
                f,
                "using 0..{} as identifiers instead of {}: {}",
                count, variable, reason
            ),
            Diagnostic::WriteFailed {
                variable,
                instance,
                cells,
                error,
            } => write!(
                f,
                "failed to write {} cells of {} for instance {}: {}",
                cells, variable, instance, error
            ),
            Diagnostic::MaskedKey { column, rows } => {
                write!(f, "dropped {} rows with a masked {} value", rows, column)
            }
            Diagnostic::DuplicateCell { instance, rows } => write!(
                f,
                "ignored {} rows repeating a time already seen for instance {}",
                rows, instance
            ),
        }
    }
}

/// Ordered collection of diagnostics produced by one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit it as a warning.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(
            kind = diagnostic.kind(),
            subject = %diagnostic.subject(),
            "{}",
            diagnostic
        );
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Entries of one kind, see [`Diagnostic::kind`].
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.entries.iter().filter(move |d| d.kind() == kind)
    }

    /// Names of variables left out of an expansion.
    pub fn skipped_variables(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| {
                matches!(
                    d,
                    Diagnostic::SkippedVariable { .. }
                        | Diagnostic::MaskedScalar { .. }
                        | Diagnostic::ColumnCollision { .. }
                )
            })
            .map(Diagnostic::subject)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_filter() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::SkippedVariable {
            variable: "grid".into(),
            dimensions: vec!["a".into(), "b".into()],
            size: 6,
        });
        diags.push(Diagnostic::MaskedScalar {
            variable: "crs".into(),
        });
        diags.push(Diagnostic::MaskedKey {
            column: "station".into(),
            rows: 2,
        });

        assert_eq!(diags.len(), 3);
        assert_eq!(diags.skipped_variables(), vec!["grid", "crs"]);
        assert_eq!(diags.of_kind("masked_key").count(), 1);
    }

    #[test]
    fn test_display_names_subject() {
        let d = Diagnostic::WriteFailed {
            variable: "latitude".into(),
            instance: 1,
            cells: 3,
            error: "index out of bounds".into(),
        };
        let text = d.to_string();
        assert!(text.contains("latitude"));
        assert!(text.contains("instance 1"));
        assert_eq!(d.subject(), "latitude");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let d = Diagnostic::MaskedScalar {
            variable: "crs".into(),
        };
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"kind":"masked_scalar","variable":"crs"}"#);
    }
}
