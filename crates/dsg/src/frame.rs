//! Tabular relation produced by expansion and consumed by compaction.

use cf_dataset::{MaskedArray, Value};

use crate::error::{DsgError, Result};

/// A named column of masked values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: MaskedArray,
}

impl Column {
    pub fn new(name: impl Into<String>, values: MaskedArray) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Ordered named columns of equal length.
///
/// Inserting a column whose name already exists replaces it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<Column>,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from `(name, values)` pairs.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, MaskedArray)>,
        S: Into<String>,
    {
        let mut frame = Self::new();
        for (name, values) in columns {
            frame.insert(name, values)?;
        }
        Ok(frame)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&MaskedArray> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
    }

    /// Like [`DataFrame::column`] but fails when the column is absent.
    pub fn require(&self, name: &str) -> Result<&MaskedArray> {
        self.column(name)
            .ok_or_else(|| DsgError::MissingColumn(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Value of one cell; `None` when masked or absent.
    pub fn get(&self, name: &str, row: usize) -> Option<Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// Add a column, or replace the column with the same name.
    pub fn insert(&mut self, name: impl Into<String>, values: MaskedArray) -> Result<()> {
        let name = name.into();
        let replacing = self.columns.iter().position(|c| c.name == name);
        let expected = match replacing {
            Some(_) if self.columns.len() == 1 => values.len(),
            _ if self.columns.is_empty() => values.len(),
            _ => self.len(),
        };
        if values.len() != expected {
            return Err(DsgError::ColumnLength {
                column: name,
                expected,
                actual: values.len(),
            });
        }
        match replacing {
            Some(i) => self.columns[i].values = values,
            None => self.columns.push(Column::new(name, values)),
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<MaskedArray> {
        let i = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(i).values)
    }

    /// Keep the rows where `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values.filter(keep)))
                .collect(),
        }
    }

    /// Remove every column whose cells are all masked.
    pub fn drop_empty_columns(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        self.columns.retain(|c| {
            if c.values.is_fully_masked() {
                dropped.push(c.name.clone());
                false
            } else {
                true
            }
        });
        dropped
    }
}
