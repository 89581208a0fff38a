use thiserror::Error;

use crate::domain::{Observation, UtcDateTime};

/// Feature pipeline errors. Anything here surfacing from the manual
/// fallback chain is a transformation bug, not a data condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("column '{name}' is missing from the frame")]
    MissingColumn { name: String },

    #[error("column '{name}' has {got} values, frame has {rows} rows")]
    LengthMismatch {
        name: String,
        got: usize,
        rows: usize,
    },

    #[error("frame has no rows")]
    EmptyFrame,

    #[error("no transform registered for id '{id}'")]
    UnknownTransform { id: String },
}

/// Named numeric columns in insertion order, row-aligned with the
/// observations' day-open timestamps.
///
/// Column order is part of the estimator contract, which is why this
/// is a vector of named columns and not a hash map.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    time_open: Vec<UtcDateTime>,
    columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<f64>,
}

impl FeatureFrame {
    /// Raw-field frame over a window of observations, oldest first.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut frame = Self {
            time_open: observations.iter().map(|o| o.time_open).collect(),
            columns: Vec::new(),
        };

        let fields: [(&str, fn(&Observation) -> f64); 6] = [
            ("open", |o| o.open),
            ("high", |o| o.high),
            ("low", |o| o.low),
            ("close", |o| o.close),
            ("volume", |o| o.volume),
            ("market_cap", |o| o.market_cap),
        ];
        for (name, accessor) in fields {
            frame.columns.push(Column {
                name: name.to_owned(),
                values: observations.iter().map(accessor).collect(),
            });
        }

        frame
    }

    pub fn rows(&self) -> usize {
        self.time_open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_open.is_empty()
    }

    pub fn time_open(&self) -> &[UtcDateTime] {
        &self.time_open
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Column values, or a `MissingColumn` error for use inside
    /// transform steps.
    pub fn require_column(&self, name: &str) -> Result<&[f64], PipelineError> {
        self.column(name).ok_or_else(|| PipelineError::MissingColumn {
            name: name.to_owned(),
        })
    }

    /// Replace a column in place, or append it after the existing ones.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), PipelineError> {
        if values.len() != self.rows() {
            return Err(PipelineError::LengthMismatch {
                name: name.to_owned(),
                got: values.len(),
                rows: self.rows(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column {
                name: name.to_owned(),
                values,
            }),
        }
        Ok(())
    }

    /// Project down to the listed columns, in the listed order,
    /// silently skipping names the frame does not carry.
    pub fn select(&mut self, names: &[&str]) {
        let mut selected = Vec::with_capacity(names.len());
        for &name in names {
            if let Some(position) = self.columns.iter().position(|c| c.name == name) {
                selected.push(self.columns.remove(position));
            }
        }
        self.columns = selected;
    }

    /// One row's values across all columns, in column order.
    pub fn row(&self, index: usize) -> Result<Vec<f64>, PipelineError> {
        if index >= self.rows() {
            return Err(PipelineError::EmptyFrame);
        }
        Ok(self.columns.iter().map(|c| c.values[index]).collect())
    }
}
