//! Core data types for the preparation pipeline.

use crate::error::{PrepError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Name of the open price column.
pub const OPEN: &str = "open";
/// Name of the high price column.
pub const HIGH: &str = "high";
/// Name of the low price column.
pub const LOW: &str = "low";
/// Name of the close price column.
pub const CLOSE: &str = "close";
/// Name of the volume column.
pub const VOLUME: &str = "volume";

/// A named column of numeric values. Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    /// Create a new column.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Number of missing (`NaN`) values.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// Datetime-indexed table of named numeric columns.
///
/// Every column has exactly one value per index entry. The index keeps the
/// order rows were produced in; it is not re-sorted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    index: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl TimeSeries {
    /// Create a series with the given index and no columns.
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Builder-style variant of [`TimeSeries::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    /// Append a column, replacing the values of an existing column with the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(PrepError::InvalidInput(format!(
                "column '{}' has {} values, index has {}",
                name,
                values.len(),
                self.index.len()
            )));
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
        Ok(())
    }

    /// Remove a column, returning it if present.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The datetime index.
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Values of a column by name, or a `MissingColumn` error.
    pub fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| PrepError::MissingColumn(name.to_string()))
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Total number of missing values across all columns.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Check if any column contains a missing value.
    pub fn has_missing(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.values.iter().any(|v| v.is_nan()))
    }

    /// First timestamp of the index.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.index.first().copied()
    }

    /// Last timestamp of the index.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.index.last().copied()
    }

    /// Copy a contiguous range of rows into a new series.
    ///
    /// The range is clamped to the series length.
    pub fn slice(&self, rows: Range<usize>) -> TimeSeries {
        let end = rows.end.min(self.len());
        let start = rows.start.min(end);
        TimeSeries {
            index: self.index[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[start..end].to_vec()))
                .collect(),
        }
    }

    /// Keep only rows whose timestamp satisfies the predicate.
    pub fn filter_by_time<F>(&self, mut keep: F) -> TimeSeries
    where
        F: FnMut(&DateTime<Utc>) -> bool,
    {
        let rows: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, ts)| keep(*ts))
            .map(|(i, _)| i)
            .collect();

        TimeSeries {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), rows.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    /// Move the last `positions` columns to the front.
    ///
    /// The order is left unchanged when `positions` is not smaller than the
    /// number of columns.
    pub fn rotate_columns_right(&mut self, positions: usize) {
        if positions >= self.columns.len() {
            return;
        }
        self.columns.rotate_right(positions);
    }
}

/// Positionally indexed table produced for model training.
///
/// Row `i` is simply the `i`-th value of every column; the datetime index of
/// the source series is discarded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    rows: usize,
    columns: Vec<Column>,
}

impl FeatureTable {
    /// Build a table from a series, dropping its datetime index.
    pub fn from_series(series: TimeSeries) -> Self {
        Self {
            rows: series.len(),
            columns: series.columns,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Remove a column, returning it if present.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos))
    }

    /// Values of row `i` in column order.
    pub fn row(&self, i: usize) -> Option<Vec<f64>> {
        if i >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[i]).collect())
    }

    /// Row-major matrix of all values (for ML frameworks).
    pub fn to_matrix(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|i| self.columns.iter().map(|c| c.values[i]).collect())
            .collect()
    }
}

/// Train/test artifacts handed to a training loop.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitSet {
    /// Training features, close column removed.
    pub train: FeatureTable,
    /// Test features including the lookback overlap, close column removed.
    pub test: FeatureTable,
    /// Close prices aligned row-for-row with `test`.
    pub test_close: Vec<f64>,
}
