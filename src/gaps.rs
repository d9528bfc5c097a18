//! Missing value repair.
//!
//! Missing cells are forward-filled column by column until none remain.
//! Forward-fill alone cannot resolve a gap at the very start of a column, so
//! leading gaps are governed by a [`LeadingGapPolicy`]. A column with no valid
//! value at all can never be repaired and is rejected up front.

use crate::error::{PrepError, Result};
use crate::types::TimeSeries;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How to treat missing values before the first valid value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadingGapPolicy {
    /// Seed the leading run with the column's first valid value.
    #[default]
    BackwardFill,
    /// Fail with a data quality error.
    Reject,
}

/// Summary of a repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GapReport {
    /// Missing cells found before repair.
    pub missing_before: usize,
    /// Cells filled from an earlier row.
    pub forward_filled: usize,
    /// Cells at the start of a column filled from a later row.
    pub leading_filled: usize,
}

impl GapReport {
    /// Check if the series needed no repair.
    pub fn is_clean(&self) -> bool {
        self.missing_before == 0
    }
}

/// Propagate the last valid value of every column forward.
///
/// Returns the number of cells filled. Leading gaps are left untouched.
pub fn forward_fill(series: &mut TimeSeries) -> usize {
    let mut filled = 0;
    for column in series.columns_mut() {
        let mut last: Option<f64> = None;
        for value in column.values.iter_mut() {
            if value.is_nan() {
                if let Some(prev) = last {
                    *value = prev;
                    filled += 1;
                }
            } else {
                last = Some(*value);
            }
        }
    }
    filled
}

/// Repair all missing values in place.
///
/// # Errors
/// [`PrepError::DataQuality`] if a column has no valid value, or if it has a
/// leading gap and `policy` is [`LeadingGapPolicy::Reject`]. The series is not
/// modified when an error is returned.
pub fn repair(series: &mut TimeSeries, policy: LeadingGapPolicy) -> Result<GapReport> {
    info!("Clean data");

    let mut report = GapReport {
        missing_before: series.missing_count(),
        ..Default::default()
    };
    if report.is_clean() {
        return Ok(report);
    }

    // Validate every column before touching any of them.
    let mut seeds: Vec<(usize, usize, f64)> = Vec::new();
    for (col_idx, column) in series.columns().iter().enumerate() {
        let first_valid = column.values.iter().position(|v| !v.is_nan());
        match first_valid {
            None => {
                return Err(PrepError::DataQuality(format!(
                    "column '{}' has no valid values",
                    column.name
                )))
            }
            Some(0) => {}
            Some(n) => {
                if policy == LeadingGapPolicy::Reject {
                    return Err(PrepError::DataQuality(format!(
                        "column '{}' starts with {} missing values",
                        column.name, n
                    )));
                }
                seeds.push((col_idx, n, column.values[n]));
            }
        }
    }

    {
        let columns = series.columns_mut();
        for &(col_idx, n, value) in &seeds {
            warn!(
                "Backward filling {} leading missing values in '{}'",
                n, columns[col_idx].name
            );
            columns[col_idx].values[..n].fill(value);
            report.leading_filled += n;
        }
    }

    while series.has_missing() {
        let filled = forward_fill(series);
        debug!("Forward filled {} cells", filled);
        report.forward_filled += filled;
    }

    Ok(report)
}
