//! Train/test split planning for lookback-window models.
//!
//! Row counts are derived independently from the model's ratios, so they do
//! not form a partition: `train + test` may differ from the total and the
//! validation count is informational only.
//!
//! The test slice starts `n_past` rows before the end of the training slice,
//! which gives a sequence model enough history for its first test prediction
//! without reading past the nominal boundary.

use crate::error::{PrepError, Result};
use crate::types::{FeatureTable, SplitSet, TimeSeries, CLOSE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Split configuration exposed by a model.
pub trait SplitConfig {
    /// Fraction of rows held out for testing, in `[0, 1]`.
    fn test_size(&self) -> f64;
    /// Fraction of the training rows used for validation, in `[0, 1]`.
    fn val_size(&self) -> f64;
    /// Number of past rows one prediction consumes.
    fn n_past(&self) -> usize;
}

/// Plain model settings, usually read from the `[model]` table of a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_val_size")]
    pub val_size: f64,
    #[serde(default = "default_n_past")]
    pub n_past: usize,
}

fn default_test_size() -> f64 { 0.2 }
fn default_val_size() -> f64 { 0.1 }
fn default_n_past() -> usize { 30 }

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            val_size: 0.1,
            n_past: 30,
        }
    }
}

impl SplitConfig for ModelSettings {
    fn test_size(&self) -> f64 {
        self.test_size
    }

    fn val_size(&self) -> f64 {
        self.val_size
    }

    fn n_past(&self) -> usize {
        self.n_past
    }
}

/// Row counts derived from a model's ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetSizes {
    pub train: usize,
    pub test: usize,
    pub validation: usize,
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PrepError::InvalidInput(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

/// Round half to even, the way the downstream tooling rounds row counts.
fn round_rows(value: f64) -> usize {
    value.round_ties_even() as usize
}

/// Compute train/test/validation row counts for `total` rows.
///
/// - `train = round((1 - test_size) * total)`
/// - `test = round(test_size * total)`
/// - `validation = round((1 - test_size) * val_size * total)`
pub fn calc_set_size(total: usize, config: &impl SplitConfig) -> Result<SetSizes> {
    let test_size = config.test_size();
    let val_size = config.val_size();
    check_ratio("test_size", test_size)?;
    check_ratio("val_size", val_size)?;

    let total = total as f64;
    let sizes = SetSizes {
        train: round_rows((1.0 - test_size) * total),
        test: round_rows(test_size * total),
        validation: round_rows((1.0 - test_size) * val_size * total),
    };
    debug!("Set sizes for {} rows: {:?}", total, sizes);
    Ok(sizes)
}

/// Split a series into train/test feature tables and the test close prices.
///
/// Train covers rows `[0, train)`, test covers `[train - n_past, len)`. The
/// close column is taken from the test slice first and then removed from both
/// tables. All outputs are positional.
///
/// # Errors
/// - [`PrepError::IndexRange`] if `n_past >= train`
/// - [`PrepError::MissingColumn`] if there is no close column
/// - [`PrepError::InvalidInput`] for ratios outside `[0, 1]`
pub fn test_train_split(series: &TimeSeries, config: &impl SplitConfig) -> Result<SplitSet> {
    let sizes = calc_set_size(series.len(), config)?;
    let n_past = config.n_past();

    if n_past >= sizes.train {
        warn!(
            "Lookback of {} rows does not fit into {} training rows",
            n_past, sizes.train
        );
        return Err(PrepError::IndexRange {
            n_past,
            train_rows: sizes.train,
        });
    }
    series.require_column(CLOSE)?;

    let mut train = series.slice(0..sizes.train);
    let mut test = series.slice(sizes.train - n_past..series.len());

    let test_close = test
        .drop_column(CLOSE)
        .map(|c| c.values)
        .unwrap_or_default();
    train.drop_column(CLOSE);

    info!(
        "Split {} rows: {} train, {} test ({} overlapping)",
        series.len(),
        train.len(),
        test.len(),
        n_past
    );

    Ok(SplitSet {
        train: FeatureTable::from_series(train),
        test: FeatureTable::from_series(test),
        test_close,
    })
}
