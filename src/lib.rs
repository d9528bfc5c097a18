//! ohlcprep - OHLC time-series preparation for machine-learning training.
//!
//! # Overview
//!
//! ohlcprep turns raw candle files into clean, gap-free series and splits them
//! for sequence models:
//!
//! - **Loading**: delimited files with a `datetime` column promoted to the index
//! - **Gap repair**: forward-fill until no missing value remains
//! - **Resampling**: calendar-aligned OHLC aggregation (5Min, 1H, 1D, W, M)
//! - **Windowing**: inclusive date range restriction
//! - **Column roles**: moving-average vs other indicator columns
//! - **Splitting**: train/test tables with a lookback overlap for `n_past` models
//!
//! # Quick Start
//!
//! ```no_run
//! use ohlcprep::{Dataset, DatasetConfig, ModelSettings};
//!
//! let config = DatasetConfig::new("datasets", "USD/JPY", "12-16");
//! let mut dataset = Dataset::open(&config).unwrap();
//!
//! dataset.resample("1D").unwrap().restrict("2016-01-01", None).unwrap();
//! dataset.set_indicators("classification");
//!
//! let model = ModelSettings { test_size: 0.2, val_size: 0.1, n_past: 5 };
//! let split = dataset.test_train_split(&model).unwrap();
//! println!("train={} test={}", split.train.len(), split.test.len());
//! ```
//!
//! # Modules
//!
//! - [`types`]: Core data types (TimeSeries, FeatureTable, SplitSet)
//! - [`data`]: File loading and datetime parsing
//! - [`gaps`]: Missing value repair
//! - [`resample`]: OHLC resampling
//! - [`window`]: Date window restriction
//! - [`classify`]: Indicator column classification
//! - [`split`]: Row-count planning and train/test split
//! - [`indicators`]: Indicator engine trait
//! - [`pipeline`]: The `Dataset` that ties the steps together
//! - [`config`]: TOML configuration file support

pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod gaps;
pub mod indicators;
pub mod pipeline;
pub mod resample;
pub mod split;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use classify::{classify_columns, ColumnRoles, DEFAULT_TARGET};
pub use config::PrepFileConfig;
pub use data::{dataset_path, load_csv, load_csv_str, symbol_slug, DataConfig};
pub use error::{PrepError, Result};
pub use gaps::{forward_fill, repair, GapReport, LeadingGapPolicy};
pub use indicators::{IndicatorChain, IndicatorEngine};
pub use pipeline::{Dataset, DatasetConfig};
pub use resample::{resample, Period};
pub use split::{calc_set_size, test_train_split, ModelSettings, SetSizes, SplitConfig};
pub use types::{Column, FeatureTable, SplitSet, TimeSeries};
pub use window::restrict;
