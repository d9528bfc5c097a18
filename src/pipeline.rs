//! The dataset pipeline.
//!
//! A [`Dataset`] owns one live [`TimeSeries`]. Construction loads the source,
//! indexes it by datetime and repairs missing values; it either succeeds
//! completely or returns an error. Resampling and window restriction are
//! optional and chain:
//!
//! ```no_run
//! use ohlcprep::pipeline::{Dataset, DatasetConfig};
//! use ohlcprep::split::ModelSettings;
//!
//! let config = DatasetConfig::new("datasets", "USD/JPY", "12-16");
//! let mut dataset = Dataset::open(&config)?;
//! dataset.resample("1H")?.restrict("2016-01-01", Some("2016-06-30"))?;
//!
//! let split = dataset.test_train_split(&ModelSettings::default())?;
//! println!("{} train rows", split.train.len());
//! # Ok::<(), ohlcprep::PrepError>(())
//! ```
//!
//! Indicators have to be appended after resampling, since resampling keeps
//! only the OHLC columns.

use crate::classify::{classify_columns, ColumnRoles};
use crate::data::{dataset_path, load_csv, DataConfig};
use crate::error::{PrepError, Result};
use crate::gaps::{repair, GapReport, LeadingGapPolicy};
use crate::indicators::IndicatorEngine;
use crate::resample::{resample, Period};
use crate::split::{calc_set_size, test_train_split, SetSizes, SplitConfig};
use crate::types::{SplitSet, TimeSeries};
use crate::window::{parse_date, restrict};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a dataset comes from and how it is cleaned on load.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Directory holding the dataset files.
    pub datasets_dir: PathBuf,
    /// Symbol pair, e.g. `"USD/JPY"`.
    pub symbol: String,
    /// File postfix, e.g. `"12-16"`.
    pub postfix: String,
    /// Loader settings.
    pub data: DataConfig,
    /// Treatment of missing values before a column's first valid value.
    pub leading_gap: LeadingGapPolicy,
}

impl DatasetConfig {
    /// Create a config with default loader settings.
    pub fn new(
        datasets_dir: impl Into<PathBuf>,
        symbol: impl Into<String>,
        postfix: impl Into<String>,
    ) -> Self {
        Self {
            datasets_dir: datasets_dir.into(),
            symbol: symbol.into(),
            postfix: postfix.into(),
            data: DataConfig::default(),
            leading_gap: LeadingGapPolicy::default(),
        }
    }

    /// Path of the source file.
    pub fn path(&self) -> Result<PathBuf> {
        dataset_path(&self.datasets_dir, &self.symbol, &self.postfix)
    }
}

/// Owner of the live series and of everything derived from it.
#[derive(Debug, Clone)]
pub struct Dataset {
    symbol: Option<String>,
    source: Option<PathBuf>,
    series: TimeSeries,
    snapshot: Option<TimeSeries>,
    gap_report: GapReport,
    roles: ColumnRoles,
    sizes: SetSizes,
}

impl Dataset {
    /// Load the dataset file named by `config`.
    pub fn open(config: &DatasetConfig) -> Result<Self> {
        let path = config.path()?;
        let mut dataset = Self::from_path(&path, &config.data, config.leading_gap)?;
        dataset.symbol = Some(config.symbol.to_uppercase());
        Ok(dataset)
    }

    /// Load a dataset from an explicit file path.
    pub fn from_path(
        path: impl AsRef<Path>,
        data: &DataConfig,
        leading_gap: LeadingGapPolicy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let series = load_csv(path, data).map_err(|e| {
            warn!("Unable to initialize dataset: {}", e);
            e
        })?;
        let mut dataset = Self::from_series(series, leading_gap)?;
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    /// Wrap an already indexed series, repairing its missing values.
    pub fn from_series(mut series: TimeSeries, leading_gap: LeadingGapPolicy) -> Result<Self> {
        let gap_report = repair(&mut series, leading_gap)?;
        debug!("Gap repair: {:?}", gap_report);

        Ok(Self {
            symbol: None,
            source: None,
            series,
            snapshot: None,
            gap_report,
            roles: ColumnRoles::default(),
            sizes: SetSizes::default(),
        })
    }

    /// Symbol the dataset was opened for, upper-cased.
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// File the dataset was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The live series.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Mutable access to the live series, e.g. for feature engineering.
    pub fn series_mut(&mut self) -> &mut TimeSeries {
        &mut self.series
    }

    /// Report of the repair done at construction.
    pub fn gap_report(&self) -> &GapReport {
        &self.gap_report
    }

    /// Number of rows in the live series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the live series has no rows.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Aggregate the live series into coarser candles.
    ///
    /// `period` is an offset alias such as `"1D"`, `"1H"` or `"5Min"`. Every
    /// column other than open/high/low/close is dropped.
    pub fn resample(&mut self, period: &str) -> Result<&mut Self> {
        let period: Period = period.parse()?;
        self.resample_period(period)
    }

    /// Typed variant of [`Dataset::resample`].
    pub fn resample_period(&mut self, period: Period) -> Result<&mut Self> {
        self.series = resample(&self.series, period)?;
        Ok(self)
    }

    /// Keep rows between two `YYYY-MM-DD` dates, both inclusive at midnight.
    pub fn restrict(&mut self, from_date: &str, to_date: Option<&str>) -> Result<&mut Self> {
        let from = parse_date(from_date)?;
        let to = to_date.map(parse_date).transpose()?;
        self.series = restrict(&self.series, from, to);
        Ok(self)
    }

    /// Let an indicator engine append its columns to the live series.
    pub fn apply_indicators(&mut self, engine: &dyn IndicatorEngine) -> Result<&mut Self> {
        let before = self.series.columns().len();
        engine.append_indicators(&mut self.series)?;
        debug!(
            "Indicator engine added {} columns",
            self.series.columns().len().saturating_sub(before)
        );
        Ok(self)
    }

    /// Move the last `positions` columns to the front. Rotating by the
    /// column count or more leaves the order unchanged.
    pub fn reorder(&mut self, positions: usize) -> &TimeSeries {
        self.series.rotate_columns_right(positions);
        &self.series
    }

    /// Keep a copy of the live series in memory.
    pub fn save_snapshot(&mut self) {
        debug!("Saving snapshot of {} rows", self.series.len());
        self.snapshot = Some(self.series.clone());
    }

    /// Replace the live series with a copy of the saved snapshot.
    ///
    /// The snapshot stays available for further restores.
    pub fn restore_snapshot(&mut self) -> Result<()> {
        let snapshot = self.snapshot.as_ref().ok_or(PrepError::NoSnapshot)?;
        self.series = snapshot.clone();
        debug!("Restored snapshot of {} rows", self.series.len());
        Ok(())
    }

    /// Check if a snapshot has been saved.
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Classify the current columns into indicator groups.
    ///
    /// Replaces any earlier classification.
    pub fn set_indicators(&mut self, target: &str) -> &ColumnRoles {
        self.roles = classify_columns(self.series.column_names(), target);
        info!(
            "Found {} moving-average and {} other indicators",
            self.roles.mean_indicators.len(),
            self.roles.indicators.len()
        );
        &self.roles
    }

    /// Result of the last [`Dataset::set_indicators`] call.
    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    /// Moving-average family indicators from the last classification.
    pub fn mean_indicators(&self) -> &[String] {
        &self.roles.mean_indicators
    }

    /// Other indicators from the last classification.
    pub fn indicators(&self) -> &[String] {
        &self.roles.indicators
    }

    /// Compute and remember row counts for the live series.
    pub fn calc_set_size(&mut self, config: &impl SplitConfig) -> Result<SetSizes> {
        self.sizes = calc_set_size(self.series.len(), config)?;
        Ok(self.sizes)
    }

    /// Row counts from the last split or size calculation.
    pub fn set_sizes(&self) -> SetSizes {
        self.sizes
    }

    /// Split the live series for training, see [`crate::split::test_train_split`].
    pub fn test_train_split(&mut self, config: &impl SplitConfig) -> Result<SplitSet> {
        self.calc_set_size(config)?;
        test_train_split(&self.series, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::ModelSettings;
    use crate::types::CLOSE;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_dataset(dir: &Path, name: &str, hours: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "datetime,open,high,low,close,volume").unwrap();
        for i in 0..hours {
            let day = 1 + i / 24;
            let hour = i % 24;
            let price = 120.0 + i as f64 * 0.01;
            if i == 3 {
                writeln!(file, "2016-01-{:02} {:02}:00:00,,,,,", day, hour).unwrap();
            } else {
                writeln!(
                    file,
                    "2016-01-{:02} {:02}:00:00,{},{},{},{},100",
                    day,
                    hour,
                    price,
                    price + 0.05,
                    price - 0.05,
                    price + 0.01
                )
                .unwrap();
            }
        }
        path
    }

    #[test]
    fn test_open_by_symbol() {
        let dir = TempDir::new().unwrap();
        write_dataset(dir.path(), "usdjpy_12-16.csv", 48);

        let config = DatasetConfig::new(dir.path(), "usd/jpy", "12-16");
        let dataset = Dataset::open(&config).unwrap();

        assert_eq!(dataset.len(), 48);
        assert_eq!(dataset.symbol(), Some("USD/JPY"));
        assert!(!dataset.series().has_missing());
        assert_eq!(dataset.gap_report().missing_before, 5);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = DatasetConfig::new(dir.path(), "EUR/USD", "12-16");
        assert!(matches!(
            Dataset::open(&config),
            Err(PrepError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_chained_resample_and_restrict() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), "eurusd_x.csv", 24 * 5);
        let mut dataset =
            Dataset::from_path(&path, &DataConfig::default(), LeadingGapPolicy::Reject).unwrap();

        dataset
            .resample("1D")
            .unwrap()
            .restrict("2016-01-02", Some("2016-01-04"))
            .unwrap();

        assert_eq!(dataset.len(), 3);
        assert!(!dataset.series().has_column("volume"));
    }

    #[test]
    fn test_snapshot_restore() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), "eurusd_x.csv", 48);
        let mut dataset =
            Dataset::from_path(&path, &DataConfig::default(), LeadingGapPolicy::Reject).unwrap();

        assert!(matches!(
            dataset.restore_snapshot(),
            Err(PrepError::NoSnapshot)
        ));

        dataset.save_snapshot();
        let original = dataset.series().clone();

        dataset.resample("1D").unwrap();
        assert_eq!(dataset.len(), 2);

        dataset.restore_snapshot().unwrap();
        assert_eq!(dataset.series(), &original);
        assert!(dataset.has_snapshot());
    }

    #[test]
    fn test_indicators_and_split() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), "eurusd_x.csv", 100);
        let mut dataset =
            Dataset::from_path(&path, &DataConfig::default(), LeadingGapPolicy::Reject).unwrap();

        let engine = |series: &mut TimeSeries| -> Result<()> {
            let close = series.require_column(CLOSE)?.to_vec();
            series.push_column("EWMA_10", close.clone())?;
            series.push_column("RSI_14", close.iter().map(|_| 50.0).collect())
        };
        dataset.apply_indicators(&engine).unwrap();

        let roles = dataset.set_indicators("classification").clone();
        assert_eq!(roles.mean_indicators, vec!["EWMA_10"]);
        assert_eq!(roles.indicators, vec!["RSI_14"]);

        let model = ModelSettings {
            test_size: 0.2,
            val_size: 0.1,
            n_past: 5,
        };
        let split = dataset.test_train_split(&model).unwrap();
        assert_eq!(dataset.set_sizes().train, 80);
        assert_eq!(split.test.len(), 25);
        assert_eq!(split.test_close.len(), 25);
    }

    #[test]
    fn test_classification_is_fresh_each_call() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), "eurusd_x.csv", 10);
        let mut dataset =
            Dataset::from_path(&path, &DataConfig::default(), LeadingGapPolicy::Reject).unwrap();

        dataset.series_mut().push_column("SMA_3", vec![0.0; 10]).unwrap();
        assert_eq!(dataset.set_indicators("classification").len(), 1);

        dataset.series_mut().drop_column("SMA_3");
        assert!(dataset.set_indicators("classification").is_empty());
    }

    #[test]
    fn test_reorder() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(dir.path(), "eurusd_x.csv", 10);
        let mut dataset =
            Dataset::from_path(&path, &DataConfig::default(), LeadingGapPolicy::Reject).unwrap();

        let series = dataset.reorder(1);
        assert_eq!(series.column_names()[0], "volume");

        let series = dataset.reorder(5);
        assert_eq!(
            series.column_names(),
            vec!["volume", "open", "high", "low", "close"]
        );
    }
}
