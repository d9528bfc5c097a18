//! Configuration file support.
//!
//! A pipeline run can be described in a TOML file for reproducibility.

use crate::classify::DEFAULT_TARGET;
use crate::data::DataConfig;
use crate::error::{PrepError, Result};
use crate::gaps::LeadingGapPolicy;
use crate::pipeline::DatasetConfig;
use crate::resample::Period;
use crate::split::ModelSettings;
use crate::window::parse_date;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete preparation configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepFileConfig {
    /// Data source settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Pipeline step settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Model split settings.
    #[serde(default)]
    pub model: ModelSettings,
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory holding the dataset files.
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: String,
    /// Symbol pair.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// File postfix.
    #[serde(default = "default_postfix")]
    pub postfix: String,
    /// CSV delimiter. Auto-detected when absent.
    pub delimiter: Option<char>,
    /// Date format in the CSV.
    pub date_format: Option<String>,
}

fn default_datasets_dir() -> String { "datasets".to_string() }
fn default_symbol() -> String { "USD/JPY".to_string() }
fn default_postfix() -> String { "12-16".to_string() }

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            datasets_dir: "datasets".to_string(),
            symbol: "USD/JPY".to_string(),
            postfix: "12-16".to_string(),
            delimiter: None,
            date_format: None,
        }
    }
}

/// Pipeline step settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Resample period alias (e.g. "1H", "1D"). No resampling when absent.
    pub resample: Option<String>,
    /// Start date (YYYY-MM-DD format).
    pub from_date: Option<String>,
    /// End date (YYYY-MM-DD format).
    pub to_date: Option<String>,
    /// Target column skipped by classification.
    #[serde(default = "default_target")]
    pub target: String,
    /// Leading gap policy: "backward_fill" or "reject".
    #[serde(default)]
    pub leading_gap: LeadingGapPolicy,
}

fn default_target() -> String { DEFAULT_TARGET.to_string() }

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            resample: None,
            from_date: None,
            to_date: None,
            target: DEFAULT_TARGET.to_string(),
            leading_gap: LeadingGapPolicy::default(),
        }
    }
}

impl PrepFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PrepFileConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PrepError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if let Some(period) = &self.pipeline.resample {
            period.parse::<Period>()?;
        }
        if let Some(from) = &self.pipeline.from_date {
            parse_date(from)?;
        }
        if let Some(to) = &self.pipeline.to_date {
            parse_date(to)?;
            if self.pipeline.from_date.is_none() {
                return Err(PrepError::Config(
                    "to_date requires from_date".to_string(),
                ));
            }
        }
        for (name, value) in [
            ("test_size", self.model.test_size),
            ("val_size", self.model.val_size),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PrepError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if let Some(d) = self.data.delimiter {
            if !d.is_ascii() {
                return Err(PrepError::Config(format!(
                    "delimiter must be an ASCII character, got {:?}",
                    d
                )));
            }
        }
        Ok(())
    }

    /// Convert the data settings into a [`DatasetConfig`].
    pub fn to_dataset_config(&self) -> DatasetConfig {
        DatasetConfig {
            datasets_dir: self.data.datasets_dir.clone().into(),
            symbol: self.data.symbol.clone(),
            postfix: self.data.postfix.clone(),
            data: DataConfig {
                delimiter: self.data.delimiter.map(|c| c as u8),
                date_format: self.data.date_format.clone(),
            },
            leading_gap: self.pipeline.leading_gap,
        }
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# ohlcprep configuration

[data]
# Directory holding <base><quote>_<postfix>.csv files
datasets_dir = "datasets"
symbol = "USD/JPY"
postfix = "12-16"
# delimiter = ","
# date_format = "%Y-%m-%d %H:%M:%S"

[pipeline]
# Resample to coarser candles: 5Min, 15T, 1H, 4H, 1D, W, M
resample = "1H"
from_date = "2016-01-01"
# to_date = "2016-12-31"
target = "classification"
# What to do with missing values at the start of a column: backward_fill or reject
leading_gap = "backward_fill"

[model]
test_size = 0.2
val_size = 0.1
n_past = 30
"#
        .to_string()
    }
}
