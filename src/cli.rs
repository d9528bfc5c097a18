//! Command-line interface for the preparation pipeline.

use ohlcprep::config::PrepFileConfig;
use ohlcprep::data::DataConfig;
use ohlcprep::error::Result;
use ohlcprep::gaps::{GapReport, LeadingGapPolicy};
use ohlcprep::pipeline::Dataset;
use ohlcprep::split::SetSizes;
use ohlcprep::types::CLOSE;
use ohlcprep::ColumnRoles;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// ohlcprep - OHLC time-series preparation for machine-learning training.
#[derive(Parser)]
#[command(name = "ohlcprep")]
#[command(version)]
#[command(about = "Prepare OHLC price series for model training")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and repair a data file, then report on it
    Inspect {
        /// Path to CSV data file
        #[arg(short, long)]
        data: PathBuf,

        /// Treatment of missing values at the start of a column
        #[arg(long, value_enum, default_value = "backward-fill")]
        leading_gap: LeadingGapArg,
    },

    /// Run the pipeline described by a configuration file
    Prepare {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "ohlcprep.toml")]
        output: PathBuf,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LeadingGapArg {
    BackwardFill,
    Reject,
}

impl From<LeadingGapArg> for LeadingGapPolicy {
    fn from(arg: LeadingGapArg) -> Self {
        match arg {
            LeadingGapArg::BackwardFill => LeadingGapPolicy::BackwardFill,
            LeadingGapArg::Reject => LeadingGapPolicy::Reject,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Inspect { data, leading_gap } => {
            inspect(data, (*leading_gap).into(), cli.output)
        }
        Commands::Prepare { config } => prepare(config, cli.output),
        Commands::Init { output } => init_config(output),
    }
}

#[derive(Debug, Serialize)]
struct InspectReport {
    rows: usize,
    start: Option<String>,
    end: Option<String>,
    columns: Vec<String>,
    gaps: GapReport,
    close_min: Option<f64>,
    close_max: Option<f64>,
}

impl InspectReport {
    fn from_dataset(dataset: &Dataset) -> Self {
        let series = dataset.series();
        let close = series.column(CLOSE).unwrap_or_default();
        let (close_min, close_max) = if close.is_empty() {
            (None, None)
        } else {
            (
                Some(close.iter().copied().fold(f64::INFINITY, f64::min)),
                Some(close.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            )
        };

        Self {
            rows: series.len(),
            start: series.start().map(|t| t.to_string()),
            end: series.end().map(|t| t.to_string()),
            columns: series.column_names().iter().map(|c| c.to_string()).collect(),
            gaps: *dataset.gap_report(),
            close_min,
            close_max,
        }
    }

    fn print_text(&self) {
        println!("Rows: {}", self.rows);
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            println!("Start: {}", start);
            println!("End: {}", end);
        }
        println!("Columns: {}", self.columns.join(", "));
        if let (Some(min), Some(max)) = (self.close_min, self.close_max) {
            println!("Close Range: {:.5} - {:.5}", min, max);
        }
        println!(
            "Missing values repaired: {} ({} forward, {} leading)",
            self.gaps.missing_before, self.gaps.forward_filled, self.gaps.leading_filled
        );
    }
}

#[derive(Debug, Serialize)]
struct PrepareReport {
    symbol: String,
    source: String,
    rows: usize,
    roles: ColumnRoles,
    sizes: SetSizes,
    train_rows: usize,
    test_rows: usize,
    feature_columns: Vec<String>,
}

fn inspect(data: &PathBuf, leading_gap: LeadingGapPolicy, output: OutputFormat) -> Result<()> {
    let dataset = Dataset::from_path(data, &DataConfig::default(), leading_gap)?;
    let report = InspectReport::from_dataset(&dataset);

    match output {
        OutputFormat::Text => {
            println!("Data file: {}", data.display());
            report.print_text();
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn prepare(config_path: &PathBuf, output: OutputFormat) -> Result<()> {
    let file_config = PrepFileConfig::load(config_path)?;
    let dataset_config = file_config.to_dataset_config();
    let source = dataset_config.path()?;

    let mut dataset = Dataset::open(&dataset_config)?;
    if let Some(period) = &file_config.pipeline.resample {
        dataset.resample(period)?;
    }
    if let Some(from) = &file_config.pipeline.from_date {
        dataset.restrict(from, file_config.pipeline.to_date.as_deref())?;
    }
    info!("Prepared {} rows", dataset.len());

    let roles = dataset.set_indicators(&file_config.pipeline.target).clone();
    let split = dataset.test_train_split(&file_config.model)?;

    let report = PrepareReport {
        symbol: file_config.data.symbol.clone(),
        source: source.display().to_string(),
        rows: dataset.len(),
        roles,
        sizes: dataset.set_sizes(),
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        feature_columns: split
            .train
            .column_names()
            .iter()
            .map(|c| c.to_string())
            .collect(),
    };

    match output {
        OutputFormat::Text => {
            println!("Dataset: {} ({})", report.symbol, report.source);
            println!("Rows: {}", report.rows);
            println!("Moving-average indicators: {:?}", report.roles.mean_indicators);
            println!("Other indicators: {:?}", report.roles.indicators);
            println!(
                "Set sizes: train {}, test {}, validation {}",
                report.sizes.train, report.sizes.test, report.sizes.validation
            );
            println!(
                "Split: {} train rows, {} test rows (lookback {})",
                report.train_rows, report.test_rows, file_config.model.n_past
            );
            println!("Feature columns: {}", report.feature_columns.join(", "));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn init_config(output: &PathBuf) -> Result<()> {
    fs::write(output, PrepFileConfig::example())?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to describe your dataset, then run:");
    println!("  ohlcprep prepare -c {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_inspect() {
        let cli = Cli::try_parse_from(["ohlcprep", "inspect", "-d", "usdjpy_12-16.csv"]).unwrap();
        match cli.command {
            Commands::Inspect { data, leading_gap } => {
                assert_eq!(data, PathBuf::from("usdjpy_12-16.csv"));
                assert_eq!(leading_gap, LeadingGapArg::BackwardFill);
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_parse_prepare_json() {
        let cli =
            Cli::try_parse_from(["ohlcprep", "-vv", "-o", "json", "prepare", "-c", "prep.toml"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Prepare { .. }));
    }

    #[test]
    fn test_cli_parse_leading_gap() {
        let cli = Cli::try_parse_from([
            "ohlcprep",
            "inspect",
            "-d",
            "data.csv",
            "--leading-gap",
            "reject",
        ])
        .unwrap();
        match cli.command {
            Commands::Inspect { leading_gap, .. } => {
                assert_eq!(LeadingGapPolicy::from(leading_gap), LeadingGapPolicy::Reject)
            }
            _ => panic!("Expected Inspect command"),
        }
    }
}
