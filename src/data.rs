//! Data loading for raw OHLC candle files.
//!
//! The loader reads a delimited text file into a [`TimeSeries`], parses the
//! `datetime` column and promotes it to the index. Any extra numeric columns
//! are passed through untouched; empty cells become `NaN` and are left for
//! [`crate::gaps`] to repair.

use crate::error::{PrepError, Result};
use crate::types::{TimeSeries, CLOSE, HIGH, LOW, OPEN};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the column that becomes the index.
pub const DATETIME: &str = "datetime";

/// Columns every source file must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [DATETIME, OPEN, HIGH, LOW, CLOSE];

/// Cell values read as missing.
const NA_VALUES: [&str; 7] = ["", "nan", "NaN", "NA", "N/A", "null", "NULL"];

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Loader configuration.
#[derive(Debug, Clone, Default)]
pub struct DataConfig {
    /// CSV delimiter character. If None, delimiter is auto-detected.
    pub delimiter: Option<u8>,
    /// Date format string tried before the built-in formats.
    pub date_format: Option<String>,
}

/// Turn a symbol pair into its file slug, e.g. `"USD/JPY"` -> `"usdjpy"`.
pub fn symbol_slug(symbol: &str) -> Result<String> {
    let lower = symbol.trim().to_lowercase();
    match lower.split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
            Ok(format!("{}{}", base, quote))
        }
        _ => Err(PrepError::InvalidInput(format!(
            "symbol '{}' is not a BASE/QUOTE pair",
            symbol
        ))),
    }
}

/// Path of a dataset file: `<dir>/<slug>_<postfix>.csv`.
pub fn dataset_path(dir: impl AsRef<Path>, symbol: &str, postfix: &str) -> Result<PathBuf> {
    let filename = format!("{}_{}.csv", symbol_slug(symbol)?, postfix);
    Ok(dir.as_ref().join(filename))
}

/// Detect the CSV delimiter by analyzing the first few lines of the file.
///
/// Tries common delimiters (comma, tab, semicolon, pipe) and returns the one
/// that produces the most consistent column count across lines.
fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().take(5).filter_map(|l| l.ok()).collect();
    Ok(detect_delimiter_in(&lines))
}

fn detect_delimiter_in(lines: &[String]) -> u8 {
    if lines.is_empty() {
        return b',';
    }

    let delimiters = [b',', b'\t', b';', b'|'];
    let min_fields = REQUIRED_COLUMNS.len();

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in &delimiters {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.as_bytes().iter().filter(|&&b| b == delim).count() + 1)
            .collect();

        let first_count = counts[0];
        let all_consistent = counts.iter().all(|&c| c == first_count);

        if all_consistent && first_count >= min_fields && first_count > best_score {
            best_score = first_count;
            best_delimiter = delim;
        }
    }

    debug!(
        "Detected delimiter {:?} with score {}",
        best_delimiter as char, best_score
    );
    best_delimiter
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))
}

/// Parse a datetime cell with multiple format attempts.
///
/// Integer cells are read as Unix epochs, in milliseconds when large enough.
pub fn parse_datetime(s: &str, format: Option<&str>) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Some(fmt) = format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(midnight(d));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];

    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%m/%d/%Y",
        "%d-%b-%Y",  // 15-Jan-2024
        "%d %b %Y",  // 15 Jan 2024
        "%b %d, %Y", // Jan 15, 2024
    ];

    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(midnight(d));
        }
    }

    if let Ok(ts) = s.parse::<i64>() {
        let parsed = if ts.abs() > EPOCH_MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(PrepError::Parse(format!("Could not parse datetime: '{}'", s)))
}

fn parse_value(cell: &str, row: usize, column: &str) -> Result<f64> {
    let cell = cell.trim();
    if NA_VALUES.contains(&cell) {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        PrepError::Parse(format!(
            "invalid number '{}' in column '{}' at row {}",
            cell, column, row
        ))
    })
}

/// Load candles from a delimited file and index them by `datetime`.
///
/// # Errors
/// - [`PrepError::SourceNotFound`] if `path` does not exist
/// - [`PrepError::MissingColumn`] if a required column is absent
/// - [`PrepError::Parse`] / [`PrepError::Csv`] on malformed content
/// - [`PrepError::NoData`] if the file has no data rows
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<TimeSeries> {
    let path = path.as_ref();
    info!("Loading data from: {}", path.display());

    if !path.exists() {
        warn!("Unable to import {}", path.display());
        return Err(PrepError::SourceNotFound(path.to_path_buf()));
    }

    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(path)?,
    };

    let file = File::open(path)?;
    load_from_reader(file, delimiter, config)
}

/// Load candles from in-memory CSV text.
pub fn load_csv_str(content: &str, config: &DataConfig) -> Result<TimeSeries> {
    let delimiter = match config.delimiter {
        Some(d) => d,
        None => {
            let lines: Vec<String> = content.lines().take(5).map(str::to_string).collect();
            detect_delimiter_in(&lines)
        }
    };
    load_from_reader(content.as_bytes(), delimiter, config)
}

/// Rename repeated header names to `name.1`, `name.2`, ... so that every
/// column survives. The first occurrence keeps its name.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut unique = Vec::with_capacity(headers.len());

    for name in headers {
        let mut candidate = name.clone();
        let mut suffix = 0;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}.{}", name, suffix);
        }
        if candidate != name {
            warn!("Duplicate column '{}' renamed to '{}'", name, candidate);
        }
        seen.insert(candidate.clone());
        unique.push(candidate);
    }
    unique
}

fn load_from_reader<R: Read>(source: R, delimiter: u8, config: &DataConfig) -> Result<TimeSeries> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = unique_headers(reader.headers()?.iter().map(str::to_string).collect());
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(PrepError::MissingColumn(required.to_string()));
        }
    }

    let mut datetime_idx = 0;
    let mut value_columns: Vec<(usize, String)> = Vec::with_capacity(headers.len());
    for (i, name) in headers.iter().enumerate() {
        if name == DATETIME {
            datetime_idx = i;
        } else {
            value_columns.push((i, name.clone()));
        }
    }

    let mut index = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_columns.len()];
    let mut record = StringRecord::new();
    let mut row = 0;

    while reader.read_record(&mut record)? {
        row += 1;
        let cell = record.get(datetime_idx).unwrap_or_default();
        index.push(parse_datetime(cell, config.date_format.as_deref())?);

        for (slot, (col_idx, name)) in values.iter_mut().zip(&value_columns) {
            slot.push(parse_value(record.get(*col_idx).unwrap_or_default(), row, name)?);
        }
    }

    if index.is_empty() {
        return Err(PrepError::NoData);
    }

    let mut series = TimeSeries::new(index);
    for ((_, name), column) in value_columns.into_iter().zip(values) {
        series.push_column(name, column)?;
    }

    info!(
        "Loaded {} rows from {} to {}",
        series.len(),
        series.start().map(|t| t.to_string()).unwrap_or_default(),
        series.end().map(|t| t.to_string()).unwrap_or_default()
    );
    debug!("Columns: {:?}", series.column_names());

    Ok(series)
}
