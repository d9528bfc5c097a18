//! Time-series resampling into coarser candles.
//!
//! Rows are grouped into fixed-width buckets aligned to calendar boundaries
//! and aggregated with the usual OHLC rules:
//! - Open: first value in the bucket
//! - High: maximum
//! - Low: minimum
//! - Close: last value in the bucket
//!
//! Only these four columns survive. Any other column (volume, indicators)
//! is dropped on purpose, so indicators have to be computed after
//! resampling. Buckets without rows are dropped rather than filled, which
//! means resampling removes time gaps instead of representing them.
//!
//! Minute, hour and day buckets are labelled by their start. Weekly and
//! monthly buckets are labelled by their closing day (the Sunday, or the last
//! day of the month), so a date window applied afterwards keeps every bucket
//! whose period reaches into it.

use crate::error::{PrepError, Result};
use crate::types::{TimeSeries, CLOSE, HIGH, LOW, OPEN};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Bucket width for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Minute intervals (e.g., 5, 15, 30 minutes).
    Minute(u32),
    /// Hourly intervals (e.g., 1, 4 hours).
    Hour(u32),
    /// Daily intervals.
    Day(u32),
    /// Calendar weeks from Monday to Sunday.
    Week,
    /// Calendar months.
    Month,
}

impl Period {
    /// Bucket width in seconds. None for months, which vary in length.
    pub fn to_seconds(&self) -> Option<i64> {
        match self {
            Period::Minute(m) => Some(*m as i64 * 60),
            Period::Hour(h) => Some(*h as i64 * 3600),
            Period::Day(d) => Some(*d as i64 * 86400),
            Period::Week => Some(7 * 86400),
            Period::Month => None,
        }
    }

    /// Label of the bucket containing `timestamp`.
    ///
    /// Fixed-width periods count buckets from `origin`, midnight of the
    /// first day in the series, and are labelled by their start. Weeks run
    /// Monday to Sunday and are labelled by the Sunday that closes them;
    /// months are labelled by their last day.
    fn bucket_label(&self, timestamp: DateTime<Utc>, origin: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Minute(_) | Period::Hour(_) | Period::Day(_) => {
                let width = self.to_seconds().unwrap_or(86400);
                let offset = (timestamp - origin).num_seconds();
                origin + Duration::seconds(offset.div_euclid(width) * width)
            }
            Period::Week => {
                let date = timestamp.date_naive();
                let sunday =
                    date + Duration::days(6 - date.weekday().num_days_from_monday() as i64);
                midnight(sunday)
            }
            Period::Month => {
                let date = timestamp.date_naive();
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                let last = NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(date);
                midnight(last)
            }
        }
    }
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))
}

impl FromStr for Period {
    type Err = PrepError;

    /// Parse an offset alias such as `5Min`, `15T`, `1H`, `D`, `W`, `M` or `MS`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);

        let count: u32 = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| PrepError::InvalidInput(format!("invalid period: '{}'", s)))?
        };
        if count == 0 {
            return Err(PrepError::InvalidInput(format!(
                "period must be positive: '{}'",
                s
            )));
        }

        // Month aliases are case-sensitive: lower-case `ms` means milliseconds.
        let period = match (unit, unit.to_lowercase().as_str()) {
            ("M" | "MS", _) if count == 1 => Period::Month,
            (_, "min" | "t") => Period::Minute(count),
            (_, "h") => Period::Hour(count),
            (_, "d") => Period::Day(count),
            (_, "w") if count == 1 => Period::Week,
            _ => {
                return Err(PrepError::InvalidInput(format!(
                    "unsupported period: '{}'",
                    s
                )))
            }
        };
        Ok(period)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Minute(m) => write!(f, "{}Min", m),
            Period::Hour(h) => write!(f, "{}H", h),
            Period::Day(d) => write!(f, "{}D", d),
            Period::Week => write!(f, "W"),
            Period::Month => write!(f, "M"),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    open: Option<f64>,
    high: f64,
    low: f64,
    close: Option<f64>,
}

impl Bucket {
    fn new() -> Self {
        Self {
            open: None,
            high: f64::NAN,
            low: f64::NAN,
            close: None,
        }
    }

    fn push(&mut self, open: f64, high: f64, low: f64, close: f64) {
        if self.open.is_none() && !open.is_nan() {
            self.open = Some(open);
        }
        // f64::max/min ignore a NaN operand.
        self.high = self.high.max(high);
        self.low = self.low.min(low);
        if !close.is_nan() {
            self.close = Some(close);
        }
    }

    fn finish(&self) -> Option<[f64; 4]> {
        let (open, close) = (self.open?, self.close?);
        if self.high.is_nan() || self.low.is_nan() {
            return None;
        }
        Some([open, self.high, self.low, close])
    }
}

/// Resample a series into `period` candles.
///
/// Rows inside a bucket are taken in timestamp order. The result is sorted
/// by bucket label and holds only `open`, `high`, `low` and `close`.
///
/// # Errors
/// [`PrepError::MissingColumn`] if one of the OHLC columns is absent.
pub fn resample(series: &TimeSeries, period: Period) -> Result<TimeSeries> {
    info!("Aggregate data on {} candles", period);

    let open = series.require_column(OPEN)?;
    let high = series.require_column(HIGH)?;
    let low = series.require_column(LOW)?;
    let close = series.require_column(CLOSE)?;

    let Some(first_day) = series.index().iter().min().map(|t| t.date_naive()) else {
        return Ok(TimeSeries::new(Vec::new())
            .with_column(OPEN, Vec::new())?
            .with_column(HIGH, Vec::new())?
            .with_column(LOW, Vec::new())?
            .with_column(CLOSE, Vec::new())?);
    };
    let origin = midnight(first_day);

    let mut order: Vec<usize> = (0..series.len()).collect();
    order.sort_by_key(|&i| series.index()[i]);

    let mut buckets: BTreeMap<DateTime<Utc>, Bucket> = BTreeMap::new();
    for i in order {
        let key = period.bucket_label(series.index()[i], origin);
        buckets
            .entry(key)
            .or_insert_with(Bucket::new)
            .push(open[i], high[i], low[i], close[i]);
    }

    let mut index = Vec::with_capacity(buckets.len());
    let mut columns: [Vec<f64>; 4] = Default::default();
    for (start, bucket) in &buckets {
        if let Some(values) = bucket.finish() {
            index.push(*start);
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }
    }

    debug!(
        "Resampled {} rows into {} candles ({} buckets dropped as incomplete)",
        series.len(),
        index.len(),
        buckets.len() - index.len()
    );

    let [o, h, l, c] = columns;
    TimeSeries::new(index)
        .with_column(OPEN, o)?
        .with_column(HIGH, h)?
        .with_column(LOW, l)?
        .with_column(CLOSE, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::restrict;
    use chrono::{Timelike, Weekday};

    fn create_minute_series() -> TimeSeries {
        // 60 minute rows (1 hour of data)
        let index: Vec<DateTime<Utc>> = (0..60)
            .map(|i| Utc.with_ymd_and_hms(2016, 1, 4, 9, i, 0).unwrap())
            .collect();
        let base: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.1).collect();

        TimeSeries::new(index)
            .with_column(OPEN, base.clone())
            .unwrap()
            .with_column(HIGH, base.iter().map(|b| b + 0.5).collect())
            .unwrap()
            .with_column(LOW, base.iter().map(|b| b - 0.3).collect())
            .unwrap()
            .with_column(CLOSE, base.iter().map(|b| b + 0.2).collect())
            .unwrap()
            .with_column("volume", vec![1000.0; 60])
            .unwrap()
    }

    #[test]
    fn test_resample_ohlc_rules() {
        let index = vec![
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 1, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 2, 0).unwrap(),
        ];
        let series = TimeSeries::new(index)
            .with_column(OPEN, vec![0.9, 1.9, 2.9])
            .unwrap()
            .with_column(HIGH, vec![1.5, 4.0, 3.2])
            .unwrap()
            .with_column(LOW, vec![0.5, 1.5, 0.2])
            .unwrap()
            .with_column(CLOSE, vec![1.0, 2.0, 3.0])
            .unwrap();

        let resampled = resample(&series, Period::Day(1)).unwrap();

        assert_eq!(resampled.len(), 1);
        assert_eq!(resampled.column(OPEN).unwrap(), &[0.9]);
        assert_eq!(resampled.column(HIGH).unwrap(), &[4.0]);
        assert_eq!(resampled.column(LOW).unwrap(), &[0.2]);
        assert_eq!(resampled.column(CLOSE).unwrap(), &[3.0]);
    }

    #[test]
    fn test_resample_minute_to_5min() {
        let series = create_minute_series();
        let resampled = resample(&series, Period::Minute(5)).unwrap();

        assert_eq!(resampled.len(), 12);
        assert_eq!(resampled.index()[1].minute(), 5);

        let open = resampled.column(OPEN).unwrap();
        let close = resampled.column(CLOSE).unwrap();
        assert_eq!(open[0], 100.0);
        assert!((close[0] - (100.0 + 4.0 * 0.1 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_resample_drops_other_columns() {
        let series = create_minute_series();
        let resampled = resample(&series, Period::Hour(1)).unwrap();

        assert_eq!(resampled.len(), 1);
        assert_eq!(resampled.column_names(), vec![OPEN, HIGH, LOW, CLOSE]);
        assert!(!resampled.has_column("volume"));
    }

    #[test]
    fn test_resample_drops_empty_buckets() {
        let index = vec![
            Utc.with_ymd_and_hms(2016, 1, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 4, 10, 0, 0).unwrap(),
        ];
        let series = TimeSeries::new(index)
            .with_column(OPEN, vec![1.0, 2.0])
            .unwrap()
            .with_column(HIGH, vec![1.0, 2.0])
            .unwrap()
            .with_column(LOW, vec![1.0, 2.0])
            .unwrap()
            .with_column(CLOSE, vec![1.0, 2.0])
            .unwrap();

        let resampled = resample(&series, Period::Day(1)).unwrap();

        assert_eq!(resampled.len(), 2);
        assert_eq!(
            resampled.index()[1],
            Utc.with_ymd_and_hms(2016, 1, 4, 0, 0, 0).unwrap()
        );
    }

    fn create_daily_series(start: DateTime<Utc>, days: i64) -> TimeSeries {
        let index: Vec<DateTime<Utc>> = (0..days).map(|i| start + Duration::days(i)).collect();
        let values: Vec<f64> = (0..days).map(|i| i as f64).collect();
        TimeSeries::new(index)
            .with_column(OPEN, values.clone())
            .unwrap()
            .with_column(HIGH, values.clone())
            .unwrap()
            .with_column(LOW, values.clone())
            .unwrap()
            .with_column(CLOSE, values)
            .unwrap()
    }

    #[test]
    fn test_resample_weekly_labelled_by_sunday() {
        let series = create_daily_series(Utc.with_ymd_and_hms(2016, 1, 4, 0, 0, 0).unwrap(), 14);

        let resampled = resample(&series, Period::Week).unwrap();

        assert_eq!(resampled.len(), 2);
        assert_eq!(resampled.index()[0].weekday(), Weekday::Sun);
        assert_eq!(
            resampled.index()[0],
            Utc.with_ymd_and_hms(2016, 1, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(resampled.column(OPEN).unwrap(), &[0.0, 7.0]);
        assert_eq!(resampled.column(CLOSE).unwrap(), &[6.0, 13.0]);
    }

    #[test]
    fn test_resample_weekly_then_restrict_keeps_partial_week() {
        // 2016-01-01 is a Friday; its week closes on Sunday 2016-01-03.
        let series = create_daily_series(Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(), 10);
        let resampled = resample(&series, Period::Week).unwrap();

        assert_eq!(
            resampled.index(),
            &[
                Utc.with_ymd_and_hms(2016, 1, 3, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2016, 1, 10, 0, 0, 0).unwrap(),
            ]
        );

        let from = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let window = restrict(&resampled, from, None);
        assert_eq!(window.len(), 2);
        assert_eq!(window.column(CLOSE).unwrap(), &[2.0, 9.0]);
    }

    #[test]
    fn test_resample_monthly_labelled_by_month_end() {
        let series = create_daily_series(Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(), 45);
        let resampled = resample(&series, Period::Month).unwrap();

        assert_eq!(
            resampled.index(),
            &[
                Utc.with_ymd_and_hms(2016, 1, 31, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2016, 2, 29, 0, 0, 0).unwrap(),
            ]
        );

        let from = NaiveDate::from_ymd_opt(2016, 1, 15).unwrap();
        let window = restrict(&resampled, from, None);
        assert_eq!(window.len(), 2);
        assert_eq!(window.column(OPEN).unwrap(), &[0.0, 31.0]);
    }

    #[test]
    fn test_resample_monthly_december_rolls_over() {
        let series = create_daily_series(Utc.with_ymd_and_hms(2015, 12, 30, 0, 0, 0).unwrap(), 3);
        let resampled = resample(&series, Period::Month).unwrap();

        assert_eq!(
            resampled.index(),
            &[
                Utc.with_ymd_and_hms(2015, 12, 31, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2016, 1, 31, 0, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_resample_missing_column() {
        let series = TimeSeries::new(vec![Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap()])
            .with_column(OPEN, vec![1.0])
            .unwrap();
        let err = resample(&series, Period::Day(1)).unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn(_)));
    }

    #[test]
    fn test_resample_empty() {
        let series = TimeSeries::default()
            .with_column(OPEN, vec![])
            .unwrap()
            .with_column(HIGH, vec![])
            .unwrap()
            .with_column(LOW, vec![])
            .unwrap()
            .with_column(CLOSE, vec![])
            .unwrap();
        let resampled = resample(&series, Period::Day(1)).unwrap();
        assert!(resampled.is_empty());
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("5Min".parse::<Period>().unwrap(), Period::Minute(5));
        assert_eq!("15T".parse::<Period>().unwrap(), Period::Minute(15));
        assert_eq!("1H".parse::<Period>().unwrap(), Period::Hour(1));
        assert_eq!("4h".parse::<Period>().unwrap(), Period::Hour(4));
        assert_eq!("1D".parse::<Period>().unwrap(), Period::Day(1));
        assert_eq!("D".parse::<Period>().unwrap(), Period::Day(1));
        assert_eq!("W".parse::<Period>().unwrap(), Period::Week);
        assert_eq!("M".parse::<Period>().unwrap(), Period::Month);
        assert_eq!("MS".parse::<Period>().unwrap(), Period::Month);
        assert!("0D".parse::<Period>().is_err());
        assert!("2W".parse::<Period>().is_err());
        assert!("5X".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_month_alias_case_sensitive() {
        assert!("1ms".parse::<Period>().is_err());
        assert!("ms".parse::<Period>().is_err());
        assert!("m".parse::<Period>().is_err());
        assert!("2M".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_to_seconds() {
        assert_eq!(Period::Minute(5).to_seconds(), Some(300));
        assert_eq!(Period::Hour(1).to_seconds(), Some(3600));
        assert_eq!(Period::Day(1).to_seconds(), Some(86400));
        assert_eq!(Period::Week.to_seconds(), Some(604800));
        assert_eq!(Period::Month.to_seconds(), None);
    }
}
