//! Date window restriction.

use crate::error::Result;
use crate::types::TimeSeries;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{info, warn};

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
}

/// Keep rows between `from` and `to`, both taken at midnight and inclusive.
///
/// Without `to` every row from `from` onwards is kept. A window that misses
/// the data entirely yields an empty series rather than an error.
pub fn restrict(series: &TimeSeries, from: NaiveDate, to: Option<NaiveDate>) -> TimeSeries {
    let lower = at_midnight(from);
    let upper = to.map(at_midnight);

    match upper {
        Some(upper) => info!("Restrict data to {} .. {}", lower, upper),
        None => info!("Restrict data to {} ..", lower),
    }

    let restricted = series.filter_by_time(|ts| *ts >= lower && upper.map_or(true, |u| *ts <= u));

    if restricted.is_empty() && !series.is_empty() {
        warn!(
            "Window {} .. {:?} leaves no rows (data covers {:?} .. {:?})",
            lower,
            upper,
            series.start(),
            series.end()
        );
    }
    restricted
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
