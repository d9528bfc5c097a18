//! Column role classification.
//!
//! After indicator columns have been appended, every column plays exactly one
//! role: a price/volume column, the prediction target, a moving-average style
//! indicator, or some other indicator. Only the last two are reported.

use serde::{Deserialize, Serialize};

/// Default name of the label column used by the downstream model.
pub const DEFAULT_TARGET: &str = "classification";

/// Price and volume columns that are never treated as indicators.
pub const PRICE_COLUMNS: [&str; 5] = ["open", "high", "close", "low", "volume"];

/// Substrings that mark a moving-average family indicator.
pub const MEAN_MARKERS: [&str; 3] = ["EWMA", "EMA", "SMA"];

/// Indicator columns grouped by role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnRoles {
    /// Moving-average family indicators, in first-seen order.
    pub mean_indicators: Vec<String>,
    /// All other indicators, in first-seen order.
    pub indicators: Vec<String>,
}

impl ColumnRoles {
    /// Total number of classified indicator columns.
    pub fn len(&self) -> usize {
        self.mean_indicators.len() + self.indicators.len()
    }

    /// Check if no indicator columns were found.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check if `name` is a price/volume column.
///
/// A name counts as one when it occurs inside any of [`PRICE_COLUMNS`], so
/// fragments such as `"lo"` are skipped as well.
pub fn is_price_column(name: &str) -> bool {
    PRICE_COLUMNS.iter().any(|price| price.contains(name))
}

/// Check if `name` carries one of the [`MEAN_MARKERS`] (case-sensitive).
pub fn is_mean_indicator(name: &str) -> bool {
    MEAN_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Classify column names into indicator groups.
///
/// Names equal to `target` or matching [`is_price_column`] are skipped.
/// Duplicates keep their first position. The result is computed from scratch
/// on every call.
pub fn classify_columns<'a, I>(names: I, target: &str) -> ColumnRoles
where
    I: IntoIterator<Item = &'a str>,
{
    let mut roles = ColumnRoles::default();

    for name in names {
        if name == target || is_price_column(name) {
            continue;
        }

        let bucket = if is_mean_indicator(name) {
            &mut roles.mean_indicators
        } else {
            &mut roles.indicators
        };
        if !bucket.iter().any(|existing| existing == name) {
            bucket.push(name.to_string());
        }
    }

    roles
}
