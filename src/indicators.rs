//! Indicator engine seam.
//!
//! Indicator formulas live outside this crate. An engine only has to append
//! named numeric columns to the series; [`crate::classify`] later sorts those
//! columns into roles by name.

use crate::error::Result;
use crate::types::TimeSeries;

/// Something that appends indicator columns to a series.
pub trait IndicatorEngine {
    /// Append zero or more indicator columns to `series`.
    fn append_indicators(&self, series: &mut TimeSeries) -> Result<()>;
}

impl<F> IndicatorEngine for F
where
    F: Fn(&mut TimeSeries) -> Result<()>,
{
    fn append_indicators(&self, series: &mut TimeSeries) -> Result<()> {
        self(series)
    }
}

/// Runs several engines in order.
#[derive(Default)]
pub struct IndicatorChain {
    engines: Vec<Box<dyn IndicatorEngine>>,
}

impl IndicatorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an engine to the end of the chain.
    pub fn with(mut self, engine: impl IndicatorEngine + 'static) -> Self {
        self.engines.push(Box::new(engine));
        self
    }

    /// Number of engines in the chain.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl IndicatorEngine for IndicatorChain {
    fn append_indicators(&self, series: &mut TimeSeries) -> Result<()> {
        for engine in &self.engines {
            engine.append_indicators(series)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrepError;
    use crate::types::CLOSE;
    use chrono::{TimeZone, Utc};

    fn create_series() -> TimeSeries {
        let index = (0..3)
            .map(|i| Utc.with_ymd_and_hms(2016, 1, 1 + i, 0, 0, 0).unwrap())
            .collect();
        TimeSeries::new(index)
            .with_column(CLOSE, vec![1.0, 2.0, 3.0])
            .unwrap()
    }

    fn doubled_close(series: &mut TimeSeries) -> Result<()> {
        let values = series.require_column(CLOSE)?.iter().map(|c| c * 2.0).collect();
        series.push_column("DOUBLE", values)
    }

    #[test]
    fn test_closure_engine() {
        let mut series = create_series();
        doubled_close.append_indicators(&mut series).unwrap();
        assert_eq!(series.column("DOUBLE").unwrap(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_chain_runs_in_order() {
        let chain = IndicatorChain::new().with(doubled_close).with(|s: &mut TimeSeries| -> Result<()> {
            let values = s.require_column("DOUBLE")?.iter().map(|d| d + 1.0).collect();
            s.push_column("SMA_1", values)
        });

        let mut series = create_series();
        chain.append_indicators(&mut series).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(series.column("SMA_1").unwrap(), &[3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_chain_propagates_errors() {
        let chain = IndicatorChain::new().with(|_: &mut TimeSeries| -> Result<()> {
            Err(PrepError::InvalidInput("engine failed".to_string()))
        });
        let mut series = create_series();
        assert!(chain.append_indicators(&mut series).is_err());
    }
}
