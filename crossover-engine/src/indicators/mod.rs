pub mod atr;
pub mod slippage;
pub mod sma;

pub use atr::{calculate_atr, true_range};
pub use slippage::{calculate_slippage, normalized_volume, slippage_fraction};
pub use sma::{calculate_sma, rolling_mean};

use chrono::NaiveDate;
use common::{BacktestConfig, BacktestError, Bar, Result};
use serde::Serialize;

/// Indicator values of one bar with full long-window history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub short_sma: f64,
    pub long_sma: f64,
    /// Present only when risk control is enabled
    pub atr: Option<f64>,
    /// Slippage fraction
    pub slippage: f64,
}

impl IndicatorRow {
    /// Short SMA minus long SMA
    pub fn spread(&self) -> f64 {
        self.short_sma - self.long_sma
    }
}

/// Indicator-augmented series with the warm-up rows removed
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSeries {
    pub short_window: usize,
    pub long_window: usize,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorSeries {
    /// Calculate all indicators over `bars` and drop the first `long_window` rows
    pub fn calculate(bars: &[Bar], config: &BacktestConfig) -> Result<Self> {
        let (short_window, long_window) = config.term.windows();
        if bars.len() < long_window + 1 {
            return Err(BacktestError::InsufficientData {
                required: long_window + 1,
                actual: bars.len(),
            });
        }

        let short_sma = calculate_sma(bars, short_window);
        let long_sma = calculate_sma(bars, long_window);
        let atr = if config.risk_control {
            calculate_atr(bars, config.costs.atr_period)
        } else {
            vec![None; bars.len()]
        };
        let slippage = calculate_slippage(bars, &config.costs);

        let mut rows = Vec::with_capacity(bars.len() - long_window);
        for i in long_window..bars.len() {
            let (Some(short), Some(long)) = (short_sma[i], long_sma[i]) else {
                return Err(BacktestError::InsufficientData {
                    required: long_window + 1,
                    actual: bars.len(),
                });
            };
            rows.push(IndicatorRow {
                date: bars[i].date,
                close: bars[i].close,
                short_sma: short,
                long_sma: long,
                atr: atr[i],
                slippage: slippage[i],
            });
        }

        Ok(Self {
            short_window,
            long_window,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bars_from_closes;
    use common::Term;

    #[test]
    fn test_trims_long_window() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let config = BacktestConfig::new(Term::Short, false, 1000.0);

        let series = IndicatorSeries::calculate(&bars, &config).unwrap();

        assert_eq!(series.len(), 30);
        assert_eq!(series.rows[0].date, bars[50].date);
        // Short SMA of a rising series leads the long SMA
        assert!(series.rows.iter().all(|r| r.spread() > 0.0));
        assert!(series.rows.iter().all(|r| r.atr.is_none()));
    }

    #[test]
    fn test_atr_only_with_risk_control() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + (i % 7) as f64).collect();
        let bars = bars_from_closes(&closes);
        let config = BacktestConfig::new(Term::Short, true, 1000.0);

        let series = IndicatorSeries::calculate(&bars, &config).unwrap();

        assert!(series.rows.iter().all(|r| r.atr.is_some()));
    }

    #[test]
    fn test_insufficient_history() {
        let bars = bars_from_closes(&vec![10.0; 50]);
        let config = BacktestConfig::new(Term::Short, false, 1000.0);

        let err = IndicatorSeries::calculate(&bars, &config).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData { required: 51, actual: 50 }
        ));
    }
}
