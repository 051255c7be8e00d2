use std::time::Instant;

use common::{BacktestConfig, BacktestError, BacktestResult, Bar, OpenPosition, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::account::Account;
use crate::data::prepare_bars;
use crate::execution::ExecutionModel;
use crate::indicators::IndicatorSeries;
use crate::metrics::MetricsCalculator;
use crate::signals::{Signal, SignalGenerator};

/// Everything a run hands back to its caller
#[derive(Debug, Clone, Serialize)]
pub struct BacktestRun {
    pub result: BacktestResult,
    /// Trimmed indicator series, for charting
    pub indicators: IndicatorSeries,
    /// Position still open after the last bar; unrealized and not in the statistics
    pub open_position: Option<OpenPosition>,
}

/// SMA crossover backtest engine
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Run backtest on provided bar data
    pub fn run(&self, bars: &[Bar]) -> Result<BacktestRun> {
        let start_time = Instant::now();
        self.config.validate()?;

        let bars = prepare_bars(bars)?;
        let indicators = IndicatorSeries::calculate(&bars, &self.config)?;

        let (start_date, end_date) = match (indicators.rows.first(), indicators.rows.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => {
                return Err(BacktestError::InsufficientData {
                    required: indicators.long_window + 1,
                    actual: bars.len(),
                })
            }
        };

        info!(
            bars = bars.len(),
            simulated = indicators.len(),
            term = %self.config.term,
            risk_control = self.config.risk_control,
            allocated_balance = self.config.allocated_balance,
            "starting backtest"
        );

        let mut account = Account::new(self.config.allocated_balance);
        let signal_generator = SignalGenerator::new(&self.config);
        let execution = ExecutionModel::new(&self.config.costs);

        // Run simulation over consecutive (yesterday, today) pairs
        for pair in indicators.rows.windows(2) {
            let (yesterday, today) = (&pair[0], &pair[1]);

            match signal_generator.generate(yesterday, today, account.current_position()) {
                Some(Signal::Enter) => match execution.fill_buy(today, account.balance()) {
                    Some(fill) => {
                        account.open_position(today.date, fill.price, today.close, fill.shares)?;
                        debug!(
                            date = %today.date,
                            price = fill.price,
                            shares = fill.shares,
                            "entered long"
                        );
                    }
                    None => {
                        debug!(
                            date = %today.date,
                            balance = account.balance(),
                            "entry signal ignored: balance below one share"
                        );
                    }
                },
                Some(Signal::Exit(reason)) => {
                    let price = execution.sell_price(today);
                    if let Some(trade) = account.close_position(price, today.date, reason) {
                        debug!(
                            date = %today.date,
                            price,
                            pnl = trade.pnl(),
                            reason = %reason,
                            "exited long"
                        );
                    }
                }
                None => {}
            }
        }

        let (final_balance, trades, open_position) = account.into_parts();
        let summary = MetricsCalculator::calculate(&trades, self.config.allocated_balance, final_balance);

        info!(
            trades = trades.len(),
            final_balance = summary.final_balance,
            net_change_percent = summary.net_change_percent,
            open_position = open_position.is_some(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "backtest finished"
        );

        let result = BacktestResult {
            term: self.config.term,
            risk_control: self.config.risk_control,
            allocated_balance: self.config.allocated_balance,
            final_balance: summary.final_balance,
            net_change_percent: summary.net_change_percent,
            highest_win_percent: summary.highest_win_percent,
            highest_loss_percent: summary.highest_loss_percent,
            statistics: summary.statistics,
            trades,
            start_date,
            end_date,
        };

        Ok(BacktestRun {
            result,
            indicators,
            open_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_piecewise_bars, generate_synthetic_bars};
    use common::{ExecutionCosts, Term};

    #[test]
    fn test_backtest_runs() {
        let config = BacktestConfig::new(Term::Short, true, 10000.0);
        let engine = BacktestEngine::new(config);
        let bars = generate_synthetic_bars(600, 50.0, 42);

        let run = engine.run(&bars).unwrap();

        assert_eq!(run.result.allocated_balance, 10000.0);
        assert_eq!(run.indicators.len(), 550);
        assert_eq!(run.result.start_date, bars[50].date);
        assert_eq!(run.result.end_date, bars[599].date);
        assert!(run.result.trades.windows(2).all(|w| w[0].exit_date < w[1].entry_date));
    }

    #[test]
    fn test_backtest_insufficient_data() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let bars = generate_synthetic_bars(150, 50.0, 1);

        let err = engine.run(&bars).unwrap_err();

        assert!(matches!(
            err,
            BacktestError::InsufficientData { required: 201, actual: 150 }
        ));
    }

    #[test]
    fn test_backtest_rejects_invalid_config() {
        let engine = BacktestEngine::new(BacktestConfig::default().with_balance(0.0));
        let bars = generate_synthetic_bars(300, 50.0, 1);

        assert!(matches!(engine.run(&bars), Err(BacktestError::InvalidParameter(_))));
    }

    #[test]
    fn test_backtest_rejects_invalid_bar() {
        let engine = BacktestEngine::new(BacktestConfig::new(Term::Short, false, 1000.0));
        let mut bars = generate_synthetic_bars(120, 50.0, 3);
        bars[70].low = bars[70].high + 1.0;

        assert!(matches!(engine.run(&bars), Err(BacktestError::InvalidBar { .. })));
    }

    #[test]
    fn test_unsorted_duplicated_input_matches_clean_input() {
        let config = BacktestConfig::new(Term::Short, false, 1000.0)
            .with_costs(ExecutionCosts::frictionless());
        let engine = BacktestEngine::new(config);
        let clean = generate_piecewise_bars(100.0, &[(70, -0.5), (60, 1.0), (60, -1.0)]);

        let mut messy: Vec<Bar> = clean.iter().rev().cloned().collect();
        let mut shadow = clean[80].clone();
        shadow.close = shadow.high;
        messy.push(shadow);

        let from_clean = engine.run(&clean).unwrap();
        let from_messy = engine.run(&messy).unwrap();

        // Reversed order puts the original bar first, so the shadow is dropped
        assert_eq!(from_clean.result, from_messy.result);
    }
}
