use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

/// One trading day of OHLCV data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Shares traded; fractional values are kept as given
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Moving-average horizon of the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Short,
    Long,
}

impl Term {
    /// (short window, long window) of the crossover pair
    pub fn windows(self) -> (usize, usize) {
        match self {
            Term::Short => (20, 50),
            Term::Long => (50, 200),
        }
    }

    pub fn all() -> [Term; 2] {
        [Term::Short, Term::Long]
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Short => write!(f, "short"),
            Term::Long => write!(f, "long"),
        }
    }
}

impl FromStr for Term {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Term::Short),
            "long" => Ok(Term::Long),
            other => Err(BacktestError::InvalidParameter(format!(
                "unknown term '{}', expected 'short' or 'long'",
                other
            ))),
        }
    }
}

/// Why a long position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close fell at least `atr_stop_multiple` ATRs below the entry-day close
    StopLoss,
    /// Short SMA crossed down through the long SMA
    CrossUnder,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop loss"),
            ExitReason::CrossUnder => write!(f, "cross under"),
        }
    }
}

/// An open long position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    /// Fill price including slippage and the per-share fee
    pub entry_price: f64,
    /// Unadjusted close of the entry day, the anchor of the ATR stop
    pub entry_close: f64,
    pub shares: u64,
}

impl OpenPosition {
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.shares as f64
    }
}

/// Two-state position machine: at most one position at a time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PositionState {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(pos) => Some(pos),
        }
    }
}

/// One completed round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u64,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Realized profit or loss in currency
    pub fn pnl(&self) -> f64 {
        (self.exit_price - self.entry_price) * self.shares as f64
    }

    /// Price change from entry to exit fill, in percent
    pub fn return_pct(&self) -> f64 {
        (self.exit_price - self.entry_price) / self.entry_price * 100.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

/// Trade count statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub total_pnl: f64,
}

/// Backtest result, produced once at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub term: Term,
    pub risk_control: bool,
    pub allocated_balance: f64,
    pub final_balance: f64,
    pub net_change_percent: f64,
    pub highest_win_percent: f64,
    pub highest_loss_percent: f64,
    pub statistics: TradeStatistics,
    pub trades: Vec<Trade>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BacktestResult {
    /// Net realized profit or loss in currency
    pub fn net_pnl(&self) -> f64 {
        self.final_balance - self.allocated_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_term_windows() {
        assert_eq!(Term::Short.windows(), (20, 50));
        assert_eq!(Term::Long.windows(), (50, 200));
    }

    #[test]
    fn test_term_parse() {
        assert_eq!("SHORT".parse::<Term>().unwrap(), Term::Short);
        assert_eq!(" long ".parse::<Term>().unwrap(), Term::Long);
        assert!("medium".parse::<Term>().is_err());
    }

    #[test]
    fn test_trade_pnl() {
        let trade = Trade {
            entry_date: date(2),
            exit_date: date(12),
            entry_price: 50.0,
            exit_price: 55.0,
            shares: 10,
            exit_reason: ExitReason::CrossUnder,
        };

        assert_relative_eq!(trade.pnl(), 50.0);
        assert_relative_eq!(trade.return_pct(), 10.0);
        assert_eq!(trade.holding_days(), 10);
    }

    #[test]
    fn test_losing_trade_with_fill_prices() {
        let trade = Trade {
            entry_date: date(2),
            exit_date: date(5),
            entry_price: 63.01,
            exit_price: 59.3,
            shares: 15,
            exit_reason: ExitReason::StopLoss,
        };

        assert_relative_eq!(trade.pnl(), -55.65, epsilon = 1e-9);
        assert_relative_eq!(trade.return_pct(), -3.71 / 63.01 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_position_state() {
        let mut state = PositionState::default();
        assert!(state.is_flat());
        assert!(state.position().is_none());

        state = PositionState::Long(OpenPosition {
            entry_date: date(3),
            entry_price: 20.0,
            entry_close: 19.9,
            shares: 5,
        });
        assert!(!state.is_flat());
        assert_eq!(state.position().map(|p| p.cost_basis()), Some(100.0));
    }
}
