use common::{Trade, TradeStatistics};

/// Aggregate figures of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub final_balance: f64,
    pub net_change_percent: f64,
    pub highest_win_percent: f64,
    pub highest_loss_percent: f64,
    pub statistics: TradeStatistics,
}

/// Reduce closed trades and the running balance into summary statistics
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn calculate(trades: &[Trade], allocated_balance: f64, final_balance: f64) -> Summary {
        let (highest_win_percent, highest_loss_percent) = Self::extreme_returns(trades);

        Summary {
            final_balance,
            net_change_percent: Self::net_change_percent(allocated_balance, final_balance),
            highest_win_percent,
            highest_loss_percent,
            statistics: Self::calculate_trade_stats(trades),
        }
    }

    pub fn net_change_percent(allocated_balance: f64, final_balance: f64) -> f64 {
        (final_balance / allocated_balance - 1.0) * 100.0
    }

    /// Best and worst per-trade return in percent, both seeded at zero:
    /// a run of only losers reports a highest win of 0 and vice versa.
    fn extreme_returns(trades: &[Trade]) -> (f64, f64) {
        trades.iter().map(Trade::return_pct).fold((0.0, 0.0), |(best, worst), pct| {
            (f64::max(best, pct), f64::min(worst, pct))
        })
    }

    /// Calculate trade statistics
    fn calculate_trade_stats(trades: &[Trade]) -> TradeStatistics {
        if trades.is_empty() {
            return TradeStatistics::default();
        }

        let winning = trades.iter().filter(|t| t.pnl() > 0.0).count() as u32;
        let losing = trades.iter().filter(|t| t.pnl() < 0.0).count() as u32;
        let total = trades.len() as u32;

        TradeStatistics {
            total_trades: total,
            winning_trades: winning,
            losing_trades: losing,
            win_rate: winning as f64 / total as f64 * 100.0,
            total_pnl: trades.iter().map(Trade::pnl).sum(),
        }
    }
}
