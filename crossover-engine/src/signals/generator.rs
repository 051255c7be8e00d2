use common::{BacktestConfig, ExitReason, OpenPosition};

use crate::indicators::IndicatorRow;

/// Trading signal emitted for a (yesterday, today) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Enter,
    Exit(ExitReason),
}

/// Short SMA moved up to or through the long SMA.
///
/// Ties count as a cross, but the spread must actually rise, so two
/// consecutive bars with equal averages are not a cross.
pub fn crossed_above(yesterday: &IndicatorRow, today: &IndicatorRow) -> bool {
    let (prev, curr) = (yesterday.spread(), today.spread());
    curr >= 0.0 && prev <= 0.0 && curr > prev
}

/// Short SMA moved down to or through the long SMA
pub fn crossed_below(yesterday: &IndicatorRow, today: &IndicatorRow) -> bool {
    let (prev, curr) = (yesterday.spread(), today.spread());
    curr <= 0.0 && prev >= 0.0 && curr < prev
}

/// Signal generator for the long-only SMA crossover strategy
pub struct SignalGenerator {
    risk_control: bool,
    atr_stop_multiple: f64,
}

impl SignalGenerator {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            risk_control: config.risk_control,
            atr_stop_multiple: config.costs.atr_stop_multiple,
        }
    }

    /// Generate the signal for today. Entries are only checked while flat,
    /// exits only while long.
    pub fn generate(
        &self,
        yesterday: &IndicatorRow,
        today: &IndicatorRow,
        position: Option<&OpenPosition>,
    ) -> Option<Signal> {
        match position {
            None => self.check_entry_signal(yesterday, today),
            Some(pos) => self.check_exit_signal(yesterday, today, pos).map(Signal::Exit),
        }
    }

    fn check_entry_signal(&self, yesterday: &IndicatorRow, today: &IndicatorRow) -> Option<Signal> {
        crossed_above(yesterday, today).then_some(Signal::Enter)
    }

    /// The stop takes precedence when both exit conditions hold
    fn check_exit_signal(
        &self,
        yesterday: &IndicatorRow,
        today: &IndicatorRow,
        position: &OpenPosition,
    ) -> Option<ExitReason> {
        if self.stop_triggered(today, position) {
            return Some(ExitReason::StopLoss);
        }
        if crossed_below(yesterday, today) {
            return Some(ExitReason::CrossUnder);
        }
        None
    }

    /// Fixed-distance stop anchored to the entry day's unadjusted close
    fn stop_triggered(&self, today: &IndicatorRow, position: &OpenPosition) -> bool {
        if !self.risk_control {
            return false;
        }
        match today.atr {
            Some(atr) => today.close <= position.entry_close - self.atr_stop_multiple * atr,
            None => false,
        }
    }
}
