use chrono::NaiveDate;
use common::{BacktestError, ExitReason, OpenPosition, PositionState, Result, Trade};

/// Simulation account: running balance, position state and closed trades
///
/// The balance only moves when a position is closed; an open position is
/// sized from the balance but does not debit it.
#[derive(Debug)]
pub struct Account {
    balance: f64,
    state: PositionState,
    trades: Vec<Trade>,
}

impl Account {
    pub fn new(allocated_balance: f64) -> Self {
        Self {
            balance: allocated_balance,
            state: PositionState::Flat,
            trades: Vec::new(),
        }
    }

    /// Allocated balance plus all realized P&L
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Check if there's an open position
    pub fn has_position(&self) -> bool {
        !self.state.is_flat()
    }

    /// Get current position reference
    pub fn current_position(&self) -> Option<&OpenPosition> {
        self.state.position()
    }

    /// Get all closed trades
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Open a long position
    pub fn open_position(
        &mut self,
        date: NaiveDate,
        price: f64,
        close: f64,
        shares: u64,
    ) -> Result<()> {
        if self.has_position() {
            return Err(BacktestError::InvalidParameter(format!(
                "position already open, cannot enter again on {}",
                date
            )));
        }
        if shares == 0 {
            return Err(BacktestError::InvalidParameter(
                "cannot open a position with zero shares".to_string(),
            ));
        }

        self.state = PositionState::Long(OpenPosition {
            entry_date: date,
            entry_price: price,
            entry_close: close,
            shares,
        });

        Ok(())
    }

    /// Close the open position and realize its P&L
    pub fn close_position(&mut self, price: f64, date: NaiveDate, reason: ExitReason) -> Option<Trade> {
        let position = match std::mem::take(&mut self.state) {
            PositionState::Long(position) => position,
            PositionState::Flat => return None,
        };

        let trade = Trade {
            entry_date: position.entry_date,
            exit_date: date,
            entry_price: position.entry_price,
            exit_price: price,
            shares: position.shares,
            exit_reason: reason,
        };

        self.balance += trade.pnl();
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Hand back closed trades and any still-open position
    pub fn into_parts(self) -> (f64, Vec<Trade>, Option<OpenPosition>) {
        let open = match self.state {
            PositionState::Long(position) => Some(position),
            PositionState::Flat => None,
        };
        (self.balance, self.trades, open)
    }
}
