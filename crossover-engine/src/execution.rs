//! Fill pricing for the crossover strategy
//!
//! Buys fill at `close * (1 + SA) + fee`, sells at `close * (1 - SA)`,
//! where SA is the bar's slippage fraction. Orders are all-or-nothing:
//! there are no partial fills.

use common::ExecutionCosts;

use crate::indicators::IndicatorRow;

/// Priced buy order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyFill {
    pub price: f64,
    pub shares: u64,
}

/// Deterministic fill model
#[derive(Debug, Clone)]
pub struct ExecutionModel {
    per_share_fee: f64,
}

impl ExecutionModel {
    pub fn new(costs: &ExecutionCosts) -> Self {
        Self {
            per_share_fee: costs.per_share_fee,
        }
    }

    /// Buy price per share including slippage and fee
    pub fn buy_price(&self, row: &IndicatorRow) -> f64 {
        row.close * (1.0 + row.slippage) + self.per_share_fee
    }

    /// Sell price per share after slippage
    pub fn sell_price(&self, row: &IndicatorRow) -> f64 {
        row.close * (1.0 - row.slippage)
    }

    /// Whole shares `balance` can pay for at `price`
    pub fn affordable_shares(balance: f64, price: f64) -> u64 {
        if balance <= 0.0 || price <= 0.0 {
            return 0;
        }
        (balance / price).floor() as u64
    }

    /// Price a buy with all of `balance`; None when not even one share is affordable
    pub fn fill_buy(&self, row: &IndicatorRow, balance: f64) -> Option<BuyFill> {
        let price = self.buy_price(row);
        let shares = Self::affordable_shares(balance, price);
        (shares > 0).then_some(BuyFill { price, shares })
    }
}
