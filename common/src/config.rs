use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};
use crate::types::Term;

/// Execution cost and indicator constants of the crossover strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionCosts {
    /// Fixed fee added to the buy price of every share
    pub per_share_fee: f64,
    /// Scales the proportional daily range into a slippage fraction
    pub control_bias: f64,
    /// Rolling window of the average volume
    pub volume_window: usize,
    /// Lower bound of the normalized volume
    pub volume_floor: f64,
    /// Clamp bounds of the slippage fraction
    pub slippage_min: f64,
    pub slippage_max: f64,
    // Risk control
    pub atr_period: usize,
    pub atr_stop_multiple: f64,
}

impl Default for ExecutionCosts {
    fn default() -> Self {
        Self {
            per_share_fee: 0.01,
            control_bias: 0.1,
            volume_window: 30,
            volume_floor: 0.001,
            // 0.05% .. 5%
            slippage_min: 0.0005,
            slippage_max: 0.05,
            atr_period: 14,
            atr_stop_multiple: 2.0,
        }
    }
}

impl ExecutionCosts {
    /// Zero slippage, fee only
    pub fn frictionless() -> Self {
        Self {
            slippage_min: 0.0,
            slippage_max: 0.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.per_share_fee >= 0.0) {
            return Err(BacktestError::InvalidParameter(format!(
                "per_share_fee must be non-negative, got {}",
                self.per_share_fee
            )));
        }
        if !(self.slippage_min >= 0.0 && self.slippage_min <= self.slippage_max && self.slippage_max < 1.0) {
            return Err(BacktestError::InvalidParameter(format!(
                "slippage bounds must satisfy 0 <= min <= max < 1, got [{}, {}]",
                self.slippage_min, self.slippage_max
            )));
        }
        if self.volume_window == 0 || self.atr_period == 0 {
            return Err(BacktestError::InvalidParameter(
                "volume_window and atr_period must be positive".to_string(),
            ));
        }
        if !(self.volume_floor > 0.0) {
            return Err(BacktestError::InvalidParameter(
                "volume_floor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration of a single backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub term: Term,
    pub risk_control: bool,
    pub allocated_balance: f64,
    #[serde(default)]
    pub costs: ExecutionCosts,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            term: Term::Long,
            risk_control: true,
            allocated_balance: 1000.0,
            costs: ExecutionCosts::default(),
        }
    }
}

impl BacktestConfig {
    pub fn new(term: Term, risk_control: bool, allocated_balance: f64) -> Self {
        Self {
            term,
            risk_control,
            allocated_balance,
            ..Default::default()
        }
    }

    pub fn with_risk_control(mut self, enabled: bool) -> Self {
        self.risk_control = enabled;
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.allocated_balance = balance;
        self
    }

    pub fn with_costs(mut self, costs: ExecutionCosts) -> Self {
        self.costs = costs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.allocated_balance.is_finite() && self.allocated_balance > 0.0) {
            return Err(BacktestError::InvalidParameter(format!(
                "allocated balance must be positive, got {}",
                self.allocated_balance
            )));
        }
        self.costs.validate()
    }
}

/// Application settings for the CLI and the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub default_initial_balance: f64,
    pub log_level: String,
    /// "pretty" or "json"
    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Data"),
            default_initial_balance: 10000.0,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file; missing keys fall back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
