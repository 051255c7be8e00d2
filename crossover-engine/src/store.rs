//! On-disk session store for the portfolio and per-ticker bookkeeping
//!
//! Layout of the data directory:
//!
//! ```text
//! <data_dir>/portfolio.json   balance and initial balance
//! <data_dir>/tickerdata.json  one record per ticker
//! <data_dir>/<TICKER>.csv     daily bars of each ticker
//! ```
//!
//! Every mutating operation saves both JSON files before returning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use common::{BacktestConfig, BacktestError, BacktestResult, ExecutionCosts, Result, Term};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{load_csv, prepare_bars};
use crate::engine::{BacktestEngine, BacktestRun};

const PORTFOLIO_FILE: &str = "portfolio.json";
const TICKERS_FILE: &str = "tickerdata.json";

/// About two years of trading days
pub const MIN_HISTORY_BARS: usize = 500;
/// Share of the balance a single backtest may use, in percent
pub const ALLOCATION_PERCENT_RANGE: (f64, f64) = (5.0, 40.0);
/// Accepted initial balance when resetting with a new balance
pub const INITIAL_BALANCE_RANGE: (f64, f64) = (10_000.0, 1_000_000.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Portfolio {
    pub balance: f64,
    pub initial_balance: f64,
}

impl Portfolio {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            initial_balance,
        }
    }

    pub fn net_change_percent(&self) -> f64 {
        (self.balance / self.initial_balance - 1.0) * 100.0
    }
}

/// Stored outcome of a ticker's backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BacktestSummary {
    pub term: Term,
    pub risk_control: bool,
    pub balance_allocated: f64,
    pub final_balance: f64,
    pub net_change: f64,
    pub highest_win: f64,
    pub highest_loss: f64,
}

impl BacktestSummary {
    /// Realized P&L this backtest added to the portfolio
    pub fn net_pnl(&self) -> f64 {
        self.final_balance - self.balance_allocated
    }
}

impl From<&BacktestResult> for BacktestSummary {
    fn from(result: &BacktestResult) -> Self {
        Self {
            term: result.term,
            risk_control: result.risk_control,
            balance_allocated: result.allocated_balance,
            final_balance: result.final_balance,
            net_change: result.net_change_percent,
            highest_win: result.highest_win_percent,
            highest_loss: result.highest_loss_percent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TickerRecord {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub backtest: Option<BacktestSummary>,
}

impl TickerRecord {
    pub fn is_backtested(&self) -> bool {
        self.backtest.is_some()
    }
}

/// Upper-case a ticker symbol and reject anything that is not a plain symbol
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '^' | '=');
    if symbol.is_empty() || symbol.starts_with('.') || !symbol.chars().all(valid_char) {
        return Err(BacktestError::InvalidTicker(raw.to_string()));
    }
    Ok(symbol)
}

fn round_to_thousandths(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Portfolio and ticker bookkeeping bound to one data directory
#[derive(Debug)]
pub struct PortfolioStore {
    dir: PathBuf,
    portfolio: Portfolio,
    tickers: BTreeMap<String, TickerRecord>,
}

impl PortfolioStore {
    /// Open the store in `dir`, creating missing files with `initial_balance`
    pub fn open(dir: &Path, initial_balance: f64) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let portfolio_path = dir.join(PORTFOLIO_FILE);
        let portfolio = if portfolio_path.exists() {
            serde_json::from_str(&fs::read_to_string(&portfolio_path)?)?
        } else {
            Portfolio::new(initial_balance)
        };

        let tickers_path = dir.join(TICKERS_FILE);
        let tickers = if tickers_path.exists() {
            serde_json::from_str(&fs::read_to_string(&tickers_path)?)?
        } else {
            BTreeMap::new()
        };

        let store = Self {
            dir: dir.to_path_buf(),
            portfolio,
            tickers,
        };
        store.save()?;
        Ok(store)
    }

    /// Write portfolio and ticker records to disk
    pub fn save(&self) -> Result<()> {
        fs::write(
            self.dir.join(PORTFOLIO_FILE),
            serde_json::to_string_pretty(&self.portfolio)?,
        )?;
        fs::write(
            self.dir.join(TICKERS_FILE),
            serde_json::to_string_pretty(&self.tickers)?,
        )?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn ticker(&self, symbol: &str) -> Option<&TickerRecord> {
        normalize_symbol(symbol)
            .ok()
            .and_then(|s| self.tickers.get(&s))
    }

    /// Tickers sorted by symbol
    pub fn tickers(&self) -> impl Iterator<Item = (&String, &TickerRecord)> {
        self.tickers.iter()
    }

    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    /// Import a ticker's daily bars from `source` into the store
    pub fn add_ticker(
        &mut self,
        symbol: &str,
        source: &Path,
        company_name: Option<String>,
    ) -> Result<String> {
        let symbol = normalize_symbol(symbol)?;
        let target = self.csv_path(&symbol);
        if self.tickers.contains_key(&symbol) || target.exists() {
            return Err(BacktestError::TickerAlreadyExists(symbol));
        }

        let bars = prepare_bars(&load_csv(source)?)?;
        if bars.len() < MIN_HISTORY_BARS {
            return Err(BacktestError::InsufficientData {
                required: MIN_HISTORY_BARS,
                actual: bars.len(),
            });
        }

        fs::copy(source, &target)?;
        self.tickers.insert(
            symbol.clone(),
            TickerRecord {
                company_name,
                backtest: None,
            },
        );
        self.save()?;

        info!(ticker = %symbol, bars = bars.len(), "ticker added");
        Ok(symbol)
    }

    /// Remove a ticker, reverting its backtest P&L from the balance
    pub fn remove_ticker(&mut self, symbol: &str) -> Result<TickerRecord> {
        let symbol = normalize_symbol(symbol)?;
        let record = self
            .tickers
            .remove(&symbol)
            .ok_or_else(|| BacktestError::TickerNotFound(symbol.clone()))?;

        let previous_balance = self.portfolio.balance;
        if let Some(summary) = &record.backtest {
            self.portfolio.balance = round_to_thousandths(self.portfolio.balance - summary.net_pnl());
        }
        if let Err(e) = self.save() {
            self.portfolio.balance = previous_balance;
            self.tickers.insert(symbol, record);
            return Err(e);
        }

        // The bar file goes only once no saved record points at it
        let path = self.csv_path(&symbol);
        if path.exists() {
            fs::remove_file(path)?;
        }

        info!(ticker = %symbol, reverted = record.is_backtested(), "ticker removed");
        Ok(record)
    }

    /// Backtest a stored ticker with a share of the balance and apply the P&L
    pub fn backtest_ticker(
        &mut self,
        symbol: &str,
        allocation_percent: f64,
        term: Term,
        risk_control: bool,
        costs: &ExecutionCosts,
    ) -> Result<BacktestRun> {
        let symbol = normalize_symbol(symbol)?;
        let record = self
            .tickers
            .get(&symbol)
            .ok_or_else(|| BacktestError::TickerNotFound(symbol.clone()))?;
        if record.is_backtested() {
            return Err(BacktestError::AlreadyBacktested(symbol));
        }

        let (min, max) = ALLOCATION_PERCENT_RANGE;
        if !(min..=max).contains(&allocation_percent) {
            return Err(BacktestError::InvalidParameter(format!(
                "allocation must be between {}% and {}%, got {}%",
                min, max, allocation_percent
            )));
        }

        let allocated = self.portfolio.balance * allocation_percent / 100.0;
        let config = BacktestConfig::new(term, risk_control, allocated).with_costs(costs.clone());
        let bars = load_csv(&self.csv_path(&symbol))?;
        let run = BacktestEngine::new(config).run(&bars)?;

        self.portfolio.balance = round_to_thousandths(self.portfolio.balance + run.result.net_pnl());
        if let Some(record) = self.tickers.get_mut(&symbol) {
            record.backtest = Some(BacktestSummary::from(&run.result));
        }
        self.save()?;

        info!(
            ticker = %symbol,
            net_pnl = run.result.net_pnl(),
            balance = self.portfolio.balance,
            "ticker backtested"
        );
        Ok(run)
    }

    /// Drop all tickers and restart from the initial balance, or from `new_balance`
    pub fn reset(&mut self, new_balance: Option<f64>) -> Result<()> {
        if let Some(balance) = new_balance {
            let (min, max) = INITIAL_BALANCE_RANGE;
            if !(min..=max).contains(&balance) {
                return Err(BacktestError::InvalidParameter(format!(
                    "initial balance must be between {} and {}, got {}",
                    min, max, balance
                )));
            }
        }

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                fs::remove_file(path)?;
            }
        }
        self.tickers.clear();

        let initial = new_balance.unwrap_or(self.portfolio.initial_balance);
        self.portfolio = Portfolio::new(round_to_thousandths(initial));
        self.save()?;

        info!(balance = self.portfolio.balance, "portfolio reset");
        Ok(())
    }
}
