pub mod account;
pub mod batch;
pub mod data;
pub mod engine;
pub mod execution;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod signals;
pub mod store;

pub use account::Account;
pub use batch::{grid_configs, run_grid, BatchOutcome, NamedSeries};
pub use data::{generate_synthetic_bars, load_file, prepare_bars};
pub use engine::{BacktestEngine, BacktestRun};
pub use execution::{BuyFill, ExecutionModel};
pub use indicators::{IndicatorRow, IndicatorSeries};
pub use metrics::{MetricsCalculator, Summary};
pub use signals::{Signal, SignalGenerator};
pub use store::{BacktestSummary, Portfolio, PortfolioStore, TickerRecord};

// Re-export common types
pub use common::{
    AppConfig, BacktestConfig, BacktestError, BacktestResult, Bar, ExecutionCosts, ExitReason,
    OpenPosition, PositionState, Result, Term, Trade, TradeStatistics,
};
