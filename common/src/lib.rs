pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, BacktestConfig, ExecutionCosts};
pub use error::{BacktestError, Result};
pub use types::*;
