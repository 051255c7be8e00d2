use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid bar on {date}: {reason}")]
    InvalidBar { date: NaiveDate, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid ticker: '{0}'")]
    InvalidTicker(String),

    #[error("Ticker {0} is not in the store")]
    TickerNotFound(String),

    #[error("Ticker {0} is already in the store")]
    TickerAlreadyExists(String),

    #[error("Ticker {0} has already been backtested")]
    AlreadyBacktested(String),
}

pub type Result<T> = std::result::Result<T, BacktestError>;
