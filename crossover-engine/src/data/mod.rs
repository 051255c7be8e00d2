pub mod clean;
pub mod loader;
pub mod synthetic;

pub use clean::{prepare_bars, validate_bar};
pub use loader::{load_csv, load_json, write_csv};
pub use synthetic::{
    bars_from_closes, generate_flat_bars, generate_piecewise_bars, generate_synthetic_bars,
    generate_trending_bars,
};

use std::path::Path;

use common::{BacktestError, Bar, Result};

/// Load bars from file, detecting format from extension
pub fn load_file(path: &Path) -> Result<Vec<Bar>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        _ => Err(BacktestError::DataLoadError(format!(
            "Unsupported file format: {}",
            ext
        ))),
    }
}
