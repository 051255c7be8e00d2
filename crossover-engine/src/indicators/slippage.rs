//! Slippage adjustment (SA): a per-bar execution-cost fraction
//!
//! SA grows with the bar's proportional range and shrinks with its volume
//! relative to the trailing average volume:
//!
//! ```text
//! SA = clamp(control_bias * ((high - low) / close) / normalized_volume / 100, min, max)
//! ```
//!
//! The value is always a fraction (0.0005 == 0.05%), applied as
//! `close * (1 + SA)` on buys and `close * (1 - SA)` on sells.

use common::{Bar, ExecutionCosts};

use super::sma::rolling_mean;

/// Average volume used while the volume window is still filling
const WARMUP_AVERAGE_VOLUME: f64 = 1.0;

/// Calculate the slippage fraction for every bar
pub fn calculate_slippage(bars: &[Bar], costs: &ExecutionCosts) -> Vec<f64> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let average_volumes = rolling_mean(&volumes, costs.volume_window);

    bars.iter()
        .zip(average_volumes)
        .map(|(bar, avg)| {
            let avg = avg.unwrap_or(WARMUP_AVERAGE_VOLUME);
            let norm = normalized_volume(bar.volume, avg, costs.volume_floor);
            slippage_fraction(bar, norm, costs)
        })
        .collect()
}

/// Volume relative to its trailing average, floored at `floor`
pub fn normalized_volume(volume: f64, average_volume: f64, floor: f64) -> f64 {
    if average_volume <= 0.0 {
        return floor;
    }
    (volume / average_volume).max(floor)
}

/// Clamped slippage fraction of a single bar
pub fn slippage_fraction(bar: &Bar, normalized_volume: f64, costs: &ExecutionCosts) -> f64 {
    let proportional_range = (bar.high - bar.low) / bar.close;
    let raw = costs.control_bias * proportional_range / normalized_volume / 100.0;
    raw.clamp(costs.slippage_min, costs.slippage_max)
}
