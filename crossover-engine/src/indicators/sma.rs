use common::Bar;

/// Trailing mean over a fixed window
///
/// # Arguments
/// * `values` - Input series
/// * `period` - Window length
///
/// # Returns
/// Vector of Option<f64>, None until `period` values are available
///
/// Each window is summed on its own rather than with a running sum, so two
/// windows holding the same values always produce bit-identical means.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut means = vec![None; n];

    if n < period || period == 0 {
        return means;
    }

    for (offset, window) in values.windows(period).enumerate() {
        means[offset + period - 1] = Some(window.iter().sum::<f64>() / period as f64);
    }

    means
}

/// Simple Moving Average of closing prices
pub fn calculate_sma(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    rolling_mean(&closes, period)
}
