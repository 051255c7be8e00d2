use common::Bar;

use super::sma::rolling_mean;

/// Calculate Average True Range as a plain rolling mean of true range
///
/// # Arguments
/// * `bars` - Price bars in chronological order
/// * `period` - ATR period (typically 14)
///
/// # Returns
/// Vector of ATR values, None until `period` true ranges are available
pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            // The first bar has no previous close; using its own close
            // reduces the true range to high - low.
            let prev_close = if i == 0 { bar.close } else { bars[i - 1].close };
            true_range(bar.high, bar.low, prev_close)
        })
        .collect();

    rolling_mean(&tr, period)
}

/// Calculate True Range for a single bar
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn bars_from_hlc(rows: &[(f64, f64, f64)]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| {
                Bar::new(start + Duration::days(i as i64), close, high, low, close, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_atr_basic() {
        let bars = bars_from_hlc(&[
            (48.7, 47.79, 48.16),
            (48.72, 48.14, 48.61),
            (48.9, 48.39, 48.75),
            (48.87, 48.37, 48.63),
            (48.82, 48.24, 48.74),
            (49.05, 48.64, 49.03),
            (49.2, 48.94, 49.07),
        ]);

        let atr = calculate_atr(&bars, 5);

        assert_eq!(atr.len(), bars.len());
        assert!(atr[..4].iter().all(|v| v.is_none()));
        for value in &atr[4..] {
            assert!(value.unwrap() > 0.0);
        }
    }

    #[test]
    fn test_first_bar_uses_high_low() {
        let bars = bars_from_hlc(&[(12.0, 10.0, 11.0), (13.0, 12.0, 12.5)]);
        let atr = calculate_atr(&bars, 2);

        // TR = [2, max(1, 2, 1)] = [2, 2]
        assert_relative_eq!(atr[1].unwrap(), 2.0);
    }

    #[test]
    fn test_true_range() {
        let tr = true_range(50.0, 48.0, 49.0);
        // TR should be max(50-48, |50-49|, |48-49|) = max(2, 1, 1) = 2
        assert_eq!(tr, 2.0);
    }

    #[test]
    fn test_true_range_gap_up() {
        // Gap up scenario
        let tr = true_range(52.0, 51.0, 48.0);
        // TR should be max(52-51, |52-48|, |51-48|) = max(1, 4, 3) = 4
        assert_eq!(tr, 4.0);
    }
}
