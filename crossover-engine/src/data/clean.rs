use std::collections::HashSet;

use common::{BacktestError, Bar, Result};
use tracing::warn;

/// De-duplicate by date (first occurrence wins), sort ascending and validate
pub fn prepare_bars(bars: &[Bar]) -> Result<Vec<Bar>> {
    let mut seen = HashSet::with_capacity(bars.len());
    let mut prepared: Vec<Bar> = bars
        .iter()
        .filter(|bar| seen.insert(bar.date))
        .cloned()
        .collect();

    let duplicates = bars.len() - prepared.len();
    if duplicates > 0 {
        warn!(duplicates, "dropped bars with duplicate dates");
    }

    prepared.sort_by_key(|bar| bar.date);

    for bar in &prepared {
        validate_bar(bar)?;
    }

    Ok(prepared)
}

/// Reject bars with non-positive prices or an inconsistent high/low range
pub fn validate_bar(bar: &Bar) -> Result<()> {
    let invalid = |reason: String| BacktestError::InvalidBar {
        date: bar.date,
        reason,
    };

    for (name, price) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ] {
        if !price.is_finite() || price <= 0.0 {
            return Err(invalid(format!("{} must be a positive price, got {}", name, price)));
        }
    }

    if !bar.volume.is_finite() || bar.volume < 0.0 {
        return Err(invalid(format!("volume must be non-negative, got {}", bar.volume)));
    }

    if bar.high < bar.low {
        return Err(invalid(format!("high {} below low {}", bar.high, bar.low)));
    }
    if bar.high < bar.open.max(bar.close) {
        return Err(invalid(format!(
            "high {} below open/close {}",
            bar.high,
            bar.open.max(bar.close)
        )));
    }
    if bar.low > bar.open.min(bar.close) {
        return Err(invalid(format!(
            "low {} above open/close {}",
            bar.low,
            bar.open.min(bar.close)
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Bar {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        Bar::new(date, close, close + 1.0, close - 1.0, close, 100.0)
    }

    #[test]
    fn test_dedup_keeps_first_and_sorts() {
        let bars = vec![bar(3, 30.0), bar(1, 10.0), bar(3, 99.0), bar(2, 20.0)];

        let prepared = prepare_bars(&bars).unwrap();

        let closes: Vec<f64> = prepared.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let mut b = bar(1, 10.0);
        b.low = 0.0;
        assert!(matches!(validate_bar(&b), Err(BacktestError::InvalidBar { .. })));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut b = bar(1, 10.0);
        b.high = 8.0;
        assert!(validate_bar(&b).is_err());
    }

    #[test]
    fn test_rejects_close_outside_range() {
        let mut b = bar(1, 10.0);
        b.close = 12.0;
        assert!(validate_bar(&b).is_err());

        let mut b = bar(1, 10.0);
        b.open = 8.5;
        assert!(validate_bar(&b).is_err());
    }

    #[test]
    fn test_rejects_negative_volume() {
        let mut b = bar(1, 10.0);
        b.volume = -1.0;
        assert!(validate_bar(&b).is_err());

        b.volume = 0.5;
        assert!(validate_bar(&b).is_ok());
    }

    #[test]
    fn test_invalid_bar_fails_whole_series() {
        let mut bad = bar(2, 10.0);
        bad.close = f64::NAN;
        assert!(prepare_bars(&[bar(1, 10.0), bad]).is_err());
    }
}
