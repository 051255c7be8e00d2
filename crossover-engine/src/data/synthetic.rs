use chrono::{Datelike, Duration, NaiveDate, Weekday};
use common::Bar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASE_VOLUME: f64 = 1_000_000.0;

fn first_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

/// Consecutive weekdays starting on 2020-01-01
fn trading_days(count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut date = first_date();
    while days.len() < count {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(date);
        }
        date += Duration::days(1);
    }
    days
}

/// Generate a seeded random-walk daily series
pub fn generate_synthetic_bars(days: usize, initial_price: f64, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(days);

    let mut price = initial_price;
    let daily_volatility = 0.015;
    let drift = 0.0003;

    for date in trading_days(days) {
        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let daily_return = drift + daily_volatility * random_return;
        let new_price = (price * (1.0 + daily_return)).max(0.01);

        let intraday_range = price * rng.gen_range(0.005..0.03);
        let open = (price + rng.gen_range(-intraday_range / 2.0..intraday_range / 2.0)).max(0.01);
        let close = new_price;

        let high = open.max(close) + rng.gen_range(0.0..intraday_range / 2.0);
        let low = (open.min(close) - rng.gen_range(0.0..intraday_range / 2.0)).max(0.005);

        // Higher volume on volatile days
        let volume_multiplier = 1.0 + daily_return.abs() * 10.0;
        let volume = (BASE_VOLUME * volume_multiplier * rng.gen_range(0.8..1.2)).round();

        bars.push(Bar::new(date, open, high, low, close, volume));
        price = new_price;
    }

    bars
}

/// Bars with the given closes, a 1% high/low band and constant volume
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    trading_days(closes.len())
        .into_iter()
        .zip(closes)
        .map(|(date, &close)| Bar::new(date, close, close * 1.01, close * 0.99, close, BASE_VOLUME))
        .collect()
}

/// Piecewise-linear closes: each segment is (days, change per day)
pub fn generate_piecewise_bars(start_price: f64, segments: &[(usize, f64)]) -> Vec<Bar> {
    let mut closes = vec![start_price];
    for &(days, step) in segments {
        for _ in 0..days {
            let last = closes.last().copied().unwrap_or(start_price);
            closes.push(last + step);
        }
    }
    bars_from_closes(&closes)
}

/// Strictly rising closes
pub fn generate_trending_bars(days: usize, start_price: f64, daily_step: f64) -> Vec<Bar> {
    generate_piecewise_bars(start_price, &[(days.saturating_sub(1), daily_step)])
}

/// Constant price and volume
pub fn generate_flat_bars(days: usize, price: f64, volume: f64) -> Vec<Bar> {
    trading_days(days)
        .into_iter()
        .map(|date| Bar::new(date, price, price, price, price, volume))
        .collect()
}
