//! End-to-end runs over hand-shaped price series

use approx::assert_relative_eq;
use crossover_engine::data::{generate_flat_bars, generate_piecewise_bars, generate_trending_bars};
use crossover_engine::{
    BacktestConfig, BacktestEngine, BacktestRun, Bar, ExecutionCosts, ExitReason, Term,
};

fn run(bars: &[Bar], config: BacktestConfig) -> BacktestRun {
    BacktestEngine::new(config).run(bars).unwrap()
}

fn spread_on(run: &BacktestRun, date: chrono::NaiveDate) -> f64 {
    run.indicators
        .rows
        .iter()
        .find(|r| r.date == date)
        .map(|r| r.spread())
        .unwrap()
}

#[test]
fn rising_leg_enters_and_stays_long() {
    // Decline so the averages start inverted, then rise strictly to the end
    let bars = generate_piecewise_bars(100.0, &[(60, -0.5), (80, 1.0)]);
    let config = BacktestConfig::new(Term::Short, true, 1000.0);

    let run = run(&bars, config);

    assert!(run.result.trades.is_empty());
    let open = run
        .open_position
        .as_ref()
        .expect("position should still be open");
    assert!(spread_on(&run, open.entry_date) >= 0.0);
    assert!(open.shares > 0);
    assert!(open.entry_price > open.entry_close);
    // Open positions are not realized
    assert_eq!(run.result.final_balance, 1000.0);
    assert_eq!(run.result.net_change_percent, 0.0);
}

#[test]
fn strictly_rising_series_starts_above_and_never_crosses() {
    let bars = generate_trending_bars(300, 50.0, 0.5);

    let run = run(&bars, BacktestConfig::new(Term::Short, true, 1000.0));

    assert!(run.indicators.rows.iter().all(|r| r.spread() > 0.0));
    assert!(run.result.trades.is_empty());
    assert!(run.open_position.is_none());
}

#[test]
fn v_then_inverted_v_closes_one_trade() {
    let bars = generate_piecewise_bars(100.0, &[(60, -1.0), (60, 1.0), (60, -1.0)]);
    let config = BacktestConfig::new(Term::Short, false, 1000.0)
        .with_costs(ExecutionCosts::frictionless());

    let run = run(&bars, config);

    assert_eq!(run.result.trades.len(), 1);
    assert!(run.open_position.is_none());

    let trade = &run.result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::CrossUnder);

    // Recompute the trade from the indicator series alone
    let rows = &run.indicators.rows;
    let entry = rows
        .windows(2)
        .find(|w| w[1].spread() >= 0.0 && w[0].spread() <= 0.0 && w[1].spread() > w[0].spread())
        .map(|w| &w[1])
        .unwrap();
    let exit = rows
        .windows(2)
        .filter(|w| w[1].date > entry.date)
        .find(|w| w[1].spread() <= 0.0 && w[0].spread() >= 0.0 && w[1].spread() < w[0].spread())
        .map(|w| &w[1])
        .unwrap();

    let buy = entry.close + 0.01;
    let shares = (1000.0 / buy).floor();
    let expected_pnl = (exit.close - buy) * shares;

    assert_eq!(trade.entry_date, entry.date);
    assert_eq!(trade.exit_date, exit.date);
    assert_eq!(trade.shares as f64, shares);
    assert_relative_eq!(trade.pnl(), expected_pnl, epsilon = 1e-9);
    assert_relative_eq!(run.result.final_balance, 1000.0 + expected_pnl, epsilon = 1e-9);

    // 15 shares bought at 63.01, sold at 77.00
    assert_eq!(trade.shares, 15);
    assert_relative_eq!(trade.entry_price, 63.01, epsilon = 1e-9);
    assert_relative_eq!(trade.exit_price, 77.0, epsilon = 1e-9);
    assert_relative_eq!(run.result.final_balance, 1209.85, epsilon = 1e-6);
    assert_eq!(run.result.statistics.winning_trades, 1);
    assert_relative_eq!(run.result.statistics.win_rate, 100.0);
}

#[test]
fn crash_hits_stop_before_averages_reverse() {
    let bars = generate_piecewise_bars(200.0, &[(70, -1.0), (30, 2.0), (1, -50.0)]);

    let guarded = run(&bars, BacktestConfig::new(Term::Short, true, 1000.0));

    assert_eq!(guarded.result.trades.len(), 1);
    let trade = &guarded.result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert_eq!(trade.exit_date, bars[bars.len() - 1].date);
    // A crossover exit was not available on the stop bar
    assert!(spread_on(&guarded, trade.exit_date) > 0.0);
    assert!(trade.pnl() < 0.0);
    assert!(guarded.result.highest_loss_percent < 0.0);
    assert_eq!(guarded.result.highest_win_percent, 0.0);

    // Without the stop the same position is still open
    let unguarded = run(&bars, BacktestConfig::new(Term::Short, false, 1000.0));
    assert!(unguarded.result.trades.is_empty());
    assert!(unguarded.open_position.is_some());
}

#[test]
fn balance_below_one_share_never_trades() {
    let bars = generate_piecewise_bars(100.0, &[(60, -1.0), (60, 1.0), (60, -1.0)]);
    let config = BacktestConfig::new(Term::Short, true, 10.0);

    let run = run(&bars, config);

    assert!(run.result.trades.is_empty());
    assert!(run.open_position.is_none());
    assert_eq!(run.result.final_balance, 10.0);
    assert_eq!(run.result.statistics.total_trades, 0);
}

#[test]
fn flat_zero_volume_series_is_quiet() {
    let bars = generate_flat_bars(300, 50.0, 0.0);

    for term in Term::all() {
        for risk_control in [false, true] {
            let run = run(&bars, BacktestConfig::new(term, risk_control, 1000.0));

            assert!(run.result.trades.is_empty());
            assert!(run.open_position.is_none());
            assert!(run.result.final_balance.is_finite());
            assert_eq!(run.result.net_change_percent, 0.0);
            assert!(run.indicators.rows.iter().all(|r| r.slippage.is_finite()));
        }
    }
}

#[test]
fn long_term_needs_two_hundred_and_one_bars() {
    let engine = BacktestEngine::new(BacktestConfig::new(Term::Long, false, 1000.0));

    assert!(engine.run(&generate_flat_bars(200, 10.0, 100.0)).is_err());

    let run = engine.run(&generate_flat_bars(201, 10.0, 100.0)).unwrap();
    assert_eq!(run.indicators.len(), 1);
    assert!(run.result.trades.is_empty());
}
