//! Runs every term / risk-control combination over several series in parallel

use common::{BacktestConfig, BacktestResult, Bar, ExecutionCosts, Term};
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::engine::BacktestEngine;

/// A named bar series to backtest
#[derive(Debug, Clone)]
pub struct NamedSeries {
    pub name: String,
    pub bars: Vec<Bar>,
}

/// Outcome of one grid cell
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub name: String,
    pub config: BacktestConfig,
    /// Error message when the run failed
    pub outcome: Result<BacktestResult, String>,
}

/// The four (term, risk_control) configurations, SHORT before LONG, off before on
pub fn grid_configs(allocated_balance: f64, costs: &ExecutionCosts) -> Vec<BacktestConfig> {
    Term::all()
        .into_iter()
        .flat_map(|term| {
            [false, true].into_iter().map(move |risk_control| {
                BacktestConfig::new(term, risk_control, allocated_balance).with_costs(costs.clone())
            })
        })
        .collect()
}

/// Backtest every series under every grid configuration.
///
/// Runs are independent and execute on the rayon pool; results come back in
/// series order, then grid order. A failing run is reported, not propagated.
pub fn run_grid(series: &[NamedSeries], allocated_balance: f64, costs: &ExecutionCosts) -> Vec<BatchOutcome> {
    let configs = grid_configs(allocated_balance, costs);
    let jobs: Vec<(&NamedSeries, &BacktestConfig)> = series
        .iter()
        .flat_map(|s| configs.iter().map(move |c| (s, c)))
        .collect();

    jobs.par_iter()
        .map(|(s, config)| {
            let outcome = BacktestEngine::new((*config).clone())
                .run(&s.bars)
                .map(|run| run.result)
                .map_err(|e| {
                    warn!(series = %s.name, term = %config.term, error = %e, "backtest failed");
                    e.to_string()
                });
            BatchOutcome {
                name: s.name.clone(),
                config: (*config).clone(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_synthetic_bars;

    #[test]
    fn test_grid_order() {
        let configs = grid_configs(1000.0, &ExecutionCosts::default());
        let keys: Vec<(Term, bool)> = configs.iter().map(|c| (c.term, c.risk_control)).collect();

        assert_eq!(
            keys,
            vec![
                (Term::Short, false),
                (Term::Short, true),
                (Term::Long, false),
                (Term::Long, true),
            ]
        );
    }

    #[test]
    fn test_run_grid_matches_sequential_runs() {
        let series = vec![
            NamedSeries {
                name: "AAA".to_string(),
                bars: generate_synthetic_bars(500, 40.0, 11),
            },
            NamedSeries {
                name: "BBB".to_string(),
                bars: generate_synthetic_bars(500, 90.0, 12),
            },
        ];
        let costs = ExecutionCosts::default();

        let outcomes = run_grid(&series, 1000.0, &costs);

        assert_eq!(outcomes.len(), 8);
        for outcome in &outcomes {
            let bars = &series.iter().find(|s| s.name == outcome.name).unwrap().bars;
            let expected = BacktestEngine::new(outcome.config.clone()).run(bars).unwrap().result;
            assert_eq!(outcome.outcome.as_ref().unwrap(), &expected);
        }
    }

    #[test]
    fn test_short_series_fails_only_long_term() {
        let series = vec![NamedSeries {
            name: "NEW".to_string(),
            bars: generate_synthetic_bars(120, 10.0, 5),
        }];

        let outcomes = run_grid(&series, 1000.0, &ExecutionCosts::default());

        for outcome in outcomes {
            match outcome.config.term {
                Term::Short => assert!(outcome.outcome.is_ok()),
                Term::Long => assert!(outcome.outcome.is_err()),
            }
        }
    }
}
