use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use edge_core::{AnalyticsError, ReturnSeries};

use crate::metrics::percentile_sorted;
use crate::models::{MonteCarloConfig, MonteCarloSummary};

/// Bootstrap Monte Carlo over a run's historical log returns.
///
/// Draws `simulations` sequences of the historical length by sampling log
/// returns with replacement, compounds each into an equity path, and
/// summarizes the distribution of final return and max drawdown. Path
/// order is deliberately destroyed by the resampling; the historical
/// outcomes are treated as an i.i.d. empirical distribution.
///
/// Each simulated path gets its own generator seeded from `seed` plus the
/// path index, so results are reproducible and safe to run concurrently
/// with other runs' simulations.
pub fn bootstrap_equity(
    series: &ReturnSeries,
    config: &MonteCarloConfig,
    seed: u64,
) -> Result<MonteCarloSummary, AnalyticsError> {
    bootstrap_log_returns(&series.log_returns(), config, seed)
}

/// Slice-level bootstrap, decoupled from the series type.
pub fn bootstrap_log_returns(
    log_returns: &[f64],
    config: &MonteCarloConfig,
    seed: u64,
) -> Result<MonteCarloSummary, AnalyticsError> {
    config.validate()?;
    if log_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let n = log_returns.len();

    let paths: Vec<(f64, f64)> = (0..config.simulations)
        .into_par_iter()
        .map(|sim| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(sim as u64));

            let mut cumulative_log = 0.0_f64;
            let mut peak = f64::MIN;
            let mut max_dd = 0.0_f64;

            for _ in 0..n {
                cumulative_log += log_returns[rng.gen_range(0..n)];
                let equity = cumulative_log.exp();
                if equity > peak {
                    peak = equity;
                }
                let dd = equity / peak - 1.0;
                if dd < max_dd {
                    max_dd = dd;
                }
            }

            (cumulative_log.exp() - 1.0, max_dd)
        })
        .collect();

    let mut final_returns: Vec<f64> = paths.iter().map(|p| p.0).collect();
    let mut max_drawdowns: Vec<f64> = paths.iter().map(|p| p.1).collect();

    final_returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    max_drawdowns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean_final = final_returns.iter().sum::<f64>() / final_returns.len() as f64;
    let mean_dd = max_drawdowns.iter().sum::<f64>() / max_drawdowns.len() as f64;

    let summary = MonteCarloSummary {
        simulations: config.simulations,
        mean_final_return: mean_final,
        median_final_return: percentile_sorted(&final_returns, 50.0),
        p5_final_return: percentile_sorted(&final_returns, 5.0),
        p95_final_return: percentile_sorted(&final_returns, 95.0),
        mean_max_drawdown: mean_dd,
        worst_case_drawdown: max_drawdowns.first().copied().unwrap_or(0.0),
        p95_drawdown: percentile_sorted(&max_drawdowns, 95.0),
    };

    debug!(
        simulations = summary.simulations,
        mean_final_return = summary.mean_final_return,
        worst_case_drawdown = summary.worst_case_drawdown,
        "bootstrap simulation complete"
    );

    Ok(summary)
}
