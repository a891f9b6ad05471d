use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use edge_core::{AnalyticsError, ReturnSeries};

use crate::metrics::percentile_sorted;
use crate::models::{RuinConfig, RuinSimulationSummary};

/// Simulate many independent compounding paths at a fixed position
/// fraction and estimate the probability of ruin.
///
/// For each path, `max_trades_per_path` returns are drawn with replacement
/// from the historical pool and scaled by the position fraction; capital is
/// the running product of `1 + f * r`. A path counts as ruined if capital
/// falls to or below the ruin threshold at any point, not just at the end;
/// the path still runs to the full horizon so final-capital and drawdown
/// statistics cover the whole trade sequence.
///
/// The requested fraction must keep `1 + f * r` positive for every return
/// in the pool; otherwise the simulation would compound non-positive
/// capital and the call fails with `NoValidFraction` up front.
pub fn simulate_ruin(
    raw_returns: &[f64],
    config: &RuinConfig,
    seed: u64,
) -> Result<RuinSimulationSummary, AnalyticsError> {
    config.validate()?;
    if raw_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let worst = raw_returns.iter().copied().fold(f64::MAX, f64::min);
    if 1.0 + config.position_fraction * worst <= 0.0 {
        return Err(AnalyticsError::NoValidFraction);
    }

    let n = raw_returns.len();
    let fraction = config.position_fraction;
    let threshold = config.ruin_threshold;
    let horizon = config.max_trades_per_path;

    let paths: Vec<(f64, f64, bool)> = (0..config.simulations)
        .into_par_iter()
        .map(|path| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(path as u64));

            let mut capital = 1.0_f64;
            let mut peak = 1.0_f64;
            let mut max_dd = 0.0_f64;
            let mut ruined = false;

            for _ in 0..horizon {
                let r = raw_returns[rng.gen_range(0..n)];
                capital *= 1.0 + fraction * r;

                if capital > peak {
                    peak = capital;
                }
                let dd = capital / peak - 1.0;
                if dd < max_dd {
                    max_dd = dd;
                }
                if capital <= threshold {
                    ruined = true;
                }
            }

            (capital, max_dd, ruined)
        })
        .collect();

    let ruin_count = paths.iter().filter(|p| p.2).count();

    let mut final_capitals: Vec<f64> = paths.iter().map(|p| p.0).collect();
    final_capitals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let drawdowns: Vec<f64> = paths.iter().map(|p| p.1).collect();

    let summary = RuinSimulationSummary {
        simulations: config.simulations,
        position_fraction: fraction,
        ruin_threshold: threshold,
        ruin_probability: ruin_count as f64 / config.simulations as f64,
        mean_final_capital: final_capitals.iter().sum::<f64>() / final_capitals.len() as f64,
        median_final_capital: percentile_sorted(&final_capitals, 50.0),
        mean_max_drawdown: drawdowns.iter().sum::<f64>() / drawdowns.len() as f64,
        worst_case_drawdown: drawdowns.iter().copied().fold(0.0, f64::min),
    };

    debug!(
        fraction,
        ruin_probability = summary.ruin_probability,
        mean_final_capital = summary.mean_final_capital,
        "risk-of-ruin simulation complete"
    );

    Ok(summary)
}

/// Risk-of-ruin over a run's recorded raw returns.
pub fn simulate_ruin_for_series(
    series: &ReturnSeries,
    config: &RuinConfig,
    seed: u64,
) -> Result<RuinSimulationSummary, AnalyticsError> {
    simulate_ruin(&series.raw_returns(), config, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(fraction: f64) -> RuinConfig {
        RuinConfig {
            simulations: 400,
            position_fraction: fraction,
            ruin_threshold: 0.7,
            max_trades_per_path: 200,
        }
    }

    #[test]
    fn test_empty_pool_rejected() {
        let err = simulate_ruin(&[], &config(0.01), 3).unwrap_err();
        assert_eq!(err, AnalyticsError::EmptySeries);
    }

    #[test]
    fn test_wipeout_fraction_rejected() {
        // 1 + 0.5 * (-2.0) = 0: compounding would hit non-positive capital.
        let err = simulate_ruin(&[0.5, -2.0], &config(0.5), 3).unwrap_err();
        assert_eq!(err, AnalyticsError::NoValidFraction);
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let pool = [0.8, -0.6, 0.4, -0.5, 0.2];
        let summary = simulate_ruin(&pool, &config(0.8), 11).unwrap();

        assert!(summary.ruin_probability >= 0.0);
        assert!(summary.ruin_probability <= 1.0);
        assert!(summary.worst_case_drawdown <= summary.mean_max_drawdown);
    }

    #[test]
    fn test_all_winning_pool_never_ruins() {
        let pool = [0.1, 0.2, 0.05];
        let summary = simulate_ruin(&pool, &config(0.5), 17).unwrap();

        assert_relative_eq!(summary.ruin_probability, 0.0);
        assert!(summary.mean_final_capital > 1.0);
        assert_relative_eq!(summary.mean_max_drawdown, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ruin_monotone_in_fraction() {
        // Holding the pool and seed fixed, risking more per trade can only
        // make the ruin barrier easier to hit. The pool has a positive
        // arithmetic edge so the low fraction stays clear of the barrier.
        let pool = [0.5, -0.4, 0.3, -0.2];

        let low = simulate_ruin(&pool, &config(0.05), 23).unwrap();
        let mid = simulate_ruin(&pool, &config(0.4), 23).unwrap();
        let high = simulate_ruin(&pool, &config(1.0), 23).unwrap();

        assert!(low.ruin_probability <= mid.ruin_probability);
        assert!(mid.ruin_probability <= high.ruin_probability);
    }

    #[test]
    fn test_certain_ruin_for_all_loss_pool() {
        // Every draw loses 30% of risked capital at full size: capital
        // decays geometrically and must breach 0.7 within the horizon.
        let pool = [-0.3];
        let summary = simulate_ruin(&pool, &config(1.0), 29).unwrap();

        assert_relative_eq!(summary.ruin_probability, 1.0);
        assert!(summary.mean_final_capital < 0.7);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let pool = [0.4, -0.3, 0.2, -0.25];
        let a = simulate_ruin(&pool, &config(0.5), 31).unwrap();
        let b = simulate_ruin(&pool, &config(0.5), 31).unwrap();

        assert_relative_eq!(a.ruin_probability, b.ruin_probability);
        assert_relative_eq!(a.mean_final_capital, b.mean_final_capital, epsilon = 1e-15);
    }
}
