use tracing::debug;

use edge_core::{AnalyticsError, ReturnSeries};

use crate::metrics::mean;
use crate::models::{KellyFractionEntry, KellyGridConfig, KellyGridResult, RuinConfig};
use crate::risk_of_ruin::simulate_ruin;

/// Default sweep: 20 fractions linearly spaced over [0.005, 0.2].
fn default_fraction_grid() -> Vec<f64> {
    let (lo, hi, steps) = (0.005_f64, 0.2_f64, 20usize);
    let step = (hi - lo) / (steps - 1) as f64;
    (0..steps).map(|i| lo + step * i as f64).collect()
}

/// Sweep a grid of position fractions and pick the growth-optimal and
/// ruin-constrained sizes.
///
/// For each candidate fraction f the mean log growth `mean(ln(1 + f*r))`
/// is computed directly over the full historical series, an empirical
/// estimate in contrast to the resampled ruin simulation. Fractions
/// where any historical return would drive capital non-positive
/// (`1 + f*r <= 0`) are excluded from the sweep. With the ruin check
/// enabled, each surviving fraction also gets a simulated ruin
/// probability and mean max drawdown attached.
///
/// The growth-optimal pick maximizes mean log growth (the empirical Kelly
/// criterion); the safe pick maximizes it among entries whose ruin
/// probability stays under the configured bound, and is `None` when no
/// entry qualifies. If every fraction is excluded the sweep fails with
/// `NoValidFraction`.
pub fn evaluate_fraction_grid(
    series: &ReturnSeries,
    config: &KellyGridConfig,
    seed: u64,
) -> Result<KellyGridResult, AnalyticsError> {
    evaluate_fraction_grid_from_returns(&series.raw_returns(), config, seed)
}

/// Slice-level sweep, decoupled from the series type.
pub fn evaluate_fraction_grid_from_returns(
    raw_returns: &[f64],
    config: &KellyGridConfig,
    seed: u64,
) -> Result<KellyGridResult, AnalyticsError> {
    config.validate()?;
    if raw_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let grid = config
        .fractions
        .clone()
        .unwrap_or_else(default_fraction_grid);

    let worst = raw_returns.iter().copied().fold(f64::MAX, f64::min);

    let mut entries = Vec::with_capacity(grid.len());

    for (i, &fraction) in grid.iter().enumerate() {
        if 1.0 + fraction * worst <= 0.0 {
            debug!(fraction, "fraction excluded: implies non-positive capital");
            continue;
        }

        let growths: Vec<f64> = raw_returns.iter().map(|r| (fraction * r).ln_1p()).collect();
        let mean_log_growth = mean(&growths);

        let (ruin_probability, mean_max_drawdown) = if config.with_ruin_check {
            let ruin_config = RuinConfig {
                simulations: config.simulations,
                position_fraction: fraction,
                ruin_threshold: config.ruin_threshold,
                max_trades_per_path: config.max_trades_per_path,
            };
            // Each fraction draws from its own disjoint seed block.
            let fraction_seed = seed.wrapping_add((i * config.simulations) as u64);
            let summary = simulate_ruin(raw_returns, &ruin_config, fraction_seed)?;
            (
                Some(summary.ruin_probability),
                Some(summary.mean_max_drawdown),
            )
        } else {
            (None, None)
        };

        entries.push(KellyFractionEntry {
            fraction,
            mean_log_growth,
            ruin_probability,
            mean_max_drawdown,
        });
    }

    let growth_optimal = entries
        .iter()
        .max_by(|a, b| {
            a.mean_log_growth
                .partial_cmp(&b.mean_log_growth)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
        .ok_or(AnalyticsError::NoValidFraction)?;

    let safe = entries
        .iter()
        .filter(|e| {
            e.ruin_probability
                .is_some_and(|p| p < config.ruin_probability_safety_bound)
        })
        .max_by(|a, b| {
            a.mean_log_growth
                .partial_cmp(&b.mean_log_growth)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();

    debug!(
        evaluated = entries.len(),
        excluded = grid.len() - entries.len(),
        growth_optimal = growth_optimal.fraction,
        "kelly grid sweep complete"
    );

    Ok(KellyGridResult {
        entries,
        growth_optimal,
        safe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use edge_core::ReturnRecord;

    fn series(raw: &[f64]) -> ReturnSeries {
        let records = raw
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                ReturnRecord::new(r, r * 100.0, Utc.timestamp_opt(i as i64, 0).unwrap()).unwrap()
            })
            .collect();
        ReturnSeries::from_records(records).unwrap()
    }

    fn no_ruin_config(fractions: Option<Vec<f64>>) -> KellyGridConfig {
        KellyGridConfig {
            fractions,
            with_ruin_check: false,
            ..KellyGridConfig::default()
        }
    }

    #[test]
    fn test_default_grid_spans_half_percent_to_twenty() {
        let grid = default_fraction_grid();
        assert_eq!(grid.len(), 20);
        assert_relative_eq!(grid[0], 0.005, epsilon = 1e-12);
        assert_relative_eq!(grid[19], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_returns_rejected() {
        let err = evaluate_fraction_grid_from_returns(&[], &no_ruin_config(None), 1).unwrap_err();
        assert_eq!(err, AnalyticsError::EmptySeries);
    }

    #[test]
    fn test_wipeout_returns_exclude_positive_fractions() {
        // A -2.0 return makes 1 + f*r non-positive for every f >= 0.5;
        // here it kills all of [0.5, 1.0] and only f = 0 survives.
        let pool = [0.5, -2.0];
        let config = no_ruin_config(Some(vec![0.0, 0.5, 1.0]));

        let result = evaluate_fraction_grid_from_returns(&pool, &config, 1).unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_relative_eq!(result.entries[0].fraction, 0.0);
        assert_relative_eq!(result.growth_optimal.fraction, 0.0);
    }

    #[test]
    fn test_no_surviving_fraction_errors() {
        let pool = [0.5, -2.0];
        let config = no_ruin_config(Some(vec![0.5, 1.0]));

        let err = evaluate_fraction_grid_from_returns(&pool, &config, 1).unwrap_err();
        assert_eq!(err, AnalyticsError::NoValidFraction);
    }

    #[test]
    fn test_growth_optimal_matches_analytic_kelly() {
        // Even-odds coin with +0.6 / -0.3 payoffs: g(f) = 0.5 ln(1+0.6f)
        // + 0.5 ln(1-0.3f); solving g'(f) = 0 gives f* = 5/6. The dense
        // grid pick should land within one grid step of it.
        let pool = [0.6, -0.3];
        let fractions: Vec<f64> = (0..101).map(|i| i as f64 * 0.01).collect();
        let config = no_ruin_config(Some(fractions));

        let result = evaluate_fraction_grid_from_returns(&pool, &config, 1).unwrap();
        assert_relative_eq!(result.growth_optimal.fraction, 5.0 / 6.0, epsilon = 0.011);
        assert!(result.growth_optimal.mean_log_growth > 0.0);
    }

    #[test]
    fn test_mean_log_growth_is_empirical() {
        let pool = [0.1, -0.05];
        let config = no_ruin_config(Some(vec![0.5]));

        let result = evaluate_fraction_grid_from_returns(&pool, &config, 1).unwrap();
        let expected = (1.05_f64.ln() + 0.975_f64.ln()) / 2.0;
        assert_relative_eq!(
            result.entries[0].mean_log_growth,
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_safe_pick_respects_ruin_bound() {
        // Volatile negative-tilt pool: small fractions stay under the 5%
        // ruin bound, aggressive ones do not.
        let s = series(&[0.5, -0.4, 0.3, -0.2]);
        let config = KellyGridConfig {
            fractions: Some(vec![0.01, 0.05, 1.0]),
            simulations: 400,
            max_trades_per_path: 200,
            ..KellyGridConfig::default()
        };

        let result = evaluate_fraction_grid(&s, &config, 7).unwrap();
        assert_eq!(result.entries.len(), 3);
        for entry in &result.entries {
            let p = entry.ruin_probability.unwrap();
            assert!((0.0..=1.0).contains(&p));
        }

        let safe = result.safe.unwrap();
        assert!(safe.ruin_probability.unwrap() < 0.05);
        assert!(safe.fraction < 1.0);
    }

    #[test]
    fn test_safe_absent_without_ruin_check() {
        let s = series(&[0.1, -0.05, 0.08]);
        let result = evaluate_fraction_grid(&s, &no_ruin_config(None), 7).unwrap();

        assert!(result.safe.is_none());
        assert!(result.entries.iter().all(|e| e.ruin_probability.is_none()));
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let s = series(&[0.2, -0.1, 0.15, -0.12]);
        let config = KellyGridConfig {
            simulations: 200,
            max_trades_per_path: 100,
            ..KellyGridConfig::default()
        };

        let a = evaluate_fraction_grid(&s, &config, 13).unwrap();
        let b = evaluate_fraction_grid(&s, &config, 13).unwrap();

        for (ea, eb) in a.entries.iter().zip(&b.entries) {
            assert_relative_eq!(
                ea.ruin_probability.unwrap(),
                eb.ruin_probability.unwrap()
            );
        }
    }
}
