use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

use edge_core::AnalyticsError;

use crate::models::{EdgeInference, MetricsSnapshot, VariantStatistics};

fn sample_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1); 0.0 for a single observation.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = sample_mean(values);
    let var =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    var.sqrt()
}

fn t_cdf(x: f64, df: f64) -> f64 {
    let t = StudentsT::new(0.0, 1.0, df).unwrap();
    t.cdf(x)
}

fn t_critical(df: f64, p: f64) -> f64 {
    let t = StudentsT::new(0.0, 1.0, df).unwrap();
    t.inverse_cdf(p)
}

/// Combine the per-run metrics snapshots of one strategy variant into
/// cross-run statistics.
///
/// Means and sample standard deviations cover expectancy and Sharpe; win
/// rate and volatility are averaged and the worst max drawdown across
/// runs is kept. With at least two runs and non-degenerate expectancy
/// variance, a t-statistic against zero edge, a two-sided 95%
/// Student-t confidence interval (n - 1 df) and the one-sided
/// probability of a positive true edge are attached; otherwise the
/// inferential block is absent rather than fabricated from one sample.
pub fn aggregate_variant(
    snapshots: &[MetricsSnapshot],
) -> Result<VariantStatistics, AnalyticsError> {
    if snapshots.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let expectancies: Vec<f64> = snapshots.iter().map(|s| s.expectancy).collect();
    let sharpes: Vec<f64> = snapshots.iter().map(|s| s.sharpe).collect();
    let win_rates: Vec<f64> = snapshots.iter().map(|s| s.win_rate).collect();
    let volatilities: Vec<f64> = snapshots.iter().map(|s| s.volatility).collect();

    let n = snapshots.len();
    let mean_expectancy = sample_mean(&expectancies);
    let std_expectancy = sample_std(&expectancies);

    let worst_max_drawdown = snapshots
        .iter()
        .map(|s| s.max_drawdown)
        .fold(f64::MAX, f64::min);

    let inference = if n >= 2 && std_expectancy > 0.0 {
        let standard_error = std_expectancy / (n as f64).sqrt();
        let df = (n - 1) as f64;

        let t_stat = mean_expectancy / standard_error;
        let critical = t_critical(df, 0.975);

        Some(EdgeInference {
            t_stat,
            ci_lower: mean_expectancy - critical * standard_error,
            ci_upper: mean_expectancy + critical * standard_error,
            prob_edge_positive: 1.0 - t_cdf((0.0 - mean_expectancy) / standard_error, df),
        })
    } else {
        None
    };

    debug!(
        runs = n,
        mean_expectancy,
        has_inference = inference.is_some(),
        "aggregated variant statistics"
    );

    Ok(VariantStatistics {
        total_runs: n,
        mean_expectancy,
        std_expectancy,
        mean_sharpe: sample_mean(&sharpes),
        std_sharpe: sample_std(&sharpes),
        mean_win_rate: sample_mean(&win_rates),
        mean_volatility: sample_mean(&volatilities),
        worst_max_drawdown,
        inference,
    })
}
