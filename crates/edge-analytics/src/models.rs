use serde::{Deserialize, Serialize};

use edge_core::AnalyticsError;

/// Configuration for the bootstrap Monte Carlo simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of resampled equity paths.
    pub simulations: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self { simulations: 5000 }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.simulations == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "simulations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the risk-of-ruin simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuinConfig {
    pub simulations: usize,
    /// Capital risked per trade, as a multiple of the historical per-trade return.
    pub position_fraction: f64,
    /// Capital level considered ruin (0.7 = a 30% drawdown is ruin).
    pub ruin_threshold: f64,
    /// Trade horizon per simulated path.
    pub max_trades_per_path: usize,
}

impl Default for RuinConfig {
    fn default() -> Self {
        Self {
            simulations: 5000,
            position_fraction: 0.01,
            ruin_threshold: 0.7,
            max_trades_per_path: 500,
        }
    }
}

impl RuinConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.simulations == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "simulations must be at least 1".to_string(),
            ));
        }
        if self.max_trades_per_path == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "max_trades_per_path must be at least 1".to_string(),
            ));
        }
        if !self.position_fraction.is_finite() || self.position_fraction < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "position_fraction must be non-negative, got {}",
                self.position_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.ruin_threshold) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "ruin_threshold must be in [0, 1), got {}",
                self.ruin_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for the Kelly fraction grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyGridConfig {
    /// Explicit fraction grid. `None` = 20 fractions linearly spaced over
    /// [0.005, 0.2].
    #[serde(default)]
    pub fractions: Option<Vec<f64>>,
    /// Simulations per fraction when the ruin check is enabled.
    pub simulations: usize,
    pub ruin_threshold: f64,
    /// Maximum acceptable ruin probability for the "safe" pick.
    pub ruin_probability_safety_bound: f64,
    /// Attach a ruin probability and drawdown estimate to every fraction.
    pub with_ruin_check: bool,
    pub max_trades_per_path: usize,
}

impl Default for KellyGridConfig {
    fn default() -> Self {
        Self {
            fractions: None,
            simulations: 5000,
            ruin_threshold: 0.7,
            ruin_probability_safety_bound: 0.05,
            with_ruin_check: true,
            max_trades_per_path: 500,
        }
    }
}

impl KellyGridConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if let Some(fractions) = &self.fractions {
            if fractions.is_empty() {
                return Err(AnalyticsError::InvalidParameter(
                    "fraction grid is empty".to_string(),
                ));
            }
            if fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
                return Err(AnalyticsError::InvalidParameter(
                    "fractions must be finite and non-negative".to_string(),
                ));
            }
        }
        if self.with_ruin_check {
            if self.simulations == 0 {
                return Err(AnalyticsError::InvalidParameter(
                    "simulations must be at least 1".to_string(),
                ));
            }
            if self.max_trades_per_path == 0 {
                return Err(AnalyticsError::InvalidParameter(
                    "max_trades_per_path must be at least 1".to_string(),
                ));
            }
            if !(0.0..1.0).contains(&self.ruin_threshold) {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "ruin_threshold must be in [0, 1), got {}",
                    self.ruin_threshold
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub train_ratio: f64,
    pub test_ratio: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.6,
            test_ratio: 0.4,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let valid = self.train_ratio > 0.0
            && self.test_ratio > 0.0
            && self.train_ratio + self.test_ratio <= 1.0 + 1e-9;
        if !valid {
            return Err(AnalyticsError::InvalidParameter(format!(
                "train/test ratios must be positive and sum to at most 1, got {}/{}",
                self.train_ratio, self.test_ratio
            )));
        }
        Ok(())
    }
}

/// Configuration for regime clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Rolling window length over the log-return series.
    pub window: usize,
    /// Number of regimes to fit.
    pub clusters: usize,
    /// Iteration cap for the clustering loop.
    pub max_iterations: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            window: 20,
            clusters: 2,
            max_iterations: 100,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.window < 2 {
            return Err(AnalyticsError::InvalidParameter(
                "window must be at least 2".to_string(),
            ));
        }
        if self.clusters == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "clusters must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One point on a compounded equity path (equity starts at 1.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub log_return: f64,
    pub cumulative_log: f64,
    pub equity: f64,
    /// Running maximum of equity up to and including this point.
    pub peak: f64,
    /// equity / peak - 1, always <= 0.
    pub drawdown: f64,
}

/// Scalar performance statistics over one closed run.
///
/// Expectancy, win rate and the Kelly fraction are computed over raw
/// fractional returns; sharpe, volatility and log growth over log returns;
/// `expectancy_r` over R-multiples. Max drawdown comes from the compounded
/// equity curve. All fields are sanitized (never NaN or infinite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub expectancy: f64,
    pub expectancy_r: f64,
    pub win_rate: f64,
    pub sharpe: f64,
    pub volatility: f64,
    pub kelly_fraction: f64,
    pub log_growth: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    /// Arithmetic mean of raw returns minus mean of log returns.
    pub volatility_drag: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
}

/// Distribution summary of the bootstrap Monte Carlo simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub simulations: usize,
    pub mean_final_return: f64,
    pub median_final_return: f64,
    pub p5_final_return: f64,
    pub p95_final_return: f64,
    pub mean_max_drawdown: f64,
    pub worst_case_drawdown: f64,
    pub p95_drawdown: f64,
}

/// Distribution summary of the risk-of-ruin simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuinSimulationSummary {
    pub simulations: usize,
    pub position_fraction: f64,
    pub ruin_threshold: f64,
    /// Fraction of paths whose capital ever fell to or below the threshold.
    pub ruin_probability: f64,
    pub mean_final_capital: f64,
    pub median_final_capital: f64,
    pub mean_max_drawdown: f64,
    pub worst_case_drawdown: f64,
}

/// One evaluated point of the Kelly fraction grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyFractionEntry {
    pub fraction: f64,
    /// mean(ln(1 + fraction * r)) over the full historical series.
    pub mean_log_growth: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruin_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_max_drawdown: Option<f64>,
}

/// Full grid sweep plus the two derived picks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyGridResult {
    pub entries: Vec<KellyFractionEntry>,
    /// Maximum mean log growth across valid fractions (empirical Kelly).
    pub growth_optimal: KellyFractionEntry,
    /// Best growth among fractions under the ruin safety bound; `None` when
    /// no fraction qualifies or the ruin check was disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe: Option<KellyFractionEntry>,
}

/// In-sample / out-of-sample statistics for one walk-forward split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSegment {
    /// Index of the first trade in the train window.
    pub start: usize,
    pub train_len: usize,
    pub test_len: usize,
    pub train_expectancy: f64,
    pub test_expectancy: f64,
    pub train_sharpe: f64,
    pub test_sharpe: f64,
}

/// Cluster centroid in (volatility, mean-return) space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeCentroid {
    pub volatility: f64,
    pub mean_return: f64,
}

/// Regime labels per rolling window plus the fitted centroids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeAssignment {
    pub window: usize,
    pub clusters: usize,
    /// One cluster label per rolling window position.
    pub labels: Vec<usize>,
    pub centroids: Vec<RegimeCentroid>,
}

/// Inferential statistics on the edge of a variant, when computable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInference {
    /// t-statistic for mean expectancy against zero.
    pub t_stat: f64,
    /// Two-sided 95% confidence interval bounds (Student-t, n-1 df).
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// One-sided probability that the true edge exceeds zero.
    pub prob_edge_positive: f64,
}

/// Cross-run aggregate over the metrics snapshots of one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantStatistics {
    pub total_runs: usize,
    pub mean_expectancy: f64,
    /// Sample standard deviation (ddof = 1); 0.0 for a single run.
    pub std_expectancy: f64,
    pub mean_sharpe: f64,
    pub std_sharpe: f64,
    pub mean_win_rate: f64,
    pub mean_volatility: f64,
    /// Minimum (most negative) max drawdown across runs.
    pub worst_max_drawdown: f64,
    /// Absent with fewer than two runs or zero expectancy variance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference: Option<EdgeInference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_contract() {
        let mc = MonteCarloConfig::default();
        assert_eq!(mc.simulations, 5000);

        let ruin = RuinConfig::default();
        assert_eq!(ruin.max_trades_per_path, 500);
        assert_eq!(ruin.position_fraction, 0.01);
        assert_eq!(ruin.ruin_threshold, 0.7);

        let grid = KellyGridConfig::default();
        assert!(grid.fractions.is_none());
        assert_eq!(grid.ruin_probability_safety_bound, 0.05);
        assert!(grid.with_ruin_check);

        let wf = WalkForwardConfig::default();
        assert_eq!(wf.train_ratio, 0.6);
        assert_eq!(wf.test_ratio, 0.4);

        let regime = RegimeConfig::default();
        assert_eq!(regime.window, 20);
        assert_eq!(regime.clusters, 2);
    }

    #[test]
    fn test_configs_reject_degenerate_values() {
        let mc = MonteCarloConfig { simulations: 0 };
        assert!(mc.validate().is_err());

        let ruin = RuinConfig {
            ruin_threshold: 1.5,
            ..RuinConfig::default()
        };
        assert!(ruin.validate().is_err());

        let grid = KellyGridConfig {
            fractions: Some(Vec::new()),
            ..KellyGridConfig::default()
        };
        assert!(grid.validate().is_err());

        let wf = WalkForwardConfig {
            train_ratio: 0.0,
            test_ratio: 0.4,
        };
        assert!(wf.validate().is_err());

        let regime = RegimeConfig {
            window: 1,
            ..RegimeConfig::default()
        };
        assert!(regime.validate().is_err());
    }

    #[test]
    fn test_results_serialize_for_the_caller() {
        // The engine hands structured results back for serialization; the
        // optional blocks must vanish from the wire when absent.
        let entry = KellyFractionEntry {
            fraction: 0.05,
            mean_log_growth: 0.002,
            ruin_probability: None,
            mean_max_drawdown: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("ruin_probability"));

        let stats = VariantStatistics {
            total_runs: 1,
            mean_expectancy: 0.01,
            std_expectancy: 0.0,
            mean_sharpe: 1.0,
            std_sharpe: 0.0,
            mean_win_rate: 0.5,
            mean_volatility: 0.02,
            worst_max_drawdown: -0.1,
            inference: None,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(!json.contains("inference"));

        let roundtrip: VariantStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.total_runs, 1);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = KellyGridConfig {
            fractions: Some(vec![0.01, 0.02]),
            ..KellyGridConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: KellyGridConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fractions.unwrap().len(), 2);
    }
}
