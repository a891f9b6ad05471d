use tracing::debug;

use edge_core::{AnalyticsError, ReturnSeries};

use crate::metrics::{expectancy, sharpe};
use crate::models::{WalkForwardConfig, WalkForwardSegment};

/// Partition the series into contiguous train/test windows and report
/// in-sample vs. out-of-sample expectancy and Sharpe per window.
///
/// Window sizes come from the configured ratios (train = floor(n * 0.6),
/// test = floor(n * 0.4) by default); each step advances by the test
/// size, so test windows never overlap. A series too short for even one
/// train+test pair yields an empty vector, not an error: walk-forward
/// is diagnostic and a run without it is still valid.
pub fn walk_forward(
    series: &ReturnSeries,
    config: &WalkForwardConfig,
) -> Result<Vec<WalkForwardSegment>, AnalyticsError> {
    config.validate()?;

    let raw = series.raw_returns();
    let log = series.log_returns();
    let n = raw.len();

    let train_len = (n as f64 * config.train_ratio).floor() as usize;
    let test_len = (n as f64 * config.test_ratio).floor() as usize;

    if train_len == 0 || test_len == 0 || train_len + test_len > n {
        debug!(n, train_len, test_len, "series too short for walk-forward");
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut start = 0;

    while start + train_len + test_len <= n {
        let train_end = start + train_len;
        let test_end = train_end + test_len;

        segments.push(WalkForwardSegment {
            start,
            train_len,
            test_len,
            train_expectancy: expectancy(&raw[start..train_end])?,
            test_expectancy: expectancy(&raw[train_end..test_end])?,
            train_sharpe: sharpe(&log[start..train_end])?,
            test_sharpe: sharpe(&log[train_end..test_end])?,
        });

        start += test_len;
    }

    Ok(segments)
}
