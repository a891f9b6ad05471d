use edge_core::{AnalyticsError, ReturnSeries};
use tracing::debug;

use crate::equity::build_equity_curve;
use crate::models::MetricsSnapshot;

/// Coerce a non-finite aggregate to 0.0 before it is reported.
///
/// Applied to reported statistics only; structural failures such as an
/// empty series still surface as errors.
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sorted-slice percentile with nearest-rank interpolation.
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Expectancy: win_rate * avg_win + (1 - win_rate) * avg_loss.
///
/// Wins are returns > 0, losses <= 0. A missing side contributes an
/// average of 0 rather than an undefined term. Works over any return
/// measure (raw fractional returns or R-multiples).
pub fn expectancy(returns: &[f64]) -> Result<f64, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r <= 0.0).collect();

    let win_rate = wins.len() as f64 / returns.len() as f64;
    let avg_win = if wins.is_empty() { 0.0 } else { mean(&wins) };
    let avg_loss = if losses.is_empty() { 0.0 } else { mean(&losses) };

    Ok(win_rate * avg_win + (1.0 - win_rate) * avg_loss)
}

/// Fraction of returns strictly above zero.
pub fn win_rate(returns: &[f64]) -> Result<f64, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }
    Ok(returns.iter().filter(|r| **r > 0.0).count() as f64 / returns.len() as f64)
}

/// Per-trade Sharpe-like ratio: mean / std * sqrt(n) over log returns.
///
/// Exactly 0 when the standard deviation is 0: the degenerate case
/// resolves to zero instead of propagating NaN or infinity.
pub fn sharpe(log_returns: &[f64]) -> Result<f64, AnalyticsError> {
    if log_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let std = population_std(log_returns);
    if std == 0.0 {
        return Ok(0.0);
    }

    Ok(mean(log_returns) / std * (log_returns.len() as f64).sqrt())
}

/// Population standard deviation of the log returns.
pub fn volatility(log_returns: &[f64]) -> Result<f64, AnalyticsError> {
    if log_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }
    Ok(population_std(log_returns))
}

/// Kelly fraction f* = (p*b - q) / b with b = avg_win / |avg_loss|.
///
/// Defined as 0 when there are no losses (avg_loss = 0) or no wins.
pub fn kelly_fraction(returns: &[f64]) -> Result<f64, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r <= 0.0).collect();

    if wins.is_empty() || losses.is_empty() {
        return Ok(0.0);
    }

    let avg_win = mean(&wins);
    let avg_loss = mean(&losses);
    if avg_loss == 0.0 {
        return Ok(0.0);
    }

    let p = wins.len() as f64 / returns.len() as f64;
    let q = 1.0 - p;
    let b = avg_win / avg_loss.abs();
    if b == 0.0 {
        return Ok(0.0);
    }

    Ok((p * b - q) / b)
}

/// Mean log growth: mean(ln(1 + r)) over records with r > -1.
///
/// Records at or past total loss are skipped (their logarithm is
/// undefined); 0.0 when no valid records remain.
pub fn log_growth(returns: &[f64]) -> Result<f64, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let valid: Vec<f64> = returns
        .iter()
        .copied()
        .filter(|r| *r > -1.0)
        .map(|r| r.ln_1p())
        .collect();

    if valid.is_empty() {
        return Ok(0.0);
    }

    Ok(mean(&valid))
}

/// Volatility drag: arithmetic mean of raw returns minus mean log return.
pub fn volatility_drag(raw_returns: &[f64], log_returns: &[f64]) -> Result<f64, AnalyticsError> {
    if raw_returns.is_empty() || log_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }
    Ok(mean(raw_returns) - mean(log_returns))
}

/// Max drawdown of the additive cumulative R-multiple path.
///
/// Minimum of (cumulative - running peak); 0 for a series that never
/// retraces. This is the R-multiple convention; the compounded-equity
/// convention lives on the equity curve.
pub fn max_drawdown_r(r_multiples: &[f64]) -> Result<f64, AnalyticsError> {
    if r_multiples.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let mut cumulative = 0.0_f64;
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;

    for r in r_multiples {
        cumulative += r;
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = cumulative - peak;
        if dd < max_dd {
            max_dd = dd;
        }
    }

    Ok(max_dd)
}

/// Full metrics snapshot for one closed run.
pub fn compute_snapshot(series: &ReturnSeries) -> Result<MetricsSnapshot, AnalyticsError> {
    let raw = series.raw_returns();
    let log = series.log_returns();
    let r_multiples = series.r_multiples();

    let curve = build_equity_curve(series)?;
    let max_drawdown = curve
        .iter()
        .map(|p| p.drawdown)
        .fold(0.0_f64, f64::min);
    let total_return = curve.last().map(|p| p.equity - 1.0).unwrap_or(0.0);

    let winning_trades = raw.iter().filter(|r| **r > 0.0).count();

    let snapshot = MetricsSnapshot {
        expectancy: sanitize(expectancy(&raw)?),
        expectancy_r: sanitize(expectancy(&r_multiples)?),
        win_rate: sanitize(win_rate(&raw)?),
        sharpe: sanitize(sharpe(&log)?),
        volatility: sanitize(volatility(&log)?),
        kelly_fraction: sanitize(kelly_fraction(&raw)?),
        log_growth: sanitize(log_growth(&raw)?),
        max_drawdown: sanitize(max_drawdown),
        total_return: sanitize(total_return),
        volatility_drag: sanitize(volatility_drag(&raw, &log)?),
        total_trades: series.len(),
        winning_trades,
        losing_trades: series.len() - winning_trades,
    };

    debug!(
        trades = snapshot.total_trades,
        expectancy = snapshot.expectancy,
        sharpe = snapshot.sharpe,
        "computed metrics snapshot"
    );

    Ok(snapshot)
}
