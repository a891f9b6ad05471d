use edge_core::{AnalyticsError, ReturnSeries};

use crate::models::EquityPoint;

/// Compound a log-return sequence into an equity path with drawdowns.
///
/// Equity starts at 1.0; equity at step i is exp of the cumulative log
/// return through i, peak is the running maximum, and drawdown is
/// `equity / peak - 1` (always <= 0).
pub fn equity_curve_from_log_returns(
    log_returns: &[f64],
) -> Result<Vec<EquityPoint>, AnalyticsError> {
    if log_returns.is_empty() {
        return Err(AnalyticsError::EmptySeries);
    }

    let mut curve = Vec::with_capacity(log_returns.len());
    let mut cumulative_log = 0.0_f64;
    let mut peak = f64::MIN;

    for &log_return in log_returns {
        cumulative_log += log_return;
        let equity = cumulative_log.exp();
        if equity > peak {
            peak = equity;
        }

        curve.push(EquityPoint {
            log_return,
            cumulative_log,
            equity,
            peak,
            drawdown: equity / peak - 1.0,
        });
    }

    Ok(curve)
}

/// Equity path of a run's recorded log returns.
pub fn build_equity_curve(series: &ReturnSeries) -> Result<Vec<EquityPoint>, AnalyticsError> {
    equity_curve_from_log_returns(&series.log_returns())
}

/// Equity path when a fixed fraction of capital is risked per trade.
///
/// Each step compounds `ln(1 + fraction * r_multiple)`. Any step where
/// that quantity is non-positive means the fraction wipes the account,
/// which is rejected as `NoValidFraction` rather than compounded into
/// undefined capital.
pub fn build_equity_curve_at_fraction(
    series: &ReturnSeries,
    fraction: f64,
) -> Result<Vec<EquityPoint>, AnalyticsError> {
    if !fraction.is_finite() || fraction < 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "fraction must be non-negative, got {fraction}"
        )));
    }

    let r_multiples = series.r_multiples();
    if r_multiples.iter().any(|r| 1.0 + fraction * r <= 0.0) {
        return Err(AnalyticsError::NoValidFraction);
    }

    let log_returns: Vec<f64> = r_multiples
        .iter()
        .map(|r| (fraction * r).ln_1p())
        .collect();

    equity_curve_from_log_returns(&log_returns)
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

    #[test]
    fn test_equity_compounds_log_returns() {
        let s = series(&[0.10, -0.05, 0.02]);
        let curve = build_equity_curve(&s).unwrap();

        assert_eq!(curve.len(), 3);
        assert_relative_eq!(curve[0].equity, 1.10, epsilon = 1e-12);
        assert_relative_eq!(curve[1].equity, 1.10 * 0.95, epsilon = 1e-12);
        assert_relative_eq!(curve[2].equity, 1.10 * 0.95 * 1.02, epsilon = 1e-12);
    }

    #[test]
    fn test_first_peak_equals_first_equity() {
        let s = series(&[-0.10, 0.05]);
        let curve = build_equity_curve(&s).unwrap();

        assert_relative_eq!(curve[0].peak, curve[0].equity, epsilon = 1e-12);
        assert_relative_eq!(curve[0].drawdown, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drawdown_never_positive() {
        let s = series(&[0.05, -0.10, 0.20, -0.30, 0.15]);
        let curve = build_equity_curve(&s).unwrap();

        for point in &curve {
            assert!(point.drawdown <= 1e-12);
            assert!(point.equity <= point.peak + 1e-12);
        }
    }

    #[test]
    fn test_empty_log_returns_rejected() {
        let err = equity_curve_from_log_returns(&[]).unwrap_err();
        assert_eq!(err, AnalyticsError::EmptySeries);
    }

    #[test]
    fn test_fraction_curve_guards_wipeout() {
        // r_multiple of -100 at fraction 0.05 implies 1 - 5 <= 0.
        let s = series(&[0.10, -1.0 + 1e-9]);
        let err = build_equity_curve_at_fraction(&s, 0.05).unwrap_err();
        assert_eq!(err, AnalyticsError::NoValidFraction);
    }

    #[test]
    fn test_fraction_curve_compounds_r_multiples() {
        let s = series(&[0.01, -0.02]);
        // r_multiples are raw * 100 => [1, -2]; at 1% risk: 1.01 then * 0.98.
        let curve = build_equity_curve_at_fraction(&s, 0.01).unwrap();

        assert_relative_eq!(curve[0].equity, 1.01, epsilon = 1e-12);
        assert_relative_eq!(curve[1].equity, 1.01 * 0.98, epsilon = 1e-12);
    }
}
