use thiserror::Error;

/// Failure modes of the analytics engine.
///
/// All of these are deterministic function-of-input failures, never
/// transient faults, so callers should not retry them. The hosting layer
/// is expected to translate `EmptySeries` and `NoValidFraction` into a
/// client-facing "not enough data" response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("No return records for run")]
    EmptySeries,

    #[error("Invalid return {value}: a trade cannot lose more than 100% of entry notional")]
    InvalidReturn { value: f64 },

    #[error("No position fraction in the grid keeps capital positive")]
    NoValidFraction,

    #[error("Degenerate statistic: {metric} has zero variance")]
    DegenerateStatistic { metric: &'static str },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
