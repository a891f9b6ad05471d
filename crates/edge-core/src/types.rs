use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalyticsError;

/// Identifier of one trading run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a strategy variant (a run belongs to exactly one variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub Uuid);

impl VariantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

/// One realized trade outcome.
///
/// `raw_return` is the fractional price change of the position,
/// `log_return` its natural log (ln(1 + raw_return)), and `r_multiple`
/// the outcome expressed as a multiple of the capital risked on the
/// trade. Records are immutable once part of a closed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub raw_return: f64,
    pub log_return: f64,
    pub r_multiple: f64,
    pub is_win: bool,
    pub timestamp: DateTime<Utc>,
}

impl ReturnRecord {
    /// Build a record from a realized fractional return.
    ///
    /// Rejects `1 + raw_return <= 0`: a trade cannot lose more than 100%
    /// of entry notional, and the log transform is undefined past that
    /// point. Rejection happens here, at input validation, so invalid
    /// outcomes are never silently dropped from the series.
    pub fn new(
        raw_return: f64,
        r_multiple: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, AnalyticsError> {
        if !raw_return.is_finite() || 1.0 + raw_return <= 0.0 {
            return Err(AnalyticsError::InvalidReturn { value: raw_return });
        }

        Ok(Self {
            raw_return,
            log_return: raw_return.ln_1p(),
            r_multiple,
            is_win: raw_return > 0.0,
            timestamp,
        })
    }

    /// Build a record from entry/exit fill prices.
    ///
    /// `risk_per_unit` is the per-unit price distance risked (entry to
    /// stop); it converts the price move into an R-multiple.
    pub fn from_fill(
        entry_price: f64,
        exit_price: f64,
        direction: TradeDirection,
        risk_per_unit: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, AnalyticsError> {
        if entry_price <= 0.0 || !entry_price.is_finite() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "entry_price must be positive, got {entry_price}"
            )));
        }
        if risk_per_unit <= 0.0 || !risk_per_unit.is_finite() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "risk_per_unit must be positive, got {risk_per_unit}"
            )));
        }

        let price_move = match direction {
            TradeDirection::Long => exit_price - entry_price,
            TradeDirection::Short => entry_price - exit_price,
        };

        let raw_return = price_move / entry_price;
        let r_multiple = price_move / risk_per_unit;

        Self::new(raw_return, r_multiple, timestamp)
    }
}

/// Ordered, non-empty sequence of return records for one run.
///
/// Construction sorts by timestamp and rejects the empty case, so every
/// downstream computation can assume at least one record in order.
/// A series is scoped to exactly one run and never shared across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSeries {
    records: Vec<ReturnRecord>,
}

impl ReturnSeries {
    pub fn from_records(mut records: Vec<ReturnRecord>) -> Result<Self, AnalyticsError> {
        if records.is_empty() {
            return Err(AnalyticsError::EmptySeries);
        }

        records.sort_by_key(|r| r.timestamp);
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ReturnRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; the empty case is rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn raw_returns(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.raw_return).collect()
    }

    pub fn log_returns(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.log_return).collect()
    }

    pub fn r_multiples(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.r_multiple).collect()
    }
}
