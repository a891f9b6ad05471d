use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use edge_core::RunId;

use crate::models::{
    KellyGridResult, MetricsSnapshot, MonteCarloSummary, RegimeAssignment,
    RuinSimulationSummary, WalkForwardSegment,
};

/// Latest computed analytics for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRun {
    pub metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruin: Option<RuinSimulationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kelly_grid: Option<KellyGridResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walk_forward: Option<Vec<WalkForwardSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regimes: Option<RegimeAssignment>,
    pub computed_at: DateTime<Utc>,
    stale: bool,
}

/// At-most-one fresh analytics aggregate per run.
///
/// The run-mutation collaborator calls `invalidate` whenever trades are
/// appended, edited or removed; readers treat a stale or missing entry as
/// "recompute required". The cache itself holds no lock: all analytics for
/// one run execute within a single request, so the hosting service
/// serializes writers per run and upserts by run id.
#[derive(Debug, Default)]
pub struct AnalyticsCache {
    runs: HashMap<RunId, CachedRun>,
}

impl AnalyticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh metrics snapshot for a run, replacing any previous
    /// aggregate (stale or not). Derived simulation results are cleared;
    /// they were computed against the old series.
    pub fn upsert_metrics(&mut self, run_id: RunId, metrics: MetricsSnapshot) {
        debug!(%run_id, "caching fresh metrics snapshot");
        self.runs.insert(
            run_id,
            CachedRun {
                metrics,
                monte_carlo: None,
                ruin: None,
                kelly_grid: None,
                walk_forward: None,
                regimes: None,
                computed_at: Utc::now(),
                stale: false,
            },
        );
    }

    /// Attach a derived result to a fresh entry. Returns false (and stores
    /// nothing) when the run has no fresh snapshot to attach to.
    pub fn attach_monte_carlo(&mut self, run_id: RunId, summary: MonteCarloSummary) -> bool {
        self.with_fresh(run_id, |entry| entry.monte_carlo = Some(summary))
    }

    pub fn attach_ruin(&mut self, run_id: RunId, summary: RuinSimulationSummary) -> bool {
        self.with_fresh(run_id, |entry| entry.ruin = Some(summary))
    }

    pub fn attach_kelly_grid(&mut self, run_id: RunId, result: KellyGridResult) -> bool {
        self.with_fresh(run_id, |entry| entry.kelly_grid = Some(result))
    }

    pub fn attach_walk_forward(
        &mut self,
        run_id: RunId,
        segments: Vec<WalkForwardSegment>,
    ) -> bool {
        self.with_fresh(run_id, |entry| entry.walk_forward = Some(segments))
    }

    pub fn attach_regimes(&mut self, run_id: RunId, assignment: RegimeAssignment) -> bool {
        self.with_fresh(run_id, |entry| entry.regimes = Some(assignment))
    }

    /// Fresh aggregate for a run, if one exists.
    pub fn get(&self, run_id: RunId) -> Option<&CachedRun> {
        self.runs.get(&run_id).filter(|entry| !entry.stale)
    }

    /// Mark a run's aggregate stale. Called by the run-mutation
    /// collaborator when the trade series changes.
    pub fn invalidate(&mut self, run_id: RunId) {
        if let Some(entry) = self.runs.get_mut(&run_id) {
            debug!(%run_id, "invalidating cached analytics");
            entry.stale = true;
        }
    }

    /// Whether a recompute is required (stale entry or no entry at all).
    pub fn is_stale(&self, run_id: RunId) -> bool {
        self.runs.get(&run_id).map_or(true, |entry| entry.stale)
    }

    pub fn remove(&mut self, run_id: RunId) -> Option<CachedRun> {
        self.runs.remove(&run_id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn with_fresh(&mut self, run_id: RunId, apply: impl FnOnce(&mut CachedRun)) -> bool {
        match self.runs.get_mut(&run_id) {
            Some(entry) if !entry.stale => {
                apply(entry);
                true
            }
            _ => false,
        }
    }
}
