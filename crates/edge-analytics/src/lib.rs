pub mod cache;
pub mod equity;
pub mod kelly_grid;
pub mod metrics;
pub mod models;
pub mod monte_carlo;
pub mod regime;
pub mod risk_of_ruin;
pub mod variant;
pub mod walk_forward;

pub use cache::{AnalyticsCache, CachedRun};
pub use equity::{build_equity_curve, build_equity_curve_at_fraction};
pub use kelly_grid::{evaluate_fraction_grid, evaluate_fraction_grid_from_returns};
pub use metrics::compute_snapshot;
pub use models::*;
pub use monte_carlo::{bootstrap_equity, bootstrap_log_returns};
pub use regime::detect_regimes;
pub use risk_of_ruin::{simulate_ruin, simulate_ruin_for_series};
pub use variant::aggregate_variant;
pub use walk_forward::walk_forward;
