use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use edge_core::{AnalyticsError, ReturnSeries};

use crate::metrics::{mean, population_std};
use crate::models::{RegimeAssignment, RegimeCentroid, RegimeConfig};

/// Label market regimes by clustering rolling (volatility, mean-return)
/// windows of the log-return series.
///
/// A window of length w slides across the log returns producing one
/// feature point per position; a seeded k-means partitions the points so
/// that latent regimes (calm vs. volatile, trending vs. mean-reverting)
/// emerge without external labels. The seed fixes both the centroid
/// initialization and any empty-cluster reseeding, so identical inputs
/// give identical assignments.
pub fn detect_regimes(
    series: &ReturnSeries,
    config: &RegimeConfig,
    seed: u64,
) -> Result<RegimeAssignment, AnalyticsError> {
    config.validate()?;

    let log = series.log_returns();
    let w = config.window;
    let k = config.clusters;

    if log.len() <= w {
        return Err(AnalyticsError::InvalidParameter(format!(
            "series of {} trades has no complete window of {}",
            log.len(),
            w
        )));
    }

    let points: Vec<RegimeCentroid> = (w..log.len())
        .map(|i| {
            let window = &log[i - w..i];
            RegimeCentroid {
                volatility: population_std(window),
                mean_return: mean(window),
            }
        })
        .collect();

    if points.len() < k {
        return Err(AnalyticsError::InvalidParameter(format!(
            "{} rolling windows cannot support {} clusters",
            points.len(),
            k
        )));
    }

    let (labels, centroids) = kmeans(&points, k, config.max_iterations, seed);

    debug!(
        windows = points.len(),
        clusters = k,
        "regime clustering complete"
    );

    Ok(RegimeAssignment {
        window: w,
        clusters: k,
        labels,
        centroids,
    })
}

fn squared_distance(a: &RegimeCentroid, b: &RegimeCentroid) -> f64 {
    (a.volatility - b.volatility).powi(2) + (a.mean_return - b.mean_return).powi(2)
}

fn nearest_centroid(point: &RegimeCentroid, centroids: &[RegimeCentroid]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Lloyd's algorithm with distinct-point initialization.
///
/// An emptied cluster is reseeded to a random point rather than dropped,
/// so exactly k centroids always come back.
fn kmeans(
    points: &[RegimeCentroid],
    k: usize,
    max_iterations: usize,
    seed: u64,
) -> (Vec<usize>, Vec<RegimeCentroid>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let init = rand::seq::index::sample(&mut rng, points.len(), k);
    let mut centroids: Vec<RegimeCentroid> = init.iter().map(|i| points[i]).collect();

    let mut labels = vec![0usize; points.len()];

    for iteration in 0..max_iterations {
        let next_labels: Vec<usize> = points
            .iter()
            .map(|p| nearest_centroid(p, &centroids))
            .collect();

        let converged = iteration > 0 && next_labels == labels;
        labels = next_labels;

        for (ci, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&RegimeCentroid> = points
                .iter()
                .zip(&labels)
                .filter(|(_, l)| **l == ci)
                .map(|(p, _)| p)
                .collect();

            if members.is_empty() {
                *centroid = points[rng.gen_range(0..points.len())];
                continue;
            }

            centroid.volatility =
                members.iter().map(|m| m.volatility).sum::<f64>() / members.len() as f64;
            centroid.mean_return =
                members.iter().map(|m| m.mean_return).sum::<f64>() / members.len() as f64;
        }

        if converged {
            break;
        }
    }

    (labels, centroids)
}
