//! K-means clustering with k-means++ seeding and seeded restarts
//!
//! Each restart `r` draws its initial centroids from `StdRng` seeded with
//! `seed + r`, runs Lloyd iterations until the assignment is stable (or the
//! iteration cap is hit), and the restart with the lowest inertia wins. Ties
//! go to the lower restart index, so results are identical across runs and
//! independent of how rayon schedules the restarts.

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use super::domain::ClusterSpec;
use super::error::{DegenerateInputError, Result};

/// Parameters of one clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub restarts: usize,
    pub seed: u64,
    pub max_iterations: usize,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            restarts: 10,
            seed: 42,
            max_iterations: 300,
        }
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Config for a domain's clustering spec with a tier-specific restart count.
    pub fn from_spec(spec: &ClusterSpec, restarts: usize) -> Self {
        Self {
            k: spec.k,
            restarts,
            seed: spec.seed,
            max_iterations: spec.max_iterations,
        }
    }
}

/// Outcome of the best restart.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// One label in `[0, k)` per input row, in input order.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
    pub iterations: usize,
    /// Index of the restart that produced this fit.
    pub restart: usize,
}

impl KMeansFit {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Inertia for one candidate cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
}

fn validate(n_rows: usize, n_cols: usize, k: usize) -> std::result::Result<(), DegenerateInputError> {
    if n_rows == 0 {
        return Err(DegenerateInputError::EmptyTier);
    }
    if n_cols == 0 {
        return Err(DegenerateInputError::NoUsableColumns);
    }
    if k == 0 {
        return Err(DegenerateInputError::ZeroClusters);
    }
    if n_rows < k {
        return Err(DegenerateInputError::TooFewRows { rows: n_rows, k });
    }
    Ok(())
}

fn rows_of(data: &Mat<f64>) -> Vec<Vec<f64>> {
    (0..data.nrows())
        .map(|i| (0..data.ncols()).map(|j| data[(i, j)]).collect())
        .collect()
}

#[inline]
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Nearest centroid and squared distance to it. Ties go to the lowest index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// Draw one more centroid with probability proportional to squared distance
/// from the closest existing centroid.
fn next_seed_center(points: &[Vec<f64>], centroids: &[Vec<f64>], rng: &mut StdRng) -> Vec<f64> {
    let distances: Vec<f64> = points.iter().map(|p| nearest(p, centroids).1).collect();
    let total: f64 = distances.iter().sum();

    if total <= 0.0 || !total.is_finite() {
        return points[rng.gen_range(0..points.len())].clone();
    }

    let threshold = rng.gen::<f64>() * total;
    let mut cumsum = 0.0;
    let mut selected = None;
    for (i, &d) in distances.iter().enumerate() {
        if d <= 0.0 {
            continue;
        }
        cumsum += d;
        selected = Some(i);
        if cumsum >= threshold {
            break;
        }
    }

    let index = selected.unwrap_or_else(|| rng.gen_range(0..points.len()));
    points[index].clone()
}

fn kmeans_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());
    while centroids.len() < k {
        let next = next_seed_center(points, &centroids, rng);
        centroids.push(next);
    }
    centroids
}

fn centroid_means(points: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let dims = points.first().map_or(0, |p| p.len());
    let mut sums = vec![vec![0.0; dims]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, x) in sums[label].iter_mut().zip(point) {
            *s += x;
        }
    }
    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            for s in sum.iter_mut() {
                *s /= count as f64;
            }
        }
    }
    sums
}

/// Give every empty cluster the point farthest from its current centroid,
/// taken from a cluster that can spare it.
fn repair_empty_clusters(labels: &mut [usize], distances: &mut [f64], k: usize) {
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = (0..labels.len())
            .filter(|&i| counts[labels[i]] > 1)
            .fold(None, |best: Option<usize>, i| match best {
                Some(b) if distances[b] >= distances[i] => Some(b),
                _ => Some(i),
            });
        if let Some(i) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
            distances[i] = 0.0;
        }
    }
}

/// Lloyd iterations from the given initial centroids. Stops once an
/// iteration reproduces the previous assignment.
fn lloyd(points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iterations: usize) -> KMeansFit {
    let k = centroids.len();
    let n = points.len();
    let mut labels = vec![usize::MAX; n];
    let mut distances = vec![0.0; n];
    let mut iterations = 0;

    for iter in 1..=max_iterations.max(1) {
        iterations = iter;
        let mut next = vec![0usize; n];
        for (i, point) in points.iter().enumerate() {
            let (c, d) = nearest(point, &centroids);
            next[i] = c;
            distances[i] = d;
        }
        repair_empty_clusters(&mut next, &mut distances, k);

        if next == labels {
            break;
        }
        labels = next;
        centroids = centroid_means(points, &labels, k);
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &label)| squared_distance(p, &centroids[label]))
        .sum();

    KMeansFit {
        labels,
        centroids,
        inertia,
        iterations,
        restart: 0,
    }
}

fn run_restart(points: &[Vec<f64>], k: usize, seed: u64, max_iterations: usize) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let initial = kmeans_plus_plus(points, k, &mut rng);
    lloyd(points, initial, max_iterations)
}

/// Lowest inertia wins; ties resolve to the earlier candidate.
fn best_of(fits: Vec<KMeansFit>) -> Option<KMeansFit> {
    fits.into_iter().fold(None, |best, fit| match best {
        Some(b) if b.inertia <= fit.inertia => Some(b),
        _ => Some(fit),
    })
}

fn fit_points(points: &[Vec<f64>], config: &KMeansConfig) -> KMeansFit {
    let restarts = config.restarts.max(1);
    let fits: Vec<KMeansFit> = (0..restarts)
        .into_par_iter()
        .map(|r| {
            let mut fit = run_restart(
                points,
                config.k,
                config.seed.wrapping_add(r as u64),
                config.max_iterations,
            );
            fit.restart = r;
            fit
        })
        .collect();

    // Non-empty because restarts >= 1
    best_of(fits).unwrap_or_else(|| run_restart(points, config.k, config.seed, config.max_iterations))
}

/// Cluster the rows of a scaled feature matrix.
///
/// Empty input, zero columns, `k = 0` and fewer rows than `k` are rejected as
/// degenerate rather than producing fewer than `k` clusters.
pub fn fit(data: &Mat<f64>, config: &KMeansConfig) -> Result<KMeansFit> {
    validate(data.nrows(), data.ncols(), config.k)?;
    let points = rows_of(data);
    Ok(fit_points(&points, config))
}

/// Inertia for `k = 1..=max_clusters` (capped at the row count).
///
/// Each `k > 1` is also warm-started from the previous best centroids plus one
/// k-means++ draw; since adding a centroid and running Lloyd steps never
/// increases inertia, the resulting curve is non-increasing in `k`.
pub fn elbow(data: &Mat<f64>, max_clusters: usize, restarts: usize, seed: u64) -> Result<Vec<ElbowPoint>> {
    validate(data.nrows(), data.ncols(), 1)?;
    let points = rows_of(data);
    let max_k = max_clusters.min(points.len());

    let mut curve = Vec::with_capacity(max_k);
    let mut previous: Option<KMeansFit> = None;

    for k in 1..=max_k {
        let config = KMeansConfig::new(k).with_restarts(restarts).with_seed(seed);
        let fresh = fit_points(&points, &config);

        let best = match previous.take() {
            Some(prev) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(k as u64));
                let mut initial = prev.centroids;
                let extra = next_seed_center(&points, &initial, &mut rng);
                initial.push(extra);
                let warm = lloyd(&points, initial, config.max_iterations);
                if warm.inertia < fresh.inertia {
                    warm
                } else {
                    fresh
                }
            }
            None => fresh,
        };

        curve.push(ElbowPoint {
            k,
            inertia: best.inertia,
        });
        previous = Some(best);
    }

    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[[f64; 2]]) -> Mat<f64> {
        let mut m = Mat::<f64>::zeros(rows.len(), 2);
        for (i, r) in rows.iter().enumerate() {
            m[(i, 0)] = r[0];
            m[(i, 1)] = r[1];
        }
        m
    }

    #[test]
    fn test_nearest_prefers_lowest_index_on_tie() {
        let centroids = vec![vec![1.0, 0.0], vec![-1.0, 0.0]];
        assert_eq!(nearest(&[0.0, 0.0], &centroids).0, 0);
    }

    #[test]
    fn test_single_cluster_centroid_is_mean() {
        let data = matrix(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let fit = fit(&data, &KMeansConfig::new(1)).unwrap();
        assert_eq!(fit.labels, vec![0, 0, 0]);
        assert!((fit.centroids[0][0] - 3.0).abs() < 1e-12);
        assert!((fit.centroids[0][1] - 4.0).abs() < 1e-12);
        // 2 * (4 + 4) + 0
        assert!((fit.inertia - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_repair_moves_farthest_point() {
        let mut labels = vec![0, 0, 0];
        let mut distances = vec![0.5, 2.0, 1.0];
        repair_empty_clusters(&mut labels, &mut distances, 2);
        assert_eq!(labels, vec![0, 1, 0]);
    }

    #[test]
    fn test_rejects_fewer_rows_than_k() {
        let data = matrix(&[[0.0, 0.0], [1.0, 1.0]]);
        let err = fit(&data, &KMeansConfig::new(3)).unwrap_err();
        assert!(err.to_string().contains("fewer than k = 3"));
    }
}
