//! Lloyd's k-means with greedy k-means++ seeding.

use crate::error::{PipelineError, Result};
use crate::types::ClusterAssignment;
use crate::utils::squared_distance;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Options for one k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansOptions {
    /// Number of clusters.
    pub n_clusters: usize,
    /// Seeded restarts; the lowest-inertia run is kept.
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart.
    pub max_iter: usize,
    /// Relative tolerance on the squared centroid shift.
    pub tolerance: f64,
    pub seed: u64,
}

/// Outcome of a single Lloyd run.
#[derive(Debug, Clone)]
struct LloydRun {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
}

/// k-means clustering over a row-major matrix.
#[derive(Debug, Clone)]
pub struct KMeans {
    options: KMeansOptions,
}

impl KMeans {
    pub fn new(options: KMeansOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &KMeansOptions {
        &self.options
    }

    /// Fit with `n_init` k-means++ restarts.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<ClusterAssignment> {
        self.fit_with_init(data, None)
    }

    /// Fit with the seeded restarts plus one run started from `init`.
    ///
    /// The warm-started run replaces the best seeded run only when its
    /// inertia is strictly lower.
    pub fn fit_with_init(
        &self,
        data: &[Vec<f64>],
        init: Option<Vec<Vec<f64>>>,
    ) -> Result<ClusterAssignment> {
        let k = self.options.n_clusters;
        let n = data.len();
        if k == 0 || k > n {
            return Err(PipelineError::Clustering(format!(
                "cannot form {} clusters from {} rows",
                k, n
            )));
        }
        if let Some(ref centroids) = init {
            if centroids.len() != k {
                return Err(PipelineError::Clustering(format!(
                    "warm start has {} centroids, expected {}",
                    centroids.len(),
                    k
                )));
            }
        }

        let tol = self.options.tolerance * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let mut best: Option<LloydRun> = None;

        for _ in 0..self.options.n_init.max(1) {
            let centroids = kmeans_plus_plus(data, k, &mut rng);
            let run = self.lloyd(data, centroids, tol);
            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        if let Some(centroids) = init {
            let run = self.lloyd(data, centroids, tol);
            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let best = best.ok_or_else(|| PipelineError::Clustering("no k-means run".to_string()))?;
        Ok(ClusterAssignment {
            labels: best.labels,
            centroids: best.centroids,
            inertia: best.inertia,
        })
    }

    fn lloyd(&self, data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, tol: f64) -> LloydRun {
        let k = centroids.len();
        let mut labels = vec![0; data.len()];

        for _ in 0..self.options.max_iter {
            labels = assign(data, &centroids);
            relocate_empty_clusters(data, &centroids, &mut labels, k);

            let updated = compute_centroids(data, &labels, k);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;

            if shift <= tol {
                break;
            }
        }

        let inertia = data
            .iter()
            .zip(&labels)
            .map(|(x, &l)| squared_distance(x, &centroids[l]))
            .sum();

        LloydRun {
            labels,
            centroids,
            inertia,
        }
    }
}

/// Index of the nearest centroid; ties go to the lowest index.
pub(crate) fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    data.iter()
        .map(|x| nearest_centroid(x, centroids).0)
        .collect()
}

/// Give every empty cluster the point farthest from its current centroid,
/// taken only from clusters that keep at least one other member.
fn relocate_empty_clusters(
    data: &[Vec<f64>],
    centroids: &[Vec<f64>],
    labels: &mut [usize],
    k: usize,
) {
    let mut sizes = vec![0usize; k];
    for &l in labels.iter() {
        sizes[l] += 1;
    }

    for empty in 0..k {
        if sizes[empty] > 0 {
            continue;
        }
        let farthest = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| sizes[**l] > 1)
            .map(|(i, &l)| (i, squared_distance(&data[i], &centroids[l])))
            .fold(None, |acc: Option<(usize, f64)>, (i, d)| match acc {
                Some((_, best)) if best >= d => acc,
                _ => Some((i, d)),
            });

        if let Some((i, _)) = farthest {
            sizes[labels[i]] -= 1;
            labels[i] = empty;
            sizes[empty] = 1;
        }
    }
}

fn compute_centroids(data: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let dims = data.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; k];
    let mut counts = vec![0usize; k];

    for (x, &l) in data.iter().zip(labels) {
        counts[l] += 1;
        for (s, v) in sums[l].iter_mut().zip(x) {
            *s += v;
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

/// Greedy k-means++: each new centre is the best of `2 + ln k` candidates
/// sampled proportionally to squared distance.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let n_local_trials = 2 + (k as f64).ln().floor() as usize;

    let first = rng.gen_range(0..n);
    let mut centroids = vec![data[first].clone()];
    let mut closest: Vec<f64> = data
        .iter()
        .map(|x| squared_distance(x, &data[first]))
        .collect();

    while centroids.len() < k {
        let potential: f64 = closest.iter().sum();
        let mut best: Option<(usize, f64, Vec<f64>)> = None;

        for _ in 0..n_local_trials {
            let candidate = if potential > 0.0 {
                sample_weighted(&closest, rng.r#gen::<f64>() * potential)
            } else {
                rng.gen_range(0..n)
            };

            let updated: Vec<f64> = data
                .iter()
                .zip(&closest)
                .map(|(x, &d)| d.min(squared_distance(x, &data[candidate])))
                .collect();
            let updated_potential: f64 = updated.iter().sum();

            if best
                .as_ref()
                .is_none_or(|(_, pot, _)| updated_potential < *pot)
            {
                best = Some((candidate, updated_potential, updated));
            }
        }

        if let Some((candidate, _, updated)) = best {
            centroids.push(data[candidate].clone());
            closest = updated;
        }
    }

    centroids
}

fn sample_weighted(weights: &[f64], target: f64) -> usize {
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        acc += w;
        last_positive = i;
        if target < acc {
            return i;
        }
    }
    last_positive
}

/// Mean of the per-column population variances.
pub(crate) fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let n = data.len();
    let dims = data.first().map_or(0, Vec::len);
    if n == 0 || dims == 0 {
        return 0.0;
    }

    let total: f64 = (0..dims)
        .map(|j| {
            let mean = data.iter().map(|r| r[j]).sum::<f64>() / n as f64;
            data.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n as f64
        })
        .sum();
    total / dims as f64
}

/// Row with the largest distance to its nearest centroid.
pub(crate) fn farthest_point(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> Option<usize> {
    data.iter()
        .enumerate()
        .map(|(i, x)| (i, nearest_centroid(x, centroids).1))
        .fold(None, |acc: Option<(usize, f64)>, (i, d)| match acc {
            Some((_, best)) if best >= d => acc,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}
