//! Internal validity indices for a finished partition.

use crate::utils::euclidean_distance;

// Values at or below this are treated as zero, matching numpy's allclose.
const NEAR_ZERO: f64 = 1e-8;

/// Mean silhouette coefficient.
///
/// Points in singleton clusters score 0. Callers guarantee `2 <= k < n` and
/// that every label is below `k`.
pub(crate) fn silhouette_score(data: &[Vec<f64>], labels: &[usize], k: usize) -> f64 {
    let n = data.len();
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }

        let mut sums = vec![0.0; k];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += euclidean_distance(&data[i], &data[j]);
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 && denom.is_finite() {
            total += (b - a) / denom;
        }
    }

    total / n as f64
}

/// Davies–Bouldin index over label-derived cluster means.
///
/// Coincident centroids count as infinitely far apart. Returns 0 when every
/// intra-cluster spread or every centroid distance is zero.
pub(crate) fn davies_bouldin_index(data: &[Vec<f64>], labels: &[usize], k: usize) -> f64 {
    let dims = data.first().map_or(0, Vec::len);
    let mut centroids = vec![vec![0.0; dims]; k];
    let mut sizes = vec![0usize; k];

    for (x, &l) in data.iter().zip(labels) {
        sizes[l] += 1;
        for (c, v) in centroids[l].iter_mut().zip(x) {
            *c += v;
        }
    }
    for (c, &size) in centroids.iter_mut().zip(&sizes) {
        for v in c.iter_mut() {
            *v /= size.max(1) as f64;
        }
    }

    let mut spread = vec![0.0; k];
    for (x, &l) in data.iter().zip(labels) {
        spread[l] += euclidean_distance(x, &centroids[l]);
    }
    for (s, &size) in spread.iter_mut().zip(&sizes) {
        *s /= size.max(1) as f64;
    }

    let mut separations = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            separations.push(euclidean_distance(&centroids[i], &centroids[j]));
        }
    }

    if spread.iter().all(|s| s.abs() <= NEAR_ZERO)
        || separations.iter().all(|d| d.abs() <= NEAR_ZERO)
    {
        return 0.0;
    }

    let worst: f64 = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .map(|j| {
                    let d = euclidean_distance(&centroids[i], &centroids[j]);
                    if d == 0.0 {
                        0.0
                    } else {
                        (spread[i] + spread[j]) / d
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();

    worst / k as f64
}
