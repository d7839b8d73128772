//! Two-dimensional principal-component projection for plotting.

use crate::types::{FeatureMatrix, ProjectionPoint};
use nalgebra::DMatrix;
use tracing::warn;

const MAX_ITERATIONS: usize = 10_000;

/// Projects feature rows onto their first two principal components.
pub struct ProjectionReducer;

impl ProjectionReducer {
    /// Project every row and tag it with its cluster id.
    ///
    /// Returns `None` (and logs a warning) when there are fewer than two rows
    /// or two features, the eigen-solver does not converge, or a coordinate
    /// is not finite.
    pub fn project(data: &FeatureMatrix, labels: &[usize]) -> Option<Vec<ProjectionPoint>> {
        let n = data.n_rows();
        let d = data.n_features();

        if n < 2 || d < 2 || labels.len() != n {
            warn!(
                "Skipping projection: {} rows, {} features, {} labels",
                n,
                d,
                labels.len()
            );
            return None;
        }

        let centered = center(data.rows());
        let Some(components) = principal_axes(covariance(&centered), 2) else {
            warn!("Skipping projection: eigen-decomposition did not converge");
            return None;
        };

        let points: Vec<ProjectionPoint> = centered
            .iter()
            .zip(labels)
            .map(|(row, &cluster_id)| ProjectionPoint {
                x: dot(row, &components[0]),
                y: dot(row, &components[1]),
                cluster_id,
            })
            .collect();

        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            warn!("Skipping projection: non-finite coordinates");
            return None;
        }

        Some(points)
    }
}

fn center(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let d = rows.first().map_or(0, Vec::len);
    let means: Vec<f64> = (0..d)
        .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
        .collect();

    rows.iter()
        .map(|r| r.iter().zip(&means).map(|(v, m)| v - m).collect())
        .collect()
}

/// Sample covariance (n - 1 denominator) of already centered rows.
fn covariance(centered: &[Vec<f64>]) -> DMatrix<f64> {
    let d = centered.first().map_or(0, Vec::len);
    let denom = (centered.len().max(2) - 1) as f64;

    DMatrix::from_fn(d, d, |i, j| {
        centered.iter().map(|r| r[i] * r[j]).sum::<f64>() / denom
    })
}

/// The `count` eigenvectors of a symmetric matrix with the largest
/// eigenvalues, in descending eigenvalue order and sign-normalized.
fn principal_axes(covariance: DMatrix<f64>, count: usize) -> Option<Vec<Vec<f64>>> {
    let d = covariance.nrows();
    if covariance.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let eigen = covariance.try_symmetric_eigen(f64::EPSILON, MAX_ITERATIONS)?;

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    Some(
        order
            .into_iter()
            .take(count)
            .map(|c| oriented(eigen.eigenvectors.column(c).iter().copied().collect()))
            .collect(),
    )
}

/// Flip the sign so the largest-magnitude loading is positive.
fn oriented(mut vector: Vec<f64>) -> Vec<f64> {
    let pivot = vector
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        for x in vector.iter_mut() {
            *x = -*x;
        }
    }
    vector
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let names = (0..rows[0].len()).map(|i| format!("f{}", i)).collect();
        FeatureMatrix::from_rows(names, rows).unwrap()
    }

    #[test]
    fn test_principal_axes_order() {
        // eigenvalues 3 along (1, 1) and 1 along (1, -1)
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let axes = principal_axes(cov, 2).unwrap();
        let h = 0.5f64.sqrt();
        assert!((axes[0][0] - h).abs() < 1e-10);
        assert!((axes[0][1] - h).abs() < 1e-10);
        assert!((axes[1][0].abs() - h).abs() < 1e-10);
        assert!((axes[1][0] + axes[1][1]).abs() < 1e-10);
    }

    #[test]
    fn test_principal_axes_rejects_non_finite() {
        let cov = DMatrix::from_row_slice(2, 2, &[f64::NAN, 0.0, 0.0, 1.0]);
        assert!(principal_axes(cov, 2).is_none());
    }

    #[test]
    fn test_projection_follows_main_axis() {
        let data = matrix(vec![
            vec![1.0, 1.0, 0.0],
            vec![2.0, 2.0, 0.1],
            vec![3.0, 3.0, 0.0],
            vec![4.0, 4.0, 0.1],
        ]);
        let points = ProjectionReducer::project(&data, &[0, 0, 1, 1]).unwrap();

        assert_eq!(points.len(), 4);
        assert_eq!(points[2].cluster_id, 1);
        // first component runs along (1, 1, 0) with a positive orientation
        assert!(points[0].x < points[1].x);
        assert!(points[1].x < points[2].x);
        assert!(points[2].x < points[3].x);
        let spread_y: f64 = points.iter().map(|p| p.y.abs()).fold(0.0, f64::max);
        assert!(spread_y < 0.1);
    }

    #[test]
    fn test_projection_is_centered() {
        let data = matrix(vec![vec![0.0, 5.0], vec![2.0, 1.0], vec![4.0, 3.0]]);
        let points = ProjectionReducer::project(&data, &[0, 1, 1]).unwrap();
        let sum_x: f64 = points.iter().map(|p| p.x).sum();
        let sum_y: f64 = points.iter().map(|p| p.y).sum();
        assert!(sum_x.abs() < 1e-9);
        assert!(sum_y.abs() < 1e-9);
    }

    #[test]
    fn test_projection_needs_two_features() {
        let data = matrix(vec![vec![1.0], vec![2.0], vec![3.0]]);
        assert!(ProjectionReducer::project(&data, &[0, 0, 1]).is_none());
    }

    #[test]
    fn test_projection_needs_two_rows() {
        let data = matrix(vec![vec![1.0, 2.0]]);
        assert!(ProjectionReducer::project(&data, &[0]).is_none());
    }

    #[test]
    fn test_oriented() {
        assert_eq!(oriented(vec![0.2, -0.9]), vec![-0.2, 0.9]);
        assert_eq!(oriented(vec![0.6, 0.8]), vec![0.6, 0.8]);
    }
}
