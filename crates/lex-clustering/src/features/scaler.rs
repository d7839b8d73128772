//! Per-column standardization.

use crate::types::FeatureMatrix;

/// Fitted per-column mean and population standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let n = matrix.n_rows().max(1) as f64;
        let mut means = Vec::with_capacity(matrix.n_features());
        let mut stds = Vec::with_capacity(matrix.n_features());

        for j in 0..matrix.n_features() {
            let column = matrix.column(j);
            let mean = column.iter().sum::<f64>() / n;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            means.push(mean);
            stds.push(variance.sqrt());
        }

        Self { means, stds }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Standardize each column; zero-variance columns become all zeros.
    pub fn transform(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        let rows = matrix
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| {
                        if self.stds[j] > f64::EPSILON {
                            (v - self.means[j]) / self.stds[j]
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();

        FeatureMatrix::from_rows(matrix.feature_names().to_vec(), rows)
            .unwrap_or_else(|| matrix.clone())
    }

    pub fn fit_transform(matrix: &FeatureMatrix) -> FeatureMatrix {
        Self::fit(matrix).transform(matrix)
    }
}
