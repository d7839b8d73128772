//! Choosing the number of clusters from the elbow of the inertia curve.

use super::kmeans::{KMeans, KMeansOptions, farthest_point};
use crate::config::ClusteringConfig;
use crate::error::Result;
use crate::types::{FeatureMatrix, TrialRun};
use tracing::debug;

/// The chosen k together with every trial of the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct KSelection {
    pub k: usize,
    pub trials: Vec<TrialRun>,
}

/// Elbow of an inertia curve: the k after the largest second difference.
///
/// Ties go to the smallest k. Fewer than three trials yield 2.
pub fn elbow_point(trials: &[TrialRun]) -> usize {
    if trials.len() < 3 {
        return 2;
    }

    let first: Vec<f64> = trials
        .windows(2)
        .map(|w| w[1].inertia - w[0].inertia)
        .collect();
    let second: Vec<f64> = first.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best = 0;
    for (i, value) in second.iter().enumerate() {
        if *value > second[best] {
            best = i;
        }
    }
    trials[best + 1].k
}

/// Runs the k sweep and picks k by [`elbow_point`].
pub struct OptimalKSelector<'a> {
    config: &'a ClusteringConfig,
}

impl<'a> OptimalKSelector<'a> {
    pub fn new(config: &'a ClusteringConfig) -> Self {
        Self { config }
    }

    /// Candidate k values for `n` rows.
    pub fn candidates(&self, n: usize) -> Vec<usize> {
        let upper = self.config.max_clusters.min(n / 2);
        (1..=upper).filter(|&k| k < n).collect()
    }

    pub fn select(&self, data: &FeatureMatrix) -> Result<KSelection> {
        self.select_with(data, |_| Ok(()))
    }

    /// Run the sweep, calling `on_trial` after every k; an error from the
    /// callback stops the sweep.
    pub fn select_with<F>(&self, data: &FeatureMatrix, mut on_trial: F) -> Result<KSelection>
    where
        F: FnMut(&TrialRun) -> Result<()>,
    {
        let rows = data.rows();
        let n = rows.len();
        let mut trials = Vec::new();
        let mut previous: Option<Vec<Vec<f64>>> = None;

        for k in self.candidates(n) {
            let kmeans = KMeans::new(KMeansOptions {
                n_clusters: k,
                n_init: self.config.n_init,
                max_iter: self.config.max_iter,
                tolerance: self.config.tolerance,
                seed: self.config.random_seed,
            });

            let warm_start = previous.take().and_then(|mut centroids| {
                let far = farthest_point(rows, &centroids)?;
                centroids.push(rows[far].clone());
                Some(centroids)
            });

            let fit = kmeans.fit_with_init(rows, warm_start)?;
            let trial = TrialRun {
                k,
                inertia: fit.inertia,
            };
            debug!("k = {}: inertia {:.4}", k, fit.inertia);

            previous = Some(fit.centroids);
            trials.push(trial);
            on_trial(&trial)?;
        }

        let k = elbow_point(&trials).min(n / 2).max(2);
        debug!("Elbow selected k = {} from {} trials", k, trials.len());

        Ok(KSelection { k, trials })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn curve(inertias: &[f64]) -> Vec<TrialRun> {
        inertias
            .iter()
            .enumerate()
            .map(|(i, &inertia)| TrialRun { k: i + 1, inertia })
            .collect()
    }

    fn blobs(per_blob: usize) -> FeatureMatrix {
        let mut rows = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)] {
            for i in 0..per_blob {
                let jitter = i as f64 * 0.05;
                rows.push(vec![cx + jitter, cy - jitter]);
            }
        }
        FeatureMatrix::from_rows(vec!["x".into(), "y".into()], rows).unwrap()
    }

    #[test]
    fn test_elbow_point() {
        // second differences: 60, 5, 0 -> argmax 0 -> k = 2
        assert_eq!(elbow_point(&curve(&[100.0, 20.0, 0.0, -15.0, -30.0])), 2);
        // second differences: -160, 170 -> argmax 1 -> k = 3
        assert_eq!(elbow_point(&curve(&[300.0, 280.0, 100.0, 90.0])), 3);
    }

    #[test]
    fn test_elbow_point_short_curve() {
        assert_eq!(elbow_point(&curve(&[10.0, 5.0])), 2);
        assert_eq!(elbow_point(&[]), 2);
    }

    #[test]
    fn test_elbow_point_ties_take_first() {
        assert_eq!(elbow_point(&curve(&[9.0, 9.0, 9.0, 9.0])), 2);
    }

    #[test]
    fn test_candidates() {
        let config = ClusteringConfig::default();
        let selector = OptimalKSelector::new(&config);
        assert_eq!(selector.candidates(2), vec![1]);
        assert_eq!(selector.candidates(10), vec![1, 2, 3, 4, 5]);
        assert_eq!(selector.candidates(100).len(), 15);
        assert!(selector.candidates(1).is_empty());
    }

    #[test]
    fn test_sweep_inertia_non_increasing() {
        let config = ClusteringConfig::default();
        let selection = OptimalKSelector::new(&config).select(&blobs(6)).unwrap();

        assert_eq!(selection.trials.len(), 9);
        for pair in selection.trials.windows(2) {
            assert!(pair[1].inertia <= pair[0].inertia + 1e-9);
        }
        assert!(selection.k >= 2 && selection.k <= 9);
    }

    #[test]
    fn test_sweep_stops_on_callback_error() {
        let config = ClusteringConfig::default();
        let mut seen = 0;
        let result = OptimalKSelector::new(&config).select_with(&blobs(4), |_| {
            seen += 1;
            if seen == 2 {
                Err(PipelineError::Cancelled)
            } else {
                Ok(())
            }
        });
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(seen, 2);
    }
}
