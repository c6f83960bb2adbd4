// Clustering algorithm trait — swap-ready abstraction.
//
// Like the divergence measures, clustering is a seam: the per-word analyzer
// only needs labels and (where produced) cluster representatives, so each
// algorithm hides its iteration scheme behind this trait.

use anyhow::Result;
use std::collections::HashSet;

/// Result of clustering one pooled embedding set.
pub struct ClusterOutcome {
    /// One label per input vector, in input order. Density-based clustering
    /// uses -1 for noise; the other algorithms label every point >= 0.
    pub labels: Vec<i32>,
    /// One representative vector per cluster (exemplars for affinity
    /// propagation, centroids for k-means). Empty when the algorithm does
    /// not produce them (DBSCAN).
    pub exemplars: Vec<Vec<f64>>,
}

impl ClusterOutcome {
    /// Number of distinct labels assigned, noise included.
    pub fn cluster_count(&self) -> usize {
        self.labels.iter().collect::<HashSet<_>>().len()
    }
}

/// A clustering strategy applicable to a pooled embedding set.
pub trait ClusteringAlgorithm {
    /// Short identifier used in logs and artifact keys.
    fn name(&self) -> &'static str;

    /// Cluster the given vectors. `points` must be non-empty and all of the
    /// same dimension.
    fn cluster(&self, points: &[Vec<f64>]) -> Result<ClusterOutcome>;
}
