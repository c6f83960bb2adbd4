// Sense clustering — interchangeable algorithms over pooled embeddings.
//
// Every algorithm takes the pooled occurrence vectors for one word and
// returns one integer label per vector. The analyzer splits the labels
// back into time slices and feeds them to the divergence measure.

pub mod affinity;
pub mod dbscan;
pub mod kmeans;
pub mod traits;

pub use affinity::AffinityPropagation;
pub use dbscan::{Dbscan, NOISE};
pub use kmeans::KMeans;
pub use traits::{ClusterOutcome, ClusteringAlgorithm};

/// Squared Euclidean distance, the workhorse metric for all three algorithms.
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
