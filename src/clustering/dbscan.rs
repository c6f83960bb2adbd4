// Density-based clustering (DBSCAN).
//
// Discovers the cluster count implicitly from local density; points that
// fall in no dense region are labeled NOISE. Produces no representatives.
// The pipeline treats this strategy as diagnostic: its cluster count and
// divergence are logged, never persisted into the results table.

use anyhow::Result;
use std::collections::VecDeque;

use super::traits::{ClusterOutcome, ClusteringAlgorithm};
use super::squared_euclidean;

/// Label for points that belong to no dense region.
pub const NOISE: i32 = -1;

pub struct Dbscan {
    eps: f64,
    min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl ClusteringAlgorithm for Dbscan {
    fn name(&self) -> &'static str {
        "dbscan"
    }

    fn cluster(&self, points: &[Vec<f64>]) -> Result<ClusterOutcome> {
        let n = points.len();
        if n == 0 {
            anyhow::bail!("DBSCAN requires at least one point");
        }

        let eps_sq = self.eps * self.eps;
        let neighbors = |i: usize| -> Vec<usize> {
            (0..n)
                .filter(|&j| squared_euclidean(&points[i], &points[j]) <= eps_sq)
                .collect()
        };

        const UNVISITED: i32 = -2;
        let mut labels = vec![UNVISITED; n];
        let mut cluster = 0_i32;

        for i in 0..n {
            if labels[i] != UNVISITED {
                continue;
            }
            let seed_neighbors = neighbors(i);
            if seed_neighbors.len() < self.min_samples {
                labels[i] = NOISE;
                continue;
            }

            // Grow the cluster outward from this core point.
            labels[i] = cluster;
            let mut frontier: VecDeque<usize> = seed_neighbors.into();
            while let Some(j) = frontier.pop_front() {
                if labels[j] == NOISE {
                    // border point previously dismissed as noise
                    labels[j] = cluster;
                }
                if labels[j] != UNVISITED {
                    continue;
                }
                labels[j] = cluster;
                let next = neighbors(j);
                if next.len() >= self.min_samples {
                    frontier.extend(next);
                }
            }

            cluster += 1;
        }

        Ok(ClusterOutcome {
            labels,
            exemplars: Vec::new(),
        })
    }
}
