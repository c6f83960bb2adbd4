// Fixed-k partitional clustering (Lloyd's algorithm, k-means++ seeding).
//
// The pipeline runs two fixed configurations (k=5 and k=7) per word and
// compares their label distributions across time slices. Results must be
// reproducible run to run, so initialization draws from an RNG seeded
// with a fixed constant; identical input always yields identical labels.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::traits::{ClusterOutcome, ClusteringAlgorithm};
use super::squared_euclidean;

/// Fixed seed for the k-means++ draw.
pub const KMEANS_SEED: u64 = 0;

const MAX_ITER: usize = 300;
const TOLERANCE: f64 = 1e-6;

pub struct KMeans {
    k: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: KMEANS_SEED,
        }
    }
}

impl ClusteringAlgorithm for KMeans {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn cluster(&self, points: &[Vec<f64>]) -> Result<ClusterOutcome> {
        let n = points.len();
        if n == 0 {
            anyhow::bail!("k-means requires at least one point");
        }
        if self.k == 0 {
            anyhow::bail!("k-means requires k >= 1");
        }

        // Fewer points than clusters: clamp so every point can own a
        // cluster instead of failing the word.
        let k = self.k.min(n);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = plus_plus_init(points, k, &mut rng);
        let mut labels = vec![0_i32; n];

        for _ in 0..MAX_ITER {
            // Assignment step: nearest centroid, lowest index on ties.
            for (i, p) in points.iter().enumerate() {
                let mut best = 0;
                let mut best_dist = f64::INFINITY;
                for (c, centroid) in centroids.iter().enumerate() {
                    let d = squared_euclidean(p, centroid);
                    if d < best_dist {
                        best_dist = d;
                        best = c;
                    }
                }
                labels[i] = best as i32;
            }

            // Update step: centroids move to the mean of their members.
            let dim = points[0].len();
            let mut sums = vec![vec![0.0_f64; dim]; k];
            let mut counts = vec![0_usize; k];
            for (p, &l) in points.iter().zip(labels.iter()) {
                let c = l as usize;
                counts[c] += 1;
                for (s, v) in sums[c].iter_mut().zip(p.iter()) {
                    *s += v;
                }
            }

            let mut max_shift = 0.0_f64;
            for c in 0..k {
                if counts[c] == 0 {
                    // An emptied cluster is re-seeded on the point farthest
                    // from its current centroid, keeping all k clusters live.
                    let farthest = points
                        .iter()
                        .enumerate()
                        .max_by(|(i, p), (j, q)| {
                            let di = squared_euclidean(p, &centroids[labels[*i] as usize]);
                            let dj = squared_euclidean(q, &centroids[labels[*j] as usize]);
                            di.total_cmp(&dj)
                        })
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    let shift = squared_euclidean(&centroids[c], &points[farthest]);
                    centroids[c] = points[farthest].clone();
                    labels[farthest] = c as i32;
                    max_shift = max_shift.max(shift);
                    continue;
                }
                let mean: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
                max_shift = max_shift.max(squared_euclidean(&centroids[c], &mean));
                centroids[c] = mean;
            }

            if max_shift < TOLERANCE {
                break;
            }
        }

        Ok(ClusterOutcome {
            labels,
            exemplars: centroids,
        })
    }
}

/// k-means++ initialization: the first centroid is drawn uniformly, each
/// subsequent one proportionally to squared distance from the nearest
/// centroid chosen so far.
fn plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..n)].clone());

    let mut nearest = vec![f64::INFINITY; n];
    while centroids.len() < k {
        let newest = centroids.last().expect("at least one centroid");
        for (d, p) in nearest.iter_mut().zip(points.iter()) {
            *d = d.min(squared_euclidean(p, newest));
        }

        let total: f64 = nearest.iter().sum();
        let next = if total <= 0.0 {
            // every remaining point coincides with a centroid
            rng.random_range(0..n)
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in nearest.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        centroids.push(points[next].clone());
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::traits::ClusteringAlgorithm;
    use std::collections::HashSet;

    fn blobs(per_blob: usize) -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for i in 0..per_blob {
            let jitter = i as f64 * 0.01;
            points.push(vec![jitter, jitter]);
            points.push(vec![10.0 + jitter, 10.0 + jitter]);
        }
        points
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let points = blobs(6);
        let first = KMeans::new(5).cluster(&points).unwrap();
        let second = KMeans::new(5).cluster(&points).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.exemplars, second.exemplars);
    }

    #[test]
    fn label_count_never_exceeds_k() {
        let points = blobs(10);
        for k in [5, 7] {
            let outcome = KMeans::new(k).cluster(&points).unwrap();
            let distinct: HashSet<i32> = outcome.labels.iter().copied().collect();
            assert!(distinct.len() <= k);
        }
    }

    #[test]
    fn every_point_gets_a_valid_label() {
        let points = blobs(8);
        let outcome = KMeans::new(7).cluster(&points).unwrap();
        assert_eq!(outcome.labels.len(), points.len());
        for &l in &outcome.labels {
            assert!(l >= 0 && (l as usize) < outcome.exemplars.len(), "label {l}");
        }
    }

    #[test]
    fn k_is_clamped_to_point_count() {
        let points = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]];
        let outcome = KMeans::new(5).cluster(&points).unwrap();
        assert_eq!(outcome.exemplars.len(), 3);
        let distinct: HashSet<i32> = outcome.labels.iter().copied().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn two_clusters_separate_two_blobs() {
        let points = blobs(6);
        let outcome = KMeans::new(2).cluster(&points).unwrap();
        // even indices are one blob, odd the other
        let first_blob = outcome.labels[0];
        let second_blob = outcome.labels[1];
        assert_ne!(first_blob, second_blob);
        for (i, &l) in outcome.labels.iter().enumerate() {
            let expected = if i % 2 == 0 { first_blob } else { second_blob };
            assert_eq!(l, expected);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(KMeans::new(5).cluster(&[]).is_err());
    }
}
