// Affinity propagation — exemplar-based clustering with a discovered
// cluster count.
//
// Message passing over a pairwise similarity matrix (negative squared
// Euclidean distance). Each point exchanges "responsibility" and
// "availability" messages until a stable set of exemplars emerges. The
// self-similarity ("preference") controls granularity: more negative
// means fewer clusters. When no preference is given, the median of the
// similarity matrix is used, which is deterministic for a given input.
//
// This is the one strategy whose cluster count is itself a drift signal,
// so the discovered count is surfaced per word by the analyzer.

use anyhow::Result;

use super::traits::{ClusterOutcome, ClusteringAlgorithm};
use super::squared_euclidean;

/// Message damping factor. Raw updates oscillate; each new message is
/// blended with the previous round at this ratio.
const DAMPING: f64 = 0.5;

/// Hard iteration cap.
const MAX_ITER: usize = 200;

/// Number of consecutive rounds the exemplar set must stay unchanged
/// before the run is declared converged.
const CONVERGENCE_ITER: usize = 15;

pub struct AffinityPropagation {
    preference: Option<f64>,
}

impl AffinityPropagation {
    pub fn new() -> Self {
        Self { preference: None }
    }

    /// Fix the self-similarity instead of deriving it from the input.
    pub fn with_preference(preference: f64) -> Self {
        Self {
            preference: Some(preference),
        }
    }
}

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusteringAlgorithm for AffinityPropagation {
    fn name(&self) -> &'static str {
        "aff_prop"
    }

    fn cluster(&self, points: &[Vec<f64>]) -> Result<ClusterOutcome> {
        let n = points.len();
        if n == 0 {
            anyhow::bail!("affinity propagation requires at least one point");
        }
        if n == 1 {
            return Ok(ClusterOutcome {
                labels: vec![0],
                exemplars: vec![points[0].clone()],
            });
        }

        // Similarity matrix, row-major: s(i,k) = -||x_i - x_k||^2.
        let mut s = vec![0.0_f64; n * n];
        for i in 0..n {
            for k in (i + 1)..n {
                let sim = -squared_euclidean(&points[i], &points[k]);
                s[i * n + k] = sim;
                s[k * n + i] = sim;
            }
        }

        let preference = self.preference.unwrap_or_else(|| median(&s));
        for k in 0..n {
            s[k * n + k] = preference;
        }

        let mut r = vec![0.0_f64; n * n];
        let mut a = vec![0.0_f64; n * n];

        let mut exemplars: Vec<usize> = Vec::new();
        let mut stable_rounds = 0;

        for _ in 0..MAX_ITER {
            // Responsibilities: r(i,k) = s(i,k) - max_{k' != k} (a(i,k') + s(i,k')).
            for i in 0..n {
                let row = i * n;
                let (best, second, best_k) = max_and_runner_up(&a[row..row + n], &s[row..row + n]);
                for k in 0..n {
                    let competing = if k == best_k { second } else { best };
                    let update = s[row + k] - competing;
                    r[row + k] = DAMPING * r[row + k] + (1.0 - DAMPING) * update;
                }
            }

            // Availabilities: a(i,k) pools positive responsibilities toward k.
            for k in 0..n {
                let mut sum_pos = 0.0;
                for i in 0..n {
                    if i != k {
                        sum_pos += r[i * n + k].max(0.0);
                    }
                }
                let r_kk = r[k * n + k];
                for i in 0..n {
                    let update = if i == k {
                        sum_pos
                    } else {
                        (r_kk + sum_pos - r[i * n + k].max(0.0)).min(0.0)
                    };
                    a[i * n + k] = DAMPING * a[i * n + k] + (1.0 - DAMPING) * update;
                }
            }

            let current: Vec<usize> = (0..n)
                .filter(|&k| a[k * n + k] + r[k * n + k] > 0.0)
                .collect();

            if !current.is_empty() && current == exemplars {
                stable_rounds += 1;
                if stable_rounds >= CONVERGENCE_ITER {
                    break;
                }
            } else {
                stable_rounds = 0;
                exemplars = current;
            }
        }

        // Degenerate inputs (all-identical points, extreme preference) can
        // leave no exemplar standing; collapse to one cluster around the
        // medoid rather than failing the word.
        if exemplars.is_empty() {
            let medoid = (0..n)
                .max_by(|&i, &j| {
                    let total = |p: usize| (0..n).map(|q| s[p * n + q]).sum::<f64>();
                    total(i).total_cmp(&total(j))
                })
                .unwrap_or(0);
            exemplars = vec![medoid];
        }

        // Assign every point to its most similar exemplar; exemplars map to
        // themselves. Labels are indices into the exemplar list.
        let labels: Vec<i32> = (0..n)
            .map(|i| {
                if let Some(pos) = exemplars.iter().position(|&e| e == i) {
                    return pos as i32;
                }
                let best = exemplars
                    .iter()
                    .enumerate()
                    .max_by(|(_, &e1), (_, &e2)| s[i * n + e1].total_cmp(&s[i * n + e2]))
                    .map(|(pos, _)| pos)
                    .unwrap_or(0);
                best as i32
            })
            .collect();

        let exemplar_vectors = exemplars.iter().map(|&e| points[e].clone()).collect();

        Ok(ClusterOutcome {
            labels,
            exemplars: exemplar_vectors,
        })
    }
}

/// Median of a slice, without mutating the input.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Largest and second-largest of a(i,:) + s(i,:), plus the argmax index.
fn max_and_runner_up(a_row: &[f64], s_row: &[f64]) -> (f64, f64, usize) {
    let mut best = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;
    let mut best_k = 0;
    for (k, (av, sv)) in a_row.iter().zip(s_row.iter()).enumerate() {
        let v = av + sv;
        if v > best {
            second = best;
            best = v;
            best_k = k;
        } else if v > second {
            second = v;
        }
    }
    (best, second, best_k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::traits::ClusteringAlgorithm;

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.1, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
            vec![5.1, 5.1],
        ]
    }

    #[test]
    fn separates_two_blobs() {
        let outcome = AffinityPropagation::new().cluster(&two_blobs()).unwrap();
        assert_eq!(outcome.labels.len(), 8);
        // members of the same blob share a label, blobs differ
        assert!(outcome.labels[..4].iter().all(|&l| l == outcome.labels[0]));
        assert!(outcome.labels[4..].iter().all(|&l| l == outcome.labels[4]));
        assert_ne!(outcome.labels[0], outcome.labels[4]);
    }

    #[test]
    fn exemplar_count_matches_label_count() {
        let outcome = AffinityPropagation::new().cluster(&two_blobs()).unwrap();
        assert_eq!(outcome.exemplars.len(), outcome.cluster_count());
    }

    #[test]
    fn single_point_is_its_own_cluster() {
        let outcome = AffinityPropagation::new()
            .cluster(&[vec![1.0, 2.0]])
            .unwrap();
        assert_eq!(outcome.labels, vec![0]);
        assert_eq!(outcome.exemplars.len(), 1);
    }

    #[test]
    fn identical_points_collapse_to_one_cluster() {
        let points = vec![vec![0.3, 0.7]; 6];
        let outcome = AffinityPropagation::new().cluster(&points).unwrap();
        assert_eq!(outcome.cluster_count(), 1);
        assert!(outcome.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn strongly_negative_preference_merges_clusters() {
        let loose = AffinityPropagation::new().cluster(&two_blobs()).unwrap();
        let tight = AffinityPropagation::with_preference(-1e6)
            .cluster(&two_blobs())
            .unwrap();
        assert!(tight.cluster_count() <= loose.cluster_count());
    }

    #[test]
    fn labels_index_into_exemplars() {
        let outcome = AffinityPropagation::new().cluster(&two_blobs()).unwrap();
        for &l in &outcome.labels {
            assert!(l >= 0 && (l as usize) < outcome.exemplars.len());
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(AffinityPropagation::new().cluster(&[]).is_err());
    }
}
