// Jensen-Shannon divergence between sense-cluster usage distributions.
//
// The drift signal: how differently a word's occurrences distribute over
// sense clusters in the two time slices. Computed in natural log, so the
// value lies in [0, ln 2]. The KL terms define 0*ln(0/x) = 0, and the
// mixture m is zero only where both inputs are zero, so no NaN or -inf
// can reach the caller.

use std::collections::BTreeSet;

/// Kullback-Leibler divergence KL(p || m) for probability vectors where
/// m[i] > 0 wherever p[i] > 0.
fn kl_divergence(p: &[f64], m: &[f64]) -> f64 {
    p.iter()
        .zip(m.iter())
        .filter(|(&pi, _)| pi > 0.0)
        .map(|(&pi, &mi)| pi * (pi / mi).ln())
        .sum()
}

/// Jensen-Shannon divergence between two frequency vectors over the same
/// label set. Inputs are normalized to probability distributions first, so
/// raw counts are accepted directly.
pub fn jensen_shannon_divergence(p: &[f64], q: &[f64]) -> f64 {
    let p_sum: f64 = p.iter().sum();
    let q_sum: f64 = q.iter().sum();

    let pn: Vec<f64> = p.iter().map(|v| v / p_sum).collect();
    let qn: Vec<f64> = q.iter().map(|v| v / q_sum).collect();

    let m: Vec<f64> = pn
        .iter()
        .zip(qn.iter())
        .map(|(a, b)| 0.5 * (a + b))
        .collect();

    0.5 * kl_divergence(&pn, &m) + 0.5 * kl_divergence(&qn, &m)
}

/// Divergence between two slices' cluster assignments.
///
/// The label set is the union of labels seen in either slice, sorted for
/// determinism; a label absent from one slice contributes a zero count on
/// that side.
pub fn divergence_from_labels(labels1: &[i32], labels2: &[i32]) -> f64 {
    let label_set: BTreeSet<i32> = labels1.iter().chain(labels2.iter()).copied().collect();

    let counts = |labels: &[i32]| -> Vec<f64> {
        label_set
            .iter()
            .map(|l| labels.iter().filter(|&&x| x == *l).count() as f64)
            .collect()
    };

    jensen_shannon_divergence(&counts(labels1), &counts(labels2))
}
