// Unit tests for the clustering strategies as the analyzer uses them:
// every strategy labels every pooled point, fixed-k strategies respect k
// and the fixed seed, and labels split cleanly at any slice boundary.

use std::collections::HashSet;

use lexdrift::clustering::{
    AffinityPropagation, ClusteringAlgorithm, Dbscan, KMeans, NOISE,
};

/// Two well-separated regions with `per_side` points each, slice-1 points
/// first — the pooled layout the analyzer produces.
fn pooled_two_regions(per_side: usize) -> Vec<Vec<f64>> {
    let mut points = Vec::new();
    for i in 0..per_side {
        let jitter = i as f64 * 0.02;
        points.push(vec![1.0 + jitter, 0.0, jitter]);
    }
    for i in 0..per_side {
        let jitter = i as f64 * 0.02;
        points.push(vec![0.0, 1.0 + jitter, -jitter]);
    }
    points
}

#[test]
fn every_strategy_labels_every_pooled_point() {
    let pooled = pooled_two_regions(6);
    let strategies: Vec<Box<dyn ClusteringAlgorithm>> = vec![
        Box::new(AffinityPropagation::new()),
        Box::new(KMeans::new(5)),
        Box::new(KMeans::new(7)),
        Box::new(Dbscan::new(0.5, 3)),
    ];

    for strategy in &strategies {
        let outcome = strategy.cluster(&pooled).unwrap();
        assert_eq!(
            outcome.labels.len(),
            pooled.len(),
            "{} dropped points",
            strategy.name()
        );
        // any split index yields slice label lists matching slice sizes
        let split = 6;
        assert_eq!(outcome.labels[..split].len(), split);
        assert_eq!(outcome.labels[split..].len(), pooled.len() - split);
    }
}

#[test]
fn fixed_k_respects_k_and_never_marks_noise() {
    let pooled = pooled_two_regions(10);
    for k in [5, 7] {
        let outcome = KMeans::new(k).cluster(&pooled).unwrap();
        let distinct: HashSet<i32> = outcome.labels.iter().copied().collect();
        assert!(distinct.len() <= k, "k={k} produced {} labels", distinct.len());
        assert!(outcome.labels.iter().all(|&l| l >= 0), "noise label under k-means");
        assert_eq!(outcome.exemplars.len(), k);
    }
}

#[test]
fn fixed_seed_reproduces_labels_across_runs() {
    let pooled = pooled_two_regions(12);
    for k in [5, 7] {
        let first = KMeans::new(k).cluster(&pooled).unwrap();
        let second = KMeans::new(k).cluster(&pooled).unwrap();
        assert_eq!(first.labels, second.labels, "k={k} not deterministic");
    }
}

#[test]
fn affinity_discovers_the_two_regions() {
    let pooled = pooled_two_regions(8);
    let outcome = AffinityPropagation::new().cluster(&pooled).unwrap();

    // no label crosses the region boundary
    let left: HashSet<i32> = outcome.labels[..8].iter().copied().collect();
    let right: HashSet<i32> = outcome.labels[8..].iter().copied().collect();
    assert!(left.is_disjoint(&right), "a sense cluster spans both regions");
    assert!(outcome.cluster_count() >= 2);
}

#[test]
fn affinity_reports_exemplars_matching_cluster_count() {
    let pooled = pooled_two_regions(8);
    let outcome = AffinityPropagation::new().cluster(&pooled).unwrap();
    assert_eq!(outcome.exemplars.len(), outcome.cluster_count());
    // every exemplar is an actual input point
    for exemplar in &outcome.exemplars {
        assert!(pooled.contains(exemplar));
    }
}

#[test]
fn dbscan_marks_isolated_points_as_noise() {
    let mut pooled = pooled_two_regions(6);
    pooled.push(vec![50.0, 50.0, 50.0]);
    let outcome = Dbscan::new(0.5, 3).cluster(&pooled).unwrap();
    assert_eq!(*outcome.labels.last().unwrap(), NOISE);
    // dense regions still cluster
    assert!(outcome.labels[..6].iter().all(|&l| l != NOISE));
}
