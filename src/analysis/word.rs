// Per-word semantic-change analysis.
//
// For one target word: keep only occurrences whose sentence really
// contains the word, pool the two time slices, run every clustering
// strategy over the pool, split the labels back at the slice boundary,
// and score the divergence between the two label distributions.
//
// Upstream extraction can hand us occurrences of adjacent or wrong
// tokens ("airplane" for target "plane"), so the whole-word filter runs
// on every occurrence before anything is computed.

use anyhow::{Context, Result};
use regex_lite::Regex;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::clustering::{AffinityPropagation, ClusteringAlgorithm, Dbscan, KMeans};
use crate::input::{TargetWordRecord, TimeSliceData};
use crate::measures;

/// Options controlling the per-word analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Keep only the first occurrence per distinct sentence text within a
    /// time slice.
    pub one_embedding_per_sentence: bool,
    /// Also run the density-based strategy and log its result (diagnostic;
    /// never persisted).
    pub run_dbscan: bool,
    /// Override the affinity propagation preference. More negative means
    /// fewer clusters; by default the median similarity is used.
    pub affinity_preference: Option<f64>,
}

/// Cluster labels split back into the two time slices.
#[derive(Debug, Clone)]
pub struct SliceLabels {
    pub t1: Vec<i32>,
    pub t2: Vec<i32>,
}

/// One clustering strategy's output for one word.
#[derive(Debug, Clone)]
pub struct StrategySignal {
    pub divergence: f64,
    pub labels: SliceLabels,
    /// Exemplars or centroids, depending on the strategy.
    pub representatives: Vec<Vec<f64>>,
}

impl StrategySignal {
    /// Distinct labels across both slices.
    pub fn cluster_count(&self) -> usize {
        self.labels
            .t1
            .iter()
            .chain(self.labels.t2.iter())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Everything the aggregator needs to record for one completed word.
#[derive(Debug, Clone)]
pub struct WordAnalysis {
    pub word: String,
    pub averaging: f64,
    pub aff_prop: StrategySignal,
    pub aff_prop_clusters: usize,
    pub kmeans_5: StrategySignal,
    pub kmeans_7: StrategySignal,
    pub sentences_t1: Vec<String>,
    pub sentences_t2: Vec<String>,
}

/// Whole-word matcher for a target word, with any part-of-speech suffix
/// stripped ("plane_nn" matches the token "plane").
pub fn target_regex(word: &str) -> Result<Regex> {
    let base = word
        .strip_suffix("_nn")
        .or_else(|| word.strip_suffix("_vb"))
        .unwrap_or(word);
    let pattern = format!(r"\b{}\b", regex_lite::escape(base));
    Regex::new(&pattern).with_context(|| format!("Invalid target word pattern for '{word}'"))
}

/// Filter one slice down to occurrences that survive the whole-word match,
/// the zero-vector guard, and (optionally) per-sentence deduplication.
fn filter_slice(
    word: &str,
    slice_name: &str,
    slice: &TimeSliceData,
    matcher: &Regex,
    dedupe: bool,
) -> (Vec<Vec<f64>>, Vec<String>) {
    let mut embeddings = Vec::new();
    let mut texts = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut zero_dropped = 0_usize;

    for (embedding, text) in slice.embeddings.iter().zip(slice.texts.iter()) {
        if !matcher.is_match(text) {
            continue;
        }
        // A zero-magnitude embedding has no direction; cosine against it
        // is undefined, so the occurrence is dropped as bad data before
        // it can claim a sentence slot under dedupe.
        if embedding.iter().all(|&v| v == 0.0) {
            zero_dropped += 1;
            continue;
        }
        if dedupe && !seen.insert(text.as_str()) {
            continue;
        }
        embeddings.push(embedding.clone());
        texts.push(text.clone());
    }

    if zero_dropped > 0 {
        warn!(word, slice = slice_name, count = zero_dropped, "Dropped all-zero embeddings");
    }

    (embeddings, texts)
}

/// Run one clustering strategy over the pooled set and score the
/// divergence between its per-slice label distributions.
fn run_strategy(
    algo: &dyn ClusteringAlgorithm,
    pooled: &[Vec<f64>],
    split: usize,
) -> Result<StrategySignal> {
    let outcome = algo.cluster(pooled)?;
    let t1 = outcome.labels[..split].to_vec();
    let t2 = outcome.labels[split..].to_vec();
    let divergence = measures::divergence_from_labels(&t1, &t2);
    Ok(StrategySignal {
        divergence,
        labels: SliceLabels { t1, t2 },
        representatives: outcome.exemplars,
    })
}

/// Analyze one target word. Errors are per-word: the caller logs them,
/// records the skip, and moves on to the next word.
pub fn analyze_word(record: &TargetWordRecord, opts: &AnalysisOptions) -> Result<WordAnalysis> {
    let word = record.word.as_str();
    let matcher = target_regex(word)?;

    let (emb1, texts1) = filter_slice(word, "t1", &record.t1, &matcher, opts.one_embedding_per_sentence);
    let (emb2, texts2) = filter_slice(word, "t2", &record.t2, &matcher, opts.one_embedding_per_sentence);

    for (slice_name, embeddings) in [("t1", &emb1), ("t2", &emb2)] {
        if embeddings.is_empty() {
            anyhow::bail!(
                "slice {} of '{}' has no surviving occurrences after filtering",
                slice_name,
                word
            );
        }
    }

    info!(word, t1 = emb1.len(), t2 = emb2.len(), "Surviving occurrences");

    let averaging = measures::averaged_embedding_distance(&emb1, &emb2)?;

    // O(n*m) pairwise diagnostic, computed only when someone is listening.
    if tracing::enabled!(tracing::Level::DEBUG) {
        let pairwise = measures::mean_pairwise_cosine_distance(&emb1, &emb2)?;
        debug!(word, pairwise, "Mean pairwise cosine distance");
    }

    // Pool slice 1 then slice 2; every label split below depends on this
    // exact boundary.
    let split = emb1.len();
    let mut pooled = emb1;
    pooled.extend(emb2);

    let aff_prop_algo = match opts.affinity_preference {
        Some(p) => AffinityPropagation::with_preference(p),
        None => AffinityPropagation::new(),
    };
    let aff_prop = run_strategy(&aff_prop_algo, &pooled, split)?;
    let aff_prop_clusters = aff_prop.cluster_count();
    let kmeans_5 = run_strategy(&KMeans::new(5), &pooled, split)?;
    let kmeans_7 = run_strategy(&KMeans::new(7), &pooled, split)?;

    info!(
        word,
        aff_prop = aff_prop.divergence,
        aff_prop_clusters,
        kmeans_5 = kmeans_5.divergence,
        kmeans_7 = kmeans_7.divergence,
        averaging,
        "Divergence scores"
    );

    if opts.run_dbscan {
        let dbscan = run_strategy(&Dbscan::default(), &pooled, split)?;
        info!(
            word,
            clusters = dbscan.cluster_count(),
            divergence = dbscan.divergence,
            "DBSCAN diagnostic"
        );
    }

    Ok(WordAnalysis {
        word: word.to_string(),
        averaging,
        aff_prop,
        aff_prop_clusters,
        kmeans_5,
        kmeans_7,
        sentences_t1: texts1,
        sentences_t2: texts2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TimeSliceData;

    fn slice(embeddings: Vec<Vec<f64>>, texts: Vec<&str>) -> TimeSliceData {
        TimeSliceData {
            embeddings,
            texts: texts.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn whole_word_match_excludes_compounds() {
        let re = target_regex("plane").unwrap();
        assert!(re.is_match("a plane flew"));
        assert!(re.is_match("the plane landed"));
        assert!(!re.is_match("airplane noise"));
    }

    #[test]
    fn pos_suffix_is_stripped_before_matching() {
        let re = target_regex("plane_nn").unwrap();
        assert!(re.is_match("a plane flew"));
        let re = target_regex("walk_vb").unwrap();
        assert!(re.is_match("we walk home"));
        assert!(!re.is_match("we walked home"));
    }

    #[test]
    fn filtering_discards_non_matching_occurrences() {
        let record = TargetWordRecord {
            word: "plane".into(),
            t1: slice(
                vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![1.0, 0.1]],
                vec!["a plane flew", "airplane noise", "the plane landed"],
            ),
            t2: slice(vec![vec![0.0, 1.0]], vec!["this plane is new"]),
        };
        let analysis = analyze_word(&record, &AnalysisOptions::default()).unwrap();
        assert_eq!(
            analysis.sentences_t1,
            vec!["a plane flew", "the plane landed"]
        );
        // split invariant: label lists mirror surviving counts
        assert_eq!(analysis.aff_prop.labels.t1.len(), 2);
        assert_eq!(analysis.aff_prop.labels.t2.len(), 1);
        assert_eq!(analysis.kmeans_5.labels.t1.len(), 2);
        assert_eq!(analysis.kmeans_7.labels.t2.len(), 1);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_per_sentence() {
        let record = TargetWordRecord {
            word: "plane".into(),
            t1: slice(
                vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.9, 0.1]],
                vec!["the plane landed", "the plane landed", "a plane flew"],
            ),
            t2: slice(vec![vec![0.0, 1.0]], vec!["this plane is new"]),
        };
        let opts = AnalysisOptions {
            one_embedding_per_sentence: true,
            ..Default::default()
        };
        let analysis = analyze_word(&record, &opts).unwrap();
        assert_eq!(analysis.sentences_t1, vec!["the plane landed", "a plane flew"]);
        assert_eq!(analysis.aff_prop.labels.t1.len(), 2);
    }

    #[test]
    fn duplicates_survive_without_dedupe() {
        let record = TargetWordRecord {
            word: "plane".into(),
            t1: slice(
                vec![vec![1.0, 0.0], vec![0.5, 0.5]],
                vec!["the plane landed", "the plane landed"],
            ),
            t2: slice(vec![vec![0.0, 1.0]], vec!["this plane is new"]),
        };
        let analysis = analyze_word(&record, &AnalysisOptions::default()).unwrap();
        assert_eq!(analysis.sentences_t1.len(), 2);
    }

    #[test]
    fn empty_slice_after_filtering_is_an_error() {
        let record = TargetWordRecord {
            word: "plane".into(),
            t1: slice(vec![vec![1.0, 0.0]], vec!["airplane noise only"]),
            t2: slice(vec![vec![0.0, 1.0]], vec!["this plane is new"]),
        };
        let err = analyze_word(&record, &AnalysisOptions::default()).unwrap_err();
        assert!(err.to_string().contains("t1"));
    }

    #[test]
    fn zero_vectors_are_excluded_not_propagated() {
        let record = TargetWordRecord {
            word: "plane".into(),
            t1: slice(
                vec![vec![0.0, 0.0], vec![1.0, 0.0]],
                vec!["a plane flew", "the plane landed"],
            ),
            t2: slice(vec![vec![0.0, 1.0]], vec!["this plane is new"]),
        };
        let analysis = analyze_word(&record, &AnalysisOptions::default()).unwrap();
        assert_eq!(analysis.sentences_t1, vec!["the plane landed"]);
        assert!(analysis.averaging.is_finite());
    }

    #[test]
    fn identical_slices_score_zero_everywhere() {
        let embeddings = vec![vec![0.4, 0.6]; 5];
        let texts = vec![
            "the plane left",
            "a plane came",
            "that plane turned",
            "some plane rose",
            "one plane fell",
        ];
        let record = TargetWordRecord {
            word: "plane".into(),
            t1: slice(embeddings.clone(), texts.clone()),
            t2: slice(embeddings, texts),
        };
        let analysis = analyze_word(&record, &AnalysisOptions::default()).unwrap();
        assert!(analysis.averaging.abs() < 1e-10);
        assert!(analysis.aff_prop.divergence.abs() < 1e-10);
        assert!(analysis.kmeans_5.divergence.abs() < 1e-10);
        assert!(analysis.kmeans_7.divergence.abs() < 1e-10);
    }
}
