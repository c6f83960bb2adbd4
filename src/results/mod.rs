// Result aggregation and crash-safe persistence.
//
// One aggregator instance owns every run-scoped accumulator: the score
// table, the per-strategy label and representative maps, the filtered
// sentences, and the skip record. The driver calls flush() after every
// word; flush rewrites each artifact wholesale, so any on-disk snapshot
// is a complete, correctly sorted view as of the last finished word.
// That costs O(n^2) I/O over a run but an interruption never leaves a
// half-written or stale-sorted table behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::WordAnalysis;
use crate::config::Language;

/// One row of the drift table.
#[derive(Debug, Clone)]
pub struct DriftRow {
    pub word: String,
    pub aff_prop: f64,
    pub kmeans_5: f64,
    pub kmeans_7: f64,
    pub averaging: f64,
    pub aff_prop_clusters: usize,
}

/// Per-word slice-split payload for the label and sentence artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct SliceArtifact<T> {
    pub t1: Vec<T>,
    pub t2: Vec<T>,
}

const TSV_HEADER: &str = "word\taff_prop\tkmeans_5\tkmeans_7\taveraging\taff_prop_clusters";

pub struct ResultsAggregator {
    results_dir: PathBuf,
    language: Language,
    rows: Vec<DriftRow>,
    aff_prop_labels: BTreeMap<String, SliceArtifact<i32>>,
    kmeans_5_labels: BTreeMap<String, SliceArtifact<i32>>,
    kmeans_7_labels: BTreeMap<String, SliceArtifact<i32>>,
    aff_prop_exemplars: BTreeMap<String, Vec<Vec<f64>>>,
    kmeans_5_centroids: BTreeMap<String, Vec<Vec<f64>>>,
    kmeans_7_centroids: BTreeMap<String, Vec<Vec<f64>>>,
    sentences: BTreeMap<String, SliceArtifact<String>>,
    skipped: BTreeMap<String, String>,
}

impl ResultsAggregator {
    /// Create an aggregator writing into `results_dir`, which is created
    /// if missing.
    pub fn new(results_dir: &Path, language: Language) -> Result<Self> {
        fs::create_dir_all(results_dir).with_context(|| {
            format!("Failed to create results directory: {}", results_dir.display())
        })?;
        Ok(Self {
            results_dir: results_dir.to_path_buf(),
            language,
            rows: Vec::new(),
            aff_prop_labels: BTreeMap::new(),
            kmeans_5_labels: BTreeMap::new(),
            kmeans_7_labels: BTreeMap::new(),
            aff_prop_exemplars: BTreeMap::new(),
            kmeans_5_centroids: BTreeMap::new(),
            kmeans_7_centroids: BTreeMap::new(),
            sentences: BTreeMap::new(),
            skipped: BTreeMap::new(),
        })
    }

    /// Record one completed word analysis.
    pub fn record_word(&mut self, analysis: WordAnalysis) {
        let word = analysis.word;

        self.rows.push(DriftRow {
            word: word.clone(),
            aff_prop: analysis.aff_prop.divergence,
            kmeans_5: analysis.kmeans_5.divergence,
            kmeans_7: analysis.kmeans_7.divergence,
            averaging: analysis.averaging,
            aff_prop_clusters: analysis.aff_prop_clusters,
        });

        self.aff_prop_labels.insert(
            word.clone(),
            SliceArtifact {
                t1: analysis.aff_prop.labels.t1,
                t2: analysis.aff_prop.labels.t2,
            },
        );
        self.kmeans_5_labels.insert(
            word.clone(),
            SliceArtifact {
                t1: analysis.kmeans_5.labels.t1,
                t2: analysis.kmeans_5.labels.t2,
            },
        );
        self.kmeans_7_labels.insert(
            word.clone(),
            SliceArtifact {
                t1: analysis.kmeans_7.labels.t1,
                t2: analysis.kmeans_7.labels.t2,
            },
        );

        self.aff_prop_exemplars
            .insert(word.clone(), analysis.aff_prop.representatives);
        self.kmeans_5_centroids
            .insert(word.clone(), analysis.kmeans_5.representatives);
        self.kmeans_7_centroids
            .insert(word.clone(), analysis.kmeans_7.representatives);

        self.sentences.insert(
            word,
            SliceArtifact {
                t1: analysis.sentences_t1,
                t2: analysis.sentences_t2,
            },
        );
    }

    /// Record a word that could not be analyzed, with the reason.
    pub fn record_skip(&mut self, word: &str, reason: String) {
        self.skipped.insert(word.to_string(), reason);
    }

    /// Rows recorded so far, sorted descending by the affinity propagation
    /// divergence (the ranking signal of the final table).
    pub fn sorted_rows(&self) -> Vec<DriftRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.aff_prop.total_cmp(&a.aff_prop));
        rows
    }

    /// Rewrite every artifact wholesale.
    pub fn flush(&self) -> Result<()> {
        self.write_table()?;

        self.write_json("aff_prop_labels", &self.aff_prop_labels)?;
        self.write_json("kmeans_5_labels", &self.kmeans_5_labels)?;
        self.write_json("kmeans_7_labels", &self.kmeans_7_labels)?;

        self.write_json("aff_prop_exemplars", &self.aff_prop_exemplars)?;
        self.write_json("kmeans_5_centroids", &self.kmeans_5_centroids)?;
        self.write_json("kmeans_7_centroids", &self.kmeans_7_centroids)?;

        self.write_json("sentences", &self.sentences)?;
        self.write_json("skipped", &self.skipped)?;
        Ok(())
    }

    /// Path of the drift table for this run's language.
    pub fn table_path(&self) -> PathBuf {
        table_path(&self.results_dir, self.language)
    }

    fn write_table(&self) -> Result<()> {
        let path = self.table_path();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create results table: {}", path.display()))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "{TSV_HEADER}")?;
        for row in self.sorted_rows() {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.word,
                row.aff_prop,
                row.kmeans_5,
                row.kmeans_7,
                row.averaging,
                row.aff_prop_clusters
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self
            .results_dir
            .join(format!("{}_{}.json", name, self.language.code()));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create artifact: {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), value)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        Ok(())
    }
}

/// Path of the drift table inside `results_dir`.
pub fn table_path(results_dir: &Path, language: Language) -> PathBuf {
    results_dir.join(format!("results_{}.tsv", language.code()))
}

/// Read a previously written drift table (the `report` command).
pub fn read_table(path: &Path) -> Result<Vec<DriftRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open results table: {}", path.display()))?;
    let mut rows = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if idx == 0 {
            if line != TSV_HEADER {
                anyhow::bail!("Unrecognized results table header: {line}");
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 6 {
            anyhow::bail!("Malformed results table line {}: {line}", idx + 1);
        }
        let parse_f64 = |s: &str| -> Result<f64> {
            s.parse::<f64>()
                .with_context(|| format!("Malformed number '{s}' on line {}", idx + 1))
        };
        rows.push(DriftRow {
            word: fields[0].to_string(),
            aff_prop: parse_f64(fields[1])?,
            kmeans_5: parse_f64(fields[2])?,
            kmeans_7: parse_f64(fields[3])?,
            averaging: parse_f64(fields[4])?,
            aff_prop_clusters: fields[5]
                .parse::<usize>()
                .with_context(|| format!("Malformed cluster count on line {}", idx + 1))?,
        });
    }

    Ok(rows)
}
