// Sequential drift analysis over every word in the embeddings file.
//
// Words are processed strictly in input order. Failures local to one word
// (empty slice after filtering, degenerate data) are logged, recorded as
// skips, and never abort the run. The aggregator flushes every artifact
// after each word, so an interrupted run leaves complete, correctly
// sorted output for every word finished so far.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::input::EmbeddingsFile;
use crate::results::ResultsAggregator;

use super::word::{analyze_word, AnalysisOptions};

/// Outcome of one full run.
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Analyze every word and persist incrementally through the aggregator.
pub fn run(
    file: &EmbeddingsFile,
    opts: &AnalysisOptions,
    aggregator: &mut ResultsAggregator,
) -> Result<RunSummary> {
    let pb = ProgressBar::new(file.words.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Words [{bar:30}] {pos}/{len} ({eta})")
            .expect("valid template"),
    );

    let mut processed = 0;
    let mut skipped = 0;

    for record in &file.words {
        match analyze_word(record, opts) {
            Ok(analysis) => {
                aggregator.record_word(analysis);
                processed += 1;
            }
            Err(e) => {
                warn!(word = record.word, error = %e, "Skipping word");
                aggregator.record_skip(&record.word, e.to_string());
                skipped += 1;
            }
        }
        aggregator.flush()?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(RunSummary { processed, skipped })
}
