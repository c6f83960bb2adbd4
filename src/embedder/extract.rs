// Corpus extraction: raw time-sliced corpora -> bulk embeddings file.
//
// Reads two sentence-per-line corpus files and a target word list, embeds
// every whole-word occurrence of each target in each slice, and writes
// the embeddings file the analysis pipeline consumes. Sentences that do
// not contain the target are never sent through the encoder.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::analysis::word::target_regex;
use crate::input::{self, EmbeddingsFile, TargetWordRecord, TimeSliceData};

use super::model::ContextualEmbedder;

/// Sentences per inference batch. Bounds peak memory on long corpora.
const BATCH_SIZE: usize = 16;

/// Read non-empty lines from a text file.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Embed all occurrences of one target in one corpus slice.
async fn embed_slice(
    embedder: &ContextualEmbedder,
    corpus: &[String],
    matcher: &regex_lite::Regex,
) -> Result<TimeSliceData> {
    let candidates: Vec<&String> = corpus.iter().filter(|s| matcher.is_match(s)).collect();

    let mut embeddings = Vec::new();
    let mut texts = Vec::new();

    for batch in candidates.chunks(BATCH_SIZE) {
        let sentences: Vec<String> = batch.iter().map(|s| (*s).clone()).collect();
        let per_sentence = embedder.embed_occurrences(&sentences, matcher).await?;
        for (sentence, occurrences) in sentences.iter().zip(per_sentence) {
            for occurrence in occurrences {
                embeddings.push(occurrence);
                texts.push(sentence.clone());
            }
        }
    }

    Ok(TimeSliceData { embeddings, texts })
}

/// Extract contextual embeddings for every target word and write the bulk
/// embeddings file.
pub async fn run(
    model_dir: &Path,
    targets_path: &Path,
    t1_path: &Path,
    t2_path: &Path,
    output_path: &Path,
) -> Result<()> {
    let targets = read_lines(targets_path)?;
    if targets.is_empty() {
        anyhow::bail!("Target word list is empty: {}", targets_path.display());
    }

    let corpus1 = read_lines(t1_path)?;
    let corpus2 = read_lines(t2_path)?;
    info!(
        targets = targets.len(),
        t1_sentences = corpus1.len(),
        t2_sentences = corpus2.len(),
        "Corpora loaded"
    );

    let embedder = ContextualEmbedder::load(model_dir)?;

    let pb = ProgressBar::new(targets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Targets [{bar:30}] {pos}/{len} ({eta})")
            .expect("valid template"),
    );

    let mut file = EmbeddingsFile::default();
    for word in &targets {
        let matcher = target_regex(word)?;
        let t1 = embed_slice(&embedder, &corpus1, &matcher).await?;
        let t2 = embed_slice(&embedder, &corpus2, &matcher).await?;

        if t1.embeddings.is_empty() || t2.embeddings.is_empty() {
            // kept in the file; the analyzer records the skip reason
            warn!(
                word,
                t1 = t1.embeddings.len(),
                t2 = t2.embeddings.len(),
                "Target has an empty time slice"
            );
        }

        info!(
            word,
            t1 = t1.embeddings.len(),
            t2 = t2.embeddings.len(),
            "Extracted occurrences"
        );

        file.words.push(TargetWordRecord {
            word: word.clone(),
            t1,
            t2,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    input::write_embeddings(output_path, &file)?;
    println!(
        "Wrote embeddings for {} targets to {}",
        file.words.len(),
        output_path.display()
    );
    Ok(())
}
