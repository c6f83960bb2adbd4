// Bulk embeddings file — the contract with the embedding-extraction step.
//
// One JSON document maps each target word to its two time slices, each a
// pair of parallel sequences: per-occurrence embedding vectors and their
// source sentences. Words are processed in the order they appear in the
// file, so deserialization goes through an explicit map visitor into an
// ordered Vec instead of a hash map.
//
// Validation here is the fatal boundary: a missing slice key, mismatched
// vector/text lengths, or inconsistent embedding dimensions abort the run
// before any word is processed.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One time slice of a target word: per-occurrence embeddings and their
/// source sentences, index-aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSliceData {
    pub embeddings: Vec<Vec<f64>>,
    pub texts: Vec<String>,
}

/// Both time slices for one target word. The word may carry a
/// part-of-speech suffix such as `_nn` or `_vb`.
#[derive(Debug, Clone)]
pub struct TargetWordRecord {
    pub word: String,
    pub t1: TimeSliceData,
    pub t2: TimeSliceData,
}

#[derive(Serialize, Deserialize)]
struct RawWordRecord {
    t1: TimeSliceData,
    t2: TimeSliceData,
}

/// The full embeddings file, words in document order.
#[derive(Debug, Default)]
pub struct EmbeddingsFile {
    pub words: Vec<TargetWordRecord>,
}

impl<'de> Deserialize<'de> for EmbeddingsFile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FileVisitor;

        impl<'de> Visitor<'de> for FileVisitor {
            type Value = EmbeddingsFile;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from target word to time slice data")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut words = Vec::new();
                while let Some((word, record)) = map.next_entry::<String, RawWordRecord>()? {
                    words.push(TargetWordRecord {
                        word,
                        t1: record.t1,
                        t2: record.t2,
                    });
                }
                Ok(EmbeddingsFile { words })
            }
        }

        deserializer.deserialize_map(FileVisitor)
    }
}

impl Serialize for EmbeddingsFile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.words.len()))?;
        for record in &self.words {
            map.serialize_entry(
                &record.word,
                &RawWordRecord {
                    t1: record.t1.clone(),
                    t2: record.t2.clone(),
                },
            )?;
        }
        map.end()
    }
}

impl EmbeddingsFile {
    /// Check the structural invariants every downstream computation
    /// depends on. Any violation is fatal for the whole run.
    pub fn validate(&self) -> Result<()> {
        let mut dim: Option<usize> = None;

        for record in &self.words {
            for (slice_name, slice) in [("t1", &record.t1), ("t2", &record.t2)] {
                if slice.embeddings.len() != slice.texts.len() {
                    anyhow::bail!(
                        "word '{}', slice {}: {} embeddings but {} texts",
                        record.word,
                        slice_name,
                        slice.embeddings.len(),
                        slice.texts.len()
                    );
                }
                for e in &slice.embeddings {
                    match dim {
                        None => dim = Some(e.len()),
                        Some(d) if d != e.len() => anyhow::bail!(
                            "word '{}', slice {}: embedding dimension {} does not match {}",
                            record.word,
                            slice_name,
                            e.len(),
                            d
                        ),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

/// Load and validate a bulk embeddings file.
pub fn load_embeddings(path: &Path) -> Result<EmbeddingsFile> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open embeddings file: {}", path.display()))?;
    let parsed: EmbeddingsFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse embeddings file: {}", path.display()))?;
    parsed.validate()?;
    Ok(parsed)
}

/// Write a bulk embeddings file (used by the extraction command).
pub fn write_embeddings(path: &Path, file: &EmbeddingsFile) -> Result<()> {
    let out = File::create(path)
        .with_context(|| format!("Failed to create embeddings file: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(out), file)
        .with_context(|| format!("Failed to write embeddings file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(embeddings: Vec<Vec<f64>>, texts: Vec<&str>) -> TimeSliceData {
        TimeSliceData {
            embeddings,
            texts: texts.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn words_keep_document_order() {
        let json = r#"{
            "zebra": {"t1": {"embeddings": [[1.0]], "texts": ["a zebra"]},
                      "t2": {"embeddings": [[1.0]], "texts": ["the zebra"]}},
            "apple": {"t1": {"embeddings": [[2.0]], "texts": ["an apple"]},
                      "t2": {"embeddings": [[2.0]], "texts": ["one apple"]}}
        }"#;
        let parsed: EmbeddingsFile = serde_json::from_str(json).unwrap();
        let order: Vec<&str> = parsed.words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(order, vec!["zebra", "apple"]);
    }

    #[test]
    fn missing_slice_key_is_rejected() {
        let json = r#"{"word": {"t1": {"embeddings": [], "texts": []}}}"#;
        assert!(serde_json::from_str::<EmbeddingsFile>(json).is_err());
    }

    #[test]
    fn mismatched_lengths_fail_validation() {
        let file = EmbeddingsFile {
            words: vec![TargetWordRecord {
                word: "plane".into(),
                t1: slice(vec![vec![1.0], vec![2.0]], vec!["only one text"]),
                t2: slice(vec![vec![1.0]], vec!["fine"]),
            }],
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn inconsistent_dimensions_fail_validation() {
        let file = EmbeddingsFile {
            words: vec![TargetWordRecord {
                word: "plane".into(),
                t1: slice(vec![vec![1.0, 2.0]], vec!["a"]),
                t2: slice(vec![vec![1.0]], vec!["b"]),
            }],
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn round_trip_preserves_order_and_content() {
        let file = EmbeddingsFile {
            words: vec![
                TargetWordRecord {
                    word: "walk_vb".into(),
                    t1: slice(vec![vec![1.0, 0.0]], vec!["we walk home"]),
                    t2: slice(vec![vec![0.0, 1.0]], vec!["they walk away"]),
                },
                TargetWordRecord {
                    word: "bank_nn".into(),
                    t1: slice(vec![vec![0.5, 0.5]], vec!["the bank opened"]),
                    t2: slice(vec![vec![0.5, 0.5]], vec!["a river bank"]),
                },
            ],
        };
        let json = serde_json::to_string(&file).unwrap();
        let parsed: EmbeddingsFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.words.len(), 2);
        assert_eq!(parsed.words[0].word, "walk_vb");
        assert_eq!(parsed.words[1].word, "bank_nn");
        assert_eq!(parsed.words[1].t1.texts[0], "the bank opened");
        assert!(parsed.validate().is_ok());
    }
}
