// Contextual word embedder using a local ONNX encoder.
//
// Unlike a sentence embedder, this pools only the tokens that cover the
// target word: for each whole-word match in a sentence, the sub-token
// vectors overlapping the match span are averaged into one per-occurrence
// embedding. A sentence mentioning the target twice yields two
// occurrences. The model runs locally via ONNX — no API calls.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use regex_lite::Regex;
use tokenizers::Tokenizer;
use tracing::{debug, warn};

/// One sentence's per-occurrence embeddings, in match order.
pub type SentenceOccurrences = Vec<Vec<f64>>;

/// Contextual embedder over a BERT-style ONNX export.
///
/// Arc<Mutex<Session>> for thread safety, Arc<Tokenizer> for shared
/// ownership across spawn_blocking.
pub struct ContextualEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl ContextualEmbedder {
    /// Load the encoder and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Call `fetch-model` first if they don't exist.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Encoder model not found: {}\nRun `lexdrift fetch-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Encoder tokenizer not found: {}\nRun `lexdrift fetch-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load encoder from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load encoder tokenizer: {}", e))?;

        debug!("Loaded encoder from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }

    /// Embed every occurrence of the target (as located by `matcher`) in a
    /// batch of sentences. Returns one list of occurrence embeddings per
    /// sentence, index-aligned with the input.
    ///
    /// CPU-bound work is offloaded to spawn_blocking to keep the async
    /// runtime responsive.
    pub async fn embed_occurrences(
        &self,
        sentences: &[String],
        matcher: &Regex,
    ) -> Result<Vec<SentenceOccurrences>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let sentences = sentences.to_vec();
        let matcher = matcher.clone();

        tokio::task::spawn_blocking(move || {
            embed_sync(&session, &tokenizer, &sentences, &matcher)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Synchronous embedding — tokenization, inference, and target-span pooling.
fn embed_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    sentences: &[String],
    matcher: &Regex,
) -> Result<Vec<SentenceOccurrences>> {
    let encodings: Vec<_> = sentences
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        return Ok(vec![Vec::new(); batch_size]);
    }

    // Build padded input tensors. BERT uses:
    //   input_ids: token IDs (pad with 0)
    //   attention_mask: 1 for real tokens, 0 for padding
    //   token_type_ids: all zeros for single-sentence input
    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let ids = enc.get_ids();
        let mask = enc.get_attention_mask();
        let seq_len = ids.len();

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, seq_len));

        let pad_len = max_len - seq_len;
        input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
        .context("Failed to create token_type_ids tensor")?;

    // Run inference — output is last_hidden_state: [batch, seq_len, hidden]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Encoder ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract encoder output tensor")?;

        data.to_vec()
    };

    // The hidden size follows from the flat output length; the exported
    // model dictates it (384 for MiniLM, 768 for a fine-tuned BERT base).
    let hidden = hidden_states.len() / (batch_size * max_len);

    let mut results = Vec::with_capacity(batch_size);

    for (i, (sentence, enc)) in sentences.iter().zip(encodings.iter()).enumerate() {
        let offsets = enc.get_offsets();
        let mask = enc.get_attention_mask();
        let mut occurrences = Vec::new();

        for m in matcher.find_iter(sentence) {
            let (start, end) = (m.start(), m.end());

            // Average the sub-token vectors covering this match span.
            // Special tokens carry the (0, 0) offset and are never pooled.
            let mut sum = vec![0.0_f64; hidden];
            let mut covered = 0_usize;
            for (j, &(tok_start, tok_end)) in offsets.iter().enumerate() {
                if mask[j] == 0 || tok_start == tok_end {
                    continue;
                }
                if tok_start < end && tok_end > start {
                    let base = (i * max_len + j) * hidden;
                    for (s, v) in sum.iter_mut().zip(&hidden_states[base..base + hidden]) {
                        *s += *v as f64;
                    }
                    covered += 1;
                }
            }

            if covered == 0 {
                // target fell beyond the encoder's truncation window
                warn!(sentence, "Target occurrence not covered by any token, dropping");
                continue;
            }

            for v in &mut sum {
                *v /= covered as f64;
            }
            occurrences.push(sum);
        }

        results.push(occurrences);
    }

    debug!(
        batch_size,
        hidden,
        "Computed contextual target embeddings"
    );

    Ok(results)
}
