// Model download helper for the ONNX encoder.
//
// Fetches a sentence-transformer BERT encoder (all-MiniLM-L6-v2, ~90 MB)
// from HuggingFace. Files are stored in a platform-appropriate directory
// (~/.local/share/lexdrift/models/ on Linux) so they persist across runs.
// A fine-tuned encoder exported to ONNX can be dropped into the same
// directory instead; extraction only expects model.onnx + tokenizer.json.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace repo for the default encoder.
const ENCODER_HF_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

/// Remote paths of the two files extraction needs.
const ENCODER_MODEL_FILE: &str = "onnx/model.onnx";
const ENCODER_TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing encoder files.
/// Uses the platform data directory: ~/.local/share/lexdrift/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexdrift")
        .join("models")
}

/// Check whether both required encoder files exist.
pub fn model_files_present(dir: &Path) -> bool {
    dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
}

/// Download the encoder files. Shows a progress bar for the model file
/// and skips files that already exist.
pub async fn download_model(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nEncoder model (all-MiniLM-L6-v2):");

    let tokenizer_path = dir.join("tokenizer.json");
    if tokenizer_path.exists() {
        info!("Encoder tokenizer already exists, skipping");
        println!("  tokenizer.json (already exists)");
    } else {
        println!("  Downloading tokenizer.json...");
        download_file(
            &format!("{ENCODER_HF_URL}/{ENCODER_TOKENIZER_FILE}"),
            &tokenizer_path,
            false,
        )
        .await?;
    }

    let model_path = dir.join("model.onnx");
    if model_path.exists() {
        info!("Encoder model already exists, skipping");
        println!("  model.onnx (already exists)");
    } else {
        println!("  Downloading model.onnx (~90 MB)...");
        download_file(
            &format!("{ENCODER_HF_URL}/{ENCODER_MODEL_FILE}"),
            &model_path,
            true,
        )
        .await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let total_size = response.content_length();

    let pb = if show_progress {
        let pb = if let Some(size) = total_size {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    std::fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_dir_is_under_lexdrift() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("lexdrift") && path_str.contains("models"),
            "Expected path containing lexdrift/models, got: {path_str}"
        );
    }

    #[test]
    fn model_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("lexdrift-test-nonexistent");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn model_files_present_true_when_files_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"fake").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), b"fake").unwrap();
        assert!(model_files_present(dir.path()));
    }
}
