use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;

/// Target corpus language. The artifact filenames carry the language code,
/// and anything outside this set is rejected at argument parsing, before
/// any processing begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Language {
    English,
    Latin,
    Swedish,
    German,
}

impl Language {
    /// Lowercase code used in artifact filenames.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Latin => "latin",
            Language::Swedish => "swedish",
            Language::German => "german",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Command
/// line flags override these values where a matching flag exists.
pub struct Config {
    /// Directory that receives all persisted artifacts.
    pub results_dir: PathBuf,
    /// Directory containing the ONNX encoder files used by `extract`.
    pub model_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let results_dir = env::var("LEXDRIFT_RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("results"));

        let model_dir = env::var("LEXDRIFT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::embedder::download::default_model_dir());

        Ok(Self {
            results_dir,
            model_dir,
        })
    }

    /// Check that the encoder files are present before extraction starts.
    pub fn require_model(&self) -> Result<()> {
        if !crate::embedder::download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Encoder model files not found in {}\n\
                 Run `lexdrift fetch-model` to download them, or point\n\
                 LEXDRIFT_MODEL_DIR at a directory holding model.onnx and tokenizer.json.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}
