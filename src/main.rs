use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use lexdrift::analysis::{self, AnalysisOptions};
use lexdrift::config::{Config, Language};
use lexdrift::embedder::{download, extract};
use lexdrift::input;
use lexdrift::output::terminal;
use lexdrift::results::{self, ResultsAggregator};

/// Lexdrift: semantic change detection for time-sliced corpora.
///
/// Measures how much each target word's usage has shifted between two
/// time periods, from contextual embeddings, via sense clustering and
/// Jensen-Shannon divergence.
#[derive(Parser)]
#[command(name = "lexdrift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score semantic drift for every word in an embeddings file
    Analyze {
        /// Corpus language (used in artifact filenames)
        #[arg(long, value_enum, default_value_t = Language::English)]
        language: Language,

        /// Path to the bulk embeddings JSON file
        #[arg(long)]
        embeddings: PathBuf,

        /// Output directory (default: LEXDRIFT_RESULTS_DIR or ./results)
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Keep only the first occurrence per distinct sentence within a slice
        #[arg(long)]
        one_embedding_per_sentence: bool,

        /// Also run the density-based strategy and log its result
        #[arg(long)]
        dbscan: bool,

        /// Override the affinity propagation preference (more negative
        /// means fewer clusters; default: median similarity)
        #[arg(long)]
        affinity_preference: Option<f64>,

        /// Rows of the ranking to display after the run (default: 10)
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Display the ranked drift table from a previous run
    Report {
        /// Corpus language of the table to display
        #[arg(long, value_enum, default_value_t = Language::English)]
        language: Language,

        /// Directory holding the results (default: LEXDRIFT_RESULTS_DIR or ./results)
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Rows to display (default: 20)
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Extract contextual embeddings from two time-sliced corpora
    Extract {
        /// Target word list, one word per line (may carry _nn/_vb suffixes)
        #[arg(long)]
        targets: PathBuf,

        /// Earlier corpus, one sentence per line
        #[arg(long)]
        t1: PathBuf,

        /// Later corpus, one sentence per line
        #[arg(long)]
        t2: PathBuf,

        /// Where to write the embeddings JSON file
        #[arg(long)]
        output: PathBuf,

        /// Directory with model.onnx + tokenizer.json (default: LEXDRIFT_MODEL_DIR)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Download the ONNX encoder (~90 MB)
    FetchModel {
        /// Target directory (default: LEXDRIFT_MODEL_DIR or the platform data dir)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lexdrift=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Analyze {
            language,
            embeddings,
            results_dir,
            one_embedding_per_sentence,
            dbscan,
            affinity_preference,
            top,
        } => {
            let results_dir = results_dir.unwrap_or(config.results_dir);

            println!("Loading embeddings from {}...", embeddings.display());
            let file = input::load_embeddings(&embeddings)?;
            info!(words = file.words.len(), language = %language, "Embeddings loaded");
            println!(
                "Scoring {} target words ({} corpus)...",
                file.words.len(),
                language
            );

            let opts = AnalysisOptions {
                one_embedding_per_sentence,
                run_dbscan: dbscan,
                affinity_preference,
            };

            let mut aggregator = ResultsAggregator::new(&results_dir, language)?;
            let summary = analysis::run(&file, &opts, &mut aggregator)?;

            terminal::display_drift_table(&aggregator.sorted_rows(), top);
            terminal::display_run_summary(summary.processed, summary.skipped);
            println!("Artifacts written to {}", results_dir.display());
        }

        Commands::Report {
            language,
            results_dir,
            top,
        } => {
            let results_dir = results_dir.unwrap_or(config.results_dir);
            let rows = results::read_table(&results::table_path(&results_dir, language))?;
            terminal::display_drift_table(&rows, top);
        }

        Commands::Extract {
            targets,
            t1,
            t2,
            output,
            model_dir,
        } => {
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            config.require_model()?;
            extract::run(&config.model_dir, &targets, &t1, &t2, &output).await?;
        }

        Commands::FetchModel { model_dir } => {
            let dir = model_dir.unwrap_or(config.model_dir);
            download::download_model(&dir).await?;
            println!("\nEncoder ready in {}", dir.display());
        }
    }

    Ok(())
}
