// Per-word drift analysis — filtering, pooling, clustering, divergence.

pub mod run;
pub mod word;

pub use run::{run, RunSummary};
pub use word::{analyze_word, AnalysisOptions, SliceLabels, StrategySignal, WordAnalysis};
