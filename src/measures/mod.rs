// Distance and divergence primitives for drift scoring.

pub mod cosine;
pub mod jsd;

pub use cosine::{averaged_embedding_distance, cosine_distance, mean_pairwise_cosine_distance};
pub use jsd::{divergence_from_labels, jensen_shannon_divergence};
