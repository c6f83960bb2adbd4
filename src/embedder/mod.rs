// Contextual embedding extraction — the upstream collaborator that feeds
// the analysis pipeline. Produces the bulk embeddings file from raw
// time-sliced corpora using a local ONNX encoder.

pub mod download;
pub mod extract;
pub mod model;
