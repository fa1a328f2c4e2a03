//! TvRec embedding collaborator
//!
//! Turns text into unit-length vectors through an Ollama server

mod client;
mod embedder;
mod normalize;
mod types;

pub use client::OllamaClient;
pub use embedder::Embedder;
pub use normalize::{l2_norm, normalize_l2, NORM_TOLERANCE};
pub use types::{EmbedRequest, EmbedResponse};
