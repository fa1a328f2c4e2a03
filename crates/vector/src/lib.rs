//! TvRec vector store and exact top-k search
//!
//! Build a store from series documents, persist it as `embeddings.npy` +
//! `meta.json`, load it read-only and rank items by cosine similarity.

mod builder;
mod corpus;
mod engine;
mod manifest;
mod search;
mod store;
mod types;

pub use builder::{BuildReport, StoreBuilder};
pub use corpus::{load_documents, parse_jsonl, RawSeriesRecord, SeriesDocument};
pub use engine::Recommender;
pub use manifest::{StoreManifest, MANIFEST_FILE};
pub use search::{search, top_k_indices};
pub use store::{
    resolve_store_dir, resolve_store_dir_in, ResolvedStore, VectorStore, EMBEDDINGS_FILE, FALLBACK_DIR, META_FILE,
};
pub use types::{ItemRecord, RankedResult};
