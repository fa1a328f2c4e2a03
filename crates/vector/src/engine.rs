use std::sync::Arc;
use tracing::{debug, info, warn};
use tvrec_common::{Result, TvRecError};
use tvrec_embed::Embedder;

use crate::search::search;
use crate::store::VectorStore;
use crate::types::RankedResult;

/// Free-text recommendation over a loaded store
///
/// The store is shared read-only, so one recommender can serve concurrent
/// queries without locking.
#[derive(Clone)]
pub struct Recommender {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Recommender {
    /// Create new recommender
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        if let Some(model) = store.embedding_model() {
            if model != embedder.model() {
                warn!(
                    "Store was built with '{}' but queries use '{}'; scores may be meaningless",
                    model,
                    embedder.model()
                );
            }
        }
        info!(
            "Recommender ready - {} items, dimension {:?}",
            store.len(),
            store.dimension()
        );

        Self { store, embedder }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Embed the query text and return the top `k` items
    pub async fn recommend(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TvRecError::invalid_input("Query cannot be empty"));
        }
        if k == 0 {
            return Err(TvRecError::InvalidK(0));
        }

        debug!("Recommending for: {} (k={})", query, k);
        let query_vector = self.embedder.embed_one(query).await?;
        search(&self.store, &query_vector, k)
    }
}
