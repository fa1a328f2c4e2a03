use futures::{stream, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tvrec_common::{Result, TvRecError};
use tvrec_embed::{l2_norm, Embedder, NORM_TOLERANCE};

use crate::corpus::SeriesDocument;
use crate::store::VectorStore;

/// Outcome of a build beyond the store itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Documents handed to the builder
    pub total: usize,

    /// Documents that became store rows
    pub embedded: usize,

    /// Ids of documents dropped for empty text, in input order
    pub skipped_ids: Vec<i64>,
}

/// Builds a `VectorStore` from documents through an embedding provider
pub struct StoreBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    concurrency: usize,
    show_progress: bool,
}

impl StoreBuilder {
    /// Create new builder (64 texts per batch, 4 batches in flight)
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: 64,
            concurrency: 4,
            show_progress: false,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Draw a progress bar on stderr while embedding
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Embed every non-empty document and pair it with its record.
    ///
    /// Batches may complete out of order; rows are reassembled in input
    /// order before the store is built.
    pub async fn build(&self, documents: Vec<SeriesDocument>) -> Result<(VectorStore, BuildReport)> {
        let total = documents.len();
        let mut texts = Vec::with_capacity(total);
        let mut records = Vec::with_capacity(total);
        let mut skipped_ids = Vec::new();

        for doc in documents {
            let text = doc.text.trim();
            if text.is_empty() {
                skipped_ids.push(doc.record.id);
                continue;
            }
            texts.push(text.to_string());
            records.push(doc.record);
        }

        if !skipped_ids.is_empty() {
            warn!(
                "Skipped {} documents with empty text: {:?}",
                skipped_ids.len(),
                skipped_ids
            );
        }
        info!(
            "Embedding {} documents with {} (batch_size={}, concurrency={})",
            texts.len(),
            self.embedder.model(),
            self.batch_size,
            self.concurrency
        );

        let progress = self.progress_bar(texts.len() as u64);
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size).enumerate())
            .map(|(batch, chunk)| async move {
                let vectors = self.embedder.embed_batch(chunk).await?;
                if vectors.len() != chunk.len() {
                    return Err(TvRecError::embedding(format!(
                        "batch {}: sent {} texts, received {} vectors",
                        batch,
                        chunk.len(),
                        vectors.len()
                    )));
                }
                debug!("Embedded batch {} ({} texts)", batch, chunk.len());
                Ok::<_, TvRecError>(vectors)
            })
            .buffered(self.concurrency)
            .inspect_ok(|vectors| progress.inc(vectors.len() as u64))
            .try_collect()
            .await?;
        progress.finish_and_clear();

        let rows: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        for (row, vector) in rows.iter().enumerate() {
            let norm = l2_norm(vector);
            if (norm - 1.0).abs() > NORM_TOLERANCE {
                return Err(TvRecError::NotNormalized { row, norm });
            }
        }

        let store =
            VectorStore::from_rows(rows, records)?.with_embedding_model(self.embedder.model());
        let report = BuildReport {
            total,
            embedded: store.len(),
            skipped_ids,
        };

        info!(
            "Build complete - {} rows, dimension {:?}, {} skipped",
            report.embedded,
            store.dimension(),
            report.skipped_ids.len()
        );
        Ok((store, report))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} embedded ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
