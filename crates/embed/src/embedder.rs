use async_trait::async_trait;
use tvrec_common::{Result, TvRecError};

/// Common trait for embedding providers
///
/// Implementations return one L2-normalized vector per input text, in input
/// order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier the vectors come from
    fn model(&self) -> &str;

    /// Embed a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| TvRecError::embedding("provider returned no vector"))
    }
}
