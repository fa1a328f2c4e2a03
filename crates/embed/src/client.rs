use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use tvrec_common::{Result, TvRecError};

use crate::embedder::Embedder;
use crate::normalize::normalize_l2;
use crate::types::{EmbedRequest, EmbedResponse};

const MAX_RETRIES: u32 = 3;

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| TvRecError::network(format!("Failed to create HTTP client: {}", e)))?;

        let model = model.into();
        info!("Ollama client initialized: {} (model={})", base_url, model);
        Ok(Self {
            base_url,
            model,
            client,
        })
    }

    /// Test connection to Ollama
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TvRecError::network(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }

    /// Generate embeddings with custom retry count
    async fn embed_with_retry(&self, texts: &[String], max_retries: u32) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);

        debug!(
            "Generating embeddings - Model: {}, Batch size: {}",
            self.model,
            texts.len()
        );

        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
            truncate: Some(true),
        };

        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.try_embed(&url, &request).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    if attempt < max_retries {
                        let delay = std::time::Duration::from_secs(2u64.pow(attempt - 1));
                        tracing::warn!(
                            "Embedding request failed (attempt {}/{}): {}. Retrying in {:?}...",
                            attempt,
                            max_retries,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TvRecError::embedding("All retries failed")))
    }

    /// Single attempt to generate embeddings
    async fn try_embed(&self, url: &str, request: &EmbedRequest) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| TvRecError::network(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| TvRecError::network(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await.map_err(|e| {
            TvRecError::serialization(format!("Failed to parse embedding response: {}", e))
        })?;

        finish_embeddings(result.embeddings, request.input.len())
    }
}

/// Check the provider answered every input and normalize each vector
fn finish_embeddings(mut embeddings: Vec<Vec<f32>>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if embeddings.len() != expected {
        return Err(TvRecError::embedding(format!(
            "expected {} embeddings, provider returned {}",
            expected,
            embeddings.len()
        )));
    }

    for (i, vector) in embeddings.iter_mut().enumerate() {
        if vector.is_empty() {
            return Err(TvRecError::embedding(format!("empty embedding for input {}", i)));
        }
        let norm = normalize_l2(vector);
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(TvRecError::embedding(format!(
                "embedding for input {} cannot be normalized (norm = {})",
                i, norm
            )));
        }
    }

    Ok(embeddings)
}

#[async_trait]
impl Embedder for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.embed_with_retry(texts, MAX_RETRIES).await?;
        debug!(
            "Received {} embeddings - Dimension: {}",
            embeddings.len(),
            embeddings.first().map_or(0, Vec::len)
        );
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{l2_norm, NORM_TOLERANCE};

    #[test]
    fn test_finish_normalizes() {
        let out = finish_embeddings(vec![vec![3.0, 4.0], vec![0.0, 2.0]], 2).unwrap();
        for v in &out {
            assert!((l2_norm(v) - 1.0).abs() < NORM_TOLERANCE);
        }
        assert_eq!(out[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_finish_rejects_count_mismatch() {
        let err = finish_embeddings(vec![vec![1.0]], 2).unwrap_err();
        assert!(matches!(err, TvRecError::Embedding(_)));
    }

    #[test]
    fn test_finish_rejects_zero_vector() {
        assert!(finish_embeddings(vec![vec![0.0, 0.0]], 1).is_err());
        assert!(finish_embeddings(vec![vec![]], 1).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "all-minilm").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "all-minilm");
    }
}
