//! Embedding client abstraction and provider adapters.
//!
//! The pipeline talks to embedding backends through [`EmbeddingClient`]. Two
//! remote adapters (Ollama and OpenAI-compatible endpoints) live in
//! [`remote`]; a deterministic hashing client backs offline runs and tests.
//! Every client upholds the same contract: N input texts produce exactly N
//! vectors, in input order, all of the configured dimension.

use crate::config::{Config, ConfigError, EmbeddingProvider};
use async_trait::async_trait;
use thiserror::Error;

mod remote;

pub use remote::{OllamaEmbeddingClient, OpenAiEmbeddingClient};

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The remote call failed after exhausting its retry budget.
    #[error("embedding call failed: {0}")]
    CallFailed(String),
    /// A produced vector did not match the configured dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the collection.
        expected: usize,
        /// Dimension actually returned by the provider.
        actual: usize,
    },
    /// The provider returned a different number of vectors than inputs.
    #[error("embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Number of chunk texts submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    ///
    /// The result preserves input order and count; implementations fail the
    /// whole batch rather than returning a partial, misaligned set.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Verify the batch post-conditions shared by all clients.
pub(crate) fn check_batch(
    vectors: &[Vec<f32>],
    expected_count: usize,
    expected_dimension: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    for vector in vectors {
        if vector.len() != expected_dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: expected_dimension,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}

/// Deterministic local embedding client.
///
/// Folds the text's bytes into the vector slots and L2-normalizes the result.
/// Not semantically meaningful, but stable across runs, which is what offline
/// smoke tests and air-gapped deployments need.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a hashing client producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % self.dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::CallFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        let expected = texts.len();
        let embeddings: Vec<Vec<f32>> =
            texts.into_iter().map(|text| self.encode(&text)).collect();
        check_batch(&embeddings, expected, self.dimension)?;
        Ok(embeddings)
    }
}

/// Build an embedding client matching the configured provider.
pub fn client_for(config: &Config) -> Result<Box<dyn EmbeddingClient>, ConfigError> {
    match config.embedding_provider {
        EmbeddingProvider::Hash => Ok(Box::new(HashEmbeddingClient::new(
            config.embedding_dimension,
        ))),
        EmbeddingProvider::Ollama => {
            let base_url = config
                .embedding_url
                .clone()
                .ok_or_else(|| ConfigError::MissingVariable("EMBEDDING_URL".to_string()))?;
            Ok(Box::new(OllamaEmbeddingClient::new(
                base_url,
                config.embedding_model.clone(),
                config.embedding_dimension,
                config.embedding_max_retries,
            )))
        }
        EmbeddingProvider::OpenAI => {
            let base_url = config
                .embedding_url
                .clone()
                .ok_or_else(|| ConfigError::MissingVariable("EMBEDDING_URL".to_string()))?;
            Ok(Box::new(OpenAiEmbeddingClient::new(
                base_url,
                config.openai_api_key.clone(),
                config.embedding_model.clone(),
                config.embedding_dimension,
                config.embedding_max_retries,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_client_is_deterministic() {
        let client = HashEmbeddingClient::new(16);
        let first = client
            .generate_embeddings(vec!["photosynthesis".to_string()])
            .await
            .expect("embeddings");
        let second = client
            .generate_embeddings(vec!["photosynthesis".to_string()])
            .await
            .expect("embeddings");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn hash_client_preserves_count_order_and_dimension() {
        let client = HashEmbeddingClient::new(8);
        let texts: Vec<String> = (0..5).map(|i| format!("chunk {i}")).collect();
        let vectors = client
            .generate_embeddings(texts.clone())
            .await
            .expect("embeddings");

        assert_eq!(vectors.len(), texts.len());
        for vector in &vectors {
            assert_eq!(vector.len(), 8);
        }
        // Distinct inputs land on distinct vectors, so order is observable.
        assert_ne!(vectors[0], vectors[1]);
        let direct = client
            .generate_embeddings(vec!["chunk 3".to_string()])
            .await
            .expect("embeddings");
        assert_eq!(vectors[3], direct[0]);
    }

    #[tokio::test]
    async fn hash_client_handles_empty_batch() {
        let client = HashEmbeddingClient::new(4);
        let vectors = client.generate_embeddings(Vec::new()).await.expect("empty");
        assert!(vectors.is_empty());
    }

    #[test]
    fn check_batch_flags_count_mismatch() {
        let vectors = vec![vec![0.0_f32; 4]];
        let error = check_batch(&vectors, 2, 4).unwrap_err();
        assert!(matches!(
            error,
            EmbeddingError::CountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn check_batch_flags_dimension_mismatch() {
        let vectors = vec![vec![0.0_f32; 4], vec![0.0_f32; 3]];
        let error = check_batch(&vectors, 2, 4).unwrap_err();
        assert!(matches!(
            error,
            EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }
}
