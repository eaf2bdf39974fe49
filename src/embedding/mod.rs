//! Embedding generation for chunk and query text.

use crate::config::get_config;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Deterministic local embedding client.
///
/// Folds the text's bytes into a unit-norm vector of the configured dimension.
/// Identical text always yields an identical vector, which keeps indexing and
/// querying consistent without an external model server.
pub struct LocalHashEmbedder;

impl LocalHashEmbedder {
    /// Construct a new deterministic embedding client instance.
    pub const fn new() -> Self {
        Self
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];
        if text.is_empty() {
            return embedding;
        }

        let mut state: u32 = 0x811c_9dc5;
        for (idx, byte) in text.bytes().enumerate() {
            state = state.wrapping_mul(0x0100_0193) ^ u32::from(byte);
            let slot = (state as usize).wrapping_add(idx) % dimension;
            embedding[slot] += f32::from(byte) / 255.0;
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

impl Default for LocalHashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for LocalHashEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let dimension = get_config().embedding_dimension;
        tracing::debug!(dimension, batch = texts.len(), "Generating embeddings");

        if dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        Ok(texts
            .into_iter()
            .map(|text| Self::encode(&text, dimension))
            .collect())
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client() -> Box<dyn EmbeddingClient + Send + Sync> {
    Box::new(LocalHashEmbedder::new())
}
