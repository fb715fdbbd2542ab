//! Embedding provider trait for generating vector embeddings from text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Whether text is embedded as a stored document or as a search query.
///
/// Some models are trained with asymmetric instructions for the two sides;
/// providers that do not distinguish simply ignore the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    /// Passage text that will be indexed.
    Document,
    /// Query text used to search the index.
    Query,
}

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Cohere, a local
/// hashing model, ...) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Every vector returned must have exactly [`dimensions`](EmbeddingProvider::dimensions)
/// elements in both modes, and the same input must always produce the same
/// vector.
///
/// # Example
///
/// ```rust,ignore
/// use newsrag::{EmbeddingProvider, HashEmbedder};
///
/// let provider = HashEmbedder::default();
/// let embedding = provider.embed_query("rail freight").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding for better throughput.
    async fn embed_batch(&self, texts: &[&str], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text, mode).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Embed passage texts in document mode.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts, EmbeddingMode::Document).await
    }

    /// Embed a search query in query mode.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text, EmbeddingMode::Query).await
    }
}

/// Verify that `vectors` has one entry per input and each has `dimensions` elements.
pub(crate) fn check_vectors(
    provider: &str,
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimensions: usize,
) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(RagError::EmbeddingError {
            provider: provider.to_string(),
            message: format!("expected {expected_count} embeddings, got {}", vectors.len()),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(RagError::EmbeddingError {
            provider: provider.to_string(),
            message: format!("expected {dimensions}-dimensional embedding, got {}", bad.len()),
        });
    }
    if let Some(position) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
        return Err(RagError::EmbeddingError {
            provider: provider.to_string(),
            message: format!("embedding {position} contains non-finite values"),
        });
    }
    Ok(())
}

/// Routes document-mode and query-mode requests to two different providers.
///
/// Both providers must agree on dimensionality, otherwise query vectors
/// could not be compared against the index.
///
/// # Example
///
/// ```rust,ignore
/// let embedder = DualEmbedder::new(Arc::new(local_model), Arc::new(cohere))?;
/// ```
#[derive(Clone)]
pub struct DualEmbedder {
    document: Arc<dyn EmbeddingProvider>,
    query: Arc<dyn EmbeddingProvider>,
}

impl DualEmbedder {
    /// Pair a document-mode provider with a query-mode provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the two providers report
    /// different dimensions.
    pub fn new(
        document: Arc<dyn EmbeddingProvider>,
        query: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if document.dimensions() != query.dimensions() {
            return Err(RagError::ConfigError(format!(
                "document embedder '{}' has {} dimensions but query embedder '{}' has {}",
                document.name(),
                document.dimensions(),
                query.name(),
                query.dimensions()
            )));
        }
        Ok(Self { document, query })
    }

    fn provider_for(&self, mode: EmbeddingMode) -> &Arc<dyn EmbeddingProvider> {
        match mode {
            EmbeddingMode::Document => &self.document,
            EmbeddingMode::Query => &self.query,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for DualEmbedder {
    fn name(&self) -> &str {
        "Dual"
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        self.provider_for(mode).embed(text, mode).await
    }

    async fn embed_batch(&self, texts: &[&str], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        self.provider_for(mode).embed_batch(texts, mode).await
    }

    fn dimensions(&self) -> usize {
        self.document.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashEmbedder;

    struct Constant {
        dims: usize,
        value: f32,
    }

    #[async_trait]
    impl EmbeddingProvider for Constant {
        fn name(&self) -> &str {
            "Constant"
        }

        async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
            Ok(vec![self.value; self.dims])
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    #[tokio::test]
    async fn dual_routes_by_mode() {
        let dual = DualEmbedder::new(
            Arc::new(Constant { dims: 2, value: 1.0 }),
            Arc::new(Constant { dims: 2, value: 2.0 }),
        )
        .unwrap();
        assert_eq!(dual.embed_documents(&["a", "b"]).await.unwrap(), vec![vec![1.0; 2]; 2]);
        assert_eq!(dual.embed_query("q").await.unwrap(), vec![2.0; 2]);
    }

    #[test]
    fn dual_rejects_mismatched_dimensions() {
        let err = DualEmbedder::new(
            Arc::new(HashEmbedder::new(8)),
            Arc::new(Constant { dims: 4, value: 0.0 }),
        )
        .err()
        .unwrap();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn check_vectors_flags_wrong_length() {
        let err = check_vectors("X", &[vec![0.0; 3]], 1, 4).unwrap_err();
        assert!(err.to_string().contains("expected 4-dimensional"));
        assert!(check_vectors("X", &[vec![0.0; 4]], 2, 4).is_err());
        assert!(check_vectors("X", &[vec![0.0; 4]], 1, 4).is_ok());
    }

    #[test]
    fn check_vectors_flags_non_finite_values() {
        let vectors = [vec![1.0, 0.0], vec![f32::NAN, 1.0]];
        let err = check_vectors("X", &vectors, 2, 2).unwrap_err();
        assert_eq!(err.kind(), "embedding");
        assert!(err.to_string().contains("embedding 1 contains non-finite values"));
        assert!(check_vectors("X", &[vec![f32::INFINITY, 0.0]], 1, 2).is_err());
    }
}
