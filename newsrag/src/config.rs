//! Configuration for the retrieval pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Which vector index implementation a vectorstore is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Approximate HNSW graph search.
    #[default]
    Hnsw,
    /// Exact brute-force inner product search.
    Flat,
}

/// Parameters of the HNSW graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Maximum neighbors per node on upper layers (layer 0 allows `2 * m`).
    pub m: usize,
    /// Beam width while inserting.
    pub ef_construction: usize,
    /// Beam width while searching; the effective value is `max(ef_search, k)`.
    pub ef_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self { m: 64, ef_construction: 512, ef_search: 400 }
    }
}

/// Configuration parameters for building and querying a vectorstore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Words per chunk.
    pub chunk_words: usize,
    /// Number of ANN candidates fetched before reranking.
    pub top_k: usize,
    /// Number of passages kept after reranking.
    pub rerank_top_n: usize,
    /// Maximum texts per embedding request while building.
    pub embed_batch_size: usize,
    /// Index implementation.
    pub index: IndexKind,
    /// HNSW parameters, used when `index` is [`IndexKind::Hnsw`].
    pub hnsw: HnswConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            chunk_words: 150,
            top_k: 10,
            rerank_top_n: 5,
            embed_batch_size: 96,
            index: IndexKind::Hnsw,
            hnsw: HnswConfig::default(),
        }
    }
}

impl RetrieverConfig {
    /// Create a new builder for constructing a [`RetrieverConfig`].
    pub fn builder() -> RetrieverConfigBuilder {
        RetrieverConfigBuilder::default()
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_words`, `top_k`, `rerank_top_n` or `embed_batch_size` is zero
    /// - `rerank_top_n > top_k`
    /// - `hnsw.m < 2`, `hnsw.ef_construction < hnsw.m`, or `hnsw.ef_search == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_words == 0 {
            return Err(RagError::ConfigError("chunk_words must be greater than zero".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.rerank_top_n == 0 {
            return Err(RagError::ConfigError("rerank_top_n must be greater than zero".to_string()));
        }
        if self.rerank_top_n > self.top_k {
            return Err(RagError::ConfigError(format!(
                "rerank_top_n ({}) must not exceed top_k ({})",
                self.rerank_top_n, self.top_k
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.hnsw.m < 2 {
            return Err(RagError::ConfigError(format!(
                "hnsw.m ({}) must be at least 2",
                self.hnsw.m
            )));
        }
        if self.hnsw.ef_construction < self.hnsw.m {
            return Err(RagError::ConfigError(format!(
                "hnsw.ef_construction ({}) must be at least hnsw.m ({})",
                self.hnsw.ef_construction, self.hnsw.m
            )));
        }
        if self.hnsw.ef_search == 0 {
            return Err(RagError::ConfigError(
                "hnsw.ef_search must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RetrieverConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrieverConfigBuilder {
    config: RetrieverConfig,
}

impl RetrieverConfigBuilder {
    /// Set the number of words per chunk.
    pub fn chunk_words(mut self, words: usize) -> Self {
        self.config.chunk_words = words;
        self
    }

    /// Set the number of ANN candidates.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of passages kept after reranking.
    pub fn rerank_top_n(mut self, n: usize) -> Self {
        self.config.rerank_top_n = n;
        self
    }

    /// Set the embedding request batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Select the index implementation.
    pub fn index(mut self, kind: IndexKind) -> Self {
        self.config.index = kind;
        self
    }

    /// Set the HNSW parameters.
    pub fn hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.config.hnsw = hnsw;
        self
    }

    /// Build the [`RetrieverConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RetrieverConfig::validate`].
    pub fn build(self) -> Result<RetrieverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
