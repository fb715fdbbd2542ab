//! Retrieval orchestrator.
//!
//! A [`Retriever`] composes a [`Chunker`], an [`EmbeddingProvider`] and a
//! [`Reranker`]. [`Retriever::build`] turns a document batch into an
//! immutable [`Vectorstore`] (chunk → embed → index); the vectorstore then
//! answers queries (embed → search → rerank).
//!
//! # Example
//!
//! ```rust,ignore
//! use newsrag::{HashEmbedder, KeywordReranker, Retriever, RetrieverConfig};
//!
//! let retriever = Retriever::builder()
//!     .config(RetrieverConfig::default())
//!     .embedding_provider(Arc::new(HashEmbedder::default()))
//!     .reranker(Arc::new(KeywordReranker))
//!     .build()?;
//!
//! let store = retriever.build(&documents).await?;
//! let passages = store.retrieve("what did the minister announce?", 10, 5).await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::{Chunker, WordChunker, chunk_documents, word_count};
use crate::config::RetrieverConfig;
use crate::document::{Chunk, Document, RetrievedPassage, SourceKind};
use crate::embedding::{EmbeddingProvider, check_vectors};
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, build_index};
use crate::reranker::{NoOpReranker, Reranker, check_hits};

/// Builds vectorstores from document batches.
///
/// Construct one via [`Retriever::builder()`]. A retriever holds no
/// per-batch state and can build any number of independent vectorstores.
pub struct Retriever {
    config: RetrieverConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
    chunker: Arc<dyn Chunker>,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Chunk, embed, and index a document batch.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `documents` is empty or contains no words.
    /// - [`RagError::PipelineError`] if embedding fails or returns vectors of
    ///   the wrong shape; the message carries the underlying cause.
    /// - [`RagError::IndexError`] if the index cannot be built.
    pub async fn build(&self, documents: &[Document]) -> Result<Vectorstore> {
        let source_kind = SourceKind::of(documents)
            .ok_or_else(|| RagError::InvalidInput("no documents to index".to_string()))?;

        // 1. Chunk every document
        let chunks = chunk_documents(documents, self.chunker.as_ref());
        if chunks.is_empty() {
            return Err(RagError::InvalidInput(format!(
                "{} documents contain no words to index",
                documents.len()
            )));
        }

        // 2. Embed chunk texts in batches
        let provider = self.embedding_provider.name().to_string();
        let dimensions = self.embedding_provider.dimensions();
        let mut vectors = Vec::with_capacity(chunks.len());
        for (batch_index, batch) in chunks.chunks(self.config.embed_batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            debug!(provider = %provider, batch_index, batch_size = texts.len(), "embedding chunks");

            let embedded = self
                .embedding_provider
                .embed_documents(&texts)
                .await
                .and_then(|embedded| {
                    check_vectors(&provider, &embedded, texts.len(), dimensions)?;
                    Ok(embedded)
                })
                .map_err(|e| {
                    error!(
                        provider = %provider,
                        batch_index,
                        error = %e,
                        "embedding failed during build"
                    );
                    RagError::PipelineError(format!("document embedding failed: {e}"))
                })?;
            vectors.extend(embedded);
        }

        // 3. Build the index
        let index = build_index(self.config.index, &self.config.hnsw, vectors)?;

        let words: usize = documents.iter().map(word_count).sum();
        info!(
            document_count = documents.len(),
            chunk_count = chunks.len(),
            word_count = words,
            source_kind = ?source_kind,
            index = ?self.config.index,
            "built vectorstore"
        );

        Ok(Vectorstore {
            config: self.config.clone(),
            embedding_provider: Arc::clone(&self.embedding_provider),
            reranker: Arc::clone(&self.reranker),
            chunks,
            index,
            source_kind,
            document_count: documents.len(),
            word_count: words,
        })
    }
}

/// The chunks, embeddings index, and providers of one document batch.
///
/// Read-only once built; share it behind an `Arc` to serve concurrent
/// queries. Build a new one when the document batch changes.
pub struct Vectorstore {
    config: RetrieverConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
    chunks: Vec<Chunk>,
    index: Box<dyn VectorIndex>,
    source_kind: SourceKind,
    document_count: usize,
    word_count: usize,
}

impl std::fmt::Debug for Vectorstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vectorstore")
            .field("embedding_provider", &self.embedding_provider.name())
            .field("reranker", &self.reranker.name())
            .field("chunks", &self.chunks.len())
            .field("dimensions", &self.index.dimensions())
            .field("source_kind", &self.source_kind)
            .finish()
    }
}

impl Vectorstore {
    /// All chunks, in position order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always `false`: a vectorstore is never built from zero chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Kind of documents in the batch.
    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    /// Number of documents in the batch, including empty ones.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Total words loaded across the batch.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Retrieve with the configured `top_k` and `rerank_top_n`.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<RetrievedPassage>> {
        self.retrieve(query, self.config.top_k, self.config.rerank_top_n).await
    }

    /// Embed the query, fetch `top_k` candidates, and rerank them to at most
    /// `rerank_top_n` passages in descending relevance.
    ///
    /// Fewer indexed chunks than `top_k`, or fewer candidates than
    /// `rerank_top_n`, simply yields fewer passages.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `query` is blank or either count is zero.
    /// - [`RagError::PipelineError`] if query embedding or reranking fails.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        rerank_top_n: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        if top_k == 0 || rerank_top_n == 0 {
            return Err(RagError::InvalidInput(format!(
                "top_k ({top_k}) and rerank_top_n ({rerank_top_n}) must be greater than zero"
            )));
        }

        // 1. Embed the query
        let provider = self.embedding_provider.name();
        let query_embedding = self
            .embedding_provider
            .embed_query(query)
            .await
            .and_then(|embedding| {
                let expected = self.index.dimensions();
                check_vectors(provider, std::slice::from_ref(&embedding), 1, expected)?;
                Ok(embedding)
            })
            .map_err(|e| {
                error!(provider, error = %e, "embedding failed during query");
                RagError::PipelineError(format!("query embedding failed: {e}"))
            })?;

        // 2. Search the index
        let hits = self.index.search(&query_embedding, top_k)?;
        debug!(top_k, candidates = ?hits.iter().map(|h| h.0).collect::<Vec<_>>(), "ann search");

        // 3. Rerank candidates, submitted in ANN order
        let texts: Vec<&str> =
            hits.iter().map(|&(position, _)| self.chunks[position].text.as_str()).collect();
        let reranker = self.reranker.name();
        let ranked = self
            .reranker
            .rerank(query, &texts, rerank_top_n)
            .await
            .and_then(|ranked| check_hits(reranker, ranked, texts.len(), rerank_top_n))
            .map_err(|e| {
                error!(reranker, error = %e, "reranking failed");
                RagError::PipelineError(format!("reranking failed: {e}"))
            })?;

        // 4. Map reranked positions back to chunks
        let passages: Vec<RetrievedPassage> = ranked
            .into_iter()
            .map(|hit| {
                let chunk = &self.chunks[hits[hit.index].0];
                RetrievedPassage {
                    position: chunk.position,
                    text: chunk.text.clone(),
                    provenance: chunk.provenance.clone(),
                    score: hit.score,
                }
            })
            .collect();

        info!(candidate_count = hits.len(), passage_count = passages.len(), "retrieval completed");

        Ok(passages)
    }
}

/// Builder for constructing a [`Retriever`].
///
/// `embedding_provider` is required. `config` defaults to
/// [`RetrieverConfig::default()`], `reranker` to [`NoOpReranker`], and
/// `chunker` to a [`WordChunker`] sized by `config.chunk_words`.
///
/// # Example
///
/// ```rust,ignore
/// let retriever = Retriever::builder()
///     .config(RetrieverConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .reranker(Arc::new(reranker))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RetrieverBuilder {
    config: Option<RetrieverConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RetrieverBuilder {
    /// Set the retriever configuration.
    pub fn config(mut self, config: RetrieverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Replace the default word chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`Retriever`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedding provider is missing
    /// or the configuration is invalid.
    pub fn build(self) -> Result<Retriever> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker = self
            .chunker
            .unwrap_or_else(|| Arc::new(WordChunker::new(config.chunk_words)) as Arc<dyn Chunker>);
        let reranker =
            self.reranker.unwrap_or_else(|| Arc::new(NoOpReranker) as Arc<dyn Reranker>);

        Ok(Retriever { config, embedding_provider, reranker, chunker })
    }
}
