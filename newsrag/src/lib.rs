//! # newsrag
//!
//! Retrieval core and citation annotation for a news chat assistant.
//!
//! ## Overview
//!
//! A batch of scraped articles or uploaded file pages is chunked into
//! fixed-size word segments, embedded, and indexed once. Queries are then
//! embedded, matched against the index by inner product, and reranked into a
//! short list of grounding passages for a text-generation service. When the
//! service answers with citation spans, [`annotate`] and [`annotate_inline`]
//! turn them into compact source labels.
//!
//! - [`Retriever`] - builds an immutable [`Vectorstore`] per document batch
//! - [`WordChunker`] - fixed word-count chunking
//! - [`HashEmbedder`] - deterministic local feature-hashing embeddings
//! - [`HnswIndex`] / [`FlatIndex`] - approximate and exact inner-product search
//! - [`KeywordReranker`] / [`NoOpReranker`] - local rerankers
//!
//! ## Features
//!
//! - `cohere` - [`cohere::CohereEmbeddingProvider`] and [`cohere::CohereReranker`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use newsrag::{Document, HashEmbedder, KeywordReranker, Retriever};
//!
//! let retriever = Retriever::builder()
//!     .embedding_provider(Arc::new(HashEmbedder::default()))
//!     .reranker(Arc::new(KeywordReranker))
//!     .build()?;
//!
//! let store = retriever
//!     .build(&[Document::article("Port strike ends", "Dock workers ...", "https://...")])
//!     .await?;
//! for passage in store.retrieve("port strike", 10, 5).await? {
//!     println!("{:.3} {}", passage.score, passage.provenance);
//! }
//! ```

pub mod chunking;
pub mod citation;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod flat;
pub mod hashing;
pub mod hnsw;
pub mod index;
pub mod reranker;
pub mod retriever;

#[cfg(feature = "cohere")]
pub mod cohere;

pub use chunking::{Chunker, WordChunker, chunk, chunk_documents, word_count};
pub use citation::{
    Citation, CitedDocument, DataSource, HIGHLIGHT_COLOR, Segment, annotate, annotate_inline,
    label, reference_list,
};
pub use config::{HnswConfig, IndexKind, RetrieverConfig, RetrieverConfigBuilder};
pub use document::{Chunk, Document, Provenance, RetrievedPassage, SourceKind};
pub use embedding::{DualEmbedder, EmbeddingMode, EmbeddingProvider};
pub use error::{RagError, Result};
pub use flat::FlatIndex;
pub use hashing::HashEmbedder;
pub use hnsw::HnswIndex;
pub use index::{Hit, VectorIndex, build_index};
pub use reranker::{KeywordReranker, NoOpReranker, RerankHit, Reranker, check_hits};
pub use retriever::{Retriever, RetrieverBuilder, Vectorstore};
