//! Error types for the `newsrag` crate.

use thiserror::Error;

/// Errors that can occur while building a vectorstore, retrieving passages,
/// or annotating citations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied no usable input (empty document set, empty query,
    /// or a batch that produced no chunks).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index was built or queried with inconsistent vectors.
    #[error("Index error: {0}")]
    IndexError(String),

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// Citation spans were out of range, unordered, or overlapping.
    #[error("Citation error: {0}")]
    CitationError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the retrieval orchestration, wrapping the underlying cause.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// A stable, machine-readable name for the error class.
    ///
    /// Callers rendering a warning can show `kind()` next to the message
    /// without matching on every variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::EmbeddingError { .. } => "embedding",
            Self::IndexError(_) => "index",
            Self::RerankerError { .. } => "reranker",
            Self::CitationError(_) => "citation",
            Self::ConfigError(_) => "config",
            Self::PipelineError(_) => "pipeline",
        }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
