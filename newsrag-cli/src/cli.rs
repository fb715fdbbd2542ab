//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use newsrag::DataSource;

/// newsrag - retrieve grounding passages and annotate citations
///
/// Documents are read from a JSON array of article records
/// (`title`, `scrapped_text`, `URL`) or page records (`file`, `page`, `text`).
#[derive(Parser, Debug)]
#[command(name = "newsrag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML file with retriever settings (chunk_words, top_k, hnsw, ...)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Embedding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmbedderKind {
    /// Local feature-hashing embedder, no network access
    #[default]
    Hash,
    /// Cohere embed API (needs COHERE_API_KEY)
    Cohere,
}

/// Reranking backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RerankerKind {
    /// Keep the ANN order
    None,
    /// Local keyword-overlap scorer
    #[default]
    Keyword,
    /// Cohere rerank API (needs COHERE_API_KEY)
    Cohere,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a vectorstore from documents and retrieve passages for a query
    Retrieve {
        /// JSON file holding the document batch
        #[arg(short, long)]
        documents: PathBuf,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// ANN candidates fetched before reranking
        #[arg(long)]
        top_k: Option<usize>,

        /// Passages kept after reranking
        #[arg(long)]
        rerank_top_n: Option<usize>,

        #[arg(long, value_enum, default_value_t)]
        embedder: EmbedderKind,

        #[arg(long, value_enum, default_value_t)]
        reranker: RerankerKind,

        /// Request timeout in seconds for remote providers
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Print passages as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render citation spans of a generated response as source labels
    Annotate {
        /// File holding the generated response text
        #[arg(short, long)]
        text: PathBuf,

        /// JSON array of {start, end, document_ids}
        #[arg(short, long)]
        citations: PathBuf,

        /// JSON array of cited documents, for the reference list
        #[arg(short, long)]
        documents: Option<PathBuf>,

        /// Source of the cited documents; selects the id prefix to strip
        #[arg(short, long, default_value_t = DataSource::StaticNews)]
        source: DataSource,

        /// Print structured segments as JSON instead of inline markdown
        #[arg(long)]
        json: bool,
    },

    /// Show how a document batch splits into chunks
    Chunk {
        /// JSON file holding the document batch
        #[arg(short, long)]
        documents: PathBuf,

        /// Words per chunk (overrides the config file)
        #[arg(long)]
        chunk_words: Option<usize>,
    },
}
