//! newsrag - command-line launcher for the retrieval core
//!
//! Loads an already-scraped document batch from JSON, builds a vectorstore,
//! and prints reranked passages; or renders a generated response's citation
//! spans as compact source labels.

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, EmbedderKind, RerankerKind};
use newsrag::cohere::{CohereEmbeddingProvider, CohereReranker};
use newsrag::{
    Citation, CitedDocument, DataSource, Document, EmbeddingProvider, HashEmbedder,
    KeywordReranker, NoOpReranker, Reranker, Retriever, RetrieverConfig, Segment, annotate,
    annotate_inline, chunk, reference_list,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may live in a local .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Retrieve {
            documents,
            query,
            top_k,
            rerank_top_n,
            embedder,
            reranker,
            timeout,
            json,
        } => {
            let config = override_retrieval(config, top_k, rerank_top_n)?;
            let timeout = Duration::from_secs(timeout);
            let retriever = Retriever::builder()
                .config(config)
                .embedding_provider(make_embedder(embedder, timeout)?)
                .reranker(make_reranker(reranker, timeout)?)
                .build()?;

            let documents: Vec<Document> = read_json(&documents)?;
            let store = retriever.build(&documents).await?;
            let passages = store.retrieve_default(&query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&passages)?);
            } else {
                for (rank, passage) in passages.iter().enumerate() {
                    println!("{}. [{:.3}] {}", rank + 1, passage.score, passage.provenance);
                    println!("   {}", passage.text);
                }
            }
        }

        Commands::Annotate { text, citations, documents, source, json } => {
            let response = std::fs::read_to_string(&text)
                .with_context(|| format!("failed to read response text {}", text.display()))?;
            let citations: Vec<Citation> = read_json(&citations)?;
            debug!(citation_count = citations.len(), source = %source, "annotating response");

            if json {
                let segments: Vec<Segment> = annotate(&response, &citations, source)?;
                println!("{}", serde_json::to_string_pretty(&segments)?);
            } else {
                println!("{}", annotate_inline(&response, &citations, source)?);
            }

            if let Some(path) = documents {
                let cited: Vec<CitedDocument> = read_json(&path)?;
                print_references(&cited, source);
            }
        }

        Commands::Chunk { documents, chunk_words } => {
            let config = override_chunking(config, chunk_words)?;
            let chunk_words = config.chunk_words;
            let documents: Vec<Document> = read_json(&documents)?;
            let chunks = chunk(&documents, chunk_words);
            for (index, document) in documents.iter().enumerate() {
                let count = chunks.iter().filter(|c| c.document_index == index).count();
                println!("{count:>4} chunks  {}", document.provenance());
            }
            println!("{:>4} chunks total ({chunk_words} words each)", chunks.len());
        }
    }

    Ok(())
}

/// Read retriever settings from a TOML file, or use the defaults.
fn load_config(path: Option<&Path>) -> Result<RetrieverConfig> {
    let Some(path) = path else {
        return Ok(RetrieverConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: RetrieverConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate()?;
    info!(path = %path.display(), "loaded retriever config");
    Ok(config)
}

/// Apply `--top-k` / `--rerank-top-n`. A lone `--top-k` below the
/// configured `rerank_top_n` lowers it to match.
fn override_retrieval(
    config: RetrieverConfig,
    top_k: Option<usize>,
    rerank_top_n: Option<usize>,
) -> Result<RetrieverConfig> {
    let top_k = top_k.unwrap_or(config.top_k);
    let rerank_top_n = rerank_top_n.unwrap_or(config.rerank_top_n.min(top_k));
    let config = RetrieverConfig { top_k, rerank_top_n, ..config };
    config.validate()?;
    Ok(config)
}

fn override_chunking(
    config: RetrieverConfig,
    chunk_words: Option<usize>,
) -> Result<RetrieverConfig> {
    let chunk_words = chunk_words.unwrap_or(config.chunk_words);
    let config = RetrieverConfig { chunk_words, ..config };
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn make_embedder(kind: EmbedderKind, timeout: Duration) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match kind {
        EmbedderKind::Hash => Arc::new(HashEmbedder::default()),
        EmbedderKind::Cohere => {
            Arc::new(CohereEmbeddingProvider::from_env()?.with_timeout(timeout)?)
        }
    };
    Ok(embedder)
}

fn make_reranker(kind: RerankerKind, timeout: Duration) -> Result<Arc<dyn Reranker>> {
    let reranker: Arc<dyn Reranker> = match kind {
        RerankerKind::None => Arc::new(NoOpReranker),
        RerankerKind::Keyword => Arc::new(KeywordReranker),
        RerankerKind::Cohere => Arc::new(CohereReranker::from_env()?.with_timeout(timeout)?),
    };
    Ok(reranker)
}

fn print_references(cited: &[CitedDocument], source: DataSource) {
    println!();
    println!("Relevant Articles:");
    for line in reference_list(cited, source) {
        println!("{line}");
    }
}
