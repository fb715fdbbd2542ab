//! Cohere embedding and rerank providers.
//!
//! This module is only available when the `cohere` feature is enabled. Both
//! providers call the Cohere v1 REST API directly with `reqwest`.
//!
//! ```rust,ignore
//! use newsrag::cohere::{CohereEmbeddingProvider, CohereReranker};
//!
//! let embedder = CohereEmbeddingProvider::from_env()?;
//! let reranker = CohereReranker::from_env()?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{EmbeddingMode, EmbeddingProvider, check_vectors};
use crate::error::{RagError, Result};
use crate::reranker::{RerankHit, Reranker};

const PROVIDER: &str = "Cohere";

const COHERE_EMBED_URL: &str = "https://api.cohere.com/v1/embed";
const COHERE_RERANK_URL: &str = "https://api.cohere.com/v1/rerank";

/// The default embedding model.
const DEFAULT_EMBED_MODEL: &str = "embed-english-v3.0";

/// Output size of `embed-english-v3.0`.
const DEFAULT_DIMENSIONS: usize = 1024;

/// The default rerank model.
const DEFAULT_RERANK_MODEL: &str = "rerank-english-v2.0";

/// Most texts Cohere accepts in one embed request.
pub const MAX_EMBED_BATCH: usize = 96;

fn api_key_from_env() -> Result<String> {
    let key = std::env::var("COHERE_API_KEY")
        .map_err(|_| RagError::ConfigError("COHERE_API_KEY environment variable not set".into()))?;
    if key.is_empty() {
        return Err(RagError::ConfigError("Cohere API key must not be empty".into()));
    }
    Ok(key)
}

fn client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::ConfigError(format!("failed to build Cohere HTTP client: {e}")))
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Send a JSON request and decode a JSON response, reporting failures as
/// `(status, detail)` text for the caller to wrap in its own error variant.
async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> std::result::Result<R, String>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.message).unwrap_or(body);
        return Err(format!("API returned {status}: {detail}"));
    }

    response.json().await.map_err(|e| format!("failed to parse response: {e}"))
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Cohere embed API.
///
/// Document mode sends `input_type = "search_document"` and query mode
/// `input_type = "search_query"`, as the v3 models expect.
pub struct CohereEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl CohereEmbeddingProvider {
    /// Create a provider with the default model (`embed-english-v3.0`, 1024 dimensions).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Cohere API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_EMBED_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a provider using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Use another embed model; `dimensions` must match its output size.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Fail requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = client_with_timeout(timeout)?;
        Ok(self)
    }
}

fn input_type(mode: EmbeddingMode) -> &'static str {
    match mode {
        EmbeddingMode::Document => "search_document",
        EmbeddingMode::Query => "search_query",
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [&'a str],
    input_type: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text], mode).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBED_BATCH) {
            debug!(
                provider = PROVIDER,
                batch_size = batch.len(),
                model = %self.model,
                mode = ?mode,
                "embedding batch"
            );
            let body =
                EmbedRequest { model: &self.model, texts: batch, input_type: input_type(mode) };
            let response: EmbedResponse =
                post_json(&self.client, COHERE_EMBED_URL, &self.api_key, &body).await.map_err(
                    |message| {
                        error!(provider = PROVIDER, error = %message, "embed request failed");
                        RagError::EmbeddingError { provider: PROVIDER.into(), message }
                    },
                )?;
            check_vectors(PROVIDER, &response.embeddings, batch.len(), self.dimensions)?;
            vectors.extend(response.embeddings);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Rerank ─────────────────────────────────────────────────────────

/// A [`Reranker`] backed by the Cohere rerank API.
///
/// The response's `results[].index` already refers to the submitted
/// candidate order, so hits map straight back to ANN candidates.
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl CohereReranker {
    /// Create a reranker with the default model (`rerank-english-v2.0`).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Cohere API key must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), api_key, model: DEFAULT_RERANK_MODEL.into() })
    }

    /// Create a reranker using the `COHERE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Use another rerank model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Fail requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = client_with_timeout(timeout)?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

impl From<RerankResult> for RerankHit {
    fn from(result: RerankResult) -> Self {
        Self { index: result.index, score: result.relevance_score }
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        debug!(
            reranker = PROVIDER,
            candidate_count = candidates.len(),
            top_n,
            model = %self.model,
            "rerank request"
        );
        let body = RerankRequest {
            model: &self.model,
            query,
            documents: candidates,
            top_n: top_n.min(candidates.len()),
        };
        let response: RerankResponse =
            post_json(&self.client, COHERE_RERANK_URL, &self.api_key, &body).await.map_err(
                |message| {
                    error!(reranker = PROVIDER, error = %message, "rerank request failed");
                    RagError::RerankerError { reranker: PROVIDER.into(), message }
                },
            )?;

        Ok(response.results.into_iter().map(RerankHit::from).collect())
    }
}
