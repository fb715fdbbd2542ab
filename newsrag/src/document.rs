//! Data types for documents, chunks, and retrieved passages.

use serde::{Deserialize, Serialize};

/// A source document delivered by a document-loading collaborator.
///
/// The two shapes mirror the two ways documents reach the assistant: a
/// scraped news article, or one page of an uploaded file. The record with a
/// `file` field is a [`Document::Page`]; anything else must be an article.
///
/// ```rust,ignore
/// let doc: Document = serde_json::from_str(
///     r#"{"title": "Rail link approved", "scrapped_text": "...", "URL": "https://..."}"#,
/// )?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document {
    /// One page of a locally uploaded file.
    Page {
        /// File name as uploaded.
        file: String,
        /// Page label, e.g. `"Page 3"`.
        page: String,
        /// Extracted page text.
        text: String,
    },
    /// A scraped web article.
    Article {
        /// Article headline.
        title: String,
        /// Scraped body text (may be a placeholder if scraping failed).
        #[serde(alias = "scrapped_text")]
        text: String,
        /// Source URL.
        #[serde(alias = "URL")]
        url: String,
    },
}

impl Document {
    /// Create a web article document.
    pub fn article(
        title: impl Into<String>,
        text: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::Article { title: title.into(), text: text.into(), url: url.into() }
    }

    /// Create a local file page document.
    pub fn page(file: impl Into<String>, page: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Page { file: file.into(), page: page.into(), text: text.into() }
    }

    /// The text that gets chunked.
    pub fn text(&self) -> &str {
        match self {
            Self::Article { text, .. } | Self::Page { text, .. } => text,
        }
    }

    /// All non-text fields of the document.
    pub fn provenance(&self) -> Provenance {
        match self {
            Self::Article { title, url, .. } => {
                Provenance::Article { title: title.clone(), url: url.clone() }
            }
            Self::Page { file, page, .. } => {
                Provenance::Page { file: file.clone(), page: page.clone() }
            }
        }
    }
}

/// Where a chunk or passage came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Provenance {
    /// A page of a local file.
    Page {
        /// File name.
        file: String,
        /// Page label.
        page: String,
    },
    /// A scraped article.
    Article {
        /// Article headline.
        title: String,
        /// Source URL.
        url: String,
    },
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page { file, page } => write!(f, "{file}: [{page}]"),
            Self::Article { title, url } => write!(f, "[{title}]({url})"),
        }
    }
}

/// The kind of documents a vectorstore was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Only scraped articles.
    Articles,
    /// Only local file pages.
    Pages,
    /// Both shapes in one batch.
    Mixed,
}

impl SourceKind {
    /// Classify a batch of documents. Returns `None` for an empty batch.
    pub fn of(documents: &[Document]) -> Option<Self> {
        let pages = documents.iter().filter(|d| matches!(d, Document::Page { .. })).count();
        match (pages, documents.len()) {
            (_, 0) => None,
            (0, _) => Some(Self::Articles),
            (p, n) if p == n => Some(Self::Pages),
            _ => Some(Self::Mixed),
        }
    }
}

/// A fixed-size word segment of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the batch's chunk list; also the vector index id.
    pub position: usize,
    /// Index of the parent document in the input batch.
    pub document_index: usize,
    /// Space-joined words of this chunk.
    pub text: String,
    /// Provenance copied from the parent document.
    pub provenance: Provenance,
}

/// A chunk returned by retrieval, with its final relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Position of the source chunk in the vectorstore.
    pub position: usize,
    /// The chunk text.
    pub text: String,
    /// Provenance of the source document.
    pub provenance: Provenance,
    /// Reranker relevance score (higher is more relevant).
    pub score: f32,
}
