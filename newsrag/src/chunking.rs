//! Document chunking.
//!
//! A [`Chunker`] splits one document's text into segments; [`chunk_documents`]
//! runs it over a whole batch and assigns each segment its position, which
//! later doubles as the vector index id.

use crate::document::{Chunk, Document};

/// A strategy for splitting document text into chunk texts.
pub trait Chunker: Send + Sync {
    /// Split text into chunk texts, in reading order.
    ///
    /// Returns an empty `Vec` if the text contains no words.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits text into groups of a fixed number of whitespace-separated words.
///
/// Every group holds exactly `chunk_words` words except the last, which may
/// be shorter. Words are re-joined with single spaces, so joining a
/// document's chunks with `" "` gives back its whitespace-normalized text.
///
/// # Example
///
/// ```rust,ignore
/// use newsrag::WordChunker;
///
/// let chunker = WordChunker::new(150);
/// let parts = chunker.split(&article_text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordChunker {
    chunk_words: usize,
}

impl WordChunker {
    /// Create a new `WordChunker`. A `chunk_words` of zero is treated as one.
    pub fn new(chunk_words: usize) -> Self {
        Self { chunk_words: chunk_words.max(1) }
    }

    /// Words per chunk.
    pub fn chunk_words(&self) -> usize {
        self.chunk_words
    }
}

impl Default for WordChunker {
    fn default() -> Self {
        Self::new(150)
    }
}

impl Chunker for WordChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words.chunks(self.chunk_words).map(|group| group.join(" ")).collect()
    }
}

/// Number of whitespace-separated words in a document.
pub fn word_count(document: &Document) -> usize {
    document.text().split_whitespace().count()
}

/// Chunk a batch of documents, preserving document order then chunk order.
///
/// Each chunk inherits its parent's provenance unchanged. Empty documents
/// contribute no chunks.
pub fn chunk_documents(documents: &[Document], chunker: &dyn Chunker) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for (document_index, document) in documents.iter().enumerate() {
        let provenance = document.provenance();
        for text in chunker.split(document.text()) {
            chunks.push(Chunk {
                position: chunks.len(),
                document_index,
                text,
                provenance: provenance.clone(),
            });
        }
    }
    chunks
}

/// Chunk a batch into `chunk_words`-word segments with a [`WordChunker`].
pub fn chunk(documents: &[Document], chunk_words: usize) -> Vec<Chunk> {
    chunk_documents(documents, &WordChunker::new(chunk_words))
}
