//! End-to-end tests for building vectorstores and retrieving passages.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use newsrag::{
    Document, EmbeddingMode, EmbeddingProvider, HashEmbedder, IndexKind, KeywordReranker,
    Provenance, RagError, RerankHit, Reranker, Result, Retriever, RetrieverConfig, SourceKind,
};

fn words(prefix: &str, n: usize) -> String {
    (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(" ")
}

/// Three articles of 300, 0 and 450 words.
fn scenario_documents() -> Vec<Document> {
    vec![
        Document::article("Harbour expansion", words("harbour", 300), "https://news/a"),
        Document::article("Empty scrape", "", "https://news/b"),
        Document::article("Council budget", words("budget", 450), "https://news/c"),
    ]
}

fn retriever_with(reranker: Arc<dyn Reranker>) -> Retriever {
    Retriever::builder()
        .embedding_provider(Arc::new(HashEmbedder::new(64)))
        .reranker(reranker)
        .build()
        .unwrap()
}

/// Reverses the candidate order and records what it was given.
#[derive(Default)]
struct ReversingReranker {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Reranker for ReversingReranker {
    fn name(&self) -> &str {
        "Reversing"
    }

    async fn rerank(
        &self,
        _query: &str,
        candidates: &[&str],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        *self.seen.lock().unwrap() = candidates.iter().map(|c| c.to_string()).collect();
        Ok((0..candidates.len())
            .rev()
            .take(top_n)
            .map(|index| RerankHit { index, score: index as f32 })
            .collect())
    }
}

/// Returns a hit that points past the candidate list.
struct OutOfRangeReranker;

#[async_trait]
impl Reranker for OutOfRangeReranker {
    fn name(&self) -> &str {
        "OutOfRange"
    }

    async fn rerank(&self, _: &str, candidates: &[&str], _: usize) -> Result<Vec<RerankHit>> {
        Ok(vec![RerankHit { index: candidates.len(), score: 1.0 }])
    }
}

/// Fails every request.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "Failing".into(),
            message: "service unavailable".into(),
        })
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Claims 8 dimensions but returns 3.
struct ShortEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortEmbedder {
    fn name(&self) -> &str {
        "Short"
    }

    async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Returns a NaN component for any text mentioning `poison`.
struct NanEmbedder {
    poison: &'static str,
}

#[async_trait]
impl EmbeddingProvider for NanEmbedder {
    fn name(&self) -> &str {
        "Nan"
    }

    async fn embed(&self, text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        if text.contains(self.poison) {
            Ok(vec![f32::NAN, 1.0])
        } else {
            Ok(vec![1.0, text.len() as f32])
        }
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Counts batch requests and delegates to a hash embedder.
#[derive(Default)]
struct CountingEmbedder {
    batches: AtomicUsize,
    inner: HashEmbedder,
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn name(&self) -> &str {
        "Counting"
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        self.inner.embed(text, mode).await
    }

    async fn embed_batch(&self, texts: &[&str], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts, mode).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[tokio::test]
async fn scenario_300_0_450_words_yields_five_traceable_passages() {
    let retriever = retriever_with(Arc::new(KeywordReranker));
    let documents = scenario_documents();
    let store = retriever.build(&documents).await.unwrap();

    assert_eq!(store.len(), 5);
    assert_eq!(store.document_count(), 3);
    assert_eq!(store.word_count(), 750);
    assert_eq!(store.source_kind(), SourceKind::Articles);
    let per_document: Vec<usize> = (0..3)
        .map(|d| store.chunks().iter().filter(|c| c.document_index == d).count())
        .collect();
    assert_eq!(per_document, vec![2, 0, 3]);

    let passages = store.retrieve("harbour budget", 10, 5).await.unwrap();
    assert_eq!(passages.len(), 5);

    let mut positions: Vec<usize> = passages.iter().map(|p| p.position).collect();
    positions.sort();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);

    let sources = [&documents[0], &documents[2]].map(Document::provenance);
    for passage in &passages {
        assert!(sources.contains(&passage.provenance));
        assert_eq!(passage.text, store.chunks()[passage.position].text);
    }
}

#[tokio::test]
async fn rerank_indices_map_back_to_ann_candidates() {
    let reranker = Arc::new(ReversingReranker::default());
    let store = retriever_with(reranker.clone()).build(&scenario_documents()).await.unwrap();

    let passages = store.retrieve("harbour", 4, 3).await.unwrap();
    let seen = reranker.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 4);
    assert_eq!(passages.len(), 3);
    for (rank, passage) in passages.iter().enumerate() {
        assert_eq!(passage.text, seen[seen.len() - 1 - rank]);
        assert_eq!(passage.score, (seen.len() - 1 - rank) as f32);
    }
}

#[tokio::test]
async fn keyword_reranking_surfaces_the_matching_article() {
    let documents = vec![
        Document::article(
            "Storm closes coastal roads",
            "Heavy storm winds closed coastal roads and ferry routes overnight.",
            "https://news/storm",
        ),
        Document::article(
            "Library reopens",
            "The central library reopened after renovation with longer opening hours.",
            "https://news/library",
        ),
        Document::page("minutes.pdf", "Page 4", "Council approved the library renovation budget."),
    ];
    let store = retriever_with(Arc::new(KeywordReranker)).build(&documents).await.unwrap();
    assert_eq!(store.source_kind(), SourceKind::Mixed);

    let passages = store.retrieve("which roads did the storm close", 10, 1).await.unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(
        passages[0].provenance,
        Provenance::Article {
            title: "Storm closes coastal roads".into(),
            url: "https://news/storm".into()
        }
    );
}

#[tokio::test]
async fn single_chunk_batch_can_be_queried() {
    let retriever = retriever_with(Arc::new(KeywordReranker));
    let store = retriever
        .build(&[Document::page("memo.pdf", "Page 1", "one short page")])
        .await
        .unwrap();
    assert_eq!(store.len(), 1);
    let passages = store.retrieve_default("short page").await.unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].position, 0);
}

#[tokio::test]
async fn flat_and_hnsw_stores_retrieve_the_same_passages() {
    let documents = scenario_documents();
    let build = |index: IndexKind| {
        Retriever::builder()
            .config(RetrieverConfig::builder().chunk_words(40).index(index).build().unwrap())
            .embedding_provider(Arc::new(HashEmbedder::default()))
            .build()
            .unwrap()
    };
    let hnsw = build(IndexKind::Hnsw).build(&documents).await.unwrap();
    let flat = build(IndexKind::Flat).build(&documents).await.unwrap();
    let a = hnsw.retrieve("budget12 harbour7", 10, 5).await.unwrap();
    let b = flat.retrieve("budget12 harbour7", 10, 5).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn empty_inputs_are_invalid() {
    let retriever = retriever_with(Arc::new(KeywordReranker));

    let err = retriever.build(&[]).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let blank = [Document::article("a", "   ", "u"), Document::page("f", "Page 1", "")];
    let err = retriever.build(&blank).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    let store = retriever.build(&scenario_documents()).await.unwrap();
    assert_eq!(store.retrieve("  ", 10, 5).await.unwrap_err().kind(), "invalid_input");
    assert_eq!(store.retrieve("q", 0, 5).await.unwrap_err().kind(), "invalid_input");
}

#[tokio::test]
async fn embedding_failure_becomes_a_pipeline_error() {
    let retriever =
        Retriever::builder().embedding_provider(Arc::new(FailingEmbedder)).build().unwrap();
    let err = retriever.build(&scenario_documents()).await.unwrap_err();
    assert_eq!(err.kind(), "pipeline");
    assert!(err.to_string().contains("service unavailable"));
}

#[tokio::test]
async fn wrong_dimension_embeddings_are_rejected() {
    let retriever =
        Retriever::builder().embedding_provider(Arc::new(ShortEmbedder)).build().unwrap();
    let err = retriever.build(&scenario_documents()).await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)));
    assert!(err.to_string().contains("expected 8-dimensional embedding"));
}

#[tokio::test]
async fn non_finite_embeddings_fail_without_panicking() {
    let documents: Vec<Document> = (0..60)
        .map(|i| Document::article(format!("t{i}"), format!("w{i}"), format!("https://news/{i}")))
        .collect();
    let flat = RetrieverConfig::builder().index(IndexKind::Flat).build().unwrap();

    let retriever = Retriever::builder()
        .config(flat.clone())
        .embedding_provider(Arc::new(NanEmbedder { poison: "w3" }))
        .build()
        .unwrap();
    let err = retriever.build(&documents).await.unwrap_err();
    assert_eq!(err.kind(), "pipeline");
    assert!(err.to_string().contains("non-finite"));

    let retriever = Retriever::builder()
        .config(flat)
        .embedding_provider(Arc::new(NanEmbedder { poison: "abc" }))
        .build()
        .unwrap();
    let store = retriever.build(&documents).await.unwrap();
    let err = store.retrieve("abc", 10, 5).await.unwrap_err();
    assert_eq!(err.kind(), "pipeline");
    assert!(err.to_string().contains("query embedding failed"));
}

#[tokio::test]
async fn invalid_rerank_hits_become_a_pipeline_error() {
    let store = retriever_with(Arc::new(OutOfRangeReranker))
        .build(&scenario_documents())
        .await
        .unwrap();
    let err = store.retrieve("harbour", 10, 5).await.unwrap_err();
    assert_eq!(err.kind(), "pipeline");
    assert!(err.to_string().contains("out of range"));
}

#[tokio::test]
async fn chunks_are_embedded_in_configured_batches() {
    let embedder = Arc::new(CountingEmbedder::default());
    let retriever = Retriever::builder()
        .config(RetrieverConfig::builder().embed_batch_size(2).build().unwrap())
        .embedding_provider(embedder.clone())
        .build()
        .unwrap();
    retriever.build(&scenario_documents()).await.unwrap();
    assert_eq!(embedder.batches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn builder_requires_an_embedding_provider() {
    let err = Retriever::builder().build().err().unwrap();
    assert_eq!(err.kind(), "config");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_share_one_store() {
    let store = Arc::new(
        retriever_with(Arc::new(KeywordReranker)).build(&scenario_documents()).await.unwrap(),
    );
    let expected = store.retrieve("harbour", 10, 5).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.retrieve("harbour", 10, 5).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }
}
