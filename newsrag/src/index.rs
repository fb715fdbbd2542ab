//! Vector index trait for inner-product nearest neighbor search.

use std::cmp::Ordering;

use crate::config::{HnswConfig, IndexKind};
use crate::error::{RagError, Result};
use crate::flat::FlatIndex;
use crate::hnsw::HnswIndex;

/// A search hit: `(id, score)` where `id` is the vector's 0-based position
/// in the list the index was built from and `score` is the inner product.
pub type Hit = (usize, f32);

/// A read-only index over a fixed list of vectors.
///
/// Indexes are built once from the complete vector list and never mutated
/// afterwards, so concurrent searches need no locking.
///
/// # Example
///
/// ```rust,ignore
/// use newsrag::{FlatIndex, VectorIndex};
///
/// let index = FlatIndex::build(embeddings)?;
/// let hits = index.search(&query_embedding, 10)?;
/// ```
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Return up to `k` hits ordered by descending score (ties by ascending id).
    ///
    /// If the index holds fewer than `k` vectors, every vector is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the query dimension does not match.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of indexed vectors.
    fn dimensions(&self) -> usize;
}

/// Build the index implementation selected by `kind`.
pub fn build_index(
    kind: IndexKind,
    hnsw: &HnswConfig,
    vectors: Vec<Vec<f32>>,
) -> Result<Box<dyn VectorIndex>> {
    let index: Box<dyn VectorIndex> = match kind {
        IndexKind::Hnsw => Box::new(HnswIndex::build(vectors, hnsw)?),
        IndexKind::Flat => Box::new(FlatIndex::build(vectors)?),
    };
    Ok(index)
}

/// Check that `vectors` is non-empty and uniformly sized; returns the dimension.
pub(crate) fn validate_vectors(vectors: &[Vec<f32>]) -> Result<usize> {
    let first = vectors.first().ok_or_else(|| {
        RagError::IndexError("cannot build an index from zero vectors".to_string())
    })?;
    let dimensions = first.len();
    if dimensions == 0 {
        return Err(RagError::IndexError("vectors must have at least one dimension".to_string()));
    }
    if let Some((id, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
        return Err(RagError::IndexError(format!(
            "vector {id} has {} dimensions, expected {dimensions}",
            v.len()
        )));
    }
    Ok(dimensions)
}

pub(crate) fn check_query(query: &[f32], dimensions: usize) -> Result<()> {
    if query.len() != dimensions {
        return Err(RagError::IndexError(format!(
            "query has {} dimensions, index has {dimensions}",
            query.len()
        )));
    }
    Ok(())
}

pub(crate) fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Descending score, then ascending id.
pub(crate) fn compare_hits(a: &Hit, b: &Hit) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_vectors() {
        let err = validate_vectors(&[vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("vector 1 has 1 dimensions"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(validate_vectors(&[]).is_err());
        assert!(validate_vectors(&[vec![]]).is_err());
    }

    #[test]
    fn hits_sort_by_score_then_id() {
        let mut hits = vec![(3, 0.5), (1, 0.9), (0, 0.5)];
        hits.sort_by(compare_hits);
        assert_eq!(hits, vec![(1, 0.9), (0, 0.5), (3, 0.5)]);
    }

    #[test]
    fn hit_order_is_total_with_nan_scores() {
        let mut hits: Vec<Hit> =
            (0..40).map(|id| (id, if id % 3 == 0 { f32::NAN } else { id as f32 })).collect();
        hits.sort_by(compare_hits);
        assert_eq!(hits.len(), 40);
        assert!(hits.iter().take_while(|h| h.1.is_nan()).count() > 0);
    }

    #[test]
    fn builds_requested_kind() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let flat = build_index(IndexKind::Flat, &HnswConfig::default(), vectors.clone()).unwrap();
        let hnsw = build_index(IndexKind::Hnsw, &HnswConfig::default(), vectors).unwrap();
        assert_eq!(flat.len(), 2);
        assert_eq!(hnsw.dimensions(), 2);
        assert_eq!(flat.search(&[0.0, 1.0], 1).unwrap()[0].0, 1);
        assert_eq!(hnsw.search(&[0.0, 1.0], 1).unwrap()[0].0, 1);
    }
}
