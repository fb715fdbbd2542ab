//! Exact brute-force vector index.
//!
//! [`FlatIndex`] scores every stored vector against the query. It is exact,
//! needs no tuning, and is fast enough for the few thousand chunks a single
//! session produces; it also serves as the reference for the HNSW index.

use crate::error::Result;
use crate::index::{Hit, VectorIndex, check_query, compare_hits, inner_product, validate_vectors};

/// An exact inner-product index over an immutable vector list.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index over `vectors`; ids are their positions.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`](crate::RagError::IndexError) if
    /// `vectors` is empty or not uniformly sized.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = validate_vectors(&vectors)?;
        Ok(Self { dimensions, vectors })
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        check_query(query, self.dimensions)?;
        let mut scored: Vec<Hit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, vector)| (id, inner_product(vector, query)))
            .collect();
        scored.sort_by(compare_hits);
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
