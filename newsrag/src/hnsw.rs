//! HNSW (Hierarchical Navigable Small World) index.
//!
//! Approximate nearest neighbor search over inner-product similarity.
//!
//! # Algorithm Overview
//! HNSW builds a multi-layer graph where:
//! - Higher layers have fewer nodes (exponential decay)
//! - Search starts from the top layer, greedily descending
//! - Layer 0 holds every node and is searched with a beam of width `ef`
//!
//! Node ids are dense (`0..n`), so nodes live in plain vectors indexed by id.
//! Level assignment uses a seeded LCG: rebuilding from the same vectors
//! yields the same graph.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::debug;

use crate::config::HnswConfig;
use crate::error::Result;
use crate::index::{Hit, VectorIndex, check_query, compare_hits, inner_product, validate_vectors};

const LEVEL_CAP: usize = 16;
const RNG_SEED: u64 = 100;

/// Heap entry ordered by score, then by lower id.
#[derive(Debug, Clone, Copy)]
struct Scored {
    score: f32,
    id: usize,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score).then_with(|| other.id.cmp(&self.id))
    }
}

/// An HNSW graph over an immutable vector list.
///
/// # Example
/// ```ignore
/// let index = HnswIndex::build(embeddings, &HnswConfig::default())?;
/// let hits = index.search(&query, 10)?;
/// ```
#[derive(Debug, Clone)]
pub struct HnswIndex {
    m: usize,
    m_max0: usize,
    ef_construction: usize,
    ef_search: usize,
    level_mult: f64,
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
    /// `links[id][level]` is the neighbor list of `id` on `level`.
    links: Vec<Vec<Vec<usize>>>,
    entry_point: usize,
    max_level: usize,
    rng_state: u64,
}

impl HnswIndex {
    /// Build the graph by inserting `vectors` in order; ids are positions.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`](crate::RagError::IndexError) if
    /// `vectors` is empty or not uniformly sized.
    pub fn build(vectors: Vec<Vec<f32>>, config: &HnswConfig) -> Result<Self> {
        let dimensions = validate_vectors(&vectors)?;
        let m = config.m.max(2);
        let mut index = Self {
            m,
            m_max0: m * 2,
            ef_construction: config.ef_construction.max(m),
            ef_search: config.ef_search.max(1),
            level_mult: 1.0 / (m as f64).ln(),
            dimensions,
            links: Vec::with_capacity(vectors.len()),
            vectors,
            entry_point: 0,
            max_level: 0,
            rng_state: RNG_SEED,
        };
        for id in 0..index.vectors.len() {
            index.insert(id);
        }
        debug!(
            nodes = index.vectors.len(),
            max_level = index.max_level,
            m = index.m,
            ef_construction = index.ef_construction,
            "built hnsw index"
        );
        Ok(index)
    }

    /// Highest layer in the graph.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    fn select_level(&mut self) -> usize {
        self.rng_state =
            self.rng_state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let uniform = ((self.rng_state >> 11) as f64 / (1u64 << 53) as f64).max(f64::MIN_POSITIVE);
        ((-uniform.ln() * self.level_mult).floor() as usize).min(LEVEL_CAP)
    }

    fn insert(&mut self, id: usize) {
        let level = self.select_level();
        self.links.push(vec![Vec::new(); level + 1]);

        if id == 0 {
            self.entry_point = 0;
            self.max_level = level;
            return;
        }

        let query = self.vectors[id].clone();
        let mut entry = self.entry_point;

        // Phase 1: greedy descent through layers above the node's level
        for layer in (level + 1..=self.max_level).rev() {
            entry = self.greedy_closest(entry, &query, layer);
        }

        // Phase 2: connect on every shared layer
        for layer in (0..=level.min(self.max_level)).rev() {
            let found = self.search_layer(entry, &query, self.ef_construction, layer);
            let cap = if layer == 0 { self.m_max0 } else { self.m };
            let selected: Vec<usize> = found.iter().take(cap).map(|hit| hit.0).collect();

            for &neighbor in &selected {
                self.links[neighbor][layer].push(id);
                if self.links[neighbor][layer].len() > cap {
                    self.prune(neighbor, layer, cap);
                }
            }
            self.links[id][layer] = selected;

            if let Some(&(best, _)) = found.first() {
                entry = best;
            }
        }

        if level > self.max_level {
            self.entry_point = id;
            self.max_level = level;
        }
    }

    /// Keep the `cap` neighbors of `node` on `layer` most similar to it.
    fn prune(&mut self, node: usize, layer: usize, cap: usize) {
        let base = &self.vectors[node];
        let mut scored: Vec<Hit> = self.links[node][layer]
            .iter()
            .map(|&n| (n, inner_product(&self.vectors[n], base)))
            .collect();
        scored.sort_by(compare_hits);
        scored.truncate(cap);
        self.links[node][layer] = scored.into_iter().map(|hit| hit.0).collect();
    }

    fn neighbors(&self, id: usize, layer: usize) -> &[usize] {
        self.links[id].get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Greedy walk on one layer towards the single most similar node.
    fn greedy_closest(&self, entry: usize, query: &[f32], layer: usize) -> usize {
        let mut current = entry;
        let mut best = inner_product(&self.vectors[current], query);
        loop {
            let mut changed = false;
            for &neighbor in self.neighbors(current, layer) {
                let score = inner_product(&self.vectors[neighbor], query);
                if score > best {
                    best = score;
                    current = neighbor;
                    changed = true;
                }
            }
            if !changed {
                return current;
            }
        }
    }

    /// Beam search on one layer; returns up to `ef` hits sorted best first.
    fn search_layer(&self, entry: usize, query: &[f32], ef: usize, layer: usize) -> Vec<Hit> {
        let mut visited = vec![false; self.vectors.len()];
        let mut candidates: BinaryHeap<Scored> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();

        let start = Scored { score: inner_product(&self.vectors[entry], query), id: entry };
        visited[entry] = true;
        candidates.push(start);
        results.push(Reverse(start));

        while let Some(candidate) = candidates.pop() {
            let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
            if candidate.score < worst && results.len() >= ef {
                break;
            }

            for &neighbor in self.neighbors(candidate.id, layer) {
                if visited[neighbor] {
                    continue;
                }
                visited[neighbor] = true;

                let scored =
                    Scored { score: inner_product(&self.vectors[neighbor], query), id: neighbor };
                let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
                if results.len() < ef || scored.score > worst {
                    candidates.push(scored);
                    results.push(Reverse(scored));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut hits: Vec<Hit> = results.into_iter().map(|r| (r.0.id, r.0.score)).collect();
        hits.sort_by(compare_hits);
        hits
    }

    fn exhaustive(&self, query: &[f32], k: usize) -> Vec<Hit> {
        let mut hits: Vec<Hit> =
            self.vectors.iter().enumerate().map(|(id, v)| (id, inner_product(v, query))).collect();
        hits.sort_by(compare_hits);
        hits.truncate(k);
        hits
    }
}

impl VectorIndex for HnswIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        check_query(query, self.dimensions)?;
        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut entry = self.entry_point;
        for layer in (1..=self.max_level).rev() {
            entry = self.greedy_closest(entry, query, layer);
        }

        let ef = self.ef_search.max(k);
        let mut hits = self.search_layer(entry, query, ef, 0);
        if hits.len() < k {
            // Part of the graph was unreachable from the entry point.
            return Ok(self.exhaustive(query, k));
        }
        hits.truncate(k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
