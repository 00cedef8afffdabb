//! HNSW Vector Index for Chunk Search
//!
//! Wraps the HNSW algorithm for nearest-neighbour search over document chunk
//! embeddings.
//!
//! # Architecture
//!
//! - In-memory index, separate from SQLite
//! - Rebuilt from the `chunks` table when the store opens
//! - Keys are SQLite chunk row ids
//!
//! # HNSW Parameters
//!
//! - **M**: Number of bi-directional links per node (default: 16)
//! - **efConstruction**: Candidate list size during construction (default: 200)
//! - **efSearch**: Candidate list size during search (passed per query)

use hnsw_rs::prelude::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 100_000;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },
}

struct IndexState {
    hnsw: Hnsw<'static, f32, DistCosine>,
    /// Internal HNSW id -> chunk row id
    id_map: HashMap<usize, i64>,
    next_id: usize,
}

impl IndexState {
    fn empty() -> Self {
        let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);
        Self {
            hnsw: Hnsw::<'static, f32, DistCosine>::new(
                DEFAULT_M,
                DEFAULT_MAX_ELEMENTS,
                nb_layer,
                DEFAULT_EF_CONSTRUCTION,
                DistCosine {},
            ),
            id_map: HashMap::new(),
            next_id: 0,
        }
    }
}

/// Nearest-neighbour index over chunk embeddings
///
/// # Examples
///
/// ```no_run
/// use evident_store::vector_index::ChunkIndex;
///
/// let index = ChunkIndex::new(3);
/// index.add(1, &[1.0, 0.0, 0.0]).unwrap();
/// let results = index.search(&[1.0, 0.0, 0.0], 5, 64).unwrap();
/// assert_eq!(results[0].0, 1);
/// ```
pub struct ChunkIndex {
    dimension: usize,
    state: Mutex<IndexState>,
}

impl ChunkIndex {
    /// Create a new index for embeddings of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: Mutex::new(IndexState::empty()),
        }
    }

    fn state(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Add a chunk embedding
    pub fn add(&self, chunk_id: i64, embedding: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(embedding)?;

        let mut state = self.state();
        let internal_id = state.next_id;
        state.next_id += 1;
        state.id_map.insert(internal_id, chunk_id);

        let owned = embedding.to_vec();
        state.hnsw.insert((&owned, internal_id));
        Ok(())
    }

    /// Find the `k` nearest chunks
    ///
    /// Returns `(chunk_id, cosine_similarity)` pairs, most similar first.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(i64, f32)>, VectorIndexError> {
        self.check_dimension(query)?;

        let state = self.state();
        if state.id_map.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<(i64, f32)> = state
            .hnsw
            .search(query, k, ef_search.max(k))
            .into_iter()
            .filter_map(|neighbour| {
                state
                    .id_map
                    .get(&neighbour.d_id)
                    .map(|&chunk_id| (chunk_id, 1.0 - neighbour.distance))
            })
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.state().id_map.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every vector
    pub fn clear(&self) {
        *self.state() = IndexState::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_creation() {
        let index = ChunkIndex::new(384);
        assert_eq!(index.dimension, 384);
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = ChunkIndex::new(384);
        let result = index.add(1, &[0.1; 128]);
        assert!(matches!(result, Err(VectorIndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = ChunkIndex::new(3);
        index.add(10, &[1.0, 0.0, 0.0]).unwrap();
        index.add(20, &[0.0, 1.0, 0.0]).unwrap();
        index.add(30, &[0.7071, 0.7071, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3, 64).unwrap();
        assert_eq!(results[0].0, 10);
        assert!(results[0].1 > 0.99);
        assert_eq!(results[1].0, 30);
        assert!(results[1].1 > 0.5);
        assert_eq!(results[2].0, 20);
        assert!(results[2].1 < 0.1);
    }

    #[test]
    fn test_empty_search() {
        let index = ChunkIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5, 64).unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let index = ChunkIndex::new(3);
        index.add(1, &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(index.len(), 1);
        index.clear();
        assert!(index.is_empty());
    }
}
