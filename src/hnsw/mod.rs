//! HNSW (Hierarchical Navigable Small World) index module.

pub mod graph;
pub mod neighbor_queue;

pub use graph::{HnswGraph, HnswParams};

use crate::distance::SpaceType;
use crate::error::Result;
use crate::index::Index;
use crate::vector::{StoredVector, Vector};

/// An HNSW-based approximate nearest neighbor index.
///
/// When graph traversal yields fewer than `min(k, len)` results (a
/// neighborhood cut off by deletions), the search falls back to an
/// exhaustive scan so result counts match the flat index.
#[derive(Debug)]
pub struct HnswIndex {
    graph: HnswGraph,
}

impl HnswIndex {
    /// Create a new HNSW index with the given space type and default parameters.
    pub fn new(space: SpaceType) -> Self {
        Self::with_params(space, HnswParams::default())
    }

    pub fn with_params(space: SpaceType, params: HnswParams) -> Self {
        Self {
            graph: HnswGraph::new(space, params),
        }
    }

    /// Search with a specific ef value for runtime tuning.
    pub fn search_with_ef(&self, query: &Vector, k: usize, ef: usize) -> Vec<(usize, f32)> {
        let space = self.graph.space();
        let k = k.min(self.graph.len());
        if k == 0 {
            return Vec::new();
        }
        let mut found = self.graph.search_knn(query.as_slice(), k, ef);
        if found.len() < k {
            tracing::debug!(
                found = found.len(),
                wanted = k,
                "hnsw traversal came up short, scanning"
            );
            found = self.graph.scan(query.as_slice(), k);
        }
        found
            .into_iter()
            .map(|n| (n.id, space.score_from_key(n.key)))
            .collect()
    }
}

impl Index for HnswIndex {
    fn add(&mut self, id: usize, vector: StoredVector) -> Result<()> {
        self.graph.insert(id, vector)
    }

    fn remove(&mut self, id: usize) -> Option<StoredVector> {
        self.graph.remove(id)
    }

    fn get_vector(&self, id: usize) -> Option<&StoredVector> {
        self.graph.get_vector(id)
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        Ok(self.search_with_ef(query, k, self.graph.params().ef_search))
    }

    fn space(&self) -> SpaceType {
        self.graph.space()
    }

    fn len(&self) -> usize {
        self.graph.len()
    }
}
