//! Index trait for pluggable search backends

use crate::distance::SpaceType;
use crate::error::Result;
use crate::vector::{StoredVector, Vector};

/// A search index that supports insertion, removal, and top-k search.
///
/// Implementations use `usize` internal IDs assigned in insertion order;
/// the `VectorStore` handles String-to-usize mapping. Ties between equal
/// scores are broken by the smaller internal ID.
pub trait Index: Send + Sync + std::fmt::Debug {
    /// Add a vector with the given internal ID.
    fn add(&mut self, id: usize, vector: StoredVector) -> Result<()>;

    /// Remove the vector with the given internal ID, returning it if present.
    fn remove(&mut self, id: usize) -> Option<StoredVector>;

    /// Search for the `k` best matches of `query`.
    /// Returns `(id, score)` pairs ordered best first for the space type.
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>>;

    /// Retrieve a vector by its internal ID.
    fn get_vector(&self, id: usize) -> Option<&StoredVector>;

    /// The space type used by this index.
    fn space(&self) -> SpaceType;

    /// The number of vectors in this index.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
