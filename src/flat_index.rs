//! Brute-force flat index — exact O(n) top-k search

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::distance::SpaceType;
use crate::error::Result;
use crate::index::Index;
use crate::vector::{StoredVector, Vector};

/// Scans at or above this many vectors are spread across the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// A flat (brute-force) index that scores every stored vector.
#[derive(Debug)]
pub struct FlatIndex {
    vectors: BTreeMap<usize, StoredVector>,
    space: SpaceType,
}

impl FlatIndex {
    /// Create a new empty flat index with the given space type.
    pub fn new(space: SpaceType) -> Self {
        Self {
            vectors: BTreeMap::new(),
            space,
        }
    }

    /// Iterate over all (id, vector) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&usize, &StoredVector)> {
        self.vectors.iter()
    }
}

/// Keep the best `k` of `(id, key)` pairs, lower key first, ties by id.
pub(crate) fn top_k_by_key(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    let cmp = |a: &(usize, f32), b: &(usize, f32)| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0));
    if k < scored.len() {
        scored.select_nth_unstable_by(k, cmp);
        scored.truncate(k);
    }
    scored.sort_unstable_by(cmp);
    scored
}

impl Index for FlatIndex {
    fn add(&mut self, id: usize, vector: StoredVector) -> Result<()> {
        self.vectors.insert(id, vector);
        Ok(())
    }

    fn remove(&mut self, id: usize) -> Option<StoredVector> {
        self.vectors.remove(&id)
    }

    fn get_vector(&self, id: usize) -> Option<&StoredVector> {
        self.vectors.get(&id)
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        let q = query.as_slice();
        let q_norm = query.norm();
        let space = self.space;
        let key = |(&id, v): (&usize, &StoredVector)| (id, space.rank_key(space.score(q, q_norm, v)));

        let keyed: Vec<(usize, f32)> = if self.vectors.len() >= PARALLEL_SCAN_THRESHOLD {
            self.vectors.par_iter().map(key).collect()
        } else {
            self.vectors.iter().map(key).collect()
        };

        Ok(top_k_by_key(keyed, k)
            .into_iter()
            .map(|(id, key)| (id, space.score_from_key(key)))
            .collect())
    }

    fn space(&self) -> SpaceType {
        self.space
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
