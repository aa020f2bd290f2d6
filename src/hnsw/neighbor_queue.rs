//! Priority queues for HNSW search, ordered by rank key (lower ranks first).

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A graph node paired with its rank key against the current query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub key: f32,
    pub id: usize,
}

impl Neighbor {
    pub fn new(id: usize, key: f32) -> Self {
        Self { key, id }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Worse neighbors compare greater: higher key, then later insertion.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Upper bound on the heap capacity reserved up front; larger sets grow on demand.
const MAX_PREALLOC: usize = 1024;

/// Bounded result set with the worst neighbor on top.
pub struct ResultSet {
    heap: BinaryHeap<Neighbor>,
    limit: usize,
}

impl ResultSet {
    pub fn new(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit.min(MAX_PREALLOC) + 1),
            limit: limit.max(1),
        }
    }

    /// Whether `n` would make it into the set.
    pub fn admits(&self, n: &Neighbor) -> bool {
        self.heap.len() < self.limit || self.heap.peek().map_or(true, |worst| n < worst)
    }

    /// Insert, evicting the worst entry once over the limit.
    pub fn push(&mut self, n: Neighbor) {
        self.heap.push(n);
        if self.heap.len() > self.limit {
            self.heap.pop();
        }
    }

    pub fn worst(&self) -> Option<&Neighbor> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a Vec, best first.
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

/// Candidate frontier with the best neighbor on top.
#[derive(Default)]
pub struct CandidateQueue {
    heap: BinaryHeap<Reverse<Neighbor>>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, n: Neighbor) {
        self.heap.push(Reverse(n));
    }

    pub fn pop(&mut self) -> Option<Neighbor> {
        self.heap.pop().map(|Reverse(n)| n)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
