//! HNSW graph — core data structures and algorithms.
//!
//! Implements the Hierarchical Navigable Small World graph from:
//! "Efficient and robust approximate nearest neighbor search using
//!  Hierarchical Navigable Small World graphs" (Malkov & Yashunin, 2016/2018).
//!
//! The graph works on rank keys (see [`SpaceType::rank_key`]) so the same
//! search loop serves similarity and distance spaces alike.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::distance::SpaceType;
use crate::error::{EngineError, Result};
use crate::vector::StoredVector;

use super::neighbor_queue::{CandidateQueue, Neighbor, ResultSet};

/// Configuration parameters for the HNSW index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Max number of connections per node (layers > 0).
    pub m: usize,
    /// Max connections at layer 0 (typically 2 * m).
    pub m_max0: usize,
    /// Number of candidates during construction.
    pub ef_construction: usize,
    /// Number of candidates during search.
    pub ef_search: usize,
    /// Maximum number of layers.
    pub max_layers: usize,
    /// Fixed RNG seed for level generation; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::new(16, 200, 50)
    }
}

impl HnswParams {
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            m,
            m_max0: 2 * m,
            ef_construction,
            ef_search,
            max_layers: 16,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(EngineError::invalid("hnsw m must be at least 2"));
        }
        if self.m_max0 < self.m || self.ef_construction == 0 || self.ef_search == 0 {
            return Err(EngineError::invalid(
                "hnsw m_max0 must be >= m and ef values must be positive",
            ));
        }
        if self.max_layers == 0 {
            return Err(EngineError::invalid("hnsw max_layers must be positive"));
        }
        Ok(())
    }

    /// Level generation factor: 1 / ln(m).
    fn ml(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }
}

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
struct HnswNode {
    vector: StoredVector,
    /// Neighbors per layer. neighbors[l] is the list of neighbor IDs at layer l.
    neighbors: Vec<Vec<usize>>,
    level: usize,
}

/// The HNSW graph structure.
#[derive(Debug)]
pub struct HnswGraph {
    /// Live nodes keyed by internal ID. Removal drops the entry, so storage
    /// tracks the live count rather than the highest ID ever assigned.
    nodes: HashMap<usize, HnswNode>,
    /// Entry point node ID (highest-level node).
    entry_point: Option<usize>,
    max_level: usize,
    params: HnswParams,
    space: SpaceType,
    rng: StdRng,
}

impl HnswGraph {
    pub fn new(space: SpaceType, params: HnswParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes: HashMap::new(),
            entry_point: None,
            max_level: 0,
            params,
            space,
            rng,
        }
    }

    pub fn space(&self) -> SpaceType {
        self.space
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let level = (-r.ln() * self.params.ml()).floor() as usize;
        level.min(self.params.max_layers - 1)
    }

    fn node(&self, id: usize) -> Option<&HnswNode> {
        self.nodes.get(&id)
    }

    /// Rank key of a live node against the query; None for deleted slots.
    fn key_to(&self, query: &[f32], query_norm: f32, node_id: usize) -> Option<f32> {
        self.node(node_id).map(|node| {
            self.space
                .rank_key(self.space.score(query, query_norm, &node.vector))
        })
    }

    pub fn get_vector(&self, id: usize) -> Option<&StoredVector> {
        self.node(id).map(|n| &n.vector)
    }

    /// SEARCH-LAYER: Algorithm 2 from the HNSW paper.
    ///
    /// Returns up to `ef` neighbors of `query` on `layer`, best first.
    fn search_layer(
        &self,
        query: &[f32],
        query_norm: f32,
        ep: usize,
        ef: usize,
        layer: usize,
    ) -> Vec<Neighbor> {
        let mut visited = HashSet::new();
        let mut candidates = CandidateQueue::new();
        let mut results = ResultSet::new(ef);

        visited.insert(ep);
        if let Some(key) = self.key_to(query, query_norm, ep) {
            candidates.push(Neighbor::new(ep, key));
            results.push(Neighbor::new(ep, key));
        }

        while let Some(c) = candidates.pop() {
            if let Some(worst) = results.worst() {
                if results.len() >= ef && c > *worst {
                    break;
                }
            }

            let Some(node) = self.node(c.id) else {
                continue;
            };
            let Some(layer_neighbors) = node.neighbors.get(layer) else {
                continue;
            };

            for &neighbor_id in layer_neighbors {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let Some(key) = self.key_to(query, query_norm, neighbor_id) else {
                    continue;
                };
                let n = Neighbor::new(neighbor_id, key);
                if results.admits(&n) {
                    candidates.push(n);
                    results.push(n);
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Prune a node's neighbor list at a given layer to its `m` closest.
    fn prune_neighbors(&mut self, node_id: usize, layer: usize, m: usize) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        let Some(ids) = node.neighbors.get(layer) else {
            return;
        };
        let base = node.vector.to_vector();
        let base_norm = base.norm();

        let mut scored: Vec<Neighbor> = ids
            .iter()
            .filter_map(|&nid| {
                self.key_to(base.as_slice(), base_norm, nid)
                    .map(|key| Neighbor::new(nid, key))
            })
            .collect();
        scored.sort();
        scored.truncate(m);

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.neighbors[layer] = scored.into_iter().map(|n| n.id).collect();
        }
    }

    /// INSERT: Algorithm 1 from the HNSW paper.
    pub fn insert(&mut self, id: usize, vector: StoredVector) -> Result<()> {
        if self.node(id).is_some() {
            return Err(EngineError::Internal(format!(
                "hnsw slot {} already occupied",
                id
            )));
        }
        let level = self.random_level();
        let query = vector.to_vector();
        let query_norm = query.norm();

        self.nodes.insert(
            id,
            HnswNode {
                vector,
                neighbors: vec![Vec::new(); level + 1],
                level,
            },
        );

        let Some(mut ep_id) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return Ok(());
        };
        let current_max_level = self.max_level;

        // Phase 1: greedy descent from the top layer down to level+1 (ef=1)
        for l in (level + 1..=current_max_level).rev() {
            if let Some(n) = self
                .search_layer(query.as_slice(), query_norm, ep_id, 1, l)
                .first()
            {
                ep_id = n.id;
            }
        }

        // Phase 2: connect on layers min(level, current_max_level) down to 0
        for l in (0..=level.min(current_max_level)).rev() {
            let m = if l == 0 {
                self.params.m_max0
            } else {
                self.params.m
            };

            let nearest = self.search_layer(
                query.as_slice(),
                query_norm,
                ep_id,
                self.params.ef_construction,
                l,
            );
            let neighbors: Vec<usize> = nearest
                .iter()
                .filter(|n| n.id != id)
                .take(m)
                .map(|n| n.id)
                .collect();

            if let Some(node) = self.nodes.get_mut(&id) {
                node.neighbors[l] = neighbors.clone();
            }

            for &neighbor_id in &neighbors {
                let needs_pruning = match self.nodes.get_mut(&neighbor_id) {
                    Some(neighbor) if l < neighbor.neighbors.len() => {
                        neighbor.neighbors[l].push(id);
                        neighbor.neighbors[l].len() > m
                    }
                    _ => false,
                };
                if needs_pruning {
                    self.prune_neighbors(neighbor_id, l, m);
                }
            }

            if let Some(n) = nearest.iter().find(|n| n.id != id) {
                ep_id = n.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }

        Ok(())
    }

    /// Remove a node and unlink it from its neighbors' lists.
    pub fn remove(&mut self, id: usize) -> Option<StoredVector> {
        let node = self.nodes.remove(&id)?;

        for (layer, neighbors) in node.neighbors.iter().enumerate() {
            for &neighbor_id in neighbors {
                if let Some(neighbor) = self.nodes.get_mut(&neighbor_id) {
                    if let Some(list) = neighbor.neighbors.get_mut(layer) {
                        list.retain(|&n| n != id);
                    }
                }
            }
        }

        if self.entry_point == Some(id) {
            self.entry_point = self
                .nodes
                .iter()
                .map(|(&i, n)| (i, n.level))
                .max_by_key(|&(i, level)| (level, std::cmp::Reverse(i)))
                .map(|(i, _)| i);
            self.max_level = self
                .entry_point
                .and_then(|ep| self.node(ep).map(|n| n.level))
                .unwrap_or(0);
        }

        Some(node.vector)
    }

    /// SEARCH: Algorithm 5 from the HNSW paper.
    ///
    /// Returns up to `k` neighbors best first, exploring `max(ef, k)` candidates.
    /// Both are capped at the node count.
    pub fn search_knn(&self, query: &[f32], k: usize, ef: usize) -> Vec<Neighbor> {
        let Some(mut ep_id) = self.entry_point else {
            return Vec::new();
        };
        let k = k.min(self.len());
        let ef = ef.max(k).min(self.len());
        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();

        for l in (1..=self.max_level).rev() {
            if let Some(n) = self.search_layer(query, query_norm, ep_id, 1, l).first() {
                ep_id = n.id;
            }
        }

        let mut results = self.search_layer(query, query_norm, ep_id, ef, 0);
        results.truncate(k);
        results
    }

    /// Exhaustive scan over every live node, best first.
    pub fn scan(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mut results = ResultSet::new(k.min(self.len()));
        for (&id, node) in &self.nodes {
            let key = self.space.rank_key(self.space.score(query, query_norm, &node.vector));
            results.push(Neighbor::new(id, key));
        }
        results.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Precision, Vector};

    fn make_params() -> HnswParams {
        HnswParams::new(4, 32, 16).with_seed(7)
    }

    fn sv(data: Vec<f32>) -> StoredVector {
        StoredVector::encode(&Vector::new(data), Precision::Float32)
    }

    #[test]
    fn test_insert_single() {
        let mut graph = HnswGraph::new(SpaceType::Euclidean, make_params());
        graph.insert(0, sv(vec![1.0, 0.0, 0.0])).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.entry_point.is_some());
    }

    #[test]
    fn test_insert_occupied_slot_fails() {
        let mut graph = HnswGraph::new(SpaceType::Euclidean, make_params());
        graph.insert(0, sv(vec![1.0, 0.0])).unwrap();
        assert!(graph.insert(0, sv(vec![0.0, 1.0])).is_err());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_self_search() {
        let mut graph = HnswGraph::new(SpaceType::Euclidean, make_params());
        let vectors: Vec<Vec<f32>> = (0..100)
            .map(|i| {
                vec![
                    (i as f32) * 0.1,
                    ((i * 7) as f32) * 0.1,
                    ((i * 13) as f32) * 0.1,
                ]
            })
            .collect();

        for (i, v) in vectors.iter().enumerate() {
            graph.insert(i, sv(v.clone())).unwrap();
        }

        for (i, v) in vectors.iter().enumerate() {
            let results = graph.search_knn(v, 1, 16);
            assert!(!results.is_empty(), "No results for vector {}", i);
            assert!(
                results[0].key < 1e-5,
                "Self-search for {} returned key {} (id={})",
                i,
                results[0].key,
                results[0].id
            );
        }
    }

    #[test]
    fn test_search_knn_cosine() {
        let mut graph = HnswGraph::new(SpaceType::Cosine, make_params());
        graph.insert(0, sv(vec![1.0, 0.0])).unwrap();
        graph.insert(1, sv(vec![0.0, 1.0])).unwrap();
        graph.insert(2, sv(vec![0.9, 0.1])).unwrap();

        let results = graph.search_knn(&[1.0, 0.0], 2, 16);
        let ids: Vec<usize> = results.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 2]);
        // rank key is negated similarity
        assert!((results[0].key + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_remove() {
        let mut graph = HnswGraph::new(SpaceType::Euclidean, make_params());
        graph.insert(0, sv(vec![1.0, 0.0])).unwrap();
        graph.insert(1, sv(vec![0.0, 1.0])).unwrap();

        assert!(graph.remove(0).is_some());
        assert!(graph.remove(0).is_none());
        assert_eq!(graph.len(), 1);

        let results = graph.search_knn(&[0.0, 1.0], 1, 16);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn test_remove_entry_point() {
        let mut graph = HnswGraph::new(SpaceType::Euclidean, make_params());
        graph.insert(0, sv(vec![1.0, 0.0])).unwrap();
        graph.insert(1, sv(vec![0.0, 1.0])).unwrap();
        graph.insert(2, sv(vec![1.0, 1.0])).unwrap();

        let ep = graph.entry_point.unwrap();
        graph.remove(ep).unwrap();
        assert_eq!(graph.len(), 2);

        let results = graph.search_knn(&[0.0, 1.0], 1, 16);
        assert!(!results.is_empty());
    }

    #[test]
    fn test_replacements_do_not_accumulate_slots() {
        let mut graph = HnswGraph::new(SpaceType::Cosine, make_params());
        graph.insert(0, sv(vec![1.0, 0.0])).unwrap();
        for id in 1..10_000 {
            graph.insert(id, sv(vec![1.0, id as f32])).unwrap();
            graph.remove(id - 1).unwrap();
        }
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.entry_point, Some(9_999));
        assert_eq!(graph.scan(&[1.0, 0.0], 10).len(), 1);
    }

    #[test]
    fn test_params_validate() {
        assert!(HnswParams::default().validate().is_ok());
        assert!(HnswParams::new(1, 10, 10).validate().is_err());
        assert!(HnswParams::new(8, 0, 10).validate().is_err());
    }
}
