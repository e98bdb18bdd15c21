//! Storage for total-order components (`Ordering`, and by extension `LeftToken`/
//! `RightToken` once resolved to their nearest token): each node has at most one
//! successor, and every node in the same chain gets a dense sequence position, so
//! distance between two connected nodes is a single subtraction instead of a walk.

use crate::annostorage::AnnoStorage;
use crate::errors::Result;
use crate::graph::storage::{compute_statistics, EdgeContainer, GraphStorage, WriteableGraphStorage};
use crate::types::{AnnoKey, Annotation, Edge, GraphStatistic, NodeID};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LinearStorage {
    next: FxHashMap<NodeID, NodeID>,
    prev: FxHashMap<NodeID, NodeID>,
    /// Position within its chain; rebuilt by `calculate_index`, stale otherwise.
    position: FxHashMap<NodeID, usize>,
    chain_of: FxHashMap<NodeID, usize>,
    annos: AnnoStorage<Edge>,
    stats: Option<GraphStatistic>,
}

impl LinearStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EdgeContainer for LinearStorage {
    fn outgoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        match self.next.get(&node) {
            Some(&t) => Box::new(std::iter::once(t)),
            None => Box::new(std::iter::empty()),
        }
    }

    fn ingoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        match self.prev.get(&node) {
            Some(&s) => Box::new(std::iter::once(s)),
            None => Box::new(std::iter::empty()),
        }
    }

    fn source_nodes<'a>(&'a self) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        Box::new(self.next.keys().copied())
    }
}

impl GraphStorage for LinearStorage {
    fn find_connected<'a>(
        &'a self,
        source: NodeID,
        min_distance: usize,
        max_distance: usize,
    ) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        let (Some(&chain), Some(&pos)) = (self.chain_of.get(&source), self.position.get(&source)) else {
            return Box::new(std::iter::empty());
        };
        let lo = pos.saturating_add(min_distance);
        let hi = pos.saturating_add(max_distance);
        let it = self
            .position
            .iter()
            .filter(move |(n, p)| {
                self.chain_of.get(n) == Some(&chain) && **p >= lo && **p <= hi && **p != pos
            })
            .map(|(n, _)| *n);
        Box::new(it)
    }

    fn distance(&self, source: NodeID, target: NodeID) -> Option<usize> {
        let chain_s = *self.chain_of.get(&source)?;
        let chain_t = *self.chain_of.get(&target)?;
        if chain_s != chain_t {
            return None;
        }
        let pos_s = *self.position.get(&source)?;
        let pos_t = *self.position.get(&target)?;
        pos_t.checked_sub(pos_s)
    }

    fn is_connected(&self, source: NodeID, target: NodeID, min_distance: usize, max_distance: usize) -> bool {
        matches!(self.distance(source, target), Some(d) if d >= min_distance && d <= max_distance)
    }

    fn get_anno_storage(&self) -> &AnnoStorage<Edge> {
        &self.annos
    }

    fn get_statistics(&self) -> Option<&GraphStatistic> {
        self.stats.as_ref()
    }

    fn calculate_statistics(&mut self) {
        self.stats = Some(compute_statistics(self));
    }

    fn serialization_id(&self) -> String {
        "LinearV1".to_string()
    }

    fn save_to(&self, directory: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let f = std::fs::File::create(directory.join("component.bin"))?;
        let mut w = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }
}

impl WriteableGraphStorage for LinearStorage {
    fn add_edge(&mut self, edge: Edge) {
        self.next.insert(edge.source, edge.target);
        self.prev.insert(edge.target, edge.source);
        self.stats = None;
    }

    fn add_edge_annotation(&mut self, edge: Edge, anno: Annotation) {
        self.annos.insert(edge, anno);
    }

    fn delete_edge(&mut self, edge: Edge) {
        if self.next.get(&edge.source) == Some(&edge.target) {
            self.next.remove(&edge.source);
        }
        if self.prev.get(&edge.target) == Some(&edge.source) {
            self.prev.remove(&edge.target);
        }
        for anno in self.annos.get_annotations_for_item(&edge) {
            self.annos.remove(&edge, &anno.key);
        }
        self.stats = None;
    }

    fn delete_edge_annotation(&mut self, edge: Edge, key: &AnnoKey) {
        self.annos.remove(&edge, key);
    }

    fn delete_node(&mut self, node: NodeID) {
        if let Some(succ) = self.next.remove(&node) {
            self.prev.remove(&succ);
        }
        if let Some(pred) = self.prev.remove(&node) {
            self.next.remove(&pred);
        }
        self.stats = None;
    }

    /// Rebuilds chain ids and sequence positions: finds each chain's head (a node
    /// with no predecessor) and numbers its successors 0, 1, 2, ...
    fn calculate_index(&mut self) {
        self.position.clear();
        self.chain_of.clear();

        let heads: Vec<NodeID> = self
            .next
            .keys()
            .copied()
            .filter(|n| !self.prev.contains_key(n))
            .collect();

        for (chain_id, &head) in heads.iter().enumerate() {
            let mut pos = 0usize;
            let mut current = head;
            loop {
                self.position.insert(current, pos);
                self.chain_of.insert(current, chain_id);
                pos += 1;
                match self.next.get(&current) {
                    Some(&next) if !self.chain_of.contains_key(&next) => current = next,
                    _ => break,
                }
            }
        }

        self.calculate_statistics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(s: NodeID, t: NodeID) -> Edge {
        Edge { source: s, target: t }
    }

    #[test]
    fn distance_is_constant_time_subtraction() {
        let mut gs = LinearStorage::new();
        gs.add_edge(e(1, 2));
        gs.add_edge(e(2, 3));
        gs.add_edge(e(3, 4));
        gs.calculate_index();

        assert_eq!(gs.distance(1, 4), Some(3));
        assert_eq!(gs.distance(2, 3), Some(1));
        assert_eq!(gs.distance(4, 1), None);
    }

    #[test]
    fn separate_chains_are_not_connected() {
        let mut gs = LinearStorage::new();
        gs.add_edge(e(1, 2));
        gs.add_edge(e(10, 11));
        gs.calculate_index();
        assert_eq!(gs.distance(1, 11), None);
    }
}
