//! Default writable edge-component storage: plain outgoing/ingoing multimaps.
//!
//! Always correct regardless of the component's shape (cyclic or not); the slowest
//! of the storages for deep reachability queries since every `find_connected` walks
//! the DFS edge by edge, but the only one that never refuses to hold a component.

use crate::annostorage::AnnoStorage;
use crate::errors::Result;
use crate::graph::storage::{EdgeContainer, GraphStorage, WriteableGraphStorage};
use crate::types::{AnnoKey, Annotation, Edge, GraphStatistic, NodeID};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AdjacencyListStorage {
    edges: FxHashMap<NodeID, Vec<NodeID>>,
    inverse_edges: FxHashMap<NodeID, Vec<NodeID>>,
    annos: AnnoStorage<Edge>,
    stats: Option<GraphStatistic>,
}

impl AdjacencyListStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EdgeContainer for AdjacencyListStorage {
    fn outgoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        match self.edges.get(&node) {
            Some(v) => Box::new(v.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn ingoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        match self.inverse_edges.get(&node) {
            Some(v) => Box::new(v.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn source_nodes<'a>(&'a self) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        Box::new(self.edges.keys().copied())
    }
}

impl GraphStorage for AdjacencyListStorage {
    fn get_anno_storage(&self) -> &AnnoStorage<Edge> {
        &self.annos
    }

    fn get_statistics(&self) -> Option<&GraphStatistic> {
        self.stats.as_ref()
    }

    fn calculate_statistics(&mut self) {
        self.stats = Some(super::compute_statistics(self));
    }

    fn serialization_id(&self) -> String {
        "AdjacencyListV1".to_string()
    }

    fn save_to(&self, directory: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let f = std::fs::File::create(directory.join("component.bin"))?;
        let mut w = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }
}

impl WriteableGraphStorage for AdjacencyListStorage {
    fn add_edge(&mut self, edge: Edge) {
        let out = self.edges.entry(edge.source).or_default();
        if !out.contains(&edge.target) {
            out.push(edge.target);
        }
        let inc = self.inverse_edges.entry(edge.target).or_default();
        if !inc.contains(&edge.source) {
            inc.push(edge.source);
        }
        self.edges.entry(edge.target).or_default();
        self.stats = None;
    }

    fn add_edge_annotation(&mut self, edge: Edge, anno: Annotation) {
        self.annos.insert(edge, anno);
    }

    fn delete_edge(&mut self, edge: Edge) {
        if let Some(out) = self.edges.get_mut(&edge.source) {
            out.retain(|&t| t != edge.target);
        }
        if let Some(inc) = self.inverse_edges.get_mut(&edge.target) {
            inc.retain(|&s| s != edge.source);
        }
        for key in self.annos.get_annotations_for_item(&edge) {
            self.annos.remove(&edge, &key.key);
        }
        self.stats = None;
    }

    fn delete_edge_annotation(&mut self, edge: Edge, key: &AnnoKey) {
        self.annos.remove(&edge, key);
    }

    fn delete_node(&mut self, node: NodeID) {
        let targets = self.edges.remove(&node).unwrap_or_default();
        for t in &targets {
            if let Some(inc) = self.inverse_edges.get_mut(t) {
                inc.retain(|&s| s != node);
            }
            self.annos.remove(&Edge { source: node, target: *t }, &AnnoKey::default());
        }
        let sources = self.inverse_edges.remove(&node).unwrap_or_default();
        for s in &sources {
            if let Some(out) = self.edges.get_mut(s) {
                out.retain(|&t| t != node);
            }
        }
        self.stats = None;
    }

    fn calculate_index(&mut self) {
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
    fn simple_dag_find_all() {
        let mut gs = AdjacencyListStorage::new();
        // 1 -> {2,3}, 2 -> 4, 3 -> 4
        gs.add_edge(e(1, 2));
        gs.add_edge(e(1, 3));
        gs.add_edge(e(2, 4));
        gs.add_edge(e(3, 4));

        let mut reachable: Vec<NodeID> = gs.find_connected(1, 1, usize::MAX).collect();
        reachable.sort_unstable();
        reachable.dedup();
        assert_eq!(reachable, vec![2, 3, 4]);

        assert!(gs.is_connected(1, 4, 1, usize::MAX));
        assert!(!gs.is_connected(4, 1, 1, usize::MAX));
    }

    #[test]
    fn delete_edge_breaks_connection() {
        let mut gs = AdjacencyListStorage::new();
        gs.add_edge(e(1, 2));
        assert!(gs.is_connected(1, 2, 1, 1));
        gs.delete_edge(e(1, 2));
        assert!(!gs.is_connected(1, 2, 1, 1));
    }

    #[test]
    fn delete_node_removes_all_incident_edges() {
        let mut gs = AdjacencyListStorage::new();
        gs.add_edge(e(1, 2));
        gs.add_edge(e(2, 3));
        gs.delete_node(2);
        assert!(!gs.is_connected(1, 2, 1, 1));
        assert!(!gs.is_connected(2, 3, 1, 1));
    }
}
