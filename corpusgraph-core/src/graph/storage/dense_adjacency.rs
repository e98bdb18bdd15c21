//! Compacted storage for components where almost every node has at most one
//! outgoing edge (typical of `LeftToken`/`RightToken`): a dense `Vec<Option<NodeID>>`
//! indexed by node id instead of a hash map, plus a sorted inverse multimap.

use crate::annostorage::AnnoStorage;
use crate::errors::Result;
use crate::graph::storage::{compute_statistics, EdgeContainer, GraphStorage, WriteableGraphStorage};
use crate::types::{AnnoKey, Annotation, Edge, GraphStatistic, NodeID};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DenseAdjacencyListStorage {
    edges: Vec<Option<NodeID>>,
    inverse_edges: FxHashMap<NodeID, Vec<NodeID>>,
    annos: AnnoStorage<Edge>,
    stats: Option<GraphStatistic>,
}

impl DenseAdjacencyListStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&mut self, node: NodeID) {
        let idx = node as usize;
        if idx >= self.edges.len() {
            self.edges.resize(idx + 1, None);
        }
    }
}

impl EdgeContainer for DenseAdjacencyListStorage {
    fn outgoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        let idx = node as usize;
        match self.edges.get(idx).copied().flatten() {
            Some(target) => Box::new(std::iter::once(target)),
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
        Box::new(
            self.edges
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_some())
                .map(|(i, _)| i as NodeID),
        )
    }
}

impl GraphStorage for DenseAdjacencyListStorage {
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
        "DenseAdjacencyListV1".to_string()
    }

    fn save_to(&self, directory: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let f = std::fs::File::create(directory.join("component.bin"))?;
        let mut w = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }
}

impl WriteableGraphStorage for DenseAdjacencyListStorage {
    fn add_edge(&mut self, edge: Edge) {
        self.ensure_capacity(edge.source);
        self.edges[edge.source as usize] = Some(edge.target);
        let inverse = self.inverse_edges.entry(edge.target).or_default();
        if let Err(pos) = inverse.binary_search(&edge.source) {
            inverse.insert(pos, edge.source);
        }
        self.stats = None;
    }

    fn add_edge_annotation(&mut self, edge: Edge, anno: Annotation) {
        self.annos.insert(edge, anno);
    }

    fn delete_edge(&mut self, edge: Edge) {
        if let Some(slot) = self.edges.get_mut(edge.source as usize) {
            if *slot == Some(edge.target) {
                *slot = None;
            }
        }
        if let Some(inverse) = self.inverse_edges.get_mut(&edge.target) {
            inverse.retain(|&s| s != edge.source);
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
        if let Some(slot) = self.edges.get_mut(node as usize) {
            *slot = None;
        }
        self.inverse_edges.remove(&node);
        for inverse in self.inverse_edges.values_mut() {
            inverse.retain(|&s| s != node);
        }
        self.stats = None;
    }

    fn calculate_index(&mut self) {
        self.calculate_statistics();
    }
}
