//! Pre/post-order edge-component storage.
//!
//! Gives O(1) ancestor tests on components the registry has determined are rooted
//! trees (typically dominance): `source` is an ancestor of `target` iff
//! `pre[source] <= pre[target] && post[target] <= post[source]`, with level giving
//! the exact depth difference. Rejects being calculated over a cyclic component —
//! callers must check [`crate::types::GraphStatistic::cyclic`] via the adjacency
//! buffer's statistics before switching a component to this implementation.

use crate::annostorage::AnnoStorage;
use crate::dfs::CycleSafeDFS;
use crate::errors::Result;
use crate::graph::storage::adjacencylist::AdjacencyListStorage;
use crate::graph::storage::{compute_statistics, EdgeContainer, GraphStorage, WriteableGraphStorage};
use crate::types::{AnnoKey, Annotation, Edge, GraphStatistic, NodeID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(PartialOrd, PartialEq, Ord, Eq, Clone, Serialize, Deserialize, Debug)]
pub struct PrePost {
    pub pre: u32,
    pub post: u32,
    pub level: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PrePostOrderStorage {
    node_to_order: HashMap<NodeID, Vec<PrePost>>,
    order_to_node: BTreeMap<PrePost, NodeID>,
    /// Raw edges, kept so the pre/post labeling can be rebuilt on `calculate_index`.
    pending: AdjacencyListStorage,
    annos: AnnoStorage<Edge>,
    stats: Option<GraphStatistic>,
}

struct StackEntry {
    id: NodeID,
    order: PrePost,
}

impl PrePostOrderStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter_node(current_order: &mut u32, node_id: NodeID, level: u32, stack: &mut Vec<StackEntry>) {
        stack.push(StackEntry {
            id: node_id,
            order: PrePost {
                pre: *current_order,
                level,
                post: 0,
            },
        });
        *current_order += 1;
    }

    fn exit_node(&mut self, current_order: &mut u32, stack: &mut Vec<StackEntry>) {
        if let Some(mut entry) = stack.pop() {
            entry.order.post = *current_order;
            *current_order += 1;
            self.node_to_order.entry(entry.id).or_default().push(entry.order.clone());
            self.order_to_node.insert(entry.order, entry.id);
        }
    }
}

impl EdgeContainer for PrePostOrderStorage {
    fn outgoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        self.find_connected(node, 1, 1)
    }

    fn ingoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        self.pending.ingoing_edges(node)
    }

    fn source_nodes<'a>(&'a self) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        self.pending.source_nodes()
    }
}

impl GraphStorage for PrePostOrderStorage {
    fn find_connected<'a>(
        &'a self,
        source: NodeID,
        min_distance: usize,
        max_distance: usize,
    ) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        let Some(start_orders) = self.node_to_order.get(&source) else {
            return Box::new(std::iter::empty());
        };
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        for root in start_orders {
            let lower = PrePost { pre: root.pre, post: 0, level: 0 };
            let upper = PrePost { pre: root.post, post: u32::MAX, level: u32::MAX };
            for (order, node) in self.order_to_node.range(lower..=upper) {
                if order.post > root.post {
                    continue;
                }
                if order.level < root.level {
                    continue;
                }
                let diff_level = (order.level - root.level) as usize;
                if diff_level < min_distance || diff_level > max_distance {
                    continue;
                }
                if visited.insert(*node) {
                    result.push(*node);
                }
            }
        }
        Box::new(result.into_iter())
    }

    fn distance(&self, source: NodeID, target: NodeID) -> Option<usize> {
        if source == target {
            return Some(0);
        }
        let order_source = self.node_to_order.get(&source)?;
        let order_target = self.node_to_order.get(&target)?;
        let mut min_level = None;
        for os in order_source {
            for ot in order_target {
                if os.pre <= ot.pre && ot.post <= os.post && os.level <= ot.level {
                    let diff = (ot.level - os.level) as usize;
                    min_level = Some(min_level.map_or(diff, |m: usize| m.min(diff)));
                }
            }
        }
        min_level
    }

    fn is_connected(&self, source: NodeID, target: NodeID, min_distance: usize, max_distance: usize) -> bool {
        match self.distance(source, target) {
            Some(d) => d >= min_distance && d <= max_distance,
            None => false,
        }
    }

    fn get_anno_storage(&self) -> &AnnoStorage<Edge> {
        &self.annos
    }

    fn get_statistics(&self) -> Option<&GraphStatistic> {
        self.stats.as_ref()
    }

    fn calculate_statistics(&mut self) {
        self.stats = Some(compute_statistics(&self.pending));
    }

    fn serialization_id(&self) -> String {
        "PrePostOrderV1".to_string()
    }

    fn save_to(&self, directory: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let f = std::fs::File::create(directory.join("component.bin"))?;
        let mut w = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }
}

impl WriteableGraphStorage for PrePostOrderStorage {
    fn add_edge(&mut self, edge: Edge) {
        self.pending.add_edge(edge);
    }

    fn add_edge_annotation(&mut self, edge: Edge, anno: Annotation) {
        self.annos.insert(edge, anno);
    }

    fn delete_edge(&mut self, edge: Edge) {
        self.pending.delete_edge(edge);
    }

    fn delete_edge_annotation(&mut self, edge: Edge, key: &AnnoKey) {
        self.annos.remove(&edge, key);
    }

    fn delete_node(&mut self, node: NodeID) {
        self.pending.delete_node(node);
    }

    /// Rebuilds pre/post labels for every root (a node with no incoming edge, or all
    /// source nodes if the component has none) via a cycle-safe DFS.
    fn calculate_index(&mut self) {
        self.node_to_order.clear();
        self.order_to_node.clear();

        let all_sources: Vec<NodeID> = self.pending.source_nodes().collect();
        let mut has_incoming: HashSet<NodeID> = HashSet::new();
        for &s in &all_sources {
            for t in self.pending.outgoing_edges(s) {
                has_incoming.insert(t);
            }
        }
        let mut roots: Vec<NodeID> = all_sources
            .iter()
            .copied()
            .filter(|n| !has_incoming.contains(n))
            .collect();
        if roots.is_empty() {
            roots = all_sources;
        }

        let mut current_order = 0u32;
        for &start in &roots {
            let mut last_distance = 0usize;
            let mut stack = Vec::new();
            Self::enter_node(&mut current_order, start, 0, &mut stack);

            let dfs = CycleSafeDFS::new(&self.pending, start, 1, usize::MAX);
            for (node, distance) in dfs {
                if distance > last_distance {
                    Self::enter_node(&mut current_order, node, distance as u32, &mut stack);
                } else {
                    while stack.len() > distance {
                        self.exit_node(&mut current_order, &mut stack);
                    }
                    Self::enter_node(&mut current_order, node, distance as u32, &mut stack);
                }
                last_distance = distance;
            }
            while !stack.is_empty() {
                self.exit_node(&mut current_order, &mut stack);
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
    fn rooted_tree_ancestor_is_o1() {
        let mut gs = PrePostOrderStorage::new();
        gs.add_edge(e(1, 2));
        gs.add_edge(e(1, 3));
        gs.add_edge(e(2, 4));
        gs.calculate_index();

        assert!(gs.is_connected(1, 4, 1, usize::MAX));
        assert_eq!(gs.distance(1, 4), Some(2));
        assert!(!gs.is_connected(3, 4, 1, usize::MAX));
    }

    #[test]
    fn find_connected_respects_distance_bounds() {
        let mut gs = PrePostOrderStorage::new();
        gs.add_edge(e(1, 2));
        gs.add_edge(e(2, 3));
        gs.calculate_index();

        let at_one: Vec<NodeID> = gs.find_connected(1, 1, 1).collect();
        assert_eq!(at_one, vec![2]);
        let mut all: Vec<NodeID> = gs.find_connected(1, 1, usize::MAX).collect();
        all.sort_unstable();
        assert_eq!(all, vec![2, 3]);
    }
}
