//! The abstract read/write contract every edge-component storage implements, plus
//! the registry that picks a concrete implementation from component statistics.

pub mod adjacencylist;
pub mod dense_adjacency;
pub mod linear;
pub mod prepost;
pub mod registry;

use crate::annostorage::AnnoStorage;
use crate::dfs::CycleSafeDFS;
use crate::errors::Result;
use crate::types::{AnnoKey, Annotation, Edge, GraphStatistic, NodeID};

/// The read-only subset needed by cycle-safe DFS: outgoing/ingoing adjacency.
pub trait EdgeContainer: Sync + Send {
    fn outgoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a>;
    fn ingoing_edges<'a>(&'a self, node: NodeID) -> Box<dyn Iterator<Item = NodeID> + 'a>;

    fn source_nodes<'a>(&'a self) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        Box::new(std::iter::empty())
    }
}

/// Read operations every edge-component storage must support, independent of how
/// reachability is represented internally.
pub trait GraphStorage: EdgeContainer {
    fn is_connected(&self, source: NodeID, target: NodeID, min_distance: usize, max_distance: usize) -> bool {
        CycleSafeDFS::new(self, source, min_distance, max_distance).any(|(n, _)| n == target)
    }

    /// `-1`-as-`None` distance between two directly or transitively connected nodes.
    fn distance(&self, source: NodeID, target: NodeID) -> Option<usize> {
        CycleSafeDFS::new(self, source, 1, usize::MAX)
            .find(|(n, _)| *n == target)
            .map(|(_, d)| d)
    }

    fn find_connected<'a>(
        &'a self,
        source: NodeID,
        min_distance: usize,
        max_distance: usize,
    ) -> Box<dyn Iterator<Item = NodeID> + 'a> {
        Box::new(CycleSafeDFS::new(self, source, min_distance, max_distance).map(|(n, _)| n))
    }

    fn get_anno_storage(&self) -> &AnnoStorage<Edge>;

    fn get_statistics(&self) -> Option<&GraphStatistic> {
        None
    }

    /// Recomputes [`GraphStatistic`] for this storage. Called once after bulk loads
    /// or writes, never incrementally.
    fn calculate_statistics(&mut self) {}

    /// The registry tag used to serialize/deserialize this implementation, e.g.
    /// `"AdjacencyListV1"`.
    fn serialization_id(&self) -> String;

    fn save_to(&self, directory: &std::path::Path) -> Result<()>;
}

/// Write operations; only the storage currently holding a component's live data
/// implements this (a component loaded read-only from disk does not).
pub trait WriteableGraphStorage: GraphStorage {
    fn add_edge(&mut self, edge: Edge);
    fn add_edge_annotation(&mut self, edge: Edge, anno: Annotation);
    fn delete_edge(&mut self, edge: Edge);
    fn delete_edge_annotation(&mut self, edge: Edge, key: &AnnoKey);
    fn delete_node(&mut self, node: NodeID);

    /// Rebuilds any derived index (pre/post labels, adjacency caches) from the raw
    /// edge set. Must be called once before the storage is queried after a bulk load.
    fn calculate_index(&mut self);

    fn copy_from(&mut self, other: &dyn GraphStorage) -> Result<()> {
        for source in other.source_nodes() {
            for target in other.outgoing_edges(source) {
                let edge = Edge { source, target };
                self.add_edge(edge);
                for anno in other.get_anno_storage().get_annotations_for_item(&edge) {
                    self.add_edge_annotation(edge, anno);
                }
            }
        }
        self.calculate_index();
        Ok(())
    }
}

/// Computes [`GraphStatistic`] by sampling a DFS from every root (a node with no
/// incoming edge, or all source nodes if none qualify) and aggregating fan-out and
/// depth. Shared by every storage implementation's `calculate_statistics`.
pub fn compute_statistics(gs: &dyn GraphStorage) -> GraphStatistic {
    use std::collections::HashSet;

    let all_sources: Vec<NodeID> = gs.source_nodes().collect();
    let node_set: HashSet<NodeID> = all_sources.iter().copied().collect();
    let has_incoming: HashSet<NodeID> = all_sources
        .iter()
        .flat_map(|&s| gs.outgoing_edges(s).collect::<Vec<_>>())
        .collect();
    let mut roots: Vec<NodeID> = all_sources
        .iter()
        .copied()
        .filter(|n| !has_incoming.contains(n))
        .collect();
    if roots.is_empty() {
        roots = all_sources.clone();
    }

    let mut fan_outs: Vec<usize> = Vec::new();
    let mut max_depth = 0usize;
    let mut cyclic = false;
    let mut visited_total = 0usize;
    let mut visited_unique: HashSet<NodeID> = HashSet::new();

    for &root in &roots {
        fan_outs.push(gs.outgoing_edges(root).count());
        let dfs = CycleSafeDFS::new(gs, root, 1, usize::MAX);
        for (node, dist) in dfs {
            max_depth = max_depth.max(dist);
            visited_total += 1;
            visited_unique.insert(node);
            fan_outs.push(gs.outgoing_edges(node).count());
        }
    }
    // cyclic detection needs its own pass since CycleSafeDFS only exposes the flag
    // after being fully drained once per root.
    for &root in &roots {
        let mut dfs = CycleSafeDFS::new(gs, root, 0, usize::MAX);
        for _ in dfs.by_ref() {}
        if dfs.cyclic {
            cyclic = true;
        }
    }

    fan_outs.sort_unstable();
    let avg_fan_out = if fan_outs.is_empty() {
        0.0
    } else {
        fan_outs.iter().sum::<usize>() as f64 / fan_outs.len() as f64
    };
    let max_fan_out = fan_outs.last().copied().unwrap_or(0);
    let p99_index = ((fan_outs.len() as f64) * 0.99) as usize;
    let fan_out_99_percentile = fan_outs
        .get(p99_index.min(fan_outs.len().saturating_sub(1)))
        .copied()
        .unwrap_or(0);
    let rooted_tree = !cyclic && roots.len() <= 1 && visited_unique.len() == visited_total;
    let dfs_visit_ratio = if node_set.is_empty() {
        1.0
    } else {
        visited_total as f64 / node_set.len() as f64
    };

    GraphStatistic {
        valid: true,
        nodes: node_set.len(),
        avg_fan_out,
        max_fan_out,
        fan_out_99_percentile,
        max_depth,
        dfs_visit_ratio,
        cyclic,
        rooted_tree,
    }
}
