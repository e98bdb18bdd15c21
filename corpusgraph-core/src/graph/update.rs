//! The caller-facing update log: an ordered, serializable sequence of typed events
//! plus a watermark marking how much of it is durable.
//!
//! Node and edge endpoints are referenced by their path/name here rather than by
//! `NodeID`, since a `GraphUpdate` is built before (or independent of) any particular
//! in-memory graph and is replayed against whichever graph currently holds that name.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum UpdateEvent {
    AddNode {
        node_name: String,
        node_type: String,
    },
    DeleteNode {
        node_name: String,
    },
    AddNodeLabel {
        node_name: String,
        anno_ns: String,
        anno_name: String,
        anno_value: String,
    },
    DeleteNodeLabel {
        node_name: String,
        anno_ns: String,
        anno_name: String,
    },
    AddEdge {
        source_node: String,
        target_node: String,
        layer: String,
        component_type: String,
        component_name: String,
    },
    DeleteEdge {
        source_node: String,
        target_node: String,
        layer: String,
        component_type: String,
        component_name: String,
    },
    AddEdgeLabel {
        source_node: String,
        target_node: String,
        layer: String,
        component_type: String,
        component_name: String,
        anno_ns: String,
        anno_name: String,
        anno_value: String,
    },
    DeleteEdgeLabel {
        source_node: String,
        target_node: String,
        layer: String,
        component_type: String,
        component_name: String,
        anno_ns: String,
        anno_name: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GraphUpdate {
    diffs: Vec<(u64, UpdateEvent)>,
    last_consistent_change_id: u64,
}

impl GraphUpdate {
    pub fn new() -> GraphUpdate {
        GraphUpdate::default()
    }

    pub fn add_event(&mut self, event: UpdateEvent) {
        let change_id = self.last_consistent_change_id + (self.diffs.len() as u64) + 1;
        self.diffs.push((change_id, event));
    }

    /// Marks every event added so far as durable. Nothing is replayed before a
    /// caller calls this — an update half-built in memory is never partially applied.
    pub fn finish(&mut self) {
        if let Some((last_id, _)) = self.diffs.last() {
            self.last_consistent_change_id = *last_id;
        }
    }

    pub fn is_consistent(&self) -> bool {
        match self.diffs.last() {
            Some((last_id, _)) => self.last_consistent_change_id == *last_id,
            None => true,
        }
    }

    pub fn last_consistent_change_id(&self) -> u64 {
        self.last_consistent_change_id
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Events with `change_id <= last_consistent_change_id`, in order. Anything
    /// beyond the watermark is dropped — it was never guaranteed durable.
    pub fn consistent_events(&self) -> impl Iterator<Item = &UpdateEvent> {
        let watermark = self.last_consistent_change_id;
        self.diffs
            .iter()
            .filter(move |(id, _)| *id <= watermark)
            .map(|(_, e)| e)
    }

    pub fn into_consistent_changes_iter(self) -> impl Iterator<Item = UpdateEvent> {
        let watermark = self.last_consistent_change_id;
        self.diffs
            .into_iter()
            .filter_map(move |(id, e)| if id <= watermark { Some(e) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_beyond_watermark_are_dropped() {
        let mut u = GraphUpdate::new();
        u.add_event(UpdateEvent::AddNode {
            node_name: "a".into(),
            node_type: "node".into(),
        });
        u.finish();
        u.add_event(UpdateEvent::AddNode {
            node_name: "b".into(),
            node_type: "node".into(),
        });
        // second event was never finished, so it falls outside the watermark
        assert_eq!(u.consistent_events().count(), 1);
        assert!(!u.is_consistent());
    }

    #[test]
    fn finish_after_every_event_makes_all_consistent() {
        let mut u = GraphUpdate::new();
        u.add_event(UpdateEvent::AddNode {
            node_name: "a".into(),
            node_type: "node".into(),
        });
        u.add_event(UpdateEvent::AddNode {
            node_name: "b".into(),
            node_type: "node".into(),
        });
        u.finish();
        assert!(u.is_consistent());
        assert_eq!(u.consistent_events().count(), 2);
    }
}
