//! Resolves any node to the token(s) that align with it: the leftmost and rightmost
//! token it covers, or itself if it already is a token. Coverage and ordering
//! operators are all ultimately expressed in terms of these two questions, which is
//! why every one of them depends on the `LeftToken`/`RightToken` components.

use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::CorpusGraph;
use corpusgraph_core::{AnnoKey, Component, ComponentType, NodeID, ANNIS_NS};

pub fn necessary_components(db: &CorpusGraph) -> Vec<Component> {
    let mut result = vec![
        Component::new(ComponentType::LeftToken, ANNIS_NS, ""),
        Component::new(ComponentType::RightToken, ANNIS_NS, ""),
    ];
    result.extend(db.get_all_components(Some(ComponentType::Coverage), None));
    result
}

pub struct TokenHelper<'a> {
    graph: &'a CorpusGraph,
    left_edges: &'a dyn GraphStorage,
    right_edges: &'a dyn GraphStorage,
    cov_edges: Vec<&'a dyn GraphStorage>,
    tok_key: AnnoKey,
}

impl<'a> TokenHelper<'a> {
    /// Assumes `LeftToken`, `RightToken` and every `Coverage` component are already
    /// loaded (the planner loads every operator's `necessary_components` up front);
    /// returns `None` only if one of them is genuinely absent from the graph.
    pub fn new(db: &'a CorpusGraph) -> Option<TokenHelper<'a>> {
        let cov_components = db.get_all_components(Some(ComponentType::Coverage), None);
        let left_component = Component::new(ComponentType::LeftToken, ANNIS_NS, "");
        let right_component = Component::new(ComponentType::RightToken, ANNIS_NS, "");

        let tok_key = db.get_token_key();
        let left_edges = db.get_graphstorage_if_loaded(&left_component)?;
        let right_edges = db.get_graphstorage_if_loaded(&right_component)?;
        let cov_edges = cov_components
            .iter()
            .filter_map(|c| db.get_graphstorage_if_loaded(c))
            .collect();

        Some(TokenHelper {
            graph: db,
            left_edges,
            right_edges,
            cov_edges,
            tok_key,
        })
    }

    pub fn is_token(&self, n: NodeID) -> bool {
        if !self.graph.node_annos.has_value(&n, &self.tok_key) {
            return false;
        }
        // a token has no outgoing coverage edge; a segmented/structural node does
        !self.cov_edges.iter().any(|c| c.outgoing_edges(n).next().is_some())
    }

    pub fn right_token(&self, n: NodeID) -> Option<NodeID> {
        if self.is_token(n) {
            Some(n)
        } else {
            self.right_edges.outgoing_edges(n).next()
        }
    }

    pub fn left_token(&self, n: NodeID) -> Option<NodeID> {
        if self.is_token(n) {
            Some(n)
        } else {
            self.left_edges.outgoing_edges(n).next()
        }
    }

    pub fn left_right_token(&self, n: NodeID) -> (Option<NodeID>, Option<NodeID>) {
        if self.is_token(n) {
            (Some(n), Some(n))
        } else {
            (
                self.left_edges.outgoing_edges(n).next(),
                self.right_edges.outgoing_edges(n).next(),
            )
        }
    }
}
