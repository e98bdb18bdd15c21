//! `.`: lhs's rightmost token immediately (or, with a distance, within `n` tokens)
//! precedes rhs's leftmost token in textual order. Built directly on the `Ordering`
//! component rather than through [`BaseEdgeOp`], since the left/right token resolution
//! needs the token helper first.

use crate::match_result::Match;
use crate::operator::{BinaryOperator, BinaryOperatorSpec, EstimationType, RangeSpec};
use crate::token_helper::{self, TokenHelper};
use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::{CorpusGraph, DEFAULT_ANNO_KEY};
use corpusgraph_core::{Component, ComponentType, NodeID, ANNIS_NS};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrecedenceSpec {
    pub segmentation: Option<String>,
    pub dist: RangeSpec,
}

impl BinaryOperatorSpec for PrecedenceSpec {
    fn necessary_components(&self, db: &CorpusGraph) -> HashSet<Component> {
        let mut v = HashSet::new();
        let name = self.segmentation.clone().unwrap_or_default();
        v.insert(Component::new(ComponentType::Ordering, ANNIS_NS, name));
        v.extend(token_helper::necessary_components(db));
        v
    }

    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        let name = self.segmentation.clone().unwrap_or_default();
        let component = Component::new(ComponentType::Ordering, ANNIS_NS, name);
        let gs_order = db.get_graphstorage_if_loaded(&component)?;
        let tok_helper = TokenHelper::new(db)?;
        Some(Box::new(Precedence { gs_order, tok_helper, dist: self.dist.clone(), component }))
    }
}

/// Walks `ingoing_edges` instead of `outgoing_edges`, the mirror image of
/// [`GraphStorage::find_connected`]; the `Ordering` component only stores forward
/// (earlier-to-later) edges, so finding what precedes a node needs its own traversal
/// rather than a swap of arguments.
fn find_connected_reverse(gs: &dyn GraphStorage, start: NodeID, min_distance: usize, max_distance: usize) -> Vec<NodeID> {
    let mut result = Vec::new();
    let mut visited: HashSet<NodeID> = HashSet::new();
    visited.insert(start);
    let mut frontier = vec![start];
    let mut distance = 0;
    while distance < max_distance && !frontier.is_empty() {
        distance += 1;
        let mut next = Vec::new();
        for node in &frontier {
            for pred in gs.ingoing_edges(*node) {
                if visited.insert(pred) {
                    if distance >= min_distance {
                        result.push(pred);
                    }
                    next.push(pred);
                }
            }
        }
        frontier = next;
    }
    result
}

struct Precedence<'a> {
    gs_order: &'a dyn GraphStorage,
    tok_helper: TokenHelper<'a>,
    dist: RangeSpec,
    component: Component,
}

impl<'a> fmt::Display for Precedence<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ".{}", self.dist)
    }
}

impl<'a> BinaryOperator for Precedence<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let Some(end_lhs) = self.tok_helper.right_token(lhs.node) else {
            return Box::new(std::iter::empty());
        };
        let result: Vec<NodeID> = self
            .gs_order
            .find_connected(end_lhs, self.dist.min_dist(), self.dist.max_dist())
            .collect();
        Box::new(result.into_iter().map(|n| Match { node: n, anno_key: DEFAULT_ANNO_KEY.clone() }))
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        let (Some(end_lhs), Some(start_rhs)) = (self.tok_helper.right_token(lhs.node), self.tok_helper.left_token(rhs.node)) else {
            return false;
        };
        self.gs_order.is_connected(end_lhs, start_rhs, self.dist.min_dist(), self.dist.max_dist())
    }

    fn is_reflexive(&self) -> bool {
        false
    }

    fn get_inverse_operator<'b>(&self, graph: &'b CorpusGraph) -> Option<Box<dyn BinaryOperator + 'b>> {
        let gs_order = graph.get_graphstorage_if_loaded(&self.component)?;
        let tok_helper = TokenHelper::new(graph)?;
        Some(Box::new(InversePrecedence { gs_order, tok_helper, dist: self.dist.clone() }))
    }

    fn estimation_type(&self) -> EstimationType {
        if let Some(stats) = self.gs_order.get_statistics() {
            if stats.nodes > 0 {
                return EstimationType::Selectivity((self.dist.max_dist().min(stats.nodes) as f64) / stats.nodes as f64);
            }
        }
        EstimationType::Selectivity(0.1)
    }
}

/// The inverse of [`Precedence`]: given a seed playing the role of the original
/// right-hand side, finds nodes whose right token precedes the seed's left token.
struct InversePrecedence<'a> {
    gs_order: &'a dyn GraphStorage,
    tok_helper: TokenHelper<'a>,
    dist: RangeSpec,
}

impl<'a> fmt::Display for InversePrecedence<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ".{} (inverse)", self.dist)
    }
}

impl<'a> BinaryOperator for InversePrecedence<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let Some(start_rhs) = self.tok_helper.left_token(lhs.node) else {
            return Box::new(std::iter::empty());
        };
        let result = find_connected_reverse(self.gs_order, start_rhs, self.dist.min_dist(), self.dist.max_dist());
        Box::new(result.into_iter().map(|n| Match { node: n, anno_key: DEFAULT_ANNO_KEY.clone() }))
    }

    /// Holds when `rhs` precedes `lhs` — arguments play the opposite roles they do
    /// in [`Precedence::filter_match`], matching this operator's reversed direction.
    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        let (Some(end_rhs), Some(start_lhs)) = (self.tok_helper.right_token(rhs.node), self.tok_helper.left_token(lhs.node)) else {
            return false;
        };
        self.gs_order.is_connected(end_rhs, start_lhs, self.dist.min_dist(), self.dist.max_dist())
    }

    fn is_reflexive(&self) -> bool {
        false
    }

    fn estimation_type(&self) -> EstimationType {
        if let Some(stats) = self.gs_order.get_statistics() {
            if stats.nodes > 0 {
                return EstimationType::Selectivity((self.dist.max_dist().min(stats.nodes) as f64) / stats.nodes as f64);
            }
        }
        EstimationType::Selectivity(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};
    use corpusgraph_core::TOK;

    /// Three bare tokens `tok1 . tok2 . tok3`, chained via the unnamed `Ordering`
    /// component. No spans, so every node is its own left/right token.
    fn token_chain() -> CorpusGraph {
        let mut db = CorpusGraph::new();
        let mut u = GraphUpdate::new();
        for name in ["tok1", "tok2", "tok3"] {
            u.add_event(UpdateEvent::AddNode { node_name: name.into(), node_type: "node".into() });
            u.add_event(UpdateEvent::AddNodeLabel {
                node_name: name.into(),
                anno_ns: ANNIS_NS.into(),
                anno_name: TOK.into(),
                anno_value: name.into(),
            });
        }
        for pair in [("tok1", "tok2"), ("tok2", "tok3")] {
            u.add_event(UpdateEvent::AddEdge {
                source_node: pair.0.into(),
                target_node: pair.1.into(),
                layer: ANNIS_NS.into(),
                component_type: ComponentType::Ordering.to_string(),
                component_name: "".into(),
            });
        }
        u.finish();
        db.apply_update_in_memory(&mut u).unwrap();
        db
    }

    #[test]
    fn inverse_precedence_finds_predecessors() {
        let mut db = token_chain();
        db.ensure_loaded_all().unwrap();
        let spec = PrecedenceSpec { segmentation: None, dist: RangeSpec::exact(1) };
        let op = spec.create_operator(&db).expect("ordering component exists");
        let inverse = op.get_inverse_operator(&db).expect("precedence has an inverse");

        let tok3 = db.get_node_id_from_name("tok3").unwrap();
        let tok2 = db.get_node_id_from_name("tok2").unwrap();
        let tok1 = db.get_node_id_from_name("tok1").unwrap();

        let matched: Vec<NodeID> = inverse
            .retrieve_matches(&Match { node: tok3, anno_key: DEFAULT_ANNO_KEY.clone() })
            .map(|m| m.node)
            .collect();
        assert_eq!(matched, vec![tok2]);

        assert!(inverse.filter_match(
            &Match { node: tok3, anno_key: DEFAULT_ANNO_KEY.clone() },
            &Match { node: tok2, anno_key: DEFAULT_ANNO_KEY.clone() },
        ));
        assert!(!inverse.filter_match(
            &Match { node: tok3, anno_key: DEFAULT_ANNO_KEY.clone() },
            &Match { node: tok1, anno_key: DEFAULT_ANNO_KEY.clone() },
        ));
    }
}
