//! `_i_`: lhs's covered span is entirely contained within rhs's covered span.

use crate::match_result::Match;
use crate::operator::{BinaryOperator, BinaryOperatorSpec, EstimationType};
use crate::token_helper::{self, TokenHelper};
use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::{CorpusGraph, DEFAULT_ANNO_KEY};
use corpusgraph_core::{Component, ComponentType, NodeID, ANNIS_NS};
use rustc_hash::FxHashSet;
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Debug, PartialOrd, Ord, Hash, PartialEq, Eq)]
pub struct InclusionSpec;

impl BinaryOperatorSpec for InclusionSpec {
    fn necessary_components(&self, db: &CorpusGraph) -> HashSet<Component> {
        let mut v = HashSet::new();
        v.insert(Component::new(ComponentType::Ordering, ANNIS_NS, ""));
        v.insert(Component::new(ComponentType::Coverage, ANNIS_NS, ""));
        v.insert(Component::new(ComponentType::InverseCoverage, ANNIS_NS, ""));
        v.extend(token_helper::necessary_components(db));
        v
    }

    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        let gs_order = db.get_graphstorage_if_loaded(&Component::new(ComponentType::Ordering, ANNIS_NS, ""))?;
        let gs_cov = db.get_graphstorage_if_loaded(&Component::new(ComponentType::Coverage, ANNIS_NS, ""))?;
        let gs_invcov = db.get_graphstorage_if_loaded(&Component::new(ComponentType::InverseCoverage, ANNIS_NS, ""))?;
        let tok_helper = TokenHelper::new(db)?;
        Some(Box::new(Inclusion { gs_order, gs_cov, gs_invcov, tok_helper }))
    }
}

/// Every node sharing at least one covered token with `seed`: its own covered
/// token(s), then every structural node reachable backward from those tokens via
/// inverse coverage. Contains both potential containers and containees of `seed` —
/// callers narrow the direction with their own containment check.
fn shared_coverage_candidates(tok_helper: &TokenHelper, gs_cov: &dyn GraphStorage, gs_invcov: &dyn GraphStorage, seed: NodeID) -> FxHashSet<NodeID> {
    let mut result = FxHashSet::default();
    let covered: Vec<NodeID> =
        if tok_helper.is_token(seed) { vec![seed] } else { gs_cov.find_connected(seed, 1, 1).collect() };
    for t in &covered {
        for n in gs_invcov.find_connected(*t, 1, 1) {
            result.insert(n);
        }
    }
    result
}

/// `true` if `container`'s span starts at or before, and ends at or after,
/// `containee`'s span.
fn contains(gs_order: &dyn GraphStorage, tok_helper: &TokenHelper, container: NodeID, containee: NodeID) -> bool {
    let (Some(start_container), Some(end_container), Some(start_containee), Some(end_containee)) = (
        tok_helper.left_token(container),
        tok_helper.right_token(container),
        tok_helper.left_token(containee),
        tok_helper.right_token(containee),
    ) else {
        return false;
    };
    let starts_before_or_at =
        start_container == start_containee || gs_order.distance(start_container, start_containee).is_some();
    let ends_after_or_at = end_container == end_containee || gs_order.distance(end_containee, end_container).is_some();
    starts_before_or_at && ends_after_or_at
}

struct Inclusion<'a> {
    gs_order: &'a dyn GraphStorage,
    gs_cov: &'a dyn GraphStorage,
    gs_invcov: &'a dyn GraphStorage,
    tok_helper: TokenHelper<'a>,
}

impl<'a> fmt::Display for Inclusion<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_i_")
    }
}

impl<'a> BinaryOperator for Inclusion<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let mut candidates = shared_coverage_candidates(&self.tok_helper, self.gs_cov, self.gs_invcov, lhs.node);
        candidates.retain(|&n| contains(self.gs_order, &self.tok_helper, n, lhs.node));
        Box::new(candidates.into_iter().map(|n| Match { node: n, anno_key: DEFAULT_ANNO_KEY.clone() }))
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        contains(self.gs_order, &self.tok_helper, rhs.node, lhs.node)
    }

    fn is_reflexive(&self) -> bool {
        true
    }

    fn get_inverse_operator<'b>(&self, graph: &'b CorpusGraph) -> Option<Box<dyn BinaryOperator + 'b>> {
        let gs_order = graph.get_graphstorage_if_loaded(&Component::new(ComponentType::Ordering, ANNIS_NS, ""))?;
        let gs_cov = graph.get_graphstorage_if_loaded(&Component::new(ComponentType::Coverage, ANNIS_NS, ""))?;
        let gs_invcov = graph.get_graphstorage_if_loaded(&Component::new(ComponentType::InverseCoverage, ANNIS_NS, ""))?;
        let tok_helper = TokenHelper::new(graph)?;
        Some(Box::new(InverseInclusion { gs_order, gs_cov, gs_invcov, tok_helper }))
    }

    fn estimation_type(&self) -> EstimationType {
        if let Some(stats) = self.gs_order.get_statistics() {
            if stats.nodes > 0 {
                return EstimationType::Selectivity(1.0 / stats.nodes as f64);
            }
        }
        EstimationType::Selectivity(0.1)
    }
}

/// `_i_` is not symmetric (lhs contained in rhs is not the same as rhs contained in
/// lhs), unlike overlap or identical-coverage: given a seed playing the role of the
/// original container, finds the spans it contains.
struct InverseInclusion<'a> {
    gs_order: &'a dyn GraphStorage,
    gs_cov: &'a dyn GraphStorage,
    gs_invcov: &'a dyn GraphStorage,
    tok_helper: TokenHelper<'a>,
}

impl<'a> fmt::Display for InverseInclusion<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_i_ (inverse)")
    }
}

impl<'a> BinaryOperator for InverseInclusion<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let mut candidates = shared_coverage_candidates(&self.tok_helper, self.gs_cov, self.gs_invcov, lhs.node);
        candidates.retain(|&n| contains(self.gs_order, &self.tok_helper, lhs.node, n));
        Box::new(candidates.into_iter().map(|n| Match { node: n, anno_key: DEFAULT_ANNO_KEY.clone() }))
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        contains(self.gs_order, &self.tok_helper, lhs.node, rhs.node)
    }

    fn is_reflexive(&self) -> bool {
        true
    }

    fn estimation_type(&self) -> EstimationType {
        if let Some(stats) = self.gs_order.get_statistics() {
            if stats.nodes > 0 {
                return EstimationType::Selectivity(1.0 / stats.nodes as f64);
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

    /// Two tokens `tok1 . tok2`; `span1` covers only `tok1`, `span12` covers both,
    /// so `span1` is contained in `span12` but not the other way around.
    fn nested_span_corpus() -> CorpusGraph {
        let mut db = CorpusGraph::new();
        let mut u = GraphUpdate::new();
        for name in ["tok1", "tok2"] {
            u.add_event(UpdateEvent::AddNode { node_name: name.into(), node_type: "node".into() });
            u.add_event(UpdateEvent::AddNodeLabel {
                node_name: name.into(),
                anno_ns: ANNIS_NS.into(),
                anno_name: TOK.into(),
                anno_value: name.into(),
            });
        }
        u.add_event(UpdateEvent::AddEdge {
            source_node: "tok1".into(),
            target_node: "tok2".into(),
            layer: ANNIS_NS.into(),
            component_type: ComponentType::Ordering.to_string(),
            component_name: "".into(),
        });
        for (span, covered, left, right) in [("span1", vec!["tok1"], "tok1", "tok1"), ("span12", vec!["tok1", "tok2"], "tok1", "tok2")] {
            u.add_event(UpdateEvent::AddNode { node_name: span.into(), node_type: "node".into() });
            for tok in &covered {
                u.add_event(UpdateEvent::AddEdge {
                    source_node: span.into(),
                    target_node: (*tok).into(),
                    layer: ANNIS_NS.into(),
                    component_type: ComponentType::Coverage.to_string(),
                    component_name: "".into(),
                });
                u.add_event(UpdateEvent::AddEdge {
                    source_node: (*tok).into(),
                    target_node: span.into(),
                    layer: ANNIS_NS.into(),
                    component_type: ComponentType::InverseCoverage.to_string(),
                    component_name: "".into(),
                });
            }
            u.add_event(UpdateEvent::AddEdge {
                source_node: span.into(),
                target_node: left.into(),
                layer: ANNIS_NS.into(),
                component_type: ComponentType::LeftToken.to_string(),
                component_name: "".into(),
            });
            u.add_event(UpdateEvent::AddEdge {
                source_node: span.into(),
                target_node: right.into(),
                layer: ANNIS_NS.into(),
                component_type: ComponentType::RightToken.to_string(),
                component_name: "".into(),
            });
        }
        u.finish();
        db.apply_update_in_memory(&mut u).unwrap();
        db
    }

    #[test]
    fn inverse_inclusion_finds_contained_spans() {
        let mut db = nested_span_corpus();
        db.ensure_loaded_all().unwrap();
        let op = InclusionSpec.create_operator(&db).expect("coverage components exist");
        let inverse = op.get_inverse_operator(&db).expect("inclusion has an inverse");

        let span1 = db.get_node_id_from_name("span1").unwrap();
        let span12 = db.get_node_id_from_name("span12").unwrap();

        assert!(op.filter_match(
            &Match { node: span1, anno_key: DEFAULT_ANNO_KEY.clone() },
            &Match { node: span12, anno_key: DEFAULT_ANNO_KEY.clone() },
        ));
        assert!(!op.filter_match(
            &Match { node: span12, anno_key: DEFAULT_ANNO_KEY.clone() },
            &Match { node: span1, anno_key: DEFAULT_ANNO_KEY.clone() },
        ));

        let matched: Vec<NodeID> = inverse
            .retrieve_matches(&Match { node: span12, anno_key: DEFAULT_ANNO_KEY.clone() })
            .map(|m| m.node)
            .collect();
        assert!(matched.contains(&span1));
        assert!(inverse.filter_match(
            &Match { node: span12, anno_key: DEFAULT_ANNO_KEY.clone() },
            &Match { node: span1, anno_key: DEFAULT_ANNO_KEY.clone() },
        ));
        assert!(!inverse.filter_match(
            &Match { node: span1, anno_key: DEFAULT_ANNO_KEY.clone() },
            &Match { node: span12, anno_key: DEFAULT_ANNO_KEY.clone() },
        ));
    }
}
