//! `_o_`: lhs and rhs share at least one covered token.

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
pub struct OverlapSpec;

impl BinaryOperatorSpec for OverlapSpec {
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
        Some(Box::new(Overlap { gs_order, gs_cov, gs_invcov, tok_helper }))
    }
}

struct Overlap<'a> {
    gs_order: &'a dyn GraphStorage,
    gs_cov: &'a dyn GraphStorage,
    gs_invcov: &'a dyn GraphStorage,
    tok_helper: TokenHelper<'a>,
}

impl<'a> fmt::Display for Overlap<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_o_")
    }
}

impl<'a> BinaryOperator for Overlap<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let mut result = FxHashSet::default();

        let covered: Vec<NodeID> = if self.tok_helper.is_token(lhs.node) {
            vec![lhs.node]
        } else {
            self.gs_cov.find_connected(lhs.node, 1, 1).collect()
        };

        for t in covered {
            for n in self.gs_invcov.find_connected(t, 1, 1) {
                result.insert(n);
            }
            result.insert(t);
        }

        Box::new(result.into_iter().map(|n| Match { node: n, anno_key: DEFAULT_ANNO_KEY.clone() }))
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        if let (Some(start_lhs), Some(end_lhs), Some(start_rhs), Some(end_rhs)) = (
            self.tok_helper.left_token(lhs.node),
            self.tok_helper.right_token(lhs.node),
            self.tok_helper.left_token(rhs.node),
            self.tok_helper.right_token(rhs.node),
        ) {
            // overlap holds when lhs's span and rhs's span are not disjoint in textual
            // order: lhs doesn't end before rhs starts, and rhs doesn't end before lhs starts
            self.gs_order.distance(start_lhs, end_rhs).is_some() && self.gs_order.distance(start_rhs, end_lhs).is_some()
        } else {
            false
        }
    }

    fn is_reflexive(&self) -> bool {
        false
    }

    fn is_commutative(&self) -> bool {
        true
    }

    fn get_inverse_operator<'b>(&self, graph: &'b CorpusGraph) -> Option<Box<dyn BinaryOperator + 'b>> {
        OverlapSpec.create_operator(graph)
    }

    fn estimation_type(&self) -> EstimationType {
        if let (Some(stats_cov), Some(stats_order)) = (self.gs_cov.get_statistics(), self.gs_order.get_statistics()) {
            let num_of_token = stats_order.nodes as f64;
            if num_of_token == 0.0 {
                return EstimationType::Selectivity(0.1);
            }
            if stats_cov.nodes == 0 {
                return EstimationType::Selectivity(1.0 / num_of_token);
            }
            let covered_token_per_node = stats_cov.fan_out_99_percentile as f64;
            let aligned_non_token = covered_token_per_node * (stats_cov.fan_out_99_percentile as f64);
            let sum_included = covered_token_per_node + aligned_non_token;
            return EstimationType::Selectivity(sum_included / (stats_cov.nodes as f64));
        }
        EstimationType::Selectivity(0.1)
    }
}
