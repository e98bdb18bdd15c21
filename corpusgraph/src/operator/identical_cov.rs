//! `_=_`: lhs and rhs cover exactly the same span of token (same leftmost and
//! rightmost aligned token).

use crate::match_result::Match;
use crate::operator::{BinaryOperator, BinaryOperatorSpec, EstimationType};
use crate::token_helper::{self, TokenHelper};
use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::{CorpusGraph, DEFAULT_ANNO_KEY};
use corpusgraph_core::{Component, ComponentType, ANNIS_NS};
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Debug, PartialOrd, Ord, Hash, PartialEq, Eq)]
pub struct IdenticalCoverageSpec;

impl BinaryOperatorSpec for IdenticalCoverageSpec {
    fn necessary_components(&self, db: &CorpusGraph) -> HashSet<Component> {
        let mut v = HashSet::new();
        v.insert(Component::new(ComponentType::LeftToken, ANNIS_NS, ""));
        v.insert(Component::new(ComponentType::Ordering, ANNIS_NS, ""));
        v.extend(token_helper::necessary_components(db));
        v
    }

    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        let gs_left = db.get_graphstorage_if_loaded(&Component::new(ComponentType::LeftToken, ANNIS_NS, ""))?;
        let gs_order = db.get_graphstorage_if_loaded(&Component::new(ComponentType::Ordering, ANNIS_NS, ""))?;
        let tok_helper = TokenHelper::new(db)?;
        Some(Box::new(IdenticalCoverage { gs_left, gs_order, tok_helper }))
    }
}

struct IdenticalCoverage<'a> {
    gs_left: &'a dyn GraphStorage,
    gs_order: &'a dyn GraphStorage,
    tok_helper: TokenHelper<'a>,
}

impl<'a> fmt::Display for IdenticalCoverage<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_=_")
    }
}

impl<'a> BinaryOperator for IdenticalCoverage<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let (Some(n_left), Some(n_right)) = (self.tok_helper.left_token(lhs.node), self.tok_helper.right_token(lhs.node)) else {
            return Box::new(std::iter::empty());
        };

        let mut result = Vec::new();
        if n_left == n_right {
            result.push(n_left);
        }
        for c in self.gs_left.ingoing_edges(n_left).collect::<Vec<_>>() {
            if self.tok_helper.right_token(c) == Some(n_right) {
                result.push(c);
            }
        }
        Box::new(result.into_iter().map(|n| Match { node: n, anno_key: DEFAULT_ANNO_KEY.clone() }))
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        let spans = (
            self.tok_helper.left_token(lhs.node),
            self.tok_helper.right_token(lhs.node),
            self.tok_helper.left_token(rhs.node),
            self.tok_helper.right_token(rhs.node),
        );
        matches!(spans, (Some(sl), Some(el), Some(sr), Some(er)) if sl == sr && el == er)
    }

    fn is_reflexive(&self) -> bool {
        false
    }

    fn get_inverse_operator<'b>(&self, graph: &'b CorpusGraph) -> Option<Box<dyn BinaryOperator + 'b>> {
        IdenticalCoverageSpec.create_operator(graph)
    }

    fn estimation_type(&self) -> EstimationType {
        if let Some(stats) = self.gs_order.get_statistics() {
            if stats.nodes > 0 {
                // same left-aligned token and same length; length match assumed
                // independent and likely, absent a length histogram
                return EstimationType::Selectivity(1.0 / stats.nodes as f64);
            }
        }
        EstimationType::Selectivity(0.1)
    }
}
