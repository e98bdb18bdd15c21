//! `_ident_`: lhs and rhs must be the exact same node. Needs no components loaded.

use crate::match_result::Match;
use crate::operator::{BinaryOperator, BinaryOperatorSpec, EstimationType};
use corpusgraph_core::graph::{CorpusGraph, DEFAULT_ANNO_KEY};
use corpusgraph_core::Component;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialOrd, Ord, Hash, PartialEq, Eq)]
pub struct IdenticalNodeSpec;

impl BinaryOperatorSpec for IdenticalNodeSpec {
    fn necessary_components(&self, _db: &CorpusGraph) -> HashSet<Component> {
        HashSet::default()
    }

    fn create_operator<'a>(&self, _db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        Some(Box::new(IdenticalNode {}))
    }
}

#[derive(Clone, Debug)]
pub struct IdenticalNode;

impl fmt::Display for IdenticalNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "_ident_")
    }
}

impl BinaryOperator for IdenticalNode {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        Box::new(std::iter::once(Match {
            node: lhs.node,
            anno_key: DEFAULT_ANNO_KEY.clone(),
        }))
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        lhs.node == rhs.node
    }

    fn estimation_type(&self) -> EstimationType {
        EstimationType::Min
    }

    fn get_inverse_operator<'a>(&self, _graph: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        Some(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_matches_the_same_node() {
        let op = IdenticalNode;
        let a = Match { node: 1, anno_key: DEFAULT_ANNO_KEY.clone() };
        let b = Match { node: 1, anno_key: DEFAULT_ANNO_KEY.clone() };
        let c = Match { node: 2, anno_key: DEFAULT_ANNO_KEY.clone() };
        assert!(op.filter_match(&a, &b));
        assert!(!op.filter_match(&a, &c));
        assert_eq!(op.retrieve_matches(&a).count(), 1);
    }
}
