//! Seed join: for each outer tuple, asks the operator directly for its candidates
//! (`retrieve_matches`) instead of scanning every inner tuple. Preferred whenever the
//! operator can produce candidates cheaply (any edge or coverage operator can).

use super::{BoxedExecutionNode, ExecutionNode};
use crate::match_result::Match;
use crate::operator::BinaryOperator;
use corpusgraph_core::AnnoKey;
use std::iter::Peekable;
use std::sync::Arc;
use std::vec::IntoIter;

/// Re-checks (and re-keys) a candidate the operator produced against the right-hand
/// side's own node search, since `BinaryOperator::retrieve_matches` only knows about
/// the operator, not any annotation filter placed on that query position.
pub type RhsFilter<'a> = Box<dyn Fn(corpusgraph_core::NodeID) -> Option<Arc<AnnoKey>> + 'a>;

pub struct IndexJoin<'a> {
    outer: Peekable<BoxedExecutionNode<'a>>,
    outer_idx: usize,
    op: Box<dyn BinaryOperator + 'a>,
    rhs_filter: Option<RhsFilter<'a>>,
    candidates: Option<IntoIter<Match>>,
    node_count: usize,
}

impl<'a> IndexJoin<'a> {
    pub fn new(
        op: Box<dyn BinaryOperator + 'a>,
        outer: BoxedExecutionNode<'a>,
        outer_idx: usize,
        rhs_filter: Option<RhsFilter<'a>>,
    ) -> IndexJoin<'a> {
        let node_count = outer.node_count() + 1;
        IndexJoin { outer: outer.peekable(), outer_idx, op, rhs_filter, candidates: None, node_count }
    }

    fn fill_candidates(&mut self) {
        let next = match self.outer.peek() {
            Some(m_outer) => self
                .op
                .retrieve_matches(&m_outer[self.outer_idx])
                .filter_map(|m| match &self.rhs_filter {
                    Some(f) => f(m.node).map(|anno_key| Match { node: m.node, anno_key }),
                    None => Some(m),
                })
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };
        self.candidates = Some(next.into_iter());
    }
}

impl<'a> Iterator for IndexJoin<'a> {
    type Item = Vec<Match>;

    fn next(&mut self) -> Option<Vec<Match>> {
        if self.candidates.is_none() {
            self.fill_candidates();
        }
        loop {
            let m_outer = self.outer.peek()?.clone();
            while let Some(m_rhs) = self.candidates.as_mut().unwrap().next() {
                if self.op.is_reflexive()
                    || m_outer[self.outer_idx].node != m_rhs.node
                    || m_outer[self.outer_idx].anno_key != m_rhs.anno_key
                {
                    let mut result = m_outer.clone();
                    result.push(m_rhs);
                    return Some(result);
                }
            }
            self.outer.next();
            self.fill_candidates();
            if self.outer.peek().is_none() {
                return None;
            }
        }
    }
}

impl<'a> ExecutionNode for IndexJoin<'a> {
    fn node_count(&self) -> usize {
        self.node_count
    }
}
