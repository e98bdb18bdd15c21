//! Pure-predicate join: applies an operator as a filter over tuples that already
//! carry both positions (the two indices ended up in the same connected component of
//! the query graph before this join was reached).

use super::{BoxedExecutionNode, ExecutionNode};
use crate::match_result::Match;
use crate::operator::BinaryOperator;

pub struct BinaryFilter<'a> {
    it: BoxedExecutionNode<'a>,
    lhs_idx: usize,
    rhs_idx: usize,
    op: Box<dyn BinaryOperator + 'a>,
}

impl<'a> BinaryFilter<'a> {
    pub fn new(
        op: Box<dyn BinaryOperator + 'a>,
        it: BoxedExecutionNode<'a>,
        lhs_idx: usize,
        rhs_idx: usize,
    ) -> BinaryFilter<'a> {
        BinaryFilter { it, lhs_idx, rhs_idx, op }
    }
}

impl<'a> Iterator for BinaryFilter<'a> {
    type Item = Vec<Match>;

    fn next(&mut self) -> Option<Vec<Match>> {
        for tuple in self.it.by_ref() {
            if self.op.filter_match(&tuple[self.lhs_idx], &tuple[self.rhs_idx]) {
                return Some(tuple);
            }
        }
        None
    }
}

impl<'a> ExecutionNode for BinaryFilter<'a> {
    fn node_count(&self) -> usize {
        self.it.node_count()
    }
}
