//! Fallback join: caches the inner side once, then re-scans the cache for every
//! outer element. Used whenever an operator can't drive a seed join (no usable
//! `retrieve_matches`, or the planner has no selectivity estimate to prefer one side).

use super::{BoxedExecutionNode, ExecutionNode};
use crate::match_result::Match;
use crate::operator::BinaryOperator;
use std::iter::Peekable;

pub struct NestedLoop<'a> {
    outer: Peekable<BoxedExecutionNode<'a>>,
    inner_idx: usize,
    outer_idx: usize,
    op: Box<dyn BinaryOperator + 'a>,
    inner_cache: Vec<Vec<Match>>,
    cache_pos: Option<usize>,
    node_count: usize,
}

impl<'a> NestedLoop<'a> {
    pub fn new(
        op: Box<dyn BinaryOperator + 'a>,
        outer: BoxedExecutionNode<'a>,
        inner: BoxedExecutionNode<'a>,
        outer_idx: usize,
        inner_idx: usize,
    ) -> NestedLoop<'a> {
        let node_count = outer.node_count() + inner.node_count();
        let inner_cache: Vec<Vec<Match>> = inner.collect();
        NestedLoop {
            outer: outer.peekable(),
            inner_idx,
            outer_idx,
            op,
            inner_cache,
            cache_pos: None,
            node_count,
        }
    }
}

impl<'a> Iterator for NestedLoop<'a> {
    type Item = Vec<Match>;

    fn next(&mut self) -> Option<Vec<Match>> {
        loop {
            let m_outer = self.outer.peek()?.clone();
            let mut pos = self.cache_pos.unwrap_or(0);
            while pos < self.inner_cache.len() {
                let m_inner = &self.inner_cache[pos];
                pos += 1;
                self.cache_pos = Some(pos);
                let matched = self.op.filter_match(&m_outer[self.outer_idx], &m_inner[self.inner_idx]);
                if matched
                    && (self.op.is_reflexive()
                        || m_outer[self.outer_idx].node != m_inner[self.inner_idx].node
                        || m_outer[self.outer_idx].anno_key != m_inner[self.inner_idx].anno_key)
                {
                    let mut result = m_outer.clone();
                    result.extend(m_inner.clone());
                    return Some(result);
                }
            }
            self.cache_pos = Some(0);
            self.outer.next()?;
        }
    }
}

impl<'a> ExecutionNode for NestedLoop<'a> {
    fn node_count(&self) -> usize {
        self.node_count
    }
}
