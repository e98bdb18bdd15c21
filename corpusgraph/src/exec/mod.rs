//! The physical operators a [`crate::query::Conjunction`] plan is built from, and the
//! trait that lets the planner compose them without knowing each other's concrete
//! type: every node search and join is an iterator of result tuples, one [`Match`]
//! per query-node position.

pub mod binary_filter;
pub mod indexjoin;
pub mod nestedloop;
pub mod nodesearch;

use crate::match_result::Match;

/// An iterator of result tuples that also knows how many positions each tuple has,
/// so a join built on top of it knows which index to append its own match at.
pub trait ExecutionNode: Iterator<Item = Vec<Match>> {
    fn node_count(&self) -> usize;
}

pub type BoxedExecutionNode<'a> = Box<dyn ExecutionNode + 'a>;
