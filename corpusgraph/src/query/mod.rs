//! The target shape a JSON (or any other) query frontend builds: plain, documented
//! structs describing node searches and the joins between them. Decoding an actual
//! wire format into these is a frontend's job, not this crate's — tests here build
//! `ParsedDisjunction` values directly.

pub mod conjunction;
pub mod disjunction;

pub use conjunction::Conjunction;
pub use disjunction::Disjunction;

use crate::operator::EdgeAnnoSearchSpec;

/// How a node or join's annotation value is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatching {
    Exact,
    Regex,
}

/// One node search: an annotation filter plus whether a match should carry the
/// specific annotation that matched or the node's identity only (`any_anno = true`
/// wraps the search the way `ConstAnnoWrapper` does at the executor level).
#[derive(Debug, Clone)]
pub struct ParsedNode {
    pub ns: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub text_matching: TextMatching,
    pub any_anno: bool,
}

impl ParsedNode {
    /// An unconstrained node search: matches any node (`annis::node_type` wildcard).
    pub fn any() -> Self {
        ParsedNode {
            ns: None,
            name: None,
            value: None,
            text_matching: TextMatching::Exact,
            any_anno: true,
        }
    }

    pub fn exact(ns: Option<&str>, name: &str, value: Option<&str>) -> Self {
        ParsedNode {
            ns: ns.map(str::to_string),
            name: Some(name.to_string()),
            value: value.map(str::to_string),
            text_matching: TextMatching::Exact,
            any_anno: false,
        }
    }

    pub fn regex(ns: Option<&str>, name: &str, pattern: &str) -> Self {
        ParsedNode {
            ns: ns.map(str::to_string),
            name: Some(name.to_string()),
            value: Some(pattern.to_string()),
            text_matching: TextMatching::Regex,
            any_anno: false,
        }
    }
}

/// The kind of edge or coverage operator a join names, independent of which
/// components it ultimately resolves to.
#[derive(Debug, Clone)]
pub enum ParsedOperator {
    Dominance { name: Option<String>, min_dist: usize, max_dist: usize },
    Pointing { name: Option<String>, min_dist: usize, max_dist: usize },
    PartOfSubCorpus { min_dist: usize, max_dist: usize },
    Precedence { segmentation: Option<String>, min_dist: usize, max_dist: usize },
    Overlap,
    Inclusion,
    IdenticalCoverage,
    IdenticalNode,
}

/// A binary join between two node indices into the enclosing [`Conjunction`]'s node
/// list, with an optional edge-annotation constraint (only meaningful for edge
/// operators; ignored by coverage/identity ones).
#[derive(Debug, Clone)]
pub struct ParsedJoin {
    pub lhs: usize,
    pub rhs: usize,
    pub op: ParsedOperator,
    pub edge_anno: Option<EdgeAnnoSearchSpec>,
}

/// A top-level query: one or more alternative conjunctions, run to exhaustion in
/// sequence and unioned (see [`Disjunction`]).
#[derive(Debug, Clone, Default)]
pub struct ParsedDisjunction {
    pub alternatives: Vec<Conjunction>,
}

impl ParsedDisjunction {
    pub fn single(conjunction: Conjunction) -> Self {
        ParsedDisjunction { alternatives: vec![conjunction] }
    }
}
