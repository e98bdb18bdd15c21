//! Core value types shared by the storage engine: node and string identifiers,
//! annotations, edges and the closed set of edge-component types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a single graph node. Dense but not necessarily contiguous after deletions.
pub type NodeID = u64;

/// Identifies an interned string in a [`crate::stringstorage::StringStorage`].
/// `0` is reserved for "any"/unset.
pub type StringID = u32;

pub const ANNIS_NS: &str = "annis";
pub const TOK: &str = "tok";
pub const NODE_NAME: &str = "node_name";
pub const NODE_TYPE: &str = "node_type";

/// The fully qualified name of an annotation: a namespace plus a name.
#[derive(Serialize, Deserialize, Default, Eq, PartialEq, PartialOrd, Ord, Clone, Debug, Hash)]
pub struct AnnoKey {
    pub ns: String,
    pub name: String,
}

impl AnnoKey {
    pub fn new(ns: impl Into<String>, name: impl Into<String>) -> Self {
        AnnoKey {
            ns: ns.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for AnnoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ns.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.ns, self.name)
        }
    }
}

/// A key/value annotation attached to a node or an edge.
#[derive(Serialize, Deserialize, Default, Eq, PartialEq, PartialOrd, Ord, Clone, Debug, Hash)]
pub struct Annotation {
    pub key: AnnoKey,
    pub val: String,
}

/// A directed edge between two nodes, identified by their IDs.
#[derive(Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Hash, Default)]
pub struct Edge {
    pub source: NodeID,
    pub target: NodeID,
}

impl Edge {
    pub fn inverse(&self) -> Edge {
        Edge {
            source: self.target,
            target: self.source,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// The closed set of edge-component types a corpus graph can have.
///
/// Kept as a concrete enum rather than an extensible trait: the query engine needs to
/// exhaustively reason about which types are cyclic-safe, which support pre/post order,
/// and which feed the token helper, and a closed set keeps that reasoning total.
#[derive(
    Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Copy, Debug, strum_macros::Display, strum_macros::EnumString, strum_macros::EnumIter,
)]
pub enum ComponentType {
    Coverage,
    InverseCoverage,
    Dominance,
    Pointing,
    Ordering,
    LeftToken,
    RightToken,
    PartOfSubCorpus,
}

impl ComponentType {
    /// Components of this type never contain cycles and can use the pre/post-order storage.
    pub fn prefers_acyclic_storage(self) -> bool {
        matches!(
            self,
            ComponentType::Dominance | ComponentType::PartOfSubCorpus
        )
    }

    pub fn is_ordering_like(self) -> bool {
        matches!(
            self,
            ComponentType::Ordering | ComponentType::LeftToken | ComponentType::RightToken
        )
    }
}

/// Identifies one edge-component: its type, an optional grouping layer, and a name.
#[derive(Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Debug)]
pub struct Component {
    pub ctype: ComponentType,
    pub layer: String,
    pub name: String,
}

impl Component {
    pub fn new(ctype: ComponentType, layer: impl Into<String>, name: impl Into<String>) -> Self {
        Component {
            ctype,
            layer: layer.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.ctype, self.layer, self.name)
    }
}

impl FromStr for Component {
    type Err = crate::errors::GraphAnnisCoreError;

    /// Parses the `ctype/layer/name` textual form used in error messages and CLI-adjacent tooling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.splitn(3, '/');
        let ctype = split
            .next()
            .ok_or_else(|| Self::Err::InvalidComponentDescriptionFormat(s.to_string()))?;
        let layer = split
            .next()
            .ok_or_else(|| Self::Err::InvalidComponentDescriptionFormat(s.to_string()))?;
        let name = split
            .next()
            .ok_or_else(|| Self::Err::InvalidComponentDescriptionFormat(s.to_string()))?;
        let ctype = ComponentType::from_str(ctype)
            .map_err(|_| Self::Err::InvalidComponentType(ctype.to_string()))?;
        Ok(Component::new(ctype, layer, name))
    }
}

/// Aggregate structural statistics for a single edge-component storage.
/// Recomputed on demand; never kept incrementally up to date across writes.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GraphStatistic {
    pub valid: bool,
    pub nodes: usize,
    pub avg_fan_out: f64,
    pub max_fan_out: usize,
    pub fan_out_99_percentile: usize,
    pub max_depth: usize,
    pub dfs_visit_ratio: f64,
    pub cyclic: bool,
    pub rooted_tree: bool,
}
