//! Query engine and multi-corpus storage manager built on top of `corpusgraph-core`.
//!
//! This crate owns everything the core storage engine doesn't: binary operators,
//! joins, the query planner and executor, the relANNIS import, and the
//! [`CorpusStorage`](crate::corpusstorage::CorpusStorage) that caches and
//! background-persists many corpora at once. It has no notion of an AQL parser —
//! callers build `ParsedDisjunction`s directly.

pub mod corpusstorage;
pub mod errors;
pub mod exec;
pub mod match_result;
pub mod operator;
pub mod query;
pub mod relannis;
pub mod sort_matches;
pub mod token_helper;
pub mod update;

pub use errors::{GraphAnnisError, Result};
pub use match_result::Match;

pub use corpusgraph_core::graph::CorpusGraph;
