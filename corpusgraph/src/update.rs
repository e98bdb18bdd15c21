//! The public update API: re-exports the core crate's update log so callers never
//! need to depend on `corpusgraph-core` directly just to build one.

pub use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};
