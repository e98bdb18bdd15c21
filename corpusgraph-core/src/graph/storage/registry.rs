//! Dispatches graph-storage implementations by a string tag (stored next to each
//! component's serialized data in its `impl.cfg` file) and picks the best
//! implementation for a component given its type and observed statistics.

use crate::errors::{GraphAnnisCoreError, Result};
use crate::graph::storage::adjacencylist::AdjacencyListStorage;
use crate::graph::storage::dense_adjacency::DenseAdjacencyListStorage;
use crate::graph::storage::linear::LinearStorage;
use crate::graph::storage::prepost::PrePostOrderStorage;
use crate::graph::storage::{GraphStorage, WriteableGraphStorage};
use crate::types::{ComponentType, GraphStatistic};
use std::io::Read;
use std::path::Path;

pub const ADJACENCY_LIST: &str = "AdjacencyListV1";
pub const PRE_POST_ORDER: &str = "PrePostOrderV1";
pub const LINEAR: &str = "LinearV1";
pub const DENSE_ADJACENCY: &str = "DenseAdjacencyListV1";

/// Creates a fresh, empty, writable storage for the given tag.
pub fn create_writeable(tag: &str) -> Result<Box<dyn WriteableGraphStorage>> {
    match tag {
        ADJACENCY_LIST => Ok(Box::new(AdjacencyListStorage::new())),
        PRE_POST_ORDER => Ok(Box::new(PrePostOrderStorage::new())),
        LINEAR => Ok(Box::new(LinearStorage::new())),
        DENSE_ADJACENCY => Ok(Box::new(DenseAdjacencyListStorage::new())),
        other => Err(GraphAnnisCoreError::UnknownGraphStorageImpl(other.to_string())),
    }
}

/// Reads `impl.cfg` and the serialized component next to it, returning a read-only
/// handle. Used by the lazy-component loader.
pub fn deserialize(directory: &Path) -> Result<Box<dyn GraphStorage>> {
    let mut impl_name = String::new();
    std::fs::File::open(directory.join("impl.cfg"))?.read_to_string(&mut impl_name)?;
    let impl_name = impl_name.trim();

    let component_path = directory.join("component.bin");
    let f = std::fs::File::open(&component_path)?;
    let mut r = std::io::BufReader::new(f);

    match impl_name {
        ADJACENCY_LIST => {
            let gs: AdjacencyListStorage = bincode::deserialize_from(&mut r)?;
            Ok(Box::new(gs))
        }
        PRE_POST_ORDER => {
            let gs: PrePostOrderStorage = bincode::deserialize_from(&mut r)?;
            Ok(Box::new(gs))
        }
        LINEAR => {
            let gs: LinearStorage = bincode::deserialize_from(&mut r)?;
            Ok(Box::new(gs))
        }
        DENSE_ADJACENCY => {
            let gs: DenseAdjacencyListStorage = bincode::deserialize_from(&mut r)?;
            Ok(Box::new(gs))
        }
        other => Err(GraphAnnisCoreError::UnknownGraphStorageImpl(other.to_string())),
    }
}

pub fn write_impl_tag(directory: &Path, tag: &str) -> Result<()> {
    std::fs::create_dir_all(directory)?;
    std::fs::write(directory.join("impl.cfg"), tag)?;
    Ok(())
}

/// Picks the implementation a component of `ctype` should use once its statistics
/// are known: ordering-like types always get the O(1)-distance linear storage;
/// rooted, acyclic types get pre/post order; everything else keeps the always-correct
/// adjacency list. A component whose statistics are not yet known (freshly created,
/// still being written to) stays on the adjacency list until the next recalculation.
pub fn best_implementation_for(ctype: ComponentType, stats: Option<&GraphStatistic>) -> &'static str {
    if ctype.is_ordering_like() {
        return LINEAR;
    }
    if let Some(stats) = stats {
        if ctype.prefers_acyclic_storage() && !stats.cyclic && stats.rooted_tree {
            return PRE_POST_ORDER;
        }
        if stats.max_fan_out <= 1 {
            return DENSE_ADJACENCY;
        }
    }
    ADJACENCY_LIST
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_components_always_get_linear_storage() {
        assert_eq!(
            best_implementation_for(ComponentType::Ordering, None),
            LINEAR
        );
    }

    #[test]
    fn unknown_statistics_default_to_adjacency_list() {
        assert_eq!(
            best_implementation_for(ComponentType::Dominance, None),
            ADJACENCY_LIST
        );
    }

    #[test]
    fn rooted_acyclic_dominance_prefers_prepost() {
        let stats = GraphStatistic {
            valid: true,
            cyclic: false,
            rooted_tree: true,
            ..Default::default()
        };
        assert_eq!(
            best_implementation_for(ComponentType::Dominance, Some(&stats)),
            PRE_POST_ORDER
        );
    }
}
