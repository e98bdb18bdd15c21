//! The corpus graph: string-interned node annotations plus every edge-component
//! storage, with on-demand (lazy) component loading, atomic snapshotting and
//! write-ahead update replay.
//!
//! A [`CorpusGraph`] on its own only knows how to apply updates and save/load a
//! single snapshot; crash-safe backup-directory handling and background persistence
//! live in the `corpusgraph` crate's storage manager, which is the only thing that
//! should hold a `&mut CorpusGraph` for writing.

pub mod storage;
pub mod update;

use crate::annostorage::AnnoStorage;
use crate::errors::{GraphAnnisCoreError, Result};
use crate::stringstorage::StringStorage;
use crate::types::{AnnoKey, Annotation, Component, ComponentType, Edge, NodeID, ANNIS_NS, NODE_NAME, NODE_TYPE, TOK};
use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use storage::{registry, GraphStorage, WriteableGraphStorage};
use update::{GraphUpdate, UpdateEvent};

lazy_static! {
    pub static ref NODE_NAME_KEY: AnnoKey = AnnoKey::new(ANNIS_NS, NODE_NAME);
    pub static ref NODE_TYPE_KEY: AnnoKey = AnnoKey::new(ANNIS_NS, NODE_TYPE);
    /// Placeholder annotation key for a [`crate::graph::Match`] that denotes "the node
    /// itself", not one of its annotations (e.g. the result of an edge operator).
    pub static ref DEFAULT_ANNO_KEY: Arc<AnnoKey> = Arc::new(AnnoKey::default());
}

enum ComponentEntry {
    Loaded(Box<dyn WriteableGraphStorage>),
    /// Registered from disk but not yet deserialized; holds the directory to load from.
    Pending(PathBuf),
}

pub struct CorpusGraph {
    pub node_annos: AnnoStorage<NodeID>,
    pub strings: StringStorage,
    components: BTreeMap<Component, ComponentEntry>,
    location: Option<PathBuf>,
    current_change_id: u64,
}

fn component_to_relative_path(c: &Component) -> PathBuf {
    let mut p = PathBuf::new();
    p.push("gs");
    p.push(c.ctype.to_string());
    p.push(if c.layer.is_empty() { "default_layer" } else { &c.layer });
    p.push(&c.name);
    p
}

impl CorpusGraph {
    pub fn new() -> Self {
        CorpusGraph {
            node_annos: AnnoStorage::new(),
            strings: StringStorage::new(),
            components: BTreeMap::new(),
            location: None,
            current_change_id: 0,
        }
    }

    pub fn current_change_id(&self) -> u64 {
        self.current_change_id
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn clear(&mut self) {
        self.node_annos = AnnoStorage::new();
        self.strings.clear();
        self.components.clear();
    }

    pub fn all_components(&self) -> Vec<Component> {
        self.components.keys().cloned().collect()
    }

    /// Components matching an optional type and/or name filter, used by operators to
    /// resolve a named edge type (e.g. `dom` for Dominance) to its concrete components.
    pub fn get_all_components(&self, ctype: Option<ComponentType>, name: Option<&str>) -> Vec<Component> {
        self.components
            .keys()
            .filter(|c| ctype.map_or(true, |t| c.ctype == t))
            .filter(|c| name.map_or(true, |n| c.name == n))
            .cloned()
            .collect()
    }

    /// The annotation key used to mark a node as a token (`annis::tok`).
    pub fn get_token_key(&self) -> AnnoKey {
        AnnoKey::new(ANNIS_NS, TOK)
    }

    pub fn get_graphstorage(&mut self, c: &Component) -> Result<&dyn GraphStorage> {
        self.ensure_loaded(c)?;
        match self.components.get(c) {
            Some(ComponentEntry::Loaded(gs)) => Ok(gs.as_ref() as &dyn GraphStorage),
            _ => Err(GraphAnnisCoreError::MissingComponent(c.clone())),
        }
    }

    pub fn get_graphstorage_if_loaded(&self, c: &Component) -> Option<&dyn GraphStorage> {
        match self.components.get(c) {
            Some(ComponentEntry::Loaded(gs)) => Some(gs.as_ref() as &dyn GraphStorage),
            _ => None,
        }
    }

    fn ensure_loaded(&mut self, c: &Component) -> Result<()> {
        let needs_load = matches!(self.components.get(c), Some(ComponentEntry::Pending(_)));
        if needs_load {
            if let Some(ComponentEntry::Pending(path)) = self.components.remove(c) {
                let gs_readonly = registry::deserialize(&path)?;
                // ensure_loaded only needs read access; writers go through get_or_create_writable,
                // which re-derives a writable copy via the registry on first write.
                let tag = gs_readonly.serialization_id();
                let mut writable = registry::create_writeable(&tag)?;
                writable.copy_from(gs_readonly.as_ref())?;
                self.components.insert(c.clone(), ComponentEntry::Loaded(writable));
            }
        }
        Ok(())
    }

    pub fn ensure_loaded_all(&mut self) -> Result<()> {
        let pending: Vec<Component> = self
            .components
            .iter()
            .filter(|(_, e)| matches!(e, ComponentEntry::Pending(_)))
            .map(|(c, _)| c.clone())
            .collect();
        for c in pending {
            self.ensure_loaded(&c)?;
        }
        Ok(())
    }

    pub fn get_or_create_writable(&mut self, c: &Component) -> Result<&mut dyn WriteableGraphStorage> {
        self.ensure_loaded(c)?;
        if !self.components.contains_key(c) {
            let tag = registry::best_implementation_for(c.ctype, None);
            let gs = registry::create_writeable(tag)?;
            self.components.insert(c.clone(), ComponentEntry::Loaded(gs));
        }
        match self.components.get_mut(c) {
            Some(ComponentEntry::Loaded(gs)) => Ok(gs.as_mut()),
            _ => unreachable!("ensure_loaded guarantees a Loaded entry"),
        }
    }

    pub fn get_node_id_from_name(&self, node_name: &str) -> Option<NodeID> {
        self.node_annos
            .exact_anno_search(&NODE_NAME_KEY, node_name)
            .into_iter()
            .next()
    }

    // --- persistence -----------------------------------------------------

    pub fn load_from(&mut self, location: &Path) -> Result<()> {
        log::info!("loading corpus from {}", location.display());
        self.clear();
        self.location = Some(location.to_path_buf());

        let backup = location.join("backup");
        let backup_was_loaded = backup.is_dir();
        let dir2load = if backup_was_loaded { backup.clone() } else { location.join("current") };

        let nodes_path = dir2load.join("nodes_annos.bin");
        if nodes_path.is_file() {
            self.node_annos.load_from_file(&nodes_path)?;
        }
        let strings_path = dir2load.join("strings.bin");
        if strings_path.is_file() {
            self.strings.load_from_file(&strings_path)?;
        }

        self.find_components_from_disk(&dir2load)?;

        let log_path = dir2load.join("update_log.bin");
        let logfile_exists = log_path.is_file();

        if backup_was_loaded || logfile_exists {
            self.ensure_loaded_all()?;
        }

        if logfile_exists {
            let f = std::fs::File::open(&log_path)?;
            let mut update: GraphUpdate = bincode::deserialize_from(f)?;
            self.apply_update_in_memory(&mut update)?;
        } else {
            self.current_change_id = 0;
        }

        if backup_was_loaded {
            self.save_to(&location.join("current"))?;
            let tmp_dir = tempfile::Builder::new()
                .prefix("temporary-corpusgraph-backup")
                .tempdir_in(location)?;
            std::fs::remove_dir(tmp_dir.path())?;
            std::fs::rename(&backup, tmp_dir.path())?;
            tmp_dir.close()?;
        }

        Ok(())
    }

    fn find_components_from_disk(&mut self, location: &Path) -> Result<()> {
        self.components.clear();
        use strum::IntoEnumIterator;
        for ctype in ComponentType::iter() {
            let cpath = location.join("gs").join(ctype.to_string());
            if !cpath.is_dir() {
                continue;
            }
            for layer_entry in std::fs::read_dir(&cpath)? {
                let layer_entry = layer_entry?;
                if !layer_entry.path().is_dir() {
                    continue;
                }
                let layer = layer_entry.file_name().to_string_lossy().to_string();
                for name_entry in std::fs::read_dir(layer_entry.path())? {
                    let name_entry = name_entry?;
                    let name = name_entry.file_name().to_string_lossy().to_string();
                    let component = Component::new(ctype, layer.clone(), name);
                    let cfg = location.join(component_to_relative_path(&component)).join("impl.cfg");
                    if cfg.is_file() {
                        self.components
                            .insert(component, ComponentEntry::Pending(name_entry.path()));
                    }
                }
            }
        }
        Ok(())
    }

    fn internal_save(&mut self, location: &Path) -> Result<()> {
        std::fs::create_dir_all(location)?;
        self.node_annos.save_to_file(&location.join("nodes_annos.bin"))?;
        self.strings.save_to_file(&location.join("strings.bin"))?;

        self.ensure_loaded_all()?;
        for (c, entry) in &self.components {
            if let ComponentEntry::Loaded(gs) = entry {
                let dir = location.join(component_to_relative_path(c));
                gs.save_to(&dir)?;
                registry::write_impl_tag(&dir, &gs.serialization_id())?;
            }
        }
        Ok(())
    }

    pub fn save_to(&mut self, location: &Path) -> Result<()> {
        self.internal_save(&location.join("current"))
    }

    pub fn persist_to(&mut self, location: &Path) -> Result<()> {
        self.location = Some(location.to_path_buf());
        self.internal_save(&location.join("current"))
    }

    pub fn estimate_memory(&self) -> usize {
        let mut size = self.node_annos.estimate_memory() + self.strings.estimate_memory();
        for entry in self.components.values() {
            if let ComponentEntry::Loaded(gs) = entry {
                size += gs.get_anno_storage().estimate_memory();
            }
        }
        size
    }

    // --- update application -----------------------------------------------

    /// Applies every event up to `u`'s watermark. Events beyond it, or whose
    /// precondition fails, are silently skipped — see the module-level update log
    /// semantics for why: only what's been marked consistent is durable.
    pub fn apply_update_in_memory(&mut self, u: &mut GraphUpdate) -> Result<()> {
        let all_components = self.all_components();
        for change in u.consistent_events().cloned().collect::<Vec<_>>() {
            match change {
                UpdateEvent::AddNode { node_name, node_type } => {
                    if self.get_node_id_from_name(&node_name).is_none() {
                        let new_id = self
                            .node_annos
                            .distinct_items()
                            .into_iter()
                            .max()
                            .map(|m| m + 1)
                            .unwrap_or(0);
                        self.node_annos.insert(
                            new_id,
                            Annotation { key: NODE_NAME_KEY.clone(), val: node_name },
                        );
                        self.node_annos.insert(
                            new_id,
                            Annotation { key: NODE_TYPE_KEY.clone(), val: node_type },
                        );
                    }
                }
                UpdateEvent::DeleteNode { node_name } => {
                    if let Some(id) = self.get_node_id_from_name(&node_name) {
                        self.node_annos.remove_item(&id);
                        for c in &all_components {
                            self.get_or_create_writable(c)?.delete_node(id);
                        }
                    }
                }
                UpdateEvent::AddNodeLabel { node_name, anno_ns, anno_name, anno_value } => {
                    if let Some(id) = self.get_node_id_from_name(&node_name) {
                        self.node_annos.insert(
                            id,
                            Annotation { key: AnnoKey::new(anno_ns, anno_name), val: anno_value },
                        );
                    }
                }
                UpdateEvent::DeleteNodeLabel { node_name, anno_ns, anno_name } => {
                    if let Some(id) = self.get_node_id_from_name(&node_name) {
                        self.node_annos.remove(&id, &AnnoKey::new(anno_ns, anno_name));
                    }
                }
                UpdateEvent::AddEdge { source_node, target_node, layer, component_type, component_name } => {
                    if let (Some(source), Some(target), Ok(ctype)) = (
                        self.get_node_id_from_name(&source_node),
                        self.get_node_id_from_name(&target_node),
                        ComponentType::from_str(&component_type),
                    ) {
                        let c = Component::new(ctype, layer, component_name);
                        self.get_or_create_writable(&c)?.add_edge(Edge { source, target });
                    }
                }
                UpdateEvent::DeleteEdge { source_node, target_node, layer, component_type, component_name } => {
                    if let (Some(source), Some(target), Ok(ctype)) = (
                        self.get_node_id_from_name(&source_node),
                        self.get_node_id_from_name(&target_node),
                        ComponentType::from_str(&component_type),
                    ) {
                        let c = Component::new(ctype, layer, component_name);
                        self.get_or_create_writable(&c)?.delete_edge(Edge { source, target });
                    }
                }
                UpdateEvent::AddEdgeLabel {
                    source_node, target_node, layer, component_type, component_name,
                    anno_ns, anno_name, anno_value,
                } => {
                    if let (Some(source), Some(target), Ok(ctype)) = (
                        self.get_node_id_from_name(&source_node),
                        self.get_node_id_from_name(&target_node),
                        ComponentType::from_str(&component_type),
                    ) {
                        let c = Component::new(ctype, layer, component_name);
                        let gs = self.get_or_create_writable(&c)?;
                        if gs.is_connected(source, target, 1, 1) {
                            gs.add_edge_annotation(
                                Edge { source, target },
                                Annotation { key: AnnoKey::new(anno_ns, anno_name), val: anno_value },
                            );
                        }
                    }
                }
                UpdateEvent::DeleteEdgeLabel {
                    source_node, target_node, layer, component_type, component_name,
                    anno_ns, anno_name,
                } => {
                    if let (Some(source), Some(target), Ok(ctype)) = (
                        self.get_node_id_from_name(&source_node),
                        self.get_node_id_from_name(&target_node),
                        ComponentType::from_str(&component_type),
                    ) {
                        let c = Component::new(ctype, layer, component_name);
                        let gs = self.get_or_create_writable(&c)?;
                        if gs.is_connected(source, target, 1, 1) {
                            gs.delete_edge_annotation(
                                Edge { source, target },
                                &AnnoKey::new(anno_ns, anno_name),
                            );
                        }
                    }
                }
            }
            self.current_change_id = u.last_consistent_change_id();
        }
        for c in &all_components {
            if let Ok(gs) = self.get_or_create_writable(c) {
                gs.calculate_index();
            }
        }
        Ok(())
    }
}

impl Default for CorpusGraph {
    fn default() -> Self {
        Self::new()
    }
}
