//! Multi-corpus cache and durability manager.
//!
//! A single [`CorpusStorage`] owns a directory of corpora on disk and a bounded
//! in-memory cache of the ones currently loaded. Every public operation goes
//! through [`CorpusStorage::get_entry`], which is the only place that acquires the
//! cache map's own short-lived lock; once a corpus's `Arc<RwLock<CorpusGraph>>` is
//! in hand, all further locking is per-corpus, never back through the cache map
//! (cache mutex before loader lock, never the reverse).

use crate::errors::{GraphAnnisError, Result};
use crate::match_result::format_match;
use crate::query::{Disjunction, ParsedDisjunction};
use crate::relannis::RelAnnisTables;
use crate::sort_matches::compare_matchgroup_by_text_pos;
use crate::token_helper::TokenHelper;
use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};
use corpusgraph_core::graph::CorpusGraph;
use corpusgraph_core::{AnnoKey, Component, ComponentType, NodeID, ANNIS_NS, NODE_NAME};
use linked_hash_map::LinkedHashMap;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::JoinHandle;
use std::{fmt, thread};

/// How the cache decides it has grown too large.
#[derive(Debug, Clone)]
pub enum CacheStrategy {
    /// Fixed cap, in megabytes.
    FixedMaxMemory(usize),
    /// Percent of currently free system memory, re-evaluated on every load.
    PercentOfFreeMemory(f64),
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::PercentOfFreeMemory(25.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadStatus {
    NotLoaded,
    PartiallyLoaded(usize),
    FullyLoaded(usize),
}

#[derive(Debug, Clone)]
pub struct CorpusInfo {
    pub name: String,
    pub load_status: LoadStatus,
    pub components: Vec<Component>,
}

impl fmt::Display for CorpusInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.load_status {
            LoadStatus::NotLoaded => write!(f, "{}: not loaded", self.name),
            LoadStatus::PartiallyLoaded(mem) => write!(f, "{}: partially loaded ({} bytes)", self.name, mem),
            LoadStatus::FullyLoaded(mem) => write!(f, "{}: fully loaded ({} bytes)", self.name, mem),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountExtra {
    pub match_count: u64,
    pub document_count: u64,
}

struct WriterHandle {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WriterHandle {
    fn cancel_and_join(self) {
        self.cancel.store(true, AtomicOrdering::SeqCst);
        if let Some(h) = self.handle {
            let _ = h.join();
        }
    }
}

fn ordering_component() -> Component {
    Component::new(ComponentType::Ordering, ANNIS_NS, "")
}

fn node_name_key() -> AnnoKey {
    AnnoKey::new(ANNIS_NS, NODE_NAME)
}

fn create_lockfile_for_directory(db_dir: &Path) -> Result<File> {
    std::fs::create_dir_all(db_dir)?;
    let path = db_dir.join("db.lock");
    let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
    fs2::FileExt::try_lock_exclusive(&file)?;
    Ok(file)
}

/// Caches, queries and durably persists many corpora under one directory.
pub struct CorpusStorage {
    db_dir: PathBuf,
    lock_file: File,
    cache_strategy: CacheStrategy,
    corpus_cache: RwLock<LinkedHashMap<String, Arc<RwLock<CorpusGraph>>>>,
    writers: Mutex<std::collections::HashMap<String, WriterHandle>>,
    active_background_workers: Arc<(Mutex<usize>, Condvar)>,
}

impl CorpusStorage {
    pub fn with_cache_strategy(db_dir: &Path, cache_strategy: CacheStrategy) -> Result<CorpusStorage> {
        std::fs::create_dir_all(db_dir)?;
        Ok(CorpusStorage {
            db_dir: db_dir.to_path_buf(),
            lock_file: create_lockfile_for_directory(db_dir)?,
            cache_strategy,
            corpus_cache: RwLock::new(LinkedHashMap::new()),
            writers: Mutex::new(std::collections::HashMap::new()),
            active_background_workers: Arc::new((Mutex::new(0), Condvar::new())),
        })
    }

    pub fn with_auto_cache_size(db_dir: &Path) -> Result<CorpusStorage> {
        Self::with_cache_strategy(db_dir, CacheStrategy::default())
    }

    fn max_cache_size(&self, used: usize) -> usize {
        match self.cache_strategy {
            CacheStrategy::FixedMaxMemory(megabytes) => megabytes * 1_000_000,
            CacheStrategy::PercentOfFreeMemory(percent) => match sys_info::mem_info() {
                Ok(mem) => {
                    let free = mem.avail as usize * 1024;
                    (((free + used) as f64) * (percent / 100.0)) as usize
                }
                Err(_) => 0,
            },
        }
    }

    /// Drops the least-recently-touched, currently-unlocked corpora until the cache
    /// is back under budget. `just_loaded` is exempt so a corpus is never evicted in
    /// the same pass that loaded it.
    fn evict_if_needed(&self, just_loaded: &str) {
        let mut cache = self.corpus_cache.write().unwrap();
        let sizes: Vec<(String, usize)> = cache
            .iter()
            .filter_map(|(name, entry)| entry.try_read().ok().map(|g| (name.clone(), g.estimate_memory())))
            .collect();
        let mut used: usize = sizes.iter().map(|(_, s)| s).sum();
        let max = self.max_cache_size(used);
        if used <= max {
            return;
        }
        let candidates: Vec<String> = cache.keys().cloned().collect();
        for name in candidates {
            if used <= max || name == just_loaded {
                continue;
            }
            let Some(entry) = cache.get(&name).cloned() else { continue };
            let Ok(g) = entry.try_write() else { continue };
            let size = g.estimate_memory();
            drop(g);
            cache.remove(&name);
            used = used.saturating_sub(size);
            log::debug!("evicted corpus '{}' from cache ({} bytes)", name, size);
        }
    }

    /// Returns the cached loader for `corpus_name`, loading it from disk first if
    /// necessary. The cache map lock is held only long enough to look up or insert
    /// the entry; `load_from` itself runs outside it.
    fn get_entry(&self, corpus_name: &str) -> Result<Arc<RwLock<CorpusGraph>>> {
        {
            let cache = self.corpus_cache.read().unwrap();
            if let Some(entry) = cache.get(corpus_name) {
                return Ok(entry.clone());
            }
        }
        let path = self.db_dir.join(corpus_name);
        if !path.is_dir() {
            return Err(GraphAnnisError::NoSuchCorpus(corpus_name.to_string()));
        }
        let mut graph = CorpusGraph::new();
        graph
            .load_from(&path)
            .map_err(|e| GraphAnnisError::LoadingFromDisk { name: corpus_name.to_string(), cause: e.to_string() })?;
        let entry = Arc::new(RwLock::new(graph));
        {
            let mut cache = self.corpus_cache.write().unwrap();
            // someone else may have loaded it while we were reading from disk above.
            if let Some(existing) = cache.get(corpus_name) {
                return Ok(existing.clone());
            }
            cache.insert(corpus_name.to_string(), entry.clone());
        }
        self.evict_if_needed(corpus_name);
        Ok(entry)
    }

    fn cancel_and_join_writer(&self, corpus_name: &str) {
        let handle = self.writers.lock().unwrap().remove(corpus_name);
        if let Some(h) = handle {
            h.cancel_and_join();
        }
    }

    // --- directory-level operations ---------------------------------------

    pub fn list(&self) -> Result<Vec<CorpusInfo>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.db_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names.iter().map(|n| self.info(n)).collect()
    }

    pub fn info(&self, corpus_name: &str) -> Result<CorpusInfo> {
        {
            let cache = self.corpus_cache.read().unwrap();
            if let Some(entry) = cache.get(corpus_name) {
                let g = entry.read().unwrap();
                let components = g.all_components();
                let loaded = components.iter().filter(|c| g.get_graphstorage_if_loaded(c).is_some()).count();
                let memory = g.estimate_memory();
                let load_status = if components.is_empty() || loaded == components.len() {
                    LoadStatus::FullyLoaded(memory)
                } else {
                    LoadStatus::PartiallyLoaded(memory)
                };
                return Ok(CorpusInfo { name: corpus_name.to_string(), load_status, components });
            }
        }
        if self.db_dir.join(corpus_name).is_dir() {
            Ok(CorpusInfo { name: corpus_name.to_string(), load_status: LoadStatus::NotLoaded, components: Vec::new() })
        } else {
            Err(GraphAnnisError::NoSuchCorpus(corpus_name.to_string()))
        }
    }

    pub fn delete_corpus(&self, corpus_name: &str) -> Result<bool> {
        self.cancel_and_join_writer(corpus_name);
        let mut cache = self.corpus_cache.write().unwrap();
        if let Some(entry) = cache.remove(corpus_name) {
            // exclusive lock: wait out any reader still finishing up before removing files.
            let _lock = entry.write().unwrap();
            let path = self.db_dir.join(corpus_name);
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            }
            Ok(true)
        } else {
            let path = self.db_dir.join(corpus_name);
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    // --- queries -----------------------------------------------------------

    pub fn count(&self, corpus_name: &str, query: &ParsedDisjunction) -> Result<u64> {
        let entry = self.get_entry(corpus_name)?;
        let mut g = entry.write().unwrap();
        let disjunction = Disjunction::new(query.alternatives.clone());
        Ok(disjunction.execute(&mut g).len() as u64)
    }

    pub fn count_extra(&self, corpus_name: &str, query: &ParsedDisjunction) -> Result<CountExtra> {
        let entry = self.get_entry(corpus_name)?;
        let mut g = entry.write().unwrap();
        let disjunction = Disjunction::new(query.alternatives.clone());
        let results = disjunction.execute(&mut g);
        let match_count = results.len() as u64;
        let key = node_name_key();
        let mut known_documents: HashSet<String> = HashSet::new();
        for row in &results {
            let Some(m) = row.first() else { continue };
            if let Some(name) = g.node_annos.get_value(&m.node, &key) {
                let doc = &name[..name.rfind('#').unwrap_or(name.len())];
                known_documents.insert(doc.to_string());
            }
        }
        Ok(CountExtra { match_count, document_count: known_documents.len() as u64 })
    }

    /// Runs `query`, sorts results by document path and textual position, and
    /// renders the `offset..offset+limit` window through [`format_match`].
    pub fn find(
        &self,
        corpus_name: &str,
        query: &ParsedDisjunction,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let entry = self.get_entry(corpus_name)?;
        let mut g = entry.write().unwrap();
        let disjunction = Disjunction::new(query.alternatives.clone());
        let mut results = disjunction.execute(&mut g);

        let token_helper = TokenHelper::new(&g);
        let ordering = ordering_component();
        let gs_order = g.get_graphstorage_if_loaded(&ordering);
        results.sort_by(|a, b| compare_matchgroup_by_text_pos(a, b, &g, token_helper.as_ref(), gs_order));

        Ok(results
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|row| format_match(&row, &g, corpus_name))
            .collect())
    }

    fn hops(gs: &dyn GraphStorage, start: NodeID, max_hops: usize, forward: bool) -> HashSet<NodeID> {
        let mut seen = HashSet::new();
        let mut frontier = vec![start];
        for _ in 0..max_hops {
            let mut next = Vec::new();
            for n in &frontier {
                let neighbors: Vec<NodeID> =
                    if forward { gs.outgoing_edges(*n).collect() } else { gs.ingoing_edges(*n).collect() };
                for nb in neighbors {
                    if seen.insert(nb) {
                        next.push(nb);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        seen
    }

    /// Builds a standalone [`CorpusGraph`] containing the named nodes, `ctx_left`
    /// preceding and `ctx_right` following tokens (by the `Ordering` component), and
    /// every edge from any loaded component whose endpoints both ended up included.
    pub fn subgraph(
        &self,
        corpus_name: &str,
        node_names: &[String],
        ctx_left: usize,
        ctx_right: usize,
    ) -> Result<CorpusGraph> {
        let entry = self.get_entry(corpus_name)?;
        let mut locked = entry.write().unwrap();
        locked.ensure_loaded_all()?;
        let g: &CorpusGraph = &locked;

        let ordering = ordering_component();
        let gs_order = g.get_graphstorage_if_loaded(&ordering);

        let mut included: HashSet<NodeID> = HashSet::new();
        for name in node_names {
            let Some(node) = g.get_node_id_from_name(name) else { continue };
            included.insert(node);
            if let Some(gs) = gs_order {
                included.extend(Self::hops(gs, node, ctx_left, false));
                included.extend(Self::hops(gs, node, ctx_right, true));
            }
        }
        Self::build_subgraph(g, &included)
    }

    /// Like [`subgraph`](Self::subgraph), but the seed set is every node whose path
    /// falls under one of the given document names, reached through
    /// `PartOfSubCorpus`.
    pub fn subcorpus_graph(&self, corpus_name: &str, document_names: &[String]) -> Result<CorpusGraph> {
        let entry = self.get_entry(corpus_name)?;
        let mut locked = entry.write().unwrap();
        locked.ensure_loaded_all()?;
        let g: &CorpusGraph = &locked;

        let key = node_name_key();
        let mut included: HashSet<NodeID> = HashSet::new();
        for doc in document_names {
            for node in g.node_annos.distinct_items() {
                if let Some(name) = g.node_annos.get_value(&node, &key) {
                    if name == doc.as_str() || name.starts_with(&format!("{}#", doc)) {
                        included.insert(node);
                    }
                }
            }
        }
        Self::build_subgraph(g, &included)
    }

    fn build_subgraph(g: &CorpusGraph, included: &HashSet<NodeID>) -> Result<CorpusGraph> {
        let mut update = GraphUpdate::new();
        let key = node_name_key();
        let mut names: std::collections::HashMap<NodeID, String> = std::collections::HashMap::new();
        for &node in included {
            let Some(name) = g.node_annos.get_value(&node, &key) else { continue };
            names.insert(node, name.to_string());
            update.add_event(UpdateEvent::AddNode { node_name: name.to_string(), node_type: "node".into() });
            for anno in g.node_annos.get_annotations_for_item(&node) {
                if anno.key == key {
                    continue;
                }
                update.add_event(UpdateEvent::AddNodeLabel {
                    node_name: name.to_string(),
                    anno_ns: anno.key.ns.to_string(),
                    anno_name: anno.key.name.to_string(),
                    anno_value: anno.val,
                });
            }
        }
        for component in g.all_components() {
            let Some(gs) = g.get_graphstorage_if_loaded(&component) else { continue };
            for source in gs.source_nodes() {
                let Some(source_name) = names.get(&source) else { continue };
                for target in gs.outgoing_edges(source) {
                    let Some(target_name) = names.get(&target) else { continue };
                    update.add_event(UpdateEvent::AddEdge {
                        source_node: source_name.clone(),
                        target_node: target_name.clone(),
                        layer: component.layer.to_string(),
                        component_type: component.ctype.to_string(),
                        component_name: component.name.to_string(),
                    });
                    let edge = corpusgraph_core::Edge { source, target };
                    for anno in gs.get_anno_storage().get_annotations_for_item(&edge) {
                        update.add_event(UpdateEvent::AddEdgeLabel {
                            source_node: source_name.clone(),
                            target_node: target_name.clone(),
                            layer: component.layer.to_string(),
                            component_type: component.ctype.to_string(),
                            component_name: component.name.to_string(),
                            anno_ns: anno.key.ns.to_string(),
                            anno_name: anno.key.name.to_string(),
                            anno_value: anno.val,
                        });
                    }
                }
            }
        }
        update.finish();
        let mut out = CorpusGraph::new();
        out.apply_update_in_memory(&mut update)?;
        Ok(out)
    }

    // --- updates and durability ---------------------------------------------

    /// Applies `update` to the corpus under an exclusive lock, writes the update log
    /// so a crash before the snapshot is rewritten can still recover it, then
    /// schedules a background writer to persist the new snapshot. Cancels and joins
    /// any writer already in flight for this corpus first.
    pub fn apply_update(&self, corpus_name: &str, update: &mut GraphUpdate) -> Result<()> {
        self.cancel_and_join_writer(corpus_name);
        let entry = self.get_entry(corpus_name)?;
        {
            let mut g = entry.write().unwrap();
            g.ensure_loaded_all()?;
            if let Err(e) = g.apply_update_in_memory(update) {
                // roll back by reloading the last good snapshot from disk.
                if let Some(location) = g.location().map(|p| p.to_path_buf()) {
                    let _ = g.load_from(&location);
                }
                return Err(e.into());
            }
            if let Some(location) = g.location().map(|p| p.to_path_buf()) {
                Self::write_update_log(&location, update)?;
            }
        }
        self.schedule_background_save(corpus_name, entry);
        Ok(())
    }

    fn write_update_log(location: &Path, update: &GraphUpdate) -> Result<()> {
        let current = location.join("current");
        std::fs::create_dir_all(&current)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&current)?;
        bincode::serialize_into(&mut tmp, update)?;
        tmp.persist(current.join("update_log.bin")).map_err(|e| e.error)?;
        Ok(())
    }

    /// Runs the crash-safe snapshot swap described for the background writer: if no
    /// `backup/` is already present (left over from a prior crash), `current/` is
    /// renamed to `backup/`; then a fresh snapshot is written to `current/`; only
    /// then is `backup/` removed. A cancellation check sits between every step.
    fn schedule_background_save(&self, corpus_name: &str, entry: Arc<RwLock<CorpusGraph>>) {
        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = cancel.clone();
        let active = self.active_background_workers.clone();
        {
            let &(ref lock, _) = &*active;
            *lock.lock().unwrap() += 1;
        }
        let name = corpus_name.to_string();
        let handle = thread::spawn(move || {
            let result: Result<()> = (|| {
                if thread_cancel.load(AtomicOrdering::SeqCst) {
                    return Ok(());
                }
                let mut g = entry.write().unwrap();
                let Some(location) = g.location().map(|p| p.to_path_buf()) else { return Ok(()) };
                if thread_cancel.load(AtomicOrdering::SeqCst) {
                    return Ok(());
                }
                let current = location.join("current");
                let backup = location.join("backup");
                if !backup.is_dir() && current.is_dir() {
                    std::fs::rename(&current, &backup)?;
                }
                if thread_cancel.load(AtomicOrdering::SeqCst) {
                    return Ok(());
                }
                g.save_to(&location)?;
                if thread_cancel.load(AtomicOrdering::SeqCst) {
                    return Ok(());
                }
                if backup.is_dir() {
                    std::fs::remove_dir_all(&backup)?;
                }
                Ok(())
            })();
            if let Err(e) = result {
                log::error!("background save of corpus '{}' failed: {}", name, e);
            }
            let &(ref lock, ref cvar) = &*active;
            *lock.lock().unwrap() -= 1;
            cvar.notify_all();
        });
        self.writers
            .lock()
            .unwrap()
            .insert(corpus_name.to_string(), WriterHandle { cancel, handle: Some(handle) });
    }

    // --- import / export -----------------------------------------------------

    /// Registers a freshly-built [`CorpusGraph`] (e.g. from [`Self::import_relannis`])
    /// under `corpus_name`, persisting it to its place in `db_dir`.
    pub fn import_corpus(&self, corpus_name: &str, mut graph: CorpusGraph) -> Result<()> {
        self.cancel_and_join_writer(corpus_name);
        let path = self.db_dir.join(corpus_name);
        graph.persist_to(&path)?;
        let mut cache = self.corpus_cache.write().unwrap();
        cache.insert(corpus_name.to_string(), Arc::new(RwLock::new(graph)));
        drop(cache);
        self.evict_if_needed(corpus_name);
        Ok(())
    }

    pub fn import_relannis(&self, corpus_name: &str, tables: &RelAnnisTables) -> Result<()> {
        let mut graph = CorpusGraph::new();
        crate::relannis::import_into(&mut graph, tables)?;
        self.import_corpus(corpus_name, graph)
    }

    /// Unpacks a ZIP file produced by [`Self::export_corpus`] into `db_dir` and loads it.
    pub fn import_corpus_from_zip(&self, corpus_name: &str, source: &Path) -> Result<()> {
        self.cancel_and_join_writer(corpus_name);
        let dest = self.db_dir.join(corpus_name).join("current");
        std::fs::create_dir_all(&dest)?;
        let file = File::open(source)?;
        let mut archive = zip::ZipArchive::new(file)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(rel) = entry.enclosed_name().map(|p| p.to_path_buf()) else { continue };
            let out_path = dest.join(rel);
            if entry.is_dir() {
                std::fs::create_dir_all(&out_path)?;
            } else {
                if let Some(parent) = out_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&out_path)?;
                std::io::copy(&mut entry, &mut out)?;
            }
        }
        {
            let mut cache = self.corpus_cache.write().unwrap();
            cache.remove(corpus_name);
        }
        self.get_entry(corpus_name)?;
        Ok(())
    }

    /// Packs a corpus's `current/` snapshot directory into a ZIP file at `destination`.
    pub fn export_corpus(&self, corpus_name: &str, destination: &Path) -> Result<()> {
        let entry = self.get_entry(corpus_name)?;
        {
            let mut g = entry.write().unwrap();
            g.ensure_loaded_all()?;
            if let Some(location) = g.location().map(|p| p.to_path_buf()) {
                g.save_to(&location)?;
            }
        }
        let source = self.db_dir.join(corpus_name).join("current");
        let file = File::create(destination)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for entry in walk_files(&source) {
            let rel = entry.strip_prefix(&source).unwrap_or(&entry).to_string_lossy().replace('\\', "/");
            zip.start_file(rel, options.clone())?;
            let mut f = File::open(&entry)?;
            std::io::copy(&mut f, &mut zip)?;
        }
        zip.finish()?;
        Ok(())
    }
}

fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else { return out };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk_files(&path));
        } else {
            out.push(path);
        }
    }
    out
}

impl Drop for CorpusStorage {
    fn drop(&mut self) {
        let &(ref lock, ref cvar) = &*self.active_background_workers;
        let mut active = lock.lock().unwrap();
        while *active > 0 {
            active = cvar.wait(active).unwrap();
        }
        if let Err(e) = fs2::FileExt::unlock(&self.lock_file) {
            log::warn!("could not unlock corpus storage lock file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Conjunction, ParsedNode};

    fn import_simple(storage: &CorpusStorage, corpus_name: &str) {
        let mut graph = CorpusGraph::new();
        let mut u = GraphUpdate::new();
        u.add_event(UpdateEvent::AddNode { node_name: "doc#n1".into(), node_type: "node".into() });
        u.add_event(UpdateEvent::AddNodeLabel {
            node_name: "doc#n1".into(),
            anno_ns: "".into(),
            anno_name: "pos".into(),
            anno_value: "N".into(),
        });
        u.finish();
        graph.apply_update_in_memory(&mut u).unwrap();
        storage.import_corpus(corpus_name, graph).unwrap();
    }

    #[test]
    fn import_then_list_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CorpusStorage::with_auto_cache_size(dir.path()).unwrap();
        import_simple(&storage, "mycorpus");

        let names: Vec<String> = storage.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["mycorpus".to_string()]);

        let query = ParsedDisjunction::single(Conjunction::new(vec![ParsedNode::any()], vec![]));
        assert_eq!(storage.count("mycorpus", &query).unwrap(), 1);
    }

    #[test]
    fn unknown_corpus_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CorpusStorage::with_auto_cache_size(dir.path()).unwrap();
        let query = ParsedDisjunction::single(Conjunction::new(vec![ParsedNode::any()], vec![]));
        assert!(matches!(storage.count("nope", &query), Err(GraphAnnisError::NoSuchCorpus(_))));
    }

    #[test]
    fn delete_removes_corpus_from_cache_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CorpusStorage::with_auto_cache_size(dir.path()).unwrap();
        import_simple(&storage, "mycorpus");
        assert!(storage.delete_corpus("mycorpus").unwrap());
        assert!(!dir.path().join("mycorpus").exists());
        assert!(!storage.delete_corpus("mycorpus").unwrap());
    }

    #[test]
    fn apply_update_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = CorpusStorage::with_auto_cache_size(dir.path()).unwrap();
            import_simple(&storage, "mycorpus");
            let mut u = GraphUpdate::new();
            u.add_event(UpdateEvent::AddNode { node_name: "doc#n2".into(), node_type: "node".into() });
            u.finish();
            storage.apply_update("mycorpus", &mut u).unwrap();
        }
        let storage = CorpusStorage::with_auto_cache_size(dir.path()).unwrap();
        let query = ParsedDisjunction::single(Conjunction::new(vec![ParsedNode::any()], vec![]));
        assert_eq!(storage.count("mycorpus", &query).unwrap(), 2);
    }
}
