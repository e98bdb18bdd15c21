//! The unit of result the query engine passes between node searches, operators and
//! the executor: a matched node plus which annotation (if any) made it match.

use corpusgraph_core::graph::CorpusGraph;
use corpusgraph_core::{AnnoKey, Annotation, NodeID};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Match {
    pub node: NodeID,
    pub anno_key: Arc<AnnoKey>,
}

impl Match {
    pub fn extract_annotation(&self, graph: &CorpusGraph) -> Option<Annotation> {
        let val = graph.node_annos.get_value(&self.node, &self.anno_key)?;
        Some(Annotation {
            key: (*self.anno_key).clone(),
            val: val.to_string(),
        })
    }
}

/// Renders a result row as the space-separated `[ns::name::]salt:/<corpus>/<doc>#<local>`
/// fragments used by `CorpusStorage::find`, skipping positions bound to the default
/// (unnamed) annotation key. Node names already carry the `doc/path#local` shape from
/// import, so no further path assembly happens here.
pub fn format_match(matches: &[Match], graph: &CorpusGraph, corpus_name: &str) -> String {
    let node_name_key = corpusgraph_core::AnnoKey::new(corpusgraph_core::ANNIS_NS, corpusgraph_core::NODE_NAME);
    matches
        .iter()
        .filter(|m| !m.anno_key.name.is_empty())
        .map(|m| {
            let prefix = format!("{}::", m.anno_key);
            let node_name = graph.node_annos.get_value(&m.node, &node_name_key).unwrap_or("");
            format!("{}salt:/{}/{}", prefix, corpus_name, node_name)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
