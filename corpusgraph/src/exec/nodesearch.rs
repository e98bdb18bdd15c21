//! The leaf of every query plan: a single node search, producing one [`Match`] per
//! matching node (wrapped in a one-element tuple so joins can treat every node of a
//! plan uniformly).

use super::ExecutionNode;
use crate::match_result::Match;
use crate::query::{ParsedNode, TextMatching};
use corpusgraph_core::graph::{CorpusGraph, DEFAULT_ANNO_KEY};
use corpusgraph_core::util::regex_full_match;
use corpusgraph_core::{AnnoKey, NodeID};
use std::sync::Arc;

/// The annotation keys a [`ParsedNode`] could resolve to: exactly the given namespace
/// if one was named, or every namespace the store has seen for that name otherwise.
fn resolve_keys(graph: &CorpusGraph, ns: &Option<String>, name: &str) -> Vec<AnnoKey> {
    match ns {
        Some(ns) => vec![AnnoKey::new(ns.clone(), name)],
        None => graph
            .node_annos
            .get_qnames()
            .into_iter()
            .filter(|k| k.name == name)
            .collect(),
    }
}

fn matches_for_key(graph: &CorpusGraph, key: &AnnoKey, spec: &ParsedNode) -> Vec<u64> {
    match (&spec.text_matching, &spec.value) {
        (TextMatching::Exact, Some(val)) => graph.node_annos.exact_anno_search(key, val),
        (TextMatching::Exact, None) => graph.node_annos.find_by_name(key),
        (TextMatching::Regex, Some(pattern)) => graph.node_annos.regex_anno_search(key, pattern),
        (TextMatching::Regex, None) => graph.node_annos.find_by_name(key),
    }
}

/// Upper bound on the number of rows this search could produce, used by the planner
/// to decide join order without actually running the search.
pub fn guess_max_count(graph: &CorpusGraph, spec: &ParsedNode) -> usize {
    if spec.name.is_none() {
        return graph.node_annos.distinct_items().len();
    }
    let name = spec.name.as_ref().unwrap();
    resolve_keys(graph, &spec.ns, name)
        .iter()
        .map(|key| match (&spec.text_matching, &spec.value) {
            (TextMatching::Exact, val) => graph.node_annos.guess_max_count(key, val.as_deref()),
            (TextMatching::Regex, Some(pattern)) => graph.node_annos.guess_max_count_regex(key, pattern),
            (TextMatching::Regex, None) => graph.node_annos.guess_max_count(key, None),
        })
        .sum()
}

/// Re-validates a join candidate against the right-hand side's own node search spec
/// (an index join's `retrieve_matches` only knows the operator, not the annotation
/// filter the query placed on that position), returning the annotation key the node
/// actually matched under, or `None` if it doesn't qualify.
pub fn match_node_against_spec(graph: &CorpusGraph, node: NodeID, spec: &ParsedNode) -> Option<Arc<AnnoKey>> {
    let Some(name) = spec.name.as_ref() else {
        return Some(DEFAULT_ANNO_KEY.clone());
    };
    for key in resolve_keys(graph, &spec.ns, name) {
        let matched = match (&spec.text_matching, &spec.value) {
            (TextMatching::Exact, Some(val)) => graph.node_annos.get_value(&node, &key) == Some(val.as_str()),
            (TextMatching::Exact, None) => graph.node_annos.has_value(&node, &key),
            (TextMatching::Regex, Some(pattern)) => {
                let Ok(re) = regex::Regex::new(&regex_full_match(pattern)) else {
                    return None;
                };
                graph.node_annos.get_value(&node, &key).is_some_and(|v| re.is_match(v))
            }
            (TextMatching::Regex, None) => graph.node_annos.has_value(&node, &key),
        };
        if matched {
            return Some(if spec.any_anno { DEFAULT_ANNO_KEY.clone() } else { Arc::new(key) });
        }
    }
    None
}

pub struct NodeSearch<'a> {
    it: Box<dyn Iterator<Item = Vec<Match>> + 'a>,
}

impl<'a> NodeSearch<'a> {
    pub fn from_spec(spec: ParsedNode, graph: &'a CorpusGraph) -> NodeSearch<'a> {
        let any_anno = spec.any_anno;
        let rows: Vec<Vec<Match>> = if let Some(name) = spec.name.clone() {
            let mut rows = Vec::new();
            for key in resolve_keys(graph, &spec.ns, &name) {
                let key = Arc::new(key);
                for node in matches_for_key(graph, &key, &spec) {
                    let anno_key = if any_anno { DEFAULT_ANNO_KEY.clone() } else { key.clone() };
                    rows.push(vec![Match { node, anno_key }]);
                }
            }
            rows
        } else {
            graph
                .node_annos
                .distinct_items()
                .into_iter()
                .map(|node| vec![Match { node, anno_key: DEFAULT_ANNO_KEY.clone() }])
                .collect()
        };
        NodeSearch { it: Box::new(rows.into_iter()) }
    }
}

impl<'a> Iterator for NodeSearch<'a> {
    type Item = Vec<Match>;

    fn next(&mut self) -> Option<Vec<Match>> {
        self.it.next()
    }
}

impl<'a> ExecutionNode for NodeSearch<'a> {
    fn node_count(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusgraph_core::Annotation;

    fn sample_graph() -> CorpusGraph {
        let mut g = CorpusGraph::new();
        g.node_annos.insert(1, Annotation { key: AnnoKey::new("", "pos"), val: "N".into() });
        g.node_annos.insert(2, Annotation { key: AnnoKey::new("", "pos"), val: "V".into() });
        g
    }

    #[test]
    fn exact_value_search_finds_single_node() {
        let g = sample_graph();
        let spec = ParsedNode::exact(None, "pos", Some("N"));
        let rows: Vec<_> = NodeSearch::from_spec(spec, &g).collect();
        assert_eq!(rows, vec![vec![Match { node: 1, anno_key: Arc::new(AnnoKey::new("", "pos")) }]]);
    }

    #[test]
    fn any_node_enumerates_every_node() {
        let g = sample_graph();
        let spec = ParsedNode::any();
        let rows: Vec<_> = NodeSearch::from_spec(spec, &g).collect();
        assert_eq!(rows.len(), 2);
    }
}
