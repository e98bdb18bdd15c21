//! Orders result rows the way a corpus search UI expects them: by the document path
//! and then by the textual position of each matched node, falling back to node ID.

use crate::match_result::Match;
use crate::token_helper::TokenHelper;
use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::CorpusGraph;
use corpusgraph_core::{AnnoKey, ANNIS_NS, NODE_NAME};
use std::borrow::Cow;
use std::cmp::Ordering;

fn split_path_and_nodename(full_node_name: &str) -> (&str, &str) {
    match full_node_name.rfind('#') {
        Some(pos) => (&full_node_name[..pos], &full_node_name[pos + 1..]),
        None => (full_node_name, ""),
    }
}

fn compare_document_path(p1: &str, p2: &str) -> Ordering {
    let it1 = p1.split('/').filter(|s| !s.is_empty());
    let it2 = p2.split('/').filter(|s| !s.is_empty());
    for (part1, part2) in it1.zip(it2) {
        let cmp = part1.cmp(part2);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    p1.split('/').filter(|s| !s.is_empty()).count().cmp(&p2.split('/').filter(|s| !s.is_empty()).count())
}

fn node_name(graph: &CorpusGraph, m: &Match) -> Cow<'static, str> {
    let key = AnnoKey::new(ANNIS_NS, NODE_NAME);
    match graph.node_annos.get_value(&m.node, &key) {
        Some(v) => Cow::Owned(v.to_string()),
        None => Cow::Borrowed(""),
    }
}

/// Orders by document path first, then by the left-aligned token's position in the
/// `Ordering` component (if a token helper and order storage are available), and
/// finally by raw node ID, so the output is always a total order.
pub fn compare_match_by_text_pos(
    m1: &Match,
    m2: &Match,
    graph: &CorpusGraph,
    token_helper: Option<&TokenHelper>,
    gs_order: Option<&dyn GraphStorage>,
) -> Ordering {
    let name1 = node_name(graph, m1);
    let name2 = node_name(graph, m2);
    let (path1, _) = split_path_and_nodename(&name1);
    let (path2, _) = split_path_and_nodename(&name2);
    let path_cmp = compare_document_path(path1, path2);
    if path_cmp != Ordering::Equal {
        return path_cmp;
    }

    if let (Some(th), Some(gs_order)) = (token_helper, gs_order) {
        if let (Some(t1), Some(t2)) = (th.left_token(m1.node), th.left_token(m2.node)) {
            if t1 != t2 {
                if gs_order.distance(t1, t2).is_some() {
                    return Ordering::Less;
                }
                if gs_order.distance(t2, t1).is_some() {
                    return Ordering::Greater;
                }
            }
        }
    }

    m1.node.cmp(&m2.node)
}

/// Orders whole result rows element-wise; a row that is a prefix of another but
/// otherwise equal sorts after it ("more specific" rows first).
pub fn compare_matchgroup_by_text_pos(
    m1: &[Match],
    m2: &[Match],
    graph: &CorpusGraph,
    token_helper: Option<&TokenHelper>,
    gs_order: Option<&dyn GraphStorage>,
) -> Ordering {
    for i in 0..m1.len().min(m2.len()) {
        let cmp = compare_match_by_text_pos(&m1[i], &m2[i], graph, token_helper, gs_order);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    m2.len().cmp(&m1.len())
}
