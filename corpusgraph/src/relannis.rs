//! Derives a [`GraphUpdate`] from the five relANNIS tables a caller has already parsed
//! out of the `.tab`/`.annis` files (CSV dialect handling is the caller's job, via the
//! `csv` crate — this module only does the table-to-graph mapping).
//!
//! Grounded in the teacher's `relannis` module's purpose (deriving the automatic
//! `ORDERING`/`LEFT_TOKEN`/`RIGHT_TOKEN`/`COVERAGE`/`INVERSE_COVERAGE` components from
//! rank/text structure) but simplified to work over plain in-memory rows rather than
//! the teacher's on-disk `DiskMap` staging tables, since a from-scratch corpus this
//! size doesn't need out-of-core import.

use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};
use corpusgraph_core::ComponentType;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CorpusTable {
    pub rows: Vec<CorpusRow>,
}

#[derive(Debug, Clone)]
pub struct CorpusRow {
    pub name: String,
}

/// One node: either a token (`token_index` is `Some`, giving its rank within its
/// text) or a structural/span node (`token_index` is `None`).
#[derive(Debug, Clone)]
pub struct NodeRow {
    pub id: u64,
    pub name: String,
    pub text_id: u32,
    pub token_index: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    pub rows: Vec<NodeRow>,
}

#[derive(Debug, Clone)]
pub struct NodeAnnotationRow {
    pub node_id: u64,
    pub ns: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct NodeAnnotationTable {
    pub rows: Vec<NodeAnnotationRow>,
}

#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub id: u32,
    pub ctype: ComponentType,
    pub layer: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    pub rows: Vec<ComponentRow>,
}

/// One edge, keyed by its own rank id so [`EdgeAnnotationRow`] can reference it:
/// `parent` is the rank id of the source, `node_id` is the target node.
#[derive(Debug, Clone)]
pub struct RankRow {
    pub rank_id: u64,
    pub parent: Option<u64>,
    pub node_id: u64,
    pub component_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RankTable {
    pub rows: Vec<RankRow>,
}

#[derive(Debug, Clone)]
pub struct EdgeAnnotationRow {
    pub rank_id: u64,
    pub ns: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeAnnotationTable {
    pub rows: Vec<EdgeAnnotationRow>,
}

#[derive(Debug, Clone, Default)]
pub struct RelAnnisTables {
    pub corpus: CorpusTable,
    pub node: NodeTable,
    pub node_annotation: NodeAnnotationTable,
    pub component: ComponentTable,
    pub rank: RankTable,
    pub edge_annotation: EdgeAnnotationTable,
}

impl Default for CorpusTable {
    fn default() -> Self {
        CorpusTable { rows: Vec::new() }
    }
}

fn node_name(id: u64, by_id: &HashMap<u64, &NodeRow>) -> String {
    by_id.get(&id).map(|n| n.name.clone()).unwrap_or_else(|| id.to_string())
}

/// Builds the update log that would reconstruct the corpus these tables describe,
/// including the derived `ORDERING`, `LEFT_TOKEN`, `RIGHT_TOKEN`, `COVERAGE` and
/// `INVERSE_COVERAGE` components.
pub fn derive_update(tables: &RelAnnisTables) -> GraphUpdate {
    let mut u = GraphUpdate::new();
    let by_id: HashMap<u64, &NodeRow> = tables.node.rows.iter().map(|n| (n.id, n)).collect();

    for node in &tables.node.rows {
        u.add_event(UpdateEvent::AddNode { node_name: node.name.clone(), node_type: "node".into() });
    }
    for anno in &tables.node_annotation.rows {
        u.add_event(UpdateEvent::AddNodeLabel {
            node_name: node_name(anno.node_id, &by_id),
            anno_ns: anno.ns.clone(),
            anno_name: anno.name.clone(),
            anno_value: anno.value.clone(),
        });
    }

    let components: HashMap<u32, &ComponentRow> = tables.component.rows.iter().map(|c| (c.id, c)).collect();
    let rank_target: HashMap<u64, u64> = tables.rank.rows.iter().map(|r| (r.rank_id, r.node_id)).collect();
    let edge_annos_by_rank: HashMap<u64, Vec<&EdgeAnnotationRow>> =
        tables.edge_annotation.rows.iter().fold(HashMap::new(), |mut m, a| {
            m.entry(a.rank_id).or_default().push(a);
            m
        });

    for rank in &tables.rank.rows {
        let Some(parent_rank) = rank.parent else { continue };
        let Some(&parent_node) = rank_target.get(&parent_rank) else { continue };
        let Some(component) = components.get(&rank.component_id) else { continue };
        u.add_event(UpdateEvent::AddEdge {
            source_node: node_name(parent_node, &by_id),
            target_node: node_name(rank.node_id, &by_id),
            layer: component.layer.clone(),
            component_type: component.ctype.to_string(),
            component_name: component.name.clone(),
        });
        for anno in edge_annos_by_rank.get(&rank.rank_id).into_iter().flatten() {
            u.add_event(UpdateEvent::AddEdgeLabel {
                source_node: node_name(parent_node, &by_id),
                target_node: node_name(rank.node_id, &by_id),
                layer: component.layer.clone(),
                component_type: component.ctype.to_string(),
                component_name: component.name.clone(),
                anno_ns: anno.ns.clone(),
                anno_name: anno.name.clone(),
                anno_value: anno.value.clone(),
            });
        }
    }

    // ORDERING: consecutive tokens within the same text, sorted by their rank.
    let mut by_text: HashMap<u32, Vec<&NodeRow>> = HashMap::new();
    for node in tables.node.rows.iter().filter(|n| n.token_index.is_some()) {
        by_text.entry(node.text_id).or_default().push(node);
    }
    for tokens in by_text.values_mut() {
        tokens.sort_by_key(|n| n.token_index);
        for pair in tokens.windows(2) {
            u.add_event(UpdateEvent::AddEdge {
                source_node: pair[0].name.clone(),
                target_node: pair[1].name.clone(),
                layer: corpusgraph_core::ANNIS_NS.into(),
                component_type: ComponentType::Ordering.to_string(),
                component_name: "".into(),
            });
        }
    }

    // COVERAGE/INVERSE_COVERAGE: walk each rank edge whose target is a token and add a
    // coverage edge from every structural ancestor directly to that token.
    let rank_by_id: HashMap<u64, &RankRow> = tables.rank.rows.iter().map(|r| (r.rank_id, r)).collect();
    let mut covered_tokens: HashMap<u64, Vec<&NodeRow>> = HashMap::new();
    for rank in &tables.rank.rows {
        let Some(target) = by_id.get(&rank.node_id) else { continue };
        if target.token_index.is_none() {
            continue;
        }
        let mut cursor = rank.parent;
        while let Some(rank_id) = cursor {
            let Some(ancestor_rank) = rank_by_id.get(&rank_id) else { break };
            let ancestor_node = ancestor_rank.node_id;
            u.add_event(UpdateEvent::AddEdge {
                source_node: node_name(ancestor_node, &by_id),
                target_node: target.name.clone(),
                layer: corpusgraph_core::ANNIS_NS.into(),
                component_type: ComponentType::Coverage.to_string(),
                component_name: "".into(),
            });
            u.add_event(UpdateEvent::AddEdge {
                source_node: target.name.clone(),
                target_node: node_name(ancestor_node, &by_id),
                layer: corpusgraph_core::ANNIS_NS.into(),
                component_type: ComponentType::InverseCoverage.to_string(),
                component_name: "".into(),
            });
            covered_tokens.entry(ancestor_node).or_default().push(target);
            cursor = ancestor_rank.parent;
        }
    }

    // LEFT_TOKEN/RIGHT_TOKEN: the min/max-indexed token each structural node covers.
    for (node_id, mut tokens) in covered_tokens {
        tokens.sort_by_key(|t| t.token_index);
        let Some(left) = tokens.first() else { continue };
        let Some(right) = tokens.last() else { continue };
        let node = node_name(node_id, &by_id);
        u.add_event(UpdateEvent::AddEdge {
            source_node: node.clone(),
            target_node: left.name.clone(),
            layer: corpusgraph_core::ANNIS_NS.into(),
            component_type: ComponentType::LeftToken.to_string(),
            component_name: "".into(),
        });
        u.add_event(UpdateEvent::AddEdge {
            source_node: node,
            target_node: right.name.clone(),
            layer: corpusgraph_core::ANNIS_NS.into(),
            component_type: ComponentType::RightToken.to_string(),
            component_name: "".into(),
        });
    }

    u.finish();
    u
}

/// Derives and applies the update in one step.
pub fn import_into(graph: &mut corpusgraph_core::graph::CorpusGraph, tables: &RelAnnisTables) -> crate::Result<()> {
    let mut update = derive_update(tables);
    graph.apply_update_in_memory(&mut update)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusgraph_core::graph::CorpusGraph;

    fn two_token_one_span_corpus() -> RelAnnisTables {
        RelAnnisTables {
            node: NodeTable {
                rows: vec![
                    NodeRow { id: 1, name: "doc#tok1".into(), text_id: 1, token_index: Some(0) },
                    NodeRow { id: 2, name: "doc#tok2".into(), text_id: 1, token_index: Some(1) },
                    NodeRow { id: 3, name: "doc#span1".into(), text_id: 1, token_index: None },
                ],
            },
            component: ComponentTable {
                rows: vec![ComponentRow { id: 1, ctype: ComponentType::Dominance, layer: "default".into(), name: "".into() }],
            },
            rank: RankTable {
                rows: vec![
                    RankRow { rank_id: 10, parent: None, node_id: 3, component_id: 1 },
                    RankRow { rank_id: 11, parent: Some(10), node_id: 1, component_id: 1 },
                    RankRow { rank_id: 12, parent: Some(10), node_id: 2, component_id: 1 },
                ],
            },
            ..Default::default()
        }
    }

    #[test]
    fn derives_ordering_and_coverage() {
        let tables = two_token_one_span_corpus();
        let mut graph = CorpusGraph::new();
        import_into(&mut graph, &tables).unwrap();
        graph.ensure_loaded_all().unwrap();

        let ordering = corpusgraph_core::Component::new(ComponentType::Ordering, corpusgraph_core::ANNIS_NS, "");
        let gs = graph.get_graphstorage_if_loaded(&ordering).expect("ordering component derived");
        let tok1 = graph.get_node_id_from_name("doc#tok1").unwrap();
        let tok2 = graph.get_node_id_from_name("doc#tok2").unwrap();
        assert!(gs.is_connected(tok1, tok2, 1, 1));

        let coverage = corpusgraph_core::Component::new(ComponentType::Coverage, corpusgraph_core::ANNIS_NS, "");
        let cov = graph.get_graphstorage_if_loaded(&coverage).expect("coverage component derived");
        let span = graph.get_node_id_from_name("doc#span1").unwrap();
        assert!(cov.is_connected(span, tok1, 1, 1));
        assert!(cov.is_connected(span, tok2, 1, 1));
    }
}
