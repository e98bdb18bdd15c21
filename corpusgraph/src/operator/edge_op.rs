//! Reachability operators over a single edge-component type: dominance (`>`),
//! pointing (`->`) and part-of-subcorpus (`@`). All three are a thin spec layer over
//! [`BaseEdgeOp`], which does the actual distance-bounded, annotation-filtered
//! reachability search against one or more same-typed components (a query can name a
//! layer and leave the component name open, matching every component of that type).

use crate::match_result::Match;
use crate::operator::{BinaryOperator, BinaryOperatorSpec, EdgeAnnoSearchSpec, EstimationType, RangeSpec};
use corpusgraph_core::graph::storage::GraphStorage;
use corpusgraph_core::graph::{CorpusGraph, DEFAULT_ANNO_KEY};
use corpusgraph_core::util::regex_full_match;
use corpusgraph_core::{AnnoKey, Component, ComponentType, Edge, GraphStatistic, NodeID, ANNIS_NS};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Debug)]
struct BaseEdgeOpSpec {
    components: Vec<Component>,
    dist: RangeSpec,
    edge_anno: Option<EdgeAnnoSearchSpec>,
    is_reflexive: bool,
    op_str: Option<String>,
}

impl BaseEdgeOpSpec {
    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        self.create_operator_with_direction(db, false)
    }

    fn create_operator_with_direction<'a>(&self, db: &'a CorpusGraph, inverse: bool) -> Option<Box<dyn BinaryOperator + 'a>> {
        let mut gs = Vec::with_capacity(self.components.len());
        for c in &self.components {
            gs.push(db.get_graphstorage_if_loaded(c)?);
        }
        let node_type_key = AnnoKey::new(ANNIS_NS, "node_type");
        let max_nodes_estimate = db.node_annos.guess_max_count(&node_type_key, Some("node")).max(1);
        Some(Box::new(BaseEdgeOp {
            gs,
            spec: self.clone(),
            max_nodes_estimate,
            inverse,
        }))
    }
}

struct BaseEdgeOp<'a> {
    gs: Vec<&'a dyn GraphStorage>,
    spec: BaseEdgeOpSpec,
    max_nodes_estimate: usize,
    inverse: bool,
}

/// `true` if `edge_anno` is absent, or if the edge's annotations satisfy it.
fn check_edge_annotation(edge_anno: &Option<EdgeAnnoSearchSpec>, gs: &dyn GraphStorage, source: NodeID, target: NodeID) -> bool {
    let Some(edge_anno) = edge_anno else {
        return true;
    };
    let edge = Edge { source, target };
    let annos = gs.get_anno_storage().get_annotations_for_item(&edge);

    match edge_anno {
        EdgeAnnoSearchSpec::ExactValue { ns, name, val } => annos.iter().any(|a| {
            a.key.name == *name
                && ns.as_ref().map_or(true, |n| *n == a.key.ns)
                && val.as_ref().map_or(true, |v| *v == a.val)
        }),
        EdgeAnnoSearchSpec::NotExactValue { ns, name, val } => annos.iter().any(|a| {
            a.key.name == *name && ns.as_ref().map_or(true, |n| *n == a.key.ns) && a.val != *val
        }),
        EdgeAnnoSearchSpec::RegexValue { ns, name, val } => {
            let Ok(re) = Regex::new(&regex_full_match(val)) else {
                return false;
            };
            annos.iter().any(|a| {
                a.key.name == *name && ns.as_ref().map_or(true, |n| *n == a.key.ns) && re.is_match(&a.val)
            })
        }
        EdgeAnnoSearchSpec::NotRegexValue { ns, name, val } => {
            let Ok(re) = Regex::new(&regex_full_match(val)) else {
                return false;
            };
            annos.iter().any(|a| {
                a.key.name == *name && ns.as_ref().map_or(true, |n| *n == a.key.ns) && !re.is_match(&a.val)
            })
        }
    }
}

impl<'a> fmt::Display for BaseEdgeOp<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let anno_frag = match &self.spec.edge_anno {
            Some(edge_anno) => format!("[{}]", edge_anno),
            None => String::new(),
        };
        match &self.spec.op_str {
            Some(op_str) if self.inverse => write!(f, "{}{}{} (inverse)", op_str, self.spec.dist, anno_frag),
            Some(op_str) => write!(f, "{}{}{}", op_str, self.spec.dist, anno_frag),
            None => write!(f, "?"),
        }
    }
}

impl<'a> BinaryOperator for BaseEdgeOp<'a> {
    fn retrieve_matches(&self, lhs: &Match) -> Box<dyn Iterator<Item = Match>> {
        let mut all: Vec<Match> = Vec::new();
        for gs in &self.gs {
            let gs = *gs;
            let candidates: Vec<NodeID> = if self.inverse {
                gs.find_connected(lhs.node, self.spec.dist.min_dist(), self.spec.dist.max_dist())
                    .filter(|&candidate| check_edge_annotation(&self.spec.edge_anno, gs, candidate, lhs.node))
                    .collect()
            } else {
                gs.find_connected(lhs.node, self.spec.dist.min_dist(), self.spec.dist.max_dist())
                    .filter(|&candidate| check_edge_annotation(&self.spec.edge_anno, gs, lhs.node, candidate))
                    .collect()
            };
            all.extend(candidates.into_iter().map(|n| Match {
                node: n,
                anno_key: DEFAULT_ANNO_KEY.clone(),
            }));
        }
        if self.gs.len() > 1 {
            all.sort_unstable();
            all.dedup();
        }
        Box::new(all.into_iter())
    }

    fn filter_match(&self, lhs: &Match, rhs: &Match) -> bool {
        for gs in &self.gs {
            let (source, target) = if self.inverse { (rhs.node, lhs.node) } else { (lhs.node, rhs.node) };
            if gs.is_connected(source, target, self.spec.dist.min_dist(), self.spec.dist.max_dist())
                && check_edge_annotation(&self.spec.edge_anno, *gs, source, target)
            {
                return true;
            }
        }
        false
    }

    fn is_reflexive(&self) -> bool {
        self.spec.is_reflexive
    }

    fn get_inverse_operator<'b>(&self, graph: &'b CorpusGraph) -> Option<Box<dyn BinaryOperator + 'b>> {
        self.spec.create_operator_with_direction(graph, !self.inverse)
    }

    fn estimation_type(&self) -> EstimationType {
        if self.gs.is_empty() {
            return EstimationType::Selectivity(0.0);
        }
        let max_nodes = self.max_nodes_estimate as f64;
        let mut worst_sel = 0.0f64;

        for gs in &self.gs {
            let mut gs_selectivity = 0.01;
            if let Some(stats) = gs.get_statistics() {
                let stats: &GraphStatistic = stats;
                if stats.cyclic {
                    return EstimationType::Selectivity(1.0);
                }
                let max_dist = self.spec.dist.max_dist();
                let max_path_length = max_dist.min(stats.max_depth) as f64;
                let min_path_length = self.spec.dist.min_dist().saturating_sub(1) as f64;

                // Model two complete k-ary trees (k = avg fan-out) at the min and max
                // path length and take the difference, approximating reachable nodes
                // within the distance window (Cormen, Introduction to Algorithms).
                if stats.avg_fan_out > 1.0 {
                    let k = stats.avg_fan_out;
                    let reachable_max = ((k.powf(max_path_length) - 1.0) / (k - 1.0)).ceil();
                    let reachable_min = ((k.powf(min_path_length) - 1.0) / (k - 1.0)).ceil();
                    gs_selectivity = (reachable_max - reachable_min) / max_nodes;
                } else {
                    let reachable_max = (stats.avg_fan_out * max_path_length).ceil();
                    let reachable_min = (stats.avg_fan_out * min_path_length).ceil();
                    gs_selectivity = (reachable_max - reachable_min) / max_nodes;
                }
            }
            if gs_selectivity > worst_sel {
                worst_sel = gs_selectivity;
            }
        }
        EstimationType::Selectivity(worst_sel)
    }

    fn edge_anno_selectivity(&self) -> Option<f64> {
        let edge_anno = self.spec.edge_anno.as_ref()?;
        let mut worst_sel = 0.0;
        for gs in &self.gs {
            let anno_storage = gs.get_anno_storage();
            let num_of_annos = anno_storage.num_of_annotations();
            if num_of_annos == 0 {
                return Some(0.0);
            }
            let guessed_count = match edge_anno {
                EdgeAnnoSearchSpec::ExactValue { ns, name, val } => {
                    let key = AnnoKey::new(ns.clone().unwrap_or_default(), name.clone());
                    anno_storage.guess_max_count(&key, val.as_deref())
                }
                EdgeAnnoSearchSpec::NotExactValue { ns, name, val } => {
                    let key = AnnoKey::new(ns.clone().unwrap_or_default(), name.clone());
                    let total = anno_storage.guess_max_count(&key, None);
                    total.saturating_sub(anno_storage.guess_max_count(&key, Some(val)))
                }
                EdgeAnnoSearchSpec::RegexValue { ns, name, val } => {
                    let key = AnnoKey::new(ns.clone().unwrap_or_default(), name.clone());
                    anno_storage.guess_max_count_regex(&key, val)
                }
                EdgeAnnoSearchSpec::NotRegexValue { ns, name, val } => {
                    let key = AnnoKey::new(ns.clone().unwrap_or_default(), name.clone());
                    let total = anno_storage.guess_max_count(&key, None);
                    total.saturating_sub(anno_storage.guess_max_count_regex(&key, val))
                }
            };
            let g_sel = guessed_count as f64 / num_of_annos as f64;
            if g_sel > worst_sel {
                worst_sel = g_sel;
            }
        }
        Some(worst_sel)
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DominanceSpec {
    pub name: String,
    pub dist: RangeSpec,
    pub edge_anno: Option<EdgeAnnoSearchSpec>,
}

impl BinaryOperatorSpec for DominanceSpec {
    fn necessary_components(&self, db: &CorpusGraph) -> HashSet<Component> {
        HashSet::from_iter(db.get_all_components(Some(ComponentType::Dominance), Some(&self.name)))
    }

    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        let components = db.get_all_components(Some(ComponentType::Dominance), Some(&self.name));
        let op_str = if self.name.is_empty() { String::from(">") } else { format!(">{} ", self.name) };
        let base = BaseEdgeOpSpec {
            op_str: Some(op_str),
            components,
            dist: self.dist.clone(),
            edge_anno: self.edge_anno.clone(),
            is_reflexive: true,
        };
        base.create_operator(db)
    }

    fn get_edge_anno_spec(&self) -> Option<EdgeAnnoSearchSpec> {
        self.edge_anno.clone()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PointingSpec {
    pub name: String,
    pub dist: RangeSpec,
    pub edge_anno: Option<EdgeAnnoSearchSpec>,
}

impl BinaryOperatorSpec for PointingSpec {
    fn necessary_components(&self, db: &CorpusGraph) -> HashSet<Component> {
        HashSet::from_iter(db.get_all_components(Some(ComponentType::Pointing), Some(&self.name)))
    }

    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        let components = db.get_all_components(Some(ComponentType::Pointing), Some(&self.name));
        let op_str = if self.name.is_empty() { String::from("->") } else { format!("->{} ", self.name) };
        let base = BaseEdgeOpSpec {
            components,
            dist: self.dist.clone(),
            edge_anno: self.edge_anno.clone(),
            is_reflexive: true,
            op_str: Some(op_str),
        };
        base.create_operator(db)
    }

    fn get_edge_anno_spec(&self) -> Option<EdgeAnnoSearchSpec> {
        self.edge_anno.clone()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartOfSubCorpusSpec {
    pub dist: RangeSpec,
}

impl BinaryOperatorSpec for PartOfSubCorpusSpec {
    fn necessary_components(&self, _db: &CorpusGraph) -> HashSet<Component> {
        let mut components = HashSet::default();
        components.insert(Component::new(ComponentType::PartOfSubCorpus, ANNIS_NS, ""));
        components
    }

    fn create_operator<'a>(&self, db: &'a CorpusGraph) -> Option<Box<dyn BinaryOperator + 'a>> {
        let components = vec![Component::new(ComponentType::PartOfSubCorpus, ANNIS_NS, "")];
        let base = BaseEdgeOpSpec {
            op_str: Some(String::from("@")),
            components,
            dist: self.dist.clone(),
            edge_anno: None,
            is_reflexive: false,
        };
        base.create_operator(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};

    fn sample_graph() -> CorpusGraph {
        let mut db = CorpusGraph::new();
        let mut u = GraphUpdate::new();
        for name in ["root", "child1", "child2"] {
            u.add_event(UpdateEvent::AddNode { node_name: name.into(), node_type: "node".into() });
        }
        u.add_event(UpdateEvent::AddEdge {
            source_node: "root".into(),
            target_node: "child1".into(),
            layer: ANNIS_NS.into(),
            component_type: "Dominance".into(),
            component_name: "".into(),
        });
        u.add_event(UpdateEvent::AddEdge {
            source_node: "root".into(),
            target_node: "child2".into(),
            layer: ANNIS_NS.into(),
            component_type: "Dominance".into(),
            component_name: "".into(),
        });
        u.finish();
        db.apply_update_in_memory(&mut u).unwrap();
        db
    }

    #[test]
    fn dominance_finds_direct_children() {
        let mut db = sample_graph();
        db.ensure_loaded_all().unwrap();
        let spec = DominanceSpec { name: String::new(), dist: RangeSpec::exact(1), edge_anno: None };
        let op = spec.create_operator(&db).expect("dominance component exists");
        let root = db.get_node_id_from_name("root").unwrap();
        let mut matched: Vec<NodeID> = op
            .retrieve_matches(&Match { node: root, anno_key: DEFAULT_ANNO_KEY.clone() })
            .map(|m| m.node)
            .collect();
        matched.sort_unstable();
        let mut expected = vec![
            db.get_node_id_from_name("child1").unwrap(),
            db.get_node_id_from_name("child2").unwrap(),
        ];
        expected.sort_unstable();
        assert_eq!(matched, expected);
    }

    #[test]
    fn missing_component_returns_no_operator() {
        let mut db = sample_graph();
        db.ensure_loaded_all().unwrap();
        let spec = PointingSpec { name: String::new(), dist: RangeSpec::exact(1), edge_anno: None };
        assert!(spec.create_operator(&db).is_none());
    }
}
