//! A single (non-alternated) query: a flat node list plus the joins between them.
//! [`Conjunction::make_plan`] assembles the node searches and joins/filters into one
//! [`BoxedExecutionNode`] using a union-find over node indices, exactly the way the
//! planner described for the query engine works: operators that connect two
//! already-joined positions become filters, everything else becomes a seed join that
//! grows the result tuple by one position.

use crate::exec::indexjoin::IndexJoin;
use crate::exec::nodesearch::{self, NodeSearch};
use crate::exec::{binary_filter::BinaryFilter, BoxedExecutionNode};
use crate::operator::{
    BinaryOperatorSpec, DominanceSpec, IdenticalCoverageSpec, IdenticalNodeSpec, InclusionSpec, OverlapSpec,
    PartOfSubCorpusSpec, PointingSpec, PrecedenceSpec,
};
use crate::query::{ParsedJoin, ParsedNode, ParsedOperator};
use corpusgraph_core::graph::CorpusGraph;

#[derive(Debug, Clone, Default)]
pub struct Conjunction {
    pub nodes: Vec<ParsedNode>,
    pub joins: Vec<ParsedJoin>,
}

impl Conjunction {
    pub fn new(nodes: Vec<ParsedNode>, joins: Vec<ParsedJoin>) -> Self {
        Conjunction { nodes, joins }
    }

    fn operator_spec(join: &ParsedJoin) -> Box<dyn BinaryOperatorSpec> {
        match &join.op {
            ParsedOperator::Dominance { name, min_dist, max_dist } => Box::new(DominanceSpec {
                name: name.clone().unwrap_or_default(),
                dist: crate::operator::RangeSpec::bounded(*min_dist, *max_dist),
                edge_anno: join.edge_anno.clone(),
            }),
            ParsedOperator::Pointing { name, min_dist, max_dist } => Box::new(PointingSpec {
                name: name.clone().unwrap_or_default(),
                dist: crate::operator::RangeSpec::bounded(*min_dist, *max_dist),
                edge_anno: join.edge_anno.clone(),
            }),
            ParsedOperator::PartOfSubCorpus { min_dist, max_dist } => {
                Box::new(PartOfSubCorpusSpec { dist: crate::operator::RangeSpec::bounded(*min_dist, *max_dist) })
            }
            ParsedOperator::Precedence { segmentation, min_dist, max_dist } => Box::new(PrecedenceSpec {
                segmentation: segmentation.clone(),
                dist: crate::operator::RangeSpec::bounded(*min_dist, *max_dist),
            }),
            ParsedOperator::Overlap => Box::new(OverlapSpec),
            ParsedOperator::Inclusion => Box::new(InclusionSpec),
            ParsedOperator::IdenticalCoverage => Box::new(IdenticalCoverageSpec),
            ParsedOperator::IdenticalNode => Box::new(IdenticalNodeSpec),
        }
    }

    /// Unions every join's two endpoints; more than one surviving component means the
    /// query is malformed (disconnected node groups), which the caller treats as an
    /// empty result rather than an error.
    fn is_connected(&self) -> bool {
        let n = self.nodes.len();
        if n == 0 {
            return false;
        }
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], x: usize) -> usize {
            if parent[x] != x {
                let root = find(parent, parent[x]);
                parent[x] = root;
            }
            parent[x]
        }
        for join in &self.joins {
            if join.lhs >= n || join.rhs >= n {
                return false;
            }
            let (a, b) = (find(&mut parent, join.lhs), find(&mut parent, join.rhs));
            if a != b {
                parent[a] = b;
            }
        }
        let root = find(&mut parent, 0);
        (0..n).all(|i| find(&mut parent, i) == root)
    }

    /// Builds the physical plan, assuming every operator's components are already
    /// loaded (loaded here via [`CorpusGraph::ensure_loaded_all`] before any operator
    /// is bound, so the rest of the plan can hold immutable borrows of `graph`).
    /// Returns `None` for a malformed (disconnected) query or a join whose component
    /// doesn't exist — both are surfaced as an empty result, not an error.
    pub fn make_plan<'a>(&self, graph: &'a mut CorpusGraph) -> Option<BoxedExecutionNode<'a>> {
        if !self.is_connected() {
            return None;
        }
        graph.ensure_loaded_all().ok()?;
        let graph: &'a CorpusGraph = graph;

        let specs: Vec<Box<dyn BinaryOperatorSpec>> = self.joins.iter().map(Self::operator_spec).collect();

        let mut plan: BoxedExecutionNode<'a> = Box::new(NodeSearch::from_spec(self.nodes[0].clone(), graph));
        let mut positions: Vec<Option<usize>> = vec![None; self.nodes.len()];
        positions[0] = Some(0);

        let mut remaining: Vec<usize> = (0..self.joins.len()).collect();
        while !remaining.is_empty() {
            let mut next_remaining = Vec::new();
            let mut progressed = false;
            for idx in remaining {
                let join = &self.joins[idx];
                match (positions[join.lhs], positions[join.rhs]) {
                    (Some(lp), Some(rp)) => {
                        let op = specs[idx].create_operator(graph)?;
                        plan = Box::new(BinaryFilter::new(op, plan, lp, rp));
                        progressed = true;
                    }
                    (Some(lp), None) => {
                        let op = specs[idx].create_operator(graph)?;
                        let new_pos = plan.node_count();
                        let rhs_node_spec = self.nodes[join.rhs].clone();
                        let rhs_filter = Box::new(move |node| nodesearch::match_node_against_spec(graph, node, &rhs_node_spec));
                        plan = Box::new(IndexJoin::new(op, plan, lp, Some(rhs_filter)));
                        positions[join.rhs] = Some(new_pos);
                        progressed = true;
                    }
                    (None, Some(rp)) => {
                        let op = specs[idx].create_operator(graph)?;
                        let new_pos = plan.node_count();
                        let lhs_node_spec = self.nodes[join.lhs].clone();
                        let lhs_filter = Box::new(move |node| nodesearch::match_node_against_spec(graph, node, &lhs_node_spec));
                        let inverse = op.get_inverse_operator(graph).unwrap_or(op);
                        plan = Box::new(IndexJoin::new(inverse, plan, rp, Some(lhs_filter)));
                        positions[join.lhs] = Some(new_pos);
                        progressed = true;
                    }
                    (None, None) => next_remaining.push(idx),
                }
            }
            if !progressed && !next_remaining.is_empty() {
                // every remaining join names two not-yet-reached positions; shouldn't
                // happen once is_connected() held, but avoid looping forever.
                return None;
            }
            remaining = next_remaining;
        }

        Some(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::RangeSpec;
    use crate::query::ParsedOperator;
    use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};
    use corpusgraph_core::ANNIS_NS;

    fn sample_graph() -> CorpusGraph {
        let mut db = CorpusGraph::new();
        let mut u = GraphUpdate::new();
        for (name, pos) in [("root", "ROOT"), ("child1", "N"), ("child2", "V")] {
            u.add_event(UpdateEvent::AddNode { node_name: name.into(), node_type: "node".into() });
            u.add_event(UpdateEvent::AddNodeLabel {
                node_name: name.into(),
                anno_ns: "".into(),
                anno_name: "pos".into(),
                anno_value: pos.into(),
            });
        }
        for child in ["child1", "child2"] {
            u.add_event(UpdateEvent::AddEdge {
                source_node: "root".into(),
                target_node: child.into(),
                layer: ANNIS_NS.into(),
                component_type: "Dominance".into(),
                component_name: "".into(),
            });
        }
        u.finish();
        db.apply_update_in_memory(&mut u).unwrap();
        db
    }

    #[test]
    fn two_node_dominance_query_finds_both_children() {
        let mut db = sample_graph();
        let conjunction = Conjunction::new(
            vec![ParsedNode::exact(None, "pos", Some("ROOT")), ParsedNode::any()],
            vec![ParsedJoin {
                lhs: 0,
                rhs: 1,
                op: ParsedOperator::Dominance { name: None, min_dist: 1, max_dist: 1 },
                edge_anno: None,
            }],
        );
        let plan = conjunction.make_plan(&mut db).expect("connected query yields a plan");
        let results: Vec<_> = plan.collect();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn disconnected_query_has_no_plan() {
        let mut db = sample_graph();
        let conjunction = Conjunction::new(vec![ParsedNode::any(), ParsedNode::any()], vec![]);
        assert!(conjunction.make_plan(&mut db).is_none());
    }
}
