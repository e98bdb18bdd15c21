//! A top-level query: alternatives run to exhaustion in sequence and their results
//! concatenated — no attempt is made to interleave or deduplicate across alternatives,
//! matching how the distilled spec describes disjunction at the executor level.

use crate::match_result::Match;
use crate::query::Conjunction;
use corpusgraph_core::graph::CorpusGraph;

#[derive(Debug, Clone, Default)]
pub struct Disjunction {
    pub alternatives: Vec<Conjunction>,
}

impl Disjunction {
    pub fn new(alternatives: Vec<Conjunction>) -> Self {
        Disjunction { alternatives }
    }

    /// Runs every alternative to exhaustion in order and returns the concatenated
    /// result. An alternative with a malformed (disconnected) query graph silently
    /// contributes nothing rather than aborting the whole disjunction.
    pub fn execute(&self, graph: &mut CorpusGraph) -> Vec<Vec<Match>> {
        let mut result = Vec::new();
        for conjunction in &self.alternatives {
            if let Some(plan) = conjunction.make_plan(graph) {
                result.extend(plan);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ParsedNode;

    #[test]
    fn empty_disjunction_has_no_results() {
        let mut db = CorpusGraph::new();
        let disjunction = Disjunction::new(vec![]);
        assert!(disjunction.execute(&mut db).is_empty());
    }

    #[test]
    fn single_alternative_any_node_matches_every_node() {
        use corpusgraph_core::graph::update::{GraphUpdate, UpdateEvent};
        let mut db = CorpusGraph::new();
        let mut u = GraphUpdate::new();
        u.add_event(UpdateEvent::AddNode { node_name: "n1".into(), node_type: "node".into() });
        u.finish();
        db.apply_update_in_memory(&mut u).unwrap();

        let disjunction = Disjunction::new(vec![Conjunction::new(vec![ParsedNode::any()], vec![])]);
        assert_eq!(disjunction.execute(&mut db).len(), 1);
    }
}
