//! # Isolation & Validity Filter
//!
//! Reduces a raw nodeset to the nodes and edges that take part in a
//! recognised relation. Runs before every other stage so that disconnected
//! locutions or propositions never reach the resolver or the aligner.

use hashbrown::HashSet;
use tracing::debug;

use crate::model::{NodeId, Nodeset, Relation};
use crate::pattern::{self, RelationQuery};

/// The relation families a cleaned nodeset is built from: S, then YA, then TA.
pub const KEPT_FAMILIES: [RelationQuery; 3] = [
    RelationQuery::Segment,
    RelationQuery::Illocution,
    RelationQuery::TRANSITION,
];

/// All relations matching the kept families.
pub fn valid_relations(nodeset: &Nodeset, enforce_cardinality: bool) -> Vec<Relation> {
    KEPT_FAMILIES
        .iter()
        .flat_map(|&query| pattern::relations(nodeset, query, enforce_cardinality))
        .collect()
}

/// The edges and nodes covered by `relations`.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub edges: HashSet<(NodeId, NodeId)>,
    pub nodes: HashSet<NodeId>,
}

/// Collect every `source → relation` and `relation → target` edge of
/// `relations` together with the nodes they touch.
pub fn valid_subgraph(relations: &[Relation]) -> Subgraph {
    let mut subgraph = Subgraph::default();
    for rel in relations {
        for (from, to) in rel.edges() {
            subgraph.edges.insert((from, to));
            subgraph.nodes.insert(from);
            subgraph.nodes.insert(to);
        }
    }
    subgraph
}

/// Keep only nodes and edges belonging to a valid relation.
///
/// Node and edge order is preserved; locution records survive only for kept
/// nodes. The input is never modified.
pub fn cleanup(nodeset: &Nodeset, enforce_cardinality: bool) -> Nodeset {
    let relations = valid_relations(nodeset, enforce_cardinality);
    let subgraph = valid_subgraph(&relations);

    let result = Nodeset {
        nodes: nodeset
            .nodes
            .iter()
            .filter(|n| subgraph.nodes.contains(&n.id))
            .cloned()
            .collect(),
        edges: nodeset
            .edges
            .iter()
            .filter(|e| subgraph.edges.contains(&e.endpoints()))
            .cloned()
            .collect(),
        locutions: nodeset
            .locutions
            .iter()
            .filter(|l| subgraph.nodes.contains(&l.node_id))
            .cloned()
            .collect(),
    };

    debug!(
        relations = relations.len(),
        nodes_dropped = nodeset.nodes.len() - result.nodes.len(),
        edges_dropped = nodeset.edges.len() - result.edges.len(),
        "cleaned nodeset"
    );
    result
}

/// Remove the relation nodes of `relations` and exactly their incident edges.
pub fn remove_relations(nodeset: &Nodeset, relations: &[Relation]) -> Nodeset {
    let relation_ids: HashSet<NodeId> = relations.iter().map(|r| r.relation).collect();
    let relation_edges: HashSet<(NodeId, NodeId)> = relations.iter().flat_map(|r| r.edges()).collect();

    Nodeset {
        nodes: nodeset
            .nodes
            .iter()
            .filter(|n| !relation_ids.contains(&n.id))
            .cloned()
            .collect(),
        edges: nodeset
            .edges
            .iter()
            .filter(|e| !relation_edges.contains(&e.endpoints()))
            .cloned()
            .collect(),
        locutions: nodeset.locutions.clone(),
    }
}

/// Strip every S and YA relation (non-enforced match), leaving locutions,
/// propositions and transitions.
pub fn remove_segment_and_illocution_relations(nodeset: &Nodeset) -> Nodeset {
    let relations: Vec<Relation> = [RelationQuery::Segment, RelationQuery::Illocution]
        .iter()
        .flat_map(|&query| pattern::relations(nodeset, query, false))
        .collect();
    let result = remove_relations(nodeset, &relations);
    debug!(
        removed_nodes = nodeset.nodes.len() - result.nodes.len(),
        removed_edges = nodeset.edges.len() - result.edges.len(),
        "removed S and YA relations"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Locution;
    use pretty_assertions::assert_eq;

    fn noisy() -> Nodeset {
        Nodeset::new()
            .with_node(1, "L", "Alice : a")
            .with_node(2, "L", "Bob : b")
            .with_node(3, "TA", "Default Transition")
            .with_node(4, "I", "a")
            .with_node(5, "I", "b")
            .with_node(6, "RA", "Default Inference")
            .with_node(7, "YA", "Asserting")
            .with_node(8, "L", "Carol : isolated")
            .with_node(9, "I", "orphan")
            .with_relation(&[1], 3, &[2])
            .with_relation(&[1], 7, &[4])
            .with_relation(&[5], 6, &[4])
            // I → L is not a pattern edge
            .with_edge(9, 8)
            .with_locution(Locution::new(NodeId(1)))
            .with_locution(Locution::new(NodeId(8)))
    }

    #[test]
    fn test_cleanup_drops_isolated_and_invalid() {
        let cleaned = cleanup(&noisy(), true);
        let ids: Vec<u64> = cleaned.nodes.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(cleaned.edges.len(), 6);
        assert!(!cleaned.contains_edge(NodeId(9), NodeId(8)));
        assert_eq!(cleaned.locutions, vec![Locution::new(NodeId(1))]);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let once = cleanup(&noisy(), true);
        let twice = cleanup(&once, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_cleanup_does_not_touch_input() {
        let input = noisy();
        let before = input.clone();
        let _ = cleanup(&input, true);
        assert_eq!(input, before);
    }

    #[test]
    fn test_cardinality_setting_reaches_cleanup() {
        // TA11 has a second target locution
        let nodeset = noisy()
            .with_node(10, "L", "Dave : d")
            .with_node(11, "TA", "Default Transition")
            .with_relation(&[2], 11, &[1])
            .with_edge(11, 10);
        let strict = cleanup(&nodeset, true);
        let loose = cleanup(&nodeset, false);
        assert!(strict.node(NodeId(11)).is_none());
        assert!(strict.node(NodeId(10)).is_none());
        assert!(loose.node(NodeId(11)).is_some());
        assert!(loose.contains_edge(NodeId(11), NodeId(10)));
        assert_eq!(loose.nodes.len(), strict.nodes.len() + 2);
    }

    #[test]
    fn test_remove_relations_only_incident_edges() {
        let nodeset = cleanup(&noisy(), true);
        let stripped = remove_segment_and_illocution_relations(&nodeset);
        let ids: Vec<u64> = stripped.nodes.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(stripped.edges.len(), 2);
        assert!(stripped.contains_edge(NodeId(1), NodeId(3)));
        assert!(stripped.contains_edge(NodeId(3), NodeId(2)));
    }
}
