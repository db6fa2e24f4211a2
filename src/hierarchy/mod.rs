//! # Hierarchy Sorter
//!
//! Linearises a node subset (in practice: the locutions) so that structural
//! ancestors come first. Two nodes of the subset are connected when a relation
//! node bridges them (`a → rel → b`); the order guarantees `a` before `b`.
//!
//! Crowd annotations occasionally contain cycles. Every node is processed
//! exactly once, so the sort always terminates and always returns every input
//! node.

use chrono::NaiveDateTime;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::model::{Edge, NodeId, NodeKind, Nodeset, parse_timestamp};
use crate::pattern::two_hop_connections;

/// How locutions are put into document order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocutionOrder {
    /// Reverse post-order over TA/YA connectivity.
    #[default]
    Hierarchy,
    /// By timestamp; untimed locutions and ties fall back to hierarchy order.
    Chronological,
}

/// Sort `node_ids` so that for every two-hop triple `(a, rel, b)` between
/// them, `a` precedes `b`.
///
/// Seeds a stack with the leaves (nodes that reach nothing), pops, and pushes
/// a parent once all of its children are visited. Nodes left over because
/// they sit on a cycle are forced in reverse input order. The completion
/// order, reversed, is the result.
pub fn sort_by_hierarchy(node_ids: &[NodeId], edges: &[Edge]) -> Vec<NodeId> {
    let mut unique = Vec::with_capacity(node_ids.len());
    let mut members = HashSet::with_capacity(node_ids.len());
    for &id in node_ids {
        if members.insert(id) {
            unique.push(id);
        }
    }

    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (src, trg, _) in two_hop_connections(&unique, &members, edges) {
        if src == trg {
            continue;
        }
        let c = children.entry(src).or_default();
        if !c.contains(&trg) {
            c.push(trg);
            parents.entry(trg).or_default().push(src);
        }
    }

    let mut visited: HashSet<NodeId> = HashSet::with_capacity(unique.len());
    let mut completed: Vec<NodeId> = Vec::with_capacity(unique.len());
    let mut stack: Vec<NodeId> = unique
        .iter()
        .copied()
        .filter(|id| !children.contains_key(id))
        .collect();
    let mut forced = unique.iter().rev();

    loop {
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            completed.push(id);
            for &parent in parents.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                let ready = children
                    .get(&parent)
                    .is_none_or(|c| c.iter().all(|child| visited.contains(child)));
                if !visited.contains(&parent) && ready {
                    stack.push(parent);
                }
            }
        }
        match forced.find(|id| !visited.contains(*id)) {
            Some(&id) => stack.push(id),
            None => break,
        }
    }

    completed.reverse();
    completed
}

/// Locution ids of `nodeset` in document order.
pub fn order_locutions(nodeset: &Nodeset, order: LocutionOrder) -> Vec<NodeId> {
    let locutions = nodeset.node_ids_of(NodeKind::Locution);
    let mut sorted = sort_by_hierarchy(&locutions, &nodeset.edges);
    if order == LocutionOrder::Chronological {
        let stamps: HashMap<NodeId, NaiveDateTime> = locution_timestamps(nodeset);
        // stable: ties and untimed locutions keep hierarchy order
        sorted.sort_by_key(|id| {
            let ts = stamps.get(id).copied();
            (ts.is_none(), ts)
        });
    }
    sorted
}

/// Parsed timestamps per locution, from the `locutions` records or, failing
/// that, from the node itself.
fn locution_timestamps(nodeset: &Nodeset) -> HashMap<NodeId, NaiveDateTime> {
    let mut stamps: HashMap<NodeId, NaiveDateTime> = nodeset
        .locutions
        .iter()
        .filter_map(|l| l.parsed_timestamp().map(|ts| (l.node_id, ts)))
        .collect();
    for node in nodeset.nodes.iter().filter(|n| n.is(NodeKind::Locution)) {
        if let Some(ts) = node.timestamp.as_deref().and_then(parse_timestamp) {
            stamps.entry(node.id).or_insert(ts);
        }
    }
    stamps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Locution;
    use pretty_assertions::assert_eq;

    fn ids(raw: &[u64]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    fn chain() -> Nodeset {
        // L1 → TA → L2 → TA → L3, listed out of order
        Nodeset::new()
            .with_node(3, "L", "c")
            .with_node(1, "L", "a")
            .with_node(2, "L", "b")
            .with_node(10, "TA", "")
            .with_node(11, "TA", "")
            .with_relation(&[1], 10, &[2])
            .with_relation(&[2], 11, &[3])
    }

    #[test]
    fn test_chain_order() {
        let nodeset = chain();
        assert_eq!(sort_by_hierarchy(&ids(&[3, 1, 2]), &nodeset.edges), ids(&[1, 2, 3]));
    }

    #[test]
    fn test_branching_parents_precede_children() {
        // 1 → 2, 1 → 3, 2 → 4, 3 → 4
        let nodeset = Nodeset::new()
            .with_relation(&[1], 10, &[2])
            .with_relation(&[1], 11, &[3])
            .with_relation(&[2], 12, &[4])
            .with_relation(&[3], 13, &[4]);
        let order = sort_by_hierarchy(&ids(&[4, 3, 2, 1]), &nodeset.edges);
        let pos = |id: u64| order.iter().position(|n| *n == NodeId(id)).unwrap();
        assert!(pos(1) < pos(2) && pos(1) < pos(3));
        assert!(pos(2) < pos(4) && pos(3) < pos(4));
    }

    #[test]
    fn test_cycle_terminates_with_all_nodes() {
        let nodeset = Nodeset::new()
            .with_relation(&[1], 10, &[2])
            .with_relation(&[2], 11, &[3])
            .with_relation(&[3], 12, &[1]);
        let mut order = sort_by_hierarchy(&ids(&[1, 2, 3]), &nodeset.edges);
        order.sort();
        assert_eq!(order, ids(&[1, 2, 3]));
    }

    #[test]
    fn test_duplicates_and_self_loops() {
        let nodeset = Nodeset::new().with_relation(&[1], 10, &[1]).with_relation(&[1], 11, &[2]);
        assert_eq!(sort_by_hierarchy(&ids(&[2, 1, 2]), &nodeset.edges), ids(&[1, 2]));
    }

    #[test]
    fn test_unconnected_nodes_are_kept() {
        assert_eq!(sort_by_hierarchy(&ids(&[5, 6]), &[]).len(), 2);
        assert!(sort_by_hierarchy(&[], &[]).is_empty());
    }

    #[test]
    fn test_chronological_fallback() {
        let nodeset = chain()
            .with_locution(Locution::new(NodeId(3)).with_timestamp("2020-01-01 10:00:00"))
            .with_locution(Locution::new(NodeId(2)).with_timestamp("2020-01-01 11:00:00"));
        // 1 has no timestamp and goes last
        assert_eq!(
            order_locutions(&nodeset, LocutionOrder::Chronological),
            ids(&[3, 2, 1])
        );
        assert_eq!(order_locutions(&nodeset, LocutionOrder::Hierarchy), ids(&[1, 2, 3]));
    }
}
