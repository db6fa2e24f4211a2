//! Relation: sources → relation node → targets, derived from edges.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use super::NodeId;

/// Argument list. Almost every relation has one or two arguments per side.
pub type Arguments = SmallVec<[NodeId; 2]>;

/// An n-ary relation materialised from the incoming and outgoing edges of a
/// relation node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub sources: Arguments,
    pub targets: Arguments,
    pub relation: NodeId,
}

impl Relation {
    pub fn new(
        sources: impl IntoIterator<Item = NodeId>,
        relation: NodeId,
        targets: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            targets: targets.into_iter().collect(),
            relation,
        }
    }

    /// The edges this relation consists of: `source → relation` then
    /// `relation → target`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.sources
            .iter()
            .map(move |&src| (src, self.relation))
            .chain(self.targets.iter().map(move |&trg| (self.relation, trg)))
    }

    /// Every node the relation touches, relation node last.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sources
            .iter()
            .chain(self.targets.iter())
            .copied()
            .chain(std::iter::once(self.relation))
    }

    /// Order-insensitive identity of the arguments.
    pub fn argument_key(&self) -> ArgumentKey {
        ArgumentKey::new(self.sources.iter().copied(), self.targets.iter().copied())
    }

    pub fn single_source(&self) -> Option<NodeId> {
        match self.sources.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn single_target(&self) -> Option<NodeId> {
        match self.targets.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Sorted, de-duplicated source and target ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgumentKey {
    pub sources: Vec<NodeId>,
    pub targets: Vec<NodeId>,
}

impl ArgumentKey {
    pub fn new(
        sources: impl IntoIterator<Item = NodeId>,
        targets: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        let mut sources: Vec<NodeId> = sources.into_iter().collect();
        let mut targets: Vec<NodeId> = targets.into_iter().collect();
        sources.sort_unstable();
        sources.dedup();
        targets.sort_unstable();
        targets.dedup();
        Self { sources, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_order() {
        let rel = Relation::new([NodeId(1), NodeId(2)], NodeId(10), [NodeId(3)]);
        let edges: Vec<_> = rel.edges().collect();
        assert_eq!(
            edges,
            vec![
                (NodeId(1), NodeId(10)),
                (NodeId(2), NodeId(10)),
                (NodeId(10), NodeId(3)),
            ]
        );
    }

    #[test]
    fn test_argument_key_ignores_order_and_duplicates() {
        let a = Relation::new([NodeId(2), NodeId(1), NodeId(2)], NodeId(10), [NodeId(3)]);
        let b = Relation::new([NodeId(1), NodeId(2)], NodeId(11), [NodeId(3)]);
        assert_eq!(a.argument_key(), b.argument_key());
    }
}
