//! # Synthetic Relation Builder
//!
//! Mirrors every turn transition onto the proposition layer. For a TA
//! relation `L1 → TA → L2` with aligned propositions `I1 ~ L1` and `I2 ~ L2`
//! it creates a placeholder segment node `S` with `I1 → S → I2`, plus the YA
//! nodes linking it all together:
//!
//! - `L → YA → I` for every alignment pair
//! - `TA → YA → S` for every new segment node
//!
//! Ids come from the allocators passed in. Segment nodes are numbered first,
//! then the YA nodes of the alignment pairs, then the YA nodes of the segment
//! nodes.

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::align::Alignment;
use crate::filter;
use crate::model::{Edge, EdgeId, IdAllocator, Node, NodeId, NodeKind, Nodeset, Relation};
use crate::pattern::{self, RelationQuery};

/// Text and type given to synthetic nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub relation_text: String,
    pub relation_type: String,
    pub illocution_text: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            relation_text: "NONE".into(),
            relation_type: NodeKind::Inference.as_str().into(),
            illocution_text: "NONE".into(),
        }
    }
}

/// Nodes and edges produced by [`build_synthetic_relations`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyntheticRelations {
    /// `I → S → I`, one per transition with two aligned endpoints.
    pub segment_relations: Vec<Relation>,
    /// `L → YA → I` then `TA → YA → S`.
    pub illocution_relations: Vec<Relation>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl SyntheticRelations {
    /// A copy of `nodeset` with the synthetic nodes and edges appended.
    pub fn apply_to(&self, nodeset: &Nodeset) -> Nodeset {
        let mut result = nodeset.clone();
        result.nodes.extend(self.nodes.iter().cloned());
        result.edges.extend(self.edges.iter().cloned());
        result
    }
}

/// Build placeholder segment and illocution relations from `transitions`
/// (TA relations) and the proposition/locution `alignment`.
///
/// A locution aligned more than once maps to its first proposition. A
/// transition with an unaligned endpoint is skipped with a warning.
pub fn build_synthetic_relations(
    alignment: &Alignment,
    transitions: &[Relation],
    placeholders: &Placeholders,
    node_ids: &mut IdAllocator<NodeId>,
    edge_ids: &mut IdAllocator<EdgeId>,
) -> SyntheticRelations {
    let mut locution_to_proposition: HashMap<NodeId, NodeId> = HashMap::new();
    for pair in &alignment.pairs {
        locution_to_proposition.entry(pair.locution).or_insert(pair.proposition);
    }

    let mut out = SyntheticRelations::default();
    let mut segment_of: HashMap<NodeId, NodeId> = HashMap::new();
    let mut segment_to_transition: Vec<(NodeId, NodeId)> = Vec::new();

    for ta in transitions {
        let map = |ids: &[NodeId]| -> Option<Vec<NodeId>> {
            ids.iter().map(|l| locution_to_proposition.get(l).copied()).collect()
        };
        let (Some(sources), Some(targets)) = (map(&ta.sources), map(&ta.targets)) else {
            warn!(transition = %ta.relation, "transition endpoint has no aligned proposition, skipped");
            continue;
        };

        let segment = match segment_of.get(&ta.relation) {
            Some(&id) => id,
            None => {
                let id = node_ids.allocate();
                segment_of.insert(ta.relation, id);
                out.nodes.push(Node::new(id, &placeholders.relation_type, &placeholders.relation_text));
                id
            }
        };
        out.segment_relations.push(Relation::new(sources, segment, targets));
        segment_to_transition.push((segment, ta.relation));
    }

    let illocution_links = alignment
        .pairs
        .iter()
        .map(|p| (p.locution, p.proposition))
        .chain(segment_to_transition.iter().map(|&(s, ta)| (ta, s)));
    for (source, target) in illocution_links {
        let id = node_ids.allocate();
        out.nodes.push(Node::new(id, NodeKind::Illocution.as_str(), &placeholders.illocution_text));
        out.illocution_relations.push(Relation::new([source], id, [target]));
    }

    for rel in out.segment_relations.iter().chain(out.illocution_relations.iter()) {
        for (from, to) in rel.edges() {
            out.edges.push(Edge::new(from, to).with_id(edge_ids.allocate()));
        }
    }

    debug!(
        segments = out.segment_relations.len(),
        illocutions = out.illocution_relations.len(),
        edges = out.edges.len(),
        "built synthetic relations"
    );
    out
}

/// Remove the S and YA relations whose node text is still the placeholder,
/// i.e. synthetic relations that found no gold counterpart.
pub fn drop_placeholder_relations(nodeset: &Nodeset, placeholders: &Placeholders) -> Nodeset {
    let index = nodeset.node_index();
    let has_text = |rel: &Relation, text: &str| index.get(&rel.relation).is_some_and(|n| n.text == text);
    let mut placeholder_relations: Vec<Relation> = pattern::relations(nodeset, RelationQuery::Segment, false)
        .filter(|rel| has_text(rel, &placeholders.relation_text))
        .collect();
    placeholder_relations.extend(
        pattern::relations(nodeset, RelationQuery::Illocution, false)
            .filter(|rel| has_text(rel, &placeholders.illocution_text)),
    );
    debug!(relations = placeholder_relations.len(), "dropping placeholder relations");
    filter::remove_relations(nodeset, &placeholder_relations)
}
