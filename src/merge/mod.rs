//! # Gold Merge
//!
//! Reconciles the synthetic relation nodes of a prepared nodeset with the
//! relation nodes of a gold graph (the cleaned, direction-normalised
//! original).
//!
//! Matching runs in dependency order:
//!
//! 1. locutions and transitions by identical id (the id sets must agree)
//! 2. propositions by exact text (unique per graph, text sets must agree)
//! 3. segment relations by their mapped `(sources, targets)`
//! 4. illocution relations the same way, now that segments are mapped
//!
//! A matched synthetic node takes over the gold node's text and type. An
//! unmatched one keeps its placeholder, meaning "no such relation".

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::model::{ArgumentKey, Edge, EdgeId, IdAllocator, NodeId, NodeKind, Nodeset};
use crate::pattern::{self, RelationQuery};
use crate::{Error, Result};

/// Correspondence between the nodes of two graphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMatching {
    /// `(node in this graph, node in the other graph)`, in matching order.
    pub pairs: Vec<(NodeId, NodeId)>,
    forward: HashMap<NodeId, NodeId>,
}

impl NodeMatching {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair. A node already matched keeps its first partner.
    pub fn insert(&mut self, this: NodeId, other: NodeId) {
        if !self.forward.contains_key(&this) {
            self.forward.insert(this, other);
            self.pairs.push((this, other));
        }
    }

    pub fn get(&self, this: NodeId) -> Option<NodeId> {
        self.forward.get(&this).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Match every node of `nodeset` that has a counterpart in `other`.
pub fn match_nodes(nodeset: &Nodeset, other: &Nodeset) -> Result<NodeMatching> {
    let mut matching = NodeMatching::new();

    for kind in [NodeKind::Locution, NodeKind::Transition] {
        let ours = nodeset.node_ids_of(kind);
        let theirs = other.node_ids_of(kind);
        let ours_set: HashSet<NodeId> = ours.iter().copied().collect();
        let theirs_set: HashSet<NodeId> = theirs.iter().copied().collect();
        if ours_set != theirs_set {
            return Err(Error::GraphMismatch {
                kind,
                detail: format!("{ours:?} vs {theirs:?}"),
            });
        }
        for id in ours {
            matching.insert(id, id);
        }
    }

    let ours = unique_texts(nodeset)?;
    let theirs = unique_texts(other)?;
    let theirs_by_text: HashMap<&str, NodeId> = theirs.iter().map(|&(t, id)| (t, id)).collect();
    let ours_keys: HashSet<&str> = ours.iter().map(|&(t, _)| t).collect();
    let theirs_keys: HashSet<&str> = theirs_by_text.keys().copied().collect();
    if ours_keys != theirs_keys {
        let mut missing: Vec<&str> = ours_keys.symmetric_difference(&theirs_keys).copied().collect();
        missing.sort_unstable();
        return Err(Error::GraphMismatch {
            kind: NodeKind::Proposition,
            detail: format!("texts not shared by both graphs: {missing:?}"),
        });
    }
    for (text, id) in ours {
        if let Some(&other_id) = theirs_by_text.get(text) {
            matching.insert(id, other_id);
        }
    }

    for query in [RelationQuery::Segment, RelationQuery::Illocution] {
        let found = match_relations_by_arguments(nodeset, other, query, &matching)?;
        debug!(query = %query, matched = found.len(), "matched relation nodes");
        for (this, that) in found {
            matching.insert(this, that);
        }
    }
    Ok(matching)
}

/// `(text, id)` of every proposition. Fails when a text occurs twice.
fn unique_texts(nodeset: &Nodeset) -> Result<Vec<(&str, NodeId)>> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for node in nodeset.nodes.iter().filter(|n| n.is(NodeKind::Proposition)) {
        if !seen.insert(node.text.as_str()) {
            return Err(Error::DuplicateText { text: node.text.clone() });
        }
        result.push((node.text.as_str(), node.id));
    }
    Ok(result)
}

/// Match the `query` relations of `nodeset` to those of `other` whose
/// arguments, mapped through `matching`, are identical.
///
/// Relations with an empty side do not take part. Two relations of
/// `nodeset` with the same arguments fail with
/// [`Error::DuplicateArguments`]; on the `other` side the first one wins.
pub fn match_relations_by_arguments(
    nodeset: &Nodeset,
    other: &Nodeset,
    query: RelationQuery,
    matching: &NodeMatching,
) -> Result<Vec<(NodeId, NodeId)>> {
    let mut theirs: HashMap<ArgumentKey, NodeId> = HashMap::new();
    for rel in pattern::relations(other, query, false) {
        if rel.sources.is_empty() || rel.targets.is_empty() {
            continue;
        }
        theirs.entry(rel.argument_key()).or_insert(rel.relation);
    }

    let mut ours: HashSet<ArgumentKey> = HashSet::new();
    let mut result = Vec::new();
    for rel in pattern::relations(nodeset, query, false) {
        if rel.sources.is_empty() || rel.targets.is_empty() {
            continue;
        }
        if !ours.insert(rel.argument_key()) {
            return Err(Error::DuplicateArguments { relation: rel.relation });
        }
        let sources: Option<Vec<NodeId>> = rel.sources.iter().map(|&id| matching.get(id)).collect();
        let targets: Option<Vec<NodeId>> = rel.targets.iter().map(|&id| matching.get(id)).collect();
        let (Some(sources), Some(targets)) = (sources, targets) else {
            continue;
        };
        if let Some(&other_id) = theirs.get(&ArgumentKey::new(sources, targets)) {
            result.push((rel.relation, other_id));
        }
    }
    Ok(result)
}

/// Copy gold text and type onto every matched node of `nodeset`.
///
/// With `add_unmatched`, unmatched gold nodes are added under fresh ids. In
/// both cases a gold edge is added when both of its endpoints map to nodes
/// of the result and the edge is not already there.
pub fn merge_gold(
    nodeset: &Nodeset,
    gold: &Nodeset,
    matching: &NodeMatching,
    add_unmatched: bool,
    node_ids: &mut IdAllocator<NodeId>,
    edge_ids: &mut IdAllocator<EdgeId>,
) -> Result<Nodeset> {
    let mut result = nodeset.clone();
    let gold_index = gold.node_index();
    let mut gold_to_ours: HashMap<NodeId, NodeId> = HashMap::new();

    for &(ours, theirs) in &matching.pairs {
        let gold_node = gold_index
            .get(&theirs)
            .ok_or_else(|| Error::NotFound(format!("gold node {theirs}")))?;
        let node = result
            .node_mut(ours)
            .ok_or_else(|| Error::NotFound(format!("node {ours}")))?;
        node.text = gold_node.text.clone();
        node.node_type = gold_node.node_type.clone();
        gold_to_ours.insert(theirs, ours);
    }

    if add_unmatched {
        for gold_node in &gold.nodes {
            if gold_to_ours.contains_key(&gold_node.id) {
                continue;
            }
            let mut node = gold_node.clone();
            node.id = node_ids.allocate();
            gold_to_ours.insert(gold_node.id, node.id);
            result.nodes.push(node);
        }
    }

    let present: HashSet<NodeId> = result.nodes.iter().map(|n| n.id).collect();
    let mut existing: HashSet<(NodeId, NodeId)> = result.edges.iter().map(Edge::endpoints).collect();
    let mut added_edges = 0usize;
    for edge in &gold.edges {
        let (Some(&from), Some(&to)) = (gold_to_ours.get(&edge.from), gold_to_ours.get(&edge.to)) else {
            continue;
        };
        if present.contains(&from) && present.contains(&to) && existing.insert((from, to)) {
            result.edges.push(Edge::new(from, to).with_id(edge_ids.allocate()));
            added_edges += 1;
        }
    }

    debug!(
        matched = matching.len(),
        nodes_added = result.nodes.len() - nodeset.nodes.len(),
        edges_added = added_edges,
        "merged gold data"
    );
    Ok(result)
}
