//! # Direction Resolver
//!
//! Decides for every inference relation whether it points the same way as the
//! turn transition (TA) that anchors it, and flips the ones that do not.
//!
//! An argument's anchor is the locution it was asserted in: the source of the
//! `L → YA → I` link, or for reported speech the source one `L → YA → L` hop
//! further up. For each `(source anchor, target anchor)` pair:
//!
//! - pair is a TA `from → to` ⇒ **Forward** (left as is)
//! - reversed pair is a TA ⇒ **Reversed** (marker appended, edges swapped)
//! - evidence for both ⇒ hard error, the nodeset cannot be normalised
//! - no evidence ⇒ **Unknown**, logged and left untouched

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::model::{NodeId, NodeKind, Nodeset, Relation, unordered_pair};
use crate::pattern::{self, RelationKind, RelationQuery};
use crate::{Error, Result};

/// Classification of one inference relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Unknown,
    Forward,
    Reversed,
}

/// A relation together with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelation {
    pub relation: Relation,
    pub direction: Direction,
}

/// Output of [`resolve_directions`], in relation match order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionReport {
    pub relations: Vec<ResolvedRelation>,
}

impl DirectionReport {
    pub fn direction(&self, relation: NodeId) -> Option<Direction> {
        self.relations
            .iter()
            .find(|r| r.relation.relation == relation)
            .map(|r| r.direction)
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.relations.iter().filter(|r| r.direction == direction).count()
    }

    /// The relations to flip.
    pub fn reversed(&self) -> Vec<Relation> {
        self.with_direction(Direction::Reversed)
    }

    /// The relations no transition could orient.
    pub fn unknown(&self) -> Vec<Relation> {
        self.with_direction(Direction::Unknown)
    }

    fn with_direction(&self, direction: Direction) -> Vec<Relation> {
        self.relations
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| r.relation.clone())
            .collect()
    }
}

// ============================================================================
// Anchors
// ============================================================================

/// YA target → YA sources, restricted to `L → YA → I` and `L → YA → L`.
#[derive(Debug, Default)]
pub struct LocutionAnchors {
    sources_of: HashMap<NodeId, SmallVec<[NodeId; 1]>>,
}

impl LocutionAnchors {
    pub fn new(nodeset: &Nodeset) -> Self {
        let mut anchors = Self::default();
        for kind in [RelationKind::YaLocutionToProposition, RelationKind::YaLocutionToLocution] {
            for rel in pattern::relations(nodeset, kind.into(), true) {
                if let (Some(src), Some(trg)) = (rel.single_source(), rel.single_target()) {
                    anchors.sources_of.entry(trg).or_default().push(src);
                }
            }
        }
        anchors
    }

    /// All locutions anchoring `node`. Empty when there is none.
    pub fn of(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for &mapped in self.sources_of.get(&node).map(|v| v.as_slice()).unwrap_or(&[]) {
            match self.sources_of.get(&mapped) {
                // reported speech: one more hop
                Some(outer) => result.extend(outer.iter().copied()),
                None => result.push(mapped),
            }
        }
        result
    }
}

/// Anchors of every locution-anchored node of `nodeset`.
pub fn locution_anchors(nodeset: &Nodeset) -> LocutionAnchors {
    LocutionAnchors::new(nodeset)
}

// ============================================================================
// Resolution
// ============================================================================

/// Classify every inference relation of `nodeset`.
///
/// Fails with [`Error::AmbiguousDirection`] when one relation has TA evidence
/// in both directions. Relations whose arguments do not have exactly one
/// anchor each stay [`Direction::Unknown`].
pub fn resolve_directions(nodeset: &Nodeset) -> Result<DirectionReport> {
    let mut transitions: HashSet<(NodeId, NodeId)> = HashSet::new();
    for rel in pattern::relations(nodeset, RelationQuery::TRANSITION, true) {
        for &src in &rel.sources {
            for &trg in &rel.targets {
                transitions.insert((src, trg));
            }
        }
    }
    let anchors = LocutionAnchors::new(nodeset);

    let mut report = DirectionReport::default();
    for rel in pattern::relations(nodeset, RelationQuery::INFERENCE, true) {
        let direction = classify(&rel, &anchors, &transitions)?;
        report.relations.push(ResolvedRelation { relation: rel, direction });
    }

    debug!(
        forward = report.count(Direction::Forward),
        reversed = report.count(Direction::Reversed),
        unknown = report.count(Direction::Unknown),
        "resolved inference directions"
    );
    Ok(report)
}

fn classify(
    rel: &Relation,
    anchors: &LocutionAnchors,
    transitions: &HashSet<(NodeId, NodeId)>,
) -> Result<Direction> {
    let source_anchors: Vec<Vec<NodeId>> = rel.sources.iter().map(|&id| anchors.of(id)).collect();
    let target_anchors: Vec<Vec<NodeId>> = rel.targets.iter().map(|&id| anchors.of(id)).collect();

    let all = source_anchors.iter().chain(target_anchors.iter());
    if all.clone().any(Vec::is_empty) {
        warn!(relation = %rel.relation, "no anchoring locution for an argument, direction unknown");
        return Ok(Direction::Unknown);
    }
    if all.clone().any(|a| a.len() > 1) {
        warn!(relation = %rel.relation, "argument with several anchoring locutions, direction unknown");
        return Ok(Direction::Unknown);
    }

    let mut decided: Option<Direction> = None;
    for src in source_anchors.iter().flatten() {
        for trg in target_anchors.iter().flatten() {
            let found = if transitions.contains(&(*src, *trg)) {
                Direction::Forward
            } else if transitions.contains(&(*trg, *src)) {
                Direction::Reversed
            } else {
                continue;
            };
            match decided {
                Some(previous) if previous != found => {
                    return Err(Error::AmbiguousDirection { relation: rel.relation });
                }
                _ => decided = Some(found),
            }
        }
    }

    Ok(decided.unwrap_or_else(|| {
        warn!(relation = %rel.relation, "no transition between the argument anchors, direction unknown");
        Direction::Unknown
    }))
}

// ============================================================================
// Reversal
// ============================================================================

/// Flip `relations`: append `suffix` to each relation node's text and swap
/// both incident edge sets. With `redo`, strip the suffix instead (failing
/// with [`Error::NotReversed`] if it is missing) and swap back.
///
/// Each edge is swapped at most once, even if several relations share it.
pub fn reverse_relations(nodeset: &Nodeset, relations: &[Relation], suffix: &str, redo: bool) -> Result<Nodeset> {
    let mut result = nodeset.clone();
    let mut swapped: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut marked: HashSet<NodeId> = HashSet::new();

    for rel in relations {
        if marked.insert(rel.relation) {
            let node = result
                .node_mut(rel.relation)
                .ok_or_else(|| Error::NotFound(format!("relation node {}", rel.relation)))?;
            if redo {
                let original = node
                    .text
                    .strip_suffix(suffix)
                    .ok_or(Error::NotReversed(rel.relation))?
                    .to_string();
                node.text = original;
            } else {
                node.text.push_str(suffix);
            }
            if !node.is(NodeKind::Inference) {
                warn!(relation = %rel.relation, node_type = %node.node_type, "reversed a non-inference relation");
            }
        }

        for (from, to) in rel.edges() {
            if !swapped.insert(unordered_pair(from, to)) {
                continue;
            }
            // duplicates of an annotation edge all follow the relation
            let mut found = false;
            for edge in result.edges.iter_mut().filter(|e| e.from == from && e.to == to) {
                edge.swap();
                found = true;
            }
            if !found {
                return Err(Error::NotFound(format!("edge {from} -> {to}")));
            }
        }
    }
    Ok(result)
}

/// Resolve and flip every reversed inference relation.
pub fn normalize_directions(nodeset: &Nodeset, suffix: &str) -> Result<(Nodeset, DirectionReport)> {
    let report = resolve_directions(nodeset)?;
    let normalized = reverse_relations(nodeset, &report.reversed(), suffix, false)?;
    Ok((normalized, report))
}

/// Undo [`normalize_directions`]: every inference relation whose text ends in
/// `suffix` gets its original orientation and text back.
pub fn restore_orientation(nodeset: &Nodeset, suffix: &str) -> Result<Nodeset> {
    let marked: Vec<Relation> = pattern::relations(nodeset, RelationQuery::INFERENCE, true)
        .filter(|rel| nodeset.node(rel.relation).is_some_and(|n| n.text.ends_with(suffix)))
        .collect();
    reverse_relations(nodeset, &marked, suffix, true)
}
