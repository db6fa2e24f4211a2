//! # Relation Pattern Matcher
//!
//! Extracts typed n-ary relations (sources → relation node → targets) from the
//! raw nodes and edges of a [`Nodeset`].
//!
//! Each concrete relation kind has one entry in a lookup table of allowed
//! relation-node types, source types, target types and cardinality limits.
//! The pseudo-types `S` and `YA` are unions: a query for them iterates the
//! member kinds one after the other.

use std::str::FromStr;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::model::{Edge, Node, NodeId, NodeIndex, NodeKind, Nodeset, Relation};
use crate::{Error, Result};

// ============================================================================
// Pattern table
// ============================================================================

/// One concrete relation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// L → TA → L
    Transition,
    /// I+ → RA → I+
    Inference,
    /// I+ → CA → I
    Conflict,
    /// I+ → MA → I
    Rephrase,
    /// L → YA → I
    YaLocutionToProposition,
    /// TA → YA → {RA, CA, MA}
    YaTransitionToSegment,
    /// TA → YA → I
    YaTransitionToProposition,
    /// L → YA → L (reported speech)
    YaLocutionToLocution,
}

/// Endpoint-type constraints and cardinality limits of a [`RelationKind`].
/// `None` means unbounded.
#[derive(Debug, Clone, Copy)]
pub struct RelationPattern {
    pub node_kinds: &'static [NodeKind],
    pub source_kinds: &'static [NodeKind],
    pub target_kinds: &'static [NodeKind],
    pub max_sources: Option<usize>,
    pub max_targets: Option<usize>,
}

const L: NodeKind = NodeKind::Locution;
const I: NodeKind = NodeKind::Proposition;
const TA: NodeKind = NodeKind::Transition;
const YA: NodeKind = NodeKind::Illocution;

impl RelationKind {
    pub const ALL: [RelationKind; 8] = [
        RelationKind::Transition,
        RelationKind::Inference,
        RelationKind::Conflict,
        RelationKind::Rephrase,
        RelationKind::YaLocutionToProposition,
        RelationKind::YaTransitionToSegment,
        RelationKind::YaTransitionToProposition,
        RelationKind::YaLocutionToLocution,
    ];

    pub fn pattern(self) -> RelationPattern {
        match self {
            RelationKind::Transition => RelationPattern {
                node_kinds: &[TA],
                source_kinds: &[L],
                target_kinds: &[L],
                max_sources: Some(1),
                max_targets: Some(1),
            },
            // Reversed inference swaps sources and targets, so neither side
            // can be bounded.
            RelationKind::Inference => RelationPattern {
                node_kinds: &[NodeKind::Inference],
                source_kinds: &[I],
                target_kinds: &[I],
                max_sources: None,
                max_targets: None,
            },
            RelationKind::Conflict => RelationPattern {
                node_kinds: &[NodeKind::Conflict],
                source_kinds: &[I],
                target_kinds: &[I],
                max_sources: None,
                max_targets: Some(1),
            },
            RelationKind::Rephrase => RelationPattern {
                node_kinds: &[NodeKind::Rephrase],
                source_kinds: &[I],
                target_kinds: &[I],
                max_sources: None,
                max_targets: Some(1),
            },
            RelationKind::YaLocutionToProposition => RelationPattern {
                node_kinds: &[YA],
                source_kinds: &[L],
                target_kinds: &[I],
                max_sources: Some(1),
                max_targets: Some(1),
            },
            RelationKind::YaTransitionToSegment => RelationPattern {
                node_kinds: &[YA],
                source_kinds: &[TA],
                target_kinds: &NodeKind::SEGMENT,
                max_sources: Some(1),
                max_targets: Some(1),
            },
            RelationKind::YaTransitionToProposition => RelationPattern {
                node_kinds: &[YA],
                source_kinds: &[TA],
                target_kinds: &[I],
                max_sources: Some(1),
                max_targets: Some(1),
            },
            RelationKind::YaLocutionToLocution => RelationPattern {
                node_kinds: &[YA],
                source_kinds: &[L],
                target_kinds: &[L],
                max_sources: Some(1),
                max_targets: Some(1),
            },
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            RelationKind::Transition => "TA",
            RelationKind::Inference => "RA",
            RelationKind::Conflict => "CA",
            RelationKind::Rephrase => "MA",
            RelationKind::YaLocutionToProposition => "YA-L2I",
            RelationKind::YaTransitionToSegment => "YA-TA2S",
            RelationKind::YaTransitionToProposition => "YA-TA2I",
            RelationKind::YaLocutionToLocution => "YA-L2L",
        }
    }

    fn as_slice(self) -> &'static [RelationKind] {
        match self {
            RelationKind::Transition => &[RelationKind::Transition],
            RelationKind::Inference => &[RelationKind::Inference],
            RelationKind::Conflict => &[RelationKind::Conflict],
            RelationKind::Rephrase => &[RelationKind::Rephrase],
            RelationKind::YaLocutionToProposition => &[RelationKind::YaLocutionToProposition],
            RelationKind::YaTransitionToSegment => &[RelationKind::YaTransitionToSegment],
            RelationKind::YaTransitionToProposition => &[RelationKind::YaTransitionToProposition],
            RelationKind::YaLocutionToLocution => &[RelationKind::YaLocutionToLocution],
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// What to match: one concrete kind or one of the union pseudo-types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationQuery {
    Kind(RelationKind),
    /// `S`: inference, conflict and rephrase.
    Segment,
    /// `YA`: all four illocutionary patterns.
    Illocution,
}

impl RelationQuery {
    pub const TRANSITION: RelationQuery = RelationQuery::Kind(RelationKind::Transition);
    pub const INFERENCE: RelationQuery = RelationQuery::Kind(RelationKind::Inference);

    /// The concrete kinds this query iterates, in order.
    pub fn members(self) -> &'static [RelationKind] {
        match self {
            RelationQuery::Kind(kind) => kind.as_slice(),
            RelationQuery::Segment => &[
                RelationKind::Inference,
                RelationKind::Conflict,
                RelationKind::Rephrase,
            ],
            RelationQuery::Illocution => &[
                RelationKind::YaLocutionToProposition,
                RelationKind::YaTransitionToSegment,
                RelationKind::YaTransitionToProposition,
                RelationKind::YaLocutionToLocution,
            ],
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            RelationQuery::Kind(kind) => kind.tag(),
            RelationQuery::Segment => "S",
            RelationQuery::Illocution => "YA",
        }
    }
}

impl From<RelationKind> for RelationQuery {
    fn from(kind: RelationKind) -> Self {
        RelationQuery::Kind(kind)
    }
}

impl FromStr for RelationQuery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "S" => Ok(RelationQuery::Segment),
            "YA" => Ok(RelationQuery::Illocution),
            other => RelationKind::ALL
                .iter()
                .find(|k| k.tag() == other)
                .map(|&k| RelationQuery::Kind(k))
                .ok_or_else(|| Error::Config(format!("unknown relation type `{other}`"))),
        }
    }
}

impl std::fmt::Display for RelationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Adjacency
// ============================================================================

type Neighbours = SmallVec<[NodeId; 4]>;

/// Successor and predecessor lists for one stage.
///
/// Built from the edge list each time it is needed: edges change between
/// stages (direction swaps, removals), so this is never cached.
#[derive(Debug, Default)]
pub struct Adjacency {
    outgoing: HashMap<NodeId, Neighbours>,
    incoming: HashMap<NodeId, Neighbours>,
}

impl Adjacency {
    /// Duplicate edges collapse into one neighbour entry.
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut adjacency = Self::default();
        for edge in edges {
            let out = adjacency.outgoing.entry(edge.from).or_default();
            if !out.contains(&edge.to) {
                out.push(edge.to);
            }
            let inc = adjacency.incoming.entry(edge.to).or_default();
            if !inc.contains(&edge.from) {
                inc.push(edge.from);
            }
        }
        adjacency
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.incoming.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Lazy sequence of relations matching one query.
///
/// Finite and not restartable; call [`relations`] again for a fresh pass.
pub struct Relations<'a> {
    nodes: &'a [Node],
    index: NodeIndex<'a>,
    adjacency: Adjacency,
    members: &'static [RelationKind],
    member: usize,
    position: usize,
    enforce_cardinality: bool,
}

impl<'a> Relations<'a> {
    fn arguments(&self, candidates: &[NodeId], allowed: &[NodeKind]) -> SmallVec<[NodeId; 2]> {
        candidates
            .iter()
            .copied()
            .filter(|id| {
                self.index
                    .get(id)
                    .and_then(|n| n.kind())
                    .is_some_and(|k| allowed.contains(&k))
            })
            .collect()
    }

    fn materialize(&self, relation: NodeId, pattern: &RelationPattern) -> Option<Relation> {
        let sources = self.arguments(self.adjacency.predecessors(relation), pattern.source_kinds);
        let targets = self.arguments(self.adjacency.successors(relation), pattern.target_kinds);
        if self.enforce_cardinality {
            if sources.is_empty() || targets.is_empty() {
                return None;
            }
            if pattern.max_sources.is_some_and(|max| sources.len() > max)
                || pattern.max_targets.is_some_and(|max| targets.len() > max)
            {
                return None;
            }
        }
        Some(Relation { sources, targets, relation })
    }
}

impl Iterator for Relations<'_> {
    type Item = Relation;

    fn next(&mut self) -> Option<Relation> {
        let nodes = self.nodes;
        while let Some(&kind) = self.members.get(self.member) {
            let pattern = kind.pattern();
            while let Some(node) = nodes.get(self.position) {
                self.position += 1;
                if !node.kind().is_some_and(|k| pattern.node_kinds.contains(&k)) {
                    continue;
                }
                if let Some(relation) = self.materialize(node.id, &pattern) {
                    return Some(relation);
                }
            }
            self.member += 1;
            self.position = 0;
        }
        None
    }
}

/// Match `query` against `nodeset`.
///
/// With `enforce_cardinality`, a candidate with an empty side or more
/// arguments than its pattern allows is dropped. Edge endpoints missing from
/// the node list never match.
pub fn relations(nodeset: &Nodeset, query: RelationQuery, enforce_cardinality: bool) -> Relations<'_> {
    Relations {
        nodes: &nodeset.nodes,
        index: nodeset.node_index(),
        adjacency: Adjacency::from_edges(&nodeset.edges),
        members: query.members(),
        member: 0,
        position: 0,
        enforce_cardinality,
    }
}

/// Like [`relations`], but a relation node matched by several union members
/// is reported once, its arguments merged in first-seen order.
pub fn merged_relations(nodeset: &Nodeset, query: RelationQuery, enforce_cardinality: bool) -> Vec<Relation> {
    let mut merged: Vec<Relation> = Vec::new();
    let mut position: HashMap<NodeId, usize> = HashMap::new();
    for rel in relations(nodeset, query, enforce_cardinality) {
        match position.get(&rel.relation) {
            Some(&idx) => {
                let slot = &mut merged[idx];
                for src in rel.sources {
                    if !slot.sources.contains(&src) {
                        slot.sources.push(src);
                    }
                }
                for trg in rel.targets {
                    if !slot.targets.contains(&trg) {
                        slot.targets.push(trg);
                    }
                }
            }
            None => {
                position.insert(rel.relation, merged.len());
                merged.push(rel);
            }
        }
    }
    merged
}

/// All `(source, target, relation)` triples with `source → relation → target`,
/// `source` in `sources` and `target` in `targets`. Ordered by `sources`, then
/// edge order; duplicates removed.
pub fn two_hop_connections(
    sources: &[NodeId],
    targets: &HashSet<NodeId>,
    edges: &[Edge],
) -> Vec<(NodeId, NodeId, NodeId)> {
    let adjacency = Adjacency::from_edges(edges);
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for &src in sources {
        for &rel in adjacency.successors(src) {
            for &trg in adjacency.successors(rel) {
                if targets.contains(&trg) && seen.insert((src, trg, rel)) {
                    result.push((src, trg, rel));
                }
            }
        }
    }
    result
}
