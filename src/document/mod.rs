//! # Document Projector
//!
//! Turns a prepared nodeset into a text document: locution texts joined in
//! document order, one span per locution, and n-ary relations over those
//! spans in three layers:
//!
//! | Layer | Source | Label | Arguments |
//! |---|---|---|---|
//! | `ya_i2l_nodes` | `L → YA → I` | `YA-I2L:<text>` | the locution |
//! | `s_nodes` | `I → S → I` | `S:<text>` | anchor locutions of sources, then targets |
//! | `ya_s2ta_nodes` | `TA → YA → S` | `YA-S2TA:<text>` | the TA's source and target locutions |
//!
//! Every originating node id stays in [`DocumentMetadata`], so the graph
//! relations can be recovered from the document.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hierarchy::{LocutionOrder, order_locutions};
use crate::model::{NodeId, NodeKind, Nodeset, Relation};
use crate::pattern::{self, Adjacency, RelationKind, RelationQuery};
use crate::{Error, Result};

pub const LAYER_YA_I2L: &str = "ya_i2l_nodes";
pub const LAYER_S: &str = "s_nodes";
pub const LAYER_YA_S2TA: &str = "ya_s2ta_nodes";

pub const ROLE_SOURCE: &str = "source";
pub const ROLE_TARGET: &str = "target";

// ============================================================================
// Document types
// ============================================================================

/// Byte range into [`Document::text`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// A relation over spans; `roles[i]` is the role of span `arguments[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaryRelation {
    pub label: String,
    pub roles: Vec<String>,
    pub arguments: Vec<usize>,
}

impl NaryRelation {
    fn new(label: String, sources: Vec<usize>, targets: Vec<usize>) -> Self {
        let roles = std::iter::repeat_n(ROLE_SOURCE.to_string(), sources.len())
            .chain(std::iter::repeat_n(ROLE_TARGET.to_string(), targets.len()))
            .collect();
        let mut arguments = sources;
        arguments.extend(targets);
        Self { label, roles, arguments }
    }

    pub fn arguments_with_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.roles
            .iter()
            .zip(&self.arguments)
            .filter(move |(r, _)| r.as_str() == role)
            .map(|(_, &a)| a)
    }
}

/// Node and relation ids the document was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// One per span, in span order.
    pub l_node_ids: Vec<NodeId>,
    pub i_node_ids: Vec<NodeId>,
    pub ta_node_ids: Vec<NodeId>,
    pub ta_relations: Vec<Relation>,
    /// One per entry of the matching layer, in layer order.
    pub ya_i2l_relations: Vec<Relation>,
    pub s_relations: Vec<Relation>,
    pub ya_s2ta_relations: Vec<Relation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub spans: Vec<LabeledSpan>,
    pub relations: BTreeMap<String, Vec<NaryRelation>>,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn layer(&self, name: &str) -> &[NaryRelation] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Text covered by span `index`.
    pub fn span_text(&self, index: usize) -> Option<&str> {
        let span = self.spans.get(index)?;
        self.text.get(span.start..span.end)
    }

    /// The metadata relations of all layers, each verified against the span
    /// arguments of its projected relation.
    pub fn recover_relations(&self) -> Result<Vec<Relation>> {
        if self.metadata.l_node_ids.len() != self.spans.len() {
            return Err(Error::Validation(format!(
                "{} spans but {} locution ids",
                self.spans.len(),
                self.metadata.l_node_ids.len()
            )));
        }
        let span_of: HashMap<NodeId, usize> = self
            .metadata
            .l_node_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let anchor_of = first_anchor_per_target(&self.metadata.ya_i2l_relations);
        let transitions: HashMap<NodeId, &Relation> =
            self.metadata.ta_relations.iter().map(|r| (r.relation, r)).collect();

        let mut recovered = Vec::new();

        self.check_layer(LAYER_YA_I2L, &self.metadata.ya_i2l_relations, |rel| {
            Some((spans_of(&rel.sources, &span_of)?, Vec::new()))
        })?;
        recovered.extend(self.metadata.ya_i2l_relations.iter().cloned());

        self.check_layer(LAYER_S, &self.metadata.s_relations, |rel| {
            let sources: Option<Vec<NodeId>> = rel.sources.iter().map(|i| anchor_of.get(i).copied()).collect();
            let targets: Option<Vec<NodeId>> = rel.targets.iter().map(|i| anchor_of.get(i).copied()).collect();
            Some((spans_of(&sources?, &span_of)?, spans_of(&targets?, &span_of)?))
        })?;
        recovered.extend(self.metadata.s_relations.iter().cloned());

        self.check_layer(LAYER_YA_S2TA, &self.metadata.ya_s2ta_relations, |rel| {
            let ta = transitions.get(&rel.single_source()?)?;
            Some((spans_of(&ta.sources, &span_of)?, spans_of(&ta.targets, &span_of)?))
        })?;
        recovered.extend(self.metadata.ya_s2ta_relations.iter().cloned());

        Ok(recovered)
    }

    fn check_layer(
        &self,
        layer: &str,
        relations: &[Relation],
        expected: impl Fn(&Relation) -> Option<(Vec<usize>, Vec<usize>)>,
    ) -> Result<()> {
        let projected = self.layer(layer);
        if projected.len() != relations.len() {
            return Err(Error::Validation(format!(
                "layer {layer}: {} relations but {} metadata entries",
                projected.len(),
                relations.len()
            )));
        }
        for (nary, rel) in projected.iter().zip(relations) {
            let (sources, targets) = expected(rel).ok_or_else(|| {
                Error::Validation(format!("layer {layer}: cannot resolve spans of relation {}", rel.relation))
            })?;
            let got_sources: Vec<usize> = nary.arguments_with_role(ROLE_SOURCE).collect();
            let got_targets: Vec<usize> = nary.arguments_with_role(ROLE_TARGET).collect();
            if got_sources != sources || got_targets != targets {
                return Err(Error::Validation(format!(
                    "layer {layer}: relation {} has arguments {:?}, expected {:?} -> {:?}",
                    rel.relation, nary.arguments, sources, targets
                )));
            }
        }
        Ok(())
    }
}

fn spans_of(ids: &[NodeId], span_of: &HashMap<NodeId, usize>) -> Option<Vec<usize>> {
    ids.iter().map(|id| span_of.get(id).copied()).collect()
}

/// Proposition → anchoring locution. The first YA link wins.
fn first_anchor_per_target(ya_relations: &[Relation]) -> HashMap<NodeId, NodeId> {
    let mut anchors = HashMap::new();
    for rel in ya_relations {
        if let (Some(src), Some(trg)) = (rel.single_source(), rel.single_target()) {
            anchors.entry(trg).or_insert(src);
        }
    }
    anchors
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Projection
// ============================================================================

/// Builds [`Document`]s from nodesets.
#[derive(Debug, Clone)]
pub struct DocumentProjector {
    separator: String,
    order: LocutionOrder,
}

impl Default for DocumentProjector {
    fn default() -> Self {
        Self { separator: " ".into(), order: LocutionOrder::Hierarchy }
    }
}

impl DocumentProjector {
    pub fn new(separator: impl Into<String>, order: LocutionOrder) -> Self {
        Self { separator: separator.into(), order }
    }

    pub fn project(&self, nodeset: &Nodeset) -> Result<Document> {
        self.project_in_order(nodeset, &order_locutions(nodeset, self.order))
    }

    /// Project with a precomputed locution order. Locutions missing from
    /// `order` get no span.
    pub fn project_in_order(&self, nodeset: &Nodeset, order: &[NodeId]) -> Result<Document> {
        let index = nodeset.node_index();
        let mut doc = Document::default();

        // 1. text and locution spans
        let mut span_of: HashMap<NodeId, usize> = HashMap::new();
        for &id in order {
            let node = index
                .get(&id)
                .ok_or_else(|| Error::NotFound(format!("locution {id}")))?;
            if !doc.text.is_empty() {
                doc.text.push_str(&self.separator);
            }
            let text = collapse_whitespace(&node.text);
            let start = doc.text.len();
            doc.text.push_str(&text);
            span_of.insert(id, doc.spans.len());
            doc.spans.push(LabeledSpan { start, end: doc.text.len(), label: node.node_type.clone() });
            doc.metadata.l_node_ids.push(id);
        }
        let text_of = |id: NodeId| index.get(&id).map(|&n| n.text.as_str()).unwrap_or_default();

        // 2. locution ↔ proposition links
        let mut ya_layer = Vec::new();
        let mut anchor_of: HashMap<NodeId, NodeId> = HashMap::new();
        for rel in pattern::relations(nodeset, RelationKind::YaLocutionToProposition.into(), true) {
            let (Some(src), Some(trg)) = (rel.single_source(), rel.single_target()) else {
                continue;
            };
            let Some(&span) = span_of.get(&src) else {
                warn!(relation = %rel.relation, "illocution source is not a projected locution, skipped");
                continue;
            };
            if anchor_of.contains_key(&trg) {
                warn!(relation = %rel.relation, proposition = %trg, "proposition has several anchoring locutions");
            } else {
                anchor_of.insert(trg, src);
            }
            ya_layer.push(NaryRelation::new(format!("YA-I2L:{}", text_of(rel.relation)), vec![span], vec![]));
            doc.metadata.ya_i2l_relations.push(rel);
        }

        // 3. segment relations between the anchoring locutions
        let mut s_layer = Vec::new();
        for rel in pattern::relations(nodeset, RelationQuery::Segment, true) {
            let project = |ids: &[NodeId]| -> Option<Vec<usize>> {
                ids.iter()
                    .map(|i| anchor_of.get(i).and_then(|l| span_of.get(l)).copied())
                    .collect()
            };
            let (Some(sources), Some(targets)) = (project(rel.sources.as_slice()), project(rel.targets.as_slice())) else {
                warn!(relation = %rel.relation, "segment argument without anchoring locution, skipped");
                continue;
            };
            s_layer.push(NaryRelation::new(format!("S:{}", text_of(rel.relation)), sources, targets));
            doc.metadata.s_relations.push(rel);
        }

        // 4. segment ↔ transition links, over the TA's locutions
        let ta_relations: Vec<Relation> = pattern::relations(nodeset, RelationQuery::TRANSITION, true).collect();
        let transitions: HashMap<NodeId, &Relation> = ta_relations.iter().map(|r| (r.relation, r)).collect();
        let mut ta_layer = Vec::new();
        let mut ta_metadata = Vec::new();
        for rel in pattern::relations(nodeset, RelationKind::YaTransitionToSegment.into(), true) {
            // an S node may be anchored in something other than a TA
            let Some(ta) = rel.single_source().and_then(|src| transitions.get(&src)) else {
                continue;
            };
            let (Some(sources), Some(targets)) = (spans_of(&ta.sources, &span_of), spans_of(&ta.targets, &span_of))
            else {
                continue;
            };
            ta_layer.push(NaryRelation::new(format!("YA-S2TA:{}", text_of(rel.relation)), sources, targets));
            ta_metadata.push(rel);
        }
        drop(transitions);
        doc.metadata.ta_relations = ta_relations;
        doc.metadata.ya_s2ta_relations = ta_metadata;

        doc.metadata.i_node_ids = nodeset.node_ids_of(NodeKind::Proposition);
        doc.metadata.ta_node_ids = nodeset.node_ids_of(NodeKind::Transition);

        debug!(
            spans = doc.spans.len(),
            ya_i2l = ya_layer.len(),
            s = s_layer.len(),
            ya_s2ta = ta_layer.len(),
            "projected document"
        );
        doc.relations.insert(LAYER_YA_I2L.to_string(), ya_layer);
        doc.relations.insert(LAYER_S.to_string(), s_layer);
        doc.relations.insert(LAYER_YA_S2TA.to_string(), ta_layer);
        Ok(doc)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check that `document` covers `nodeset`:
///
/// - every locution is a span with the same (whitespace-collapsed) text
/// - every TA id is retained
/// - every `L → YA → I`, `TA → YA → S` and segment relation node with at
///   least one allowed source and target is in the metadata with all of them
pub fn validate_document(nodeset: &Nodeset, document: &Document) -> Result<()> {
    let span_of: HashMap<NodeId, usize> = document
        .metadata
        .l_node_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    for node in nodeset.nodes.iter().filter(|n| n.is(NodeKind::Locution)) {
        let span = span_of
            .get(&node.id)
            .ok_or_else(|| Error::Validation(format!("locution {} missing from document", node.id)))?;
        let expected = collapse_whitespace(&node.text);
        if document.span_text(*span) != Some(expected.as_str()) {
            return Err(Error::Validation(format!("locution {} text differs in document", node.id)));
        }
    }

    let kept_ta: HashSet<NodeId> = document.metadata.ta_node_ids.iter().copied().collect();
    if let Some(missing) = nodeset.node_ids_of(NodeKind::Transition).into_iter().find(|id| !kept_ta.contains(id)) {
        return Err(Error::Validation(format!("transition {missing} missing from document")));
    }

    let adjacency = Adjacency::from_edges(&nodeset.edges);
    let meta = &document.metadata;
    check_family(nodeset, &adjacency, RelationKind::YaLocutionToProposition, &meta.ya_i2l_relations)?;
    check_family(nodeset, &adjacency, RelationKind::YaTransitionToSegment, &meta.ya_s2ta_relations)?;
    for kind in [RelationKind::Inference, RelationKind::Conflict, RelationKind::Rephrase] {
        check_family(nodeset, &adjacency, kind, &meta.s_relations)?;
    }
    Ok(())
}

fn check_family(nodeset: &Nodeset, adjacency: &Adjacency, kind: RelationKind, recorded: &[Relation]) -> Result<()> {
    let pattern = kind.pattern();
    let index = nodeset.node_index();
    let has_kind = |id: NodeId, allowed: &[NodeKind]| {
        index
            .get(&id)
            .and_then(|n| n.kind())
            .is_some_and(|k| allowed.contains(&k))
    };
    let recorded: HashMap<NodeId, &Relation> = recorded.iter().map(|r| (r.relation, r)).collect();

    for node in &nodeset.nodes {
        if !node.kind().is_some_and(|k| pattern.node_kinds.contains(&k)) {
            continue;
        }
        let sources: Vec<NodeId> = adjacency
            .predecessors(node.id)
            .iter()
            .filter(|&&id| has_kind(id, pattern.source_kinds))
            .copied()
            .collect();
        let targets: Vec<NodeId> = adjacency
            .successors(node.id)
            .iter()
            .filter(|&&id| has_kind(id, pattern.target_kinds))
            .copied()
            .collect();
        if sources.is_empty() || targets.is_empty() {
            continue;
        }
        let rel = recorded.get(&node.id).ok_or_else(|| {
            Error::Validation(format!("{} relation {} missing from document", kind.tag(), node.id))
        })?;
        if let Some(src) = sources.iter().find(|s| !rel.sources.contains(s)) {
            return Err(Error::Validation(format!("source {src} of relation {} missing", node.id)));
        }
        if let Some(trg) = targets.iter().find(|t| !rel.targets.contains(t)) {
            return Err(Error::Validation(format!("target {trg} of relation {} missing", node.id)));
        }
    }
    Ok(())
}
