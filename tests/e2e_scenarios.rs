//! End-to-end direction scenarios: a transition that agrees with the
//! inference it anchors, and one stored the other way round.

mod common;

use argmap_rs::direction::{self, Direction};
use argmap_rs::document::{LAYER_S, LAYER_YA_S2TA, NaryRelation};
use argmap_rs::{DocumentProjector, Error, NodeId, Pipeline, PipelineConfig, filter, validate_document};
use pretty_assertions::assert_eq;

use common::{L1_TEXT, L2_TEXT, L3_TEXT, contradictory_debate, debate};

const SUFFIX: &str = "-rev";

fn s_relation(label: &str, source: usize, target: usize) -> NaryRelation {
    NaryRelation {
        label: label.into(),
        roles: vec!["source".into(), "target".into()],
        arguments: vec![source, target],
    }
}

// ============================================================================
// Forward transition
// ============================================================================

#[test]
fn test_forward_inference_is_left_alone() {
    let nodeset = debate(false);
    let report = direction::resolve_directions(&nodeset).unwrap();
    assert_eq!(report.direction(NodeId(20)), Some(Direction::Forward));

    let (normalized, _) = direction::normalize_directions(&nodeset, SUFFIX).unwrap();
    assert_eq!(normalized, nodeset);
}

#[test]
fn test_forward_projection() {
    let cleaned = filter::cleanup(&debate(false), true);
    let doc = DocumentProjector::default().project(&cleaned).unwrap();

    assert_eq!(doc.text, format!("{L1_TEXT} {L2_TEXT} {L3_TEXT}"));
    assert_eq!(doc.spans.len(), 3);
    assert_eq!(doc.layer(LAYER_S), &[s_relation("S:Default Inference", 0, 1)]);
    validate_document(&cleaned, &doc).unwrap();
}

#[test]
fn test_forward_with_gold_labels() {
    let pipeline = Pipeline::new(PipelineConfig::with_gold()).unwrap();
    let prepared = pipeline.prepare(&debate(false)).unwrap();
    let directions = prepared.directions.as_ref().unwrap();
    assert_eq!(directions.direction(NodeId(20)), Some(Direction::Forward));

    let doc = pipeline.project(&prepared.nodeset).unwrap();
    assert_eq!(doc.layer(LAYER_S), &[s_relation("S:Default Inference", 0, 1)]);
    assert_eq!(doc.layer(LAYER_YA_S2TA), &[s_relation("YA-S2TA:Arguing", 0, 1)]);
    validate_document(&prepared.nodeset, &doc).unwrap();
}

// ============================================================================
// Reversed transition
// ============================================================================

#[test]
fn test_reversed_inference_is_flipped_and_restored() {
    let nodeset = debate(true);
    let (normalized, report) = direction::normalize_directions(&nodeset, SUFFIX).unwrap();
    assert_eq!(report.direction(NodeId(20)), Some(Direction::Reversed));

    assert_eq!(normalized.node(NodeId(20)).unwrap().text, "Default Inference-rev");
    assert!(normalized.contains_edge(NodeId(12), NodeId(20)));
    assert!(normalized.contains_edge(NodeId(20), NodeId(11)));
    assert!(!normalized.contains_edge(NodeId(11), NodeId(20)));

    let restored = direction::restore_orientation(&normalized, SUFFIX).unwrap();
    assert_eq!(restored, nodeset);
}

#[test]
fn test_reversed_with_gold_labels_keeps_original_orientation() {
    let pipeline = Pipeline::new(PipelineConfig::with_gold()).unwrap();
    let prepared = pipeline.prepare(&debate(true)).unwrap();
    let directions = prepared.directions.as_ref().unwrap();
    assert_eq!(directions.direction(NodeId(20)), Some(Direction::Reversed));

    // document order is L2, L1, L3: TA4 now leads from L2
    let doc = pipeline.project(&prepared.nodeset).unwrap();
    assert_eq!(doc.text, format!("{L2_TEXT} {L1_TEXT} {L3_TEXT}"));
    assert_eq!(doc.layer(LAYER_S), &[s_relation("S:Default Inference", 1, 0)]);
    assert_eq!(doc.layer(LAYER_YA_S2TA), &[s_relation("YA-S2TA:Arguing", 0, 1)]);
    validate_document(&prepared.nodeset, &doc).unwrap();
}

// ============================================================================
// Contradicting transitions
// ============================================================================

#[test]
fn test_contradicting_transitions_fail() {
    let err = direction::resolve_directions(&contradictory_debate()).unwrap_err();
    assert!(matches!(err, Error::AmbiguousDirection { relation } if relation == NodeId(20)));

    let pipeline = Pipeline::new(PipelineConfig::with_gold()).unwrap();
    assert!(matches!(
        pipeline.prepare(&contradictory_debate()),
        Err(Error::AmbiguousDirection { .. })
    ));
}

#[test]
fn test_contradiction_is_irrelevant_without_gold() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    assert!(pipeline.prepare(&contradictory_debate()).is_ok());
}

#[test]
fn test_resolver_is_deterministic() {
    for nodeset in [debate(false), debate(true)] {
        let first = direction::resolve_directions(&nodeset).unwrap();
        let second = direction::resolve_directions(&nodeset).unwrap();
        assert_eq!(first, second);
    }
}
