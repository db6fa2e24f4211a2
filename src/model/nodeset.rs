//! Nodeset: the raw annotation graph of one dialogue excerpt.

use chrono::{DateTime, NaiveDateTime};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{Edge, EdgeId, Node, NodeId, NodeKind};
use crate::Result;

/// Supplementary speaker/ordering record for a locution node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locution {
    #[serde(rename = "nodeID")]
    pub node_id: NodeId,
    #[serde(rename = "personID", default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Locution {
    pub fn new(node_id: NodeId) -> Self {
        Self { node_id, person_id: None, timestamp: None }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.timestamp.as_deref()?)
    }
}

/// Parse an annotation timestamp. Accepts RFC 3339 and the ISO forms found in
/// the corpus (`2020-05-28 21:13:49`, `2020-05-28T21:13:49.123`).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Id → node lookup, built on demand for one stage.
pub type NodeIndex<'a> = HashMap<NodeId, &'a Node>;

/// A complete argument-map graph: nodes, edges and locution metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nodeset {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub locutions: Vec<Locution>,
}

impl Nodeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Builder helpers
    // ========================================================================

    pub fn with_node(mut self, id: u64, node_type: &str, text: &str) -> Self {
        self.nodes.push(Node::new(NodeId(id), node_type, text));
        self
    }

    pub fn with_edge(mut self, from: u64, to: u64) -> Self {
        self.edges.push(Edge::new(NodeId(from), NodeId(to)));
        self
    }

    /// Add the edges `source → relation` for every source and
    /// `relation → target` for every target.
    pub fn with_relation(mut self, sources: &[u64], relation: u64, targets: &[u64]) -> Self {
        for &src in sources {
            self.edges.push(Edge::new(NodeId(src), NodeId(relation)));
        }
        for &trg in targets {
            self.edges.push(Edge::new(NodeId(relation), NodeId(trg)));
        }
        self
    }

    pub fn with_locution(mut self, locution: Locution) -> Self {
        self.locutions.push(locution);
        self
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn node_index(&self) -> NodeIndex<'_> {
        self.nodes.iter().map(|n| (n.id, n)).collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Ids of all nodes of the given kind, in nodeset order.
    pub fn node_ids_of(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.is(kind)).map(|n| n.id).collect()
    }

    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|n| n.id).max()
    }

    pub fn max_edge_id(&self) -> Option<EdgeId> {
        self.edges.iter().filter_map(|e| e.id).max()
    }

    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            {"nodeID": "1", "type": "L", "text": "Alice : taxes are too high"},
            {"nodeID": "2", "type": "I", "text": "taxes are too high"},
            {"nodeID": "3", "type": "YA", "text": "Asserting"}
        ],
        "edges": [
            {"fromID": "1", "toID": "3", "edgeID": "10"},
            {"fromID": "3", "toID": "2", "edgeID": "11"}
        ],
        "locutions": [
            {"nodeID": "1", "personID": "4", "timestamp": "2020-05-28 21:13:49"}
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let nodeset = Nodeset::from_json(SAMPLE).unwrap();
        assert_eq!(nodeset.nodes.len(), 3);
        assert_eq!(nodeset.edges.len(), 2);
        assert_eq!(nodeset.max_node_id(), Some(NodeId(3)));
        assert_eq!(nodeset.max_edge_id(), Some(EdgeId(11)));
        assert_eq!(nodeset.node_ids_of(NodeKind::Proposition), vec![NodeId(2)]);
    }

    #[test]
    fn test_locutions_are_optional() {
        let nodeset = Nodeset::from_json(r#"{"nodes": [], "edges": []}"#).unwrap();
        assert!(nodeset.locutions.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let nodeset = Nodeset::from_json(SAMPLE).unwrap();
        let again = Nodeset::from_json(&nodeset.to_json().unwrap()).unwrap();
        assert_eq!(nodeset, again);
    }

    #[test]
    fn test_timestamp_formats() {
        let plain = Locution::new(NodeId(1)).with_timestamp("2020-05-28 21:13:49");
        let iso = Locution::new(NodeId(1)).with_timestamp("2020-05-28T21:13:49.500");
        let rfc = Locution::new(NodeId(1)).with_timestamp("2020-05-28T21:13:49Z");
        assert!(plain.parsed_timestamp().is_some());
        assert!(iso.parsed_timestamp().unwrap() > plain.parsed_timestamp().unwrap());
        assert_eq!(rfc.parsed_timestamp(), plain.parsed_timestamp());
        assert_eq!(Locution::new(NodeId(1)).with_timestamp("yesterday").parsed_timestamp(), None);
    }

    #[test]
    fn test_builder_relation_edges() {
        let nodeset = Nodeset::new()
            .with_node(1, "I", "a")
            .with_node(2, "I", "b")
            .with_node(3, "RA", "Default Inference")
            .with_relation(&[1], 3, &[2]);
        assert!(nodeset.contains_edge(NodeId(1), NodeId(3)));
        assert!(nodeset.contains_edge(NodeId(3), NodeId(2)));
    }
}
