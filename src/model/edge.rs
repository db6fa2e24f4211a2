//! Edge (directed `fromID → toID` pair) in the argument map.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use super::NodeId;

/// Opaque edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u64);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EdgeId {
    fn from(value: u64) -> Self {
        EdgeId(value)
    }
}

impl Serialize for EdgeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EdgeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        super::deserialize_numeric_id(deserializer).map(EdgeId)
    }
}

/// A directed edge. Edges carry no type: their meaning comes from the types
/// of the endpoints and of the edges sharing the same relation node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "fromID")]
    pub from: NodeId,
    #[serde(rename = "toID")]
    pub to: NodeId,
    #[serde(rename = "edgeID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to, id: None }
    }

    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.from, self.to)
    }

    /// Flip the edge in place.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

/// Direction-independent key for an edge, used to remember which edges have
/// already been flipped.
pub fn unordered_pair(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}
