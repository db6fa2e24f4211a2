//! Node in the argument map.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque node identifier.
///
/// Nodesets store ids as decimal strings (`"nodeID": "712345"`). The numeric
/// value matters because synthetic nodes are numbered past the current maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        super::deserialize_numeric_id(deserializer).map(NodeId)
    }
}

/// The node types recognised by the relation patterns.
///
/// Raw nodesets carry arbitrary type strings; anything not listed here is kept
/// verbatim on the [`Node`] and simply never matches a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Locution: a speaker's utterance.
    #[serde(rename = "L")]
    Locution,
    /// Proposition: a normalised claim.
    #[serde(rename = "I")]
    Proposition,
    /// Transition anchor between two locutions.
    #[serde(rename = "TA")]
    Transition,
    /// Illocutionary anchor.
    #[serde(rename = "YA")]
    Illocution,
    /// Inference (S-family).
    #[serde(rename = "RA")]
    Inference,
    /// Conflict (S-family).
    #[serde(rename = "CA")]
    Conflict,
    /// Rephrase (S-family).
    #[serde(rename = "MA")]
    Rephrase,
}

impl NodeKind {
    pub const SEGMENT: [NodeKind; 3] = [NodeKind::Inference, NodeKind::Conflict, NodeKind::Rephrase];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "L" => Some(NodeKind::Locution),
            "I" => Some(NodeKind::Proposition),
            "TA" => Some(NodeKind::Transition),
            "YA" => Some(NodeKind::Illocution),
            "RA" => Some(NodeKind::Inference),
            "CA" => Some(NodeKind::Conflict),
            "MA" => Some(NodeKind::Rephrase),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Locution => "L",
            NodeKind::Proposition => "I",
            NodeKind::Transition => "TA",
            NodeKind::Illocution => "YA",
            NodeKind::Inference => "RA",
            NodeKind::Conflict => "CA",
            NodeKind::Rephrase => "MA",
        }
    }

    /// Inference, conflict or rephrase.
    pub fn is_segment(self) -> bool {
        Self::SEGMENT.contains(&self)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the argument map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "nodeID")]
    pub id: NodeId,
    /// Raw type tag as annotated (`"L"`, `"RA"`, ...).
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Node {
    pub fn new(id: NodeId, node_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// The recognised kind, or `None` for types outside the pattern vocabulary.
    pub fn kind(&self) -> Option<NodeKind> {
        NodeKind::parse(&self.node_type)
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_accepts_strings_and_numbers() {
        let from_str: NodeId = serde_json::from_str("\"42\"").unwrap();
        let from_num: NodeId = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, NodeId(42));
        assert_eq!(from_num, NodeId(42));
        assert_eq!(serde_json::to_string(&NodeId(42)).unwrap(), "\"42\"");
    }

    #[test]
    fn test_node_id_rejects_garbage() {
        assert!(serde_json::from_str::<NodeId>("\"abc\"").is_err());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(NodeKind::parse("RA"), Some(NodeKind::Inference));
        assert_eq!(NodeKind::parse("PA"), None);
        assert!(NodeKind::Conflict.is_segment());
        assert!(!NodeKind::Transition.is_segment());
    }

    #[test]
    fn test_node_json_field_names() {
        let node: Node = serde_json::from_str(
            r#"{"nodeID": "7", "type": "L", "text": "Bob : yes", "timestamp": "2020-05-28 21:13:49"}"#,
        )
        .unwrap();
        assert_eq!(node.id, NodeId(7));
        assert!(node.is(NodeKind::Locution));
        assert_eq!(node.timestamp.as_deref(), Some("2020-05-28 21:13:49"));
    }
}
