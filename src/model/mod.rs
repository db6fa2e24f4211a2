//! # Argument Map Model
//!
//! Plain DTOs for nodesets and the relations derived from them.
//! These types cross every stage boundary: pattern ↔ filter ↔ resolver ↔
//! aligner ↔ projector.
//!
//! Design rule: this module is pure data. No I/O, no logging, no stage logic.

pub mod node;
pub mod edge;
pub mod nodeset;
pub mod relation;
pub mod ids;

pub use node::{Node, NodeId, NodeKind};
pub use edge::{Edge, EdgeId, unordered_pair};
pub use nodeset::{Locution, NodeIndex, Nodeset, parse_timestamp};
pub use relation::{ArgumentKey, Arguments, Relation};
pub use ids::IdAllocator;

use serde::{Deserialize, Deserializer};

/// Ids appear both as JSON strings and as JSON numbers in the wild.
pub(crate) fn deserialize_numeric_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid numeric id `{s}`"))),
    }
}
