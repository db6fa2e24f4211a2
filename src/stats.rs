//! # Relation Statistics
//!
//! How well the TA, S and YA patterns cover the edges of a nodeset. Edges no
//! pattern explains usually point at annotation noise.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::model::{NodeId, NodeIndex, Nodeset};
use crate::pattern::{RelationQuery, merged_relations};

const FAMILIES: [RelationQuery; 3] = [RelationQuery::TRANSITION, RelationQuery::Segment, RelationQuery::Illocution];

/// Coverage counts for one or more nodesets.
///
/// List entries are prefixed with the nodeset id so that statistics of many
/// nodesets can be concatenated with [`RelationStatistics::absorb`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStatistics {
    /// `"<nodeset> <from>:<to> <from type>:<to type>"`
    pub missed_edges: Vec<String>,
    pub covered_edges: usize,
    pub empty_sources: Vec<String>,
    pub empty_targets: Vec<String>,
    pub more_than_one_target: Vec<String>,
    /// `"<family>: [<source types>] -> [<target types>]"` → occurrences
    pub type_combinations: BTreeMap<String, usize>,
    pub edges_covered_multi_times: Vec<String>,
    /// family tag → number of relations
    pub covered_relations: BTreeMap<String, usize>,
}

impl RelationStatistics {
    /// Add `other` into `self`.
    pub fn absorb(&mut self, other: RelationStatistics) {
        self.missed_edges.extend(other.missed_edges);
        self.covered_edges += other.covered_edges;
        self.empty_sources.extend(other.empty_sources);
        self.empty_targets.extend(other.empty_targets);
        self.more_than_one_target.extend(other.more_than_one_target);
        for (key, count) in other.type_combinations {
            *self.type_combinations.entry(key).or_default() += count;
        }
        self.edges_covered_multi_times.extend(other.edges_covered_multi_times);
        for (key, count) in other.covered_relations {
            *self.covered_relations.entry(key).or_default() += count;
        }
    }
}

fn type_of<'a>(index: &NodeIndex<'a>, id: NodeId) -> &'a str {
    index.get(&id).map(|&n| n.node_type.as_str()).unwrap_or("?")
}

fn prefixed(nodeset_id: &str, mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items.into_iter().map(|item| format!("{nodeset_id} {item}")).collect()
}

/// Coverage statistics of `nodeset`, without cardinality enforcement.
pub fn relation_statistics(nodeset: &Nodeset, nodeset_id: &str) -> RelationStatistics {
    let index = nodeset.node_index();
    let mut stats = RelationStatistics::default();
    let mut coverage: HashMap<(NodeId, NodeId), usize> = HashMap::new();
    let mut empty_sources = Vec::new();
    let mut empty_targets = Vec::new();
    let mut more_than_one_target = Vec::new();

    for family in FAMILIES {
        let relations = merged_relations(nodeset, family, false);
        stats.covered_relations.insert(family.tag().to_string(), relations.len());
        for rel in &relations {
            for edge in rel.edges() {
                *coverage.entry(edge).or_default() += 1;
            }
            let described = || format!("{} {}", rel.relation, type_of(&index, rel.relation));
            if rel.sources.is_empty() {
                empty_sources.push(described());
            }
            if rel.targets.is_empty() {
                empty_targets.push(described());
            }
            if rel.targets.len() > 1 {
                more_than_one_target.push(described());
            }
            let types = |ids: &[NodeId]| {
                let mut types: Vec<&str> = ids.iter().map(|&id| type_of(&index, id)).collect();
                types.sort_unstable();
                types.join(", ")
            };
            let combination = format!(
                "{}: [{}] -> [{}]",
                family.tag(),
                types(rel.sources.as_slice()),
                types(rel.targets.as_slice())
            );
            *stats.type_combinations.entry(combination).or_default() += 1;
        }
    }

    let mut missed = Vec::new();
    let mut seen = HashSet::new();
    for edge in &nodeset.edges {
        let key = edge.endpoints();
        if !coverage.contains_key(&key) && seen.insert(key) {
            missed.push(format!(
                "{}:{} {}:{}",
                key.0,
                key.1,
                type_of(&index, key.0),
                type_of(&index, key.1)
            ));
        }
    }
    let multi: Vec<String> = coverage
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|((from, to), _)| format!("{from}:{to}"))
        .collect();

    stats.covered_edges = coverage.len();
    stats.missed_edges = prefixed(nodeset_id, missed);
    stats.empty_sources = prefixed(nodeset_id, empty_sources);
    stats.empty_targets = prefixed(nodeset_id, empty_targets);
    stats.more_than_one_target = prefixed(nodeset_id, more_than_one_target);
    stats.edges_covered_multi_times = prefixed(nodeset_id, multi);
    stats
}
