//! Property tests: hierarchy ordering, alignment bijection, projection
//! idempotence.

use argmap_rs::document::collapse_whitespace;
use argmap_rs::hierarchy::sort_by_hierarchy;
use argmap_rs::pattern::two_hop_connections;
use argmap_rs::{DocumentProjector, NodeId, Nodeset, SimilarityMeasure, TextAligner};
use hashbrown::HashSet;
use proptest::prelude::*;

/// Locutions `1..=n` plus TA nodes `100 + k` linking a lower id to a higher
/// one, returned with the node ids in a shuffled order.
fn dag() -> impl Strategy<Value = (Vec<NodeId>, Nodeset)> {
    (2usize..12)
        .prop_flat_map(|n| {
            let links = prop::collection::vec((1..=n as u64, 1..=n as u64), 0..20);
            let order = Just((1..=n as u64).map(NodeId).collect::<Vec<_>>()).prop_shuffle();
            (order, links)
        })
        .prop_map(|(order, links)| {
            let mut nodeset = Nodeset::new();
            for id in &order {
                nodeset = nodeset.with_node(id.0, "L", "turn");
            }
            for (k, (a, b)) in links.into_iter().enumerate() {
                if a == b {
                    continue;
                }
                let (from, to) = (a.min(b), a.max(b));
                let ta = 100 + k as u64;
                nodeset = nodeset.with_node(ta, "TA", "Default Transition").with_relation(&[from], ta, &[to]);
            }
            (order, nodeset)
        })
}

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["tax", "cut", "school", "money", "we", "high"]), 0..5)
        .prop_map(|words| words.join(" "))
}

fn measure() -> impl Strategy<Value = SimilarityMeasure> {
    prop::sample::select(vec![
        SimilarityMeasure::Jaccard,
        SimilarityMeasure::Sorensen,
        SimilarityMeasure::Overlap,
        SimilarityMeasure::Bag,
        SimilarityMeasure::Lcsstr,
    ])
}

proptest! {
    #[test]
    fn hierarchy_puts_sources_first((order, nodeset) in dag()) {
        let sorted = sort_by_hierarchy(&order, &nodeset.edges);
        prop_assert_eq!(sorted.len(), order.len());

        let position = |id: NodeId| sorted.iter().position(|&x| x == id);
        let members: HashSet<NodeId> = order.iter().copied().collect();
        for (a, b, _) in two_hop_connections(&order, &members, &nodeset.edges) {
            prop_assert!(position(a) < position(b), "{} should precede {}", a, b);
        }
    }

    #[test]
    fn alignment_is_a_partial_bijection(
        propositions in prop::collection::vec(text(), 0..6),
        locutions in prop::collection::vec(text(), 0..6),
        measure in measure(),
    ) {
        let props: Vec<(NodeId, &str)> = propositions
            .iter()
            .enumerate()
            .map(|(i, t)| (NodeId(100 + i as u64), t.as_str()))
            .collect();
        let locs: Vec<(NodeId, String)> = locutions
            .iter()
            .enumerate()
            .map(|(i, t)| (NodeId(1 + i as u64), format!("Speaker : {t}")))
            .collect();
        let locs: Vec<(NodeId, &str)> = locs.iter().map(|(id, t)| (*id, t.as_str())).collect();

        let alignment = TextAligner::new(measure).align(&props, &locs).unwrap();
        prop_assert!(alignment.is_bijective());
        prop_assert_eq!(alignment.pairs.len(), props.len().min(locs.len()));
        prop_assert_eq!(alignment.pairs.len() + alignment.unaligned.len(), props.len());
    }

    #[test]
    fn projection_is_idempotent(
        texts in prop::collection::vec("[a-z]{1,6}( {1,3}[a-z]{1,6}){0,3}", 1..6),
    ) {
        let mut nodeset = Nodeset::new();
        for (i, t) in texts.iter().enumerate() {
            nodeset = nodeset.with_node(1 + i as u64, "L", t);
        }
        for i in 1..texts.len() as u64 {
            let ta = 100 + i;
            nodeset = nodeset.with_node(ta, "TA", "Default Transition").with_relation(&[i], ta, &[i + 1]);
        }

        let projector = DocumentProjector::default();
        let first = projector.project(&nodeset).unwrap();
        let second = projector.project(&nodeset).unwrap();
        prop_assert_eq!(&first, &second);
        for (index, id) in first.metadata.l_node_ids.iter().enumerate() {
            let expected = nodeset.node(*id).map(|n| collapse_whitespace(&n.text));
            prop_assert_eq!(first.span_text(index).map(str::to_string), expected);
        }
    }
}
