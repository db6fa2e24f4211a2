//! # Text Alignment Solver
//!
//! Optimal one-to-one assignment of propositions to the locutions they were
//! extracted from, by text similarity.
//!
//! Rows are propositions, columns are locutions in document order. The
//! matrix is padded to a square and solved with Kuhn-Munkres; a proposition
//! that lands on a padding column is reported as unaligned.

pub mod assignment;
pub mod similarity;

pub use similarity::{SimilarityMeasure, TextEncoder};

use hashbrown::HashSet;
use tracing::{debug, warn};

use crate::model::{NodeId, NodeKind, Nodeset};
use crate::{Error, Result};

/// `(proposition, locution)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlignmentPair {
    pub proposition: NodeId,
    pub locution: NodeId,
}

/// Result of an alignment run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    /// In proposition order. No proposition and no locution appears twice.
    pub pairs: Vec<AlignmentPair>,
    /// Propositions that could not be aligned.
    pub unaligned: Vec<NodeId>,
}

impl Alignment {
    pub fn locution_of(&self, proposition: NodeId) -> Option<NodeId> {
        self.pairs.iter().find(|p| p.proposition == proposition).map(|p| p.locution)
    }

    /// First proposition aligned to `locution`.
    pub fn proposition_of(&self, locution: NodeId) -> Option<NodeId> {
        self.pairs.iter().find(|p| p.locution == locution).map(|p| p.proposition)
    }

    pub fn is_bijective(&self) -> bool {
        let props: HashSet<NodeId> = self.pairs.iter().map(|p| p.proposition).collect();
        let locs: HashSet<NodeId> = self.pairs.iter().map(|p| p.locution).collect();
        props.len() == self.pairs.len() && locs.len() == self.pairs.len()
    }
}

/// Lower-case, drop the speaker prefix up to the first colon, trim.
pub fn preprocess_locution(text: &str) -> String {
    let lower = text.to_lowercase();
    match lower.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => lower.trim().to_string(),
    }
}

pub fn preprocess_proposition(text: &str) -> String {
    text.to_lowercase()
}

/// Aligns proposition texts to locution texts with one [`SimilarityMeasure`].
#[derive(Clone, Copy)]
pub struct TextAligner<'e> {
    measure: SimilarityMeasure,
    encoder: Option<&'e dyn TextEncoder>,
}

impl std::fmt::Debug for TextAligner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextAligner")
            .field("measure", &self.measure)
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}

impl<'e> TextAligner<'e> {
    pub fn new(measure: SimilarityMeasure) -> Self {
        Self { measure, encoder: None }
    }

    pub fn with_encoder(mut self, encoder: &'e dyn TextEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn measure(&self) -> SimilarityMeasure {
        self.measure
    }

    /// `propositions.len() × locutions.len()` matrix of preprocessed texts.
    /// Distances are returned as is (lower is better).
    pub fn score_matrix(&self, propositions: &[String], locutions: &[String]) -> Result<Vec<Vec<f64>>> {
        if !self.measure.needs_encoder() {
            return Ok(propositions
                .iter()
                .map(|p| {
                    locutions
                        .iter()
                        .map(|l| self.measure.score(p, l).unwrap_or(f64::NAN))
                        .collect()
                })
                .collect());
        }

        let encoder = self
            .encoder
            .ok_or_else(|| Error::Alignment("cossim requires a text encoder".into()))?;
        let prop_vecs = encode_exact(encoder, propositions)?;
        let loc_vecs = encode_exact(encoder, locutions)?;
        Ok(prop_vecs
            .iter()
            .map(|p| loc_vecs.iter().map(|l| similarity::cosine(p, l)).collect())
            .collect())
    }

    /// Align `(id, raw text)` propositions to `(id, raw text)` locutions.
    pub fn align(&self, propositions: &[(NodeId, &str)], locutions: &[(NodeId, &str)]) -> Result<Alignment> {
        let prop_texts: Vec<String> = propositions.iter().map(|(_, t)| preprocess_proposition(t)).collect();
        let loc_texts: Vec<String> = locutions.iter().map(|(_, t)| preprocess_locution(t)).collect();

        let mut gains = self.score_matrix(&prop_texts, &loc_texts)?;
        if self.measure.is_distance() {
            for row in &mut gains {
                for v in row.iter_mut() {
                    *v = -*v;
                }
            }
        }

        let mut alignment = Alignment::default();
        for (row, col) in assignment::solve(&gains, locutions.len()).into_iter().enumerate() {
            let proposition = propositions[row].0;
            match col {
                Some(col) => alignment.pairs.push(AlignmentPair {
                    proposition,
                    locution: locutions[col].0,
                }),
                None => {
                    warn!(proposition = %proposition, "could not align proposition to any locution");
                    alignment.unaligned.push(proposition);
                }
            }
        }
        debug!(
            measure = %self.measure,
            aligned = alignment.pairs.len(),
            unaligned = alignment.unaligned.len(),
            "aligned propositions"
        );
        Ok(alignment)
    }
}

fn encode_exact(encoder: &dyn TextEncoder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let vectors = encoder.encode(texts)?;
    if vectors.len() != texts.len() {
        return Err(Error::Alignment(format!(
            "encoder returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    Ok(vectors)
}

/// Align the propositions of `nodeset` (in nodeset order) to its locutions in
/// `locution_order`.
pub fn align_nodeset(nodeset: &Nodeset, locution_order: &[NodeId], aligner: &TextAligner<'_>) -> Result<Alignment> {
    let index = nodeset.node_index();
    let propositions: Vec<(NodeId, &str)> = nodeset
        .nodes
        .iter()
        .filter(|n| n.is(NodeKind::Proposition))
        .map(|n| (n.id, n.text.as_str()))
        .collect();
    let locutions: Vec<(NodeId, &str)> = locution_order
        .iter()
        .filter_map(|id| index.get(id).map(|n| (n.id, n.text.as_str())))
        .collect();
    aligner.align(&propositions, &locutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pair(p: u64, l: u64) -> AlignmentPair {
        AlignmentPair { proposition: NodeId(p), locution: NodeId(l) }
    }

    #[test]
    fn test_preprocess() {
        assert_eq!(preprocess_locution("Alice : Taxes are HIGH"), "taxes are high");
        assert_eq!(preprocess_locution("no speaker"), "no speaker");
        assert_eq!(preprocess_locution("Bob: a: b"), "a: b");
        assert_eq!(preprocess_proposition("Taxes"), "taxes");
    }

    #[test]
    fn test_align_by_text() {
        let aligner = TextAligner::new(SimilarityMeasure::Lcsstr);
        let props = [(NodeId(11), "taxes are too high"), (NodeId(12), "we should cut spending")];
        let locs = [(NodeId(1), "Bob : we should cut spending"), (NodeId(2), "Alice : taxes are too high")];
        let alignment = aligner.align(&props, &locs).unwrap();
        assert_eq!(alignment.pairs, vec![pair(11, 2), pair(12, 1)]);
        assert!(alignment.unaligned.is_empty());
    }

    #[test]
    fn test_surplus_propositions_are_unaligned() {
        let aligner = TextAligner::new(SimilarityMeasure::Jaccard);
        let props = [(NodeId(11), "red apples"), (NodeId(12), "green pears")];
        let locs = [(NodeId(1), "Ann : green pears")];
        let alignment = aligner.align(&props, &locs).unwrap();
        assert_eq!(alignment.pairs, vec![pair(12, 1)]);
        assert_eq!(alignment.unaligned, vec![NodeId(11)]);
    }

    #[test]
    fn test_distance_measure_minimises() {
        let aligner = TextAligner::new(SimilarityMeasure::Bag);
        let props = [(NodeId(11), "a b c")];
        let locs = [(NodeId(1), "X : x y z w"), (NodeId(2), "Y : a b c")];
        let alignment = aligner.align(&props, &locs).unwrap();
        assert_eq!(alignment.pairs, vec![pair(11, 2)]);
    }

    struct Axis;

    impl TextEncoder for Axis {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if t.contains("yes") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
                .collect())
        }
    }

    struct Broken;

    impl TextEncoder for Broken {
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_cossim_uses_encoder() {
        let aligner = TextAligner::new(SimilarityMeasure::Cossim).with_encoder(&Axis);
        let props = [(NodeId(11), "yes indeed"), (NodeId(12), "no way")];
        let locs = [(NodeId(1), "A : no"), (NodeId(2), "B : yes")];
        let alignment = aligner.align(&props, &locs).unwrap();
        assert_eq!(alignment.pairs, vec![pair(11, 2), pair(12, 1)]);
    }

    #[test]
    fn test_cossim_without_encoder_fails() {
        let aligner = TextAligner::new(SimilarityMeasure::Cossim);
        let err = aligner.align(&[(NodeId(1), "a")], &[(NodeId(2), "b")]).unwrap_err();
        assert!(matches!(err, Error::Alignment(_)));

        let aligner = TextAligner::new(SimilarityMeasure::Cossim).with_encoder(&Broken);
        assert!(aligner.align(&[(NodeId(1), "a")], &[(NodeId(2), "b")]).is_err());
    }

    #[test]
    fn test_align_nodeset_uses_locution_order() {
        let nodeset = Nodeset::new()
            .with_node(1, "L", "A : first")
            .with_node(2, "L", "B : second")
            .with_node(11, "I", "second")
            .with_node(12, "I", "first");
        let aligner = TextAligner::new(SimilarityMeasure::Lcsstr);
        let alignment = align_nodeset(&nodeset, &[NodeId(2), NodeId(1)], &aligner).unwrap();
        assert_eq!(alignment.pairs, vec![pair(11, 2), pair(12, 1)]);
        assert!(alignment.is_bijective());
        assert_eq!(alignment.proposition_of(NodeId(1)), Some(NodeId(12)));
    }
}
