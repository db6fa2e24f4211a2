//! Text similarity measures for locution/proposition alignment.

use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The configurable alignment metric.
///
/// Token measures work on whitespace-separated token multisets; `lcsstr` on
/// characters; `cossim` on vectors produced by a caller-supplied
/// [`TextEncoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMeasure {
    Jaccard,
    Sorensen,
    Overlap,
    /// Bag distance. The only distance: lower is better.
    Bag,
    /// Longest common substring over the longer text.
    #[default]
    Lcsstr,
    /// Cosine similarity of embeddings.
    Cossim,
}

impl SimilarityMeasure {
    pub const ALL: [SimilarityMeasure; 6] = [
        SimilarityMeasure::Jaccard,
        SimilarityMeasure::Sorensen,
        SimilarityMeasure::Overlap,
        SimilarityMeasure::Bag,
        SimilarityMeasure::Lcsstr,
        SimilarityMeasure::Cossim,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityMeasure::Jaccard => "jaccard",
            SimilarityMeasure::Sorensen => "sorensen",
            SimilarityMeasure::Overlap => "overlap",
            SimilarityMeasure::Bag => "bag",
            SimilarityMeasure::Lcsstr => "lcsstr",
            SimilarityMeasure::Cossim => "cossim",
        }
    }

    /// Distances are minimised, similarities maximised.
    pub fn is_distance(self) -> bool {
        matches!(self, SimilarityMeasure::Bag)
    }

    pub fn needs_encoder(self) -> bool {
        matches!(self, SimilarityMeasure::Cossim)
    }

    /// Score two preprocessed texts. `None` for `cossim`, which needs
    /// embeddings.
    pub fn score(self, a: &str, b: &str) -> Option<f64> {
        match self {
            SimilarityMeasure::Jaccard => Some(jaccard(a, b)),
            SimilarityMeasure::Sorensen => Some(sorensen(a, b)),
            SimilarityMeasure::Overlap => Some(overlap(a, b)),
            SimilarityMeasure::Bag => Some(bag_distance(a, b)),
            SimilarityMeasure::Lcsstr => Some(lcsstr(a, b)),
            SimilarityMeasure::Cossim => None,
        }
    }
}

impl FromStr for SimilarityMeasure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown similarity measure `{s}`")))
    }
}

impl std::fmt::Display for SimilarityMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentence embedding backend for [`SimilarityMeasure::Cossim`].
///
/// Must return exactly one vector per input text, all of the same length.
pub trait TextEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

// ============================================================================
// Token measures
// ============================================================================

struct Bag<'a> {
    counts: HashMap<&'a str, usize>,
    len: usize,
}

impl<'a> Bag<'a> {
    fn new(text: &'a str) -> Self {
        let mut counts = HashMap::new();
        let mut len = 0;
        for token in text.split_whitespace() {
            *counts.entry(token).or_insert(0) += 1;
            len += 1;
        }
        Self { counts, len }
    }

    fn intersection(&self, other: &Bag<'_>) -> usize {
        self.counts
            .iter()
            .map(|(tok, &n)| n.min(other.counts.get(tok).copied().unwrap_or(0)))
            .sum()
    }
}

/// |A ∩ B| / |A ∪ B| over token multisets.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let (a, b) = (Bag::new(a), Bag::new(b));
    let inter = a.intersection(&b);
    let union = a.len + b.len - inter;
    if union == 0 { 1.0 } else { inter as f64 / union as f64 }
}

/// 2|A ∩ B| / (|A| + |B|).
pub fn sorensen(a: &str, b: &str) -> f64 {
    let (a, b) = (Bag::new(a), Bag::new(b));
    let total = a.len + b.len;
    if total == 0 { 1.0 } else { 2.0 * a.intersection(&b) as f64 / total as f64 }
}

/// |A ∩ B| / min(|A|, |B|).
pub fn overlap(a: &str, b: &str) -> f64 {
    let (a, b) = (Bag::new(a), Bag::new(b));
    match a.len.min(b.len) {
        0 if a.len == b.len => 1.0,
        0 => 0.0,
        min => a.intersection(&b) as f64 / min as f64,
    }
}

/// max(|A − B|, |B − A|).
pub fn bag_distance(a: &str, b: &str) -> f64 {
    let (a, b) = (Bag::new(a), Bag::new(b));
    let inter = a.intersection(&b);
    (a.len - inter).max(b.len - inter) as f64
}

// ============================================================================
// Sequence measures
// ============================================================================

/// Length of the longest common substring, in chars.
pub fn longest_common_substring(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = 0;
    for &ca in &a {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, &cb) in b.iter().enumerate() {
            if ca == cb {
                cur[j + 1] = prev[j] + 1;
                best = best.max(cur[j + 1]);
            }
        }
        prev = cur;
    }
    best
}

/// Longest common substring length over the longer text's length.
pub fn lcsstr(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    longest_common_substring(a, b) as f64 / longest as f64
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
