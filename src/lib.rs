//! # argmap-rs: Argument Map Preparation
//!
//! Turns crowd-annotated argument maps (nodesets of locutions, propositions,
//! transitions and their relations) into span-annotated documents for
//! relation extraction.
//!
//! ## Pipeline
//!
//! 1. **Filter**: keep only nodes and edges taking part in a valid relation
//! 2. **Strip**: remove all S and YA relations
//! 3. **Align**: assign propositions to locutions by text similarity
//! 4. **Synthesize**: mirror every transition as a placeholder S relation
//! 5. **Merge** (optional): copy gold labels from the direction-normalized input
//! 6. **Project**: join locution texts into a document with n-ary span relations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use argmap_rs::{Nodeset, Pipeline, PipelineConfig};
//!
//! # fn example(json: &str) -> argmap_rs::Result<()> {
//! let nodeset = Nodeset::from_json(json)?;
//! let pipeline = Pipeline::new(PipelineConfig::with_gold())?;
//! let document = pipeline.run(&nodeset)?;
//! println!("{}", document.to_json()?);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod pattern;
pub mod filter;
pub mod hierarchy;
pub mod direction;
pub mod align;
pub mod synth;
pub mod merge;
pub mod document;
pub mod stats;
pub mod store;
pub mod config;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Node, NodeId, NodeKind, Edge, EdgeId,
    Locution, Nodeset, Relation, IdAllocator,
};

// ============================================================================
// Re-exports: Stages
// ============================================================================

pub use pattern::{RelationKind, RelationQuery};
pub use hierarchy::LocutionOrder;
pub use direction::{Direction, DirectionReport};
pub use align::{Alignment, SimilarityMeasure, TextAligner, TextEncoder};
pub use synth::{Placeholders, SyntheticRelations};
pub use merge::NodeMatching;
pub use document::{Document, DocumentProjector, validate_document};
pub use stats::{RelationStatistics, relation_statistics};
pub use store::{BatchReport, DirectoryStore, MemoryStore, NodesetStore, process_all};
pub use config::PipelineConfig;

use tracing::{debug, warn};

// ============================================================================
// Pipeline
// ============================================================================

/// Runs the preparation stages over one nodeset at a time.
///
/// Holds no per-nodeset state; one `Pipeline` can process a whole batch.
pub struct Pipeline<'e> {
    config: PipelineConfig,
    encoder: Option<&'e dyn TextEncoder>,
}

/// Output of [`Pipeline::prepare`].
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The graph with synthetic (and possibly gold-labelled) relations.
    pub nodeset: Nodeset,
    /// The input after isolation filtering.
    pub cleaned: Nodeset,
    /// Locution order used for alignment and for the document.
    pub order: Vec<NodeId>,
    pub alignment: Alignment,
    pub synthetic: SyntheticRelations,
    /// Direction classification of the cleaned input; only with gold data.
    pub directions: Option<DirectionReport>,
}

impl<'e> Pipeline<'e> {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, encoder: None })
    }

    /// Encoder for [`SimilarityMeasure::Cossim`].
    pub fn with_encoder(mut self, encoder: &'e dyn TextEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn aligner(&self) -> TextAligner<'e> {
        let aligner = TextAligner::new(self.config.similarity_measure);
        match self.encoder {
            Some(encoder) => aligner.with_encoder(encoder),
            None => aligner,
        }
    }

    /// Filter, align, synthesize and optionally merge gold data.
    pub fn prepare(&self, input: &Nodeset) -> Result<Prepared> {
        let config = &self.config;
        let placeholders = config.placeholders();

        let cleaned = filter::cleanup(input, config.enforce_cardinality);
        let stripped = filter::remove_segment_and_illocution_relations(&cleaned);

        let order = hierarchy::order_locutions(&stripped, config.locution_order);
        let alignment = align::align_nodeset(&stripped, &order, &self.aligner())?;
        let transitions: Vec<Relation> =
            pattern::relations(&stripped, RelationQuery::TRANSITION, config.enforce_cardinality).collect();

        let mut node_ids = IdAllocator::after(input.max_node_id().map(|id| id.0));
        let mut edge_ids = IdAllocator::after(input.max_edge_id().map(|id| id.0));
        let synthetic =
            synth::build_synthetic_relations(&alignment, &transitions, &placeholders, &mut node_ids, &mut edge_ids);
        let mut nodeset = synthetic.apply_to(&stripped);

        let mut directions = None;
        if config.add_gold_data {
            let (normalized, report) = direction::normalize_directions(&cleaned, &config.reversed_marker_suffix)?;
            let unknown = report.unknown();
            if !unknown.is_empty() {
                debug!(count = unknown.len(), "excluding inference relations of unknown direction from gold data");
            }
            let gold = filter::cleanup(&filter::remove_relations(&normalized, &unknown), config.enforce_cardinality);
            let matching = merge::match_nodes(&nodeset, &gold)?;
            debug!(matched = matching.len(), "matched synthetic nodes to gold");
            nodeset = merge::merge_gold(
                &nodeset,
                &gold,
                &matching,
                config.add_unmatched_gold,
                &mut node_ids,
                &mut edge_ids,
            )?;
            if config.restore_orientation {
                nodeset = direction::restore_orientation(&nodeset, &config.reversed_marker_suffix)?;
            }
            if config.drop_placeholder_relations {
                nodeset = synth::drop_placeholder_relations(&nodeset, &placeholders);
            }
            directions = Some(report);
        } else {
            if config.restore_orientation {
                warn!("restore_orientation has no effect without add_gold_data");
            }
            if config.drop_placeholder_relations {
                warn!("drop_placeholder_relations has no effect without add_gold_data");
            }
        }

        Ok(Prepared { nodeset, cleaned, order, alignment, synthetic, directions })
    }

    fn projector(&self) -> DocumentProjector {
        DocumentProjector::new(self.config.text_separator.clone(), self.config.locution_order)
    }

    /// Project an already prepared nodeset, ordering its locutions afresh.
    pub fn project(&self, nodeset: &Nodeset) -> Result<Document> {
        self.projector().project(nodeset)
    }

    /// Project [`Prepared::nodeset`] in the order its alignment used.
    pub fn project_prepared(&self, prepared: &Prepared) -> Result<Document> {
        self.projector().project_in_order(&prepared.nodeset, &prepared.order)
    }

    /// [`prepare`](Self::prepare) then [`project_prepared`](Self::project_prepared).
    pub fn run(&self, input: &Nodeset) -> Result<Document> {
        let prepared = self.prepare(input)?;
        self.project_prepared(&prepared)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Ambiguous direction for relation {relation}: transitions support both orientations")]
    AmbiguousDirection { relation: NodeId },

    #[error("Proposition text is not unique: {text:?}")]
    DuplicateText { text: String },

    #[error("Relation {relation} has the same arguments as another relation")]
    DuplicateArguments { relation: NodeId },

    #[error("{kind} nodes differ from the other graph: {detail}")]
    GraphMismatch { kind: NodeKind, detail: String },

    #[error("Relation {0} is not marked as reversed")]
    NotReversed(NodeId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
