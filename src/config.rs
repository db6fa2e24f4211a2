//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::align::SimilarityMeasure;
use crate::hierarchy::LocutionOrder;
use crate::synth::Placeholders;
use crate::{Error, Result};

/// Options for [`Pipeline`](crate::Pipeline). Missing fields take their
/// defaults when loading from TOML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Measure used to align propositions to locutions
    pub similarity_measure: SimilarityMeasure,

    /// Text of synthetic segment nodes
    pub relation_placeholder_text: String,

    /// Type of synthetic segment nodes
    pub relation_placeholder_type: String,

    /// Text of synthetic illocution nodes
    pub illocution_placeholder_text: String,

    /// Appended to the text of reversed inference nodes
    pub reversed_marker_suffix: String,

    pub enforce_cardinality: bool,

    /// Merge the direction-normalized input into the synthetic graph
    pub add_gold_data: bool,

    /// Add gold nodes and edges that found no synthetic counterpart
    pub add_unmatched_gold: bool,

    /// Undo direction normalization after the merge
    pub restore_orientation: bool,

    /// Remove synthetic relations still carrying a placeholder after the merge
    pub drop_placeholder_relations: bool,

    pub locution_order: LocutionOrder,

    /// Between locution texts in the projected document
    pub text_separator: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_measure: SimilarityMeasure::Lcsstr,
            relation_placeholder_text: "NONE".into(),
            relation_placeholder_type: "RA".into(),
            illocution_placeholder_text: "NONE".into(),
            reversed_marker_suffix: "-rev".into(),
            enforce_cardinality: true,
            add_gold_data: false,
            add_unmatched_gold: false,
            restore_orientation: false,
            drop_placeholder_relations: false,
            locution_order: LocutionOrder::Hierarchy,
            text_separator: " ".into(),
        }
    }
}

impl PipelineConfig {
    /// Gold merge with everything undone afterwards: the result carries gold
    /// labels where they exist and placeholders elsewhere are dropped.
    pub fn with_gold() -> Self {
        Self {
            add_gold_data: true,
            restore_orientation: true,
            drop_placeholder_relations: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.reversed_marker_suffix.is_empty() {
            return Err(Error::Config("reversed_marker_suffix must not be empty".into()));
        }
        if self.relation_placeholder_type.trim().is_empty() {
            return Err(Error::Config("relation_placeholder_type must not be empty".into()));
        }
        Ok(())
    }

    pub fn placeholders(&self) -> Placeholders {
        Placeholders {
            relation_text: self.relation_placeholder_text.clone(),
            relation_type: self.relation_placeholder_type.clone(),
            illocution_text: self.illocution_placeholder_text.clone(),
        }
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(format!("failed to serialize to TOML: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
