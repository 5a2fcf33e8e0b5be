use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Topic category for a corpus page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Concept,
    Equation,
    Number,
}

impl PageType {
    pub fn display_name(self) -> &'static str {
        match self {
            PageType::Concept => "Concept",
            PageType::Equation => "Equation",
            PageType::Number => "Number",
        }
    }
}

/// One corpus entry: a concept, equation, or number topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub summary_markdown: String,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    #[serde(rename = "relatedPageIDs")]
    pub related_page_ids: Vec<String>,
    #[serde(rename = "visualSpecID")]
    pub visual_spec_id: String,
    #[serde(rename = "derivationID")]
    pub derivation_id: Option<String>,
}

impl Page {
    pub fn is_equation(&self) -> bool {
        self.page_type == PageType::Equation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualKind {
    #[serde(rename = "graph2D")]
    Graph2D,
    Animation,
    Lattice,
    Timeline,
}

/// Slider-style numeric parameter for a visual model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualParameter {
    pub id: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default_value: f64,
}

/// Describes how a page's interactive visual is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSpec {
    pub id: String,
    pub kind: VisualKind,
    #[serde(rename = "modelID")]
    pub model_id: String,
    pub parameters: Vec<VisualParameter>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationStep {
    pub equation: String,
    pub explanation_markdown: String,
    pub animation_hint: Option<String>,
}

/// Ordered sequence of worked steps attached to an equation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationSpec {
    pub id: String,
    pub steps: Vec<DerivationStep>,
    #[serde(rename = "interactiveModelID")]
    pub interactive_model_id: Option<String>,
}

/// Derived per-page search record; rebuilt whenever the corpus loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIndexEntry {
    pub page_id: String,
    pub title_normalized: String,
    pub aliases_normalized: Vec<String>,
    pub tags_normalized: Vec<String>,
}

/// A contiguous run of rendered text, optionally linked to one target page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedSegment {
    pub text: String,
    #[serde(rename = "targetPageID")]
    pub target_page_id: Option<String>,
}

impl LinkedSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_page_id: None,
        }
    }

    pub fn linked(text: impl Into<String>, target_page_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_page_id: Some(target_page_id.into()),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.target_page_id.is_some()
    }
}
