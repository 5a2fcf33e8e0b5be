use thiserror::Error;

/// Failures raised while loading or validating the corpus.
///
/// Validation is fail-fast: the first violation aborts the load and no
/// partial state is exposed.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A required corpus collection could not be found.
    #[error("missing corpus resource: {0}")]
    MissingResource(String),

    /// A corpus collection exists but does not decode.
    #[error("malformed corpus resource {name}: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate page id: {0}")]
    DuplicatePageId(String),

    #[error("page {page_id} references missing visual {visual_id}")]
    MissingVisual { page_id: String, visual_id: String },

    /// An equation page without a resolvable derivation. `derivation_id`
    /// is `None` when the field was absent entirely, `Some` when it was
    /// present but did not resolve.
    #[error("equation page {page_id} has no resolvable derivation ({})", .derivation_id.as_deref().unwrap_or("field absent"))]
    MissingDerivation {
        page_id: String,
        derivation_id: Option<String>,
    },

    #[error("page {page_id} references unknown related page {related_id}")]
    InvalidRelatedReference { page_id: String, related_id: String },

    #[error("visual {visual_id} parameter {parameter_id} violates min <= default <= max")]
    InvalidParameterRange {
        visual_id: String,
        parameter_id: String,
    },

    #[error("derivation {0} has no steps")]
    EmptyDerivation(String),
}
