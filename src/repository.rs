//! Corpus loading: decodes the three bundled collections and cross-validates
//! every reference before any state becomes visible.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::CorpusError;
use crate::model::{DerivationSpec, Page, VisualSpec};
use crate::normalize::title_cmp;

static BUNDLED_PAGES: &str = include_str!("../data/pages.json");
static BUNDLED_VISUALS: &str = include_str!("../data/visuals.json");
static BUNDLED_DERIVATIONS: &str = include_str!("../data/derivations.json");

pub const PAGES_RESOURCE: &str = "pages.json";
pub const VISUALS_RESOURCE: &str = "visuals.json";
pub const DERIVATIONS_RESOURCE: &str = "derivations.json";

/// Where the corpus collections are read from.
#[derive(Debug, Clone, Default)]
pub enum CorpusSource {
    /// The corpus compiled into the binary.
    #[default]
    Bundled,
    /// A directory holding `pages.json`, `visuals.json`, `derivations.json`.
    Dir(PathBuf),
}

impl CorpusSource {
    fn read(&self, name: &str) -> Result<String, CorpusError> {
        match self {
            CorpusSource::Bundled => Ok(match name {
                PAGES_RESOURCE => BUNDLED_PAGES.to_string(),
                VISUALS_RESOURCE => BUNDLED_VISUALS.to_string(),
                DERIVATIONS_RESOURCE => BUNDLED_DERIVATIONS.to_string(),
                other => return Err(CorpusError::MissingResource(other.to_string())),
            }),
            CorpusSource::Dir(dir) => {
                let path = dir.join(name);
                std::fs::read_to_string(&path)
                    .map_err(|_| CorpusError::MissingResource(path.display().to_string()))
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, name: &str) -> Result<T, CorpusError> {
        let raw = self.read(name)?;
        serde_json::from_str(&raw).map_err(|source| CorpusError::Malformed {
            name: name.to_string(),
            source,
        })
    }
}

/// Validated, immutable view of one loaded corpus.
///
/// Pages are sorted by case-insensitive title; all id lookups are O(1).
#[derive(Debug)]
pub struct Repository {
    pages: Vec<Page>,
    page_index: HashMap<String, usize>,
    visuals: Vec<VisualSpec>,
    visual_index: HashMap<String, usize>,
    derivations: Vec<DerivationSpec>,
    derivation_index: HashMap<String, usize>,
}

impl Repository {
    /// Decodes and validates the corpus. Fails fast on the first violation;
    /// a failed load yields no repository at all.
    pub fn load(source: &CorpusSource) -> Result<Self, CorpusError> {
        let mut pages: Vec<Page> = source.decode(PAGES_RESOURCE)?;
        let derivations: Vec<DerivationSpec> = source.decode(DERIVATIONS_RESOURCE)?;
        let visuals: Vec<VisualSpec> = source.decode(VISUALS_RESOURCE)?;

        validate(&pages, &visuals, &derivations)?;

        pages.sort_by(|a, b| title_cmp(&a.title, &b.title));

        let page_index = pages
            .iter()
            .enumerate()
            .map(|(idx, page)| (page.id.clone(), idx))
            .collect();
        let visual_index = visuals
            .iter()
            .enumerate()
            .map(|(idx, visual)| (visual.id.clone(), idx))
            .collect();
        let derivation_index = derivations
            .iter()
            .enumerate()
            .map(|(idx, derivation)| (derivation.id.clone(), idx))
            .collect();

        info!(
            pages = pages.len(),
            visuals = visuals.len(),
            derivations = derivations.len(),
            "corpus loaded"
        );

        Ok(Self {
            pages,
            page_index,
            visuals,
            visual_index,
            derivations,
            derivation_index,
        })
    }

    /// All pages, sorted by case-insensitive title.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.page_index.get(id).map(|&idx| &self.pages[idx])
    }

    pub fn visual(&self, id: &str) -> Option<&VisualSpec> {
        self.visual_index.get(id).map(|&idx| &self.visuals[idx])
    }

    pub fn derivation(&self, id: &str) -> Option<&DerivationSpec> {
        self.derivation_index.get(id).map(|&idx| &self.derivations[idx])
    }
}

fn validate(
    pages: &[Page],
    visuals: &[VisualSpec],
    derivations: &[DerivationSpec],
) -> Result<(), CorpusError> {
    let mut seen_page_ids = HashSet::new();
    for page in pages {
        if !seen_page_ids.insert(page.id.as_str()) {
            return Err(CorpusError::DuplicatePageId(page.id.clone()));
        }
    }

    let visual_ids: HashSet<&str> = visuals.iter().map(|v| v.id.as_str()).collect();
    let derivation_ids: HashSet<&str> = derivations.iter().map(|d| d.id.as_str()).collect();
    let page_ids: HashSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();

    for page in pages {
        if !visual_ids.contains(page.visual_spec_id.as_str()) {
            return Err(CorpusError::MissingVisual {
                page_id: page.id.clone(),
                visual_id: page.visual_spec_id.clone(),
            });
        }

        if page.is_equation() {
            match page.derivation_id.as_deref() {
                None => {
                    return Err(CorpusError::MissingDerivation {
                        page_id: page.id.clone(),
                        derivation_id: None,
                    });
                }
                Some(derivation_id) if !derivation_ids.contains(derivation_id) => {
                    return Err(CorpusError::MissingDerivation {
                        page_id: page.id.clone(),
                        derivation_id: Some(derivation_id.to_string()),
                    });
                }
                Some(_) => {}
            }
        }

        for related_id in &page.related_page_ids {
            if !page_ids.contains(related_id.as_str()) {
                return Err(CorpusError::InvalidRelatedReference {
                    page_id: page.id.clone(),
                    related_id: related_id.clone(),
                });
            }
        }
    }

    for visual in visuals {
        for parameter in &visual.parameters {
            let ordered = parameter.min <= parameter.default_value
                && parameter.default_value <= parameter.max;
            if !ordered {
                return Err(CorpusError::InvalidParameterRange {
                    visual_id: visual.id.clone(),
                    parameter_id: parameter.id.clone(),
                });
            }
        }
    }

    for derivation in derivations {
        if derivation.steps.is_empty() {
            return Err(CorpusError::EmptyDerivation(derivation.id.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn page(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "type": "concept",
            "summaryMarkdown": format!("About {title}."),
            "aliases": [],
            "tags": ["Algebra"],
            "relatedPageIDs": [],
            "visualSpecID": "vis-line",
            "derivationID": null,
        })
    }

    fn visual(id: &str) -> Value {
        json!({
            "id": id,
            "kind": "graph2D",
            "modelID": "linear",
            "parameters": [
                {"id": "a", "label": "Slope", "min": -5.0, "max": 5.0, "step": 0.1, "defaultValue": 1.0}
            ],
            "metadata": {"xMin": "-10", "xMax": "10"},
        })
    }

    fn derivation(id: &str) -> Value {
        json!({
            "id": id,
            "steps": [
                {"equation": "x^2", "explanationMarkdown": "Square it.", "animationHint": null}
            ],
            "interactiveModelID": null,
        })
    }

    fn write_corpus(dir: &std::path::Path, pages: Value, visuals: Value, derivations: Value) {
        std::fs::write(dir.join(PAGES_RESOURCE), pages.to_string()).unwrap();
        std::fs::write(dir.join(VISUALS_RESOURCE), visuals.to_string()).unwrap();
        std::fs::write(dir.join(DERIVATIONS_RESOURCE), derivations.to_string()).unwrap();
    }

    #[test]
    fn loads_and_sorts_a_valid_directory_corpus() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(
            dir.path(),
            json!([page("zeta", "Zeta Function"), page("abs", "Absolute Value")]),
            json!([visual("vis-line")]),
            json!([]),
        );

        let repo = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap();
        let titles: Vec<_> = repo.pages().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Absolute Value", "Zeta Function"]);
        assert!(repo.page("zeta").is_some());
        assert!(repo.page("nope").is_none());
        assert!(repo.visual("vis-line").is_some());
    }

    #[test]
    fn missing_collection_fails_with_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PAGES_RESOURCE), "[]").unwrap();
        // visuals.json and derivations.json are absent

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, CorpusError::MissingResource(_)));
    }

    #[test]
    fn malformed_json_is_not_a_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PAGES_RESOURCE), "{not json").unwrap();
        std::fs::write(dir.path().join(VISUALS_RESOURCE), "[]").unwrap();
        std::fs::write(dir.path().join(DERIVATIONS_RESOURCE), "[]").unwrap();

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, CorpusError::Malformed { .. }));
    }

    #[test]
    fn duplicate_page_ids_fail() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(
            dir.path(),
            json!([page("pi", "Pi"), page("pi", "Pi Again")]),
            json!([visual("vis-line")]),
            json!([]),
        );

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, CorpusError::DuplicatePageId(id) if id == "pi"));
    }

    #[test]
    fn unresolvable_visual_reference_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(
            dir.path(),
            json!([page("pi", "Pi")]),
            json!([visual("vis-other")]),
            json!([]),
        );

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(
            matches!(err, CorpusError::MissingVisual { page_id, visual_id }
                if page_id == "pi" && visual_id == "vis-line")
        );
    }

    #[test]
    fn equation_without_derivation_field_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut eq = page("quadratic-formula", "Quadratic Formula");
        eq["type"] = json!("equation");
        write_corpus(
            dir.path(),
            json!([eq]),
            json!([visual("vis-line")]),
            json!([]),
        );

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(
            matches!(err, CorpusError::MissingDerivation { derivation_id: None, .. })
        );
    }

    #[test]
    fn equation_with_unresolvable_derivation_fails_with_the_offending_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut eq = page("quadratic-formula", "Quadratic Formula");
        eq["type"] = json!("equation");
        eq["derivationID"] = json!("deriv-ghost");
        write_corpus(
            dir.path(),
            json!([eq]),
            json!([visual("vis-line")]),
            json!([]),
        );

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(
            matches!(err, CorpusError::MissingDerivation { derivation_id: Some(id), .. }
                if id == "deriv-ghost")
        );
    }

    #[test]
    fn fixing_the_derivation_reference_allows_load_to_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let mut eq = page("quadratic-formula", "Quadratic Formula");
        eq["type"] = json!("equation");
        eq["derivationID"] = json!("deriv-qf");
        write_corpus(
            dir.path(),
            json!([eq]),
            json!([visual("vis-line")]),
            json!([derivation("deriv-qf")]),
        );

        let repo = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap();
        assert_eq!(repo.pages().len(), 1);
        assert!(repo.derivation("deriv-qf").is_some());
    }

    #[test]
    fn unknown_related_reference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = page("pi", "Pi");
        p["relatedPageIDs"] = json!(["tau"]);
        write_corpus(
            dir.path(),
            json!([p]),
            json!([visual("vis-line")]),
            json!([]),
        );

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(
            matches!(err, CorpusError::InvalidRelatedReference { related_id, .. }
                if related_id == "tau")
        );
    }

    #[test]
    fn parameter_default_outside_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = visual("vis-line");
        v["parameters"][0]["defaultValue"] = json!(9.0);
        write_corpus(dir.path(), json!([page("pi", "Pi")]), json!([v]), json!([]));

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(
            matches!(err, CorpusError::InvalidParameterRange { parameter_id, .. }
                if parameter_id == "a")
        );
    }

    #[test]
    fn stepless_derivation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = derivation("deriv-empty");
        d["steps"] = json!([]);
        write_corpus(
            dir.path(),
            json!([page("pi", "Pi")]),
            json!([visual("vis-line")]),
            json!([d]),
        );

        let err = Repository::load(&CorpusSource::Dir(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, CorpusError::EmptyDerivation(id) if id == "deriv-empty"));
    }

    #[test]
    fn bundled_corpus_loads_and_cross_validates() {
        let repo = Repository::load(&CorpusSource::Bundled).unwrap();
        assert!(!repo.pages().is_empty());
        for page in repo.pages() {
            assert!(repo.visual(&page.visual_spec_id).is_some());
            if page.is_equation() {
                let derivation_id = page.derivation_id.as_deref().unwrap();
                assert!(repo.derivation(derivation_id).is_some());
            }
        }
    }
}
