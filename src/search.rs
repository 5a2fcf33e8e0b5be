//! Search index and ranking engine.
//!
//! The index is rebuilt from scratch on every corpus load and is immutable
//! afterwards; `search` is a pure function of (index, query, tags, limit).

use std::collections::HashSet;

use crate::model::{Page, SearchIndexEntry};
use crate::normalize::{normalize, title_cmp};

const TITLE_PREFIX_SCORE: i32 = 120;
const TITLE_SUBSTRING_SCORE: i32 = 80;
const ALIAS_PREFIX_SCORE: i32 = 70;
const ALIAS_SUBSTRING_SCORE: i32 = 40;
const TAG_PREFIX_SCORE: i32 = 30;
const TAG_SUBSTRING_SCORE: i32 = 15;

/// Ranks pages against free-text queries and tag filters.
pub struct SearchEngine {
    pages: Vec<Page>,
    index: Vec<SearchIndexEntry>,
}

impl SearchEngine {
    /// Builds one index entry per page from its normalized title, aliases,
    /// and tags.
    pub fn new(pages: &[Page]) -> Self {
        let index = pages
            .iter()
            .map(|page| SearchIndexEntry {
                page_id: page.id.clone(),
                title_normalized: normalize(&page.title),
                aliases_normalized: page.aliases.iter().map(|a| normalize(a)).collect(),
                tags_normalized: page.tags.iter().map(|t| normalize(t)).collect(),
            })
            .collect();
        Self {
            pages: pages.to_vec(),
            index,
        }
    }

    pub fn index(&self) -> &[SearchIndexEntry] {
        &self.index
    }

    /// Scores and ranks pages. An empty normalized query scores the whole
    /// tag-filtered set equally rather than returning nothing; a non-empty
    /// tag filter excludes pages sharing none of the filter tags.
    pub fn search(&self, query: &str, tags: &HashSet<String>, limit: usize) -> Vec<&Page> {
        let normalized_query = normalize(query);
        let normalized_tags: HashSet<String> = tags.iter().map(|t| normalize(t)).collect();

        let mut scored: Vec<(&Page, i32)> = self
            .index
            .iter()
            .zip(&self.pages)
            .filter_map(|(entry, page)| {
                if !normalized_tags.is_empty()
                    && !entry
                        .tags_normalized
                        .iter()
                        .any(|tag| normalized_tags.contains(tag))
                {
                    return None;
                }

                if normalized_query.is_empty() {
                    return Some((page, 1));
                }

                let score = compute_score(entry, &normalized_query);
                (score > 0).then_some((page, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| title_cmp(&a.0.title, &b.0.title)));
        scored.truncate(limit);
        scored.into_iter().map(|(page, _)| page).collect()
    }
}

/// Additive across the title/alias/tag categories, exclusive within each:
/// only the best match per category counts.
fn compute_score(entry: &SearchIndexEntry, query: &str) -> i32 {
    let mut score = 0;

    if entry.title_normalized.starts_with(query) {
        score += TITLE_PREFIX_SCORE;
    } else if entry.title_normalized.contains(query) {
        score += TITLE_SUBSTRING_SCORE;
    }

    if entry.aliases_normalized.iter().any(|a| a.starts_with(query)) {
        score += ALIAS_PREFIX_SCORE;
    } else if entry.aliases_normalized.iter().any(|a| a.contains(query)) {
        score += ALIAS_SUBSTRING_SCORE;
    }

    if entry.tags_normalized.iter().any(|t| t.starts_with(query)) {
        score += TAG_PREFIX_SCORE;
    } else if entry.tags_normalized.iter().any(|t| t.contains(query)) {
        score += TAG_SUBSTRING_SCORE;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageType;

    fn page(id: &str, title: &str, aliases: &[&str], tags: &[&str]) -> Page {
        Page {
            id: id.to_string(),
            title: title.to_string(),
            page_type: PageType::Concept,
            summary_markdown: String::new(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            related_page_ids: vec![],
            visual_spec_id: "vis".to_string(),
            derivation_id: None,
        }
    }

    fn fixture() -> SearchEngine {
        SearchEngine::new(&[
            page(
                "quadratic-formula",
                "Quadratic Formula",
                &["abc formula"],
                &["Algebra"],
            ),
            page(
                "bayes-theorem",
                "Bayes' Theorem",
                &["conditional probability rule"],
                &["Statistics"],
            ),
            page("pi", "Pi", &["circle constant"], &["Geometry"]),
        ])
    }

    fn ids<'a>(pages: Vec<&'a Page>) -> Vec<&'a str> {
        pages.into_iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn empty_query_returns_everything_sorted_by_title() {
        let engine = fixture();
        let results = engine.search("", &HashSet::new(), 40);
        assert_eq!(ids(results), ["bayes-theorem", "pi", "quadratic-formula"]);
    }

    #[test]
    fn empty_query_still_honors_the_tag_filter() {
        let engine = fixture();
        let tags: HashSet<String> = ["algebra".to_string()].into();
        let results = engine.search("", &tags, 40);
        assert_eq!(ids(results), ["quadratic-formula"]);
    }

    #[test]
    fn tag_filter_excludes_pages_with_no_overlap() {
        let engine = fixture();
        let tags: HashSet<String> = ["Statistics".to_string()].into();
        let results = engine.search("formula", &tags, 40);
        assert!(results.is_empty());
    }

    #[test]
    fn title_prefix_outranks_alias_substring() {
        let engine = fixture();
        // "quadratic" is a title prefix of one page and nothing else.
        let results = engine.search("quadratic", &HashSet::new(), 40);
        assert_eq!(ids(results), ["quadratic-formula"]);

        // "formula" hits Quadratic Formula's title as a substring (80) and
        // its alias as a substring (40): still a single result, score 120.
        let results = engine.search("formula", &HashSet::new(), 40);
        assert_eq!(ids(results), ["quadratic-formula"]);
    }

    #[test]
    fn alias_substring_ranks_below_title_prefix() {
        let engine = SearchEngine::new(&[
            page("pi", "Pi", &[], &[]),
            page("tau", "Tau", &["about pi doubled"], &[]),
        ]);
        let results = engine.search("pi", &HashSet::new(), 40);
        // Title prefix (120) before alias substring (40).
        assert_eq!(ids(results), ["pi", "tau"]);
    }

    #[test]
    fn categories_are_additive() {
        let engine = SearchEngine::new(&[
            // title prefix (120) + tag prefix (30)
            page("a", "Sigma Notation", &[], &["sigma rules"]),
            // title prefix (120) only
            page("b", "Sigma Algebra", &[], &["measure"]),
        ]);
        let results = engine.search("sigma", &HashSet::new(), 40);
        assert_eq!(ids(results), ["a", "b"]);
    }

    #[test]
    fn zero_score_pages_are_excluded() {
        let engine = fixture();
        let results = engine.search("nonexistent topic", &HashSet::new(), 40);
        assert!(results.is_empty());
    }

    #[test]
    fn ties_break_by_case_insensitive_title() {
        let engine = SearchEngine::new(&[
            page("b", "beta decay", &[], &[]),
            page("a", "Beta Function", &[], &[]),
        ]);
        let results = engine.search("beta", &HashSet::new(), 40);
        assert_eq!(ids(results), ["b", "a"]);
    }

    #[test]
    fn results_truncate_to_limit() {
        let engine = fixture();
        let results = engine.search("", &HashSet::new(), 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn query_normalization_matches_index_normalization() {
        let engine = fixture();
        let results = engine.search("BAYES_THEOREM", &HashSet::new(), 40);
        assert_eq!(ids(results), ["bayes-theorem"]);
    }
}
