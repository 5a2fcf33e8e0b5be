//! The orchestrating content store: owns the repository, search engine,
//! link resolver, query state, navigation history, and render caches.
//!
//! A single logical owner drives all mutation. Loads are atomic from the
//! consumer's view: either the previous state stays visible or the fully
//! validated new state replaces it; a failed load is an explicit error
//! state with `reload` as the retry entry point.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tracing::{debug, warn};

use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::history::NavigationHistory;
use crate::linker::LinkResolver;
use crate::markup;
use crate::model::{DerivationSpec, LinkedSegment, Page, VisualSpec};
use crate::normalize::normalize;
use crate::repository::{CorpusSource, Repository};
use crate::search::SearchEngine;

pub const SEARCH_RESULT_LIMIT: usize = 80;
pub const AUTOCOMPLETE_LIMIT: usize = 8;
const RENDER_CACHE_CAPACITY: usize = 256;

pub const DEEP_LINK_SCHEME: &str = "mathwiki";
const DEEP_LINK_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Pages surfaced on the home screen before any query is typed.
pub const FEATURED_PAGE_IDS: &[&str] = &[
    "quadratic-formula",
    "derivative-definition",
    "normal-distribution",
    "bayes-theorem",
    "pi",
];

/// Corpus load status as observed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

type SearchInput = (String, HashSet<String>);

pub struct ContentStore {
    source: CorpusSource,
    state: LoadState,
    repository: Option<Repository>,
    engine: Option<SearchEngine>,
    resolver: Option<LinkResolver>,
    query: String,
    selected_tags: HashSet<String>,
    search_results: Vec<String>,
    debouncer: Debouncer<SearchInput>,
    navigation_path: Vec<String>,
    history: NavigationHistory,
    render_cache: Mutex<LruCache<String, Vec<LinkedSegment>>>,
}

impl ContentStore {
    /// Creates a store over `source` and performs the initial load.
    pub fn new(source: CorpusSource) -> Self {
        let mut store = Self {
            source,
            state: LoadState::Loading,
            repository: None,
            engine: None,
            resolver: None,
            query: String::new(),
            selected_tags: HashSet::new(),
            search_results: Vec::new(),
            debouncer: Debouncer::new(SEARCH_DEBOUNCE),
            navigation_path: Vec::new(),
            history: NavigationHistory::new(),
            render_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(RENDER_CACHE_CAPACITY).expect("cache capacity is nonzero"),
            )),
        };
        store.reload();
        store
    }

    /// Store over the corpus compiled into the binary.
    pub fn bundled() -> Self {
        Self::new(CorpusSource::Bundled)
    }

    /// Drops all derived state and loads the corpus again. Also the retry
    /// entry point after a failed load.
    pub fn reload(&mut self) {
        self.state = LoadState::Loading;
        self.render_cache.lock().clear();

        match Repository::load(&self.source) {
            Ok(repository) => {
                self.engine = Some(SearchEngine::new(repository.pages()));
                self.resolver = Some(LinkResolver::new(repository.pages()));
                self.repository = Some(repository);
                self.state = LoadState::Ready;
                self.refresh_search_now();
            }
            Err(err) => {
                warn!(%err, "corpus load failed");
                self.repository = None;
                self.engine = None;
                self.resolver = None;
                self.search_results.clear();
                self.state = LoadState::Failed(err.to_string());
            }
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    pub fn load_error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    // --- corpus access -----------------------------------------------------

    /// All pages sorted by title; empty until a load succeeds.
    pub fn pages(&self) -> &[Page] {
        self.repository.as_ref().map(Repository::pages).unwrap_or_default()
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.repository.as_ref()?.page(id)
    }

    pub fn visual_for(&self, page: &Page) -> Option<&VisualSpec> {
        self.repository.as_ref()?.visual(&page.visual_spec_id)
    }

    pub fn derivation_for(&self, page: &Page) -> Option<&DerivationSpec> {
        let derivation_id = page.derivation_id.as_deref()?;
        self.repository.as_ref()?.derivation(derivation_id)
    }

    pub fn related_pages(&self, page: &Page) -> Vec<&Page> {
        page.related_page_ids
            .iter()
            .filter_map(|id| self.page(id))
            .collect()
    }

    pub fn featured_pages(&self) -> Vec<&Page> {
        FEATURED_PAGE_IDS.iter().filter_map(|id| self.page(id)).collect()
    }

    /// Distinct tags across the corpus, title-cased as authored, sorted.
    pub fn available_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .pages()
            .iter()
            .flat_map(|page| page.tags.iter().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        tags.sort();
        tags
    }

    // --- query state -------------------------------------------------------

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_tags(&self) -> &HashSet<String> {
        &self.selected_tags
    }

    /// Updates the query and schedules a debounced recomputation. A newer
    /// submission supersedes any pending one.
    pub fn set_query(&mut self, query: &str, now: Instant) {
        if self.query == query {
            return;
        }
        self.query = query.to_string();
        self.schedule_refresh(now);
    }

    pub fn toggle_tag(&mut self, tag: &str, now: Instant) {
        if !self.selected_tags.remove(tag) {
            self.selected_tags.insert(tag.to_string());
        }
        self.schedule_refresh(now);
    }

    fn schedule_refresh(&mut self, now: Instant) {
        let input = (self.query.clone(), self.selected_tags.clone());
        let token = self.debouncer.submit(input, now);
        debug!(token, "search recomputation scheduled");
    }

    /// Fires the pending recomputation once its debounce window elapses.
    /// Returns whether results were recomputed.
    pub fn poll_search(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some((query, tags)) => {
                self.refresh_search(&query, &tags);
                true
            }
            None => false,
        }
    }

    /// Recomputes immediately from the current query and tags, cancelling
    /// any pending debounced input.
    pub fn refresh_search_now(&mut self) {
        self.debouncer.cancel();
        let query = self.query.clone();
        let tags = self.selected_tags.clone();
        self.refresh_search(&query, &tags);
    }

    fn refresh_search(&mut self, query: &str, tags: &HashSet<String>) {
        let Some(engine) = &self.engine else {
            self.search_results.clear();
            return;
        };
        self.search_results = engine
            .search(query, tags, SEARCH_RESULT_LIMIT)
            .into_iter()
            .map(|page| page.id.clone())
            .collect();
    }

    pub fn search_results(&self) -> Vec<&Page> {
        self.search_results.iter().filter_map(|id| self.page(id)).collect()
    }

    /// The home list: with a blank query, the tag-filtered corpus in title
    /// order; otherwise the current search results.
    pub fn home_pages(&self) -> Vec<&Page> {
        if self.query.trim().is_empty() {
            let selected: HashSet<String> =
                self.selected_tags.iter().map(|tag| normalize(tag)).collect();
            return self
                .pages()
                .iter()
                .filter(|page| {
                    selected.is_empty()
                        || page.tags.iter().any(|tag| selected.contains(&normalize(tag)))
                })
                .collect();
        }
        self.search_results()
    }

    /// Top-scored suggestions for the current query; empty when blank.
    pub fn autocomplete(&self) -> Vec<&Page> {
        if self.query.trim().is_empty() {
            return Vec::new();
        }
        let Some(engine) = &self.engine else {
            return Vec::new();
        };
        engine.search(&self.query, &self.selected_tags, AUTOCOMPLETE_LIMIT)
    }

    // --- navigation --------------------------------------------------------

    pub fn navigation_path(&self) -> &[String] {
        &self.navigation_path
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.page(self.navigation_path.last()?)
    }

    /// Pushes a page onto the navigation path; unknown ids are ignored.
    pub fn open_page(&mut self, page_id: &str) {
        if self.page(page_id).is_none() {
            debug!(page_id, "ignoring navigation to unknown page");
            return;
        }
        self.navigation_path.push(page_id.to_string());
        let path = self.navigation_path.clone();
        self.history.record(&path);
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    pub fn go_back(&mut self) -> bool {
        let snapshot = self.history.back().map(|path| path.to_vec());
        match snapshot {
            Some(path) => {
                self.navigation_path = path;
                true
            }
            None => false,
        }
    }

    pub fn go_forward(&mut self) -> bool {
        let snapshot = self.history.forward().map(|path| path.to_vec());
        match snapshot {
            Some(path) => {
                self.navigation_path = path;
                true
            }
            None => false,
        }
    }

    // --- rendering ---------------------------------------------------------

    /// Rendered, link-resolved segments for a page's summary.
    pub fn linked_summary(&self, page_id: &str) -> Option<Vec<LinkedSegment>> {
        let page = self.page(page_id)?;
        let key = format!("summary:{page_id}");
        Some(self.linked_text(&page.summary_markdown, &key, page_id))
    }

    /// Renders markup and resolves links in `source`, caching the result
    /// under `cache_key`. Entries are pure functions of immutable inputs,
    /// so a redundant recompute is harmless; the cache is cleared on every
    /// corpus (re)load.
    pub fn linked_text(
        &self,
        source: &str,
        cache_key: &str,
        current_page_id: &str,
    ) -> Vec<LinkedSegment> {
        if let Some(cached) = self.render_cache.lock().get(cache_key) {
            return cached.clone();
        }

        let rendered = markup::render(source);
        let segments = match &self.resolver {
            Some(resolver) => resolver.linked_segments(&rendered, current_page_id),
            None => vec![LinkedSegment::plain(rendered)],
        };

        self.render_cache
            .lock()
            .put(cache_key.to_string(), segments.clone());
        segments
    }

    // --- deep links --------------------------------------------------------

    /// Address of a page in the `mathwiki://` scheme.
    pub fn page_deep_link(page_id: &str) -> String {
        format!(
            "{DEEP_LINK_SCHEME}://{}",
            utf8_percent_encode(page_id, DEEP_LINK_ENCODE)
        )
    }

    /// Extracts the page id from a `mathwiki://` URI; `None` for other
    /// schemes or an empty target.
    pub fn parse_deep_link(uri: &str) -> Option<String> {
        let rest = uri.strip_prefix("mathwiki://")?;
        let target = rest.trim_start_matches('/');
        let target = target.split('/').next().unwrap_or_default();
        if target.is_empty() {
            return None;
        }
        percent_decode_str(target)
            .decode_utf8()
            .ok()
            .map(|decoded| decoded.into_owned())
    }
}
