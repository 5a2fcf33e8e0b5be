//! Core engine for a bundled math topic wiki: corpus loading and
//! validation, search ranking, in-text wiki-link resolution, math-markup
//! rendering, and the orchestrating content store.
//!
//! The corpus is loaded once per (re)load and immutable afterwards; the
//! search index and link dictionary are derived from it atomically. The
//! presentation layer (CLI, or anything else) talks only to
//! [`store::ContentStore`].

pub mod debounce;
pub mod error;
pub mod history;
pub mod linker;
pub mod markup;
pub mod model;
pub mod normalize;
pub mod repository;
pub mod search;
pub mod store;
pub mod visual;

pub use error::CorpusError;
pub use linker::LinkResolver;
pub use model::{
    DerivationSpec, DerivationStep, LinkedSegment, Page, PageType, SearchIndexEntry, VisualKind,
    VisualParameter, VisualSpec,
};
pub use repository::{CorpusSource, Repository};
pub use search::SearchEngine;
pub use store::{ContentStore, LoadState};
