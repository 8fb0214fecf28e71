//! Per-session query engine.
//!
//! The engine holds the current document list and builds its text index
//! lazily, on the first query after the list changes:
//!
//! ```text
//! Uninitialized --load--> Unindexed --query--> Indexed --query--> Indexed
//!                             ^                   |
//!                             +------load---------+
//! ```
//!
//! `destroy` moves any state to `Destroyed`, which is terminal.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::index::SearchDocument;
use crate::search::{Hit, QueryResult, SearchError, TantivyIndex, TextIndex};

/// Maximum number of results returned for a query.
pub const MAX_RESULTS: usize = 20;

/// Observable lifecycle state of a [`QueryEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No document list has been received.
    Uninitialized,
    /// Documents are loaded; the index will be built on the next query.
    Unindexed,
    /// The index is built and reused by every query.
    Indexed,
    /// Documents and index have been released.
    Destroyed,
}

/// Documents plus the slug lookup used to resolve hits.
#[derive(Debug)]
struct Documents {
    list: Vec<SearchDocument>,
    by_slug: HashMap<String, usize>,
}

impl Documents {
    fn new(list: Vec<SearchDocument>) -> Self {
        let mut by_slug = HashMap::with_capacity(list.len());
        for (position, doc) in list.iter().enumerate() {
            by_slug.entry(doc.slug.clone()).or_insert(position);
        }
        Self { list, by_slug }
    }

    fn get(&self, slug: &str) -> Option<&SearchDocument> {
        self.by_slug.get(slug).map(|&position| &self.list[position])
    }
}

enum State<I> {
    Uninitialized,
    Unindexed(Documents),
    Indexed {
        documents: Documents,
        index: I,
    },
    Destroyed,
}

impl<I> Default for State<I> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// Answers free-text queries against one document list.
///
/// Search never fails from the caller's point of view: empty queries,
/// missing documents and index errors all produce an empty result list.
pub struct QueryEngine<I: TextIndex = TantivyIndex> {
    state: State<I>,
    generation: u64,
}

impl<I: TextIndex> Default for QueryEngine<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: TextIndex> QueryEngine<I> {
    /// Create an engine with no documents.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
            generation: 0,
        }
    }

    /// Create an engine already holding `documents`.
    #[must_use]
    pub fn with_documents(documents: Vec<SearchDocument>) -> Self {
        let mut engine = Self::new();
        engine.load_documents(documents);
        engine
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        match self.state {
            State::Uninitialized => EngineState::Uninitialized,
            State::Unindexed(_) => EngineState::Unindexed,
            State::Indexed { .. } => EngineState::Indexed,
            State::Destroyed => EngineState::Destroyed,
        }
    }

    /// Number of document lists loaded so far. Bumps whenever the list
    /// actually changes.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current document list, if any.
    #[must_use]
    pub fn documents(&self) -> Option<&[SearchDocument]> {
        match &self.state {
            State::Unindexed(documents) | State::Indexed { documents, .. } => {
                Some(&documents.list)
            }
            State::Uninitialized | State::Destroyed => None,
        }
    }

    /// Replace the document list.
    ///
    /// Any built index is discarded and rebuilt on the next query, unless the
    /// new list equals the current one. Ignored once the engine is destroyed.
    pub fn load_documents(&mut self, documents: Vec<SearchDocument>) {
        match &self.state {
            State::Destroyed => {
                warn!("document list offered to a destroyed query engine");
                return;
            }
            State::Unindexed(current) | State::Indexed { documents: current, .. }
                if current.list == documents =>
            {
                debug!("document list unchanged, keeping index");
                return;
            }
            _ => {}
        }

        self.generation += 1;
        debug!(
            generation = self.generation,
            documents = documents.len(),
            "document list replaced"
        );
        self.state = State::Unindexed(Documents::new(documents));
    }

    /// Build the index now instead of on the next query.
    ///
    /// Returns `true` if an index is ready afterwards.
    pub fn prepare(&mut self) -> bool {
        match self.ensure_indexed() {
            Ok(()) => matches!(self.state, State::Indexed { .. }),
            Err(e) => {
                warn!(error = %e, "failed to build search index");
                false
            }
        }
    }

    /// Run a free-text query.
    ///
    /// Returns at most [`MAX_RESULTS`] results by descending score. Blank
    /// queries return nothing without touching the index.
    pub fn search(&mut self, query: &str) -> Vec<QueryResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        match self.try_search(query) {
            Ok(results) => results,
            Err(e) => {
                warn!(query, error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Release documents and index. The engine answers nothing afterwards.
    pub fn destroy(&mut self) {
        self.state = State::Destroyed;
    }

    fn try_search(&mut self, query: &str) -> Result<Vec<QueryResult>, SearchError> {
        self.ensure_indexed()?;

        let State::Indexed { documents, index } = &self.state else {
            return Ok(Vec::new());
        };

        // Fetch every hit; the page is cut after unresolved keys are dropped.
        let hits = index.search(query, documents.list.len().max(1))?;
        Ok(resolve(documents, hits))
    }

    fn ensure_indexed(&mut self) -> Result<(), SearchError> {
        if let State::Unindexed(documents) = &self.state {
            let index = I::build(&documents.list)?;
            if let State::Unindexed(documents) = std::mem::take(&mut self.state) {
                self.state = State::Indexed { documents, index };
            }
        }
        Ok(())
    }
}

/// Map hits back to documents, dropping unknown and repeated keys.
fn resolve(documents: &Documents, hits: Vec<Hit>) -> Vec<QueryResult> {
    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(hits.len().min(MAX_RESULTS));

    for hit in hits {
        let Some(document) = documents.get(&hit.key) else {
            debug!(key = %hit.key, "hit does not resolve to a document");
            continue;
        };
        if !seen.insert(hit.key) {
            continue;
        }

        results.push(QueryResult {
            document: document.clone(),
            score: hit.score,
        });
        if results.len() == MAX_RESULTS {
            break;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    thread_local! {
        static BUILDS: Cell<usize> = const { Cell::new(0) };
        static SEARCHES: Cell<usize> = const { Cell::new(0) };
    }

    /// Index that matches every document whose title contains the query,
    /// plus a phantom key that no document owns.
    struct StubIndex {
        documents: Vec<SearchDocument>,
    }

    impl TextIndex for StubIndex {
        fn build(documents: &[SearchDocument]) -> Result<Self, SearchError> {
            BUILDS.with(|b| b.set(b.get() + 1));
            Ok(Self {
                documents: documents.to_vec(),
            })
        }

        fn search(&self, query: &str, limit: usize) -> Result<Vec<Hit>, SearchError> {
            SEARCHES.with(|s| s.set(s.get() + 1));
            if query == "explode" {
                return Err(SearchError::MissingField("slug"));
            }

            let mut hits: Vec<Hit> = self
                .documents
                .iter()
                .filter(|d| d.title.contains(query))
                .map(|d| Hit {
                    key: d.slug.clone(),
                    score: 1.0,
                })
                .take(limit)
                .collect();
            hits.insert(
                0,
                Hit {
                    key: "ghost".to_string(),
                    score: 100.0,
                },
            );
            Ok(hits)
        }
    }

    /// Index whose construction always fails.
    struct BrokenIndex;

    impl TextIndex for BrokenIndex {
        fn build(_documents: &[SearchDocument]) -> Result<Self, SearchError> {
            Err(SearchError::MissingField("slug"))
        }

        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Hit>, SearchError> {
            Ok(vec![])
        }
    }

    fn doc(slug: &str, title: &str) -> SearchDocument {
        SearchDocument {
            slug: slug.to_string(),
            title: title.to_string(),
            description: String::new(),
            content: String::new(),
            tags: vec![],
            date: String::new(),
        }
    }

    fn builds() -> usize {
        BUILDS.with(Cell::get)
    }

    fn searches() -> usize {
        SEARCHES.with(Cell::get)
    }

    #[test]
    fn lifecycle_states() {
        let mut engine: QueryEngine<StubIndex> = QueryEngine::new();
        assert_eq!(engine.state(), EngineState::Uninitialized);

        engine.load_documents(vec![doc("a", "alpha")]);
        assert_eq!(engine.state(), EngineState::Unindexed);

        engine.search("alpha");
        assert_eq!(engine.state(), EngineState::Indexed);

        engine.load_documents(vec![doc("b", "beta")]);
        assert_eq!(engine.state(), EngineState::Unindexed);

        engine.destroy();
        assert_eq!(engine.state(), EngineState::Destroyed);
        assert!(engine.documents().is_none());
    }

    #[test]
    fn index_built_once_per_document_list() {
        let mut engine: QueryEngine<StubIndex> =
            QueryEngine::with_documents(vec![doc("a", "alpha")]);
        assert_eq!(builds(), 0);

        engine.search("alpha");
        engine.search("alp");
        engine.search("beta");
        assert_eq!(builds(), 1);

        engine.load_documents(vec![doc("a", "alpha"), doc("b", "beta")]);
        engine.search("beta");
        assert_eq!(builds(), 2);
    }

    #[test]
    fn unchanged_document_list_keeps_index() {
        let docs = vec![doc("a", "alpha")];
        let mut engine: QueryEngine<StubIndex> = QueryEngine::with_documents(docs.clone());
        engine.search("alpha");
        let generation = engine.generation();

        engine.load_documents(docs);
        assert_eq!(engine.state(), EngineState::Indexed);
        assert_eq!(engine.generation(), generation);
        engine.search("alpha");
        assert_eq!(builds(), 1);
    }

    #[test]
    fn blank_query_skips_index() {
        let mut engine: QueryEngine<StubIndex> =
            QueryEngine::with_documents(vec![doc("a", "alpha")]);

        assert!(engine.search("").is_empty());
        assert!(engine.search("   \t\n").is_empty());
        assert_eq!(builds(), 0);
        assert_eq!(searches(), 0);
        assert_eq!(engine.state(), EngineState::Unindexed);
    }

    #[test]
    fn no_documents_no_results() {
        let mut engine: QueryEngine<StubIndex> = QueryEngine::new();
        assert!(engine.search("alpha").is_empty());
        assert_eq!(builds(), 0);
    }

    #[test]
    fn unresolved_keys_are_dropped() {
        let mut engine: QueryEngine<StubIndex> =
            QueryEngine::with_documents(vec![doc("a", "alpha"), doc("b", "alphabet")]);

        let results = engine.search("alpha");
        let slugs: Vec<_> = results.iter().map(|r| r.document.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b"]);
    }

    #[test]
    fn search_errors_become_empty_results() {
        let mut engine: QueryEngine<StubIndex> =
            QueryEngine::with_documents(vec![doc("a", "explode")]);
        assert!(engine.search("explode").is_empty());
        assert_eq!(engine.state(), EngineState::Indexed);
    }

    #[test]
    fn build_errors_become_empty_results() {
        let mut engine: QueryEngine<BrokenIndex> =
            QueryEngine::with_documents(vec![doc("a", "alpha")]);
        assert!(engine.search("alpha").is_empty());
        assert!(!engine.prepare());
        assert_eq!(engine.state(), EngineState::Unindexed);
    }

    #[test]
    fn results_capped() {
        let docs: Vec<_> = (0..50).map(|i| doc(&format!("p{i}"), "common")).collect();
        let mut engine: QueryEngine<StubIndex> = QueryEngine::with_documents(docs);
        assert_eq!(engine.search("common").len(), MAX_RESULTS);
    }

    #[test]
    fn prepare_builds_eagerly() {
        let mut engine: QueryEngine<StubIndex> =
            QueryEngine::with_documents(vec![doc("a", "alpha")]);
        assert!(engine.prepare());
        assert_eq!(engine.state(), EngineState::Indexed);
        engine.search("alpha");
        assert_eq!(builds(), 1);
    }

    #[test]
    fn destroyed_engine_ignores_loads() {
        let mut engine: QueryEngine<StubIndex> =
            QueryEngine::with_documents(vec![doc("a", "alpha")]);
        engine.destroy();
        engine.load_documents(vec![doc("a", "alpha")]);

        assert_eq!(engine.state(), EngineState::Destroyed);
        assert!(engine.search("alpha").is_empty());
    }

    #[test]
    fn duplicate_hits_are_collapsed() {
        let documents = Documents::new(vec![doc("a", "alpha")]);
        let hits = vec![
            Hit {
                key: "a".into(),
                score: 2.0,
            },
            Hit {
                key: "a".into(),
                score: 1.0,
            },
        ];
        let results = resolve(&documents, hits);
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 2.0).abs() < f32::EPSILON);
    }
}
