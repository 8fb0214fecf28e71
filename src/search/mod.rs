//! Full-text search over search documents.
//!
//! [`TextIndex`] is the seam to the underlying indexing library;
//! [`engine::QueryEngine`] owns one index per reading session and turns its
//! raw hits into ranked [`QueryResult`]s.

pub mod engine;
pub mod tantivy;

pub use engine::{EngineState, MAX_RESULTS, QueryEngine};
pub use self::tantivy::TantivyIndex;

use crate::index::SearchDocument;

/// Errors raised by an index implementation.
///
/// These never leave [`QueryEngine`]; it logs them and answers with no
/// results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Index error: {0}")]
    Tantivy(#[from] ::tantivy::TantivyError),

    #[error("Document is missing stored field '{0}'")]
    MissingField(&'static str),
}

/// A raw match from the index: the document's slug and its relevance.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub key: String,
    pub score: f32,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub document: SearchDocument,
    /// Relevance; not shown to readers, only used for ordering.
    pub score: f32,
}

/// Trait for full-text indexes the engine can drive.
pub trait TextIndex: Sized {
    /// Build an index over `documents`, keyed by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be constructed.
    fn build(documents: &[SearchDocument]) -> Result<Self, SearchError>;

    /// Run `query`, returning at most `limit` hits by descending score.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Hit>, SearchError>;
}
