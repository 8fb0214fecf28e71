//! Search document construction and the JSON snapshot handed to readers.
//!
//! The builder reduces full post records to the six fields search needs.
//! Posts without a slug or title are not searchable and are dropped
//! without error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::corpus::PostRecord;

/// Errors reading or writing a search snapshot.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Search snapshot not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to access search snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed search snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// One searchable post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Unique, non-empty key linking back to the post.
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Raw body text, not rendered HTML.
    pub content: String,
    pub tags: Vec<String>,
    /// ISO-8601 date; display only.
    pub date: String,
}

impl SearchDocument {
    /// Convert a post record, or `None` if it lacks a slug or title.
    #[must_use]
    pub fn from_post(post: &PostRecord) -> Option<Self> {
        let slug = non_blank(post.slug.as_deref())?;
        let title = non_blank(post.title.as_deref())?;

        Some(Self {
            slug: slug.to_string(),
            title: title.to_string(),
            description: post.description.clone().unwrap_or_default(),
            content: post.content.clone().unwrap_or_default(),
            tags: post.tags.clone().unwrap_or_default(),
            date: post.date.clone().unwrap_or_default(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build the searchable document list from a post collection.
///
/// Output follows input order. A later post reusing an earlier slug is
/// dropped so slugs stay unique.
#[must_use]
pub fn build_search_index(posts: &[PostRecord]) -> Vec<SearchDocument> {
    let documents = posts.iter().filter_map(|post| {
        let doc = SearchDocument::from_post(post);
        if doc.is_none() {
            debug!(slug = ?post.slug, "post without slug or title left out of search");
        }
        doc
    });

    unique_searchable(documents)
}

/// Keep documents with a non-blank slug and title, first of each slug only.
fn unique_searchable(documents: impl IntoIterator<Item = SearchDocument>) -> Vec<SearchDocument> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for doc in documents {
        if non_blank(Some(&doc.slug)).is_none() || non_blank(Some(&doc.title)).is_none() {
            debug!(slug = %doc.slug, "document without slug or title left out of search");
            continue;
        }

        if !seen.insert(doc.slug.clone()) {
            debug!(slug = %doc.slug, "duplicate slug left out of search");
            continue;
        }

        kept.push(doc);
    }

    kept
}

/// Serialize documents as the JSON array served to readers.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(documents: &[SearchDocument]) -> Result<String, IndexError> {
    Ok(serde_json::to_string(documents)?)
}

/// Parse a JSON snapshot.
///
/// Snapshots may be edited by hand, so entries with a blank slug or title
/// and repeated slugs are dropped the same way the builder drops them.
///
/// # Errors
///
/// Returns `IndexError::Json` if the input is not an array of documents.
pub fn from_json(json: &str) -> Result<Vec<SearchDocument>, IndexError> {
    let documents: Vec<SearchDocument> = serde_json::from_str(json)?;
    Ok(unique_searchable(documents))
}

/// Write a snapshot file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_snapshot(path: &Path, documents: &[SearchDocument]) -> Result<(), IndexError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(documents)?)?;
    Ok(())
}

/// Read a snapshot file.
///
/// # Errors
///
/// Returns `IndexError::NotFound` if the file doesn't exist, otherwise any
/// read or parse failure.
pub fn load_snapshot(path: &Path) -> Result<Vec<SearchDocument>, IndexError> {
    if !path.exists() {
        return Err(IndexError::NotFound(path.to_path_buf()));
    }
    from_json(&fs::read_to_string(path)?)
}
