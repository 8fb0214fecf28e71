//! Command implementations shared by CLI and MCP server.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::corpus::{Corpus, Page, PostRecord};
use crate::index::{self, SearchDocument};
use crate::search::{EngineState, QueryEngine, QueryResult};

/// Number of tags shown per result.
const RESULT_TAG_LIMIT: usize = 3;

/// Posts per page when a listing is paginated.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Where a search session gets its documents from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Build documents from posts (directory or JSON export).
    Content { path: PathBuf, include_drafts: bool },
    /// Read a previously written JSON snapshot.
    Snapshot(PathBuf),
}

impl DocumentSource {
    /// Pick a source from explicit CLI overrides, falling back to config.
    #[must_use]
    pub fn resolve(config: &Config, content: Option<PathBuf>, snapshot: Option<PathBuf>) -> Self {
        match (snapshot, content) {
            (Some(path), _) => Self::Snapshot(path),
            (None, Some(path)) => Self::Content {
                path,
                include_drafts: config.content.include_drafts,
            },
            (None, None) => Self::Content {
                path: config.content_dir(),
                include_drafts: config.content.include_drafts,
            },
        }
    }

    /// Where listings and full posts are read from for this source.
    ///
    /// A content source lists the same posts it searches; a snapshot carries
    /// no bodies, so the configured content location is used.
    #[must_use]
    pub fn posts_location(&self, config: &Config) -> (PathBuf, bool) {
        match self {
            Self::Content {
                path,
                include_drafts,
            } => (path.clone(), *include_drafts),
            Self::Snapshot(_) => (config.content_dir(), config.content.include_drafts),
        }
    }

    /// Fetch the document list.
    ///
    /// # Errors
    ///
    /// Returns an error if the posts or snapshot cannot be read.
    pub fn load(&self) -> anyhow::Result<Vec<SearchDocument>> {
        match self {
            Self::Content {
                path,
                include_drafts,
            } => build_documents(path, *include_drafts),
            Self::Snapshot(path) => Ok(index::load_snapshot(path)?),
        }
    }
}

/// A reader's search session: one engine plus whether its documents
/// could be fetched at all.
pub struct SearchSession {
    engine: QueryEngine,
    unavailable: Option<String>,
}

impl SearchSession {
    /// Open a session. A failed document fetch leaves the session in a
    /// degraded state where every query returns nothing.
    #[must_use]
    pub fn open(source: &DocumentSource) -> Self {
        match source.load() {
            Ok(documents) => {
                info!(documents = documents.len(), "search documents loaded");
                Self {
                    engine: QueryEngine::with_documents(documents),
                    unavailable: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to load search documents");
                Self {
                    engine: QueryEngine::new(),
                    unavailable: Some(e.to_string()),
                }
            }
        }
    }

    /// Why search is unavailable, if it is.
    #[must_use]
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Build the index ahead of the first query.
    pub fn prepare(&mut self) -> bool {
        self.engine.prepare()
    }

    pub fn search(&mut self, query: &str) -> Vec<QueryResult> {
        self.engine.search(query)
    }

    /// Swap in a fresh document list, e.g. after content changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read; the current documents
    /// stay in place.
    pub fn reload(&mut self, source: &DocumentSource) -> anyhow::Result<()> {
        let documents = source.load()?;
        self.engine.load_documents(documents);
        self.unavailable = None;
        Ok(())
    }
}

/// Message shown instead of results when documents could not be fetched.
#[must_use]
pub fn unavailable_message(reason: &str) -> String {
    format!("Search unavailable: {reason}")
}

/// Render results for display.
#[must_use]
pub fn render_results(query: &str, results: &[QueryResult]) -> String {
    if results.is_empty() {
        return format!("No results for '{query}'");
    }

    let mut output = String::new();
    for result in results {
        let doc = &result.document;
        let _ = writeln!(output, "## {}", doc.title);
        let _ = write!(output, "/blog/{}", doc.slug);
        if !doc.date.is_empty() {
            let _ = write!(output, "  {}", display_date(&doc.date));
        }
        output.push('\n');
        if !doc.description.is_empty() {
            let _ = writeln!(output, "{}", doc.description);
        }
        if !doc.tags.is_empty() {
            let tags: Vec<&str> = doc
                .tags
                .iter()
                .take(RESULT_TAG_LIMIT)
                .map(String::as_str)
                .collect();
            let _ = writeln!(output, "[{}]", tags.join(", "));
        }
        output.push('\n');
    }
    let _ = write!(output, "{} result(s) found", results.len());

    output
}

/// Calendar part of an ISO-8601 timestamp.
fn display_date(date: &str) -> &str {
    date.split_once('T').map_or(date, |(day, _)| day)
}

/// Build the search documents for a content location.
///
/// # Errors
///
/// Returns an error if the posts cannot be loaded.
pub fn build_documents(content: &Path, include_drafts: bool) -> anyhow::Result<Vec<SearchDocument>> {
    let corpus = Corpus::load(content, include_drafts)?;
    let documents = index::build_search_index(corpus.posts());
    info!(
        posts = corpus.posts().len(),
        documents = documents.len(),
        "built search documents"
    );
    Ok(documents)
}

/// Build the snapshot and write it to `output`.
///
/// # Returns
///
/// The number of documents written.
///
/// # Errors
///
/// Returns an error if the posts cannot be loaded or the file cannot be
/// written.
pub fn write_index(content: &Path, include_drafts: bool, output: &Path) -> anyhow::Result<usize> {
    let documents = build_documents(content, include_drafts)?;
    index::write_snapshot(output, &documents)?;
    Ok(documents.len())
}

/// Summary of a post for listings.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    /// e.g. `"5 min"`.
    pub reading_time: String,
}

impl PostSummary {
    fn from_post(post: &PostRecord) -> Self {
        Self {
            slug: post.slug.clone().unwrap_or_default(),
            title: post.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            date: post.date.clone().unwrap_or_default(),
            tags: post.tags.clone().unwrap_or_default(),
            reading_time: post.reading_time(),
        }
    }
}

/// List posts, newest first, optionally only those carrying `tag`.
///
/// # Errors
///
/// Returns an error if the posts cannot be loaded.
pub fn list(content: &Path, include_drafts: bool, tag: Option<&str>) -> anyhow::Result<Vec<PostSummary>> {
    let corpus = Corpus::load(content, include_drafts)?;
    let posts: Vec<&PostRecord> = match tag {
        Some(tag) => corpus.with_tag(tag),
        None => corpus.posts().iter().collect(),
    };
    Ok(posts.into_iter().map(PostSummary::from_post).collect())
}

/// One page of [`list`].
///
/// # Errors
///
/// Returns an error if the posts cannot be loaded.
pub fn list_page(
    content: &Path,
    include_drafts: bool,
    tag: Option<&str>,
    page: usize,
    page_size: usize,
) -> anyhow::Result<Page<PostSummary>> {
    Ok(Page::of(list(content, include_drafts, tag)?, page, page_size))
}

/// All tags used by published posts.
///
/// # Errors
///
/// Returns an error if the posts cannot be loaded.
pub fn tags(content: &Path, include_drafts: bool) -> anyhow::Result<Vec<String>> {
    Ok(Corpus::load(content, include_drafts)?.tags())
}

/// Get the body of a post by slug.
///
/// # Errors
///
/// Returns an error if the posts cannot be loaded or no post has `slug`.
pub fn get(content: &Path, include_drafts: bool, slug: &str) -> anyhow::Result<String> {
    let corpus = Corpus::load(content, include_drafts)?;
    let Some(post) = corpus.find(slug) else {
        anyhow::bail!("Post not found: {slug}");
    };
    Ok(post.content.clone().unwrap_or_default())
}
