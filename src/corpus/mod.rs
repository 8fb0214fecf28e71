//! Blog post corpus loading.
//!
//! A corpus is either a directory of `.md`/`.mdx` posts with YAML or TOML
//! front matter, or a JSON export of post records. Every field of a record is
//! optional; deciding what is searchable is left to [`crate::index`].

pub mod frontmatter;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use self::frontmatter::{Block, Format};

/// File extensions recognised as posts.
const POST_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Reading speed used for the computed reading time.
const WORDS_PER_MINUTE: usize = 200;

/// Errors that can occur when loading a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read corpus: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse corpus: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Errors parsing a post's front matter block.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("Invalid TOML front matter: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A raw post as supplied by the content source.
///
/// Fields are all optional: content comes from hand-written front matter
/// and database exports, and either may leave things out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tags; anything other than a list of strings is treated as absent.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
    /// ISO-8601 date, passed through as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Author-supplied reading time such as `"5 min"`.
    #[serde(
        default,
        alias = "readingTime",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub reading_time: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

impl PostRecord {
    /// Reading time for display: the author's value, else computed from the
    /// body (`"N min"`).
    #[must_use]
    pub fn reading_time(&self) -> String {
        match &self.reading_time {
            Some(text) if !text.trim().is_empty() => text.clone(),
            _ => format!(
                "{} min",
                reading_minutes(self.content.as_deref().unwrap_or_default())
            ),
        }
    }
}

/// Whole minutes needed to read `text`, rounded up.
///
/// Whitespace-separated runs count as one word each; CJK characters count
/// as a word apiece.
#[must_use]
pub fn reading_minutes(text: &str) -> usize {
    let mut words: usize = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk(c) {
            words += 1;
            in_word = false;
        } else if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            words += 1;
            in_word = true;
        }
    }

    words.div_ceil(WORDS_PER_MINUTE)
}

fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{3040}'..='\u{30ff}'
            | '\u{3400}'..='\u{4dbf}'
            | '\u{4e00}'..='\u{9fff}'
            | '\u{ac00}'..='\u{d7af}'
            | '\u{f900}'..='\u{faff}'
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Other(IgnoredAny),
}

/// Deserialize `T`, treating a value of any other shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Value(value) => Some(value),
        Lenient::Other(_) => None,
    })
}

/// A front matter date as written in a particular format.
trait DateValue {
    fn into_date(self) -> Option<String>;
}

impl DateValue for toml::Value {
    fn into_date(self) -> Option<String> {
        match self {
            Self::String(s) => Some(s),
            Self::Datetime(dt) => Some(dt.to_string()),
            _ => None,
        }
    }
}

impl DateValue for serde_yaml::Value {
    fn into_date(self) -> Option<String> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Front matter block of a post file. `D` is the format's own value type,
/// so bare TOML dates and unquoted YAML dates both survive.
#[derive(Debug, Deserialize)]
struct FrontMatter<D> {
    slug: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    tags: Option<Vec<String>>,
    date: Option<D>,
    #[serde(default, alias = "readingTime", deserialize_with = "lenient")]
    reading_time: Option<String>,
    #[serde(default)]
    draft: bool,
}

impl<D: DateValue> FrontMatter<D> {
    fn into_record(self) -> PostRecord {
        PostRecord {
            slug: self.slug,
            title: self.title,
            description: self.description,
            content: None,
            tags: self.tags,
            date: self.date.and_then(DateValue::into_date),
            reading_time: self.reading_time,
            draft: self.draft,
        }
    }
}

/// Parse a post file into a record.
///
/// `stem` is the file name without extension and becomes the slug when the
/// front matter does not set one.
///
/// # Errors
///
/// Returns an error if the front matter is not valid YAML or TOML.
pub fn parse_post(stem: &str, source: &str) -> Result<PostRecord, FrontMatterError> {
    let (front, body) = frontmatter::split(source);
    let record = match front {
        Some(block) if block.text.trim().is_empty() => PostRecord::default(),
        Some(Block {
            format: Format::Toml,
            text,
        }) => toml::from_str::<FrontMatter<toml::Value>>(text)?.into_record(),
        Some(Block {
            format: Format::Yaml,
            text,
        }) => serde_yaml::from_str::<FrontMatter<serde_yaml::Value>>(text)?.into_record(),
        None => PostRecord::default(),
    };

    Ok(PostRecord {
        slug: record.slug.or_else(|| Some(stem.to_string())),
        content: Some(body.to_string()),
        ..record
    })
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    /// Number of items across all pages.
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cut page `page` (1-based) of `page_size` items out of `items`.
    ///
    /// Page 0 is read as page 1 and a zero page size as 1. A page past the
    /// end is empty but still reports the totals.
    #[must_use]
    pub fn of(items: Vec<T>, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = items.len();
        let start = (page - 1).saturating_mul(page_size);

        Self {
            items: items.into_iter().skip(start).take(page_size).collect(),
            page,
            total,
            total_pages: total.div_ceil(page_size),
        }
    }
}

/// A loaded post corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Directory or file the posts were read from.
    pub source: PathBuf,
    posts: Vec<PostRecord>,
}

impl Corpus {
    /// Wrap already-loaded records.
    #[must_use]
    pub fn from_posts(source: PathBuf, posts: Vec<PostRecord>) -> Self {
        Self { source, posts }
    }

    /// Load every post file directly inside `dir`.
    ///
    /// A missing directory is an empty corpus. Files that cannot be read or
    /// whose front matter is malformed are skipped with a warning. Drafts are
    /// dropped unless `include_drafts` is set. Posts are ordered newest first.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::ReadError` if the directory cannot be listed.
    pub fn load_dir(dir: &Path, include_drafts: bool) -> Result<Self, CorpusError> {
        if !dir.exists() {
            debug!(dir = %dir.display(), "content directory missing, corpus is empty");
            return Ok(Self::from_posts(dir.to_path_buf(), Vec::new()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_post_file(path))
            .collect();
        files.sort();

        let mut posts = Vec::with_capacity(files.len());
        for path in files {
            let source = match fs::read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read post");
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            match parse_post(&stem, &source) {
                Ok(post) if post.draft && !include_drafts => {
                    debug!(path = %path.display(), "skipping draft");
                }
                Ok(post) => posts.push(post),
                Err(e) => warn!(path = %path.display(), error = %e, "malformed front matter"),
            }
        }

        sort_newest_first(&mut posts);
        Ok(Self::from_posts(dir.to_path_buf(), posts))
    }

    /// Load a JSON array of post records, e.g. a database export.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::NotFound` if the file doesn't exist,
    /// `CorpusError::ReadError` if it cannot be read and
    /// `CorpusError::ParseError` if the JSON is invalid.
    pub fn load_json(path: &Path) -> Result<Self, CorpusError> {
        if !path.exists() {
            return Err(CorpusError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let posts: Vec<PostRecord> = serde_json::from_str(&contents)?;

        Ok(Self::from_posts(path.to_path_buf(), posts))
    }

    /// Load from a directory or a `.json` export, whichever `path` is.
    /// Drafts are dropped from either unless `include_drafts` is set.
    ///
    /// # Errors
    ///
    /// See [`Corpus::load_dir`] and [`Corpus::load_json`].
    pub fn load(path: &Path, include_drafts: bool) -> Result<Self, CorpusError> {
        if path.extension().is_some_and(|ext| ext == "json") {
            let mut corpus = Self::load_json(path)?;
            if !include_drafts {
                corpus.posts.retain(|post| !post.draft);
            }
            Ok(corpus)
        } else {
            Self::load_dir(path, include_drafts)
        }
    }

    #[must_use]
    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    /// Find a post by slug.
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&PostRecord> {
        self.posts
            .iter()
            .find(|post| post.slug.as_deref() == Some(slug))
    }

    /// All distinct tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.posts
            .iter()
            .flat_map(|post| post.tags.iter().flatten())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// One page of posts, newest first.
    #[must_use]
    pub fn page(&self, page: usize, page_size: usize) -> Page<&PostRecord> {
        Page::of(self.posts.iter().collect(), page, page_size)
    }

    /// Posts carrying `tag`.
    #[must_use]
    pub fn with_tag(&self, tag: &str) -> Vec<&PostRecord> {
        self.posts
            .iter()
            .filter(|post| post.tags.iter().flatten().any(|t| t == tag))
            .collect()
    }
}

fn is_post_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| POST_EXTENSIONS.contains(&ext))
}

/// Newest first; undated posts go last.
fn sort_newest_first(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}
