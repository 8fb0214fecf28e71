//! Integration tests for the index builder and query engine.
//!
//! These run the real Tantivy index through the public API, from raw post
//! records to ranked results.

use std::fs;
use std::path::PathBuf;

use blogsearch::corpus::{Corpus, PostRecord};
use blogsearch::index::{self, SearchDocument, build_search_index};
use blogsearch::search::{EngineState, MAX_RESULTS, QueryEngine};
use tempfile::TempDir;

fn document(slug: &str, title: &str, description: &str, content: &str, tags: &[&str], date: &str) -> SearchDocument {
    SearchDocument {
        slug: slug.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        date: date.to_string(),
    }
}

/// The two-post corpus used by the ranking scenarios.
fn rust_and_go() -> Vec<SearchDocument> {
    vec![
        document("a", "Rust ownership", "memory safety", "...", &["rust"], "2024-01-01"),
        document("b", "Go channels", "concurrency", "discusses rust briefly", &["go"], "2024-02-01"),
    ]
}

fn slugs(engine: &mut QueryEngine, query: &str) -> Vec<String> {
    engine
        .search(query)
        .into_iter()
        .map(|r| r.document.slug)
        .collect()
}

// =============================================================================
// Ranking Scenarios
// =============================================================================

mod ranking_tests {
    use super::*;

    #[test]
    fn title_and_tag_match_outranks_content_mention() {
        let mut engine: QueryEngine = QueryEngine::with_documents(rust_and_go());
        let results = engine.search("rust");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.slug, "a");
        assert_eq!(results[1].document.slug, "b");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn unknown_term_returns_nothing() {
        let mut engine: QueryEngine = QueryEngine::with_documents(rust_and_go());
        assert!(engine.search("zzzznonexistentterm").is_empty());
    }

    #[test]
    fn exact_title_ranks_its_document_first() {
        let mut docs = rust_and_go();
        docs.push(document(
            "c",
            "Async runtimes compared",
            "tokio and friends",
            "executors",
            &["async"],
            "2024-03-01",
        ));
        let mut engine: QueryEngine = QueryEngine::with_documents(docs);

        for title in ["Rust ownership", "Go channels", "Async runtimes compared"] {
            let results = engine.search(title);
            assert!(!results.is_empty(), "no results for {title}");
            assert_eq!(results[0].document.title, title);
        }
    }

    #[test]
    fn title_with_query_syntax_characters() {
        let mut engine: QueryEngine = QueryEngine::with_documents(vec![document(
            "colon",
            "Rust: the ownership chapter",
            "",
            "",
            &[],
            "",
        )]);
        assert_eq!(slugs(&mut engine, "Rust: the ownership chapter"), vec!["colon"]);
    }

    #[test]
    fn exact_titles_with_operator_characters() {
        let titles = [
            "Why NOT Rust",
            "Rust - the good parts",
            "Intro to -O2 flags",
            "Rust {macros}",
            "AND OR NOT",
            "C++ && Rust: a + b",
            "\"Quoted\" title (with parens)",
            "Arrays [brackets] and ^carets~",
            "Go channels",
            "Rust ownership",
            "title: field syntax",
            "!important notes",
        ];
        let docs: Vec<_> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| document(&format!("s{i}"), title, "", "", &[], ""))
            .collect();
        let mut engine: QueryEngine = QueryEngine::with_documents(docs);

        for (i, title) in titles.iter().enumerate() {
            let results = engine.search(title);
            assert!(!results.is_empty(), "no results for {title:?}");
            assert_eq!(
                results[0].document.slug,
                format!("s{i}"),
                "{title:?} did not rank its own post first"
            );
        }
    }

    #[test]
    fn scores_descend() {
        let docs: Vec<_> = (0..30)
            .map(|i| {
                let body = "rust ".repeat(i + 1);
                document(&format!("p{i}"), &format!("Post {i}"), "", &body, &[], "")
            })
            .collect();
        let mut engine: QueryEngine = QueryEngine::with_documents(docs);
        let results = engine.search("rust");

        assert_eq!(results.len(), MAX_RESULTS);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}

// =============================================================================
// Query Engine Behaviour
// =============================================================================

mod engine_tests {
    use super::*;

    #[test]
    fn blank_queries_return_nothing() {
        let mut engine: QueryEngine = QueryEngine::with_documents(rust_and_go());

        for query in ["", " ", "\t", "\n  \n"] {
            assert!(engine.search(query).is_empty());
        }
        assert_eq!(engine.state(), EngineState::Unindexed);
    }

    #[test]
    fn results_capped_for_broad_queries() {
        let docs: Vec<_> = (0..100)
            .map(|i| document(&format!("post-{i}"), "Weekly notes", "", "", &["notes"], ""))
            .collect();
        let mut engine: QueryEngine = QueryEngine::with_documents(docs);

        assert_eq!(engine.search("notes").len(), MAX_RESULTS);
    }

    #[test]
    fn rebuild_gives_identical_ranking() {
        let mut first: QueryEngine = QueryEngine::with_documents(rust_and_go());
        let mut second: QueryEngine = QueryEngine::with_documents(rust_and_go());

        assert_eq!(first.search("rust"), second.search("rust"));
        assert_eq!(first.search("rust"), first.search("rust"));
    }

    #[test]
    fn new_document_list_is_searched_after_swap() {
        let mut engine: QueryEngine = QueryEngine::with_documents(rust_and_go());
        assert_eq!(slugs(&mut engine, "rust"), vec!["a", "b"]);
        assert_eq!(engine.state(), EngineState::Indexed);

        engine.load_documents(vec![document("z", "Zig comptime", "", "", &["zig"], "")]);
        assert_eq!(engine.state(), EngineState::Unindexed);
        assert!(engine.search("rust").is_empty());
        assert_eq!(slugs(&mut engine, "zig"), vec!["z"]);
    }

    #[test]
    fn results_carry_full_documents() {
        let mut engine: QueryEngine = QueryEngine::with_documents(rust_and_go());
        let results = engine.search("channels");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document, rust_and_go()[1]);
    }
}

// =============================================================================
// Builder and Transport
// =============================================================================

mod pipeline_tests {
    use super::*;

    #[test]
    fn posts_directory_to_results() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(
            dir.join("rust-ownership.md"),
            "+++\ntitle = \"Rust ownership\"\ntags = [\"rust\"]\ndate = 2024-01-01\n+++\nBorrowing.",
        )
        .unwrap();
        fs::write(dir.join("untitled.md"), "No front matter, so no title.").unwrap();
        fs::write(
            dir.join("draft.md"),
            "+++\ntitle = \"Rust draft\"\ndraft = true\n+++\nwip",
        )
        .unwrap();

        let corpus = Corpus::load_dir(dir, false).unwrap();
        let docs = build_search_index(corpus.posts());
        assert_eq!(docs.len(), 1);

        let mut engine: QueryEngine = QueryEngine::with_documents(docs);
        let results = engine.search("rust");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.slug, "rust-ownership");
        assert_eq!(results[0].document.date, "2024-01-01");
    }

    #[test]
    fn snapshot_feeds_engine() {
        let temp = TempDir::new().unwrap();
        let path: PathBuf = temp.path().join("search-index.json");
        index::write_snapshot(&path, &rust_and_go()).unwrap();

        let mut engine: QueryEngine = QueryEngine::with_documents(index::load_snapshot(&path).unwrap());
        assert_eq!(slugs(&mut engine, "rust"), vec!["a", "b"]);
    }

    #[test]
    fn json_export_with_sparse_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("posts.json");
        fs::write(
            &path,
            r#"[
    {"slug": "a", "title": "Rust ownership", "tags": ["rust"]},
    {"title": "No slug"},
    {"slug": "c"},
    {"slug": "d", "title": "Odd tags", "tags": 7}
]"#,
        )
        .unwrap();

        let corpus = Corpus::load_json(&path).unwrap();
        let docs = build_search_index(corpus.posts());
        let got: Vec<_> = docs.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(got, vec!["a", "d"]);
        assert!(docs[1].tags.is_empty());
    }

    #[test]
    fn builder_keeps_input_order() {
        let posts: Vec<PostRecord> = ["c", "a", "b"]
            .iter()
            .map(|s| PostRecord {
                slug: Some((*s).to_string()),
                title: Some(s.to_uppercase()),
                ..Default::default()
            })
            .collect();

        let docs = build_search_index(&posts);
        let got: Vec<_> = docs.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(got, vec!["c", "a", "b"]);
    }
}
