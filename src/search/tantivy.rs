//! Tantivy-based text index with field-weighted BM25 ranking.
//!
//! The index lives in RAM and is rebuilt from scratch for every document
//! list; posts number in the hundreds, so a build is cheap.

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer, TokenStream,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use crate::index::SearchDocument;
use crate::search::{Hit, SearchError, TextIndex};

/// Heap size for the index writer (50MB).
const WRITER_HEAP_SIZE: usize = 50_000_000;

/// Name of the stemming analyzer registered on every index.
const TOKENIZER: &str = "en_stem";

/// Tokens longer than this are dropped.
const MAX_TOKEN_LENGTH: usize = 40;

pub const TITLE_BOOST: f32 = 10.0;
pub const DESCRIPTION_BOOST: f32 = 5.0;
pub const TAGS_BOOST: f32 = 3.0;
pub const CONTENT_BOOST: f32 = 1.0;

/// Schema field handles.
#[derive(Debug, Clone, Copy)]
struct SchemaFields {
    slug: Field,
    title: Field,
    description: Field,
    tags: Field,
    content: Field,
}

/// In-memory Tantivy index over search documents.
///
/// Fields:
/// - `slug`: exact-match reference key, stored
/// - `title`, `description`, `tags`, `content`: stemmed full text
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
}

impl TantivyIndex {
    fn build_schema() -> (Schema, SchemaFields) {
        let mut schema_builder = Schema::builder();

        let text = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let slug = schema_builder.add_text_field("slug", STRING | STORED);
        let title = schema_builder.add_text_field("title", text.clone());
        let description = schema_builder.add_text_field("description", text.clone());
        let tags = schema_builder.add_text_field("tags", text.clone());
        let content = schema_builder.add_text_field("content", text);

        let schema = schema_builder.build();
        let fields = SchemaFields {
            slug,
            title,
            description,
            tags,
            content,
        };

        (schema, fields)
    }

    fn register_tokenizers(index: &Index) {
        let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
            .filter(LowerCaser)
            .filter(Stemmer::new(tantivy::tokenizer::Language::English))
            .build();
        index.tokenizers().register(TOKENIZER, en_stem);
    }

    fn to_tantivy_doc(&self, doc: &SearchDocument) -> TantivyDocument {
        let mut tantivy_doc = TantivyDocument::new();
        tantivy_doc.add_text(self.fields.slug, &doc.slug);
        tantivy_doc.add_text(self.fields.title, &doc.title);
        tantivy_doc.add_text(self.fields.description, &doc.description);
        for tag in &doc.tags {
            tantivy_doc.add_text(self.fields.tags, tag);
        }
        tantivy_doc.add_text(self.fields.content, &doc.content);
        tantivy_doc
    }

    /// Text fields with their boosts, strongest first.
    fn weighted_fields(&self) -> [(Field, f32); 4] {
        let f = self.fields;
        [
            (f.title, TITLE_BOOST),
            (f.description, DESCRIPTION_BOOST),
            (f.tags, TAGS_BOOST),
            (f.content, CONTENT_BOOST),
        ]
    }

    /// Run the query text through the indexing analyzer.
    ///
    /// Operator characters (`-`, `:`, quotes, brackets) split tokens like any
    /// other punctuation and words such as `NOT` are ordinary terms.
    fn query_terms(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let mut analyzer = self.index.tokenizer_for_field(self.fields.title)?;
        let mut stream = analyzer.token_stream(query);

        let mut terms: Vec<String> = Vec::new();
        while stream.advance() {
            let text = &stream.token().text;
            if !terms.contains(text) {
                terms.push(text.clone());
            }
        }
        Ok(terms)
    }

    /// Any term in any field; scores of every matching clause add up.
    fn build_query(&self, terms: &[String]) -> BooleanQuery {
        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .flat_map(|term| {
                self.weighted_fields().into_iter().map(move |(field, boost)| {
                    let term_query = TermQuery::new(
                        Term::from_field_text(field, term),
                        IndexRecordOption::WithFreqs,
                    );
                    (
                        Occur::Should,
                        Box::new(BoostQuery::new(Box::new(term_query), boost)) as Box<dyn Query>,
                    )
                })
            })
            .collect();

        BooleanQuery::new(clauses)
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl TextIndex for TantivyIndex {
    fn build(documents: &[SearchDocument]) -> Result<Self, SearchError> {
        let (schema, fields) = Self::build_schema();
        let index = Index::create_in_ram(schema);
        Self::register_tokenizers(&index);

        // One indexing thread keeps a single segment in insertion order, so
        // ties and scores come out the same on every build.
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_SIZE)?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let built = Self {
            index,
            reader,
            fields,
        };

        for doc in documents {
            writer.add_document(built.to_tantivy_doc(doc))?;
        }
        writer.commit()?;
        built.reader.reload()?;

        debug!(documents = documents.len(), "built search index");
        Ok(built)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Hit>, SearchError> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }

        let terms = self.query_terms(query)?;
        if terms.is_empty() {
            debug!(query, "query has no indexable terms");
            return Ok(vec![]);
        }
        let term_query = self.build_query(&terms);

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&term_query, &TopDocs::with_limit(limit.max(1)))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let key = doc
                .get_first(self.fields.slug)
                .and_then(|v| v.as_str())
                .ok_or(SearchError::MissingField("slug"))?;
            hits.push(Hit {
                key: key.to_string(),
                score,
            });
        }

        Ok(hits)
    }
}
