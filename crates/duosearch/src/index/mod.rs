//! Ranked full-text product index built on tantivy.
//!
//! The index holds a denormalized copy of the relational store: an analyzed
//! name field for ranked matching, a raw keyword copy of the name for exact
//! matching, the document's native id as a raw stored field, and the full
//! record serialized into a stored-only payload field.

pub use error::IndexError;
use error::Result;
use std::path::Path;
use tantivy::{
    Index, IndexWriter, TantivyDocument, Term,
    collector::TopDocs,
    query::Query,
    schema::{Field, IndexRecordOption, Schema, SchemaBuilder, TextFieldIndexing, TextOptions, Value},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    backend::{BackendError, ProductQuery, RankedBackend, RankedHit},
    model::Product,
};

mod query;

/// Name of the product index, used for directory naming.
pub const INDEX_NAME: &str = "products";

const WRITER_HEAP_BYTES: usize = 50_000_000;
const DEFAULT_RESULT_LIMIT: usize = 1_000;

#[derive(Debug, Clone, Copy)]
struct ProductFields {
    id: Field,
    name: Field,
    name_exact: Field,
    payload: Field,
}

/// Full-text search index over product documents.
#[derive(Debug, Clone)]
pub struct ProductIndex {
    index: Index,
    fields: ProductFields,
    result_limit: usize,
}

impl ProductIndex {
    /// Open the index under `dir`, creating it when absent.
    #[instrument(name = "Open ProductIndex", skip_all, fields(dir = ?dir.as_ref()))]
    pub fn open_or_create(dir: impl AsRef<Path>) -> Result<Self> {
        let index_path = dir.as_ref().join(INDEX_NAME);
        std::fs::create_dir_all(&index_path)?;

        let index = if index_path.join("meta.json").exists() {
            info!(path = ?index_path, "Loading existing product index.");
            Index::open_in_dir(&index_path)?
        } else {
            info!(path = ?index_path, "Creating new product index.");
            Index::create_in_dir(&index_path, Self::schema())?
        };

        Self::from_index(index)
    }

    /// Build a fresh in-RAM index. Useful for tests and short-lived runs.
    pub fn in_memory() -> Result<Self> {
        Self::from_index(Index::create_in_ram(Self::schema()))
    }

    /// Override the cap applied to every search.
    #[must_use]
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    fn from_index(index: Index) -> Result<Self> {
        let schema = index.schema();
        let fields = ProductFields {
            id: schema.get_field("id")?,
            name: schema.get_field("name")?,
            name_exact: schema.get_field("name_exact")?,
            payload: schema.get_field("payload")?,
        };
        Ok(Self {
            index,
            fields,
            result_limit: DEFAULT_RESULT_LIMIT,
        })
    }

    fn schema() -> Schema {
        let mut schema_builder = SchemaBuilder::new();

        // Analyzed text with position tracking for the ranked clauses
        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);

        // Exact matching for the keyword fields (no analysis)
        let keyword_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("raw")
                .set_index_option(IndexRecordOption::Basic),
        );

        schema_builder.add_text_field("id", keyword_options.clone().set_stored());
        schema_builder.add_text_field("name", text_options);
        schema_builder.add_text_field("name_exact", keyword_options);
        // Stored only, never queried: the serialized record itself
        schema_builder.add_text_field("payload", TextOptions::default().set_stored());
        schema_builder.build()
    }

    fn query_fields(&self) -> query::QueryFields {
        query::QueryFields {
            name: self.fields.name,
            name_exact: self.fields.name_exact,
        }
    }

    fn lower_query(&self, product_query: &ProductQuery) -> Result<Box<dyn Query>> {
        match product_query {
            ProductQuery::Exact { term } => query::build_exact(self.query_fields(), term),
            ProductQuery::Similar { term } => query::build_similar(self.query_fields(), term),
        }
    }

    #[instrument(name = "Search Product Index", skip(self), fields(query = product_query.term(), limit = self.result_limit))]
    fn search_inner(&self, product_query: &ProductQuery) -> Result<Vec<RankedHit>> {
        let tantivy_query = self.lower_query(product_query)?;

        let reader = self.index.reader()?;
        let searcher = reader.searcher();

        let t_search = std::time::Instant::now();
        let top_docs = searcher.search(&*tantivy_query, &TopDocs::with_limit(self.result_limit))?;
        debug!(
            num_results = top_docs.len(),
            search_execution_seconds = t_search.elapsed().as_secs_f32(),
            "Tantivy search execution complete"
        );

        top_docs
            .into_iter()
            .map(|(score, doc_address)| {
                let received_doc = searcher.doc::<TantivyDocument>(doc_address)?;
                let native_id = received_doc
                    .get_first(self.fields.id)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let payload = received_doc
                    .get_first(self.fields.payload)
                    .and_then(|v| v.as_str())
                    .and_then(|raw| match serde_json::from_str::<Product>(raw) {
                        Ok(product) => Some(product),
                        Err(e) => {
                            warn!(%native_id, error = %e, "Dropping hit with undeserializable payload");
                            None
                        }
                    });

                Ok(RankedHit {
                    native_id,
                    payload,
                    score,
                })
            })
            .collect::<Result<Vec<_>>>()
    }

    #[instrument(name = "Bulk Upsert", skip_all, fields(num_docs = docs.len()))]
    fn bulk_upsert_inner(&self, docs: &[(String, Product)]) -> Result<()> {
        let mut writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES)?;
        for (native_id, product) in docs {
            writer.delete_term(Term::from_field_text(self.fields.id, native_id));

            let mut doc = TantivyDocument::default();
            doc.add_text(self.fields.id, native_id);
            doc.add_text(self.fields.name, product.name());
            doc.add_text(self.fields.name_exact, product.name_exact());
            doc.add_text(self.fields.payload, serde_json::to_string(product)?);
            writer.add_document(doc)?;
        }
        writer.commit()?;
        debug!("batch committed");
        Ok(())
    }

    /// Number of live documents in the index.
    pub fn num_docs(&self) -> Result<u64> {
        Ok(self.index.reader()?.searcher().num_docs())
    }
}

impl RankedBackend for ProductIndex {
    fn search(
        &self,
        product_query: &ProductQuery,
    ) -> std::result::Result<Vec<RankedHit>, BackendError> {
        self.search_inner(product_query).map_err(From::from)
    }

    fn bulk_upsert(&self, docs: &[(String, Product)]) -> std::result::Result<(), BackendError> {
        self.bulk_upsert_inner(docs).map_err(From::from)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("Payload serialization error: {0}")]
        Payload(#[from] serde_json::Error),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
