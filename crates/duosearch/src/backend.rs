//! Abstract contracts for the two search backends.
//!
//! The orchestrator and the bulk indexer depend only on these traits, never
//! on the concrete polars store or tantivy index. This keeps the comparison
//! logic testable against mock providers and keeps either backend swappable.

use thiserror::Error;

use crate::model::Product;

/// Zero-based pagination request for the relational backend.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    #[must_use]
    pub fn of(page: usize, size: usize) -> Self {
        Self { page, size }
    }
}

/// One page of relational results plus the totals the comparison reports.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: usize,
    pub total_elements: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            total_elements: 0,
        }
    }
}

/// A single hit from the ranked backend, before id reconciliation.
///
/// `native_id` is whatever identifier the index stored for the document; it
/// may diverge in format from the canonical numeric id. `payload` is `None`
/// when the stored document could not be deserialized.
#[derive(Debug, Clone)]
pub struct RankedHit {
    pub native_id: String,
    pub payload: Option<Product>,
    pub score: f32,
}

/// The two query shapes the orchestrator can ask the ranked backend for.
///
/// Construction of the actual weighted index query is the backend's concern;
/// this type only records which shape was requested and for which term.
#[derive(Debug, Clone)]
pub enum ProductQuery {
    /// Single exact-term match against the non-analyzed name field.
    Exact { term: String },
    /// Boosted multi-clause query tolerant of prefix and partial matches.
    Similar { term: String },
}

impl ProductQuery {
    pub fn exact(term: impl Into<String>) -> Self {
        Self::Exact { term: term.into() }
    }

    pub fn similar(term: impl Into<String>) -> Self {
        Self::Similar { term: term.into() }
    }

    pub fn term(&self) -> &str {
        match self {
            Self::Exact { term } | Self::Similar { term } => term,
        }
    }
}

/// The relational exact/substring query provider.
pub trait RelationalBackend: Send + Sync {
    /// Case-insensitive full-field equality match on `name`, paginated.
    fn exact_search(&self, term: &str, page: PageRequest) -> Result<Page<Product>, BackendError>;

    /// Full unpaginated scan. Used only by the bulk indexer.
    fn fetch_all(&self) -> Result<Vec<Product>, BackendError>;
}

/// The full-text ranked search provider.
pub trait RankedBackend: Send + Sync {
    /// Execute a query, returning scored hits in descending relevance order,
    /// up to the backend's own result cap. Not paginated.
    fn search(&self, query: &ProductQuery) -> Result<Vec<RankedHit>, BackendError>;

    /// Upsert a batch of documents keyed by their native id. Fails as a unit
    /// per batch.
    fn bulk_upsert(&self, docs: &[(String, Product)]) -> Result<(), BackendError>;
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("relational store error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("ranked index error: {0}")]
    Index(#[from] crate::index::IndexError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
