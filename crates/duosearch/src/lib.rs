//! duosearch - Side-by-side product search comparison
//!
//! duosearch runs every search against two independent backends at once: a
//! relational exact matcher (a polars-backed store) and a full-text ranked
//! index (tantivy). Both result sets come back together with per-backend
//! latency, so the two retrieval strategies can be compared on real data.
//!
//! # Quick Start
//!
//! ```rust
//! use duosearch::{Product, ProductSearcher, SearchRequest};
//!
//! let searcher = ProductSearcher::with_products(vec![
//!     Product::new("Widget", "A plain widget", "tools", 9.99),
//!     Product::new("Blue Widget Pro", "A fancy widget", "tools", 29.99),
//! ])?;
//!
//! // Synchronize the relational store into the ranked index once.
//! searcher.run_indexing(false)?;
//!
//! // Strict comparison: exact matching on both sides.
//! let result = searcher.compare(&SearchRequest::new("Widget"));
//! assert_eq!(result.relational_results.len(), 1);
//!
//! // Similar (fuzzy) comparison on the ranked side.
//! let result = searcher.compare(&SearchRequest::new("Widget").fuzzy(true));
//! assert_eq!(result.ranked_results.len(), 2);
//! # Ok::<(), duosearch::error::DuosearchError>(())
//! ```
//!
//! # Features
//!
//! - **Dual execution**: one request, two independent backends, two timed
//!   result sets; a failure in either backend never suppresses the other.
//! - **Two query shapes**: strict exact matching, or a boosted multi-clause
//!   similar query tolerant of prefix and partial matches.
//! - **Id reconciliation**: ranked hits are normalized back to canonical
//!   numeric ids, with malformed native ids forced to unset instead of
//!   propagated.
//! - **One-shot bulk indexing**: the relational store is synchronized into
//!   the ranked index in fixed-size batches, exactly once per process unless
//!   explicitly forced.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod backend;
mod config;
mod core;
pub mod error;
mod index;
mod indexer;
mod model;
mod search;
mod store;

pub use backend::{
    BackendError, Page, PageRequest, ProductQuery, RankedBackend, RankedHit, RelationalBackend,
};
pub use config::{SearcherConfig, SearcherConfigBuilder};
pub use core::{ProductSearcher, ProductSearcherBuilder};
pub use index::{INDEX_NAME, IndexError, ProductIndex};
pub use indexer::{BulkIndexer, DEFAULT_BATCH_SIZE, IndexerError, IndexingState};
pub use model::Product;
pub use polars;
pub use search::{
    ComparisonResult, DEFAULT_PAGE_SIZE, NO_MATCHES_MESSAGE, SearchError, SearchRequest,
};
pub use store::{ProductStore, StoreError};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the duosearch library.
///
/// Sets up structured logging with configurable levels and filtering. Call
/// this once at the start of your application to enable detailed logging
/// output from duosearch operations.
///
/// # Examples
///
/// ```rust
/// use duosearch::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), duosearch::error::DuosearchError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::DuosearchError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse().unwrap());

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    fn sample_products() -> Vec<Product> {
        vec![
            Product::new("Widget", "A plain widget", "tools", 9.99),
            Product::new("Blue Widget Pro", "A fancy widget", "tools", 29.99),
            Product::new("Gadget", "Unrelated", "gadgets", 4.50),
        ]
    }

    #[test]
    fn test_searcher_creation() {
        setup_test_env();

        let searcher = ProductSearcher::with_products(sample_products());
        assert!(
            searcher.is_ok(),
            "Should be able to create searcher with test data"
        );
    }

    #[test]
    fn test_strict_comparison() {
        setup_test_env();

        let searcher = ProductSearcher::with_products(sample_products()).unwrap();
        searcher.run_indexing(false).unwrap();

        let result = searcher.compare(&SearchRequest::new("Widget"));
        assert_eq!(result.relational_results.len(), 1);
        assert_eq!(result.ranked_results.len(), 1);
        assert!(result.message.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_similar_comparison() {
        setup_test_env();

        let searcher = ProductSearcher::with_products(sample_products()).unwrap();
        searcher.run_indexing(false).unwrap();

        let result = searcher.compare(&SearchRequest::new("widget").fuzzy(true));
        assert_eq!(result.ranked_results.len(), 2, "both widgets should rank");
    }

    #[test]
    fn test_blank_query() {
        setup_test_env();

        let searcher = ProductSearcher::with_products(sample_products()).unwrap();
        searcher.run_indexing(false).unwrap();

        let result = searcher.compare(&SearchRequest::empty());
        assert!(result.relational_results.is_empty());
        assert!(result.ranked_results.is_empty());
        assert_eq!(result.message.as_deref(), Some(NO_MATCHES_MESSAGE));
    }

    #[test]
    fn test_builder_runs_indexing() {
        setup_test_env();

        let searcher = ProductSearcherBuilder::new()
            .products(sample_products())
            .build()
            .unwrap();
        assert!(searcher.indexing_complete());
    }
}
