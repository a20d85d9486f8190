//! The main [`ProductSearcher`] facade.
//!
//! A searcher owns one relational backend and one ranked backend behind their
//! abstract contracts, plus the bulk indexer that synchronizes the former
//! into the latter once per process lifetime.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::{
    backend::{RankedBackend, RelationalBackend},
    config::SearcherConfig,
    error::DuosearchError,
    index::ProductIndex,
    indexer::BulkIndexer,
    model::Product,
    search::{ComparisonResult, SEARCH_FAILED_MESSAGE, SearchRequest, compare_inner},
    store::ProductStore,
};

/// Side-by-side product searcher over a relational store and a ranked index.
///
/// # Examples
///
/// ```rust
/// use duosearch::{Product, ProductSearcher, SearchRequest};
///
/// let searcher = ProductSearcher::with_products(vec![
///     Product::new("Widget", "A widget", "tools", 9.99),
/// ])?;
/// searcher.run_indexing(false)?;
///
/// let result = searcher.compare(&SearchRequest::new("Widget"));
/// assert_eq!(result.relational_results.len(), 1);
/// # Ok::<(), duosearch::error::DuosearchError>(())
/// ```
pub struct ProductSearcher {
    relational: Arc<dyn RelationalBackend>,
    ranked: Arc<dyn RankedBackend>,
    indexer: BulkIndexer,
}

impl ProductSearcher {
    /// Assemble a searcher from pre-built backends.
    pub fn new(
        relational: Arc<dyn RelationalBackend>,
        ranked: Arc<dyn RankedBackend>,
        batch_size: usize,
    ) -> Self {
        let indexer = BulkIndexer::new(Arc::clone(&relational), Arc::clone(&ranked), batch_size);
        Self {
            relational,
            ranked,
            indexer,
        }
    }

    /// Build a searcher over the given records with the default
    /// configuration: in-RAM ranked index, default batch size.
    #[instrument(name = "Create ProductSearcher", skip_all, fields(num_products = products.len()))]
    pub fn with_products(products: Vec<Product>) -> Result<Self, DuosearchError> {
        Self::with_config(products, &SearcherConfig::default())
    }

    /// Build a searcher over the given records with explicit configuration.
    pub fn with_config(
        products: Vec<Product>,
        config: &SearcherConfig,
    ) -> Result<Self, DuosearchError> {
        let store = ProductStore::from_products(products)?;
        let index = match &config.index_dir {
            Some(dir) => ProductIndex::open_or_create(dir)?,
            None => ProductIndex::in_memory()?,
        };
        let index = index.with_result_limit(config.ranked_result_limit);

        info!(store_records = store.len(), "ProductSearcher assembled");
        Ok(Self::new(
            Arc::new(store),
            Arc::new(index),
            config.batch_size,
        ))
    }

    /// Run both backends for one logical request and merge the outcome.
    ///
    /// Never returns an error: per-backend failures degrade that backend's
    /// contribution to an empty list, and anything unexpected beyond that is
    /// reported through the result's `error` field.
    #[instrument(name = "Compare Search", skip(self), fields(strict = request.strict, page = request.page))]
    pub fn compare(&self, request: &SearchRequest) -> ComparisonResult {
        match compare_inner(self.relational.as_ref(), self.ranked.as_ref(), request) {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Error during search comparison");
                ComparisonResult {
                    current_page: request.page,
                    error: Some(SEARCH_FAILED_MESSAGE.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    /// Synchronize the relational store into the ranked index.
    ///
    /// Idempotent per process unless `force` is passed; see
    /// [`BulkIndexer::run`] for the failure semantics.
    pub fn run_indexing(&self, force: bool) -> Result<(), DuosearchError> {
        self.indexer.run(force).map_err(From::from)
    }

    /// Whether a full bulk load has completed in this process.
    pub fn indexing_complete(&self) -> bool {
        self.indexer.is_complete()
    }
}

/// Builder for a [`ProductSearcher`] mirroring the bootstrap collaborator:
/// by default the bulk load runs as part of `build`, and a failure there is
/// surfaced as fatal.
#[derive(Debug, Clone)]
pub struct ProductSearcherBuilder {
    products: Vec<Product>,
    config: SearcherConfig,
    index_on_build: bool,
}

impl ProductSearcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            config: SearcherConfig::default(),
            index_on_build: true,
        }
    }

    #[must_use]
    pub fn products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    #[must_use]
    pub fn config(mut self, config: SearcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Skip the bulk load during `build`; call
    /// [`ProductSearcher::run_indexing`] later instead.
    #[must_use]
    pub fn defer_indexing(mut self) -> Self {
        self.index_on_build = false;
        self
    }

    pub fn build(self) -> Result<ProductSearcher, DuosearchError> {
        let searcher = ProductSearcher::with_config(self.products, &self.config)?;
        if self.index_on_build {
            searcher.run_indexing(false)?;
        }
        Ok(searcher)
    }
}

impl Default for ProductSearcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
