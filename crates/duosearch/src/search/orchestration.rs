//! Side-by-side comparison of the two backends for a single request.
//!
//! Both backends are queried independently and in parallel, each timed over
//! its own span only. A failure in either backend degrades that backend's
//! contribution to an empty list and never suppresses the other backend's
//! result; only the caller-facing wrapper in [`crate::ProductSearcher`]
//! attaches the generic error indicator for truly unexpected failures.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use super::{Result, reconcile::reconcile};
use crate::{
    backend::{Page, PageRequest, ProductQuery, RankedBackend, RelationalBackend},
    model::Product,
};

/// Informational message set when both backends come back empty.
pub const NO_MATCHES_MESSAGE: &str = "No matches found.";
/// Generic indicator attached by the top-level guard, never raised.
pub(crate) const SEARCH_FAILED_MESSAGE: &str = "An error occurred during the search operation";

/// Page size applied when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// A single logical search request, fanned out to both backends.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Optional query text; blank or absent means "no filter" and
    /// short-circuits both backends to empty results.
    pub query: Option<String>,
    /// Zero-based page, applied to the relational backend only.
    pub page: usize,
    pub size: usize,
    /// Selects the exact (strict) versus similar query shape on the ranked
    /// path.
    pub strict: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            strict: true,
        }
    }

    /// A request with no query text at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            query: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            strict: true,
        }
    }

    #[must_use]
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Convenience for callers that think in the presentation layer's terms:
    /// fuzzy is the negation of strict.
    #[must_use]
    pub fn fuzzy(self, fuzzy: bool) -> Self {
        self.strict(!fuzzy)
    }
}

/// The merged outcome of querying both backends.
///
/// Pagination metadata is sourced from the relational backend only; the
/// ranked backend is unpaginated. All failure is expressed inside this
/// structure, never as an error raised to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    pub relational_results: Vec<Product>,
    pub ranked_results: Vec<Product>,
    /// Wall-clock span of the relational call alone, in milliseconds.
    pub relational_time_ms: u64,
    /// Wall-clock span of the ranked call alone, in milliseconds.
    pub ranked_time_ms: u64,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_elements: u64,
    /// Set only when both backends return empty.
    pub message: Option<String>,
    /// Set only by the top-level guard on unexpected failure.
    pub error: Option<String>,
}

pub(crate) fn compare_inner(
    relational: &dyn RelationalBackend,
    ranked: &dyn RankedBackend,
    request: &SearchRequest,
) -> Result<ComparisonResult> {
    if request.size == 0 {
        return Err(anyhow::anyhow!("page size must be positive").into());
    }

    let term = request.query.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        debug!("Blank query, short-circuiting both backends");
        return Ok(ComparisonResult {
            current_page: request.page,
            message: Some(NO_MATCHES_MESSAGE.to_string()),
            ..Default::default()
        });
    }

    // Independent calls with no data dependency; each closure times only its
    // own backend and neither can cancel the other.
    let ((relational_page, relational_time_ms), (ranked_results, ranked_time_ms)) = rayon::join(
        || relational_step(relational, term, request),
        || ranked_step(ranked, term, request.strict),
    );

    let mut result = ComparisonResult {
        relational_results: relational_page.content,
        ranked_results,
        relational_time_ms,
        ranked_time_ms,
        current_page: request.page,
        total_pages: relational_page.total_pages,
        total_elements: relational_page.total_elements,
        message: None,
        error: None,
    };

    if result.relational_results.is_empty() && result.ranked_results.is_empty() {
        result.message = Some(NO_MATCHES_MESSAGE.to_string());
    }

    Ok(result)
}

fn relational_step(
    relational: &dyn RelationalBackend,
    term: &str,
    request: &SearchRequest,
) -> (Page<Product>, u64) {
    let start = Instant::now();
    let page = match relational.exact_search(term, PageRequest::of(request.page, request.size)) {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "Relational backend failed, degrading to empty result");
            Page::default()
        }
    };
    (page, start.elapsed().as_millis() as u64)
}

fn ranked_step(ranked: &dyn RankedBackend, term: &str, strict: bool) -> (Vec<Product>, u64) {
    let start = Instant::now();
    let product_query = if strict {
        ProductQuery::exact(term)
    } else {
        ProductQuery::similar(term)
    };
    let products = match ranked.search(&product_query) {
        Ok(hits) => hits.into_iter().filter_map(reconcile).collect(),
        Err(e) => {
            warn!(error = %e, "Ranked backend failed, degrading to empty result");
            Vec::new()
        }
    };
    (products, start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use std::{
        result::Result,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::backend::{BackendError, RankedHit};

    #[derive(Default)]
    struct MockRelational {
        products: Vec<Product>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl RelationalBackend for MockRelational {
        fn exact_search(
            &self,
            term: &str,
            page: PageRequest,
        ) -> Result<Page<Product>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow::anyhow!("relational backend down").into());
            }
            let matched: Vec<Product> = self
                .products
                .iter()
                .filter(|p| p.name().eq_ignore_ascii_case(term))
                .cloned()
                .collect();
            let total_elements = matched.len() as u64;
            let total_pages = matched.len().div_ceil(page.size);
            Ok(Page {
                content: matched,
                total_pages,
                total_elements,
            })
        }

        fn fetch_all(&self) -> Result<Vec<Product>, BackendError> {
            Ok(self.products.clone())
        }
    }

    #[derive(Default)]
    struct MockRanked {
        hits: Vec<RankedHit>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl RankedBackend for MockRanked {
        fn search(&self, _query: &ProductQuery) -> Result<Vec<RankedHit>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow::anyhow!("ranked backend down").into());
            }
            Ok(self.hits.clone())
        }

        fn bulk_upsert(&self, _docs: &[(String, Product)]) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn widget() -> Product {
        Product::new("Widget", "A widget", "tools", 9.99).with_id(7)
    }

    fn widget_hit() -> RankedHit {
        RankedHit {
            native_id: "7".to_string(),
            payload: Some(widget()),
            score: 1.2,
        }
    }

    #[test]
    fn blank_query_skips_both_backends() {
        let relational = MockRelational::default();
        let ranked = MockRanked::default();

        for request in [
            SearchRequest::empty(),
            SearchRequest::new("   "),
            SearchRequest::new(""),
        ] {
            let result = compare_inner(&relational, &ranked, &request).unwrap();
            assert!(result.relational_results.is_empty());
            assert!(result.ranked_results.is_empty());
            assert_eq!(result.message.as_deref(), Some(NO_MATCHES_MESSAGE));
        }

        assert_eq!(relational.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ranked.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn message_is_set_only_when_both_backends_are_empty() {
        let relational = MockRelational::default();
        let ranked = MockRanked::default();
        let result =
            compare_inner(&relational, &ranked, &SearchRequest::new("zzznotfound")).unwrap();
        assert_eq!(result.message.as_deref(), Some(NO_MATCHES_MESSAGE));
        assert!(result.error.is_none());

        let relational = MockRelational {
            products: vec![widget()],
            ..Default::default()
        };
        let result = compare_inner(&relational, &ranked, &SearchRequest::new("Widget")).unwrap();
        assert!(result.message.is_none());
    }

    #[test]
    fn ranked_failure_does_not_suppress_relational_results() {
        let relational = MockRelational {
            products: vec![widget()],
            ..Default::default()
        };
        let ranked = MockRanked {
            fail: true,
            ..Default::default()
        };

        let result = compare_inner(&relational, &ranked, &SearchRequest::new("Widget")).unwrap();
        assert_eq!(result.relational_results.len(), 1);
        assert!(result.ranked_results.is_empty());
        assert!(result.error.is_none());
    }

    #[test]
    fn relational_failure_does_not_suppress_ranked_results() {
        let relational = MockRelational {
            fail: true,
            ..Default::default()
        };
        let ranked = MockRanked {
            hits: vec![widget_hit()],
            ..Default::default()
        };

        let result = compare_inner(&relational, &ranked, &SearchRequest::new("Widget")).unwrap();
        assert!(result.relational_results.is_empty());
        assert_eq!(result.total_elements, 0);
        assert_eq!(result.ranked_results.len(), 1);
        assert_eq!(result.ranked_results[0].id, Some(7));
    }

    #[test]
    fn pagination_metadata_comes_from_the_relational_backend() {
        let relational = MockRelational {
            products: vec![widget()],
            ..Default::default()
        };
        let ranked = MockRanked::default();

        let request = SearchRequest::new("Widget").page(3).size(1);
        let result = compare_inner(&relational, &ranked, &request).unwrap();
        assert_eq!(result.current_page, 3);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.total_elements, 1);
    }

    #[test]
    fn zero_page_size_reaches_the_top_level_guard() {
        let relational = MockRelational::default();
        let ranked = MockRanked::default();
        let request = SearchRequest::new("Widget").size(0);
        assert!(compare_inner(&relational, &ranked, &request).is_err());
    }

    #[test]
    fn strict_flag_selects_the_query_shape() {
        let captured = std::sync::Mutex::new(Vec::new());
        struct ShapeRecorder<'a>(&'a std::sync::Mutex<Vec<String>>);
        impl RankedBackend for ShapeRecorder<'_> {
            fn search(&self, query: &ProductQuery) -> Result<Vec<RankedHit>, BackendError> {
                let shape = match query {
                    ProductQuery::Exact { .. } => "exact",
                    ProductQuery::Similar { .. } => "similar",
                };
                self.0.lock().unwrap().push(shape.to_string());
                Ok(Vec::new())
            }
            fn bulk_upsert(&self, _docs: &[(String, Product)]) -> Result<(), BackendError> {
                Ok(())
            }
        }

        let relational = MockRelational::default();
        let ranked = ShapeRecorder(&captured);
        compare_inner(&relational, &ranked, &SearchRequest::new("w").strict(true)).unwrap();
        compare_inner(&relational, &ranked, &SearchRequest::new("w").fuzzy(true)).unwrap();

        assert_eq!(*captured.lock().unwrap(), vec!["exact", "similar"]);
    }
}
