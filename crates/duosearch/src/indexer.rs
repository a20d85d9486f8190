//! One-shot bulk synchronization from the relational store into the ranked
//! index.
//!
//! The run is a singleton per process lifetime, gated by an atomic state
//! machine: `NotStarted -> InProgress -> Completed`. `Completed` is terminal
//! unless a forced rerun loops it back to `InProgress`. Batches are submitted
//! strictly sequentially, so a mid-run failure leaves a well-defined prefix
//! of batches committed and the remainder untouched; committed batches are
//! not rolled back.

pub use error::IndexerError;
use error::Result;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tracing::{debug, error, info, instrument, warn};

use crate::backend::{RankedBackend, RelationalBackend};

/// Records per bulk upsert call.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

const NOT_STARTED: u8 = 0;
const IN_PROGRESS: u8 = 1;
const COMPLETED: u8 = 2;

enum Begin {
    Started,
    AlreadyComplete,
    AlreadyRunning,
}

/// Process-scoped indexing state. Intentionally not persisted: a restart
/// re-triggers a full reindex.
#[derive(Debug, Default)]
pub struct IndexingState(AtomicU8);

impl IndexingState {
    fn try_begin(&self, force: bool) -> Begin {
        if self
            .0
            .compare_exchange(NOT_STARTED, IN_PROGRESS, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return Begin::Started;
        }
        if force
            && self
                .0
                .compare_exchange(COMPLETED, IN_PROGRESS, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            return Begin::Started;
        }
        if self.0.load(Ordering::Acquire) == COMPLETED {
            Begin::AlreadyComplete
        } else {
            Begin::AlreadyRunning
        }
    }

    fn complete(&self) {
        self.0.store(COMPLETED, Ordering::Release);
    }

    fn reset(&self) {
        self.0.store(NOT_STARTED, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.0.load(Ordering::Acquire) == COMPLETED
    }
}

/// Batched bulk-indexing pipeline from the relational store into the ranked
/// backend.
pub struct BulkIndexer {
    relational: Arc<dyn RelationalBackend>,
    ranked: Arc<dyn RankedBackend>,
    state: IndexingState,
    batch_size: usize,
}

impl BulkIndexer {
    pub fn new(
        relational: Arc<dyn RelationalBackend>,
        ranked: Arc<dyn RankedBackend>,
        batch_size: usize,
    ) -> Self {
        Self {
            relational,
            ranked,
            state: IndexingState::default(),
            batch_size: batch_size.max(1),
        }
    }

    /// Run the full synchronization once.
    ///
    /// A second call is a no-op while a run is in progress or after one has
    /// completed, unless `force` is passed. Any fetch or batch failure aborts
    /// the run, leaves the state incomplete so a retry is possible, and
    /// propagates to the caller; the bootstrap collaborator decides whether
    /// that is fatal to the process.
    #[instrument(name = "Bulk Indexing Run", skip(self))]
    pub fn run(&self, force: bool) -> Result<()> {
        match self.state.try_begin(force) {
            Begin::Started => {}
            Begin::AlreadyComplete => {
                info!("Skipping bulk indexing, already completed");
                return Ok(());
            }
            Begin::AlreadyRunning => {
                info!("Bulk indexing already in progress, coalescing to a no-op");
                return Ok(());
            }
        }

        let t_run = std::time::Instant::now();
        match self.run_inner() {
            Ok(()) => {
                self.state.complete();
                info!(elapsed_seconds = ?t_run.elapsed(), "Bulk indexing complete");
                Ok(())
            }
            Err(e) => {
                self.state.reset();
                error!(error = %e, "Bulk indexing failed, state left incomplete for retry");
                Err(e)
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    fn run_inner(&self) -> Result<()> {
        info!("Fetching all records from the relational store for indexing");
        let products = self.relational.fetch_all()?;
        let total_batches = products.len().div_ceil(self.batch_size);
        info!(
            total = products.len(),
            total_batches, "Fetched source records"
        );

        for (i, chunk) in products.chunks(self.batch_size).enumerate() {
            let docs: Vec<_> = chunk
                .iter()
                .filter_map(|product| match product.id {
                    Some(id) => Some((id.to_string(), product.clone())),
                    None => {
                        warn!(name = product.name(), "Skipping record without a canonical id");
                        None
                    }
                })
                .collect();

            debug!(
                batch = i + 1,
                total_batches,
                num_docs = docs.len(),
                "Submitting batch to the ranked index"
            );
            self.ranked.bulk_upsert(&docs)?;
        }
        Ok(())
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexerError {
        #[error("Backend error: {0}")]
        Backend(#[from] crate::backend::BackendError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexerError>;
}

#[cfg(test)]
mod tests {
    use std::{
        result::Result,
        sync::{
            Mutex,
            atomic::{AtomicBool, AtomicUsize},
        },
    };

    use super::*;
    use crate::{
        backend::{BackendError, Page, PageRequest, ProductQuery, RankedHit},
        model::Product,
    };

    struct StaticRelational {
        products: Vec<Product>,
        fetch_calls: AtomicUsize,
    }

    impl StaticRelational {
        fn with_products(n: u64) -> Self {
            Self {
                products: (1..=n)
                    .map(|i| Product::new(format!("Product {i}"), "", "bulk", 1.0).with_id(i))
                    .collect(),
                fetch_calls: AtomicUsize::new(0),
            }
        }
    }

    impl RelationalBackend for StaticRelational {
        fn exact_search(
            &self,
            _term: &str,
            _page: PageRequest,
        ) -> Result<Page<Product>, BackendError> {
            Ok(Page::default())
        }

        fn fetch_all(&self) -> Result<Vec<Product>, BackendError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.products.clone())
        }
    }

    #[derive(Default)]
    struct RecordingRanked {
        batches: Mutex<Vec<Vec<String>>>,
        fail: AtomicBool,
    }

    impl RankedBackend for RecordingRanked {
        fn search(&self, _query: &ProductQuery) -> Result<Vec<RankedHit>, BackendError> {
            Ok(Vec::new())
        }

        fn bulk_upsert(&self, docs: &[(String, Product)]) -> Result<(), BackendError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("bulk upsert rejected").into());
            }
            self.batches
                .lock()
                .unwrap()
                .push(docs.iter().map(|(id, _)| id.clone()).collect());
            Ok(())
        }
    }

    fn indexer(
        relational: Arc<StaticRelational>,
        ranked: Arc<RecordingRanked>,
        batch_size: usize,
    ) -> BulkIndexer {
        BulkIndexer::new(relational, ranked, batch_size)
    }

    #[test]
    fn batches_partition_the_full_source_set() {
        let relational = Arc::new(StaticRelational::with_products(25));
        let ranked = Arc::new(RecordingRanked::default());
        let indexer = indexer(relational, Arc::clone(&ranked), 10);

        indexer.run(false).unwrap();

        let batches = ranked.batches.lock().unwrap();
        assert_eq!(batches.len(), 3, "ceil(25 / 10) batches expected");
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[2].len(), 5);

        let mut all_ids: Vec<String> = batches.iter().flatten().cloned().collect();
        all_ids.sort();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 25, "no duplicates and no omissions");
    }

    #[test]
    fn second_run_is_a_no_op() {
        let relational = Arc::new(StaticRelational::with_products(5));
        let ranked = Arc::new(RecordingRanked::default());
        let indexer = indexer(Arc::clone(&relational), Arc::clone(&ranked), 10);

        indexer.run(false).unwrap();
        assert!(indexer.is_complete());
        indexer.run(false).unwrap();

        assert_eq!(relational.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ranked.batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn forced_run_re_executes_the_full_sequence() {
        let relational = Arc::new(StaticRelational::with_products(5));
        let ranked = Arc::new(RecordingRanked::default());
        let indexer = indexer(Arc::clone(&relational), Arc::clone(&ranked), 10);

        indexer.run(false).unwrap();
        indexer.run(true).unwrap();

        assert_eq!(relational.fetch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(ranked.batches.lock().unwrap().len(), 2);
        assert!(indexer.is_complete());
    }

    #[test]
    fn batch_failure_aborts_and_leaves_state_incomplete() {
        let relational = Arc::new(StaticRelational::with_products(5));
        let ranked = Arc::new(RecordingRanked::default());
        ranked.fail.store(true, Ordering::SeqCst);
        let indexer = indexer(Arc::clone(&relational), Arc::clone(&ranked), 10);

        assert!(indexer.run(false).is_err());
        assert!(!indexer.is_complete());

        // Retry without force succeeds once the backend recovers.
        ranked.fail.store(false, Ordering::SeqCst);
        indexer.run(false).unwrap();
        assert!(indexer.is_complete());
    }

    #[test]
    fn records_without_ids_are_skipped() {
        let relational = Arc::new(StaticRelational {
            products: vec![
                Product::new("Has Id", "", "", 1.0).with_id(1),
                Product::new("No Id", "", "", 1.0),
            ],
            fetch_calls: AtomicUsize::new(0),
        });
        let ranked = Arc::new(RecordingRanked::default());
        let indexer = indexer(relational, Arc::clone(&ranked), 10);

        indexer.run(false).unwrap();
        let batches = ranked.batches.lock().unwrap();
        assert_eq!(batches[0], vec!["1".to_string()]);
    }
}
