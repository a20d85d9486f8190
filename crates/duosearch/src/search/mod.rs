//! Search comparison logic.
//!
//! This module contains the orchestration that fans a single request out to
//! both backends and the reconciliation step that normalizes ranked hits back
//! to canonical ids.

pub use error::SearchError;
mod orchestration;
mod reconcile;

use error::Result;
pub use orchestration::{
    ComparisonResult, DEFAULT_PAGE_SIZE, NO_MATCHES_MESSAGE, SearchRequest,
};
pub(crate) use orchestration::{SEARCH_FAILED_MESSAGE, compare_inner};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Backend error: {0}")]
        Backend(#[from] crate::backend::BackendError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, SearchError>;
}
