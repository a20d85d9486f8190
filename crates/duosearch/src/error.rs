use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuosearchError {
    #[error("Search error: {0}")]
    Search(#[from] crate::search::SearchError),
    #[error("Index error: {0}")]
    Index(#[from] crate::index::IndexError),
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("Indexing error: {0}")]
    Indexing(#[from] crate::indexer::IndexerError),
    #[error("Backend error: {0}")]
    Backend(#[from] crate::backend::BackendError),
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Init Logging error: {0}")]
    InitLogging(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DuosearchError>;
