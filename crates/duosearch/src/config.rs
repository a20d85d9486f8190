//! Configuration for building a [`crate::ProductSearcher`].

use std::path::PathBuf;

use crate::indexer::DEFAULT_BATCH_SIZE;

const DEFAULT_RANKED_RESULT_LIMIT: usize = 1_000;

/// Settings for the concrete backends a searcher is assembled from.
#[derive(Debug, Clone)]
pub struct SearcherConfig {
    /// Cap applied to every ranked search; the ranked path is unpaginated.
    pub ranked_result_limit: usize,
    /// Records per bulk upsert call during indexing.
    pub batch_size: usize,
    /// Directory holding the on-disk ranked index; `None` keeps it in RAM.
    pub index_dir: Option<PathBuf>,
}

impl SearcherConfig {
    pub fn builder() -> SearcherConfigBuilder {
        SearcherConfigBuilder::default()
    }
}

impl Default for SearcherConfig {
    fn default() -> Self {
        Self {
            ranked_result_limit: DEFAULT_RANKED_RESULT_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            index_dir: None,
        }
    }
}

/// Builder for [`SearcherConfig`] with ergonomic defaults.
#[derive(Debug, Clone, Default)]
pub struct SearcherConfigBuilder {
    config: SearcherConfig,
}

impl SearcherConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration persisting the ranked index under `dir`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        let mut builder = Self::new();
        builder.config.index_dir = Some(dir.into());
        builder
    }

    /// Set the cap applied to every ranked search.
    #[must_use]
    pub fn ranked_result_limit(mut self, limit: usize) -> Self {
        self.config.ranked_result_limit = limit.max(1);
        self
    }

    /// Set how many records go into each bulk upsert call.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size.max(1);
        self
    }

    /// Persist the ranked index under `dir` instead of keeping it in RAM.
    #[must_use]
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> SearcherConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = SearcherConfig::builder()
            .ranked_result_limit(50)
            .batch_size(100)
            .build();
        assert_eq!(config.ranked_result_limit, 50);
        assert_eq!(config.batch_size, 100);
        assert!(config.index_dir.is_none());
    }

    #[test]
    fn zero_values_are_clamped() {
        let config = SearcherConfig::builder()
            .ranked_result_limit(0)
            .batch_size(0)
            .build();
        assert_eq!(config.ranked_result_limit, 1);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn persistent_preset_sets_the_index_dir() {
        let config = SearcherConfigBuilder::persistent("/tmp/idx").build();
        assert_eq!(config.index_dir.as_deref(), Some(std::path::Path::new("/tmp/idx")));
    }
}
