//! Search configuration

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchConfig {
    /// Maximum search results to return
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    pub max_results: usize,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    #[serde(default = "default_indexing_threads")]
    #[validate(range(min = 1))]
    pub indexing_threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            writer_heap_size: default_writer_heap_size(),
            indexing_threads: default_indexing_threads(),
        }
    }
}

fn default_max_results() -> usize {
    100
}

fn default_writer_heap_size() -> usize {
    50_000_000 // 50MB
}

fn default_indexing_threads() -> usize {
    1
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
