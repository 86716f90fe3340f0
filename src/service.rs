//! The library as seen by user interfaces

use crate::config::{BatchPolicy, Config};
use crate::error::Result;
use crate::library::ScrollStore;
use crate::models::{Scroll, ScrollId, Statistics};
use crate::render::{BatchSummary, RenderBackend, RenderOutcome, RenderScheduler, XelatexRenderer};
use crate::search::{IndexManager, IndexUpdate, SearchService};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Scrolls matching a query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindResults {
    /// Live content of every matching scroll that still exists, best first
    pub scrolls: Vec<Scroll>,

    /// Number of matching scrolls that still exist
    pub total: usize,

    /// Number of matching index entries, including stale ones
    pub index_hits: usize,
}

pub struct Alexandria {
    config: Config,
    store: ScrollStore,
    index: Arc<IndexManager>,
    search: SearchService,
    scheduler: RenderScheduler,
}

impl Alexandria {
    /// Library rendering with XeLaTeX and ImageMagick
    pub fn new(config: Config) -> Self {
        let store = ScrollStore::from_config(&config);
        let index = Arc::new(IndexManager::from_config(&config));
        let backend = Arc::new(XelatexRenderer::new(&config, store.clone(), index.clone()));
        Self::assemble(config, store, index, backend)
    }

    /// Library rendering with a custom backend
    pub fn with_backend(config: Config, backend: Arc<dyn RenderBackend>) -> Self {
        let store = ScrollStore::from_config(&config);
        let index = Arc::new(IndexManager::from_config(&config));
        Self::assemble(config, store, index, backend)
    }

    fn assemble(
        config: Config,
        store: ScrollStore,
        index: Arc<IndexManager>,
        backend: Arc<dyn RenderBackend>,
    ) -> Self {
        Self {
            search: SearchService::new(index.clone()),
            scheduler: RenderScheduler::new(backend, config.render.max_procs),
            config,
            store,
            index,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ScrollStore {
        &self.store
    }

    pub fn index(&self) -> &Arc<IndexManager> {
        &self.index
    }

    /// Render a single scroll
    pub async fn render_one(&self, id: &ScrollId) -> Result<RenderOutcome> {
        Ok(self.scheduler.render_one(id).await?)
    }

    /// Render every scroll ahead of time, so queries can be answered quickly
    pub async fn render_all(&self, policy: Option<BatchPolicy>) -> Result<BatchSummary> {
        let policy = policy.unwrap_or(self.config.render.batch_policy);
        Ok(self.scheduler.render_all(&self.store, policy).await?)
    }

    /// Index every scroll created or modified since the last update
    pub async fn update_index(&self) -> Result<IndexUpdate> {
        Ok(self.index.update_index(&self.store).await?)
    }

    /// Remove a deleted scroll from the index
    pub async fn remove_from_index(&self, id: &ScrollId) -> Result<()> {
        Ok(self.index.remove_from_index(id).await?)
    }

    /// Find the scrolls matching `query` and make sure their images are current.
    ///
    /// Index entries of deleted scrolls are dropped from the results and
    /// removed from the index on the way.
    pub async fn find(&self, query: &str) -> Result<FindResults> {
        let response = self.search.search(query).await?;
        let index_hits = response.total_hits;
        let ids: Vec<ScrollId> = response.hits.into_iter().map(|hit| hit.id).collect();

        let summary = self
            .scheduler
            .render_list(ids.clone(), BatchPolicy::FailFast)
            .await?;

        let mut scrolls = Vec::with_capacity(ids.len());
        for id in ids {
            if summary.is_missing(&id) {
                continue;
            }
            match self.store.load(&id).await {
                Ok(scroll) => scrolls.push(scroll),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(scroll_id = %id, "Scroll deleted during query");
                }
                Err(e) => error!(scroll_id = %id, error = %e, "Failed to load matching scroll"),
            }
        }

        info!(query = %query, index_hits, total = scrolls.len(), "Query answered");

        Ok(FindResults {
            total: scrolls.len(),
            scrolls,
            index_hits,
        })
    }

    /// Number of indexed scrolls and combined size of the library directory
    pub async fn compute_statistics(&self) -> Result<Statistics> {
        let num_scrolls = self.index.doc_count().await?;
        let total_size = match self.store.total_size() {
            Ok(size) => size,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        Ok(Statistics {
            num_scrolls,
            total_size,
        })
    }
}
