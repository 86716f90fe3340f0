//! Search index management
//!
//! Index handles are scoped to a single operation: every method opens the
//! index, uses it and drops it again. Writes inside one process are
//! serialized by `write_lock`.

use crate::config::Config;
use crate::library::{ScrollStore, StoredScroll};
use crate::models::ScrollId;
use crate::search::config::SearchConfig;
use crate::search::document::{build_scroll_schema, fields, ScrollDocument, SearchDocument};
use crate::search::error::{SearchError, SearchResult};
use crate::search::marker::FreshnessMarker;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tantivy::schema::Field;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of an incremental index update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUpdate {
    /// The index did not exist and was created by this update
    pub created: bool,

    /// Scrolls modified since the previous update (all scrolls for a new index)
    pub considered: usize,

    /// Scrolls written to the index
    pub indexed: usize,

    /// Scrolls skipped because they are older than the freshness marker
    pub unchanged: usize,

    /// Scrolls that could not be read or indexed
    pub failed: usize,
}

/// Manages the on-disk Tantivy index
pub struct IndexManager {
    /// Directory of the index
    index_path: PathBuf,

    /// Records when the last update started
    marker: FreshnessMarker,

    /// Configuration
    config: SearchConfig,

    /// Serializes writers within this process
    write_lock: Mutex<()>,
}

impl IndexManager {
    pub fn new(index_path: impl Into<PathBuf>, marker: FreshnessMarker, config: SearchConfig) -> Self {
        Self {
            index_path: index_path.into(),
            marker,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.index_path(),
            FreshnessMarker::new(config.marker_path()),
            config.search.clone(),
        )
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn marker(&self) -> &FreshnessMarker {
        &self.marker
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Check if an index exists
    pub fn index_exists(&self) -> bool {
        self.index_path.join("meta.json").exists()
    }

    /// Open the existing index
    pub fn open_existing(&self) -> SearchResult<Index> {
        if !self.index_exists() {
            return Err(SearchError::IndexNotFound(
                self.index_path.display().to_string(),
            ));
        }
        Index::open_in_dir(&self.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
        })
    }

    /// Open the existing index or create a new one.
    /// The flag is true if the index was created.
    pub fn open_or_create(&self) -> SearchResult<(Index, bool)> {
        if self.index_exists() {
            return Ok((self.open_existing()?, false));
        }

        std::fs::create_dir_all(&self.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let index = Index::create_in_dir(&self.index_path, build_scroll_schema()).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
        })?;
        info!(path = %self.index_path.display(), "Created new search index");

        Ok((index, true))
    }

    /// Reader for a single search operation
    pub fn reader(&self, index: &Index) -> SearchResult<IndexReader> {
        index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))
    }

    fn writer(&self, index: &Index) -> SearchResult<IndexWriter> {
        index
            .writer_with_num_threads(self.config.indexing_threads, self.config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))
    }

    fn id_field(index: &Index) -> SearchResult<Field> {
        Ok(index.schema().get_field(fields::ID)?)
    }

    /// Add every scroll created or modified since the last update to the index.
    ///
    /// Deleted scrolls are not removed; see `remove_from_index`.
    pub async fn update_index(&self, store: &ScrollStore) -> SearchResult<IndexUpdate> {
        let _guard = self.write_lock.lock().await;

        let (index, created) = self.open_or_create()?;

        let last_update = self.marker.last_update();
        if let Err(e) = self.marker.touch() {
            warn!(path = %self.marker.path().display(), error = %e, "Failed to record index update start");
        }

        let scrolls = store.list()?;
        let schema = index.schema();
        let id_field = Self::id_field(&index)?;
        let mut writer = self.writer(&index)?;
        let mut report = IndexUpdate {
            created,
            ..Default::default()
        };

        for stored in scrolls {
            if !created && is_older_than(&stored, last_update) {
                report.unchanged += 1;
                continue;
            }
            report.considered += 1;

            let scroll = match store.load(&stored.id).await {
                Ok(scroll) => scroll,
                Err(e) => {
                    error!(scroll_id = %stored.id, error = %e, "Failed to read scroll for indexing");
                    report.failed += 1;
                    continue;
                }
            };

            let document = ScrollDocument::from(&scroll);
            writer.delete_term(Term::from_field_text(id_field, &document.document_id()));
            match writer.add_document(document.to_tantivy_doc(&schema)) {
                Ok(_) => {
                    debug!(scroll_id = %stored.id, "Scroll staged for indexing");
                    report.indexed += 1;
                }
                Err(e) => {
                    error!(scroll_id = %stored.id, error = %e, "Failed to index scroll");
                    report.failed += 1;
                }
            }
        }

        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit batch: {}", e)))?;
        writer
            .wait_merging_threads()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to finish merges: {}", e)))?;

        info!(
            created = report.created,
            indexed = report.indexed,
            unchanged = report.unchanged,
            failed = report.failed,
            "Index update complete"
        );

        Ok(report)
    }

    /// Remove a scroll from the index. This is the only way deleted scrolls
    /// leave the index, as `update_index` cannot tell they are gone.
    pub async fn remove_from_index(&self, id: &ScrollId) -> SearchResult<()> {
        let _guard = self.write_lock.lock().await;

        if !self.index_exists() {
            debug!(scroll_id = %id, "No index, nothing to remove");
            return Ok(());
        }

        let index = self.open_existing()?;
        let id_field = Self::id_field(&index)?;
        let mut writer = self.writer(&index)?;

        writer.delete_term(Term::from_field_text(id_field, id.as_str()));
        writer.commit().map_err(|e| {
            SearchError::DeletionFailed(format!("Failed to commit deletion: {}", e))
        })?;
        writer.wait_merging_threads().map_err(|e| {
            SearchError::DeletionFailed(format!("Failed to finish merges: {}", e))
        })?;

        info!(scroll_id = %id, "Removed scroll from index");
        Ok(())
    }

    /// Number of scrolls in the index, zero if there is no index yet
    pub async fn doc_count(&self) -> SearchResult<u64> {
        if !self.index_exists() {
            return Ok(0);
        }
        let index = self.open_existing()?;
        let reader = self.reader(&index)?;
        Ok(reader.searcher().num_docs())
    }
}

fn is_older_than(stored: &StoredScroll, time: SystemTime) -> bool {
    match stored.modified {
        Some(modified) => modified < time,
        None => {
            warn!(scroll_id = %stored.id, "Unknown modification time, skipping scroll");
            true
        }
    }
}
