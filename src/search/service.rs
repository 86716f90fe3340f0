//! Main search service implementation

use crate::models::ScrollId;
use crate::search::document::fields;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::IndexManager;
use crate::search::query::QueryBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tracing::{debug, warn};

/// A single search result hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Scroll ID
    pub id: ScrollId,

    /// Search score/relevance
    pub score: f32,
}

/// Search response with results and metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Search results, best first
    pub hits: Vec<SearchHit>,

    /// Number of matching index entries, including ones past the result limit
    pub total_hits: usize,

    /// Search query that was executed
    pub query: String,

    /// Search execution time in milliseconds
    pub search_time_ms: u64,
}

impl SearchResponse {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }
}

/// Main search service
pub struct SearchService {
    /// Index manager
    index_manager: Arc<IndexManager>,
}

impl SearchService {
    pub fn new(index_manager: Arc<IndexManager>) -> Self {
        Self { index_manager }
    }

    /// Search the scroll index.
    ///
    /// Malformed queries and a missing index both produce an empty response.
    pub async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
        let start_time = std::time::Instant::now();

        if !self.index_manager.index_exists() {
            debug!(query = %query, "No index yet, returning no results");
            return Ok(SearchResponse::empty(query));
        }

        let index = self.index_manager.open_existing()?;
        let tantivy_query = match QueryBuilder::new(&index)?.build(query) {
            Ok(Some(tantivy_query)) => tantivy_query,
            Ok(None) => return Ok(SearchResponse::empty(query)),
            Err(SearchError::InvalidQuery(reason)) => {
                warn!(query = %query, reason = %reason, "Ignoring malformed query");
                return Ok(SearchResponse::empty(query));
            }
            Err(e) => return Err(e),
        };

        let reader = self.index_manager.reader(&index)?;
        let searcher = reader.searcher();
        let id_field = index.schema().get_field(fields::ID)?;

        let collector = TopDocs::with_limit(self.index_manager.config().max_results);
        let (top_docs, total_hits) = searcher
            .search(&*tantivy_query, &(collector, Count))
            .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved_doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;

            match retrieved_doc.get_first(id_field).and_then(|v| v.as_str()) {
                Some(id) => hits.push(SearchHit {
                    id: ScrollId::from(id),
                    score,
                }),
                None => warn!(?doc_address, "Index entry without an id"),
            }
        }

        Ok(SearchResponse {
            hits,
            total_hits,
            query: query.to_string(),
            search_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
