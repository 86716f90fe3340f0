//! Full-text search over the library, powered by Tantivy
//!
//! - **Incremental Indexing**: only scrolls modified since the last update
//!   are reindexed, tracked by a freshness marker file
//! - **Point Deletion**: scrolls are removed from the index by id
//! - **Prefix Queries**: `+required -excluded ~optional`, bare terms required
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           Search Service                         │
//! │  - search()                                      │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │           Index Manager                          │
//! │  - update_index()   - remove_from_index()        │
//! │  - doc_count()      - freshness marker           │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Tantivy Index                       │
//! │  - id (raw, stored)                              │
//! │  - identifier, type, content, source, tags, ...  │
//! └─────────────────────────────────────────────────┘
//! ```

mod config;
mod document;
mod error;
mod index;
mod marker;
mod query;
mod service;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{build_scroll_schema, fields, ScrollDocument, SearchDocument};
pub use error::{SearchError, SearchResult};
pub use index::{IndexManager, IndexUpdate};
pub use marker::FreshnessMarker;
pub use query::{parse_terms, translate_prefixes, QueryBuilder, QueryTerm};
pub use service::{SearchHit, SearchResponse, SearchService};
