//! The scroll library on disk
//!
//! Scrolls live as flat files in the knowledge directory, one per scroll,
//! named `<id>.<extension>`. The store only offers read/write/stat
//! primitives; everything else (rendering, indexing) is built on top.

mod store;

pub use store::{ScrollStore, StoredScroll};
