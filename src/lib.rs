//! Alexandria: a personal knowledge base of LaTeX scrolls
//!
//! Scrolls are small LaTeX snippets stored as flat files. Alexandria renders
//! them to PNG images through XeLaTeX and ImageMagick, keeps a full-text
//! index of them up to date, and answers `+required -excluded ~optional`
//! queries with freshly rendered, still existing scrolls.

pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod render;
pub mod search;
pub mod service;

pub use config::{BatchPolicy, Config};
pub use error::{AppError, Result};
pub use service::{Alexandria, FindResults};
