//! Scroll rendering
//!
//! Every scroll is turned into a cached PNG in four stages:
//!
//! ```text
//! scroll ──► LaTeX (templates + content) ──► PDF ──► PNG (cache) ──► cleanup
//! ```
//!
//! A stage only runs if the previous one succeeded; cleanup of the
//! temporary directory always runs. Scrolls whose cached image is newer
//! than their source are skipped entirely.

mod backend;
mod error;
mod pipeline;
mod scheduler;
mod xelatex;

pub use backend::{LatexSource, PdfFile, PngFile, RenderBackend, RenderOutcome, Stage};
pub use error::{RenderError, RenderResult};
pub use pipeline::render_scroll;
pub use scheduler::{BatchSummary, RenderScheduler};
pub use xelatex::{XelatexRenderer, TEMPLATE_EXTENSION};
