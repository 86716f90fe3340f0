use crate::models::ScrollId;
use crate::render::error::RenderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::Display;

/// Progress of a single scroll through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    Init,
    LatexEmitted,
    PdfCompiled,
    PngWritten,
    Cleaned,
}

/// Complete LaTeX document in the temporary directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexSource {
    pub id: ScrollId,
    pub path: PathBuf,
}

/// Compiled PDF in the temporary directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFile {
    pub id: ScrollId,
    pub path: PathBuf,
}

/// Rendered image in the cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngFile {
    pub id: ScrollId,
    pub path: PathBuf,
}

/// Result of a successful render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderOutcome {
    /// The cached image was already newer than the source
    UpToDate,

    /// The image was (re)rendered
    Rendered(PathBuf),
}

/// A LaTeX to PNG toolchain.
///
/// Every stage consumes the artefact of the previous one, so a stage can
/// only run once all earlier stages succeeded.
#[async_trait]
pub trait RenderBackend: Send + Sync + 'static {
    /// Get backend name
    fn name(&self) -> &str;

    /// Whether the cached image is at least as new as the scroll source
    async fn is_up_to_date(&self, id: &ScrollId) -> bool;

    /// Combine the scroll with its templates into a LaTeX document.
    /// A missing scroll yields `RenderError::NoSuchScroll`.
    async fn scroll_to_latex(&self, id: &ScrollId) -> RenderResult<LatexSource>;

    /// Compile the LaTeX document
    async fn latex_to_pdf(&self, latex: LatexSource) -> RenderResult<PdfFile>;

    /// Rasterize the PDF into the cache
    async fn pdf_to_png(&self, pdf: PdfFile) -> RenderResult<PngFile>;

    /// Remove every intermediate file of the scroll. Runs whatever the
    /// outcome of the other stages; failures are only logged.
    async fn delete_temporary_files(&self, id: &ScrollId);
}
