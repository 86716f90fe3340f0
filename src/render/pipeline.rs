use crate::models::ScrollId;
use crate::render::backend::{PngFile, RenderBackend, RenderOutcome, Stage};
use crate::render::error::{RenderError, RenderResult};
use std::time::Instant;
use tracing::{debug, info};

/// Render a single scroll unless its cached image is up to date.
///
/// Temporary files are deleted whether or not rendering succeeded.
pub async fn render_scroll(backend: &dyn RenderBackend, id: &ScrollId) -> RenderResult<RenderOutcome> {
    if backend.is_up_to_date(id).await {
        debug!(scroll_id = %id, "Image is up to date");
        return Ok(RenderOutcome::UpToDate);
    }

    let start = Instant::now();
    let result = run_stages(backend, id).await;

    backend.delete_temporary_files(id).await;

    match result {
        Ok(png) => {
            info!(
                scroll_id = %id,
                backend = backend.name(),
                stage = %Stage::Cleaned,
                duration_ms = start.elapsed().as_millis() as u64,
                "Rendered scroll"
            );
            Ok(RenderOutcome::Rendered(png.path))
        }
        Err((stage, e)) => {
            if !e.is_missing() {
                debug!(scroll_id = %id, completed = %stage, error = %e, "Rendering failed");
            }
            Err(e)
        }
    }
}

/// Run the stages in order, stopping at the first failure.
/// Errors are paired with the last stage that completed.
async fn run_stages(
    backend: &dyn RenderBackend,
    id: &ScrollId,
) -> Result<PngFile, (Stage, RenderError)> {
    let latex = backend
        .scroll_to_latex(id)
        .await
        .map_err(|e| (Stage::Init, e))?;
    debug!(scroll_id = %id, path = %latex.path.display(), "LaTeX emitted");

    let pdf = backend
        .latex_to_pdf(latex)
        .await
        .map_err(|e| (Stage::LatexEmitted, e))?;
    debug!(scroll_id = %id, path = %pdf.path.display(), "PDF compiled");

    let png = backend
        .pdf_to_png(pdf)
        .await
        .map_err(|e| (Stage::PdfCompiled, e))?;
    debug!(scroll_id = %id, stage = %Stage::PngWritten, "PNG written");

    Ok(png)
}
