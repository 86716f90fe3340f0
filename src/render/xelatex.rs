//! Production backend: XeLaTeX for LaTeX to PDF, ImageMagick for PDF to PNG

use crate::config::{Config, RenderConfig};
use crate::library::ScrollStore;
use crate::models::{Scroll, ScrollId};
use crate::render::backend::{LatexSource, PdfFile, PngFile, RenderBackend};
use crate::render::error::{RenderError, RenderResult};
use crate::search::IndexManager;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Extension of template files in the template directory
pub const TEMPLATE_EXTENSION: &str = "tex";

pub struct XelatexRenderer {
    store: ScrollStore,
    index: Arc<IndexManager>,
    template_directory: PathBuf,
    temp_directory: PathBuf,
    cache_directory: PathBuf,
    config: RenderConfig,
}

impl XelatexRenderer {
    pub fn new(config: &Config, store: ScrollStore, index: Arc<IndexManager>) -> Self {
        Self {
            store,
            index,
            template_directory: config.template_directory(),
            temp_directory: config.library.temp_directory.clone(),
            cache_directory: config.library.cache_directory.clone(),
            config: config.render.clone(),
        }
    }

    /// Cached image of a scroll
    pub fn png_path(&self, id: &ScrollId) -> PathBuf {
        self.cache_directory.join(format!("{}.png", id))
    }

    fn latex_path(&self, id: &ScrollId) -> PathBuf {
        self.temp_directory.join(format!("{}.tex", id))
    }

    fn pdf_path(&self, id: &ScrollId) -> PathBuf {
        self.temp_directory.join(format!("{}.pdf", id))
    }

    async fn read_template(&self, id: &ScrollId, name: &str) -> RenderResult<String> {
        let path = self
            .template_directory
            .join(format!("{}.{}", name, TEMPLATE_EXTENSION));

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| RenderError::Template {
                id: id.clone(),
                name: name.to_string(),
                source,
            })
    }

    /// header, type header, content, type footer, footer
    async fn assemble(&self, scroll: &Scroll) -> RenderResult<String> {
        let mut document = String::new();
        for name in ["header".to_string(), scroll.header_template()] {
            document.push_str(&self.read_template(&scroll.id, &name).await?);
        }
        document.push_str(&scroll.content);
        for name in [scroll.footer_template(), "footer".to_string()] {
            document.push_str(&self.read_template(&scroll.id, &name).await?);
        }
        Ok(document)
    }

    /// Whether `file_name` is an intermediate file of `id`, i.e. `<id>.<ext>`
    fn is_temporary_file_of(id: &ScrollId, file_name: &str) -> bool {
        file_name
            .strip_prefix(id.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|ext| !ext.is_empty() && !ext.contains('.'))
    }
}

/// Run an external program to completion, attaching its combined output on failure
async fn run_program(id: &ScrollId, program: &str, args: Vec<OsString>) -> RenderResult<()> {
    debug!(scroll_id = %id, program = %program, ?args, "Running external program");

    let output = Command::new(program)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RenderError::io(id, format!("Run {}", program), e))?;

    if output.status.success() {
        return Ok(());
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Err(RenderError::Process {
        id: id.clone(),
        program: program.to_string(),
        status: output.status.to_string(),
        output: combined,
    })
}

fn modified(path: &Path) -> io::Result<std::time::SystemTime> {
    std::fs::metadata(path)?.modified()
}

#[async_trait]
impl RenderBackend for XelatexRenderer {
    fn name(&self) -> &str {
        "xelatex-imagemagick"
    }

    async fn is_up_to_date(&self, id: &ScrollId) -> bool {
        let Ok(source) = self.store.modified(id) else {
            return false;
        };
        match modified(&self.png_path(id)) {
            Ok(image) => image >= source,
            Err(_) => false,
        }
    }

    async fn scroll_to_latex(&self, id: &ScrollId) -> RenderResult<LatexSource> {
        let scroll = match self.store.load(id).await {
            Ok(scroll) => scroll,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Err(e) = self.index.remove_from_index(id).await {
                    error!(scroll_id = %id, error = %e, "Failed to remove deleted scroll from index");
                }
                return Err(RenderError::NoSuchScroll(id.clone()));
            }
            Err(e) => return Err(RenderError::io(id, "Read scroll", e)),
        };

        let document = self.assemble(&scroll).await?;

        tokio::fs::create_dir_all(&self.temp_directory)
            .await
            .map_err(|e| RenderError::io(id, "Create temporary directory", e))?;

        let path = self.latex_path(id);
        tokio::fs::write(&path, document).await.map_err(|e| {
            RenderError::io(
                id,
                format!("Writing LaTeX file {}.tex to temporary directory", id),
                e,
            )
        })?;

        Ok(LatexSource {
            id: id.clone(),
            path,
        })
    }

    async fn latex_to_pdf(&self, latex: LatexSource) -> RenderResult<PdfFile> {
        let args = vec![
            OsString::from("-interaction"),
            OsString::from("nonstopmode"),
            OsString::from("-output-directory"),
            self.temp_directory.clone().into_os_string(),
            self.temp_directory.join(latex.id.as_str()).into_os_string(),
        ];
        run_program(&latex.id, &self.config.latex_program, args).await?;

        Ok(PdfFile {
            path: self.pdf_path(&latex.id),
            id: latex.id,
        })
    }

    async fn pdf_to_png(&self, pdf: PdfFile) -> RenderResult<PngFile> {
        tokio::fs::create_dir_all(&self.cache_directory)
            .await
            .map_err(|e| RenderError::io(&pdf.id, "Create cache directory", e))?;

        let path = self.png_path(&pdf.id);
        let args = vec![
            OsString::from("-trim"),
            OsString::from("-quality"),
            OsString::from(self.config.quality.to_string()),
            OsString::from("-density"),
            OsString::from(self.config.dpi.to_string()),
            pdf.path.into_os_string(),
            path.clone().into_os_string(),
        ];
        run_program(&pdf.id, &self.config.converter_program, args).await?;

        Ok(PngFile { id: pdf.id, path })
    }

    async fn delete_temporary_files(&self, id: &ScrollId) {
        let mut entries = match tokio::fs::read_dir(&self.temp_directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                error!(scroll_id = %id, error = %e, "Cannot list temporary directory");
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!(scroll_id = %id, error = %e, "Cannot list temporary directory");
                    break;
                }
            };

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !Self::is_temporary_file_of(id, name) {
                continue;
            }

            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), error = %e, "Failed to delete temporary file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::pipeline::render_scroll;
    use crate::search::{FreshnessMarker, SearchConfig};
    use tempfile::TempDir;

    fn renderer(root: &TempDir, latex: &str, converter: &str) -> XelatexRenderer {
        let mut config = Config::with_root(root.path());
        config.render.latex_program = latex.to_string();
        config.render.converter_program = converter.to_string();

        let index = Arc::new(IndexManager::new(
            config.index_path(),
            FreshnessMarker::new(config.marker_path()),
            SearchConfig::default(),
        ));
        XelatexRenderer::new(&config, ScrollStore::from_config(&config), index)
    }

    fn write_templates(root: &TempDir, scroll_type: &str) {
        let dir = root.path().join("alexandria").join("templates");
        std::fs::create_dir_all(&dir).unwrap();
        for (name, text) in [
            ("header".to_string(), "H\n".to_string()),
            (format!("{}_header", scroll_type), "TH\n".to_string()),
            (format!("{}_footer", scroll_type), "\nTF".to_string()),
            ("footer".to_string(), "\nF".to_string()),
        ] {
            std::fs::write(dir.join(format!("{}.tex", name)), text).unwrap();
        }
    }

    #[test]
    fn test_temporary_file_matching() {
        let id = ScrollId::from("euler");
        assert!(XelatexRenderer::is_temporary_file_of(&id, "euler.tex"));
        assert!(XelatexRenderer::is_temporary_file_of(&id, "euler.aux"));
        assert!(!XelatexRenderer::is_temporary_file_of(&id, "euler"));
        assert!(!XelatexRenderer::is_temporary_file_of(&id, "euler."));
        assert!(!XelatexRenderer::is_temporary_file_of(&id, "euler.x.log"));
        assert!(!XelatexRenderer::is_temporary_file_of(&id, "eulers.tex"));
    }

    #[tokio::test]
    async fn test_templates_are_assembled_in_order() {
        let root = TempDir::new().unwrap();
        write_templates(&root, "theorem");
        let renderer = renderer(&root, "true", "true");
        let id = ScrollId::from("euler");
        renderer
            .store
            .write(&id, "%@type theorem\nBODY")
            .await
            .unwrap();

        let latex = renderer.scroll_to_latex(&id).await.unwrap();
        let text = std::fs::read_to_string(&latex.path).unwrap();
        assert_eq!(text, "H\nTH\nBODY\nTF\nF");
    }

    #[tokio::test]
    async fn test_missing_template() {
        let root = TempDir::new().unwrap();
        write_templates(&root, "theorem");
        let renderer = renderer(&root, "true", "true");
        let id = ScrollId::from("lemma");
        renderer.store.write(&id, "%@type lemma\nBODY").await.unwrap();

        let err = renderer.scroll_to_latex(&id).await.unwrap_err();
        match err {
            RenderError::Template { name, .. } => assert_eq!(name, "lemma_header"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_compiler_failure_cleans_up() {
        let root = TempDir::new().unwrap();
        write_templates(&root, "default");
        let renderer = renderer(&root, "false", "true");
        let id = ScrollId::from("broken");
        renderer.store.write(&id, "BODY").await.unwrap();
        std::fs::create_dir_all(root.path().join("tmp")).unwrap();
        std::fs::write(root.path().join("tmp").join("other.tex"), "keep").unwrap();

        let err = render_scroll(&renderer, &id).await.unwrap_err();
        assert!(matches!(err, RenderError::Process { ref program, .. } if program == "false"));
        assert!(!root.path().join("tmp").join("broken.tex").exists());
        assert!(root.path().join("tmp").join("other.tex").exists());
    }

    #[tokio::test]
    async fn test_missing_scroll() {
        let root = TempDir::new().unwrap();
        let renderer = renderer(&root, "true", "true");

        let err = render_scroll(&renderer, &ScrollId::from("gone")).await.unwrap_err();
        assert!(err.is_missing());
        assert!(!renderer.is_up_to_date(&ScrollId::from("gone")).await);
    }

    #[tokio::test]
    async fn test_fresh_image_is_up_to_date() {
        let root = TempDir::new().unwrap();
        let renderer = renderer(&root, "true", "true");
        let id = ScrollId::from("euler");
        renderer.store.write(&id, "BODY").await.unwrap();
        assert!(!renderer.is_up_to_date(&id).await);

        std::fs::create_dir_all(root.path().join("cache")).unwrap();
        let png = std::fs::File::create(renderer.png_path(&id)).unwrap();
        png.set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(60))
            .unwrap();
        assert!(renderer.is_up_to_date(&id).await);
    }
}
