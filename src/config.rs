use crate::error::{AppError, Result};
use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Name of the index directory inside the Alexandria directory
pub const INDEX_DIRECTORY_NAME: &str = "bleve";

/// Name of the sentinel file whose modification time marks the last index update
pub const INDEX_MARKER_NAME: &str = "index_updated";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// On-disk layout of the library
    pub library: LibraryConfig,

    /// Render pipeline configuration
    #[serde(default)]
    #[validate(nested)]
    pub render: RenderConfig,

    /// Search index configuration
    #[serde(default)]
    #[validate(nested)]
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and
    /// the environment (prefix: ALEXANDRIA, separator: __)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix("ALEXANDRIA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Configuration with every directory placed below `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            library: LibraryConfig {
                knowledge_directory: root.join("library"),
                temp_directory: root.join("tmp"),
                cache_directory: root.join("cache"),
                alexandria_directory: root.join("alexandria"),
                template_directory: None,
                source_extension: default_source_extension(),
            },
            render: RenderConfig::default(),
            search: SearchConfig::default(),
        }
    }

    /// Directory holding the Tantivy index
    pub fn index_path(&self) -> PathBuf {
        self.library.alexandria_directory.join(INDEX_DIRECTORY_NAME)
    }

    /// Sentinel file recording when the last index update started
    pub fn marker_path(&self) -> PathBuf {
        self.library.alexandria_directory.join(INDEX_MARKER_NAME)
    }

    /// Directory holding the LaTeX header/footer templates
    pub fn template_directory(&self) -> PathBuf {
        self.library
            .template_directory
            .clone()
            .unwrap_or_else(|| self.library.alexandria_directory.join("templates"))
    }

    /// Create every directory the program writes to
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.library.knowledge_directory,
            &self.library.temp_directory,
            &self.library.cache_directory,
            &self.library.alexandria_directory,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::Configuration(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory containing one source file per scroll
    pub knowledge_directory: PathBuf,

    /// Scratch space for intermediate LaTeX/PDF files
    pub temp_directory: PathBuf,

    /// Rendered images
    pub cache_directory: PathBuf,

    /// Index, index marker and templates
    pub alexandria_directory: PathBuf,

    /// Template directory (default: <alexandria_directory>/templates)
    #[serde(default)]
    pub template_directory: Option<PathBuf>,

    /// Extension of scroll source files, without the dot
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenderConfig {
    /// Maximum number of scrolls rendered in parallel
    #[serde(default = "default_max_procs")]
    #[validate(range(min = 1))]
    pub max_procs: usize,

    /// Image quality passed to the converter
    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Rasterization density
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// LaTeX to PDF compiler
    #[serde(default = "default_latex_program")]
    pub latex_program: String,

    /// PDF to PNG converter
    #[serde(default = "default_converter_program")]
    pub converter_program: String,

    /// What a batch render does when a scroll fails for a reason other than
    /// being missing
    #[serde(default)]
    pub batch_policy: BatchPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_procs: default_max_procs(),
            quality: default_quality(),
            dpi: default_dpi(),
            latex_program: default_latex_program(),
            converter_program: default_converter_program(),
            batch_policy: BatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Abort the whole batch on the first systemic failure
    #[default]
    FailFast,

    /// Log systemic failures and render the remaining scrolls
    KeepGoing,
}

fn default_source_extension() -> String {
    "tex".to_string()
}

fn default_max_procs() -> usize {
    4
}

fn default_quality() -> u32 {
    90
}

fn default_dpi() -> u32 {
    160
}

fn default_latex_program() -> String {
    "xelatex".to_string()
}

fn default_converter_program() -> String {
    "convert".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_source_extension(), "tex");
        assert_eq!(default_latex_program(), "xelatex");
        assert_eq!(BatchPolicy::default(), BatchPolicy::FailFast);
    }

    #[test]
    fn test_derived_paths() {
        let config = Config::with_root("/srv/alexandria");
        assert_eq!(config.index_path(), PathBuf::from("/srv/alexandria/alexandria/bleve"));
        assert_eq!(
            config.marker_path(),
            PathBuf::from("/srv/alexandria/alexandria/index_updated")
        );
        assert_eq!(
            config.template_directory(),
            PathBuf::from("/srv/alexandria/alexandria/templates")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[library]\nknowledge_directory = \"/k\"\ntemp_directory = \"/t\"\ncache_directory = \"/c\"\nalexandria_directory = \"/a\"\n\n[render]\nmax_procs = 2\nbatch_policy = \"keep_going\"\n\n[search]\nmax_results = 7"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.library.knowledge_directory, PathBuf::from("/k"));
        assert_eq!(config.render.max_procs, 2);
        assert_eq!(config.render.batch_policy, BatchPolicy::KeepGoing);
        assert_eq!(config.render.dpi, default_dpi());
        assert_eq!(config.search.max_results, 7);
    }

    #[test]
    fn test_zero_max_procs_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[render]\nmax_procs = 0").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
