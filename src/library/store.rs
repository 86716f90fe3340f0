use crate::config::Config;
use crate::models::{parse, Scroll, ScrollId};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A scroll source file found in the knowledge directory
#[derive(Debug, Clone)]
pub struct StoredScroll {
    pub id: ScrollId,
    pub path: PathBuf,
    /// `None` if the file system could not report a modification time
    pub modified: Option<SystemTime>,
    pub size: u64,
}

/// Flat-file scroll storage
#[derive(Debug, Clone)]
pub struct ScrollStore {
    directory: PathBuf,
    extension: String,
}

impl ScrollStore {
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.library.knowledge_directory.clone(),
            config.library.source_extension.clone(),
        )
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the source file backing `id`
    pub fn path_for(&self, id: &ScrollId) -> PathBuf {
        self.directory
            .join(format!("{}.{}", id.as_str(), self.extension))
    }

    /// Derive the scroll id from a file name, if it carries the source extension
    pub fn id_for_file_name(&self, file_name: &str) -> Option<ScrollId> {
        let stem = file_name
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ScrollId::from(stem))
    }

    pub fn modified(&self, id: &ScrollId) -> io::Result<SystemTime> {
        std::fs::metadata(self.path_for(id))?.modified()
    }

    /// Raw source text of a scroll. Bytes that are not UTF-8 are replaced
    /// with U+FFFD rather than failing the read.
    pub async fn read(&self, id: &ScrollId) -> io::Result<String> {
        let bytes = tokio::fs::read(self.path_for(id)).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(scroll_id = %id, "Scroll is not valid UTF-8, replacing invalid bytes");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        })
    }

    /// Read and parse a scroll
    pub async fn load(&self, id: &ScrollId) -> io::Result<Scroll> {
        let text = self.read(id).await?;
        Ok(parse(id.clone(), &text))
    }

    pub async fn write(&self, id: &ScrollId, text: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(self.path_for(id), text).await
    }

    /// All scroll source files, sorted by id
    pub fn list(&self) -> io::Result<Vec<StoredScroll>> {
        let mut scrolls = Vec::new();

        for entry in std::fs::read_dir(&self.directory)? {
            let entry = entry?;
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Cannot stat library file");
                    continue;
                }
            };

            let file_name = entry.file_name();
            let Some(id) = file_name.to_str().and_then(|name| self.id_for_file_name(name)) else {
                continue;
            };

            scrolls.push(StoredScroll {
                id,
                path: entry.path(),
                modified: metadata.modified().ok(),
                size: metadata.len(),
            });
        }

        scrolls.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(scrolls)
    }

    /// Combined size in bytes of every regular file in the knowledge directory
    pub fn total_size(&self) -> io::Result<u64> {
        let mut total = 0;
        for entry in std::fs::read_dir(&self.directory)? {
            let metadata = entry?.metadata()?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}
