//! Index freshness marker
//!
//! The modification time of a sentinel file records when the last index
//! update started. It is read before and touched at the start of every
//! update, so scrolls edited while an update runs are picked up next time.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct FreshnessMarker {
    path: PathBuf,
}

impl FreshnessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time of the last update, or the Unix epoch if the marker cannot be read.
    /// Falling back to the epoch means reindexing too much, never too little.
    pub fn last_update(&self) -> SystemTime {
        match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(time) => time,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Cannot read index marker");
                }
                SystemTime::UNIX_EPOCH
            }
        }
    }

    /// Set the marker to the current time, creating it if necessary
    pub fn touch(&self) -> io::Result<SystemTime> {
        self.touch_at(SystemTime::now())
    }

    pub fn touch_at(&self, time: SystemTime) -> io::Result<SystemTime> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)?;
        file.set_modified(time)?;
        Ok(time)
    }
}
