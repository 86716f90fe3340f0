//! Common test utilities
//!
//! Builds throwaway libraries in a temporary directory and stands in for
//! XeLaTeX and ImageMagick with small shell scripts.

#![allow(dead_code)]

use alexandria::models::ScrollId;
use alexandria::Config;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

static PROCESS_LOCK: Mutex<()> = Mutex::new(());

/// Held by tests that write and run scripts. Writing an executable while
/// another thread forks can make the exec fail with "text file busy".
pub fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A library rooted in a temporary directory
pub struct TestLibrary {
    pub root: TempDir,
    pub config: Config,
}

impl TestLibrary {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let mut config = Config::with_root(root.path());
        config.render.max_procs = 2;
        config.ensure_directories().unwrap();
        Self { root, config }
    }

    /// Replace the external programs with scripts that log each call to
    /// `calls.log`; the converter creates its output file.
    pub fn with_fake_programs(mut self) -> Self {
        let log = self.calls_log();
        let latex = self.write_script("fake-xelatex", &format!("echo latex >> '{}'\n", log.display()));
        let converter = self.write_script(
            "fake-convert",
            &format!(
                "for last; do :; done\necho convert >> '{}'\ntouch \"$last\"\n",
                log.display()
            ),
        );
        self.config.render.latex_program = latex.display().to_string();
        self.config.render.converter_program = converter.display().to_string();
        self
    }

    /// Write the global and type specific templates for `scroll_type`
    pub fn with_templates(self, scroll_type: &str) -> Self {
        let dir = self.config.template_directory();
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "header".to_string(),
            "footer".to_string(),
            format!("{}_header", scroll_type),
            format!("{}_footer", scroll_type),
        ] {
            std::fs::write(dir.join(format!("{}.tex", name)), format!("% {}\n", name)).unwrap();
        }
        self
    }

    pub fn scroll_path(&self, id: &str) -> PathBuf {
        self.config.library.knowledge_directory.join(format!("{}.tex", id))
    }

    pub fn png_path(&self, id: &str) -> PathBuf {
        self.config.library.cache_directory.join(format!("{}.png", id))
    }

    pub fn write_scroll(&self, id: &str, text: &str) -> ScrollId {
        std::fs::write(self.scroll_path(id), text).unwrap();
        ScrollId::from(id)
    }

    pub fn delete_scroll(&self, id: &str) {
        std::fs::remove_file(self.scroll_path(id)).unwrap();
    }

    pub fn calls_log(&self) -> PathBuf {
        self.root.path().join("calls.log")
    }

    /// Number of external program invocations so far
    pub fn program_calls(&self) -> usize {
        std::fs::read_to_string(self.calls_log())
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    fn write_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        make_executable(&path);
        path
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Set the modification time of a file
pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

pub fn hours_ago(hours: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(hours * 3600)
}

pub fn hours_ahead(hours: u64) -> SystemTime {
    SystemTime::now() + Duration::from_secs(hours * 3600)
}
