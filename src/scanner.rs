/*!
 * Directory enumeration into file records
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::ProgressBar;
use walkdir::WalkDir;

use crate::error::{PackError, Result};
use crate::types::FileRecord;

/// Walks a project directory and lists its files
pub struct Scanner {
    /// Directory to scan
    root: PathBuf,
    /// Progress bar, advanced once per file
    progress: Arc<ProgressBar>,
}

impl Scanner {
    /// Create a new scanner
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            progress: Arc::new(ProgressBar::hidden()),
        }
    }

    /// Report progress on `progress`
    pub fn with_progress(mut self, progress: Arc<ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    fn canonical_root(&self) -> Result<PathBuf> {
        fs::canonicalize(&self.root)
            .map_err(|_| PackError::PathNotFound(self.root.display().to_string()))
    }

    /// Name of the root folder, used as the first segment of every path
    pub fn root_name(&self) -> Result<String> {
        let abs = self.canonical_root()?;
        Ok(folder_name(&abs))
    }

    /// Count regular files below the root
    pub fn count_files(&self) -> Result<u64> {
        let abs = self.canonical_root()?;
        Ok(WalkDir::new(abs)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .count() as u64)
    }

    /// List every regular file, sorted by name at each level
    ///
    /// Paths are `/`-separated and start with the root folder name. Entries
    /// that cannot be read are logged and skipped.
    pub fn scan(&self) -> Result<Vec<FileRecord>> {
        let abs = self.canonical_root()?;
        let root_name = folder_name(&abs);
        let mut files = Vec::new();

        for entry in WalkDir::new(&abs).sort_by_file_name().follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Error walking {}: {}", abs.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    log::warn!("Error reading metadata for {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let relative = match relative_path(&abs, entry.path(), &root_name) {
                Some(path) => path,
                None => continue,
            };
            log::trace!("Found {}", relative);
            self.progress.inc(1);
            files.push(FileRecord::on_disk(relative, entry.path().to_path_buf(), size));
        }

        log::debug!("Scanned {} files under {}", files.len(), abs.display());
        Ok(files)
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "project".to_string())
}

/// `root/a/b.rs` for `abs_root/a/b.rs`
fn relative_path(root: &Path, path: &Path, root_name: &str) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut joined = String::from(root_name);
    for component in rel.components() {
        joined.push('/');
        joined.push_str(&component.as_os_str().to_string_lossy());
    }
    Some(joined)
}
