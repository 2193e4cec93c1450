//! Temporary directories for config-loading tests.

#![allow(clippy::missing_errors_doc)]

use std::path::{Path, PathBuf};
use std::{fs, io};

/// Temporary directory that is removed when dropped
///
/// ```rust,ignore
/// use sealgate_common::testing::TempDir;
///
/// let dir = TempDir::new("loader").unwrap();
/// let path = dir.create_file("sealgate.json", "{}").unwrap();
/// assert!(path.exists());
/// ```
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    /// Create a new uniquely named directory under the system temp dir
    pub fn new(prefix: &str) -> io::Result<Self> {
        let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `contents` to `name` inside the directory; `name` may contain
    /// subdirectories, which are created.
    pub fn create_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let file_path = self.path.join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, contents)?;
        Ok(file_path)
    }

    /// Create a subdirectory (and any missing parents)
    pub fn create_dir(&self, name: &str) -> io::Result<PathBuf> {
        let dir_path = self.path.join(name);
        fs::create_dir_all(&dir_path)?;
        Ok(dir_path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
