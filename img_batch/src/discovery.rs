//! Input discovery: files in a folder whose extension is in the requested set.

use crate::error::{JobError, Result};
use crate::formats::expand_extensions;
use shared_utils::extension_lowercase;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A restartable view over the matching files of one folder.
///
/// Nothing is read until [`Discovery::iter`] is called, and every call starts a
/// fresh enumeration.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
    sorted: bool,
}

impl Discovery {
    pub fn new<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Self> {
        let not_found = |source: Option<std::io::Error>| JobError::DirectoryNotFound {
            path: dir.to_path_buf(),
            source,
        };

        let root = dir.canonicalize().map_err(|e| not_found(Some(e)))?;
        if !root.is_dir() {
            return Err(not_found(None));
        }
        std::fs::read_dir(&root).map_err(|e| not_found(Some(e)))?;

        Ok(Self {
            root,
            extensions: expand_extensions(extensions),
            recursive: false,
            sorted: false,
        })
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Sort by file name within each directory instead of enumeration order.
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn matches(&self, path: &Path) -> bool {
        let ext = extension_lowercase(path);
        !ext.is_empty() && self.extensions.iter().any(|e| *e == ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(if self.recursive { usize::MAX } else { 1 })
            .follow_links(true);
        if self.sorted {
            walker = walker.sort_by_file_name();
        }

        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(move |path| self.matches(path))
    }
}
