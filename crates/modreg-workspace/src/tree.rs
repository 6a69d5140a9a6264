//! Virtual file store
//!
//! Writes go through an update handle: [`VirtualTree::begin_update`] records
//! the content hash the writer started from and [`VirtualTree::commit_update`]
//! refuses the write when the stored file changed in between. Paths are
//! normalized to absolute, `/`-separated form on every access.

use modreg_change::ContentHash;
use std::collections::BTreeMap;

/// Errors from the file store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Path does not exist
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// File content is not valid UTF-8
    #[error("file is not valid UTF-8: {path}")]
    NotUtf8 { path: String },

    /// The file changed after `begin_update`
    #[error("concurrent modification of {path}: expected {expected}, found {actual}")]
    ConcurrentModification {
        path: String,
        expected: String,
        actual: String,
    },

    /// The update handle carries nothing to write
    #[error("update for {path} recorded no content")]
    UpdateMismatch { path: String },
}

/// Pending write of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecorder {
    path: String,
    base: Option<ContentHash>,
    content: Option<Vec<u8>>,
}

impl UpdateRecorder {
    /// Start recording a write of `path` whose current content hashes to `base`
    #[must_use]
    pub fn new(path: impl Into<String>, base: Option<ContentHash>) -> Self {
        Self {
            path: path.into(),
            base,
            content: None,
        }
    }

    /// Target path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Hash of the content at `begin_update`, `None` for a new file
    #[must_use]
    pub fn base(&self) -> Option<ContentHash> {
        self.base
    }

    /// Replace the whole file content
    pub fn overwrite(&mut self, content: impl Into<Vec<u8>>) {
        self.content = Some(content.into());
    }

    /// Recorded content
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }
}

/// Host file store
pub trait VirtualTree {
    /// Raw content of `path`
    fn read(&self, path: &str) -> Option<Vec<u8>>;

    /// Open an update handle for `path`
    ///
    /// # Errors
    /// Implementations may refuse paths they cannot write
    fn begin_update(&self, path: &str) -> Result<UpdateRecorder, StoreError>;

    /// Apply a recorded update
    ///
    /// # Errors
    /// [`StoreError::ConcurrentModification`] when the file changed after
    /// `begin_update`, [`StoreError::UpdateMismatch`] when nothing was recorded
    fn commit_update(&mut self, recorder: UpdateRecorder) -> Result<(), StoreError>;

    /// True when `path` exists
    fn exists(&self, path: &str) -> bool {
        self.read(path).is_some()
    }

    /// Content of `path` as UTF-8 text
    ///
    /// # Errors
    /// [`StoreError::FileNotFound`] or [`StoreError::NotUtf8`]
    fn read_text(&self, path: &str) -> Result<String, StoreError> {
        let bytes = self.read(path).ok_or_else(|| StoreError::FileNotFound {
            path: path.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|_| StoreError::NotUtf8 {
            path: path.to_string(),
        })
    }
}

/// Normalize a store path: absolute, `/`-separated, `.` and `..` resolved
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// In-memory [`VirtualTree`]
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
    commits: usize,
}

impl MemoryTree {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryTree::insert`]
    #[must_use]
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Write a file directly, bypassing the update protocol
    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize_path(path), content.into());
    }

    /// Number of successful `commit_update` calls
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Stored paths in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl VirtualTree for MemoryTree {
    fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(&normalize_path(path)).cloned()
    }

    fn begin_update(&self, path: &str) -> Result<UpdateRecorder, StoreError> {
        let path = normalize_path(path);
        let base = self.files.get(&path).map(|c| ContentHash::compute(c));
        Ok(UpdateRecorder::new(path, base))
    }

    fn commit_update(&mut self, recorder: UpdateRecorder) -> Result<(), StoreError> {
        let UpdateRecorder { path, base, content } = recorder;
        let current = self.files.get(&path).map(|c| ContentHash::compute(c));
        if current != base {
            let describe = |hash: Option<ContentHash>| {
                hash.map_or_else(|| "<absent>".to_string(), |h| h.short())
            };
            return Err(StoreError::ConcurrentModification {
                expected: describe(base),
                actual: describe(current),
                path,
            });
        }
        let content = content.ok_or_else(|| StoreError::UpdateMismatch { path: path.clone() })?;

        tracing::debug!(%path, bytes = content.len(), "committing update");
        self.files.insert(path, content);
        self.commits += 1;
        Ok(())
    }
}
