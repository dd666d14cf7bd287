//! Directory enumeration for uploads.
//!
//! A [`Bundle`] is the in-memory snapshot of a directory tree that every
//! submission transmits. Paths are `/`-separated and start with the name of
//! the root directory, so the root itself is wrapped as one directory entry.

use std::io;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;
use walkdir::WalkDir;

/// Contents of a bundle entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory (including the root).
    Directory,
    /// A regular file and its bytes.
    File(Bytes),
}

/// A single file or directory inside a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Path relative to the parent of the root, e.g. `dist/js/app.js`.
    pub path: String,
    /// Directory marker or file contents.
    pub kind: EntryKind,
}

/// Immutable snapshot of a directory tree, parents before children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    root: String,
    entries: Vec<BundleEntry>,
}

impl Bundle {
    /// Assemble a bundle from pre-built entries.
    pub fn new(root: impl Into<String>, entries: Vec<BundleEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
        }
    }

    /// Name of the root directory.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// All entries in upload order.
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Number of regular files.
    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::File(_)))
            .count()
    }

    /// Sum of all file sizes in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match &e.kind {
                EntryKind::File(data) => data.len() as u64,
                EntryKind::Directory => 0,
            })
            .sum()
    }
}

/// Read-only enumerator of a directory tree.
pub trait DirectorySource: Send + Sync {
    /// Snapshot the tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a readable directory or any entry
    /// beneath it cannot be read.
    fn load(&self, root: &Path) -> io::Result<Bundle>;
}

/// [`DirectorySource`] backed by the local filesystem.
///
/// Entries are visited in file-name order so repeated uploads of the same
/// tree send identical requests. Symbolic links are not followed and are
/// left out of the bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirectorySource {
    skip_hidden: bool,
}

impl FsDirectorySource {
    /// Create a source that includes hidden files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave out entries whose name starts with `.`.
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }
}

impl DirectorySource for FsDirectorySource {
    fn load(&self, root: &Path) -> io::Result<Bundle> {
        let meta = std::fs::metadata(root)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }

        let canonical = std::fs::canonicalize(root)?;
        let root_name = canonical
            .file_name()
            .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());

        let skip_hidden = self.skip_hidden;
        let walker = WalkDir::new(&canonical)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                e.depth() == 0 || !(skip_hidden && e.file_name().to_string_lossy().starts_with('.'))
            });

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&canonical)
                .map_err(io::Error::other)?;

            let mut path = root_name.clone();
            for component in relative.components() {
                path.push('/');
                path.push_str(&component.as_os_str().to_string_lossy());
            }

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File(Bytes::from(std::fs::read(entry.path())?))
            } else {
                debug!(path = %entry.path().display(), "skipping non-regular entry");
                continue;
            };

            entries.push(BundleEntry { path, kind });
        }

        debug!(root = %root_name, entries = entries.len(), "directory enumerated");
        Ok(Bundle::new(root_name, entries))
    }
}
