//! Node variants of the scan tree.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use getset::CopyGetters;

use crate::SourceError;

/// A node in the scan tree.
///
/// Shared behavior (aggregate accounting, rendering) dispatches over the
/// variant; per-variant behavior (listing, opening, metadata) lives on the
/// variant structs.
#[derive(Debug)]
pub enum PathNode {
    /// A filesystem directory.
    FsDir(FsDir),

    /// A filesystem regular file.
    FsFile(FsFile),

    /// A filesystem file recognized as an archive; behaves as a file in its
    /// parent and as a directory over the archive's contents.
    ArchiveRoot(ArchiveRoot),

    /// A directory inside an archive.
    ArchiveDir(ArchiveDir),

    /// A file inside an archive.
    ArchiveFile(ArchiveFile),
}

impl PathNode {
    /// Bytes accounted to this node: file length for files, the sum of all
    /// descendant file lengths for directory-like nodes. For archive roots
    /// this is the sum of the uncompressed entry sizes, not the compressed
    /// archive size.
    pub fn size(&self) -> u64 {
        match self {
            PathNode::FsDir(n) => n.size(),
            PathNode::FsFile(n) => n.size(),
            PathNode::ArchiveRoot(n) => n.size(),
            PathNode::ArchiveDir(n) => n.size(),
            PathNode::ArchiveFile(n) => n.size(),
        }
    }

    /// Count of file descendants; 1 for file nodes.
    pub fn length(&self) -> u64 {
        match self {
            PathNode::FsDir(n) => n.length(),
            PathNode::FsFile(_) | PathNode::ArchiveFile(_) => 1,
            PathNode::ArchiveRoot(n) => n.length(),
            PathNode::ArchiveDir(n) => n.length(),
        }
    }

    /// Modification timestamp in seconds since the epoch. Directory-like
    /// nodes record the wall time at construction instead.
    pub fn mtime(&self) -> f64 {
        match self {
            PathNode::FsDir(n) => n.mtime(),
            PathNode::FsFile(n) => n.mtime(),
            PathNode::ArchiveRoot(n) => n.mtime(),
            PathNode::ArchiveDir(n) => n.mtime(),
            PathNode::ArchiveFile(n) => n.mtime(),
        }
    }

    /// The stable string rendering of this node's path, used both for display
    /// and as the key in the persistent index.
    pub fn render(&self) -> String {
        match self {
            PathNode::FsDir(n) => n.render(),
            PathNode::FsFile(n) => n.render(),
            PathNode::ArchiveRoot(n) => n.render(),
            PathNode::ArchiveDir(n) => n.render(),
            PathNode::ArchiveFile(n) => n.render(),
        }
    }
}

/// A filesystem directory and its admitted children.
#[derive(Debug, CopyGetters)]
pub struct FsDir {
    pub(crate) path: PathBuf,

    /// Sum of all descendant file sizes.
    #[getset(get_copy = "pub")]
    pub(crate) size: u64,

    /// Wall time at construction.
    #[getset(get_copy = "pub")]
    pub(crate) mtime: f64,

    /// Count of file descendants.
    #[getset(get_copy = "pub")]
    pub(crate) length: u64,

    /// True when the raw directory listing yielded no entries at all.
    /// Distinct from "no admitted children": a directory whose children were
    /// all excluded is not empty.
    #[getset(get_copy = "pub")]
    pub(crate) is_empty: bool,

    pub(crate) dirs: Vec<PathNode>,
    pub(crate) files: Vec<PathNode>,
}

impl FsDir {
    /// The directory's filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Admitted directory-like children (directories and archive roots), in
    /// lexicographic basename order.
    pub fn dirs(&self) -> &[PathNode] {
        &self.dirs
    }

    /// Admitted file children, in lexicographic basename order.
    pub fn files(&self) -> &[PathNode] {
        &self.files
    }

    /// The rendered path string.
    pub fn render(&self) -> String {
        self.path.display().to_string()
    }
}

/// A filesystem regular file.
#[derive(Debug, CopyGetters)]
pub struct FsFile {
    pub(crate) path: PathBuf,

    /// File length in bytes, from stat.
    #[getset(get_copy = "pub")]
    pub(crate) size: u64,

    /// Modification timestamp from stat, in seconds since the epoch.
    #[getset(get_copy = "pub")]
    pub(crate) mtime: f64,
}

impl FsFile {
    /// The file's filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rendered path string.
    pub fn render(&self) -> String {
        self.path.display().to_string()
    }

    /// Open the file for hashing.
    pub fn open(&self) -> Result<File, SourceError> {
        File::open(&self.path).map_err(|source| SourceError::File {
            path: self.render(),
            source,
        })
    }
}

/// A filesystem file recognized as an archive, expanded over its contents.
#[derive(Debug, CopyGetters)]
pub struct ArchiveRoot {
    pub(crate) path: Arc<PathBuf>,

    /// Sum of the uncompressed sizes of all admitted entries.
    #[getset(get_copy = "pub")]
    pub(crate) size: u64,

    /// Wall time at construction.
    #[getset(get_copy = "pub")]
    pub(crate) mtime: f64,

    /// Count of file entries beneath this root.
    #[getset(get_copy = "pub")]
    pub(crate) length: u64,

    /// True when the archive's central directory lists no entries at all.
    #[getset(get_copy = "pub")]
    pub(crate) is_empty: bool,

    pub(crate) dirs: Vec<PathNode>,
    pub(crate) files: Vec<PathNode>,
}

impl ArchiveRoot {
    /// The archive's filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Admitted directory entries directly under the archive root.
    pub fn dirs(&self) -> &[PathNode] {
        &self.dirs
    }

    /// Admitted file entries directly under the archive root.
    pub fn files(&self) -> &[PathNode] {
        &self.files
    }

    /// The rendered path string (the archive's filesystem path).
    pub fn render(&self) -> String {
        self.path.display().to_string()
    }
}

/// A directory inside an archive.
#[derive(Debug, CopyGetters)]
pub struct ArchiveDir {
    pub(crate) archive: Arc<PathBuf>,
    pub(crate) at: String,

    /// Sum of all descendant entry sizes.
    #[getset(get_copy = "pub")]
    pub(crate) size: u64,

    /// Wall time at construction.
    #[getset(get_copy = "pub")]
    pub(crate) mtime: f64,

    /// Count of file entries beneath this directory.
    #[getset(get_copy = "pub")]
    pub(crate) length: u64,

    /// True when the archive lists no entries under this directory at all.
    #[getset(get_copy = "pub")]
    pub(crate) is_empty: bool,

    pub(crate) dirs: Vec<PathNode>,
    pub(crate) files: Vec<PathNode>,
}

impl ArchiveDir {
    /// The slash-separated path of this directory within its archive.
    pub fn at(&self) -> &str {
        &self.at
    }

    /// Admitted directory entries directly under this directory.
    pub fn dirs(&self) -> &[PathNode] {
        &self.dirs
    }

    /// Admitted file entries directly under this directory.
    pub fn files(&self) -> &[PathNode] {
        &self.files
    }

    /// The rendered path string: archive filesystem path, a separator, then
    /// the archive-internal slash path.
    pub fn render(&self) -> String {
        render_within(&self.archive, &self.at)
    }
}

/// A file inside an archive.
#[derive(Debug, CopyGetters)]
pub struct ArchiveFile {
    pub(crate) archive: Arc<PathBuf>,
    pub(crate) at: String,

    /// Uncompressed entry length in bytes, from the central directory.
    #[getset(get_copy = "pub")]
    pub(crate) size: u64,

    /// Entry modification timestamp, from the central directory.
    #[getset(get_copy = "pub")]
    pub(crate) mtime: f64,
}

impl ArchiveFile {
    /// The slash-separated path of this entry within its archive.
    pub fn at(&self) -> &str {
        &self.at
    }

    /// The rendered path string: archive filesystem path, a separator, then
    /// the archive-internal slash path.
    pub fn render(&self) -> String {
        render_within(&self.archive, &self.at)
    }
}

/// Archive-internal paths render as `<archive path>/<slash path>`.
/// This rendering keys the persistent index, so it must be stable across runs.
pub(crate) fn render_within(archive: &Path, at: &str) -> String {
    format!("{}/{}", archive.display(), at)
}

/// Sum (size, length) over a node's admitted children.
pub(crate) fn aggregate(dirs: &[PathNode], files: &[PathNode]) -> (u64, u64) {
    let size = dirs.iter().chain(files).map(PathNode::size).sum();
    let length = dirs.iter().chain(files).map(PathNode::length).sum();
    (size, length)
}

/// Wall time in seconds since the epoch, as recorded on directory nodes.
pub(crate) fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
