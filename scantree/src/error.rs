use std::{io, path::PathBuf};

use thiserror::Error;
use zip::result::ZipError;

/// Errors encountered while configuring or building the scan tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The scan root does not denote a directory.
    #[error("not a directory: {path:?}")]
    NotADirectory {
        /// The base path provided to the tree builder.
        path: PathBuf,
    },

    /// A file exclusion pattern is not a valid regular expression.
    #[error("invalid exclusion pattern '{pattern}'")]
    Pattern {
        /// The pattern as provided to the whitelist.
        pattern: String,

        /// The error returned by the regex compiler.
        #[source]
        source: regex::Error,
    },
}

/// Errors opening or reading a file's bytes during processing.
///
/// These are produced after tree construction, when a caller asks for the
/// actual contents of a node it is about to hash.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// A filesystem file could not be opened.
    #[error("open {path}")]
    File {
        /// The rendered path of the file.
        path: String,

        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The archive containing an entry could not be opened.
    #[error("open archive {path}")]
    Archive {
        /// The rendered path of the archive.
        path: String,

        /// The underlying error.
        #[source]
        source: ZipError,
    },

    /// An entry within an archive could not be located or decoded.
    #[error("open archive entry {path}")]
    Entry {
        /// The rendered path of the entry.
        path: String,

        /// The underlying error.
        #[source]
        source: ZipError,
    },
}

impl SourceError {
    /// True for the recoverable class of failure: the caller skips the file,
    /// advances its byte accounting by the declared size, and continues.
    ///
    /// Recoverable failures are permission-denied and not-found for
    /// filesystem sources; for archives, additionally bad-format,
    /// unsupported-compression, and encrypted entries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SourceError::File { source, .. } => recoverable_io(source),
            SourceError::Archive { source, .. } | SourceError::Entry { source, .. } => {
                match source {
                    ZipError::FileNotFound => true,
                    ZipError::InvalidArchive(_) => true,
                    ZipError::UnsupportedArchive(_) => true,
                    ZipError::Io(io) => recoverable_io(io),
                    _ => false,
                }
            }
        }
    }
}

pub(crate) fn recoverable_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
    )
}
