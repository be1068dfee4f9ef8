//! The persistent index of file fingerprints, keyed by path.
//!
//! The index is a single-table SQLite database. Each row pairs a path string
//! with the file's fingerprint and its modification timestamp at the time it
//! was hashed; numeric fields are encoded as decimal strings so rows
//! round-trip exactly (the mtime string is the shortest form that parses back
//! to the identical float).
//!
//! Writer semantics are upsert-plus-delete: every record observed by a scan
//! replaces (or inserts) its row, and every key in the removed set deletes
//! its row. An empty removed set performs no deletions, which is what keeps
//! cancelled scans from destroying untouched rows.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

use std::{
    collections::HashMap,
    num::{ParseFloatError, ParseIntError},
    path::{Path, PathBuf},
};

use fingerprint::Fingerprint;
use getset::Getters;
use log::debug;
use rusqlite::{params, Connection};
use thiserror::Error;
use typed_builder::TypedBuilder;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    size TEXT NOT NULL,
    mtime TEXT NOT NULL,
    md5 TEXT NOT NULL,
    sha1 TEXT NOT NULL
);
";
const SELECT_ALL: &str = "SELECT path, size, mtime, md5, sha1 FROM files;";
const UPSERT: &str = "
INSERT OR REPLACE INTO files (path, size, mtime, md5, sha1)
VALUES (?1, ?2, ?3, ?4, ?5);
";
const DELETE: &str = "DELETE FROM files WHERE path = ?1;";

/// Errors reported by the index store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying database operation failed.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded back into a record.
    #[error("decode row for '{path}'")]
    Decode {
        /// The path key of the offending row.
        path: String,

        /// The field-level decode failure.
        #[source]
        source: DecodeError,
    },
}

/// Field-level failures decoding a stored row.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The size field is not a decimal integer.
    #[error("invalid size: {0}")]
    Size(#[from] ParseIntError),

    /// The mtime field is not a decimal float.
    #[error("invalid mtime: {0}")]
    Mtime(#[from] ParseFloatError),

    /// A digest field is not valid hex of the expected length.
    #[error("invalid digest: {0}")]
    Digest(#[from] fingerprint::ParseError),
}

/// One row in the index: a path, the file's modification timestamp when it
/// was hashed, and its content fingerprint.
#[derive(Clone, PartialEq, Debug, Getters, TypedBuilder)]
#[getset(get = "pub")]
pub struct FileRecord {
    /// The rendered path string; unique key of the row.
    #[builder(setter(into))]
    path: String,

    /// Modification timestamp in seconds since the epoch, compared by exact
    /// float equality during reconciliation.
    mtime: f64,

    /// The file's content fingerprint.
    fingerprint: Fingerprint,
}

impl FileRecord {
    /// Create a record.
    pub fn new(path: impl Into<String>, mtime: f64, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            mtime,
            fingerprint,
        }
    }

    fn decode(
        path: String,
        size: String,
        mtime: String,
        md5: String,
        sha1: String,
    ) -> Result<Self, Error> {
        let decoded = || -> Result<Self, DecodeError> {
            let fingerprint =
                Fingerprint::new(size.parse()?, md5.parse()?, sha1.parse()?);
            Ok(Self {
                path: path.clone(),
                mtime: mtime.parse()?,
                fingerprint,
            })
        };
        decoded().map_err(|source| Error::Decode { path, source })
    }
}

/// The on-disk index store.
///
/// Connections are scoped to each operation; nothing is held open between
/// the read at startup and the write at shutdown.
#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Address an index store at the given path. The database file and its
    /// table are created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record into a path-keyed map.
    ///
    /// A missing or empty database is an empty baseline, not an error.
    pub fn read_all(&self) -> Result<HashMap<String, FileRecord>, Error> {
        let conn = self.open()?;
        let mut select = conn.prepare(SELECT_ALL)?;
        let rows = select.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = HashMap::new();
        for row in rows {
            let (path, size, mtime, md5, sha1) = row?;
            let record = FileRecord::decode(path, size, mtime, md5, sha1)?;
            records.insert(record.path.clone(), record);
        }

        debug!("read {} baseline record(s) from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Apply a scan's results: upsert every record, then delete every removed
    /// key, in one transaction.
    pub fn apply(&self, records: &[FileRecord], removed: &[String]) -> Result<(), Error> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(UPSERT)?;
            for record in records {
                upsert.execute(params![
                    record.path,
                    record.fingerprint.size().to_string(),
                    record.mtime.to_string(),
                    record.fingerprint.md5().to_string(),
                    record.fingerprint.sha1().to_string(),
                ])?;
            }

            let mut delete = tx.prepare(DELETE)?;
            for path in removed {
                delete.execute(params![path])?;
            }
        }
        tx.commit()?;

        debug!(
            "applied {} record(s) and {} removal(s) to {:?}",
            records.len(),
            removed.len(),
            self.path
        );
        Ok(())
    }

    fn open(&self) -> Result<Connection, Error> {
        let conn = Connection::open(&self.path)?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(conn)
    }
}
