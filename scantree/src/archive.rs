//! Zip archive probing, central-directory enumeration, and scoped reading.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::debug;
use zip::{read::ZipFile, result::ZipError, ZipArchive};

use crate::{
    node::{aggregate, epoch_now, render_within},
    ArchiveDir, ArchiveFile, ArchiveRoot, PathNode, SourceError, Whitelist,
};

/// Kinds of archives that expand into directory-like nodes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ArchiveKind {
    /// A zip archive, enumerated via its central directory.
    Zip,
}

lazy_static! {
    /// Registered archive suffixes. A regular file whose extension appears
    /// here is probed as an archive before being classified as a file.
    static ref ARCHIVE_TYPES: HashMap<&'static str, ArchiveKind> =
        HashMap::from([("zip", ArchiveKind::Zip)]);
}

/// Look up the archive kind registered for this path's suffix, if any.
pub(crate) fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ARCHIVE_TYPES.get(ext).copied())
}

/// The result of probing a candidate archive.
pub(crate) enum Probe {
    /// The archive opened; the handle is handed on for enumeration.
    Valid(ZipArchive<File>),

    /// The path cannot be read as an archive of its registered kind and
    /// should be reclassified as a regular file.
    NotAnArchive,
}

/// Attempt to open `path` as an archive.
///
/// Every failure reclassifies: bad format, unsupported compression, and
/// not-found all mean "not a valid archive of this type", and a path that
/// cannot be opened at all will surface its real error later through the
/// regular-file skip path.
pub(crate) fn probe(path: &Path) -> Probe {
    match File::open(path).map_err(ZipError::Io).and_then(ZipArchive::new) {
        Ok(zip) => Probe::Valid(zip),
        Err(err) => {
            debug!("archive probe failed for {path:?}: {err}");
            Probe::NotAnArchive
        }
    }
}

struct RawEntry {
    size: u64,
    mtime: f64,
}

/// Build an archive-root node from an already-open archive handle.
///
/// The handle is consumed and dropped on return; the tree retains only
/// central-directory metadata.
pub(crate) fn build_root(
    path: PathBuf,
    mut zip: ZipArchive<File>,
    whitelist: &Whitelist,
) -> ArchiveRoot {
    let is_empty = zip.len() == 0;

    // Partition the central directory into file entries and directory paths.
    // A path is directory-like when the archive lists it with a trailing
    // slash or when some other entry strictly nests under it.
    let mut files: BTreeMap<String, RawEntry> = BTreeMap::new();
    let mut dirs: BTreeSet<String> = BTreeSet::new();
    for index in 0..zip.len() {
        let entry = match zip.by_index_raw(index) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry {index} in {path:?}: {err}");
                continue;
            }
        };

        let name = entry.name().trim_end_matches('/').to_owned();
        if name.is_empty() {
            continue;
        }

        if entry.is_dir() {
            dirs.insert(name.clone());
        } else {
            files.insert(
                name.clone(),
                RawEntry {
                    size: entry.size(),
                    mtime: entry_mtime(&entry),
                },
            );
        }

        let mut ancestor = name.as_str();
        while let Some(split) = ancestor.rfind('/') {
            ancestor = &ancestor[..split];
            dirs.insert(ancestor.to_owned());
        }
    }

    // A name that is both listed as a file and nested under is treated as a
    // directory.
    for dir in &dirs {
        files.remove(dir);
    }

    let archive = Arc::new(path);
    let (child_dirs, child_files, _) = build_children(&archive, "", &dirs, &files, whitelist);
    let (size, length) = aggregate(&child_dirs, &child_files);

    ArchiveRoot {
        path: archive,
        size,
        mtime: epoch_now(),
        length,
        is_empty,
        dirs: child_dirs,
        files: child_files,
    }
}

/// Recursively construct the admitted children of the archive-internal
/// directory `at`. Returns `(dirs, files, raw_listing_empty)`.
fn build_children(
    archive: &Arc<PathBuf>,
    at: &str,
    dirs: &BTreeSet<String>,
    files: &BTreeMap<String, RawEntry>,
    whitelist: &Whitelist,
) -> (Vec<PathNode>, Vec<PathNode>, bool) {
    let mut raw_count = 0usize;

    let mut child_dirs = Vec::new();
    for name in dirs.iter().filter(|name| parent_of(name) == at) {
        raw_count += 1;
        let rendered = render_within(archive, name);
        if !whitelist.admit_dir(basename_of(name), &rendered) {
            continue;
        }

        let (sub_dirs, sub_files, sub_empty) =
            build_children(archive, name, dirs, files, whitelist);
        let (size, length) = aggregate(&sub_dirs, &sub_files);
        child_dirs.push(PathNode::ArchiveDir(ArchiveDir {
            archive: archive.clone(),
            at: name.clone(),
            size,
            mtime: epoch_now(),
            length,
            is_empty: sub_empty,
            dirs: sub_dirs,
            files: sub_files,
        }));
    }

    let mut child_files = Vec::new();
    for (name, raw) in files.iter().filter(|(name, _)| parent_of(name) == at) {
        raw_count += 1;
        let rendered = render_within(archive, name);
        if !whitelist.admit_file(basename_of(name), &rendered) {
            continue;
        }

        child_files.push(PathNode::ArchiveFile(ArchiveFile {
            archive: archive.clone(),
            at: name.clone(),
            size: raw.size,
            mtime: raw.mtime,
        }));
    }

    (child_dirs, child_files, raw_count == 0)
}

fn parent_of(name: &str) -> &str {
    name.rfind('/').map(|split| &name[..split]).unwrap_or("")
}

fn basename_of(name: &str) -> &str {
    name.rfind('/').map(|split| &name[split + 1..]).unwrap_or(name)
}

/// Convert an entry's central-directory timestamp to seconds since the epoch.
///
/// Zip timestamps have no timezone; they are interpreted as UTC so the value
/// is stable across runs and hosts. Zeroed month/day fields are clamped to 1.
fn entry_mtime(entry: &ZipFile<'_>) -> f64 {
    let dt = entry.last_modified();
    let month = u32::from(dt.month().max(1));
    let day = u32::from(dt.day().max(1));
    NaiveDate::from_ymd_opt(i32::from(dt.year()), month, day)
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(dt.hour()),
                u32::from(dt.minute()),
                u32::from(dt.second()),
            )
        })
        .map(|naive| naive.and_utc().timestamp() as f64)
        .unwrap_or_default()
}

/// An archive opened for a single processing pass.
///
/// Acquired via [`ArchiveRoot::open`] immediately before descending into the
/// root and dropped when the pass is done, so no handle outlives the work
/// that needs it.
pub struct OpenArchive {
    archive: Arc<PathBuf>,
    zip: ZipArchive<File>,
}

impl ArchiveRoot {
    /// Re-open the underlying zip file for reading entry contents.
    pub fn open(&self) -> Result<OpenArchive, SourceError> {
        File::open(self.path())
            .map_err(ZipError::Io)
            .and_then(ZipArchive::new)
            .map(|zip| OpenArchive {
                archive: self.path.clone(),
                zip,
            })
            .map_err(|source| SourceError::Archive {
                path: self.render(),
                source,
            })
    }
}

impl OpenArchive {
    /// Open a reader over the entry at the archive-internal path `at`.
    ///
    /// Fails with a recoverable [`SourceError`] for encrypted entries and
    /// unsupported compression methods.
    pub fn entry(&mut self, at: &str) -> Result<ZipFile<'_>, SourceError> {
        let rendered = render_within(&self.archive, at);
        self.zip
            .by_name(at)
            .map_err(|source| SourceError::Entry {
                path: rendered,
                source,
            })
    }
}
