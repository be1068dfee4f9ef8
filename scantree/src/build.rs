//! Recursive construction of the scan tree from a base directory.

use std::{
    fs,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::{
    archive::{self, Probe},
    node::{aggregate, epoch_now},
    Error, FsDir, FsFile, PathNode, Whitelist,
};

/// Eagerly build the scan tree rooted at `base`.
///
/// Children of each directory are visited in lexicographic basename order and
/// classified in this order: symbolic links are skipped unconditionally;
/// directories pass through the directory whitelist; archive-suffixed files
/// are probed and either expanded (directory whitelist applies to archive
/// roots) or reclassified as regular files; regular files pass through the
/// file whitelist.
///
/// Errors enumerating a directory (typically permission denied) are not
/// propagated: the directory is treated as having no admitted children.
pub fn build(base: &Path, whitelist: &Whitelist) -> Result<FsDir, Error> {
    if !base.is_dir() {
        return Err(Error::NotADirectory {
            path: base.to_owned(),
        });
    }
    Ok(build_dir(base.to_owned(), whitelist))
}

fn build_dir(path: PathBuf, whitelist: &Whitelist) -> FsDir {
    let listing = match list(&path) {
        Ok(entries) => Some(entries),
        Err(err) => {
            debug!("cannot enumerate {path:?}: {err}");
            None
        }
    };
    // "Empty" means the raw listing succeeded and yielded nothing; an
    // unreadable directory is not reported as empty.
    let is_empty = matches!(&listing, Some(entries) if entries.is_empty());

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in listing.unwrap_or_default() {
        if entry.path_is_symlink() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let rendered = entry.path().display().to_string();

        if entry.file_type().is_dir() {
            if whitelist.admit_dir(&name, &rendered) {
                dirs.push(PathNode::FsDir(build_dir(entry.into_path(), whitelist)));
            }
            continue;
        }

        if archive::archive_kind(entry.path()).is_some() {
            if let Probe::Valid(zip) = archive::probe(entry.path()) {
                if whitelist.admit_dir(&name, &rendered) {
                    dirs.push(PathNode::ArchiveRoot(archive::build_root(
                        entry.into_path(),
                        zip,
                        whitelist,
                    )));
                }
                continue;
            }
            // Probe failed: fall through and classify as a regular file.
        }

        if entry.file_type().is_file() && whitelist.admit_file(&name, &rendered) {
            match file_node(entry.into_path()) {
                Ok(node) => files.push(PathNode::FsFile(node)),
                Err(err) => debug!("cannot stat {rendered}: {err}"),
            }
        }
    }

    let (size, length) = aggregate(&dirs, &files);
    FsDir {
        path,
        size,
        mtime: epoch_now(),
        length,
        is_empty,
        dirs,
        files,
    }
}

/// Enumerate the immediate children of `path` in lexicographic basename
/// order. Any enumeration error abandons the whole listing.
fn list(path: &Path) -> Result<Vec<DirEntry>, walkdir::Error> {
    WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .collect()
}

fn file_node(path: PathBuf) -> Result<FsFile, std::io::Error> {
    let meta = fs::metadata(&path)?;
    let mtime = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    Ok(FsFile {
        path,
        size: meta.len(),
        mtime,
    })
}
