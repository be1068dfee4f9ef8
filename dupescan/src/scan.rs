//! Walks the scan tree, reconciling observed files against the baseline.
//!
//! The walker owns every piece of traversal state: the baseline mapping,
//! the accumulated record lists, and the progress/ETA accounting. It visits
//! files before subdirectories at each node, in lexicographic order, and
//! consumes the baseline as it goes: a baseline entry whose modification
//! timestamp matches the node exactly is reused without rehashing and
//! removed from the mapping, so whatever remains at the end is the set of
//! keys that vanished since the previous run.
//!
//! Cancellation is cooperative. The token is checked between files and
//! between hash chunks; once it trips, traversal unwinds promptly, the
//! removed-keys set is suppressed so the index writer deletes nothing, and
//! whatever was accumulated is still reported.

use std::{collections::HashMap, io::Read};

use cancel::Token;
use filedb::FileRecord;
use fingerprint::{Fingerprint, Hasher, Interrupted};
use log::{debug, error, info};
use scantree::{ArchiveFile, ArchiveRoot, FsDir, FsFile, OpenArchive, PathNode, SourceError};
use stable_eyre::eyre::Report;

use crate::{
    console,
    progress::{Eta, Progress},
};

/// Everything accumulated by one traversal.
#[derive(Debug)]
pub struct Walked {
    /// Every record observed this run: reused baseline rows plus newly
    /// hashed files, in traversal order. This is the set upserted into the
    /// index and the input to duplicate grouping.
    pub records: Vec<FileRecord>,

    /// Rendered paths of the files newly hashed this run.
    pub new_paths: Vec<String>,

    /// Baseline keys not observed this run, sorted. Forced empty when the
    /// traversal stopped early, so a partial scan never causes deletions.
    pub removed: Vec<String>,

    /// Rendered paths of directory nodes whose raw listing was empty, in
    /// traversal order.
    pub empty_dirs: Vec<String>,

    /// Bytes that actually went through the hash pipeline. Zero when every
    /// file was reused from the baseline.
    pub hashed_bytes: u64,

    /// True when the traversal stopped before completing.
    pub cancelled: bool,
}

/// Walk the tree, consuming `baseline`.
pub fn walk(root: &FsDir, baseline: HashMap<String, FileRecord>, token: &Token) -> Walked {
    let mut walker = Walker {
        baseline,
        records: Vec::new(),
        new_paths: Vec::new(),
        empty_dirs: Vec::new(),
        progress: Progress::new(root.size()),
        eta: Eta::new(root.size()),
        hasher: Hasher::new(),
        hashed_bytes: 0,
        token,
    };

    let halted = walker.process_fs_dir(root);
    console::clear();

    let (removed, cancelled) = match halted {
        Ok(()) => {
            let mut removed: Vec<String> = walker.baseline.keys().cloned().collect();
            removed.sort();
            (removed, false)
        }
        Err(Halt::Cancelled) => {
            info!("cancellation requested; stopping");
            (Vec::new(), true)
        }
        Err(Halt::Fatal(report)) => {
            error!("traversal stopped by unexpected error: {report:?}");
            (Vec::new(), true)
        }
    };

    Walked {
        records: walker.records,
        new_paths: walker.new_paths,
        removed,
        empty_dirs: walker.empty_dirs,
        hashed_bytes: walker.hashed_bytes,
        cancelled,
    }
}

enum Halt {
    Cancelled,
    Fatal(Report),
}

struct Walker<'a> {
    baseline: HashMap<String, FileRecord>,
    records: Vec<FileRecord>,
    new_paths: Vec<String>,
    empty_dirs: Vec<String>,
    progress: Progress,
    eta: Eta,
    hasher: Hasher,
    hashed_bytes: u64,
    token: &'a Token,
}

impl Walker<'_> {
    fn process_fs_dir(&mut self, dir: &FsDir) -> Result<(), Halt> {
        if dir.is_empty() {
            self.empty_dirs.push(dir.render());
            return Ok(());
        }

        let mut dir_progress = Progress::new(dir.files().len() as u64);
        for node in dir.files() {
            self.check_cancel()?;
            dir_progress.current += 1;
            let indicator = format!("[{}]", dir_progress.string());
            if let PathNode::FsFile(file) = node {
                self.process_fs_file(file, &indicator)?;
            }
        }

        for node in dir.dirs() {
            self.check_cancel()?;
            match node {
                PathNode::FsDir(sub) => self.process_fs_dir(sub)?,
                PathNode::ArchiveRoot(root) => self.process_archive_root(root)?,
                _ => {}
            }
        }

        Ok(())
    }

    fn process_archive_root(&mut self, root: &ArchiveRoot) -> Result<(), Halt> {
        if root.is_empty() {
            self.empty_dirs.push(root.render());
            return Ok(());
        }

        // The handle is scoped to this pass over the archive's contents.
        let mut open = match root.open() {
            Ok(open) => open,
            Err(err) if err.is_recoverable() => {
                // The archive may have been deleted since tree construction.
                debug!("skipping archive {}: {err}", root.render());
                self.skip(root.size());
                return Ok(());
            }
            Err(err) => return Err(Halt::Fatal(Report::new(err))),
        };

        self.process_archive_children(root.dirs(), root.files(), &mut open)
    }

    fn process_archive_children(
        &mut self,
        dirs: &[PathNode],
        files: &[PathNode],
        open: &mut OpenArchive,
    ) -> Result<(), Halt> {
        let mut dir_progress = Progress::new(files.len() as u64);
        for node in files {
            self.check_cancel()?;
            dir_progress.current += 1;
            let indicator = format!("[{}]", dir_progress.string());
            if let PathNode::ArchiveFile(file) = node {
                self.process_archive_file(file, &indicator, open)?;
            }
        }

        for node in dirs {
            self.check_cancel()?;
            if let PathNode::ArchiveDir(dir) = node {
                if dir.is_empty() {
                    self.empty_dirs.push(dir.render());
                    continue;
                }
                self.process_archive_children(dir.dirs(), dir.files(), open)?;
            }
        }

        Ok(())
    }

    fn process_fs_file(&mut self, file: &FsFile, indicator: &str) -> Result<(), Halt> {
        self.reconcile(file.render(), file.size(), file.mtime(), indicator, || {
            file.open().map(|handle| Box::new(handle) as Box<dyn Read>)
        })
    }

    fn process_archive_file(
        &mut self,
        file: &ArchiveFile,
        indicator: &str,
        open: &mut OpenArchive,
    ) -> Result<(), Halt> {
        self.reconcile(file.render(), file.size(), file.mtime(), indicator, || {
            open.entry(file.at())
                .map(|entry| Box::new(entry) as Box<dyn Read + '_>)
        })
    }

    /// Reconcile one file against the baseline: reuse its stored record when
    /// the modification timestamp matches exactly, otherwise hash it.
    fn reconcile<'r>(
        &mut self,
        rendered: String,
        size: u64,
        mtime: f64,
        indicator: &str,
        open: impl FnOnce() -> Result<Box<dyn Read + 'r>, SourceError>,
    ) -> Result<(), Halt> {
        let reusable = self
            .baseline
            .get(&rendered)
            .map_or(false, |existing| *existing.mtime() == mtime);
        if reusable {
            if let Some(record) = self.baseline.remove(&rendered) {
                self.skip(size);
                render_status(&self.progress, &self.eta, indicator, None, &rendered);
                self.records.push(record);
                return Ok(());
            }
        }

        let mut stream = match open() {
            Ok(stream) => stream,
            Err(err) if err.is_recoverable() => {
                debug!("skipping {rendered}: {err}");
                self.skip(size);
                return Ok(());
            }
            Err(err) => return Err(Halt::Fatal(Report::new(err))),
        };

        let Walker {
            hasher,
            progress,
            eta,
            token,
            ..
        } = self;
        let mut advanced = 0u64;
        let hashed = hasher.hash(&mut stream, size, |update| {
            token.check_cancel().map_err(|_| Interrupted)?;

            let len = update.len as u64;
            advanced += len;
            progress.current += len;
            eta.left = eta.left.saturating_sub(len);
            eta.processed += len;
            eta.time_taken += update.elapsed.as_secs_f64();

            let chunk = Progress {
                total: update.count,
                current: update.index,
            };
            render_status(progress, eta, indicator, Some(&chunk), &rendered);
            Ok(())
        });
        drop(stream);

        match hashed {
            Ok((md5, sha1)) => {
                self.hashed_bytes += advanced;
                // A changed file is observed, not missing: take its stale
                // baseline row out of the removed-keys candidates so the
                // upserted replacement is not deleted behind it.
                self.baseline.remove(&rendered);
                let print = Fingerprint::new(size, md5, sha1);
                self.records
                    .push(FileRecord::new(rendered.clone(), mtime, print));
                self.new_paths.push(rendered);
                Ok(())
            }
            Err(fingerprint::Error::Interrupted(_)) => Err(Halt::Cancelled),
            Err(fingerprint::Error::IO(err)) if recoverable_read(&err) => {
                debug!("skipping {rendered}: {err}");
                self.hashed_bytes += advanced;
                // Chunks already hashed advanced the accounting; only the
                // unread remainder is skipped so the totals stay consistent.
                self.skip(size.saturating_sub(advanced));
                Ok(())
            }
            Err(err) => Err(Halt::Fatal(Report::new(err))),
        }
    }

    /// Advance the accounting past bytes that will not be hashed.
    fn skip(&mut self, bytes: u64) {
        self.progress.current += bytes;
        self.eta.left = self.eta.left.saturating_sub(bytes);
    }

    fn check_cancel(&self) -> Result<(), Halt> {
        if self.token.check_cancel().is_err() {
            return Err(Halt::Cancelled);
        }
        Ok(())
    }
}

fn recoverable_read(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::NotFound
    )
}

fn render_status(
    progress: &Progress,
    eta: &Eta,
    indicator: &str,
    chunk: Option<&Progress>,
    rendered: &str,
) {
    let prefix = match chunk {
        Some(chunk) => format!(
            "{} {} {} [Chunk {}]",
            progress.percent(),
            eta.string(),
            indicator,
            chunk.string()
        ),
        None => format!("{} {} {}", progress.percent(), eta.string(), indicator),
    };
    console::status(&console::shrink(rendered, &prefix));
}
