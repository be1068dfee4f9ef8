//! The library portion of the dupescan client.
//!
//! A scan finds groups of files with identical contents beneath a base
//! directory, descending into zip archives as though they were directories,
//! and maintains a persistent index so unchanged files are never rehashed.
//!
//! One run is composed of the following steps:
//!
//! 1. The baseline index is read into a path-keyed mapping.
//! 2. The scan tree is built: every admitted file and directory under the
//!    base path, with archives expanded over their central directories and
//!    aggregate sizes computed bottom-up.
//! 3. The tree is walked. Files whose modification timestamp matches their
//!    baseline row are reused; everything else is streamed through MD5 and
//!    SHA-1 in bounded chunks with live progress and ETA output. Baseline
//!    rows left unmatched at the end name the files that have disappeared.
//! 4. Records are grouped by fingerprint into duplications.
//! 5. The index is rewritten (upserts plus deletions) and the report sinks
//!    are written: duplication JSON (optionally split into small/large
//!    bands), the new-files list, and the empty-directories list.
//!
//! Interrupting a run is safe: traversal stops promptly, the outputs phase
//! still runs with whatever was accumulated, and the removed-keys set is
//! suppressed so the index writer deletes nothing based on a partial scan.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(clippy::unwrap_used)]

use std::fmt::Display;

use cancel::Token;
use log::info;
use num_format::{Locale, ToFormattedString};
use stable_eyre::{eyre::Context, Result};

pub mod config;
mod console;
pub mod dupes;
pub mod progress;
pub mod report;
pub mod scan;

/// Summary of a completed run.
#[derive(Clone, Copy, Debug)]
pub struct Summary {
    /// Files observed by the scan.
    pub files: u64,

    /// Files hashed for the first time this run.
    pub new: usize,

    /// Duplicate groups found.
    pub groups: usize,

    /// True when the run was interrupted and flushed partial results.
    pub cancelled: bool,
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Found {} file(s), of which {} are new; {} duplicate group(s)",
            self.files, self.new, self.groups
        )?;
        if self.cancelled {
            write!(f, " (scan interrupted; partial results)")?;
        }
        Ok(())
    }
}

/// Run a full scan with the provided configuration, writing every configured
/// sink. Returns the run summary.
pub fn run(
    scan: config::Scan,
    outputs: config::Outputs,
    thresholds: config::Thresholds,
    token: &Token,
) -> Result<Summary> {
    let whitelist = scan.whitelist()?;
    let db = filedb::Database::new(outputs.db_path());
    let baseline = db.read_all().context("read baseline index")?;
    info!("read {} baseline record(s)", baseline.len());

    info!("calculating total size under {:?}", scan.dir());
    let root = scantree::build(scan.dir(), &whitelist).context("build scan tree")?;
    info!(
        "total file size: {} bytes across {} file(s)",
        root.size().to_formatted_string(&Locale::en),
        root.length().to_formatted_string(&Locale::en),
    );

    let walked = scan::walk(&root, baseline, token);
    info!(
        "observed {} record(s), {} new, {} removed",
        walked.records.len(),
        walked.new_paths.len(),
        walked.removed.len(),
    );

    let duplications = dupes::group(&walked.records);
    let groups = duplications.len();
    info!("found {groups} group(s) of duplicates");

    db.apply(&walked.records, &walked.removed)
        .context("write index")?;

    if let Some(path) = outputs.new_path() {
        let mut lines = walked.new_paths.clone();
        lines.sort();
        report::write_lines(path, &lines, "new file path(s)")?;
    }
    if let Some(path) = outputs.empty_path() {
        report::write_lines(path, &walked.empty_dirs, "empty directory path(s)")?;
    }

    let small = outputs.small_path().as_ref().map(|_| thresholds.small_size());
    let large = outputs.large_path().as_ref().map(|_| thresholds.large_size());
    let bands = dupes::partition(duplications, small, large);
    if let Some(path) = outputs.small_path() {
        report::write_duplications(path, &bands.small, "small duplication")?;
    }
    if let Some(path) = outputs.large_path() {
        report::write_duplications(path, &bands.large, "large duplication")?;
    }
    report::write_duplications(outputs.dup_path(), &bands.middle, "duplication")?;

    Ok(Summary {
        files: root.length(),
        new: walked.new_paths.len(),
        groups,
        cancelled: walked.cancelled,
    })
}
