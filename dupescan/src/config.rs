//! Provides application configuration structures.

use std::path::{Path, PathBuf};

use clap::Parser;
use getset::{CopyGetters, Getters};
use scantree::Whitelist;
use stable_eyre::{
    eyre::{ensure, Context},
    Result,
};

/// Default maximum size in bytes for the small duplication band (1 MiB).
pub const DEFAULT_SMALL_SIZE: u64 = 1 << 20;

/// Default minimum size in bytes for the large duplication band (1 GiB).
pub const DEFAULT_LARGE_SIZE: u64 = 1 << 30;

/// Configures the scan itself: the base directory and the exclusion flags.
#[derive(Parser, Debug, Getters, CopyGetters)]
pub struct Scan {
    /// Whether to enable debug logging.
    #[clap(long, short)]
    #[getset(get_copy = "pub")]
    debug: bool,

    /// The base directory to scan for duplicates.
    #[clap()]
    #[getset(get = "pub")]
    dir: PathBuf,

    /// Directory basenames excluded from the scan (for example `.git`).
    /// Also excludes archives by their file name, since archives are entered
    /// as directories.
    #[clap(long = "exclude-dir-name")]
    exclude_dir_names: Vec<String>,

    /// Directory paths excluded from the scan, matched against the full
    /// rendered path.
    #[clap(long = "exclude-dir-path")]
    exclude_dir_paths: Vec<PathBuf>,

    /// File basenames excluded from the scan.
    #[clap(long = "exclude-file-name")]
    exclude_file_names: Vec<String>,

    /// File paths excluded from the scan, matched against the full rendered
    /// path.
    #[clap(long = "exclude-file-path")]
    exclude_file_paths: Vec<PathBuf>,

    /// Regular expressions excluding any file whose full rendered path they
    /// match entirely.
    #[clap(long = "exclude-file-regex")]
    exclude_file_patterns: Vec<String>,
}

impl Scan {
    /// Validates that self is correctly formed.
    pub fn validate(self) -> Result<Self> {
        let dir = self
            .dir
            .canonicalize()
            .context("canonicalize base directory")?;
        ensure!(dir.is_dir(), "{dir:?} is not a directory");
        Ok(Self { dir, ..self })
    }

    /// Assemble the whitelist from the exclusion flags.
    pub fn whitelist(&self) -> Result<Whitelist> {
        Whitelist::new(
            self.exclude_dir_names.iter().cloned(),
            self.exclude_dir_paths.iter().map(|path| resolve(path)),
            self.exclude_file_names.iter().cloned(),
            self.exclude_file_paths.iter().map(|path| resolve(path)),
            self.exclude_file_patterns.iter().cloned(),
        )
        .context("compile whitelist")
    }
}

/// Render an exclusion path the same way scanned paths are rendered, so
/// exact-match exclusions line up: canonical when the path exists, verbatim
/// otherwise.
fn resolve(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_owned())
        .display()
        .to_string()
}

/// Configures where scan results are written.
#[derive(Parser, Debug, Getters)]
#[getset(get = "pub")]
pub struct Outputs {
    /// The index database path.
    #[clap(long)]
    db_path: PathBuf,

    /// The main duplication report path.
    #[clap(long)]
    dup_path: PathBuf,

    /// Small duplication report path. When set, groups at or under the small
    /// threshold are written here instead of the main report.
    #[clap(long)]
    small_path: Option<PathBuf>,

    /// Large duplication report path. When set, groups at or over the large
    /// threshold are written here instead of the main report.
    #[clap(long)]
    large_path: Option<PathBuf>,

    /// New-files list path: every path hashed for the first time this run,
    /// one per line.
    #[clap(long)]
    new_path: Option<PathBuf>,

    /// Empty-directories list path: every directory whose listing was empty,
    /// one per line.
    #[clap(long)]
    empty_path: Option<PathBuf>,
}

impl Outputs {
    /// Validates that every output location is usable, creating parent
    /// directories as needed.
    pub fn validate(self) -> Result<Self> {
        prepare(&self.db_path)?;
        prepare(&self.dup_path)?;
        let optional = [
            &self.small_path,
            &self.large_path,
            &self.new_path,
            &self.empty_path,
        ];
        for path in optional.into_iter().flatten() {
            prepare(path)?;
        }
        Ok(self)
    }
}

/// An output path must either not exist yet or be a regular file; its parent
/// directories are created.
fn prepare(path: &Path) -> Result<()> {
    ensure!(
        !path.exists() || path.is_file(),
        "{path:?} exists but is not a file"
    );
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent directories for {path:?}"))?;
        }
    }
    Ok(())
}

/// Configures the size bands for splitting the duplication report.
#[derive(Parser, Debug, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Thresholds {
    /// Maximum file size in bytes to qualify as a small file.
    #[clap(long, default_value_t = DEFAULT_SMALL_SIZE)]
    small_size: u64,

    /// Minimum file size in bytes to qualify as a large file.
    #[clap(long, default_value_t = DEFAULT_LARGE_SIZE)]
    large_size: u64,
}
