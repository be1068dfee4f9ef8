//! Decides whether a discovered path is admitted into the scan.

use std::collections::HashSet;

use regex::Regex;
use typed_builder::TypedBuilder;

use crate::Error;

/// The exclusion whitelist, constructed once at startup and threaded through
/// tree construction.
///
/// Five collections are consulted:
/// - excluded directory names, matched against the final path component;
/// - excluded directory paths, matched exactly against the full rendering;
/// - excluded file names, matched against the final path component;
/// - excluded file paths, matched exactly against the full rendering;
/// - excluded file patterns, regular expressions that must consume the entire
///   full rendering to match.
///
/// Directory rules also govern archive roots (an archive is entered as a
/// directory, so it is excluded as one). For archive-internal paths the full
/// rendering is the enclosing archive's filesystem path joined with the
/// archive-internal slash path.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct Whitelist {
    /// Directory basenames that are never entered.
    #[builder(default, setter(into))]
    dir_names: HashSet<String>,

    /// Full directory renderings that are never entered.
    #[builder(default, setter(into))]
    dir_paths: HashSet<String>,

    /// File basenames that are never scanned.
    #[builder(default, setter(into))]
    file_names: HashSet<String>,

    /// Full file renderings that are never scanned.
    #[builder(default, setter(into))]
    file_paths: HashSet<String>,

    /// Compiled full-match patterns over file renderings.
    #[builder(default)]
    file_patterns: Vec<Regex>,
}

impl Whitelist {
    /// Build a whitelist from its five raw collections, compiling each file
    /// pattern with full-match semantics.
    pub fn new(
        dir_names: impl IntoIterator<Item = String>,
        dir_paths: impl IntoIterator<Item = String>,
        file_names: impl IntoIterator<Item = String>,
        file_paths: impl IntoIterator<Item = String>,
        file_patterns: impl IntoIterator<Item = String>,
    ) -> Result<Self, Error> {
        let file_patterns = file_patterns
            .into_iter()
            .map(|pattern| full_match(&pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dir_names: dir_names.into_iter().collect(),
            dir_paths: dir_paths.into_iter().collect(),
            file_names: file_names.into_iter().collect(),
            file_paths: file_paths.into_iter().collect(),
            file_patterns,
        })
    }

    /// True when a directory-like path (including an archive root) may be
    /// entered.
    pub fn admit_dir(&self, name: &str, rendered: &str) -> bool {
        !self.dir_names.contains(name) && !self.dir_paths.contains(rendered)
    }

    /// True when a file may be scanned.
    pub fn admit_file(&self, name: &str, rendered: &str) -> bool {
        !self.file_names.contains(name)
            && !self.file_paths.contains(rendered)
            && !self
                .file_patterns
                .iter()
                .any(|pattern| pattern.is_match(rendered))
    }
}

/// Compile a pattern so that it must consume the entire rendered path.
fn full_match(pattern: &str) -> Result<Regex, Error> {
    Regex::new(&format!(r"\A(?:{pattern})\z")).map_err(|source| Error::Pattern {
        pattern: pattern.to_owned(),
        source,
    })
}
