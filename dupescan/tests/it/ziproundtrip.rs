use std::collections::HashMap;

use cancel::Token;
use dupescan::{dupes, scan};
use scantree::{build, Whitelist};
use tempfile::TempDir;

use crate::testdata;

#[test]
fn archive_entries_are_indexed_under_the_archive_path() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "a.zip", &[("inner.bin", b"hello")]);
    let inner_rendered = format!("{}/inner.bin", temp.path().join("a.zip").display());

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());

    // One record for the entry; none for the archive as a file.
    assert_eq!(walked.new_paths, [inner_rendered.clone()]);
    assert_eq!(walked.records.len(), 1);
    assert_eq!(*walked.records[0].fingerprint().size(), 5);
}

#[test]
fn unchanged_archive_is_not_rehashed() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "a.zip", &[("inner.bin", b"hello")]);

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let first = scan::walk(&root, HashMap::new(), &Token::new());
    assert_eq!(first.hashed_bytes, 5);

    // Rescan with the archive untouched: entry mtimes come from the central
    // directory, so the stored fingerprints are reused.
    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let again = scan::walk(&root, testdata::as_baseline(&first.records), &Token::new());

    assert_eq!(again.hashed_bytes, 0);
    assert!(again.new_paths.is_empty());
    assert!(again.removed.is_empty());
}

#[test]
fn archive_content_matches_unpacked_content() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "a.zip", &[("inner.txt", b"x")]);
    testdata::file(temp.path(), "loose.txt", b"x");

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());
    let groups = dupes::group(&walked.records);

    // The archived copy and the loose copy share one fingerprint.
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].paths().len(), 2);
    assert_eq!(
        groups[0].fingerprint().md5().to_string(),
        "9dd4e461268c8034f5c8564e155c67a6"
    );
}

#[test]
fn corrupted_archive_is_rescanned_as_a_regular_file() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "a.zip", &[("inner.bin", b"hello")]);
    let archive_rendered = temp.path().join("a.zip").display().to_string();
    let inner_rendered = format!("{archive_rendered}/inner.bin");

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let first = scan::walk(&root, HashMap::new(), &Token::new());
    assert_eq!(first.new_paths, [inner_rendered.clone()]);

    // Truncate the archive so the probe fails on the next run.
    testdata::file(temp.path(), "a.zip", b"no longer a zip");

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let second = scan::walk(&root, testdata::as_baseline(&first.records), &Token::new());

    // The path is now hashed as a plain file, and the stale entry row is
    // slated for deletion.
    assert_eq!(second.new_paths, [archive_rendered]);
    assert_eq!(second.removed, [inner_rendered]);
}
