use std::{collections::HashSet, io::Read};

use scantree::{build, PathNode, Whitelist};
use tempfile::TempDir;

use crate::testdata;

fn archive_root(nodes: &[PathNode]) -> &scantree::ArchiveRoot {
    match nodes.first() {
        Some(PathNode::ArchiveRoot(root)) => root,
        other => panic!("expected an archive root, got {other:?}"),
    }
}

#[test]
fn zip_expands_as_directory() {
    let _ = pretty_env_logger::try_init();

    let temp = TempDir::new().expect("temp dir");
    testdata::archive(
        temp.path(),
        "a.zip",
        &[("inner.bin", b"hello"), ("sub/nested.txt", b"abc")],
    );

    let tree = build(temp.path(), &Whitelist::default()).expect("build tree");

    // The zip is accounted as a directory under the root, not as a file.
    assert!(tree.files().is_empty());
    let root = archive_root(tree.dirs());

    // Size is the sum of uncompressed entry sizes, not the archive size.
    assert_eq!(root.size(), 8);
    assert_eq!(root.length(), 2);
    assert!(!root.is_empty());

    let inner = match &root.files()[0] {
        PathNode::ArchiveFile(file) => file,
        other => panic!("expected an archive file, got {other:?}"),
    };
    assert_eq!(inner.at(), "inner.bin");
    assert_eq!(inner.size(), 5);
    assert_eq!(
        inner.render(),
        format!("{}/inner.bin", temp.path().join("a.zip").display())
    );

    let sub = match &root.dirs()[0] {
        PathNode::ArchiveDir(dir) => dir,
        other => panic!("expected an archive dir, got {other:?}"),
    };
    assert_eq!(sub.at(), "sub");
    assert_eq!(sub.size(), 3);
    assert_eq!(sub.length(), 1);
    assert_eq!(
        sub.files()[0].render(),
        format!("{}/sub/nested.txt", temp.path().join("a.zip").display())
    );
}

#[test]
fn corrupt_zip_reclassifies_as_regular_file() {
    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), "broken.zip", b"this is not a zip archive");

    let tree = build(temp.path(), &Whitelist::default()).expect("build tree");

    assert!(tree.dirs().is_empty());
    let file = match &tree.files()[0] {
        PathNode::FsFile(file) => file,
        other => panic!("expected a file node, got {other:?}"),
    };
    assert_eq!(file.size(), 25);
}

#[test]
fn empty_zip_is_an_empty_directory() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "hollow.zip", &[]);

    let tree = build(temp.path(), &Whitelist::default()).expect("build tree");
    let root = archive_root(tree.dirs());
    assert!(root.is_empty());
    assert_eq!(root.size(), 0);
}

#[test]
fn archive_entries_read_back() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "a.zip", &[("inner.bin", b"hello")]);

    let tree = build(temp.path(), &Whitelist::default()).expect("build tree");
    let root = archive_root(tree.dirs());

    let mut open = root.open().expect("open archive");
    let mut content = Vec::new();
    open.entry("inner.bin")
        .expect("open entry")
        .read_to_end(&mut content)
        .expect("read entry");
    assert_eq!(content, b"hello");
}

#[test]
fn missing_entry_is_a_recoverable_error() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "a.zip", &[("inner.bin", b"hello")]);

    let tree = build(temp.path(), &Whitelist::default()).expect("build tree");
    let root = archive_root(tree.dirs());

    let mut open = root.open().expect("open archive");
    match open.entry("vanished.bin") {
        Err(err) => assert!(err.is_recoverable()),
        Ok(_) => panic!("entry must be absent"),
    };
}

#[test]
fn whitelist_applies_inside_archives() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(
        temp.path(),
        "a.zip",
        &[("keep.txt", b"keep"), ("skip.me", b"skip"), ("sub/skip.me", b"s")],
    );

    let whitelist = Whitelist::builder()
        .file_names(HashSet::from(["skip.me".to_string()]))
        .build();
    let tree = build(temp.path(), &whitelist).expect("build tree");
    let root = archive_root(tree.dirs());

    assert_eq!(root.length(), 1);
    assert_eq!(root.size(), 4);
    let sub = match &root.dirs()[0] {
        PathNode::ArchiveDir(dir) => dir,
        other => panic!("expected an archive dir, got {other:?}"),
    };
    // The subdirectory's only entry was excluded, but the raw listing was not
    // empty, so the directory is not flagged as empty.
    assert_eq!(sub.length(), 0);
    assert!(!sub.is_empty());
}

#[test]
fn excluded_archive_is_skipped_entirely() {
    let temp = TempDir::new().expect("temp dir");
    testdata::archive(temp.path(), "vendor.zip", &[("inner.bin", b"hello")]);

    let whitelist = Whitelist::builder()
        .dir_names(HashSet::from(["vendor.zip".to_string()]))
        .build();
    let tree = build(temp.path(), &whitelist).expect("build tree");

    // A valid archive excluded by directory rules is neither expanded nor
    // listed as a regular file.
    assert!(tree.dirs().is_empty());
    assert!(tree.files().is_empty());
}
