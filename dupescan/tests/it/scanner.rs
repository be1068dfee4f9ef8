use std::collections::{HashMap, HashSet};

use cancel::Token;
use dupescan::{dupes, scan};
use filedb::FileRecord;
use fingerprint::Fingerprint;
use scantree::{build, Whitelist};
use tempfile::TempDir;

use crate::testdata;

fn stale_record(path: &str) -> FileRecord {
    let print = Fingerprint::new(1, [0x01; 16].into(), [0x01; 20].into());
    FileRecord::new(path, 1.0, print)
}

#[test]
fn empty_tree_reports_base_dir_and_releases_baseline() {
    let temp = TempDir::new().expect("temp dir");
    let root = build(temp.path(), &Whitelist::default()).expect("build tree");

    let baseline = HashMap::from([(
        "/gone/away.txt".to_string(),
        stale_record("/gone/away.txt"),
    )]);
    let walked = scan::walk(&root, baseline, &Token::new());

    assert!(walked.records.is_empty());
    assert!(walked.new_paths.is_empty());
    assert_eq!(walked.removed, ["/gone/away.txt"]);
    assert_eq!(walked.empty_dirs, [temp.path().display().to_string()]);
    assert!(!walked.cancelled);
}

#[test]
fn single_file_is_hashed_then_reused() {
    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), "only.txt", b"abc");
    let rendered = temp.path().join("only.txt").display().to_string();

    // First run: the file is new and gets hashed.
    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());

    assert_eq!(walked.new_paths, [rendered.clone()]);
    assert_eq!(walked.hashed_bytes, 3);
    assert_eq!(walked.records.len(), 1);
    let record = &walked.records[0];
    assert_eq!(*record.fingerprint().size(), 3);
    assert_eq!(
        record.fingerprint().md5().to_string(),
        "900150983cd24fb0d6963f7d28e17f72"
    );
    assert_eq!(
        record.fingerprint().sha1().to_string(),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );

    // Second run with an unchanged file: the stored fingerprint is reused
    // and nothing is rehashed.
    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let again = scan::walk(&root, testdata::as_baseline(&walked.records), &Token::new());

    assert!(again.new_paths.is_empty());
    assert_eq!(again.hashed_bytes, 0);
    assert_eq!(again.records, walked.records);
    assert!(again.removed.is_empty());
}

#[test]
fn identical_files_group_into_one_duplication() {
    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), "a.txt", b"x");
    testdata::file(temp.path(), "b.txt", b"x");

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());
    let groups = dupes::group(&walked.records);

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(*group.fingerprint().size(), 1);
    assert_eq!(
        group.fingerprint().md5().to_string(),
        "9dd4e461268c8034f5c8564e155c67a6"
    );
    assert_eq!(
        group.fingerprint().sha1().to_string(),
        "11f6ad8ec52a2984abaafd7c3b516503785c2072"
    );
    assert_eq!(
        group.paths(),
        [
            temp.path().join("a.txt").display().to_string(),
            temp.path().join("b.txt").display().to_string(),
        ]
    );
}

#[test]
fn modified_file_is_rehashed_and_replaces_its_row() {
    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), "mut.txt", b"a");
    let rendered = temp.path().join("mut.txt").display().to_string();

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let first = scan::walk(&root, HashMap::new(), &Token::new());

    // Change the content and force a different mtime.
    testdata::file(temp.path(), "mut.txt", b"b");
    filetime::set_file_mtime(
        temp.path().join("mut.txt"),
        filetime::FileTime::from_unix_time(1_600_000_000, 0),
    )
    .expect("set mtime");

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let second = scan::walk(&root, testdata::as_baseline(&first.records), &Token::new());

    // A fresh record replaces the old row; the path is not in removed-keys.
    assert_eq!(second.new_paths, [rendered.clone()]);
    assert!(second.removed.is_empty());
    assert_eq!(second.records.len(), 1);
    assert_ne!(
        second.records[0].fingerprint(),
        first.records[0].fingerprint()
    );
}

#[test]
fn excluded_directories_are_neither_scanned_nor_reported_empty() {
    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), ".git/objects/pack", b"pack");
    testdata::file(temp.path(), "keep.txt", b"keep");

    let whitelist = Whitelist::builder()
        .dir_names(HashSet::from([".git".to_string()]))
        .build();
    let root = build(temp.path(), &whitelist).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());

    assert_eq!(
        walked.new_paths,
        [temp.path().join("keep.txt").display().to_string()]
    );
    // The excluded directory was filtered out, not traversed-and-found-empty.
    assert!(walked.empty_dirs.is_empty());
}

#[test]
fn empty_subdirectories_are_listed_in_traversal_order() {
    let temp = TempDir::new().expect("temp dir");
    std::fs::create_dir(temp.path().join("one")).expect("create dir");
    std::fs::create_dir(temp.path().join("two")).expect("create dir");
    testdata::file(temp.path(), "keep.txt", b"k");

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());

    assert_eq!(
        walked.empty_dirs,
        [
            temp.path().join("one").display().to_string(),
            temp.path().join("two").display().to_string(),
        ]
    );
}

#[test]
fn cancellation_suppresses_removed_keys() {
    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), "a.txt", b"abc");

    let baseline = HashMap::from([(
        "/gone/away.txt".to_string(),
        stale_record("/gone/away.txt"),
    )]);

    let token = Token::new();
    token.cancel();

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, baseline, &token);

    assert!(walked.cancelled);
    // The baseline key was never observed, but a cancelled run must not ask
    // the index writer to delete anything.
    assert!(walked.removed.is_empty());
}

#[cfg(unix)]
#[test]
fn unreadable_files_are_skipped_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("temp dir");
    testdata::file(temp.path(), "open.txt", b"ok");
    testdata::file(temp.path(), "locked.txt", b"nope");
    let locked = temp.path().join("locked.txt");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))
        .expect("chmod");

    // Privileged test environments can read the file anyway; then there is
    // nothing to observe.
    if std::fs::File::open(&locked).is_ok() {
        return;
    }

    let root = build(temp.path(), &Whitelist::default()).expect("build tree");
    let walked = scan::walk(&root, HashMap::new(), &Token::new());

    assert!(!walked.cancelled);
    assert_eq!(
        walked.new_paths,
        [temp.path().join("open.txt").display().to_string()]
    );
}
