// tests/sync_tree.rs

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use jobgraph::sync::{IgnoreSet, sync_tree};

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn copies_new_files_and_skips_unchanged_ones() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write(&src.path().join("a.txt"), "a");
    write(&src.path().join("nested/b.txt"), "b");

    let first = sync_tree(src.path(), dest.path(), &[]).unwrap();
    assert_eq!(first.copied, 2);
    assert_eq!(fs::read_to_string(dest.path().join("nested/b.txt")).unwrap(), "b");

    let second = sync_tree(src.path(), dest.path(), &[]).unwrap();
    assert_eq!(second.copied, 0);
    assert_eq!(second.unchanged, 2);
}

#[test]
fn changed_files_are_recopied() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write(&src.path().join("a.txt"), "short");
    sync_tree(src.path(), dest.path(), &[]).unwrap();

    write(&src.path().join("a.txt"), "a longer body");
    let summary = sync_tree(src.path(), dest.path(), &[]).unwrap();
    assert_eq!(summary.copied, 1);
    assert_eq!(fs::read_to_string(dest.path().join("a.txt")).unwrap(), "a longer body");
}

#[test]
fn entries_missing_from_source_are_removed() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write(&src.path().join("keep.txt"), "keep");
    write(&dest.path().join("stale.txt"), "stale");
    write(&dest.path().join("old/deep.txt"), "old");

    let summary = sync_tree(src.path(), dest.path(), &[]).unwrap();
    assert!(dest.path().join("keep.txt").is_file());
    assert!(!dest.path().join("stale.txt").exists());
    assert!(!dest.path().join("old").exists());
    assert_eq!(summary.removed, 3);
}

#[test]
fn ignored_paths_are_neither_copied_nor_deleted() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write(&src.path().join("main.c"), "code");
    write(&src.path().join("main.o"), "obj");
    write(&src.path().join("build/out.bin"), "bin");
    write(&dest.path().join("local.o"), "kept");

    sync_tree(src.path(), dest.path(), &patterns(&["*.o", "/build"])).unwrap();

    assert!(dest.path().join("main.c").is_file());
    assert!(!dest.path().join("main.o").exists());
    assert!(!dest.path().join("build").exists());
    assert!(dest.path().join("local.o").is_file());
}

#[test]
fn missing_source_is_an_error() {
    let dest = tempdir().unwrap();
    let missing = dest.path().join("nope");
    assert!(sync_tree(&missing, dest.path(), &[]).is_err());
}

#[test]
fn anchored_patterns_only_match_at_the_root() {
    let set = IgnoreSet::new(&patterns(&["/.git", "*.pyc"])).unwrap();
    assert!(set.is_ignored(Path::new(".git")));
    assert!(set.is_ignored(Path::new(".git/HEAD")));
    assert!(!set.is_ignored(Path::new("vendor/.git")));
    assert!(set.is_ignored(Path::new("pkg/mod.pyc")));
    assert!(set.is_ignored(Path::new("top.pyc")));
    assert!(!set.is_ignored(Path::new("pkg/mod.py")));
}
