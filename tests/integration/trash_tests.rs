//! Trash store behaviour through the public API.

use nuke::error::ErrorKind;
use nuke::trash::transfer::{self, move_path_with, FsOps};
use nuke::trash::{RetentionPolicy, TrashError, TrashStore};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Staging area on another volume: every rename fails.
#[derive(Debug)]
struct OtherVolume;

impl FsOps for OtherVolume {
    fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::other("Invalid cross-device link"))
    }
}

fn store_in(dir: &TempDir) -> TrashStore {
    TrashStore::open(dir.path().join("trash")).unwrap()
}

#[test]
fn test_round_trip_restores_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let path = dir.path().join("photos/cat.jpg");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let content: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    fs::write(&path, &content).unwrap();

    store.stage(&path).unwrap();
    assert!(!path.exists());

    store.restore("cat.jpg").unwrap();
    assert_eq!(fs::read(&path).unwrap(), content);

    let listing = store.list().unwrap();
    assert!(listing.entries.iter().all(|e| e.original_path != path));
    assert_eq!(listing.total_size, 0);
}

#[test]
fn test_directory_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let tree = dir.path().join("site");
    fs::create_dir_all(tree.join("assets")).unwrap();
    fs::write(tree.join("index.html"), b"<html>").unwrap();
    fs::write(tree.join("assets/app.js"), b"let x = 1;").unwrap();

    let entry = store.stage(&tree).unwrap();
    assert!(entry.is_dir);
    assert_eq!(store.list().unwrap().total_size, 16);

    store.restore("site").unwrap();
    assert_eq!(fs::read(tree.join("assets/app.js")).unwrap(), b"let x = 1;");
}

#[test]
fn test_restore_error_kinds() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let err = store.restore("nothing-here").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let occupied = dir.path().join("occupied.txt");
    fs::write(&occupied, b"v1").unwrap();
    store.stage(&occupied).unwrap();
    fs::write(&occupied, b"v2").unwrap();
    let err = store.restore("occupied.txt").unwrap_err();
    assert!(matches!(err, TrashError::Conflict(ref p) if p == &occupied));

    let stale = dir.path().join("stale.txt");
    fs::write(&stale, b"x").unwrap();
    let entry = store.stage(&stale).unwrap();
    fs::remove_file(&entry.trash_path).unwrap();
    assert_eq!(store.restore("stale.txt").unwrap_err().kind(), ErrorKind::StaleEntry);
}

#[test]
fn test_cross_volume_move_fallback() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("volume-a/data");
    let dst = dir.path().join("volume-b/data");
    fs::create_dir_all(src.join("nested")).unwrap();
    fs::create_dir_all(dst.parent().unwrap()).unwrap();
    fs::write(src.join("nested/blob"), vec![3u8; 10_000]).unwrap();

    move_path_with(&src, &dst, &OtherVolume).unwrap();

    assert!(!src.exists());
    assert_eq!(transfer::dir_size(&dst), 10_000);
}

#[test]
fn test_store_round_trip_across_volumes() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir).with_fs_ops(Arc::new(OtherVolume));
    let tree = dir.path().join("reports");
    fs::create_dir_all(tree.join("2024")).unwrap();
    fs::write(tree.join("2024/q1.csv"), b"a,b\n1,2\n").unwrap();
    fs::write(tree.join("summary.txt"), b"ok").unwrap();

    let entry = store.stage(&tree).unwrap();
    assert!(!tree.exists());
    assert_eq!(transfer::dir_size(&entry.trash_path), 10);

    store.restore("reports").unwrap();
    assert_eq!(fs::read(tree.join("2024/q1.csv")).unwrap(), b"a,b\n1,2\n");
    assert!(!entry.trash_path.exists());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_purge_all_twice() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    for name in ["a", "b", "c"] {
        let p = dir.path().join(name);
        fs::write(&p, name).unwrap();
        store.stage(&p).unwrap();
    }
    assert_eq!(store.list().unwrap().len(), 3);

    for _ in 0..2 {
        store.purge_all().unwrap();
        assert!(store.list().unwrap().is_empty());
        assert_eq!(fs::read_dir(store.files_dir()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(store.meta_dir()).unwrap().count(), 0);
    }
}

#[test]
fn test_evict_with_zero_cap_empties_trash() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    for name in ["x.bin", "y.bin"] {
        let p = dir.path().join(name);
        fs::write(&p, vec![0u8; 10 * 1024]).unwrap();
        store.stage(&p).unwrap();
    }

    let report = store.evict(&RetentionPolicy::new(30, 0)).unwrap();
    assert_eq!(report.items_removed, 2);
    assert_eq!(report.bytes_freed, 20 * 1024);
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_evict_under_cap_keeps_recent_items() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let p = dir.path().join("keep.bin");
    fs::write(&p, vec![0u8; 1024]).unwrap();
    store.stage(&p).unwrap();

    let report = store.evict(&RetentionPolicy::new(30, 1)).unwrap();
    assert_eq!(report.items_removed, 0);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_reopen_sees_existing_entries() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("persist.txt");
    fs::write(&p, b"durable").unwrap();
    store_in(&dir).stage(&p).unwrap();

    let reopened = store_in(&dir);
    let listing = reopened.list().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.entries[0].original_path, p);
}
