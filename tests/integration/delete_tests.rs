//! Scan, delete and restore pipelines.

use nuke::actions::{DeleteEngine, DeleteError, DeleteProgressCallback, Disposition, NoProgress};
use nuke::config::Config;
use nuke::error::ErrorKind;
use nuke::filter::FilterSpec;
use nuke::scanner::Walker;
use nuke::trash::transfer::FsOps;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tempfile::TempDir;

/// Collects every outcome, in callback order.
#[derive(Default)]
struct OutcomeLog {
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl DeleteProgressCallback for OutcomeLog {
    fn on_outcome(&self, path: &Path, error: Option<&DeleteError>) {
        self.seen
            .lock()
            .unwrap()
            .push((path.to_path_buf(), error.is_none()));
    }
}

fn config_in(dir: &TempDir) -> Config {
    Config {
        trash_root: dir.path().join("trash"),
        workers: 4,
        ..Config::default()
    }
}

fn make_tree(root: &Path) {
    for sub in ["a", "a/b", "c"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    for (i, sub) in ["a", "a/b", "c", "a/b", "a"].iter().enumerate() {
        fs::write(root.join(sub).join(format!("f{i}.tmp")), vec![i as u8; 512]).unwrap();
    }
    fs::write(root.join("keep.cfg"), b"keep").unwrap();
}

#[test]
fn test_filtered_soft_delete_then_restore() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("workspace");
    make_tree(&root);
    let config = config_in(&dir);
    let trash = Arc::new(config.open_trash().unwrap());

    let criteria = FilterSpec {
        include: vec!["*.tmp".to_string()],
        ..FilterSpec::default()
    }
    .compile(SystemTime::now())
    .unwrap();
    let candidates = Walker::new(&criteria).scan(&root, true).unwrap();
    assert_eq!(candidates.len(), 5);

    let engine = config
        .delete_engine(Disposition::SoftDelete)
        .with_trash(Arc::clone(&trash));
    let log = OutcomeLog::default();
    let result = engine.apply(&candidates, &log);

    assert!(result.all_succeeded());
    assert_eq!(result.bytes_freed, 5 * 512);
    assert_eq!(log.seen.lock().unwrap().len(), 5);
    assert!(root.join("keep.cfg").exists());
    assert!(root.join("a/b").is_dir());
    assert_eq!(trash.list().unwrap().len(), 5);

    trash.restore("f1.tmp").unwrap();
    assert_eq!(fs::read(root.join("a/b/f1.tmp")).unwrap(), vec![1u8; 512]);
    assert_eq!(trash.list().unwrap().len(), 4);
}

#[test]
fn test_directories_processed_after_files_deepest_first() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("workspace");
    make_tree(&root);

    let criteria = FilterSpec::default().compile(SystemTime::now()).unwrap();
    let candidates = Walker::new(&criteria).scan(&root, true).unwrap();

    let log = OutcomeLog::default();
    let engine = DeleteEngine::new(Disposition::SoftDelete).with_workers(2);
    let result = engine.apply(&candidates, &log);

    assert!(result.all_succeeded(), "{:?}", result.failures);
    assert!(!root.exists());

    let seen = log.seen.into_inner().unwrap();
    let first_dir = seen.iter().position(|(p, _)| p == &root.join("a/b")).unwrap();
    let file_count = candidates.iter().filter(|e| !e.is_dir).count();
    assert_eq!(first_dir, file_count);
    assert_eq!(seen[first_dir + 1].0, root.join("c"));
    assert_eq!(seen[first_dir + 2].0, root.join("a"));
    assert_eq!(seen.last().unwrap().0, root);
}

#[test]
fn test_secure_erase_whole_tree_leaves_trash_empty() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("secrets");
    make_tree(&root);
    let config = config_in(&dir);
    let trash = Arc::new(config.open_trash().unwrap());

    let criteria = FilterSpec::default().compile(SystemTime::now()).unwrap();
    let candidates = Walker::new(&criteria).scan(&root, true).unwrap();
    let engine = config
        .delete_engine(Disposition::SecureErase)
        .with_trash(Arc::clone(&trash));
    let result = engine.apply(&candidates, &NoProgress);

    assert!(result.all_succeeded(), "{:?}", result.failures);
    assert!(!root.exists());
    assert!(trash.list().unwrap().is_empty());
}

#[test]
fn test_auto_cleanup_after_batch() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("big");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("one.bin"), vec![0u8; 4096]).unwrap();

    let config = Config {
        max_size_mb: 0,
        ..config_in(&dir)
    };
    let trash = Arc::new(config.open_trash().unwrap());
    let criteria = FilterSpec::default().compile(SystemTime::now()).unwrap();
    let candidates = Walker::new(&criteria)
        .scan(&root.join("one.bin"), false)
        .unwrap();

    config
        .delete_engine(Disposition::SoftDelete)
        .with_trash(Arc::clone(&trash))
        .apply(&candidates, &NoProgress);
    assert_eq!(trash.list().unwrap().len(), 1);

    let report = config.run_auto_cleanup(&trash).unwrap().unwrap();
    assert_eq!(report.items_removed, 1);
    assert!(trash.list().unwrap().is_empty());
}

/// Trash on another volume whose source removal is refused.
#[derive(Debug)]
struct UndeletableSource;

impl FsOps for UndeletableSource {
    fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::other("Invalid cross-device link"))
    }

    fn remove(&self, _: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "operation not permitted"))
    }
}

#[test]
fn test_soft_delete_with_stuck_source_stays_recoverable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    fs::write(&path, vec![9u8; 2048]).unwrap();
    let trash = Arc::new(
        config_in(&dir)
            .open_trash()
            .unwrap()
            .with_fs_ops(Arc::new(UndeletableSource)),
    );

    let criteria = FilterSpec::default().compile(SystemTime::now()).unwrap();
    let candidates = Walker::new(&criteria).scan(&path, false).unwrap();
    let result = DeleteEngine::new(Disposition::SoftDelete)
        .with_trash(Arc::clone(&trash))
        .apply(&candidates, &NoProgress);

    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.failures[0].1.kind, ErrorKind::Io);
    assert_eq!(result.bytes_freed, 0);
    assert_eq!(fs::read(&path).unwrap().len(), 2048);

    let listing = trash.list().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(fs::read(&listing.entries[0].trash_path).unwrap(), vec![9u8; 2048]);
}
