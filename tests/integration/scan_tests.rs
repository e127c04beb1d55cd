//! End-to-end selection: raw filter values compiled once, then applied by
//! a recursive walk.

use filetime::{set_file_mtime, FileTime};
use nuke::filter::{FilterError, FilterSpec};
use nuke::scanner::{path_depth, Walker};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const DAY: u64 = 86_400;

fn age(path: &Path, days: u64) {
    let when = SystemTime::now() - Duration::from_secs(days * DAY);
    set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
}

fn project_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("logs/archive")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();

    fs::write(root.join("logs/today.log"), vec![b'x'; 2048]).unwrap();
    fs::write(root.join("logs/archive/old.log"), vec![b'x'; 4096]).unwrap();
    fs::write(root.join("logs/archive/older.log.gz"), vec![b'x'; 100]).unwrap();
    fs::write(root.join("src/main.rs"), b"fn main() {}").unwrap();
    fs::write(root.join(".env"), b"SECRET=1").unwrap();

    age(&root.join("logs/archive/old.log"), 45);
    age(&root.join("logs/archive/older.log.gz"), 90);
    dir
}

#[test]
fn test_older_than_and_include() {
    let dir = project_tree();
    let spec = FilterSpec {
        older_than: Some("30d".to_string()),
        include: vec!["*.log".to_string(), "*.gz".to_string()],
        ..FilterSpec::default()
    };
    let criteria = spec.compile(SystemTime::now()).unwrap();

    let entries = Walker::new(&criteria).scan(dir.path(), true).unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names.len(), 2);
    assert!(names.contains(&"old.log".to_string()));
    assert!(names.contains(&"older.log.gz".to_string()));
}

#[test]
fn test_size_filter_strictness() {
    let dir = project_tree();
    let spec = FilterSpec {
        size: Some("+2K".to_string()),
        ..FilterSpec::default()
    };
    let criteria = spec.compile(SystemTime::now()).unwrap();
    let entries = Walker::new(&criteria).scan(dir.path(), true).unwrap();
    let files: Vec<_> = entries.iter().filter(|e| !e.is_dir).collect();

    // today.log is exactly 2 KiB and must be rejected
    assert_eq!(files.len(), 1);
    assert!(files[0].path.ends_with("old.log"));
}

#[test]
fn test_exclude_and_hidden() {
    let dir = project_tree();
    let spec = FilterSpec {
        exclude: vec!["logs".to_string(), "*.log".to_string(), "*.gz".to_string()],
        skip_hidden: true,
        ..FilterSpec::default()
    };
    let criteria = spec.compile(SystemTime::now()).unwrap();
    let entries = Walker::new(&criteria).scan(dir.path(), true).unwrap();

    // The excluded directory's own name is rejected, not its subtree
    let mut names: Vec<_> = entries
        .iter()
        .map(|e| e.path.strip_prefix(dir.path()).unwrap().to_path_buf())
        .collect();
    names.sort();
    assert_eq!(
        names,
        [
            Path::new("logs/archive"),
            Path::new("src"),
            Path::new("src/main.rs")
        ]
    );
}

#[test]
fn test_regex_matches_path_or_name() {
    let dir = project_tree();
    let spec = FilterSpec {
        regex: Some(r"archive/.*\.log$".to_string()),
        ..FilterSpec::default()
    };
    let criteria = spec.compile(SystemTime::now()).unwrap();
    let entries = Walker::new(&criteria).scan(dir.path(), true).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries[0].path.ends_with("archive/old.log"));
}

#[test]
fn test_results_are_deepest_first() {
    let dir = project_tree();
    let criteria = FilterSpec::default().compile(SystemTime::now()).unwrap();
    let entries = Walker::new(&criteria).scan(dir.path(), true).unwrap();

    let depths: Vec<_> = entries.iter().map(|e| path_depth(&e.path)).collect();
    assert!(depths.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(entries.last().unwrap().path, dir.path());
}

#[test]
fn test_invalid_specs_fail_before_scanning() {
    let now = SystemTime::now();
    let bad_size = FilterSpec {
        size: Some("+12Q".to_string()),
        ..FilterSpec::default()
    };
    assert!(matches!(
        bad_size.compile(now),
        Err(FilterError::InvalidSize { .. })
    ));

    let bad_duration = FilterSpec {
        newer_than: Some("soon".to_string()),
        ..FilterSpec::default()
    };
    assert!(matches!(
        bad_duration.compile(now),
        Err(FilterError::InvalidDuration { .. })
    ));

    let bad_regex = FilterSpec {
        regex: Some("(unclosed".to_string()),
        ..FilterSpec::default()
    };
    assert!(matches!(
        bad_regex.compile(now),
        Err(FilterError::InvalidRegex { .. })
    ));
}

#[test]
fn test_missing_root_reports_path() {
    let criteria = FilterSpec::default().compile(SystemTime::now()).unwrap();
    let missing = Path::new("/definitely/not/here");
    let err = Walker::new(&criteria).scan(missing, true).unwrap_err();
    assert_eq!(err.path(), missing);
}
