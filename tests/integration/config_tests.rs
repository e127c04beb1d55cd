use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use nuke::config::{Config, ENV_PREFIX};
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all NUKE_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(ENV_PREFIX) {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_env_overrides_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("NUKE_RETENTION_DAYS", "7");
    std::env::set_var("NUKE_WORKERS", "16");
    std::env::set_var("NUKE_TRASH_ROOT", "/srv/nuke-trash");

    let config = Config::load();

    clear_env();
    assert_eq!(config.retention_days, 7);
    assert_eq!(config.workers, 16);
    assert_eq!(config.trash_root, std::path::PathBuf::from("/srv/nuke-trash"));
}

#[test]
fn test_invalid_env_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("NUKE_WORKERS", "many");

    let config = Config::load();

    clear_env();
    assert_eq!(config.workers, Config::default().workers);
}

#[test]
fn test_env_beats_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_size_mb = 100\nauto_cleanup = false\n").unwrap();
    std::env::set_var("NUKE_MAX_SIZE_MB", "250");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .unwrap();

    clear_env();
    assert_eq!(config.max_size_mb, 250);
    assert!(!config.auto_cleanup);
}

#[test]
fn test_to_toml_round_trip() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let config = Config {
        retention_days: 14,
        workers: 2,
        ..Config::default()
    };

    let content = config.to_toml().unwrap();
    assert!(content.contains("retention_days = 14"));
    assert!(content.contains("workers = 2"));

    fs::write(&config_path, content).unwrap();
    assert_eq!(Config::load_from_path(&config_path).unwrap(), config);
}

#[test]
fn test_invalid_toml_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "retention_days = \"soon\"").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(format!("{err:#}").contains("invalid config file"));
}
