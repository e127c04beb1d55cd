//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory (`.../nuke/config.toml`)
//! 3. `NUKE_*` environment variables (`NUKE_RETENTION_DAYS=7`)
//!
//! The configuration also carries the protected-path set. The engine never
//! consults it; callers check [`Config::is_protected`] before handing
//! candidates to a [`DeleteEngine`].

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::actions::{DeleteEngine, Disposition, DEFAULT_WORKERS};
use crate::scanner::path_utils;
use crate::trash::{self, EvictionReport, RetentionPolicy, TrashError, TrashStore};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "NUKE_";

/// Paths that must never be deleted. `~/` entries are expanded against the
/// home directory; relative entries match by path component anywhere.
pub const DEFAULT_PROTECTED_PATHS: &[&str] = &[
    // Root and system directories
    "/",
    "/bin",
    "/sbin",
    "/usr",
    "/usr/bin",
    "/usr/sbin",
    "/usr/lib",
    "/usr/local",
    "/etc",
    "/var",
    "/lib",
    "/lib64",
    "/boot",
    "/sys",
    "/proc",
    "/dev",
    "/run",
    "/tmp",
    // macOS
    "/System",
    "/Library",
    "/Applications",
    "/private",
    "/cores",
    // User secrets and settings
    "~/.ssh",
    "~/.gnupg",
    "~/.config",
    "~/.local/share",
    "~/Library",
    // Anywhere in a path
    ".git",
    "node_modules",
];

/// Subdirectories of a protected directory that are protected too.
const CRITICAL_SUBDIRS: &[&str] = &["bin", "sbin", "lib", "etc"];

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the trash store.
    pub trash_root: PathBuf,
    /// Days a staged item is kept before eviction.
    pub retention_days: u32,
    /// Trash size cap in MiB.
    pub max_size_mb: u64,
    /// Deletion worker count.
    pub workers: usize,
    /// Run a retention sweep after each deletion batch.
    pub auto_cleanup: bool,
    /// Paths callers must refuse to delete. A config file that sets this
    /// list replaces the defaults.
    pub protected_paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trash_root: trash::default_root()
                .unwrap_or_else(|| PathBuf::from(trash::DEFAULT_TRASH_DIR)),
            retention_days: 30,
            max_size_mb: 5000,
            workers: DEFAULT_WORKERS,
            auto_cleanup: true,
            protected_paths: default_protected_paths(),
        }
    }
}

/// [`DEFAULT_PROTECTED_PATHS`] with `~` expanded.
#[must_use]
pub fn default_protected_paths() -> Vec<PathBuf> {
    DEFAULT_PROTECTED_PATHS
        .iter()
        .map(|p| expand_home(Path::new(p)))
        .collect()
}

/// Replace a leading `~` component with the home directory. Paths are
/// returned unchanged when there is no `~` or no known home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), BaseDirs::new()) {
        (Ok(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => path.to_path_buf(),
    }
}

/// Whether the single protected entry `protected` covers `target`. Both
/// paths are already cleaned.
fn protects(protected: &Path, target: &Path) -> bool {
    if target == protected {
        return true;
    }

    if protected.is_relative() {
        let wanted: Vec<Component<'_>> = protected.components().collect();
        let parts: Vec<Component<'_>> = target.components().collect();
        return !wanted.is_empty() && parts.windows(wanted.len()).any(|w| w == wanted.as_slice());
    }

    // Inside a protected directory only its critical subtrees are covered.
    // The filesystem root has no critical subtrees of its own.
    protected.parent().is_some()
        && target.starts_with(protected)
        && CRITICAL_SUBDIRS
            .iter()
            .any(|sub| target.starts_with(protected.join(sub)))
}

impl Config {
    /// Load the configuration from defaults, the default config file and
    /// the environment. Never fails: errors fall back to defaults.
    #[must_use]
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::config_path() {
            log::trace!("Reading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract::<Self>()
            .map(Self::with_expanded_paths)
            .context("invalid configuration")
    }

    fn with_expanded_paths(mut self) -> Self {
        self.trash_root = expand_home(&self.trash_root);
        for path in &mut self.protected_paths {
            *path = expand_home(path);
        }
        self
    }

    /// Load defaults overlaid with a specific TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or holds invalid values.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(&content))
            .extract::<Self>()
            .map(Self::with_expanded_paths)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Render the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    /// Write the configuration as TOML to `path`, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Fails if serialization or any filesystem step fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Whether `path` is covered by the protected-path set.
    ///
    /// `path` is made absolute and cleaned first. A path is protected when it
    /// equals an entry, when a relative entry (such as `.git`) appears as a
    /// run of its components, or when it lies in the `bin`, `sbin`, `lib` or
    /// `etc` subtree of an absolute entry. Being somewhere inside a protected
    /// directory is not enough on its own.
    #[must_use]
    pub fn is_protected(&self, path: &Path) -> bool {
        let target = path_utils::absolute_clean(path).unwrap_or_else(|_| path_utils::clean(path));
        let hit = self
            .protected_paths
            .iter()
            .find(|protected| protects(&path_utils::clean(protected), &target));
        if let Some(protected) = hit {
            log::debug!(
                "{} is protected by {}",
                target.display(),
                protected.display()
            );
        }
        hit.is_some()
    }

    /// Add a protected path, expanding a leading `~`.
    pub fn add_protected_path(&mut self, path: impl AsRef<Path>) {
        self.protected_paths.push(expand_home(path.as_ref()));
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nuke").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Retention policy built from `retention_days` and `max_size_mb`.
    #[must_use]
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention_days, self.max_size_mb)
    }

    /// Open the trash store at `trash_root`.
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Structure`] if the store cannot be created.
    pub fn open_trash(&self) -> Result<TrashStore, TrashError> {
        TrashStore::open(&self.trash_root)
    }

    /// Engine with the configured worker count.
    #[must_use]
    pub fn delete_engine(&self, disposition: Disposition) -> DeleteEngine {
        DeleteEngine::new(disposition).with_workers(self.workers)
    }

    /// Run a retention sweep on `store` when `auto_cleanup` is enabled.
    ///
    /// # Errors
    ///
    /// Returns the sweep's [`TrashError`].
    pub fn run_auto_cleanup(&self, store: &TrashStore) -> Result<Option<EvictionReport>, TrashError> {
        if !self.auto_cleanup {
            return Ok(None);
        }
        store.evict(&self.retention_policy()).map(Some)
    }
}
