use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use taskdeck_store_doc::DocumentStore;

const CONFIG_DIR: &str = ".taskdeck";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_WORKERS: usize = 10;
const MAX_WORKERS: usize = 256;

/// Service configuration loaded from `.taskdeck/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Worker pool settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl ServiceConfig {
    /// Load configuration from `workdir`, falling back to defaults when no file exists.
    ///
    /// A relative store path is resolved against `workdir`.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed or validated.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        let workdir = workdir.as_ref();
        let config_path = workdir.join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
        config.store.resolve_against(workdir);
        Ok(config)
    }

    /// Replace the configured store path, e.g. from a command-line flag.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.path = Some(path.into());
        self
    }

    /// Number of dispatch workers as a non-zero count.
    ///
    /// # Errors
    /// Returns an error when the count is zero.
    pub fn workers(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.dispatch.workers).ok_or_else(|| anyhow!("dispatch.workers must be at least 1"))
    }

    /// Open the configured document store, or an in-memory one when no path is set.
    ///
    /// # Errors
    /// Returns an error when an existing store file cannot be loaded.
    pub fn open_store(&self) -> Result<DocumentStore> {
        match &self.store.path {
            Some(path) => DocumentStore::open(path)
                .with_context(|| format!("failed to open store at {}", path.display())),
            None => Ok(DocumentStore::in_memory()),
        }
    }

    fn validate(&self) -> Result<()> {
        self.dispatch.ensure_worker_range()?;
        self.store.ensure_non_empty_path()
    }
}

/// `[dispatch]` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Requests served concurrently.
    #[serde(default = "DispatchConfig::default_workers")]
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
        }
    }
}

impl DispatchConfig {
    const fn default_workers() -> usize {
        DEFAULT_WORKERS
    }

    fn ensure_worker_range(&self) -> Result<()> {
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            bail!(
                "dispatch.workers must be between 1 and {MAX_WORKERS}, got {}",
                self.workers
            );
        }
        Ok(())
    }
}

/// `[store]` block. Without a path the store is kept in memory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// JSON file holding the documents.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    fn ensure_non_empty_path(&self) -> Result<()> {
        if self
            .path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            bail!("store.path must not be empty");
        }
        Ok(())
    }

    fn resolve_against(&mut self, workdir: &Path) {
        if let Some(path) = self.path.take() {
            self.path = Some(if path.is_relative() {
                workdir.join(path)
            } else {
                path
            });
        }
    }
}
