//! Platform directory resolution.
//!
//! Config, data, cache and log directories follow OS conventions (XDG on
//! Linux, Known Folders on Windows, Library on macOS) via `dirs`.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during platform operations.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// OS-specific directories for the `solar-system` application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    /// `config.ron` lives here.
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// JSON log file in debug builds.
    pub log_dir: PathBuf,
}

pub const APP_NAME: &str = "solar-system";

impl PlatformDirs {
    /// Resolve platform-specific directories without creating them.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoConfigDir`] if the OS does not expose a
    /// configuration directory.
    pub fn resolve() -> Result<Self, PlatformError> {
        let app_config = dirs::config_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME);

        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("data"));
        let cache_dir = dirs::cache_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("cache"));

        Ok(Self {
            config_dir: app_config.join("config"),
            data_dir,
            cache_dir,
            log_dir: app_config.join("logs"),
        })
    }

    /// Resolve every directory under `root`. Used by tests and by
    /// `--config-dir`.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            data_dir: app_dir.join("data"),
            cache_dir: app_dir.join("cache"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Point `config_dir` at an explicit directory, keeping the rest.
    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir = config_dir.into();
        self
    }

    /// Create all directories on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        for dir in [&self.config_dir, &self.data_dir, &self.cache_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Resolve directories and create them on disk.
    pub fn resolve_and_create() -> Result<Self, PlatformError> {
        let dirs = Self::resolve()?;
        dirs.create_dirs()?;
        Ok(dirs)
    }
}
