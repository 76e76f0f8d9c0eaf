//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while loading, saving, or parsing `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid RON for [`crate::Config`].
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::ReadError { path, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::WriteError { path, source }
    }
}
