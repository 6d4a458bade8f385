//! Error types for manifest loading.
//!
//! Covers every way the load-then-validate pipeline can fail: the manifest
//! cannot be found or read, it is not valid JSON, the configuration is not
//! valid YAML, or the manifest breaks its rule model.

use std::path::PathBuf;

use pkg_manifest_core::ValidationError;
use thiserror::Error;

/// Errors that can occur while loading or checking a manifest.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No manifest file in the working directory or any of its ancestors.
    #[error("Could not find a {0} in the current directory")]
    NotFound(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The manifest file is not valid JSON.
    #[error("failed to parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Configuration parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The manifest was read but violates its rule model.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
