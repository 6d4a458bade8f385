//! Checker configuration.
//!
//! Loaded from YAML (typically `.pkg-manifest.yml` next to the manifest).
//! Every field is optional.
//!
//! # Example YAML
//!
//! ```yaml
//! manifest: package.json
//! strict_patterns: true
//! ```

use std::borrow::Cow;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use pkg_manifest_core::{PACKAGE_JSON, RuleModel, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::loader::nearest_file;

/// Settings for the load-then-validate pipeline.
///
/// # Examples
///
/// ```
/// use pkg_manifest_loader::CheckConfig;
///
/// let config: CheckConfig = serde_yaml::from_str("strict_patterns: true").unwrap();
/// assert_eq!(config.manifest, "package.json");
/// assert!(config.strict_patterns);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// File name searched for upward from the working directory and used to
    /// refer to the manifest in messages.
    pub manifest: String,
    /// Treat every regex mismatch as fatal instead of advisory.
    pub strict_patterns: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            manifest: PACKAGE_JSON.to_string(),
            strict_patterns: false,
        }
    }
}

impl CheckConfig {
    /// Conventional configuration file name.
    pub const FILE_NAME: &'static str = ".pkg-manifest.yml";

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::LoaderError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::LoaderError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::LoaderError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::LoaderError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Loads the nearest [`FILE_NAME`](Self::FILE_NAME) at or above `cwd`,
    /// falling back to defaults when there is none.
    ///
    /// `cwd` is canonicalized before the upward walk.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::LoaderError::IoError) if `cwd` cannot be
    /// resolved, or any [`load`](Self::load) error for the file found.
    pub fn discover(cwd: impl AsRef<Path>) -> Result<Self> {
        let dir = std::fs::canonicalize(cwd.as_ref())?;
        match nearest_file(&dir, Self::FILE_NAME, Path::is_file) {
            Some(path) => {
                debug!(path = %path.display(), "Loading checker configuration");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// The rule model this configuration validates against.
    pub fn rule_model(&self) -> Cow<'static, RuleModel> {
        if self.strict_patterns {
            Cow::Owned(RuleModel::package_json().with_pattern_severity(Severity::Error))
        } else {
            Cow::Borrowed(RuleModel::package_json())
        }
    }
}
