//! Manifest lookup, loading and the load-then-validate pipeline.
//!
//! # Loading patterns
//!
//! ```no_run
//! use pkg_manifest_core::TracingLogger;
//! use pkg_manifest_loader::{CheckConfig, check_manifest, load_pkg};
//!
//! // Nearest package.json at or above the directory
//! let loaded = load_pkg("packages/app", &TracingLogger).unwrap();
//! println!("{}", loaded.path.display());
//!
//! // Load and validate in one go
//! let config = CheckConfig::discover("packages/app").unwrap();
//! let checked = check_manifest("packages/app", &config, &TracingLogger).unwrap();
//! assert_eq!(checked.pkg["name"], loaded.pkg["name"]);
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pkg_manifest_core::{Logger, PACKAGE_JSON, Validator};
use serde_json::Value;
use tracing::debug;

use crate::config::CheckConfig;
use crate::diagnostic::{Diagnostic, print_diagnostic};
use crate::error::{LoaderError, Result};

/// A parsed manifest together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedManifest {
    /// The raw parsed document, exactly as read.
    pub pkg: Value,
    /// Manifest file that was read.
    pub path: PathBuf,
    /// Canonical directory the lookup started from.
    pub cwd: PathBuf,
}

/// Returns the nearest file named `file_name` in `cwd` or one of its
/// ancestors.
///
/// `cwd` is canonicalized first, so relative paths and `..` components walk
/// the real parent directories. A `cwd` that does not exist yields `None`.
pub fn find_manifest(cwd: impl AsRef<Path>, file_name: &str) -> Option<PathBuf> {
    let dir = fs::canonicalize(cwd.as_ref()).ok()?;
    nearest_file(&dir, file_name, Path::is_file)
}

/// Walks `dir` and its ancestors, returning the first `dir/file_name` for
/// which `is_file` holds. `dir` must already be canonical.
pub(crate) fn nearest_file(
    dir: &Path,
    file_name: &str,
    is_file: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(file_name))
        .find(|candidate| is_file(candidate.as_path()))
}

/// Loads the nearest `package.json` at or above `cwd`.
///
/// # Errors
///
/// See [`load_manifest`].
pub fn load_pkg(cwd: impl AsRef<Path>, logger: &dyn Logger) -> Result<LoadedManifest> {
    load_manifest(cwd, PACKAGE_JSON, logger)
}

/// Loads the nearest manifest named `file_name` at or above `cwd`.
///
/// The parsed document is logged at debug level. JSON syntax errors are
/// reported through [`print_diagnostic`] with their position before failing.
///
/// # Errors
///
/// Returns [`LoaderError::NotFound`] if `cwd` does not exist or no manifest
/// exists up the tree,
/// [`LoaderError::IoError`] if it cannot be read, or [`LoaderError::Parse`]
/// if it is not valid JSON.
pub fn load_manifest(
    cwd: impl AsRef<Path>,
    file_name: &str,
    logger: &dyn Logger,
) -> Result<LoadedManifest> {
    let cwd = fs::canonicalize(cwd.as_ref()).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => LoaderError::NotFound(file_name.to_string()),
        _ => LoaderError::IoError(err),
    })?;
    let path = nearest_file(&cwd, file_name, Path::is_file)
        .ok_or_else(|| LoaderError::NotFound(file_name.to_string()))?;
    debug!(path = %path.display(), "Reading manifest");

    let raw = fs::read_to_string(&path)?;
    let pkg: Value = match serde_json::from_str(&raw) {
        Ok(pkg) => pkg,
        Err(source) => {
            print_diagnostic(&Diagnostic::from_json_error(&path, &source), logger, &cwd);
            return Err(LoaderError::Parse { path, source });
        }
    };

    logger.debug(&format!("Loaded {file_name}:\n{pkg:#}"));
    Ok(LoadedManifest { pkg, path, cwd })
}

/// Loads the configured manifest and validates it.
///
/// Advisory violations are sent to `logger`; the first fatal one aborts.
///
/// # Errors
///
/// Any [`load_manifest`] error, or [`LoaderError::Invalid`] carrying the
/// first fatal violation.
pub fn check_manifest(
    cwd: impl AsRef<Path>,
    config: &CheckConfig,
    logger: &dyn Logger,
) -> Result<LoadedManifest> {
    let loaded = load_manifest(cwd, &config.manifest, logger)?;
    let model = config.rule_model();
    Validator::new(&model)
        .manifest_name(config.manifest.as_str())
        .validate(&loaded.pkg, logger)?;
    debug!(path = %loaded.path.display(), "Manifest is valid");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use pkg_manifest_core::MemoryLogger;
    use serde_json::json;
    use tracing::Level;

    use super::*;

    fn write_pkg(dir: &Path, pkg: &Value) {
        fs::write(
            dir.join(PACKAGE_JSON),
            serde_json::to_string_pretty(pkg).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_load_pkg_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = json!({ "name": "testing", "version": "0.0.0" });
        write_pkg(dir.path(), &pkg);

        let logger = MemoryLogger::new();
        let loaded = load_pkg(dir.path(), &logger).unwrap();
        assert_eq!(loaded.pkg, pkg);
        assert_eq!(
            loaded.path,
            fs::canonicalize(dir.path()).unwrap().join(PACKAGE_JSON)
        );
        assert_eq!(logger.messages(Level::DEBUG).len(), 1);
        assert!(logger.messages(Level::DEBUG)[0].starts_with("Loaded package.json:"));
    }

    #[test]
    fn test_load_pkg_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("lib");
        fs::create_dir_all(&nested).unwrap();
        write_pkg(dir.path(), &json!({ "name": "root", "version": "1.0.0" }));

        let loaded = load_pkg(&nested, &MemoryLogger::new()).unwrap();
        assert_eq!(loaded.pkg["name"], "root");
        assert_eq!(loaded.cwd, fs::canonicalize(&nested).unwrap());
    }

    #[test]
    fn test_nearest_manifest_wins() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("packages").join("app");
        fs::create_dir_all(&nested).unwrap();
        write_pkg(dir.path(), &json!({ "name": "root", "version": "1.0.0" }));
        write_pkg(&nested, &json!({ "name": "app", "version": "1.0.0" }));

        let loaded = load_pkg(&nested, &MemoryLogger::new()).unwrap();
        assert_eq!(loaded.pkg["name"], "app");
    }

    #[test]
    fn test_parent_components_walk_real_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let sibling = dir.path().join("a");
        let start = dir.path().join("b");
        fs::create_dir_all(&sibling).unwrap();
        fs::create_dir_all(&start).unwrap();
        write_pkg(dir.path(), &json!({ "name": "root", "version": "1.0.0" }));
        write_pkg(&sibling, &json!({ "name": "sibling-a", "version": "1.0.0" }));

        let loaded = load_pkg(sibling.join("..").join("b"), &MemoryLogger::new()).unwrap();
        assert_eq!(loaded.pkg["name"], "root");
        assert_eq!(loaded.cwd, fs::canonicalize(&start).unwrap());
    }

    #[test]
    fn test_missing_cwd_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pkg(dir.path().join("gone"), &MemoryLogger::new()).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
        assert_eq!(
            err.to_string(),
            "Could not find a package.json in the current directory"
        );
        assert_eq!(find_manifest(dir.path().join("gone"), PACKAGE_JSON), None);
    }

    #[test]
    fn test_nearest_file_on_synthetic_tree() {
        let present = [
            PathBuf::from("/repo/package.json"),
            PathBuf::from("/repo/packages/app/package.json"),
        ];
        let is_file = |candidate: &Path| present.iter().any(|p| p == candidate);

        let app = Path::new("/repo/packages/app/src");
        assert_eq!(
            nearest_file(app, PACKAGE_JSON, is_file),
            Some(PathBuf::from("/repo/packages/app/package.json"))
        );
        assert_eq!(
            nearest_file(Path::new("/repo/packages"), PACKAGE_JSON, is_file),
            Some(PathBuf::from("/repo/package.json"))
        );
        assert_eq!(nearest_file(Path::new("/elsewhere/deep"), PACKAGE_JSON, is_file), None);
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path(), "no-such-manifest.json", &MemoryLogger::new())
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
        assert_eq!(
            err.to_string(),
            "Could not find a no-such-manifest.json in the current directory"
        );
    }

    #[test]
    fn test_malformed_manifest_prints_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PACKAGE_JSON), "{\n  \"name\": \"x\",\n}").unwrap();

        let logger = MemoryLogger::new();
        let err = load_pkg(dir.path(), &logger).unwrap_err();
        assert!(matches!(err, LoaderError::Parse { .. }));

        let errors = logger.messages(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("package.json:3:"), "{}", errors[0]);
        assert!(errors[0].contains(" - JSON: "));
    }

    #[test]
    fn test_check_manifest_reports_violation() {
        let dir = tempfile::tempdir().unwrap();
        write_pkg(dir.path(), &json!({ "name": "testing", "version": 0 }));

        let err = check_manifest(dir.path(), &CheckConfig::default(), &MemoryLogger::new())
            .unwrap_err();
        assert!(matches!(err, LoaderError::Invalid(_)));
        assert_eq!(
            err.to_string(),
            "'version' in 'package.json' must be of type 'string' (received 'number')"
        );
    }

    #[test]
    fn test_check_manifest_uses_configured_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plugin.json"), r#"{ "version": "1.0.0" }"#).unwrap();
        let config = CheckConfig {
            manifest: "plugin.json".to_string(),
            strict_patterns: false,
        };

        let err = check_manifest(dir.path(), &config, &MemoryLogger::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'name' in 'plugin.json' is required as type 'string'"
        );
    }
}
