//! Positioned diagnostics for manifest sources.
//!
//! A [`Diagnostic`] pairs a message with an optional source location and is
//! printed through a [`Logger`] at the level matching its category, as
//! `file:line:column - CODE: message` with the file relative to the working
//! directory.

use std::path::{Component, Path, PathBuf};

use pkg_manifest_core::Logger;

/// How serious a diagnostic is; selects the logger level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Message,
    Suggestion,
}

/// 1-based position inside a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    /// Short code naming the producer, e.g. `JSON`.
    pub code: String,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Builds an error diagnostic from a `serde_json` failure on `file`.
    ///
    /// The position suffix `serde_json` appends to its message is moved into
    /// the [`Location`].
    pub fn from_json_error(file: &Path, err: &serde_json::Error) -> Self {
        let full = err.to_string();
        let suffix = format!(" at line {} column {}", err.line(), err.column());
        let message = full.strip_suffix(&suffix).unwrap_or(&full).to_string();
        let location = (err.line() > 0).then(|| Location {
            file: file.to_path_buf(),
            line: err.line(),
            column: err.column().max(1),
        });

        Self {
            category: DiagnosticCategory::Error,
            code: "JSON".to_string(),
            message,
            location,
        }
    }

    /// Renders the diagnostic with its file shown relative to `cwd`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::{Path, PathBuf};
    /// use pkg_manifest_loader::{Diagnostic, DiagnosticCategory, Location};
    ///
    /// let diagnostic = Diagnostic {
    ///     category: DiagnosticCategory::Error,
    ///     code: "JSON".into(),
    ///     message: "trailing comma".into(),
    ///     location: Some(Location {
    ///         file: PathBuf::from("/work/app/package.json"),
    ///         line: 3,
    ///         column: 5,
    ///     }),
    /// };
    /// assert_eq!(
    ///     diagnostic.render(Path::new("/work/app/src")),
    ///     "../package.json:3:5 - JSON: trailing comma"
    /// );
    /// ```
    pub fn render(&self, cwd: &Path) -> String {
        match &self.location {
            Some(location) => format!(
                "{}:{}:{} - {}: {}",
                relative_to(&location.file, cwd).display(),
                location.line,
                location.column,
                self.code,
                self.message
            ),
            None => self.message.clone(),
        }
    }
}

/// Sends `diagnostic` to `logger` at the level its category maps to.
pub fn print_diagnostic(diagnostic: &Diagnostic, logger: &dyn Logger, cwd: &Path) {
    let output = diagnostic.render(cwd);
    match diagnostic.category {
        DiagnosticCategory::Error => logger.error(&output),
        DiagnosticCategory::Warning => logger.warn(&output),
        DiagnosticCategory::Message | DiagnosticCategory::Suggestion => logger.info(&output),
    }
}

/// Expresses `path` relative to `base`, climbing with `..` where needed.
///
/// Paths that share no prefix with `base` (e.g. on different drives) are
/// returned unchanged.
pub(crate) fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}
