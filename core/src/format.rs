//! Path-qualified violation messages.
//!
//! Rendering is a pure function of a [`Violation`] and a [`FormatContext`];
//! the wording is stable and relied upon by callers that match on it.
//!
//! # Examples
//!
//! ```
//! use pkg_manifest_core::{FormatContext, Violation, render};
//!
//! let context = FormatContext::new("package.json");
//! let violation = Violation::MissingRequired {
//!     path: "name".into(),
//!     expected: "string".into(),
//! };
//! assert_eq!(
//!     render(&violation, &context),
//!     "'name' in 'package.json' is required as type 'string'"
//! );
//! ```

use std::fmt;

use serde::Serialize;

use crate::Severity;

/// One step from the manifest root towards a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A field declared by a schema.
    Field(String),
    /// A user-chosen key of a map-shaped field.
    Entry(String),
    /// Position in an array.
    Index(usize),
}

/// Route from the manifest root to the value under inspection.
///
/// Displays as `exports["./feature"].source`: named fields are dotted, map
/// keys are quoted in brackets and array positions are bare in brackets.
///
/// # Examples
///
/// ```
/// use pkg_manifest_core::{FieldPath, Segment};
///
/// let mut path = FieldPath::default();
/// path.push(Segment::Field("exports".into()));
/// assert_eq!(path.anchor(), ".exports");
///
/// path.push(Segment::Entry("./feature".into()));
/// path.push(Segment::Field("source".into()));
/// assert_eq!(path.to_string(), r#"exports["./feature"].source"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Renders the path with every named field dot-prefixed (`.exports`),
    /// the form used to say where a nested lookup failed.
    pub fn anchor(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                other => write_bracketed(&mut out, other),
            }
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                other => write_bracketed(&mut out, other),
            }
        }
        f.write_str(&out)
    }
}

fn write_bracketed(out: &mut String, segment: &Segment) {
    match segment {
        Segment::Entry(key) => {
            out.push('[');
            out.push_str(&quote(key));
            out.push(']');
        }
        Segment::Index(index) => {
            out.push('[');
            out.push_str(&index.to_string());
            out.push(']');
        }
        Segment::Field(_) => {}
    }
}

fn quote(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""))
}

/// Category of a [`Violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    MissingRequired,
    WrongType,
    PatternMismatch,
    EnumMismatch,
    SchemaPathMissing,
    UnknownKeys,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequired => "missing-required",
            Self::WrongType => "wrong-type",
            Self::PatternMismatch => "pattern-mismatch",
            Self::EnumMismatch => "enum-mismatch",
            Self::SchemaPathMissing => "schema-path-missing",
            Self::UnknownKeys => "unknown-keys",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema violation, with paths already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A required field is absent.
    MissingRequired { path: String, expected: String },
    /// A present field has the wrong structural type. An empty `path` means
    /// the manifest root itself.
    WrongType {
        path: String,
        expected: String,
        received: &'static str,
    },
    /// A string does not match its rule's regex.
    PatternMismatch {
        path: String,
        value: String,
        pattern: String,
        severity: Severity,
    },
    /// A value is outside its closed set of allowed literals.
    EnumMismatch { path: String, allowed: Vec<String> },
    /// A required field is absent below a map entry.
    SchemaPathMissing {
        path: String,
        parent: String,
        parent_type: &'static str,
    },
    /// Undeclared keys of one object, aggregated.
    UnknownKeys { context: String, keys: Vec<String> },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Self::MissingRequired { .. } => ViolationKind::MissingRequired,
            Self::WrongType { .. } => ViolationKind::WrongType,
            Self::PatternMismatch { .. } => ViolationKind::PatternMismatch,
            Self::EnumMismatch { .. } => ViolationKind::EnumMismatch,
            Self::SchemaPathMissing { .. } => ViolationKind::SchemaPathMissing,
            Self::UnknownKeys { .. } => ViolationKind::UnknownKeys,
        }
    }

    /// Returns `true` if this violation aborts validation.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::PatternMismatch { severity, .. } => *severity == Severity::Error,
            Self::UnknownKeys { .. } => false,
            _ => true,
        }
    }
}

/// Ambient information a message needs beyond the violation itself.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    /// File name the manifest is referred to by (`package.json`).
    pub manifest_name: &'a str,
}

impl<'a> FormatContext<'a> {
    pub fn new(manifest_name: &'a str) -> Self {
        Self { manifest_name }
    }
}

/// Renders `violation` as a single-line message.
///
/// Advisory violations are prefixed with `Warning:`.
pub fn render(violation: &Violation, context: &FormatContext<'_>) -> String {
    let manifest = context.manifest_name;
    match violation {
        Violation::MissingRequired { path, expected } => {
            format!("'{path}' in '{manifest}' is required as type '{expected}'")
        }
        Violation::WrongType {
            path,
            expected,
            received,
        } if path.is_empty() => {
            format!("'{manifest}' must be of type '{expected}' (received '{received}')")
        }
        Violation::WrongType {
            path,
            expected,
            received,
        } => {
            format!("'{path}' in '{manifest}' must be of type '{expected}' (received '{received}')")
        }
        Violation::PatternMismatch {
            path,
            value,
            pattern,
            severity,
        } => {
            let literal = regex_literal(pattern);
            match severity {
                Severity::Warning => {
                    format!("Warning: Value \"{value}\" does not match the required regex {literal}")
                }
                Severity::Error => format!(
                    "'{path}' in '{manifest}' does not match the required regex {literal} (received \"{value}\")"
                ),
            }
        }
        Violation::EnumMismatch { path, allowed } => {
            format!(
                "{path} must be one of the following values: {}",
                allowed.join(", ")
            )
        }
        Violation::SchemaPathMissing {
            path,
            parent,
            parent_type,
        } => format!(
            "The schema does not contain the path: {path}. (failed at: {parent} which is a type: \"{parent_type}\")"
        ),
        Violation::UnknownKeys { context, keys } => {
            format!("Warning: Unknown keys in {context}: {}", keys.join(", "))
        }
    }
}

/// Renders a regex source as a slash-delimited literal, escaping bare `/`.
///
/// ```
/// use pkg_manifest_core::regex_literal;
///
/// assert_eq!(regex_literal(r"^\./.*\.json$"), r"/^\.\/.*\.json$/");
/// assert_eq!(regex_literal(r"^a\/b$"), r"/^a\/b$/");
/// ```
pub fn regex_literal(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('/');
    let mut escaped = false;
    for ch in pattern.chars() {
        if ch == '/' && !escaped {
            out.push('\\');
        }
        escaped = ch == '\\' && !escaped;
        out.push(ch);
    }
    out.push('/');
    out
}
