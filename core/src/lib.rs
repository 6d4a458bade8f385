//! Schema-driven validation for package manifests.
//!
//! This crate checks a parsed manifest (a `serde_json::Value`) against a
//! declarative rule model before a build pipeline trusts its contents:
//!
//! - [`RuleModel`] — immutable schemas made of ordered [`FieldRule`]s, with
//!   required/optional fields, accepted [`FieldType`]s, regex and enum
//!   constraints, and [`Nested`] descent into fixed-shape objects, user-keyed
//!   maps and arrays. [`RuleModel::package_json`] is the built-in model.
//! - [`Validator`] — walks a manifest against a model, failing on the first
//!   fatal violation and sending advisory ones to a [`Logger`].
//! - [`render`] — turns a [`Violation`] into a path-qualified message such as
//!   `exports["./feature"].source`.
//!
//! # Example
//!
//! ```
//! use pkg_manifest_core::*;
//! use serde_json::json;
//!
//! let logger = MemoryLogger::new();
//! let pkg = json!({
//!     "name": "testing",
//!     "version": "0.0.0",
//!     "exports": { "./feature": { "default": "./dist/feature.js" } }
//! });
//!
//! let err = validate(&pkg, &logger).unwrap_err();
//! assert_eq!(err.kind(), ViolationKind::SchemaPathMissing);
//! assert_eq!(
//!     err.to_string(),
//!     r#"The schema does not contain the path: exports["./feature"].source. (failed at: .exports which is a type: "object")"#
//! );
//! ```

mod format;
mod logger;
mod package;
mod types;
mod validate;

pub use format::{
    FieldPath, FormatContext, Segment, Violation, ViolationKind, regex_literal, render,
};
pub use logger::{Logger, MemoryLogger, TracingLogger};
pub use package::PACKAGE_JSON;
pub use types::*;
pub use validate::{ValidationError, Validator, validate};
