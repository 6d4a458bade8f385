//! Manifest validation against a [`RuleModel`].
//!
//! The walk stops at the first fatal violation and reports it as a
//! [`ValidationError`]. Advisory violations (pattern mismatches with
//! [`Severity::Warning`] and undeclared keys) go to the [`Logger`] and never
//! stop the walk. On success the input is handed back untouched.
//!
//! # Examples
//!
//! ```
//! use pkg_manifest_core::{MemoryLogger, validate};
//! use serde_json::json;
//!
//! let logger = MemoryLogger::new();
//! let pkg = json!({ "name": "testing", "version": "0.0.0" });
//! assert_eq!(validate(&pkg, &logger).unwrap(), &pkg);
//! assert!(logger.warnings().is_empty());
//!
//! let err = validate(&json!({ "version": "0.0.0" }), &logger).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "'name' in 'package.json' is required as type 'string'"
//! );
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

use crate::format::{FieldPath, FormatContext, Segment, Violation, ViolationKind, render};
use crate::{
    FieldRule, FieldType, Logger, Nested, PACKAGE_JSON, RuleModel, Schema, Severity,
    UnknownKeys, type_name,
};

/// A fatal violation, with its rendered message as `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    violation: Violation,
    message: String,
}

impl ValidationError {
    fn new(violation: Violation, context: &FormatContext<'_>) -> Self {
        let message = render(&violation, context);
        Self { violation, message }
    }

    pub fn violation(&self) -> &Violation {
        &self.violation
    }

    pub fn kind(&self) -> ViolationKind {
        self.violation.kind()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validates manifests against one rule model.
///
/// A validator holds no per-call state and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Validator<'m> {
    model: &'m RuleModel,
    manifest_name: String,
}

impl<'m> Validator<'m> {
    pub fn new(model: &'m RuleModel) -> Self {
        Self {
            model,
            manifest_name: PACKAGE_JSON.to_string(),
        }
    }

    /// Sets the file name used in messages (default `package.json`).
    pub fn manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    /// Validates `pkg`, returning it unchanged on success.
    ///
    /// # Errors
    ///
    /// Returns the first fatal violation encountered, in rule declaration
    /// order.
    pub fn validate<'v>(
        &self,
        pkg: &'v Value,
        logger: &dyn Logger,
    ) -> Result<&'v Value, ValidationError> {
        let mut walk = Walk {
            model: self.model,
            logger,
            format: FormatContext::new(&self.manifest_name),
            path: FieldPath::default(),
            anchor: None,
        };

        let Value::Object(fields) = pkg else {
            return Err(walk.fatal(Violation::WrongType {
                path: String::new(),
                expected: FieldType::Object.to_string(),
                received: type_name(pkg),
            }));
        };

        let root = self.model.schema_for(self.model.root());
        walk.check_object(fields, root, &self.manifest_name)?;
        Ok(pkg)
    }
}

/// Validates `pkg` as a `package.json` with the built-in rule model.
pub fn validate<'v>(pkg: &'v Value, logger: &dyn Logger) -> Result<&'v Value, ValidationError> {
    Validator::new(RuleModel::package_json()).validate(pkg, logger)
}

/// Outermost map field the walk is currently below.
struct Anchor {
    path: String,
    type_name: &'static str,
}

struct Walk<'a> {
    model: &'a RuleModel,
    logger: &'a dyn Logger,
    format: FormatContext<'a>,
    path: FieldPath,
    anchor: Option<Anchor>,
}

impl Walk<'_> {
    /// `label` names this object in the unknown-keys warning.
    fn check_object(
        &mut self,
        fields: &Map<String, Value>,
        schema: &Schema,
        label: &str,
    ) -> Result<(), ValidationError> {
        for rule in &schema.rules {
            self.path.push(Segment::Field(rule.key.clone()));
            let outcome = match fields.get(&rule.key) {
                Some(value) => self.check_value(value, rule, None),
                None if rule.required => Err(self.missing(rule)),
                None => Ok(()),
            };
            self.path.pop();
            outcome?;
        }

        if schema.unknown_keys == UnknownKeys::Warn {
            let unknown: Vec<String> = fields
                .keys()
                .filter(|key| !schema.declares(key))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                self.advise(Violation::UnknownKeys {
                    context: label.to_string(),
                    keys: unknown,
                });
            }
        }

        Ok(())
    }

    /// `label` overrides the unknown-keys name of a fixed-shape object value.
    fn check_value(
        &mut self,
        value: &Value,
        rule: &FieldRule,
        label: Option<&str>,
    ) -> Result<(), ValidationError> {
        if !rule.accepts(value) {
            return Err(self.fatal(Violation::WrongType {
                path: self.path.to_string(),
                expected: rule.expected_types(),
                received: type_name(value),
            }));
        }

        match (&rule.nested, value) {
            (Some(Nested::Fixed(context)), Value::Object(fields)) => {
                let schema = self.model.schema_for(*context);
                let label = label.map_or_else(|| self.path.to_string(), str::to_string);
                self.check_object(fields, schema, &label)?;
            }
            (Some(Nested::MapOf(entry)), Value::Object(entries)) => {
                self.check_map(entries, entry)?;
            }
            (Some(Nested::ItemsOf(item)), Value::Array(items)) => {
                for (index, element) in items.iter().enumerate() {
                    self.path.push(Segment::Index(index));
                    let outcome = self.check_value(element, item, None);
                    self.path.pop();
                    outcome?;
                }
            }
            _ => {}
        }

        if let (Some(pattern), Value::String(text)) = (&rule.pattern, value) {
            if !pattern.is_match(text) {
                let violation = Violation::PatternMismatch {
                    path: self.path.to_string(),
                    value: text.clone(),
                    pattern: pattern.as_str().to_string(),
                    severity: rule.severity,
                };
                match rule.severity {
                    Severity::Error => return Err(self.fatal(violation)),
                    Severity::Warning => self.advise(violation),
                }
            }
        }

        if let Some(allowed) = &rule.allowed {
            if !allowed.contains(value) {
                return Err(self.fatal(Violation::EnumMismatch {
                    path: self.path.to_string(),
                    allowed: allowed.iter().map(literal).collect(),
                }));
            }
        }

        Ok(())
    }

    fn check_map(
        &mut self,
        entries: &Map<String, Value>,
        entry: &FieldRule,
    ) -> Result<(), ValidationError> {
        let label = self.path.to_string();
        let outermost = self.anchor.is_none();
        if outermost {
            self.anchor = Some(Anchor {
                path: self.path.anchor(),
                type_name: FieldType::Object.as_str(),
            });
        }

        let mut outcome = Ok(());
        for (key, value) in entries {
            self.path.push(Segment::Entry(key.clone()));
            outcome = self.check_value(value, entry, Some(&label));
            self.path.pop();
            if outcome.is_err() {
                break;
            }
        }

        if outermost {
            self.anchor = None;
        }
        outcome
    }

    fn missing(&self, rule: &FieldRule) -> ValidationError {
        let path = self.path.to_string();
        let violation = match &self.anchor {
            Some(anchor) => Violation::SchemaPathMissing {
                path,
                parent: anchor.path.clone(),
                parent_type: anchor.type_name,
            },
            None => Violation::MissingRequired {
                path,
                expected: rule.expected_types(),
            },
        };
        self.fatal(violation)
    }

    fn fatal(&self, violation: Violation) -> ValidationError {
        ValidationError::new(violation, &self.format)
    }

    fn advise(&self, violation: Violation) {
        self.logger.warn(&render(&violation, &self.format));
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;
    use serde_json::json;

    use super::*;
    use crate::{MemoryLogger, SchemaContext};

    fn run(pkg: &Value) -> (Result<&Value, ValidationError>, MemoryLogger) {
        let logger = MemoryLogger::new();
        let result = validate(pkg, &logger);
        (result, logger)
    }

    #[test]
    fn test_valid_manifest_passes_through() {
        let pkg = json!({ "name": "testing", "version": "0.0.0" });
        let (result, logger) = run(&pkg);
        assert_eq!(result.unwrap(), &pkg);
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn test_missing_name_is_reported_first() {
        let pkg = json!({});
        let (result, _) = run(&pkg);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ViolationKind::MissingRequired);
        assert_eq!(
            err.to_string(),
            "'name' in 'package.json' is required as type 'string'"
        );
    }

    #[test]
    fn test_missing_version() {
        let pkg = json!({ "name": "testing" });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'version' in 'package.json' is required as type 'string'"
        );
    }

    #[test]
    fn test_version_type_mismatch() {
        let pkg = json!({ "name": "testing", "version": 0 });
        let (result, _) = run(&pkg);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WrongType);
        assert_eq!(
            err.to_string(),
            "'version' in 'package.json' must be of type 'string' (received 'number')"
        );
    }

    #[test]
    fn test_null_is_a_type_mismatch() {
        let pkg = json!({ "name": null, "version": "0.0.0" });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'name' in 'package.json' must be of type 'string' (received 'null')"
        );
    }

    #[test]
    fn test_root_must_be_an_object() {
        let pkg = json!(["name"]);
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'package.json' must be of type 'object' (received 'array')"
        );
    }

    #[test]
    fn test_enum_mismatch_is_fatal() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "type": "something" });
        let (result, _) = run(&pkg);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ViolationKind::EnumMismatch);
        assert_eq!(
            err.to_string(),
            "type must be one of the following values: commonjs, module"
        );
    }

    #[test]
    fn test_exports_must_be_an_object() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "exports": "hello" });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'exports' in 'package.json' must be of type 'object' (received 'string')"
        );
    }

    #[test]
    fn test_shorthand_export_pattern_only_warns() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": { "apple": "./apple.xyzx" }
        });
        let (result, logger) = run(&pkg);
        assert_eq!(result.unwrap(), &pkg);
        assert_eq!(
            logger.warnings(),
            vec![r#"Warning: Value "./apple.xyzx" does not match the required regex /^\.\/.*\.json$/"#.to_string()]
        );
    }

    #[test]
    fn test_valid_export_entry() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                "./feature": { "source": "./src/feature.js", "default": "./dist/feature.js" },
                "./package.json": "./package.json"
            }
        });
        let (result, logger) = run(&pkg);
        assert_eq!(result.unwrap()["exports"], pkg["exports"]);
        assert!(logger.warnings().is_empty());
    }

    #[test]
    fn test_export_entry_missing_source() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": { "./feature": { "default": "./dist/feature.js" } }
        });
        let (result, _) = run(&pkg);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ViolationKind::SchemaPathMissing);
        assert_eq!(
            err.to_string(),
            r#"The schema does not contain the path: exports["./feature"].source. (failed at: .exports which is a type: "object")"#
        );
    }

    #[test]
    fn test_missing_field_in_target_below_entry_is_anchored_at_map() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                ".": {
                    "source": "./src/index.ts",
                    "browser": { "import": "./dist/browser.mjs" },
                    "default": "./dist/index.js"
                }
            }
        });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            r#"The schema does not contain the path: exports["."].browser.source. (failed at: .exports which is a type: "object")"#
        );
    }

    #[test]
    fn test_unknown_entry_keys_warn_once() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                "./feature": {
                    "source": "./src/feature.js",
                    "default": "./dist/feature.js",
                    "unknownKey": "value",
                    "another": 1
                }
            }
        });
        let (result, logger) = run(&pkg);
        assert_eq!(result.unwrap(), &pkg);
        assert_eq!(
            logger.warnings(),
            vec!["Warning: Unknown keys in exports: unknownKey, another".to_string()]
        );
    }

    #[test]
    fn test_unknown_keys_aggregate_per_object() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                "./a": { "source": "./src/a.js", "default": "./dist/a.js", "first": 1 },
                "./b": { "source": "./src/b.js", "default": "./dist/b.js", "second": 2 }
            }
        });
        let (result, logger) = run(&pkg);
        assert!(result.is_ok());
        assert_eq!(
            logger.warnings(),
            vec![
                "Warning: Unknown keys in exports: first".to_string(),
                "Warning: Unknown keys in exports: second".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_keys_do_not_skip_declared_rules() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                "./feature": { "source": "./src/feature.js", "unknownKey": "value" }
            }
        });
        let (result, logger) = run(&pkg);
        assert_eq!(result.unwrap_err().kind(), ViolationKind::SchemaPathMissing);
        // The walk aborted before reaching the unknown-key check.
        assert!(logger.warnings().is_empty());
    }

    #[test]
    fn test_unknown_root_keys_are_allowed_silently() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "keywords": ["a"],
            "repository": { "type": "git" }
        });
        let (result, logger) = run(&pkg);
        assert!(result.is_ok());
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn test_author_object_unknown_keys_use_field_path() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "author": { "name": "Someone", "twitter": "@someone" }
        });
        let (result, logger) = run(&pkg);
        assert!(result.is_ok());
        assert_eq!(
            logger.warnings(),
            vec!["Warning: Unknown keys in author: twitter".to_string()]
        );
    }

    #[test]
    fn test_author_object_requires_name() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "author": { "email": "a@b.c" } });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'author.name' in 'package.json' is required as type 'string'"
        );
    }

    #[test]
    fn test_author_rejects_numbers() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "author": 7 });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'author' in 'package.json' must be of type 'string | object' (received 'number')"
        );
    }

    #[test]
    fn test_array_items_are_indexed() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "files": ["dist", 3] });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'files[1]' in 'package.json' must be of type 'string' (received 'number')"
        );
    }

    #[test]
    fn test_files_must_be_an_array_not_an_object() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "files": { "0": "dist" } });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            "'files' in 'package.json' must be of type 'array' (received 'object')"
        );
    }

    #[test]
    fn test_bin_map_entries_must_be_strings() {
        let pkg = json!({ "name": "testing", "version": "0.0.0", "bin": { "tool": true } });
        let (result, _) = run(&pkg);
        assert_eq!(
            result.unwrap_err().to_string(),
            r#"'bin["tool"]' in 'package.json' must be of type 'string' (received 'boolean')"#
        );
    }

    #[test]
    fn test_default_condition_pattern_warns() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                "./feature": { "source": "./src/feature.js", "default": "dist/feature.js" }
            }
        });
        let (result, logger) = run(&pkg);
        assert!(result.is_ok());
        assert_eq!(
            logger.warnings(),
            vec![r#"Warning: Value "dist/feature.js" does not match the required regex /^\.\/.*$/"#.to_string()]
        );
    }

    #[test]
    fn test_strict_model_makes_patterns_fatal() {
        let strict = RuleModel::package_json().with_pattern_severity(Severity::Error);
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": { "apple": "./apple.xyzx" }
        });
        let logger = MemoryLogger::new();
        let err = Validator::new(&strict).validate(&pkg, &logger).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::PatternMismatch);
        assert_eq!(
            err.to_string(),
            r#"'exports["apple"]' in 'package.json' does not match the required regex /^\.\/.*\.json$/ (received "./apple.xyzx")"#
        );
        assert!(logger.warnings().is_empty());
    }

    #[test]
    fn test_warnings_accumulate_across_entries() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "exports": {
                "./a": "./a.txt",
                "./b": { "source": "./src/b.js", "default": "./dist/b.js", "extra": true },
                "./c": "./c.txt"
            }
        });
        let (result, logger) = run(&pkg);
        assert!(result.is_ok());
        assert_eq!(
            logger.warnings(),
            vec![
                r#"Warning: Value "./a.txt" does not match the required regex /^\.\/.*\.json$/"#.to_string(),
                "Warning: Unknown keys in exports: extra".to_string(),
                r#"Warning: Value "./c.txt" does not match the required regex /^\.\/.*\.json$/"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let pkg = json!({
            "name": "testing",
            "version": "0.0.0",
            "type": "module",
            "exports": { "./feature": { "source": "./src/feature.js", "default": "./dist/feature.js" } }
        });
        let logger = MemoryLogger::new();
        let first = validate(&pkg, &logger).unwrap().clone();
        let second = validate(&first, &logger).unwrap();
        assert_eq!(second, &pkg);
    }

    #[test]
    fn test_custom_manifest_name_and_model() {
        let schema = Schema::new(SchemaContext::Package, UnknownKeys::Warn)
            .rule(FieldRule::string("id").required())
            .rule(
                FieldRule::string("channel")
                    .pattern(Regex::new("^(stable|beta)$").unwrap())
                    .severity(Severity::Error),
            );
        let model = RuleModel::new(SchemaContext::Package, vec![schema]).unwrap();
        let validator = Validator::new(&model).manifest_name("plugin.json");
        let logger = MemoryLogger::new();

        let err = validator.validate(&json!({}), &logger).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'id' in 'plugin.json' is required as type 'string'"
        );

        let pkg = json!({ "id": "x", "channel": "beta", "extra": 1 });
        assert!(validator.validate(&pkg, &logger).is_ok());
        assert_eq!(
            logger.warnings(),
            vec!["Warning: Unknown keys in plugin.json: extra".to_string()]
        );
    }
}
