//! Rule model type definitions.
//!
//! A [`RuleModel`] is plain data: an ordered list of [`FieldRule`]s for every
//! [`SchemaContext`] it knows about. The validator walks a manifest against it
//! without knowing anything about the particular fields declared, so adding a
//! field to a manifest shape never touches the evaluation algorithm.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structural type of a manifest value.
///
/// Objects and arrays are told apart structurally, so a JSON array never
/// satisfies a rule expecting an associative `object`.
///
/// # Examples
///
/// ```
/// use pkg_manifest_core::FieldType;
/// use serde_json::json;
///
/// assert_eq!(FieldType::of(&json!({})), Some(FieldType::Object));
/// assert_eq!(FieldType::of(&json!([])), Some(FieldType::Array));
/// assert_eq!(FieldType::of(&json!(null)), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    /// Classifies `value`, returning `None` for `null`.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::String),
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Object(_) => Some(Self::Object),
            Value::Array(_) => Some(Self::Array),
            Value::Null => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the structural type of `value`, as reported in type mismatches.
pub fn type_name(value: &Value) -> &'static str {
    FieldType::of(value).map_or("null", FieldType::as_str)
}

/// Outcome of a constraint (pattern) violation on a present, well-typed field.
///
/// Missing and mistyped fields are always fatal and ignore this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Abort validation.
    Error,
    /// Log a warning and keep going (the default).
    #[default]
    Warning,
}

/// What to do with keys an object schema does not declare.
///
/// Neither policy ever aborts validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    /// Pass undeclared keys through silently.
    Allow,
    /// Pass them through and log one aggregated warning per object.
    #[default]
    Warn,
}

/// Names an object schema inside a [`RuleModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaContext {
    /// The manifest root.
    Package,
    /// One entry of the conditional exports map.
    ExportEntry,
    /// `browser` conditions of an export entry.
    BrowserTarget,
    /// `node` conditions of an export entry.
    NodeTarget,
    /// Object form of `author`.
    Person,
}

impl SchemaContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::ExportEntry => "export-entry",
            Self::BrowserTarget => "browser-target",
            Self::NodeTarget => "node-target",
            Self::Person => "person",
        }
    }
}

/// How an object- or array-valued field is descended into.
#[derive(Debug, Clone)]
pub enum Nested {
    /// Sub-keys are named fields declared by the referenced schema.
    Fixed(SchemaContext),
    /// Sub-keys are user-chosen; every entry value must satisfy the rule.
    MapOf(Box<FieldRule>),
    /// Every array element must satisfy the rule.
    ItemsOf(Box<FieldRule>),
}

/// One field declaration.
///
/// Constraints are type-specific: `pattern` only applies to string values,
/// [`Nested::Fixed`] and [`Nested::MapOf`] only to objects and
/// [`Nested::ItemsOf`] only to arrays. This lets a single rule accept, for
/// instance, either a shorthand string or a fully spelled-out object.
///
/// # Examples
///
/// ```
/// use pkg_manifest_core::{FieldRule, FieldType};
/// use serde_json::json;
///
/// let rule = FieldRule::string("type").required().one_of(["commonjs", "module"]);
/// assert!(rule.accepts(&json!("module")));
/// assert!(!rule.accepts(&json!(1)));
/// assert_eq!(rule.expected_types(), "string");
///
/// let author = FieldRule::string("author").or(FieldType::Object);
/// assert_eq!(author.expected_types(), "string | object");
/// ```
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// Field name at the current nesting level.
    pub key: String,
    /// Accepted types, in declared order.
    pub types: Vec<FieldType>,
    pub required: bool,
    /// Applies to pattern mismatches only.
    pub severity: Severity,
    pub pattern: Option<Regex>,
    /// Closed set of allowed literal values.
    pub allowed: Option<Vec<Value>>,
    pub nested: Option<Nested>,
}

impl FieldRule {
    /// Creates an optional rule accepting a single type.
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            types: vec![field_type],
            required: false,
            severity: Severity::default(),
            pattern: None,
            allowed: None,
            nested: None,
        }
    }

    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, FieldType::String)
    }

    pub fn object(key: impl Into<String>) -> Self {
        Self::new(key, FieldType::Object)
    }

    pub fn array(key: impl Into<String>) -> Self {
        Self::new(key, FieldType::Array)
    }

    /// Rule for an unnamed value: a map entry or an array element.
    pub fn value(field_type: FieldType) -> Self {
        Self::new(String::new(), field_type)
    }

    /// Also accepts `field_type`.
    pub fn or(mut self, field_type: FieldType) -> Self {
        if !self.types.contains(&field_type) {
            self.types.push(field_type);
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn fixed(mut self, context: SchemaContext) -> Self {
        self.nested = Some(Nested::Fixed(context));
        self
    }

    pub fn map_of(mut self, entry: FieldRule) -> Self {
        self.nested = Some(Nested::MapOf(Box::new(entry)));
        self
    }

    pub fn items_of(mut self, item: FieldRule) -> Self {
        self.nested = Some(Nested::ItemsOf(Box::new(item)));
        self
    }

    /// Returns `true` if `value` has one of the accepted types.
    pub fn accepts(&self, value: &Value) -> bool {
        FieldType::of(value).is_some_and(|t| self.types.contains(&t))
    }

    /// Accepted types joined for display (`string | object`).
    pub fn expected_types(&self) -> String {
        self.types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn override_pattern_severity(&mut self, severity: Severity) {
        if self.pattern.is_some() {
            self.severity = severity;
        }
        match &mut self.nested {
            Some(Nested::MapOf(inner)) | Some(Nested::ItemsOf(inner)) => {
                inner.override_pattern_severity(severity);
            }
            Some(Nested::Fixed(_)) | None => {}
        }
    }
}

/// The ordered rules of one object shape.
#[derive(Debug, Clone)]
pub struct Schema {
    pub context: SchemaContext,
    pub rules: Vec<FieldRule>,
    pub unknown_keys: UnknownKeys,
}

impl Schema {
    pub fn new(context: SchemaContext, unknown_keys: UnknownKeys) -> Self {
        Self {
            context,
            rules: Vec::new(),
            unknown_keys,
        }
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns `true` if a rule is declared for `key`.
    pub fn declares(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.key == key)
    }
}

/// Rule model construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A rule refers to a context that has no schema.
    #[error("no schema registered for context: {}", .0.as_str())]
    MissingSchema(SchemaContext),
    /// Two schemas were registered for the same context.
    #[error("duplicate schema for context: {}", .0.as_str())]
    DuplicateSchema(SchemaContext),
}

/// An immutable set of object schemas rooted at one context.
///
/// Construction checks that every [`Nested::Fixed`] reference resolves, so
/// lookups through [`schema_for`](RuleModel::schema_for) cannot fail.
#[derive(Debug, Clone)]
pub struct RuleModel {
    root: SchemaContext,
    schemas: Vec<Schema>,
}

impl RuleModel {
    /// Builds a model from `schemas`, rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingSchema`] if the root or any referenced
    /// context is not among `schemas`, or [`ModelError::DuplicateSchema`] if a
    /// context appears twice.
    pub fn new(root: SchemaContext, schemas: Vec<Schema>) -> Result<Self, ModelError> {
        for (index, schema) in schemas.iter().enumerate() {
            if schemas[..index].iter().any(|s| s.context == schema.context) {
                return Err(ModelError::DuplicateSchema(schema.context));
            }
        }

        let registered = |context: SchemaContext| schemas.iter().any(|s| s.context == context);
        if !registered(root) {
            return Err(ModelError::MissingSchema(root));
        }
        for rule in schemas.iter().flat_map(|s| s.rules.iter()) {
            let mut current = Some(rule);
            while let Some(rule) = current {
                current = match &rule.nested {
                    Some(Nested::Fixed(context)) => {
                        if !registered(*context) {
                            return Err(ModelError::MissingSchema(*context));
                        }
                        None
                    }
                    Some(Nested::MapOf(inner)) | Some(Nested::ItemsOf(inner)) => {
                        Some(inner.as_ref())
                    }
                    None => None,
                };
            }
        }

        Ok(Self { root, schemas })
    }

    pub fn root(&self) -> SchemaContext {
        self.root
    }

    /// Returns the schema registered for `context`.
    ///
    /// # Panics
    ///
    /// Panics if `context` is not part of this model; every context referenced
    /// by the model's own rules is guaranteed to be present.
    pub fn schema_for(&self, context: SchemaContext) -> &Schema {
        self.schemas
            .iter()
            .find(|s| s.context == context)
            .unwrap_or_else(|| panic!("context {} is not part of this model", context.as_str()))
    }

    /// All schemas, root first when declared that way.
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns a copy in which every pattern rule carries `severity`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkg_manifest_core::{RuleModel, Severity};
    ///
    /// let strict = RuleModel::package_json().with_pattern_severity(Severity::Error);
    /// assert!(strict
    ///     .schemas()
    ///     .iter()
    ///     .flat_map(|s| s.rules.iter())
    ///     .filter(|r| r.pattern.is_some())
    ///     .all(|r| r.severity == Severity::Error));
    /// ```
    pub fn with_pattern_severity(&self, severity: Severity) -> Self {
        let mut model = self.clone();
        for rule in model.schemas.iter_mut().flat_map(|s| s.rules.iter_mut()) {
            rule.override_pattern_severity(severity);
        }
        model
    }
}
