//! Built-in rule model for `package.json`.

use std::sync::LazyLock;

use regex::Regex;

use crate::{FieldRule, FieldType, RuleModel, Schema, SchemaContext, UnknownKeys};

/// File name of the manifest described by [`RuleModel::package_json`].
pub const PACKAGE_JSON: &str = "package.json";

static PACKAGE_JSON_MODEL: LazyLock<RuleModel> = LazyLock::new(|| {
    RuleModel::new(
        SchemaContext::Package,
        vec![
            package_schema(),
            export_entry_schema(),
            browser_target_schema(),
            node_target_schema(),
            person_schema(),
        ],
    )
    .expect("built-in package.json model must be complete")
});

impl RuleModel {
    /// The `package.json` model, built once per process.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkg_manifest_core::{RuleModel, SchemaContext};
    ///
    /// let model = RuleModel::package_json();
    /// let root = model.schema_for(SchemaContext::Package);
    /// assert_eq!(root.rules[0].key, "name");
    /// assert!(root.rules[0].required);
    /// ```
    pub fn package_json() -> &'static RuleModel {
        &PACKAGE_JSON_MODEL
    }
}

fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex must compile")
}

fn package_schema() -> Schema {
    // Shorthand form of an export entry points straight at a JSON file.
    let export_entry = FieldRule::value(FieldType::String)
        .or(FieldType::Object)
        .pattern(static_regex(r"^\./.*\.json$"))
        .fixed(SchemaContext::ExportEntry);

    Schema::new(SchemaContext::Package, UnknownKeys::Allow)
        .rule(FieldRule::string("name").required())
        .rule(FieldRule::string("version").required())
        .rule(FieldRule::string("description"))
        .rule(
            FieldRule::string("author")
                .or(FieldType::Object)
                .fixed(SchemaContext::Person),
        )
        .rule(FieldRule::string("type").one_of(["commonjs", "module"]))
        .rule(FieldRule::string("license"))
        .rule(
            FieldRule::string("bin")
                .or(FieldType::Object)
                .map_of(FieldRule::value(FieldType::String)),
        )
        .rule(FieldRule::string("main"))
        .rule(FieldRule::string("module"))
        .rule(FieldRule::string("source"))
        .rule(FieldRule::string("types"))
        .rule(FieldRule::object("exports").map_of(export_entry))
        .rule(FieldRule::array("files").items_of(FieldRule::value(FieldType::String)))
        .rule(FieldRule::object("scripts"))
        .rule(FieldRule::object("dependencies"))
        .rule(FieldRule::object("devDependencies"))
        .rule(FieldRule::object("peerDependencies"))
        .rule(FieldRule::object("engines"))
        .rule(FieldRule::array("browserslist").items_of(FieldRule::value(FieldType::String)))
}

fn export_entry_schema() -> Schema {
    Schema::new(SchemaContext::ExportEntry, UnknownKeys::Warn)
        .rule(FieldRule::string("types"))
        .rule(FieldRule::string("source").required())
        .rule(FieldRule::object("browser").fixed(SchemaContext::BrowserTarget))
        .rule(FieldRule::object("node").fixed(SchemaContext::NodeTarget))
        .rule(FieldRule::string("module"))
        .rule(FieldRule::string("import"))
        .rule(FieldRule::string("require"))
        .rule(
            FieldRule::string("default")
                .required()
                .pattern(static_regex(r"^\./.*$")),
        )
}

fn browser_target_schema() -> Schema {
    Schema::new(SchemaContext::BrowserTarget, UnknownKeys::Warn)
        .rule(FieldRule::string("source").required())
        .rule(FieldRule::string("import"))
        .rule(FieldRule::string("require"))
}

fn node_target_schema() -> Schema {
    Schema::new(SchemaContext::NodeTarget, UnknownKeys::Warn)
        .rule(FieldRule::string("source"))
        .rule(FieldRule::string("module"))
        .rule(FieldRule::string("import"))
        .rule(FieldRule::string("require"))
}

fn person_schema() -> Schema {
    Schema::new(SchemaContext::Person, UnknownKeys::Warn)
        .rule(FieldRule::string("name").required())
        .rule(FieldRule::string("email"))
        .rule(FieldRule::string("url"))
}
