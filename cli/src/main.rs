use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pkg_manifest_core::{
    FieldRule, MemoryLogger, Nested, RuleModel, TracingLogger, UnknownKeys, ViolationKind,
    regex_literal,
};
use pkg_manifest_loader::{CheckConfig, LoadedManifest, LoaderError, check_manifest};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "pkg-manifest")]
#[command(about = "Validate a package manifest before a build pipeline trusts it")]
struct Cli {
    /// Enable verbose (debug) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find the nearest manifest and validate it.
    Check(CheckArgs),
    /// Print the built-in rule model.
    Schema(SchemaArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Directory the manifest lookup starts from.
    #[arg(long, default_value = ".")]
    cwd: PathBuf,
    /// Configuration file (default: nearest .pkg-manifest.yml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Treat regex mismatches as fatal.
    #[arg(long)]
    strict: bool,
    /// Print a JSON report instead of log lines.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Output the rule model as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Schema(args) => run_schema(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PKG_MANIFEST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// check command
// ---------------------------------------------------------------------------

/// Machine-readable outcome of `check --json`.
#[derive(Debug, Serialize)]
struct CheckReport {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<PathBuf>,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ReportError>,
}

#[derive(Debug, Serialize)]
struct ReportError {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ViolationKind>,
    message: String,
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => CheckConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => CheckConfig::discover(&args.cwd).map_err(|err| err.to_string())?,
    };
    if args.strict {
        config.strict_patterns = true;
    }
    debug!(manifest = %config.manifest, strict = config.strict_patterns, "Checking manifest");

    if args.json {
        let logger = MemoryLogger::new();
        let outcome = check_manifest(&args.cwd, &config, &logger);
        let report = build_report(&outcome, &logger);
        let raw = serde_json::to_string_pretty(&report)
            .map_err(|err| format!("Failed to serialize report: {err}"))?;
        println!("{raw}");
        return outcome.map(|_| ()).map_err(|err| err.to_string());
    }

    let loaded = check_manifest(&args.cwd, &config, &TracingLogger).map_err(|err| err.to_string())?;
    println!(
        "Validated '{}' ({}@{}).",
        loaded.path.display(),
        text_field(&loaded.pkg, "name"),
        text_field(&loaded.pkg, "version"),
    );
    Ok(())
}

fn build_report(outcome: &Result<LoadedManifest, LoaderError>, logger: &MemoryLogger) -> CheckReport {
    let warnings = logger.warnings();
    match outcome {
        Ok(loaded) => CheckReport {
            valid: true,
            manifest: Some(loaded.path.clone()),
            warnings,
            error: None,
        },
        Err(err) => CheckReport {
            valid: false,
            manifest: None,
            warnings,
            error: Some(ReportError {
                kind: match err {
                    LoaderError::Invalid(invalid) => Some(invalid.kind()),
                    _ => None,
                },
                message: err.to_string(),
            }),
        },
    }
}

fn text_field<'a>(pkg: &'a Value, key: &str) -> &'a str {
    pkg.get(key).and_then(Value::as_str).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// schema command
// ---------------------------------------------------------------------------

fn run_schema(args: SchemaArgs) -> Result<(), String> {
    let model = RuleModel::package_json();

    if args.json {
        let schemas: Vec<Value> = model
            .schemas()
            .iter()
            .map(|schema| {
                json!({
                    "context": schema.context,
                    "unknown_keys": schema.unknown_keys,
                    "rules": schema.rules.iter().map(rule_json).collect::<Vec<_>>(),
                })
            })
            .collect();
        let raw = serde_json::to_string_pretty(&json!({ "root": model.root(), "schemas": schemas }))
            .map_err(|err| format!("Failed to serialize rule model: {err}"))?;
        println!("{raw}");
        return Ok(());
    }

    for schema in model.schemas() {
        println!(
            "[{}] unknown keys: {}",
            schema.context.as_str(),
            match schema.unknown_keys {
                UnknownKeys::Allow => "allow",
                UnknownKeys::Warn => "warn",
            }
        );
        for rule in &schema.rules {
            println!("  {}", describe_rule(rule));
        }
    }
    Ok(())
}

fn rule_json(rule: &FieldRule) -> Value {
    let nested = match &rule.nested {
        Some(Nested::Fixed(context)) => json!({ "fixed": context }),
        Some(Nested::MapOf(entry)) => json!({ "map_of": rule_json(entry) }),
        Some(Nested::ItemsOf(item)) => json!({ "items_of": rule_json(item) }),
        None => Value::Null,
    };
    json!({
        "key": rule.key,
        "types": rule.types,
        "required": rule.required,
        "severity": rule.severity,
        "pattern": rule.pattern.as_ref().map(|p| p.as_str()),
        "enum": rule.allowed,
        "nested": nested,
    })
}

fn describe_rule(rule: &FieldRule) -> String {
    let mut line = if rule.key.is_empty() {
        format!("<value>: {}", rule.expected_types())
    } else {
        format!("{}: {}", rule.key, rule.expected_types())
    };
    line.push_str(if rule.required { ", required" } else { ", optional" });
    if let Some(pattern) = &rule.pattern {
        line.push_str(&format!(
            ", matches {} ({:?})",
            regex_literal(pattern.as_str()),
            rule.severity
        ));
    }
    if let Some(allowed) = &rule.allowed {
        let values: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
        line.push_str(&format!(", one of [{}]", values.join(", ")));
    }
    match &rule.nested {
        Some(Nested::Fixed(context)) => line.push_str(&format!(" -> [{}]", context.as_str())),
        Some(Nested::MapOf(entry)) => line.push_str(&format!(" -> map of ({})", describe_rule(entry))),
        Some(Nested::ItemsOf(item)) => line.push_str(&format!(" -> items ({})", describe_rule(item))),
        None => {}
    }
    line
}
