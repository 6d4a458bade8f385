//! Manifest loading for the package manifest checker.
//!
//! This crate is the I/O side of the pipeline that feeds
//! [`pkg_manifest_core`]: it finds the nearest manifest upward from a working
//! directory, parses it (reporting JSON syntax errors as positioned
//! [`Diagnostic`]s), reads the checker's YAML [`CheckConfig`], and runs the
//! load-then-validate pipeline.
//!
//! # Quick start
//!
//! ```no_run
//! use pkg_manifest_core::TracingLogger;
//! use pkg_manifest_loader::{CheckConfig, LoaderError, check_manifest};
//!
//! let config = CheckConfig::discover(".").unwrap();
//! match check_manifest(".", &config, &TracingLogger) {
//!     Ok(loaded) => println!("{} is valid", loaded.path.display()),
//!     Err(LoaderError::Invalid(err)) => eprintln!("invalid manifest: {err}"),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

mod config;
mod diagnostic;
mod error;
mod loader;

pub use config::CheckConfig;
pub use diagnostic::{Diagnostic, DiagnosticCategory, Location, print_diagnostic};
pub use error::{LoaderError, Result};
pub use loader::{LoadedManifest, check_manifest, find_manifest, load_manifest, load_pkg};
