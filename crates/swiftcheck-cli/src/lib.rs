//! swiftcheck CLI library
//!
//! Command-line interface for the swiftcheck translator harness.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    CaseTypeArg, Cli, ColorArg, Commands, ConfigArgs, ReportArgs, RunArgs, ValidateArgs,
    DEFAULT_FIXTURE,
};
pub use config::{load_harness_config, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{breakdown_lines, case_line, ProgressReporter};
