//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains the execution logic for one subcommand
//! plus the pure helpers it is built from.

pub mod config;
pub mod report;
pub mod run;
pub mod validate;

pub use config::execute_config;
pub use report::execute_report;
pub use run::{apply_run_args, execute_run, select_cases};
pub use validate::execute_validate;
