//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use swiftcheck::CaseType;

/// Default fixture location, relative to the working directory
pub const DEFAULT_FIXTURE: &str = "test-data/test-cases.json";

/// swiftcheck: end-to-end checks for the Singlish to Sinhala web translator
#[derive(Parser, Debug)]
#[command(name = "swiftcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Harness configuration file (YAML)
    #[arg(long, global = true, env = "SWIFTCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the translation suite against the live page
    Run(RunArgs),

    /// Check a fixture file and print its breakdown
    Validate(ValidateArgs),

    /// Rebuild the results spreadsheet from a JSON backup
    Report(ReportArgs),

    /// Print the effective harness configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Fixture file with test cases
    #[arg(long, default_value = DEFAULT_FIXTURE)]
    pub fixture: PathBuf,

    /// Only run cases whose id or description contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Only run cases of this type
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<CaseTypeArg>,

    /// Number of parallel pages
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Translator URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Chromium binary
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Poll until the output changes and settles instead of sleeping the
    /// full per-length time
    #[arg(long)]
    pub stabilize: bool,

    /// Directory for the results spreadsheet
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Fixture file with test cases
    #[arg(long, default_value = DEFAULT_FIXTURE)]
    pub fixture: PathBuf,
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// JSON backup written by a previous run
    #[arg(long)]
    pub from: PathBuf,

    /// Output directory (defaults to the configured results directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Ignore the config file and environment; print built-in defaults
    #[arg(long)]
    pub defaults: bool,
}

/// Case type filter
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseTypeArg {
    /// Valid input expected to translate
    Positive,
    /// Invalid input expected to be rejected
    Negative,
    /// UI behaviour checks
    Ui,
}

impl From<CaseTypeArg> for CaseType {
    fn from(arg: CaseTypeArg) -> Self {
        match arg {
            CaseTypeArg::Positive => Self::Positive,
            CaseTypeArg::Negative => Self::Negative,
            CaseTypeArg::Ui => Self::Ui,
        }
    }
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
