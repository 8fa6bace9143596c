//! swiftcheck CLI: end-to-end checks for the Singlish to Sinhala translator
//!
//! ## Usage
//!
//! ```bash
//! swiftcheck validate                      # Check the fixture
//! swiftcheck run                           # Run every case
//! swiftcheck run --type negative -j 2      # Negative cases on two pages
//! swiftcheck report --from results/test-results-backup.json
//! swiftcheck config                        # Effective configuration
//! ```

use clap::Parser;
use std::process::ExitCode;
use swiftcheck_cli::{
    handlers, load_harness_config, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_tracing(&config);

    let harness = load_harness_config(cli.config.as_deref(), |key| std::env::var(key).ok())?;

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, harness, &args),
        Commands::Validate(args) => handlers::execute_validate(&config, &args).map(|_| ()),
        Commands::Report(args) => handlers::execute_report(&config, &harness, &args).map(|_| ()),
        Commands::Config(args) => handlers::execute_config(&harness, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_json(cli.log_json)
}

/// `RUST_LOG` wins; otherwise the level follows `-q` / `-v`
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(config.color.should_color()).init();
    }
}
