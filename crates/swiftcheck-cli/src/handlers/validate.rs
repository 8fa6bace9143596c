//! Validate command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;
use crate::ValidateArgs;
use swiftcheck::{Breakdown, Fixture};

/// Execute the validate command
pub fn execute_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<Breakdown> {
    let fixture = Fixture::load(&args.fixture)?;
    let breakdown = fixture.breakdown();

    let progress = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    progress.success(&format!(
        "{}: {} test cases, ids unique",
        args.fixture.display(),
        fixture.len()
    ));
    progress.breakdown(&breakdown);

    let missing: Vec<&str> = fixture
        .test_cases
        .iter()
        .filter(|c| c.expected_output.trim().is_empty())
        .map(|c| c.id.as_str())
        .collect();
    if !missing.is_empty() {
        progress.warning(&format!("no expected output: {}", missing.join(", ")));
    }
    Ok(breakdown)
}
