//! Report command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::ReportArgs;
use swiftcheck::{FlushOutcome, HarnessConfig, ResultSink, SinkPaths, XlsxWriter};

/// Where the rebuilt spreadsheet goes
#[must_use]
pub fn report_paths(harness: &HarnessConfig, args: &ReportArgs) -> SinkPaths {
    let mut paths = harness.sink_paths();
    if let Some(ref dir) = args.output {
        paths.results_dir.clone_from(dir);
    }
    paths
}

/// Execute the report command
pub fn execute_report(
    config: &CliConfig,
    harness: &HarnessConfig,
    args: &ReportArgs,
) -> CliResult<FlushOutcome> {
    let sink = ResultSink::load_backup(&args.from).map_err(|e| {
        CliError::report_generation(format!("{}: {e}", args.from.display()))
    })?;
    if sink.is_empty() {
        return Err(CliError::report_generation(format!(
            "{} holds no records",
            args.from.display()
        )));
    }

    let flushed = sink.flush(&XlsxWriter::new(), &report_paths(harness, args))?;
    let progress = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    match flushed {
        FlushOutcome::Spreadsheet { ref path, rows } => {
            progress.success(&format!("Spreadsheet written: {} ({rows} rows)", path.display()));
            Ok(flushed)
        }
        FlushOutcome::Backup { ref error, .. } => Err(CliError::report_generation(error.clone())),
    }
}
