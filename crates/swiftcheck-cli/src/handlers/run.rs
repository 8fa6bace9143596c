//! Run command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::RunArgs;
use std::sync::Arc;
use swiftcheck::{
    CaseRunner, Fixture, HarnessConfig, RunObserver, SuiteRun, TestCase, WaitPolicy, XlsxWriter,
};
use tracing::{info, warn};

/// Layer the run flags over the loaded configuration
pub fn apply_run_args(mut harness: HarnessConfig, args: &RunArgs) -> CliResult<HarnessConfig> {
    if let Some(ref url) = args.base_url {
        harness.base_url.clone_from(url);
    }
    if let Some(ref path) = args.chromium_path {
        harness.browser.chromium_path = Some(path.clone());
    }
    if args.headed {
        harness.browser.headless = false;
    }
    if args.no_sandbox {
        harness.browser.sandbox = false;
    }
    if args.stabilize {
        harness.wait.policy = WaitPolicy::Stabilize;
    }
    if let Some(ref dir) = args.output {
        harness.results_dir.clone_from(dir);
    }
    match args.workers {
        Some(0) => return Err(CliError::invalid_argument("--workers must be at least 1")),
        Some(n) => harness.workers = n,
        None => {}
    }
    Ok(harness)
}

/// Load the fixture and apply the run filters; cases come back in
/// execution order
pub fn select_cases(args: &RunArgs) -> CliResult<(Fixture, Vec<TestCase>)> {
    let fixture = Fixture::load(&args.fixture)?;
    let selected = fixture.filtered(args.filter.as_deref(), args.kind.map(Into::into));
    if selected.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no test cases in {} match the given filters",
            args.fixture.display()
        )));
    }
    let cases = selected.run_order().into_iter().cloned().collect();
    Ok((selected, cases))
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, harness: HarnessConfig, args: &RunArgs) -> CliResult<()> {
    let harness = apply_run_args(harness, args)?;
    let (fixture, cases) = select_cases(args)?;

    let mut progress = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    progress.breakdown(&fixture.breakdown());
    progress.header(&format!("Running against {}", harness.base_url));
    progress.start_progress(cases.len() as u64, "starting");
    let progress = Arc::new(progress);

    let workers = harness.worker_count();
    let runner = CaseRunner::new(harness, fixture.predefined());
    let observer: Arc<dyn RunObserver> = progress.clone();

    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CliError::test_execution(format!("Failed to create runtime: {e}"))
    })?;
    let run = rt.block_on(run_in_browser(&runner, &cases, workers, observer))?;
    progress.finish();

    let harness = runner.config();
    let SuiteRun { sink, reporter } = run;
    let records = sink.records().to_vec();
    let flushed = sink.flush(&XlsxWriter::new(), &harness.sink_paths())?;
    let report = match reporter.write(&harness.report_dir) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(error = %e, "run report not written");
            None
        }
    };

    progress.outputs(&flushed, report.as_deref(), &harness.screenshots_dir);
    progress.summary(&records, &reporter);

    let failed = reporter.failed_count();
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{failed} case(s) reported as failed"
        )))
    }
}

#[cfg(feature = "browser")]
async fn run_in_browser(
    runner: &CaseRunner,
    cases: &[TestCase],
    workers: usize,
    observer: Arc<dyn RunObserver>,
) -> CliResult<SuiteRun> {
    use swiftcheck::ChromiumBrowser;

    let browser = match ChromiumBrowser::launch(runner.config().browser.clone()).await {
        Ok(browser) => Arc::new(browser),
        Err(e) => {
            tracing::error!(error = %e, "browser launch failed, recording every case as an error");
            return Ok(CaseRunner::error_run(cases, &e, observer.as_ref()));
        }
    };
    info!(workers, cases = cases.len(), "browser launched");
    let run = runner
        .run_parallel(Arc::clone(&browser), cases, workers, observer)
        .await;

    match Arc::try_unwrap(browser) {
        Ok(browser) => {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser did not close cleanly");
            }
        }
        Err(_) => warn!("browser still referenced; leaving it to drop"),
    }
    Ok(run)
}

#[cfg(not(feature = "browser"))]
async fn run_in_browser(
    _runner: &CaseRunner,
    _cases: &[TestCase],
    _workers: usize,
    _observer: Arc<dyn RunObserver>,
) -> CliResult<SuiteRun> {
    info!("browser support not compiled in");
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}
