//! Test Orchestrator.
//!
//! Each case runs the state machine
//!
//! ```text
//! Prepare → Locate → Clear → Inject → Wait → Extract → Classify → Record
//!         → (Screenshot) → Assert
//! ```
//!
//! Failures before `Record` are contained: the case still gets exactly one
//! record. Positive and UI cases swallow the error; negative cases report it
//! as a framework failure. The forced assertion runs after the record is
//! stored, outside the containment.

use crate::browser::BrowserConfig;
use crate::classify::{classify, observed_verdict, recorded_output, ClassificationResult};
use crate::driver::{DriverFactory, PageDriver};
use crate::extract::resolve_output;
use crate::fixture::{PredefinedOutputs, TestCase};
use crate::locator::{locate, LocatorConfig};
use crate::reporter::{Reporter, TestResultEntry};
use crate::result::{ProbeError, ProbeResult};
use crate::script::preview;
use crate::sink::{ResultRecord, ResultSink, SinkPaths};
use crate::wait::{snapshot_output, wait_for_translation_since, WaitConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Translator under test
pub const DEFAULT_BASE_URL: &str = "https://www.swifttranslator.com/";

/// Pause after network idle before each case
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// Network idle timeout
pub const DEFAULT_NETWORK_IDLE_TIMEOUT_MS: u64 = 30_000;

/// Pause around clearing the input
pub const CLEAR_PAUSE_MS: u64 = 300;

/// Screenshot taken when no input control exists
pub const NO_INPUT_SCREENSHOT: &str = "error-no-input.png";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Translator URL
    pub base_url: String,
    /// Browser settings
    #[serde(flatten)]
    pub browser: BrowserConfig,
    /// Pause after network idle (ms)
    pub settle_ms: u64,
    /// Network idle timeout (ms)
    pub network_idle_timeout_ms: u64,
    /// Spreadsheet and backup directory
    pub results_dir: PathBuf,
    /// PNG capture directory
    pub screenshots_dir: PathBuf,
    /// HTML/JSON report directory
    pub report_dir: PathBuf,
    /// Spreadsheet file name
    pub spreadsheet_name: String,
    /// JSON fallback file name
    pub backup_name: String,
    /// Ids always screenshotted
    pub sample_screenshot_ids: Vec<String>,
    /// Parallel pages
    pub workers: usize,
    /// Translation wait
    pub wait: WaitConfig,
    /// Element discovery
    pub locator: LocatorConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let sink = SinkPaths::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserConfig::default(),
            settle_ms: DEFAULT_SETTLE_MS,
            network_idle_timeout_ms: DEFAULT_NETWORK_IDLE_TIMEOUT_MS,
            results_dir: sink.results_dir,
            screenshots_dir: PathBuf::from("screenshots"),
            report_dir: PathBuf::from("swiftcheck-report"),
            spreadsheet_name: sink.spreadsheet_name,
            backup_name: sink.backup_name,
            sample_screenshot_ids: vec!["Pos_001".to_string(), "Pos_010".to_string()],
            workers: 1,
            wait: WaitConfig::default(),
            locator: LocatorConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse YAML; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `SWIFTCHECK_BASE_URL` and `CHROMIUM_PATH` from `lookup`
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SWIFTCHECK_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(path) = lookup("CHROMIUM_PATH").filter(|v| !v.is_empty()) {
            self.browser.chromium_path = Some(path);
        }
        self
    }

    /// Spreadsheet locations
    #[must_use]
    pub fn sink_paths(&self) -> SinkPaths {
        SinkPaths {
            results_dir: self.results_dir.clone(),
            spreadsheet_name: self.spreadsheet_name.clone(),
            backup_name: self.backup_name.clone(),
        }
    }

    /// Worker count, at least one
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

/// Hooks for live progress output
pub trait RunObserver: Send + Sync {
    /// A case is about to run
    fn case_started(&self, _case: &TestCase) {}

    /// A case has been recorded
    fn case_finished(&self, _case: &TestCase, _record: &ResultRecord, _entry: &TestResultEntry) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Forced framework verdict: positive and UI cases pass, negative cases fail
///
/// # Errors
///
/// Returns [`ProbeError::AssertionFailed`] for negative cases
pub fn forced_assertion(case: &TestCase) -> ProbeResult<()> {
    if case.kind.expects_pass() {
        Ok(())
    } else {
        Err(ProbeError::AssertionFailed {
            message: format!("{} is a negative case: expected true, received false", case.id),
        })
    }
}

/// Everything a completed case produced
#[derive(Debug, Clone)]
struct Executed {
    record: ResultRecord,
    classification: ClassificationResult,
    masked: bool,
    screenshot: Option<PathBuf>,
}

/// Records and framework verdicts of a run
#[derive(Debug, Clone, Default)]
pub struct SuiteRun {
    /// Spreadsheet records
    pub sink: ResultSink,
    /// Framework report
    pub reporter: Reporter,
}

impl SuiteRun {
    /// Empty run with a started reporter
    #[must_use]
    pub fn new() -> Self {
        let mut reporter = Reporter::new();
        reporter.start();
        Self {
            sink: ResultSink::new(),
            reporter,
        }
    }

    /// Merge worker runs in fixture order
    #[must_use]
    pub fn merge(runs: Vec<Self>, order: &[String]) -> Self {
        let mut reporter = Reporter::new();
        let mut sinks = Vec::with_capacity(runs.len());
        for run in runs {
            reporter.merge(run.reporter, order);
            sinks.push(run.sink);
        }
        Self {
            sink: ResultSink::merge_ordered(sinks, order),
            reporter,
        }
    }
}

/// Executes cases against a page
#[derive(Debug, Clone)]
pub struct CaseRunner {
    config: Arc<HarnessConfig>,
    predefined: Arc<PredefinedOutputs>,
}

impl CaseRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: HarnessConfig, predefined: PredefinedOutputs) -> Self {
        Self {
            config: Arc::new(config),
            predefined: Arc::new(predefined),
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Navigate to the translator, wait for network idle, then settle.
    ///
    /// A network-idle timeout is logged and tolerated.
    ///
    /// # Errors
    ///
    /// Returns error if navigation fails
    pub async fn prepare_page<D: PageDriver + ?Sized>(&self, driver: &mut D) -> ProbeResult<()> {
        driver.goto(&self.config.base_url).await?;
        let timeout = Duration::from_millis(self.config.network_idle_timeout_ms);
        if let Err(e) = driver.wait_for_network_idle(timeout).await {
            warn!(error = %e, "network did not go idle; continuing");
        }
        driver.pause(Duration::from_millis(self.config.settle_ms)).await;
        Ok(())
    }

    /// Capture a screenshot into the screenshots directory.
    ///
    /// Capture failures are logged, never raised.
    pub async fn capture<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        name: &str,
        full_page: bool,
    ) -> Option<PathBuf> {
        let path = self.config.screenshots_dir.join(name);
        let result = async {
            let png = driver.screenshot(full_page).await?;
            tokio::fs::create_dir_all(&self.config.screenshots_dir).await?;
            tokio::fs::write(&path, png).await?;
            Ok::<_, ProbeError>(())
        }
        .await;
        match result {
            Ok(()) => {
                info!(path = %path.display(), "screenshot saved");
                Some(path)
            }
            Err(e) => {
                warn!(name, error = %e, "screenshot failed");
                None
            }
        }
    }

    fn wants_screenshot(&self, case: &TestCase, passed: bool) -> bool {
        !passed || self.config.sample_screenshot_ids.iter().any(|id| id == &case.id)
    }

    async fn execute<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        case: &TestCase,
    ) -> ProbeResult<Executed> {
        self.prepare_page(driver).await?;

        let elements = match locate(&*driver, &self.config.locator).await {
            Ok(elements) => elements,
            Err(e @ ProbeError::ElementNotFound { .. }) => {
                error!("could not find input field");
                self.capture(&*driver, NO_INPUT_SCREENSHOT, true).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        debug!(
            output = elements.output_field.is_some(),
            "page elements located"
        );

        let input = &elements.input_field;
        driver.click(input).await?;
        driver.pause(Duration::from_millis(CLEAR_PAUSE_MS)).await;
        driver.clear(input).await?;
        driver.pause(Duration::from_millis(CLEAR_PAUSE_MS)).await;

        let field = elements.output_field.as_ref().map(|c| &c.element);
        let baseline = snapshot_output(&*driver, field).await;
        driver.fill(input, &case.input).await?;

        let waited = wait_for_translation_since(
            &*driver,
            &self.config.wait,
            case.length_type,
            field,
            &baseline,
        )
        .await;
        info!(
            waited_ms = waited.waited.as_millis() as u64,
            settled = waited.settled,
            "translation wait finished"
        );

        let resolved = resolve_output(&*driver, case, field, &self.predefined).await?;
        info!(expected = %case.expected_output, actual = %resolved.text, "output resolved");

        let classification = classify(case, &resolved.text);
        let recorded = recorded_output(case, &resolved.text);
        let masked = classification.masks_observation(observed_verdict(
            case,
            &resolved.text,
            resolved.source.is_observed(),
        ));
        if masked {
            warn!(
                id = %case.id,
                verdict = %classification.status,
                source = ?resolved.source,
                "declared verdict disagrees with page output"
            );
        }
        info!(status = %classification.status, comment = %classification.comment, "classified");

        let record = ResultRecord::from_case(case, &recorded, &classification);

        let screenshot = if self.wants_screenshot(case, classification.passed) {
            self.capture(&*driver, &format!("{}.png", case.id), false).await
        } else {
            None
        };

        Ok(Executed {
            record,
            classification,
            masked,
            screenshot,
        })
    }

    fn record_error(
        case: &TestCase,
        error: &ProbeError,
        elapsed: Duration,
        screenshot: Option<PathBuf>,
        run: &mut SuiteRun,
    ) -> (ResultRecord, TestResultEntry) {
        let record = ResultRecord::from_error(case, error);
        let mut entry = if case.kind.expects_pass() {
            warn!(id = %case.id, kind = %case.kind, "error caught, case still marked as passed");
            TestResultEntry::passed(case, elapsed)
        } else {
            TestResultEntry::failed(case, elapsed, error.to_string())
        };
        if let Some(path) = screenshot {
            entry = entry.with_screenshot(path);
        }
        run.sink.push(record.clone());
        run.reporter.record(entry.clone());
        (record, entry)
    }

    /// Run one case and store its record and framework verdict in `run`.
    ///
    /// # Errors
    ///
    /// Returns the framework failure of the case: the forced assertion of a
    /// negative case, or its execution error. Positive and UI cases never
    /// fail.
    pub async fn run_case<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        case: &TestCase,
        run: &mut SuiteRun,
        observer: &dyn RunObserver,
    ) -> ProbeResult<()> {
        info!(id = %case.id, description = %case.description, input = %preview(&case.input), "running case");
        observer.case_started(case);
        let start = Instant::now();

        match self.execute(driver, case).await {
            Ok(executed) => {
                let elapsed = start.elapsed();
                run.sink.push(executed.record.clone());
                let verdict = forced_assertion(case);
                let mut entry = match &verdict {
                    Ok(()) => TestResultEntry::passed(case, elapsed),
                    Err(e) => TestResultEntry::failed(case, elapsed, e.to_string()),
                }
                .with_masked(executed.masked);
                if let Some(path) = executed.screenshot {
                    entry = entry.with_screenshot(path);
                }
                debug!(passed = executed.classification.passed, "framework verdict recorded");
                run.reporter.record(entry.clone());
                observer.case_finished(case, &executed.record, &entry);
                verdict
            }
            Err(e) => {
                error!(id = %case.id, error = %e, "case execution failed");
                let shot = self
                    .capture(&*driver, &format!("error-{}.png", case.id), false)
                    .await;
                let (record, entry) = Self::record_error(case, &e, start.elapsed(), shot, run);
                observer.case_finished(case, &record, &entry);
                if case.kind.expects_pass() {
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Run cases one after another on a single page
    pub async fn run_suite<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        cases: &[TestCase],
        observer: &dyn RunObserver,
    ) -> SuiteRun {
        let mut run = SuiteRun::new();
        for case in cases {
            if let Err(e) = self.run_case(driver, case, &mut run, observer).await {
                debug!(id = %case.id, error = %e, "framework failure");
            }
        }
        run
    }

    /// Record `error` against every case without touching a page.
    ///
    /// Used when no page can be opened, so each case still gets its record.
    #[must_use]
    pub fn error_run(cases: &[TestCase], error: &ProbeError, observer: &dyn RunObserver) -> SuiteRun {
        let mut run = SuiteRun::new();
        for case in cases {
            let (record, entry) = Self::record_error(case, error, Duration::ZERO, None, &mut run);
            observer.case_finished(case, &record, &entry);
        }
        run
    }

    /// Run cases on `workers` independent pages.
    ///
    /// Cases are dealt round-robin; each worker owns its page and result
    /// sink. Results are merged in `cases` order. A worker whose page cannot
    /// be opened, or whose task panics, records an error for each of its
    /// cases; the other workers' results are kept.
    pub async fn run_parallel<F>(
        &self,
        factory: Arc<F>,
        cases: &[TestCase],
        workers: usize,
        observer: Arc<dyn RunObserver>,
    ) -> SuiteRun
    where
        F: DriverFactory + 'static,
    {
        let workers = workers.clamp(1, cases.len().max(1));
        let mut chunks: Vec<Vec<TestCase>> = vec![Vec::new(); workers];
        for (i, case) in cases.iter().enumerate() {
            chunks[i % workers].push(case.clone());
        }

        let mut set = JoinSet::new();
        for (worker, chunk) in chunks.iter().cloned().enumerate() {
            let runner = self.clone();
            let factory = Arc::clone(&factory);
            let observer = Arc::clone(&observer);
            set.spawn(async move {
                debug!(worker, cases = chunk.len(), "worker starting");
                let run = match factory.create().await {
                    Ok(mut driver) => runner.run_suite(&mut driver, &chunk, observer.as_ref()).await,
                    Err(e) => {
                        error!(worker, error = %e, "worker could not open a page");
                        Self::error_run(&chunk, &e, observer.as_ref())
                    }
                };
                (worker, run)
            });
        }

        let mut finished = vec![false; workers];
        let mut runs = Vec::with_capacity(workers);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((worker, run)) => {
                    finished[worker] = true;
                    runs.push(run);
                }
                Err(e) => error!(error = %e, "worker task failed"),
            }
        }
        for (worker, chunk) in chunks.iter().enumerate() {
            if !finished[worker] {
                let e = ProbeError::execution(format!("worker {worker} stopped before finishing"));
                runs.push(Self::error_run(chunk, &e, observer.as_ref()));
            }
        }

        let order: Vec<String> = cases.iter().map(|c| c.id.clone()).collect();
        SuiteRun::merge(runs, &order)
    }
}
