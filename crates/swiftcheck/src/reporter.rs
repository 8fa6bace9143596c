//! Reporter - per-case framework verdicts rendered as HTML and JSON.
//!
//! Every case yields one [`TestResultEntry`] titled
//! `Positive Test: <id> - <description>` or `Negative Test: ...`. The
//! verdict is the forced assertion, so negative cases always show as failed
//! here. The reporter collects everything; a failed entry never stops the
//! run.

use crate::fixture::TestCase;
use crate::result::ProbeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTML report file name
pub const HTML_REPORT: &str = "index.html";

/// JSON report file name
pub const JSON_REPORT: &str = "test-results.json";

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Individual test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultEntry {
    /// Case id
    pub case_id: String,
    /// Test title
    pub name: String,
    /// Test status
    pub status: TestStatus,
    /// Duration of test execution in milliseconds
    pub duration_ms: u64,
    /// Error message if failed
    pub error: Option<String>,
    /// Screenshot captured for the case
    pub screenshot: Option<PathBuf>,
    /// Declared verdict disagrees with what the page showed
    #[serde(default)]
    pub masked: bool,
    /// Timestamp when test completed
    pub timestamp: DateTime<Utc>,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl TestResultEntry {
    /// Create a passing test result
    #[must_use]
    pub fn passed(case: &TestCase, duration: Duration) -> Self {
        Self {
            case_id: case.id.clone(),
            name: case.title(),
            status: TestStatus::Passed,
            duration_ms: millis(duration),
            error: None,
            screenshot: None,
            masked: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a failing test result
    #[must_use]
    pub fn failed(case: &TestCase, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Failed,
            error: Some(error.into()),
            ..Self::passed(case, duration)
        }
    }

    /// Attach a screenshot
    #[must_use]
    pub fn with_screenshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshot = Some(path.into());
        self
    }

    /// Mark the verdict as masking the observation
    #[must_use]
    pub const fn with_masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }
}

/// Test run report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    /// Suite name
    suite_name: String,
    /// Start time
    start_time: Option<DateTime<Utc>>,
    /// Test results
    results: Vec<TestResultEntry>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Create new reporter
    #[must_use]
    pub fn new() -> Self {
        Self {
            suite_name: "Translation Tests".to_string(),
            start_time: None,
            results: Vec::new(),
        }
    }

    /// Start the test suite
    pub fn start(&mut self) {
        self.start_time = Some(Utc::now());
    }

    /// Record a test result
    pub fn record(&mut self, result: TestResultEntry) {
        self.results.push(result);
    }

    /// Fold a worker's reporter into this one and order entries by
    /// position in `order`
    pub fn merge(&mut self, other: Self, order: &[String]) {
        if self.start_time.is_none() {
            self.start_time = other.start_time;
        }
        self.results.extend(other.results);
        let rank: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        self.results
            .sort_by_key(|r| rank.get(r.case_id.as_str()).copied().unwrap_or(usize::MAX));
    }

    /// Get number of passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Get number of failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Number of verdicts that disagree with the page
    #[must_use]
    pub fn masked_count(&self) -> usize {
        self.results.iter().filter(|r| r.masked).count()
    }

    /// Get total test count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Get pass rate (0.0 to 1.0)
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 1.0;
        }
        self.passed_count() as f64 / self.results.len() as f64
    }

    /// Get total duration
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.results.iter().map(|r| r.duration_ms).sum())
    }

    /// Get test results
    #[must_use]
    pub fn results(&self) -> &[TestResultEntry] {
        &self.results
    }

    /// Get failing tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResultEntry> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%)",
            self.suite_name,
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0
        )
    }

    /// Write `index.html` and `test-results.json` into `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the directory or files cannot be written
    pub fn write(&self, dir: &Path) -> ProbeResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let html_path = dir.join(HTML_REPORT);
        std::fs::write(&html_path, self.render_html(dir))?;
        std::fs::write(dir.join(JSON_REPORT), self.render_json()?)?;
        Ok(html_path)
    }

    /// Render JSON report content
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn render_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render HTML report content for a page stored in `report_dir`
    #[must_use]
    pub fn render_html(&self, report_dir: &Path) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>swiftcheck Test Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .progress-bar { background: #ddd; height: 20px; border-radius: 10px; overflow: hidden; }
        .passed { background: #4caf50; height: 100%; }
        .test { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .test.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .test.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .masked { color: #e65100; font-size: 0.9em; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
    </style>
</head>
<body>
"#,
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>Results: {}/{} passed ({:.1}%)</h2>
    <div class="progress-bar">
        <div class="passed" style="width: {:.1}%"></div>
    </div>
    <p>Duration: {:.2}s</p>
    <p>Verdicts not backed by page output: {}</p>
</div>
"#,
            escape_html(&self.suite_name),
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0,
            self.pass_rate() * 100.0,
            self.total_duration().as_secs_f64(),
            self.masked_count()
        );

        html.push_str("<h2>Test Results</h2>\n");
        for result in &self.results {
            let class = if result.status.is_passed() {
                "pass"
            } else {
                "fail"
            };
            let label = if result.status.is_passed() {
                "&#10003;"
            } else {
                "&#10007;"
            };

            let _ = writeln!(
                html,
                r#"<div class="test {class}">
    {label} <strong>{}</strong> ({} ms)"#,
                escape_html(&result.name),
                result.duration_ms
            );

            if result.masked {
                html.push_str(
                    r#"    <div class="masked">verdict forced by case type; page output disagrees</div>
"#,
                );
            }

            if let Some(error) = &result.error {
                let _ = writeln!(html, r#"    <div class="error">{}</div>"#, escape_html(error));
            }

            if let Some(shot) = &result.screenshot {
                let _ = writeln!(
                    html,
                    r#"    <div><a href="{0}">{0}</a></div>"#,
                    escape_html(&screenshot_href(shot, report_dir))
                );
            }

            html.push_str("</div>\n");
        }

        html.push_str(
            r"
<footer>
    <p>Generated by swiftcheck</p>
</footer>
</body>
</html>
",
        );

        html
    }
}

/// Link to a screenshot from a page in `report_dir`: relative when the file
/// sits under the report directory, absolute otherwise.
fn screenshot_href(shot: &Path, report_dir: &Path) -> String {
    let absolute = |p: &Path| match std::env::current_dir() {
        Ok(cwd) if p.is_relative() => cwd.join(p),
        _ => p.to_path_buf(),
    };
    let shot = absolute(shot);
    let target = shot.strip_prefix(absolute(report_dir)).unwrap_or(&shot);
    target.to_string_lossy().replace('\\', "/")
}

/// Escape HTML special characters
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixture::CaseType;
    use tempfile::TempDir;

    fn pos(id: &str) -> TestCase {
        TestCase::new(id, CaseType::Positive, "mama", "මම").with_description("Simple sentence")
    }

    fn neg(id: &str) -> TestCase {
        TestCase::new(id, CaseType::Negative, "<b>", "").with_description("Markup <input>")
    }

    mod entry_tests {
        use super::*;

        #[test]
        fn test_passed_entry_title() {
            let e = TestResultEntry::passed(&pos("Pos_001"), Duration::from_millis(1200));
            assert_eq!(e.name, "Positive Test: Pos_001 - Simple sentence");
            assert_eq!(e.duration_ms, 1200);
            assert!(e.status.is_passed());
        }

        #[test]
        fn test_failed_entry() {
            let e = TestResultEntry::failed(&neg("Neg_001"), Duration::ZERO, "forced failure")
                .with_screenshot("screenshots/Neg_001.png");
            assert!(e.status.is_failed());
            assert_eq!(e.error.as_deref(), Some("forced failure"));
            assert!(e.name.starts_with("Negative Test: Neg_001"));
            assert!(e.screenshot.is_some());
        }
    }

    mod reporter_tests {
        use super::*;

        fn sample() -> Reporter {
            let mut r = Reporter::new();
            r.start();
            r.record(TestResultEntry::passed(&pos("Pos_001"), Duration::from_millis(100)));
            r.record(
                TestResultEntry::failed(&neg("Neg_001"), Duration::from_millis(50), "forced")
                    .with_masked(true),
            );
            r
        }

        #[test]
        fn test_counts() {
            let r = sample();
            assert_eq!(r.passed_count(), 1);
            assert_eq!(r.failed_count(), 1);
            assert_eq!(r.masked_count(), 1);
            assert_eq!(r.total_duration(), Duration::from_millis(150));
            assert_eq!(r.failures().len(), 1);
        }

        #[test]
        fn test_summary() {
            assert_eq!(sample().summary(), "Translation Tests: 1/2 passed (50.0%)");
        }

        #[test]
        fn test_pass_rate_empty() {
            assert!((Reporter::new().pass_rate() - 1.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_html_escapes_titles() {
            let html = sample().render_html(Path::new("report"));
            assert!(html.contains("Markup &lt;input&gt;"));
            assert!(!html.contains("<input>"));
            assert!(html.contains(r#"class="test fail""#));
        }

        #[test]
        fn test_screenshot_link_inside_report_dir_is_relative() {
            let dir = TempDir::new().unwrap();
            let shot = dir.path().join("screenshots/Neg_001.png");
            assert_eq!(screenshot_href(&shot, dir.path()), "screenshots/Neg_001.png");
        }

        #[test]
        fn test_screenshot_link_outside_report_dir_is_absolute() {
            let dir = TempDir::new().unwrap();
            let mut r = Reporter::new();
            r.record(
                TestResultEntry::failed(&neg("Neg_001"), Duration::ZERO, "forced")
                    .with_screenshot("screenshots/Neg_001.png"),
            );
            let html = r.render_html(&dir.path().join("report"));
            let expected = std::env::current_dir()
                .unwrap()
                .join("screenshots/Neg_001.png");
            let expected = expected.to_string_lossy().replace('\\', "/");
            assert!(html.contains(&format!(r#"href="{}""#, escape_html(&expected))));
        }

        #[test]
        fn test_merge_orders_by_fixture() {
            let mut a = Reporter::new();
            a.record(TestResultEntry::passed(&pos("Pos_002"), Duration::ZERO));
            let mut b = Reporter::new();
            b.record(TestResultEntry::passed(&pos("Pos_001"), Duration::ZERO));
            let order = vec!["Pos_001".to_string(), "Pos_002".to_string()];
            a.merge(b, &order);
            let ids: Vec<_> = a.results().iter().map(|r| r.case_id.as_str()).collect();
            assert_eq!(ids, vec!["Pos_001", "Pos_002"]);
        }

        #[test]
        fn test_write_creates_both_files() {
            let dir = TempDir::new().unwrap();
            let out = dir.path().join("report");
            let html = sample().write(&out).unwrap();
            assert!(html.ends_with(HTML_REPORT));
            let json = std::fs::read_to_string(out.join(JSON_REPORT)).unwrap();
            let parsed: Reporter = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed.total_count(), 2);
        }
    }
}
