//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use swiftcheck::{
    Breakdown, FlushOutcome, Reporter, ResultRecord, RunObserver, Status, TestCase,
    TestResultEntry,
};

/// Plain-text lines describing a suite's composition
#[must_use]
pub fn breakdown_lines(breakdown: &Breakdown) -> Vec<String> {
    vec![
        format!("Positive tests: {}", breakdown.positive),
        format!("Negative tests: {}", breakdown.negative),
        format!("UI tests:       {}", breakdown.ui),
        format!("Total:          {}", breakdown.total()),
        format!(
            "Expected: {} pass, {} fail",
            breakdown.expected_passing(),
            breakdown.expected_failing()
        ),
    ]
}

/// One line per finished case, without styling
#[must_use]
pub fn case_line(record: &ResultRecord, entry: &TestResultEntry) -> String {
    let mut line = format!(
        "{} [{}] {} ({} ms)",
        record.id, record.status, record.comments, entry.duration_ms
    );
    if entry.masked {
        line.push_str(" [declared verdict differs from page]");
    }
    line
}

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message("Done");
        }
    }

    fn write_line(&self, line: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_finished() => pb.println(line),
            _ => {
                let _ = self.term.write_line(line);
            }
        }
    }

    fn prefixed(&self, symbol: &str, plain: &str, color: Style, message: &str) {
        let prefix = if self.use_color {
            color.bold().apply_to(symbol).to_string()
        } else {
            plain.to_string()
        };
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("✓", "PASS", Style::new().green(), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("✗", "FAIL", Style::new().red(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("⚠", "WARN", Style::new().yellow(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.prefixed("ℹ", "INFO", Style::new().blue(), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.write_line("");
        self.write_line(&styled);
    }

    /// Print the suite composition
    pub fn breakdown(&self, breakdown: &Breakdown) {
        if self.quiet {
            return;
        }
        self.header("Test Case Breakdown");
        for line in breakdown_lines(breakdown) {
            self.write_line(&format!("  {line}"));
        }
    }

    /// Print where the run's artifacts went
    pub fn outputs(&self, flushed: &FlushOutcome, report: Option<&Path>, screenshots: &Path) {
        if self.quiet {
            return;
        }
        self.header("Output Files");
        match flushed {
            FlushOutcome::Spreadsheet { path, rows } => {
                self.success(&format!("Results: {} ({rows} rows)", path.display()));
            }
            FlushOutcome::Backup { path, rows, error } => {
                self.warning(&format!("Spreadsheet not written: {error}"));
                self.warning(&format!("Backup: {} ({rows} rows)", path.display()));
            }
        }
        if let Some(report) = report {
            self.info(&format!("Report: {}", report.display()));
        }
        self.info(&format!("Screenshots: {}/", screenshots.display()));
    }

    /// Print the final tally
    pub fn summary(&self, records: &[ResultRecord], reporter: &Reporter) {
        if self.quiet {
            return;
        }

        let pass = records.iter().filter(|r| r.status == Status::Pass).count();
        let fail = records.len() - pass;
        let masked = reporter.masked_count();
        let duration: Duration = reporter.total_duration();

        self.write_line("");
        let line = format!(
            "{} cases in {:.2}s: {pass} Pass, {fail} Fail ({})",
            records.len(),
            duration.as_secs_f64(),
            reporter.summary()
        );
        if self.use_color {
            self.write_line(&Style::new().bold().apply_to(line).to_string());
        } else {
            self.write_line(&line);
        }
        if masked > 0 {
            self.warning(&format!(
                "{masked} case(s) were recorded against what the page showed"
            ));
        }
    }
}

impl RunObserver for ProgressReporter {
    fn case_started(&self, case: &TestCase) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(case.id.clone());
        }
    }

    fn case_finished(&self, _case: &TestCase, record: &ResultRecord, entry: &TestResultEntry) {
        let line = case_line(record, entry);
        match record.status {
            Status::Pass => self.success(&line),
            Status::Fail => self.failure(&line),
        }
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }
}
