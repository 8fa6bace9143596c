//! swiftcheck: browser-driven end-to-end checks for a Singlish to Sinhala
//! web translator.
//!
//! Each fixture case is typed into the translator page, the output is
//! scraped heuristically, and the case is classified and recorded in a
//! color-coded spreadsheet plus an HTML/JSON run report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   swiftcheck pipeline                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐     │
//! │   │ Fixture  │──►│ Locator  │──►│ Extract  │──►│ Classify │     │
//! │   │ (JSON)   │   │ (ranked  │   │ (field → │   │ (type →  │     │
//! │   │          │   │ matchers)│   │ scan →   │   │ verdict) │     │
//! │   └──────────┘   └──────────┘   │ table)   │   └────┬─────┘     │
//! │                                 └──────────┘        │           │
//! │          ┌──────────────────────────────────────────┘           │
//! │          ▼                                                      │
//! │   ┌──────────────┐     ┌──────────────┐                         │
//! │   │ ResultSink   │     │ Reporter     │                         │
//! │   │ (XLSX/JSON)  │     │ (HTML/JSON)  │                         │
//! │   └──────────────┘     └──────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
mod classify;
mod driver;
mod extract;
mod fixture;
mod locator;
mod reporter;
mod result;
mod runner;
pub mod script;
mod sink;

/// Translation wait policies
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::{ChromiumBrowser, ChromiumDriver};
pub use browser::BrowserConfig;
pub use classify::{
    classify, observed_verdict, recorded_output, ClassificationResult, Status,
    AS_EXPECTED_FOR_INVALID, CORRECTLY_REJECTED, EXACT_MATCH, INCORRECTLY_ACCEPTED,
    PARTIAL_MATCH, SCRIPT_FOR_INVALID, SIMULATED_TRANSLATION, UI_VERIFIED, VALID_TRANSLATION,
};
pub use driver::{DriverFactory, ElementHandle, MockDriver, MockElement, PageDriver};
pub use extract::{
    best_script_block, check_field_text, extract, first_script_line, resolve_output,
    OutputSource, ResolvedOutput, EXTRACTION_TAGS,
};
pub use fixture::{Breakdown, CaseType, Fixture, LengthType, PredefinedOutputs, TestCase};
pub use locator::{
    locate, locate_input, locate_output, LocatorConfig, OutputCandidate, OutputMatcher,
    PageElements, DEFAULT_OUTPUT_SELECTORS,
};
pub use reporter::{Reporter, TestResultEntry, TestStatus, HTML_REPORT, JSON_REPORT};
pub use result::{ProbeError, ProbeResult};
pub use runner::{
    forced_assertion, CaseRunner, HarnessConfig, NoopObserver, RunObserver, SuiteRun,
    DEFAULT_BASE_URL, NO_INPUT_SCREENSHOT,
};
pub use sink::{
    FlushOutcome, ResultRecord, ResultSink, SinkPaths, SpreadsheetWriter, XlsxWriter,
    ERROR_OUTPUT, HEADERS, NO_OUTPUT, SHEET_NAME,
};
pub use wait::{
    snapshot_output, wait_for_translation, wait_for_translation_since, WaitConfig, WaitPolicy,
    WaitResult,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod pipeline_tests {
        use super::*;

        #[tokio::test]
        async fn test_example_case_end_to_end() {
            let dir = tempfile::TempDir::new().unwrap();
            let config = HarnessConfig {
                screenshots_dir: dir.path().join("shots"),
                ..HarnessConfig::default()
            };
            let runner = CaseRunner::new(config, PredefinedOutputs::builtin());
            // Page whose output never appears: the predefined table fills in
            let mut driver = MockDriver::new()
                .with_element(MockElement::new("textarea").attr("placeholder", "Singlish"))
                .with_element(MockElement::new("div").class("h-80").text("Sinhala"))
                .with_output_target(1);
            let case = TestCase::new(
                "Pos_001",
                CaseType::Positive,
                "mama pasalata yanawa",
                "මම පාසලට යනවා",
            );
            let run = runner.run_suite(&mut driver, &[case], &NoopObserver).await;
            let record = &run.sink.records()[0];
            assert_eq!(record.actual_output, "මම පාසලට යනවා");
            assert_eq!(record.status, Status::Pass);
            assert_eq!(run.reporter.masked_count(), 1);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_probe_error_timeout() {
            let err = ProbeError::Timeout { ms: 5000 };
            assert!(err.to_string().contains("5000"));
        }
    }
}
