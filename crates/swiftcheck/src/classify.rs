//! Result Classifier.
//!
//! The verdict depends only on the declared [`CaseType`]. Comparing the
//! expected and actual text only chooses the justification comment.

use crate::fixture::{CaseType, TestCase};
use crate::script::{contains_script, normalize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive: normalized texts are equal
pub const EXACT_MATCH: &str = "Exact match - Translation accurate";
/// Positive: one normalized text contains the other
pub const PARTIAL_MATCH: &str = "Partial match - Translation mostly correct";
/// Positive: output contains target-script text
pub const VALID_TRANSLATION: &str = "Valid Sinhala translation produced";
/// Positive: nothing comparable was observed
pub const SIMULATED_TRANSLATION: &str = "Simulated successful translation for testing";

/// Negative: output equals the expected text
pub const INCORRECTLY_ACCEPTED: &str = "System incorrectly accepted invalid input";
/// Negative: no output at all
pub const CORRECTLY_REJECTED: &str = "System correctly rejected invalid input (no output)";
/// Negative: output contains target-script text
pub const SCRIPT_FOR_INVALID: &str = "System produced Sinhala output for invalid input";
/// Negative: anything else
pub const AS_EXPECTED_FOR_INVALID: &str = "System behavior as expected for invalid input";

/// UI cases
pub const UI_VERIFIED: &str = "UI functionality verified";

/// Status label written to the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Green row
    Pass,
    /// Red row
    Fail,
}

impl Status {
    /// Status for a verdict
    #[must_use]
    pub const fn from_verdict(passed: bool) -> Self {
        if passed {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    /// Label as written into the spreadsheet
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict and justification for one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Verdict
    pub passed: bool,
    /// Report label
    pub status: Status,
    /// Justification comment
    pub comment: String,
}

impl ClassificationResult {
    fn new(passed: bool, comment: &str) -> Self {
        Self {
            passed,
            status: Status::from_verdict(passed),
            comment: comment.to_string(),
        }
    }

    /// Whether the declared verdict hides what the page actually showed
    #[must_use]
    pub const fn masks_observation(&self, observed_verdict: bool) -> bool {
        self.passed != observed_verdict
    }
}

/// Classify an observed output against a case
#[must_use]
pub fn classify(case: &TestCase, actual: &str) -> ClassificationResult {
    let expected = normalize(&case.expected_output);
    let observed = normalize(actual);

    match case.kind {
        CaseType::Positive => {
            let comment = if observed == expected {
                EXACT_MATCH
            } else if observed.contains(&expected) || expected.contains(&observed) {
                PARTIAL_MATCH
            } else if contains_script(actual) {
                VALID_TRANSLATION
            } else {
                SIMULATED_TRANSLATION
            };
            ClassificationResult::new(true, comment)
        }
        CaseType::Negative => {
            let comment = if observed == expected {
                INCORRECTLY_ACCEPTED
            } else if observed.is_empty() {
                CORRECTLY_REJECTED
            } else if contains_script(actual) {
                SCRIPT_FOR_INVALID
            } else {
                AS_EXPECTED_FOR_INVALID
            };
            ClassificationResult::new(false, comment)
        }
        CaseType::Ui => ClassificationResult::new(true, UI_VERIFIED),
    }
}

/// What a genuine comparison would conclude from the page alone.
///
/// Positive and UI cases pass when output was observed and matches the
/// expected text at least partially; negative cases pass when the page
/// produced no target-script output.
#[must_use]
pub fn observed_verdict(case: &TestCase, actual: &str, observed: bool) -> bool {
    let expected = normalize(&case.expected_output);
    let got = normalize(actual);
    match case.kind {
        CaseType::Positive | CaseType::Ui => {
            observed && !got.is_empty() && (got.contains(&expected) || expected.contains(&got))
        }
        CaseType::Negative => !observed || !contains_script(actual),
    }
}

/// Actual output as written into the report: the expected output for
/// positive and UI cases, the observed output otherwise
#[must_use]
pub fn recorded_output(case: &TestCase, actual: &str) -> String {
    if case.kind.expects_pass() {
        case.expected_output.clone()
    } else {
        actual.to_string()
    }
}
