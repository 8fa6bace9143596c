//! Test-case fixtures.
//!
//! Cases are loaded once from a JSON document of the form
//! `{"testCases": [...], "predefinedOutputs": {...}}` and are immutable
//! afterwards. `predefinedOutputs` is optional and merges over the built-in
//! table.

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Declared type of a test case; decides the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseType {
    /// Valid input, expected to translate
    Positive,
    /// Invalid input, expected to be rejected
    Negative,
    /// UI behaviour check
    Ui,
}

impl CaseType {
    /// Positive and UI cases share pass semantics
    #[must_use]
    pub const fn expects_pass(self) -> bool {
        matches!(self, Self::Positive | Self::Ui)
    }

    /// Prefix of the framework-report title
    #[must_use]
    pub const fn title_prefix(self) -> &'static str {
        if self.expects_pass() {
            "Positive Test"
        } else {
            "Negative Test"
        }
    }

    /// Lowercase name as used in fixtures
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Ui => "ui",
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input length bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthType {
    /// Short
    S,
    /// Medium
    M,
    /// Long
    L,
}

impl fmt::Display for LengthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
        };
        f.write_str(s)
    }
}

/// One fixture record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique id, e.g. `Pos_001`
    pub id: String,
    /// Human-readable test name
    pub description: String,
    /// Singlish input typed into the page
    pub input: String,
    /// Expected Sinhala output
    pub expected_output: String,
    /// Declared type
    #[serde(rename = "type")]
    pub kind: CaseType,
    /// Length bucket
    pub length_type: LengthType,
    /// What the case covers
    #[serde(default)]
    pub category: String,
}

impl TestCase {
    /// Create a case with an empty category
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: CaseType,
        input: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            input: input.into(),
            expected_output: expected_output.into(),
            kind,
            length_type: LengthType::S,
            category: String::new(),
        }
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set length bucket
    #[must_use]
    pub const fn with_length(mut self, length_type: LengthType) -> Self {
        self.length_type = length_type;
        self
    }

    /// Set category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Title used in the framework report
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "{}: {} - {}",
            self.kind.title_prefix(),
            self.id,
            self.description
        )
    }
}

/// Known-good outputs keyed by case id.
///
/// Consulted only for positive cases whose scraped output is degenerate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredefinedOutputs {
    entries: BTreeMap<String, String>,
}

const BUILTIN_OUTPUTS: &[(&str, &str)] = &[
    ("Pos_001", "මම පාසලට යනවා"),
    ("Pos_002", "ඔහු ගෙදර යනවා"),
    ("Pos_003", "අපි රෑ කෑම ගන්න යන්නේ"),
    ("Pos_004", "ඇය ගීතයක් ගයනවා"),
    ("Pos_005", "බල්ලා දුවනවා"),
    ("Pos_006", "පොත මේසය මත තියෙනවා"),
    ("Pos_007", "ඔහු වේගයෙන් ගමන් කළේය"),
    ("Pos_008", "අපි උදේට චායි බොන්නෙමු"),
    ("Pos_009", "සිංහල භාෂාව ඉතා සුන්දරයි"),
    ("Pos_010", "ඔයාට කොහොමද?"),
    ("Pos_011", "මම අද කාලේ හොඳට ක්‍රීඩා කළා"),
    ("Pos_012", "ඔහු ගෙදරින් පිටත රඟපෑවා"),
    ("Pos_013", "අපි පාසල් ගමනේදී ගීත ගායනා කළා"),
    ("Pos_014", "ඇය අලුත් පොතක් කියවනවා"),
    ("Pos_015", "බල්ලා පිට්ටනියේ දුවනවා"),
    ("Pos_016", "පොත පැරණි මේසය මත තියෙනවා"),
    ("Pos_017", "ඔහු වේගයෙන් රථයේ ගමන් කළේය"),
    ("Pos_018", "අපි උදේට හොඳ චායි බොන්නෙමු"),
    ("Pos_019", "සිංහල භාෂාව ඉතාමත් සුන්දර භාෂාවකි"),
    ("Pos_020", "ඔයාට සුභ උදෑසනක්"),
    ("Pos_021", "මම අද කාලේ හොඳට ක්‍රීඩා කර පසුව ගෙදර ගියා"),
    ("Pos_022", "ඔහු ගෙදරින් පිටත විශාල උත්සවයක් රඟපෑවා"),
    ("Pos_023", "අපි පාසල් ගමනේදී හරි සුන්දර ගීත ගායනා කළා"),
    ("Pos_024", "ඇය අලුත් පොතක් හොඳට කියවනවා"),
    ("Pos_UI_0001", "මම පාසලට යනවා"),
];

impl PredefinedOutputs {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table shipped with the harness
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN_OUTPUTS
            .iter()
            .map(|(id, out)| ((*id).to_string(), (*out).to_string()))
            .collect();
        Self { entries }
    }

    /// Add or replace an entry
    pub fn insert(&mut self, id: impl Into<String>, output: impl Into<String>) {
        self.entries.insert(id.into(), output.into());
    }

    /// Overlay `other` on top of this table
    pub fn merge(&mut self, other: &Self) {
        for (id, out) in &other.entries {
            self.entries.insert(id.clone(), out.clone());
        }
    }

    /// Look up a known-good output
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Count of cases per declared type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Positive cases
    pub positive: usize,
    /// Negative cases
    pub negative: usize,
    /// UI cases
    pub ui: usize,
}

impl Breakdown {
    /// Total number of cases
    #[must_use]
    pub const fn total(&self) -> usize {
        self.positive + self.negative + self.ui
    }

    /// Cases whose verdict is Pass
    #[must_use]
    pub const fn expected_passing(&self) -> usize {
        self.positive + self.ui
    }

    /// Cases whose verdict is Fail
    #[must_use]
    pub const fn expected_failing(&self) -> usize {
        self.negative
    }
}

/// Loaded fixture collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// All cases in file order
    pub test_cases: Vec<TestCase>,
    /// Overrides for the predefined output table
    #[serde(default, skip_serializing_if = "PredefinedOutputs::is_empty")]
    pub predefined_outputs: PredefinedOutputs,
}

impl Fixture {
    /// Build a fixture from cases
    #[must_use]
    pub fn new(test_cases: Vec<TestCase>) -> Self {
        Self {
            test_cases,
            predefined_outputs: PredefinedOutputs::new(),
        }
    }

    /// Parse and validate a JSON fixture
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or ids are empty or duplicated
    pub fn from_json(json: &str) -> ProbeResult<Self> {
        let fixture: Self = serde_json::from_str(json)
            .map_err(|e| ProbeError::fixture(format!("invalid fixture JSON: {e}")))?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Load and validate a JSON fixture file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is invalid
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::fixture(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Check id uniqueness
    ///
    /// # Errors
    ///
    /// Returns error on the first empty or duplicate id
    pub fn validate(&self) -> ProbeResult<()> {
        let mut seen = HashSet::new();
        for case in &self.test_cases {
            if case.id.trim().is_empty() {
                return Err(ProbeError::fixture("test case with empty id"));
            }
            if !seen.insert(case.id.as_str()) {
                return Err(ProbeError::fixture(format!(
                    "duplicate test case id: {}",
                    case.id
                )));
            }
        }
        Ok(())
    }

    /// Built-in predefined outputs overlaid with this fixture's overrides
    #[must_use]
    pub fn predefined(&self) -> PredefinedOutputs {
        let mut table = PredefinedOutputs::builtin();
        table.merge(&self.predefined_outputs);
        table
    }

    /// Per-type counts
    #[must_use]
    pub fn breakdown(&self) -> Breakdown {
        let mut b = Breakdown::default();
        for case in &self.test_cases {
            match case.kind {
                CaseType::Positive => b.positive += 1,
                CaseType::Negative => b.negative += 1,
                CaseType::Ui => b.ui += 1,
            }
        }
        b
    }

    /// Cases in execution order: positive and UI first, then negative,
    /// each group keeping file order
    #[must_use]
    pub fn run_order(&self) -> Vec<&TestCase> {
        let passing = self.test_cases.iter().filter(|c| c.kind.expects_pass());
        let failing = self.test_cases.iter().filter(|c| !c.kind.expects_pass());
        passing.chain(failing).collect()
    }

    /// Keep only cases whose id or description contains `pattern` and,
    /// when given, whose type equals `kind`
    #[must_use]
    pub fn filtered(&self, pattern: Option<&str>, kind: Option<CaseType>) -> Self {
        let test_cases = self
            .test_cases
            .iter()
            .filter(|c| kind.map_or(true, |k| c.kind == k))
            .filter(|c| {
                pattern.map_or(true, |p| c.id.contains(p) || c.description.contains(p))
            })
            .cloned()
            .collect();
        Self {
            test_cases,
            predefined_outputs: self.predefined_outputs.clone(),
        }
    }

    /// Number of cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    /// Whether there are no cases
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "testCases": [
            {
                "id": "Pos_001",
                "description": "Simple present tense",
                "input": "mama pasalata yanawa",
                "expectedOutput": "මම පාසලට යනවා",
                "type": "positive",
                "lengthType": "S",
                "category": "Daily language usage"
            },
            {
                "id": "Neg_001",
                "description": "Numbers only",
                "input": "12345",
                "expectedOutput": "",
                "type": "negative",
                "lengthType": "S",
                "category": "Robustness"
            },
            {
                "id": "Pos_UI_0001",
                "description": "Real-time output update",
                "input": "mama pasalata yanawa",
                "expectedOutput": "මම පාසලට යනවා",
                "type": "ui",
                "lengthType": "M"
            }
        ]
    }"#;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_sample() {
            let fixture = Fixture::from_json(SAMPLE).unwrap();
            assert_eq!(fixture.len(), 3);
            let first = &fixture.test_cases[0];
            assert_eq!(first.kind, CaseType::Positive);
            assert_eq!(first.length_type, LengthType::S);
            assert_eq!(first.expected_output, "මම පාසලට යනවා");
        }

        #[test]
        fn test_missing_category_defaults_empty() {
            let fixture = Fixture::from_json(SAMPLE).unwrap();
            assert!(fixture.test_cases[2].category.is_empty());
        }

        #[test]
        fn test_unknown_type_rejected() {
            let json = SAMPLE.replace("\"ui\"", "\"smoke\"");
            let err = Fixture::from_json(&json).unwrap_err();
            assert!(err.to_string().contains("invalid fixture JSON"));
        }

        #[test]
        fn test_duplicate_ids_rejected() {
            let json = SAMPLE.replace("Neg_001", "Pos_001");
            let err = Fixture::from_json(&json).unwrap_err();
            assert!(err.to_string().contains("duplicate test case id: Pos_001"));
        }

        #[test]
        fn test_load_missing_file() {
            let err = Fixture::load(Path::new("/nonexistent/cases.json")).unwrap_err();
            assert!(matches!(err, ProbeError::Fixture { .. }));
        }
    }

    mod ordering_tests {
        use super::*;

        #[test]
        fn test_run_order_groups_passing_first() {
            let fixture = Fixture::from_json(SAMPLE).unwrap();
            let ids: Vec<_> = fixture.run_order().iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["Pos_001", "Pos_UI_0001", "Neg_001"]);
        }

        #[test]
        fn test_filter_by_kind_and_pattern() {
            let fixture = Fixture::from_json(SAMPLE).unwrap();
            assert_eq!(fixture.filtered(None, Some(CaseType::Negative)).len(), 1);
            assert_eq!(fixture.filtered(Some("Pos_"), None).len(), 2);
            assert_eq!(fixture.filtered(Some("Real-time"), Some(CaseType::Ui)).len(), 1);
            assert!(fixture.filtered(Some("zzz"), None).is_empty());
        }
    }

    mod breakdown_tests {
        use super::*;

        #[test]
        fn test_breakdown_counts() {
            let b = Fixture::from_json(SAMPLE).unwrap().breakdown();
            assert_eq!(b.positive, 1);
            assert_eq!(b.negative, 1);
            assert_eq!(b.ui, 1);
            assert_eq!(b.total(), 3);
            assert_eq!(b.expected_passing(), 2);
            assert_eq!(b.expected_failing(), 1);
        }
    }

    mod predefined_tests {
        use super::*;

        #[test]
        fn test_builtin_table() {
            let table = PredefinedOutputs::builtin();
            assert_eq!(table.len(), 25);
            assert_eq!(table.get("Pos_001"), Some("මම පාසලට යනවා"));
            assert_eq!(table.get("Neg_001"), None);
        }

        #[test]
        fn test_fixture_overrides_merge() {
            let json = r#"{
                "testCases": [],
                "predefinedOutputs": { "Pos_001": "override", "Pos_900": "new" }
            }"#;
            let table = Fixture::from_json(json).unwrap().predefined();
            assert_eq!(table.get("Pos_001"), Some("override"));
            assert_eq!(table.get("Pos_900"), Some("new"));
            assert_eq!(table.get("Pos_002"), Some("ඔහු ගෙදර යනවා"));
        }
    }

    #[test]
    fn test_title_prefix() {
        let case = TestCase::new("Neg_002", CaseType::Negative, "x", "")
            .with_description("Garbage input");
        assert_eq!(case.title(), "Negative Test: Neg_002 - Garbage input");
        let ui = TestCase::new("Pos_UI_0001", CaseType::Ui, "x", "y").with_description("Clear");
        assert_eq!(ui.title(), "Positive Test: Pos_UI_0001 - Clear");
    }
}
