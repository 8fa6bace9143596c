//! Report Sink: per-run result accumulation and spreadsheet export.
//!
//! A [`ResultSink`] is created at the start of a run (one per worker), filled
//! with one [`ResultRecord`] per case and flushed exactly once. Flushing
//! writes an XLSX workbook; when that fails the same records are written as
//! pretty JSON next to it and the failure is reported, not raised.

use crate::classify::{ClassificationResult, Status};
use crate::fixture::{LengthType, TestCase};
use crate::result::{ProbeError, ProbeResult};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Recorded actual output when nothing was produced
pub const NO_OUTPUT: &str = "NO OUTPUT";

/// Recorded actual output when the case errored
pub const ERROR_OUTPUT: &str = "ERROR DURING EXECUTION";

/// Worksheet name
pub const SHEET_NAME: &str = "Test Results";

/// Column headers, in record field order
pub const HEADERS: [&str; 9] = [
    "TC ID",
    "Test case name",
    "Input length type",
    "Input",
    "Expected output",
    "Actual output",
    "Status",
    "Accuracy justification / Description of issue type",
    "What is covered by the test",
];

/// Column widths, in record field order
pub const COLUMN_WIDTHS: [f64; 9] = [15.0, 40.0, 15.0, 50.0, 50.0, 50.0, 10.0, 40.0, 60.0];

const STATUS_COLUMN: u16 = 6;

/// One spreadsheet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Case id
    pub id: String,
    /// Test case name
    pub description: String,
    /// Length bucket
    pub length_type: LengthType,
    /// Input typed into the page
    pub input: String,
    /// Expected output
    pub expected_output: String,
    /// Recorded actual output
    pub actual_output: String,
    /// Status label
    pub status: Status,
    /// Justification
    pub comments: String,
    /// What the case covers
    pub category: String,
}

impl ResultRecord {
    /// Record for a classified case; an empty recorded output becomes
    /// [`NO_OUTPUT`]
    #[must_use]
    pub fn from_case(case: &TestCase, recorded_output: &str, result: &ClassificationResult) -> Self {
        let actual_output = if recorded_output.is_empty() {
            NO_OUTPUT.to_string()
        } else {
            recorded_output.to_string()
        };
        Self {
            id: case.id.clone(),
            description: case.description.clone(),
            length_type: case.length_type,
            input: case.input.clone(),
            expected_output: case.expected_output.clone(),
            actual_output,
            status: result.status,
            comments: result.comment.clone(),
            category: case.category.clone(),
        }
    }

    /// Record for a case whose execution failed
    #[must_use]
    pub fn from_error(case: &TestCase, error: &ProbeError) -> Self {
        Self {
            id: case.id.clone(),
            description: case.description.clone(),
            length_type: case.length_type,
            input: case.input.clone(),
            expected_output: case.expected_output.clone(),
            actual_output: ERROR_OUTPUT.to_string(),
            status: Status::from_verdict(case.kind.expects_pass()),
            comments: format!("Test execution error: {}", error.detail()),
            category: case.category.clone(),
        }
    }

    /// Cell values in column order
    #[must_use]
    pub fn cells(&self) -> [String; 9] {
        [
            self.id.clone(),
            self.description.clone(),
            self.length_type.to_string(),
            self.input.clone(),
            self.expected_output.clone(),
            self.actual_output.clone(),
            self.status.to_string(),
            self.comments.clone(),
            self.category.clone(),
        ]
    }
}

// ============================================================================
// Spreadsheet writers
// ============================================================================

/// Something that can turn records into a spreadsheet file
pub trait SpreadsheetWriter: Send + Sync {
    /// Write all records to `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be produced
    fn write(&self, records: &[ResultRecord], path: &Path) -> ProbeResult<()>;
}

/// XLSX writer with a styled header row and color-coded status cells
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

impl XlsxWriter {
    /// Create a new writer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> ProbeError {
    ProbeError::report(e.to_string())
}

impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, records: &[ResultRecord], path: &Path) -> ProbeResult<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

        let header = Format::new().set_bold().set_align(FormatAlign::Center);
        let pass = Format::new()
            .set_background_color(Color::RGB(0x00C6_EFCE))
            .set_font_color(Color::RGB(0x0000_6100));
        let fail = Format::new()
            .set_background_color(Color::RGB(0x00FF_C7CE))
            .set_font_color(Color::RGB(0x009C_0006));

        for (col, (title, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = u16::try_from(col).map_err(|e| ProbeError::report(e.to_string()))?;
            sheet.set_column_width(col, width).map_err(xlsx_error)?;
            sheet
                .write_string_with_format(0, col, *title, &header)
                .map_err(xlsx_error)?;
        }

        for (i, record) in records.iter().enumerate() {
            let row = u32::try_from(i + 1).map_err(|e| ProbeError::report(e.to_string()))?;
            for (col, value) in record.cells().iter().enumerate() {
                let col = u16::try_from(col).map_err(|e| ProbeError::report(e.to_string()))?;
                if col == STATUS_COLUMN {
                    let style = if record.status == Status::Pass { &pass } else { &fail };
                    sheet
                        .write_string_with_format(row, col, value, style)
                        .map_err(xlsx_error)?;
                } else {
                    sheet.write_string(row, col, value).map_err(xlsx_error)?;
                }
            }
        }

        workbook.save(path).map_err(xlsx_error)
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Where a flush puts its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkPaths {
    /// Directory for both files
    pub results_dir: PathBuf,
    /// Spreadsheet file name
    pub spreadsheet_name: String,
    /// JSON fallback file name
    pub backup_name: String,
}

impl SinkPaths {
    /// Spreadsheet path
    #[must_use]
    pub fn spreadsheet(&self) -> PathBuf {
        self.results_dir.join(&self.spreadsheet_name)
    }

    /// Backup path
    #[must_use]
    pub fn backup(&self) -> PathBuf {
        self.results_dir.join(&self.backup_name)
    }
}

impl Default for SinkPaths {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            spreadsheet_name: "translation-test-results.xlsx".to_string(),
            backup_name: "test-results-backup.json".to_string(),
        }
    }
}

/// What a flush produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Spreadsheet written
    Spreadsheet {
        /// File path
        path: PathBuf,
        /// Rows written
        rows: usize,
    },
    /// Spreadsheet failed; JSON backup written instead
    Backup {
        /// File path
        path: PathBuf,
        /// Rows written
        rows: usize,
        /// Why the spreadsheet failed
        error: String,
    },
}

impl FlushOutcome {
    /// Path of the file that was written
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Spreadsheet { path, .. } | Self::Backup { path, .. } => path,
        }
    }

    /// Whether the fallback was used
    #[must_use]
    pub const fn is_backup(&self) -> bool {
        matches!(self, Self::Backup { .. })
    }
}

/// Append-only record collection for one run or one worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSink {
    records: Vec<ResultRecord>,
}

impl ResultSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-filled with records (e.g. from a backup)
    #[must_use]
    pub fn from_records(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON backup
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load_backup(path: &Path) -> ProbeResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let records: Vec<ResultRecord> = serde_json::from_str(&json)?;
        Ok(Self::from_records(records))
    }

    /// Append a record
    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    /// Move all of `other`'s records into this sink
    pub fn merge(&mut self, other: Self) {
        self.records.extend(other.records);
    }

    /// Merge worker sinks and order records by position in `order`;
    /// unknown ids go last in arrival order
    #[must_use]
    pub fn merge_ordered(sinks: Vec<Self>, order: &[String]) -> Self {
        let rank: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut merged = Self::new();
        for sink in sinks {
            merged.merge(sink);
        }
        merged
            .records
            .sort_by_key(|r| rank.get(r.id.as_str()).copied().unwrap_or(usize::MAX));
        merged
    }

    /// Records in insertion order
    #[must_use]
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the sink is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records with the given status
    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Write the spreadsheet, falling back to a JSON backup
    ///
    /// # Errors
    ///
    /// Returns error only if the results directory cannot be created or
    /// the backup cannot be written either
    pub fn flush(self, writer: &dyn SpreadsheetWriter, paths: &SinkPaths) -> ProbeResult<FlushOutcome> {
        std::fs::create_dir_all(&paths.results_dir)?;
        let rows = self.records.len();
        info!(rows, "saving results spreadsheet");

        let spreadsheet = paths.spreadsheet();
        match writer.write(&self.records, &spreadsheet) {
            Ok(()) => {
                info!(path = %spreadsheet.display(), "results saved");
                Ok(FlushOutcome::Spreadsheet {
                    path: spreadsheet,
                    rows,
                })
            }
            Err(e) => {
                warn!(error = %e, "spreadsheet write failed; writing JSON backup");
                let backup = paths.backup();
                let json = serde_json::to_string_pretty(&self.records)?;
                std::fs::write(&backup, json)?;
                info!(path = %backup.display(), "backup saved");
                Ok(FlushOutcome::Backup {
                    path: backup,
                    rows,
                    error: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::fixture::CaseType;
    use tempfile::TempDir;

    struct FailingWriter;

    impl SpreadsheetWriter for FailingWriter {
        fn write(&self, _records: &[ResultRecord], _path: &Path) -> ProbeResult<()> {
            Err(ProbeError::report("disk full"))
        }
    }

    fn record(id: &str, status: Status) -> ResultRecord {
        ResultRecord {
            id: id.to_string(),
            description: "d".to_string(),
            length_type: LengthType::S,
            input: "i".to_string(),
            expected_output: "e".to_string(),
            actual_output: "a".to_string(),
            status,
            comments: "c".to_string(),
            category: "k".to_string(),
        }
    }

    fn paths(dir: &TempDir) -> SinkPaths {
        SinkPaths {
            results_dir: dir.path().join("results"),
            ..SinkPaths::default()
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn test_empty_output_recorded_as_no_output() {
            let case = TestCase::new("Neg_001", CaseType::Negative, "12345", "x");
            let r = ResultRecord::from_case(&case, "", &classify(&case, ""));
            assert_eq!(r.actual_output, NO_OUTPUT);
            assert_eq!(r.status, Status::Fail);
        }

        #[test]
        fn test_record_carries_category() {
            let case = TestCase::new("Pos_001", CaseType::Positive, "mama", "මම")
                .with_description("Pronoun")
                .with_category("Daily language usage");
            let r = ResultRecord::from_case(&case, "මම", &classify(&case, "මම"));
            assert_eq!(r.cells()[1], "Pronoun");
            assert_eq!(r.cells()[8], "Daily language usage");
            let err = ResultRecord::from_error(&case, &ProbeError::execution("boom"));
            assert_eq!(err.category, "Daily language usage");
        }

        #[test]
        fn test_error_record_status_follows_type() {
            let err = ProbeError::execution("boom");
            let pos = TestCase::new("Pos_001", CaseType::Positive, "mama", "මම");
            let neg = TestCase::new("Neg_001", CaseType::Negative, "x", "y");
            let r = ResultRecord::from_error(&pos, &err);
            assert_eq!(r.actual_output, ERROR_OUTPUT);
            assert_eq!(r.status, Status::Pass);
            assert_eq!(r.comments, "Test execution error: boom");
            assert_eq!(ResultRecord::from_error(&neg, &err).status, Status::Fail);
        }

        #[test]
        fn test_json_field_names() {
            let json = serde_json::to_value(record("Pos_001", Status::Pass)).unwrap();
            let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
            for key in [
                "id",
                "description",
                "lengthType",
                "input",
                "expectedOutput",
                "actualOutput",
                "status",
                "comments",
                "category",
            ] {
                assert!(keys.iter().any(|k| k == key), "missing {key}");
            }
            assert_eq!(json["status"], "Pass");
        }

        #[test]
        fn test_cells_order() {
            let cells = record("Pos_001", Status::Fail).cells();
            assert_eq!(cells[0], "Pos_001");
            assert_eq!(cells[2], "S");
            assert_eq!(cells[6], "Fail");
            assert_eq!(cells.len(), HEADERS.len());
        }
    }

    mod sink_tests {
        use super::*;

        #[test]
        fn test_merge_ordered_by_fixture() {
            let mut a = ResultSink::new();
            a.push(record("Neg_001", Status::Fail));
            a.push(record("Pos_002", Status::Pass));
            let mut b = ResultSink::new();
            b.push(record("Pos_001", Status::Pass));
            b.push(record("Extra", Status::Pass));
            let order: Vec<String> = ["Pos_001", "Pos_002", "Neg_001"]
                .iter()
                .map(|s| (*s).to_string())
                .collect();
            let merged = ResultSink::merge_ordered(vec![a, b], &order);
            let ids: Vec<_> = merged.records().iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["Pos_001", "Pos_002", "Neg_001", "Extra"]);
        }

        #[test]
        fn test_counts() {
            let sink = ResultSink::from_records(vec![
                record("a", Status::Pass),
                record("b", Status::Fail),
                record("c", Status::Pass),
            ]);
            assert_eq!(sink.count(Status::Pass), 2);
            assert_eq!(sink.count(Status::Fail), 1);
        }
    }

    mod flush_tests {
        use super::*;
        use regex::Regex;
        use std::io::Read;

        fn xlsx_part(path: &Path, name: &str) -> String {
            let file = std::fs::File::open(path).unwrap();
            let mut archive = zip::ZipArchive::new(file).unwrap();
            let mut part = archive.by_name(name).unwrap();
            let mut xml = String::new();
            part.read_to_string(&mut xml).unwrap();
            xml
        }

        fn blocks(xml: &str, list: &str, item: &str) -> Vec<String> {
            let list_re = Regex::new(&format!(r"(?s)<{list}[^>]*>(.*?)</{list}>")).unwrap();
            let inner = list_re.captures(xml).unwrap()[1].to_string();
            let item_re = Regex::new(&format!(
                r"(?s)<{item}>(.*?)</{item}>|<{item} [^>]*?/>|<{item} [^>]*>"
            ))
            .unwrap();
            item_re.find_iter(&inner).map(|m| m.as_str().to_string()).collect()
        }

        fn attr(tag: &str, name: &str) -> usize {
            let re = Regex::new(&format!(r#"\b{name}="(\d+)""#)).unwrap();
            re.captures(tag).unwrap()[1].parse().unwrap()
        }

        /// Fill and font XML applied to a cell
        fn cell_style(sheet: &str, styles: &str, cell: &str) -> (String, String) {
            let re = Regex::new(&format!(r#"<c r="{cell}"[^>]*?\bs="(\d+)""#)).unwrap();
            let xf_index: usize = re.captures(sheet).unwrap()[1].parse().unwrap();
            let xfs = blocks(styles, "cellXfs", "xf");
            let xf = &xfs[xf_index];
            let fills = blocks(styles, "fills", "fill");
            let fonts = blocks(styles, "fonts", "font");
            (
                fills[attr(xf, "fillId")].clone(),
                fonts[attr(xf, "fontId")].clone(),
            )
        }

        #[test]
        fn test_xlsx_layout_and_status_styles() {
            let dir = TempDir::new().unwrap();
            let sink = ResultSink::from_records(vec![
                record("Pos_001", Status::Pass),
                record("Neg_001", Status::Fail),
            ]);
            let outcome = sink.flush(&XlsxWriter::new(), &paths(&dir)).unwrap();
            let path = outcome.path();

            let workbook = xlsx_part(path, "xl/workbook.xml");
            assert!(workbook.contains(&format!(r#"name="{SHEET_NAME}""#)));

            let strings = xlsx_part(path, "xl/sharedStrings.xml");
            for title in HEADERS {
                assert!(strings.contains(&format!("<t>{title}</t>")), "missing header {title}");
            }

            let sheet = xlsx_part(path, "xl/worksheets/sheet1.xml");
            // Excel stores character widths with cell padding added
            for width in ["15.7109375", "40.7109375", "50.7109375", "10.7109375", "60.7109375"] {
                assert!(sheet.contains(&format!(r#"width="{width}""#)), "missing width {width}");
            }

            let styles = xlsx_part(path, "xl/styles.xml");
            let (_, header_font) = cell_style(&sheet, &styles, "A1");
            assert!(header_font.contains("<b/>"));
            assert!(styles.contains(r#"horizontal="center""#));

            let (pass_fill, pass_font) = cell_style(&sheet, &styles, "G2");
            assert!(pass_fill.contains("FFC6EFCE"));
            assert!(pass_font.contains("FF006100"));

            let (fail_fill, fail_font) = cell_style(&sheet, &styles, "G3");
            assert!(fail_fill.contains("FFFFC7CE"));
            assert!(fail_font.contains("FF9C0006"));
        }

        #[test]
        fn test_flush_writes_xlsx() {
            let dir = TempDir::new().unwrap();
            let sink = ResultSink::from_records(vec![
                record("Pos_001", Status::Pass),
                record("Neg_001", Status::Fail),
            ]);
            let outcome = sink.flush(&XlsxWriter::new(), &paths(&dir)).unwrap();
            assert!(!outcome.is_backup());
            let bytes = std::fs::read(outcome.path()).unwrap();
            // XLSX is a zip archive
            assert_eq!(&bytes[..2], b"PK");
        }

        #[test]
        fn test_flush_falls_back_to_json() {
            let dir = TempDir::new().unwrap();
            let sink = ResultSink::from_records(vec![record("Pos_001", Status::Pass)]);
            let outcome = sink.flush(&FailingWriter, &paths(&dir)).unwrap();
            match &outcome {
                FlushOutcome::Backup { rows, error, .. } => {
                    assert_eq!(*rows, 1);
                    assert!(error.contains("disk full"));
                }
                FlushOutcome::Spreadsheet { .. } => panic!("expected backup"),
            }
            let restored = ResultSink::load_backup(outcome.path()).unwrap();
            assert_eq!(restored.records()[0].id, "Pos_001");
        }
    }
}
