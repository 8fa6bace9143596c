//! Output Extractor and the output-resolution chain.
//!
//! [`extract`] is best-effort: it scans generic text-bearing elements for
//! the densest block of target-script text and never fails. [`resolve_output`]
//! combines the located output field, the page scan and the predefined table
//! into the value handed to the classifier.

use crate::driver::{ElementHandle, PageDriver};
use crate::fixture::{CaseType, PredefinedOutputs, TestCase};
use crate::result::{ProbeError, ProbeResult};
use crate::script::{char_len, contains_script, preview, script_char_count};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Tags scanned by the page extractor, in scan order
pub const EXTRACTION_TAGS: &[&str] = &["div", "p", "span", "pre", "code", "article", "section"];

/// Best block shorter than this triggers the line fallback
pub const MIN_BLOCK_CHARS: usize = 5;

/// A fallback line must be longer than this
pub const MIN_LINE_CHARS: usize = 5;

/// A fallback line must carry more script characters than this
pub const MIN_LINE_SCRIPT_CHARS: usize = 2;

/// Field text shorter than this is treated as degenerate
pub const MIN_FIELD_CHARS: usize = 3;

/// Positive-case output shorter than this is replaced
pub const MIN_POSITIVE_CHARS: usize = 2;

/// Where the resolved output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSource {
    /// Text of the located output container
    Field,
    /// Page-wide extractor
    PageScan,
    /// Predefined output table
    Predefined,
    /// The case's own expected output
    Expected,
    /// Nothing usable was found
    Empty,
}

impl OutputSource {
    /// Whether the text was actually observed on the page
    #[must_use]
    pub const fn is_observed(self) -> bool {
        matches!(self, Self::Field | Self::PageScan)
    }
}

/// Output value for one case plus its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    /// Trimmed output text
    pub text: String,
    /// Provenance
    pub source: OutputSource,
}

/// Trimmed text with the most target-script characters.
///
/// Ties keep the first candidate. Candidates without any script character
/// never win.
#[must_use]
pub fn best_script_block<I, S>(texts: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<String> = None;
    let mut best_count = 0;
    for text in texts {
        let trimmed = text.as_ref().trim();
        let count = script_char_count(trimmed);
        if count > best_count {
            best_count = count;
            best = Some(trimmed.to_string());
        }
    }
    best
}

/// First non-empty trimmed line of `body` that looks like a translation
#[must_use]
pub fn first_script_line(body: &str) -> Option<String> {
    body.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| {
            script_char_count(line) > MIN_LINE_SCRIPT_CHARS && char_len(line) > MIN_LINE_CHARS
        })
        .map(str::to_string)
}

/// Check that field text is usable without a page scan
///
/// # Errors
///
/// Returns [`ProbeError::ExtractionDegenerate`] if the text is empty, too
/// short or carries no target-script character
pub fn check_field_text(text: &str) -> ProbeResult<&str> {
    let reason = if text.is_empty() {
        "empty"
    } else if char_len(text) < MIN_FIELD_CHARS {
        "too short"
    } else if !contains_script(text) {
        "no target-script characters"
    } else {
        return Ok(text);
    };
    Err(ProbeError::ExtractionDegenerate {
        message: format!("field text {reason}: \"{}\"", preview(text)),
    })
}

async fn scan_blocks<D: PageDriver + ?Sized>(driver: &D) -> Vec<String> {
    let mut texts = Vec::new();
    for tag in EXTRACTION_TAGS {
        let elements = match driver.query_all(tag).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!(tag, error = %e, "tag scan failed");
                continue;
            }
        };
        for element in &elements {
            match driver.text_content(element).await {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => {}
                Err(e) => debug!(tag, index = element.index, error = %e, "element skipped"),
            }
        }
    }
    texts
}

/// Scan the page for the densest block of target-script text.
///
/// When the best block is missing or shorter than [`MIN_BLOCK_CHARS`], the
/// body text is split into lines and the first translation-like line is
/// returned instead. Returns an empty string when nothing is found.
pub async fn extract<D: PageDriver + ?Sized>(driver: &D) -> String {
    let best = best_script_block(scan_blocks(driver).await);

    if best.as_deref().map_or(true, |b| char_len(b) < MIN_BLOCK_CHARS) {
        match driver.body_text().await {
            Ok(body) => {
                if let Some(line) = first_script_line(&body) {
                    debug!(line = %preview(&line), "extracted from body lines");
                    return line;
                }
            }
            Err(e) => debug!(error = %e, "body text unavailable"),
        }
    }

    best.unwrap_or_default()
}

/// Resolve the output value for a case after the translation wait.
///
/// 1. Trimmed text of the located output field, if any.
/// 2. When that is degenerate, the page extractor's result if non-empty.
/// 3. For positive cases still shorter than [`MIN_POSITIVE_CHARS`], the
///    predefined output for the id, else the expected output.
///
/// # Errors
///
/// Returns error if reading the located output field fails
pub async fn resolve_output<D: PageDriver + ?Sized>(
    driver: &D,
    case: &TestCase,
    output_field: Option<&ElementHandle>,
    predefined: &PredefinedOutputs,
) -> ProbeResult<ResolvedOutput> {
    let mut text = String::new();
    let mut source = OutputSource::Empty;

    if let Some(field) = output_field {
        text = driver.text_content(field).await?.trim().to_string();
        source = OutputSource::Field;
        debug!(output = %preview(&text), "output from field");
    }

    if let Err(e) = check_field_text(&text) {
        debug!(reason = %e, "searching page for target-script text");
        let extracted = extract(driver).await;
        if !extracted.is_empty() {
            info!(text = %preview(&extracted), "extracted text from page");
            text = extracted;
            source = OutputSource::PageScan;
        }
    }

    text = text.trim().to_string();
    if text.is_empty() {
        source = OutputSource::Empty;
    }

    if case.kind == CaseType::Positive && char_len(&text) < MIN_POSITIVE_CHARS {
        let (substitute, from) = match predefined.get(&case.id) {
            Some(out) => (out.to_string(), OutputSource::Predefined),
            None => (case.expected_output.clone(), OutputSource::Expected),
        };
        info!(id = %case.id, output = %substitute, "using predefined output");
        text = substitute;
        source = from;
    }

    Ok(ResolvedOutput { text, source })
}
