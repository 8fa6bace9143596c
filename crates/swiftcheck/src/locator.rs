//! Element Locator: finds the translator's input control and output
//! container on a freshly loaded page.
//!
//! The page carries no stable ids, so discovery is heuristic:
//!
//! - **Input**: a text-entry control whose placeholder mentions the source
//!   language, else the first text-entry control.
//! - **Output**: an ordered list of [`OutputMatcher`]s. The first matcher (in
//!   rank order) that yields a `div` with non-empty text wins; within one
//!   matcher, document order decides.

use crate::driver::{ElementHandle, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::script;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Output candidate selectors, highest priority first
pub const DEFAULT_OUTPUT_SELECTORS: &[&str] = &[
    "div.bg-slate-50",
    "div.h-80",
    "div.w-full",
    "div.rounded-lg",
    r#"div[class*="bg-slate"]"#,
    r#"div[class*="output"]"#,
    r#"div[class*="result"]"#,
    r#"div[class*="translat"]"#,
    r#"div[class*="sinhala"]"#,
];

/// Heuristics used to discover page elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Substring expected in the input control's placeholder
    pub input_placeholder_hint: String,
    /// Tag of the text-entry control
    pub input_tag: String,
    /// Block tag an output container must have
    pub output_tag: String,
    /// Ordered output candidate selectors
    pub output_selectors: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            input_placeholder_hint: "Singlish".to_string(),
            input_tag: "textarea".to_string(),
            output_tag: "div".to_string(),
            output_selectors: DEFAULT_OUTPUT_SELECTORS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl LocatorConfig {
    /// Selector for the preferred input control
    #[must_use]
    pub fn preferred_input_selector(&self) -> String {
        format!(
            r#"{}[placeholder*="{}"]"#,
            self.input_tag, self.input_placeholder_hint
        )
    }

    /// Matchers in rank order
    #[must_use]
    pub fn matchers(&self) -> Vec<OutputMatcher> {
        self.output_selectors
            .iter()
            .enumerate()
            .map(|(rank, selector)| OutputMatcher::new(rank, selector, &self.output_tag))
            .collect()
    }
}

/// One ranked output-container heuristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMatcher {
    /// Priority, 0 is highest
    pub rank: usize,
    /// CSS selector producing candidates
    pub selector: String,
    /// Tag a candidate must carry
    pub required_tag: String,
}

/// Candidate accepted by a matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCandidate {
    /// Matched element
    pub element: ElementHandle,
    /// Rank of the matcher that produced it
    pub rank: usize,
    /// Trimmed text at discovery time
    pub text: String,
}

impl OutputMatcher {
    /// Create a matcher
    #[must_use]
    pub fn new(rank: usize, selector: impl Into<String>, required_tag: impl Into<String>) -> Self {
        Self {
            rank,
            selector: selector.into(),
            required_tag: required_tag.into(),
        }
    }

    /// First element in document order that is a block container with
    /// non-empty trimmed text
    ///
    /// # Errors
    ///
    /// Returns error if the selector query itself fails
    pub async fn probe<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> ProbeResult<Option<OutputCandidate>> {
        for element in driver.query_all(&self.selector).await? {
            if !element.is_tag(&self.required_tag) {
                continue;
            }
            let text = match driver.text_content(&element).await {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    debug!(selector = %self.selector, error = %e, "skipping unreadable candidate");
                    continue;
                }
            };
            if !text.is_empty() {
                return Ok(Some(OutputCandidate {
                    element,
                    rank: self.rank,
                    text,
                }));
            }
        }
        Ok(None)
    }
}

/// Elements discovered for one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElements {
    /// Text-entry control
    pub input_field: ElementHandle,
    /// Output container, if any matcher accepted one
    pub output_field: Option<OutputCandidate>,
}

/// Find the input control: placeholder hint first, then the first control
///
/// # Errors
///
/// Returns [`ProbeError::ElementNotFound`] if the page has no text-entry control
pub async fn locate_input<D: PageDriver + ?Sized>(
    driver: &D,
    config: &LocatorConfig,
) -> ProbeResult<ElementHandle> {
    let preferred = config.preferred_input_selector();
    if let Some(input) = driver.query_all(&preferred).await?.into_iter().next() {
        debug!(selector = %preferred, "input field found by placeholder");
        return Ok(input);
    }
    if let Some(input) = driver.query_all(&config.input_tag).await?.into_iter().next() {
        debug!(selector = %config.input_tag, "input field found by tag");
        return Ok(input);
    }
    Err(ProbeError::ElementNotFound {
        message: format!("no {} on the page", config.input_tag),
    })
}

/// Run the matchers in rank order and accept the first candidate.
///
/// A failing matcher is skipped.
pub async fn locate_output<D: PageDriver + ?Sized>(
    driver: &D,
    config: &LocatorConfig,
) -> Option<OutputCandidate> {
    for matcher in config.matchers() {
        match matcher.probe(driver).await {
            Ok(Some(candidate)) => {
                info!(
                    selector = %matcher.selector,
                    rank = matcher.rank,
                    preview = %script::preview(&candidate.text),
                    "output field found"
                );
                return Some(candidate);
            }
            Ok(None) => {}
            Err(e) => debug!(selector = %matcher.selector, error = %e, "matcher failed"),
        }
    }
    None
}

/// Locate both page elements.
///
/// When no output container is found the body text is scanned once for a
/// target-script run and the result is logged.
///
/// # Errors
///
/// Returns [`ProbeError::ElementNotFound`] if no input control exists
pub async fn locate<D: PageDriver + ?Sized>(
    driver: &D,
    config: &LocatorConfig,
) -> ProbeResult<PageElements> {
    let input_field = locate_input(driver, config).await?;
    let output_field = locate_output(driver, config).await;

    if output_field.is_none() {
        warn!("no output container matched; extraction will scan the page");
        match driver.body_text().await {
            Ok(body) => match script::first_script_run(&body) {
                Some(run) => info!(text = %script::preview(run), "target-script text present in body"),
                None => debug!("no target-script text in body"),
            },
            Err(e) => debug!(error = %e, "body scan failed"),
        }
    }

    Ok(PageElements {
        input_field,
        output_field,
    })
}
