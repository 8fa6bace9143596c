//! PageDriver - Abstract Browser Automation Trait
//!
//! Everything the harness needs from a browser goes through [`PageDriver`]:
//! navigation, network-idle waits, selector queries, text reads, input
//! filling, screenshots and delays.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait)                                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────┐      │
//! │  │  ChromiumDriver     │        │  MockDriver         │      │
//! │  │  (feature=browser)  │        │  (unit tests)       │      │
//! │  │  CDP via            │        │  in-memory DOM,     │      │
//! │  │  chromiumoxide      │        │  tiny CSS subset    │      │
//! │  └─────────────────────┘        └─────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Mutex;

/// Handle to the `index`-th element matched by `selector`.
///
/// Handles are re-derived for every test case because the page is reloaded
/// between cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Selector the element was found with
    pub selector: String,
    /// Position among the selector's matches, in document order
    pub index: usize,
    /// Lowercase tag name
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(selector: impl Into<String>, index: usize, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            index,
            tag_name: tag_name.into(),
        }
    }

    /// Check the element's tag
    #[must_use]
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }
}

/// Browser capabilities the harness relies on
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL
    async fn goto(&mut self, url: &str) -> ProbeResult<()>;

    /// Wait until no new network requests start for a short quiet period
    async fn wait_for_network_idle(&self, timeout: Duration) -> ProbeResult<()>;

    /// All elements matching a CSS selector, in document order
    async fn query_all(&self, selector: &str) -> ProbeResult<Vec<ElementHandle>>;

    /// Text content of an element (untrimmed)
    async fn text_content(&self, element: &ElementHandle) -> ProbeResult<String>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> ProbeResult<()>;

    /// Empty a text-entry control
    async fn clear(&self, element: &ElementHandle) -> ProbeResult<()>;

    /// Replace a text-entry control's value
    async fn fill(&self, element: &ElementHandle, text: &str) -> ProbeResult<()>;

    /// Text content of the whole body
    async fn body_text(&self) -> ProbeResult<String>;

    /// PNG screenshot
    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>>;

    /// Fixed delay
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Source of independent pages, one per worker
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Driver type produced
    type Driver: PageDriver + 'static;

    /// Open a fresh page
    async fn create(&self) -> ProbeResult<Self::Driver>;
}

// ============================================================================
// Mock implementation
// ============================================================================

/// Element in the mock DOM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    /// Lowercase tag name
    pub tag: String,
    /// Class list
    pub classes: Vec<String>,
    /// Other attributes (e.g. `placeholder`)
    pub attributes: BTreeMap<String, String>,
    /// Text content
    pub text: String,
}

impl MockElement {
    /// Create an element with a tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            return Some(self.classes.join(" "));
        }
        self.attributes.get(name).cloned()
    }
}

/// Parsed form of the selector subset the mock understands:
/// `tag`, `tag.class`, `tag[attr*="value"]` and combinations.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SimpleSelector {
    tag: Option<String>,
    class: Option<String>,
    attr_contains: Option<(String, String)>,
}

fn selector_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^(?P<tag>[a-z][a-z0-9]*)?(?:\.(?P<class>[\w-]+))?(?:\[(?P<attr>[\w-]+)\*="(?P<val>[^"]*)"\])?$"#,
        )
        .expect("valid selector pattern")
    })
}

impl SimpleSelector {
    fn parse(selector: &str) -> ProbeResult<Self> {
        let caps = selector_pattern()
            .captures(selector.trim())
            .ok_or_else(|| ProbeError::page(format!("unsupported selector: {selector}")))?;
        let parsed = Self {
            tag: caps.name("tag").map(|m| m.as_str().to_string()),
            class: caps.name("class").map(|m| m.as_str().to_string()),
            attr_contains: caps
                .name("attr")
                .zip(caps.name("val"))
                .map(|(a, v)| (a.as_str().to_string(), v.as_str().to_string())),
        };
        if parsed.tag.is_none() && parsed.class.is_none() && parsed.attr_contains.is_none() {
            return Err(ProbeError::page("empty selector"));
        }
        Ok(parsed)
    }

    fn matches(&self, element: &MockElement) -> bool {
        if let Some(ref tag) = self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(ref class) = self.class {
            if !element.classes.iter().any(|c| c == class) {
                return false;
            }
        }
        if let Some((ref attr, ref value)) = self.attr_contains {
            match element.attribute(attr) {
                Some(actual) if actual.contains(value.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    elements: Vec<MockElement>,
    translations: HashMap<String, String>,
    output_target: Option<usize>,
    failing: HashSet<String>,
    call_history: Vec<String>,
    paused: Duration,
    lag_reads: usize,
    pending: Option<(String, usize)>,
}

/// In-memory page for unit tests.
///
/// Filling a text-entry control writes the configured translation of the
/// typed text into the output target element, simulating the translator.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element; returns its document position
    pub fn add_element(&mut self, element: MockElement) -> usize {
        let state = self.state.get_mut();
        state.elements.push(element);
        state.elements.len() - 1
    }

    /// Builder form of [`MockDriver::add_element`]
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.add_element(element);
        self
    }

    /// Element at `position` receives translations on fill
    #[must_use]
    pub fn with_output_target(mut self, position: usize) -> Self {
        self.state.get_mut().output_target = Some(position);
        self
    }

    /// Translation produced when `input` is typed
    #[must_use]
    pub fn with_translation(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.state
            .get_mut()
            .translations
            .insert(input.into(), output.into());
        self
    }

    /// Keep the previous output text for `reads` text reads after a fill
    #[must_use]
    pub fn with_translation_lag(mut self, reads: usize) -> Self {
        self.state.get_mut().lag_reads = reads;
        self
    }

    /// Make a driver method fail (`"goto"`, `"fill"`, `"query_all"`, ...)
    #[must_use]
    pub fn failing_on(mut self, method: impl Into<String>) -> Self {
        self.state.get_mut().failing.insert(method.into());
        self
    }

    /// Recorded calls, e.g. `fill:mama pasalata yanawa`
    pub async fn history(&self) -> Vec<String> {
        self.state.lock().await.call_history.clone()
    }

    /// Whether a method was called
    pub async fn was_called(&self, method: &str) -> bool {
        self.state
            .lock()
            .await
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Sum of all requested pauses
    pub async fn total_paused(&self) -> Duration {
        self.state.lock().await.paused
    }

    /// Current URL
    pub async fn current_url(&self) -> String {
        self.state.lock().await.url.clone()
    }

    /// Text of the element at `position`
    pub async fn element_text(&self, position: usize) -> Option<String> {
        self.state
            .lock()
            .await
            .elements
            .get(position)
            .map(|e| e.text.clone())
    }

    fn write_output(state: &mut MockState, text: String) {
        if let Some(target) = state.output_target {
            if let Some(out) = state.elements.get_mut(target) {
                out.text = text;
            }
        }
    }

    fn tick_pending(state: &mut MockState) {
        let ready = match state.pending {
            Some((_, ref mut left)) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        };
        if ready {
            if let Some((text, _)) = state.pending.take() {
                Self::write_output(state, text);
            }
        }
    }

    fn check(state: &MockState, method: &str) -> ProbeResult<()> {
        if state.failing.contains(method) {
            return Err(ProbeError::page(format!("mock failure in {method}")));
        }
        Ok(())
    }

    fn resolve(state: &MockState, handle: &ElementHandle) -> ProbeResult<usize> {
        let selector = SimpleSelector::parse(&handle.selector)?;
        state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| selector.matches(e))
            .nth(handle.index)
            .map(|(pos, _)| pos)
            .ok_or_else(|| {
                ProbeError::page(format!(
                    "element {}[{}] is detached",
                    handle.selector, handle.index
                ))
            })
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        let state = self.state.get_mut();
        state.call_history.push(format!("goto:{url}"));
        Self::check(state, "goto")?;
        state.url = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> ProbeResult<()> {
        let mut state = self.state.lock().await;
        state.call_history.push("wait_for_network_idle".to_string());
        Self::check(&state, "wait_for_network_idle")
    }

    async fn query_all(&self, selector: &str) -> ProbeResult<Vec<ElementHandle>> {
        let mut state = self.state.lock().await;
        state.call_history.push(format!("query_all:{selector}"));
        Self::check(&state, "query_all")?;
        let parsed = SimpleSelector::parse(selector)?;
        Ok(state
            .elements
            .iter()
            .filter(|e| parsed.matches(e))
            .enumerate()
            .map(|(i, e)| ElementHandle::new(selector, i, e.tag.clone()))
            .collect())
    }

    async fn text_content(&self, element: &ElementHandle) -> ProbeResult<String> {
        let mut state = self.state.lock().await;
        Self::check(&state, "text_content")?;
        let pos = Self::resolve(&state, element)?;
        let text = state.elements[pos].text.clone();
        Self::tick_pending(&mut state);
        Ok(text)
    }

    async fn click(&self, element: &ElementHandle) -> ProbeResult<()> {
        let mut state = self.state.lock().await;
        state.call_history.push(format!("click:{}", element.selector));
        Self::check(&state, "click")?;
        Self::resolve(&state, element).map(|_| ())
    }

    async fn clear(&self, element: &ElementHandle) -> ProbeResult<()> {
        let mut state = self.state.lock().await;
        state.call_history.push(format!("clear:{}", element.selector));
        Self::check(&state, "clear")?;
        let pos = Self::resolve(&state, element)?;
        state.elements[pos].text.clear();
        if let Some(target) = state.output_target {
            if let Some(out) = state.elements.get_mut(target) {
                out.text.clear();
            }
        }
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
        let mut state = self.state.lock().await;
        state.call_history.push(format!("fill:{text}"));
        Self::check(&state, "fill")?;
        Self::resolve(&state, element)?;
        let translated = state.translations.get(text).cloned().unwrap_or_default();
        if state.lag_reads == 0 {
            Self::write_output(&mut state, translated);
        } else {
            let lag = state.lag_reads;
            state.pending = Some((translated, lag));
        }
        Ok(())
    }

    async fn body_text(&self) -> ProbeResult<String> {
        let state = self.state.lock().await;
        Self::check(&state, "body_text")?;
        Ok(state
            .elements
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        let mut state = self.state.lock().await;
        state.call_history.push(format!("screenshot:{full_page}"));
        if state.failing.contains("screenshot") {
            return Err(ProbeError::Screenshot {
                message: "mock failure in screenshot".to_string(),
            });
        }
        // PNG magic bytes
        Ok(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    }

    async fn pause(&self, duration: Duration) {
        let mut state = self.state.lock().await;
        state.paused += duration;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn translator_page() -> MockDriver {
        MockDriver::new()
            .with_element(MockElement::new("textarea").attr("placeholder", "Input Your Singlish Text Here."))
            .with_element(MockElement::new("div").class("w-full").class("bg-slate-50"))
            .with_output_target(1)
            .with_translation("mama", "මම")
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn test_parse_tag_only() {
            let s = SimpleSelector::parse("div").unwrap();
            assert_eq!(s.tag.as_deref(), Some("div"));
            assert!(s.class.is_none());
        }

        #[test]
        fn test_parse_tag_and_class() {
            let s = SimpleSelector::parse("div.bg-slate-50").unwrap();
            assert_eq!(s.class.as_deref(), Some("bg-slate-50"));
        }

        #[test]
        fn test_parse_attribute_contains() {
            let s = SimpleSelector::parse(r#"textarea[placeholder*="Singlish"]"#).unwrap();
            assert_eq!(
                s.attr_contains,
                Some(("placeholder".to_string(), "Singlish".to_string()))
            );
        }

        #[test]
        fn test_unsupported_selector() {
            assert!(SimpleSelector::parse("div > span").is_err());
            assert!(SimpleSelector::parse("").is_err());
        }

        #[test]
        fn test_class_attribute_substring() {
            let s = SimpleSelector::parse(r#"div[class*="slate"]"#).unwrap();
            assert!(s.matches(&MockElement::new("div").class("bg-slate-50")));
            assert!(!s.matches(&MockElement::new("span").class("bg-slate-50")));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_goto_records_url() {
            let mut driver = MockDriver::new();
            driver.goto("https://example.com").await.unwrap();
            assert_eq!(driver.current_url().await, "https://example.com");
            assert!(driver.was_called("goto").await);
        }

        #[tokio::test]
        async fn test_query_all_document_order() {
            let driver = MockDriver::new()
                .with_element(MockElement::new("div").text("a"))
                .with_element(MockElement::new("p").text("b"))
                .with_element(MockElement::new("div").text("c"));
            let divs = driver.query_all("div").await.unwrap();
            assert_eq!(divs.len(), 2);
            assert_eq!(driver.text_content(&divs[1]).await.unwrap(), "c");
        }

        #[tokio::test]
        async fn test_fill_writes_translation() {
            let driver = translator_page();
            let input = driver.query_all("textarea").await.unwrap().remove(0);
            driver.fill(&input, "mama").await.unwrap();
            assert_eq!(driver.element_text(1).await.as_deref(), Some("මම"));
        }

        #[tokio::test]
        async fn test_clear_empties_output() {
            let driver = translator_page();
            let input = driver.query_all("textarea").await.unwrap().remove(0);
            driver.fill(&input, "mama").await.unwrap();
            driver.clear(&input).await.unwrap();
            assert_eq!(driver.element_text(1).await.as_deref(), Some(""));
        }

        #[tokio::test]
        async fn test_failure_injection() {
            let driver = translator_page().failing_on("fill");
            let input = driver.query_all("textarea").await.unwrap().remove(0);
            let err = driver.fill(&input, "mama").await.unwrap_err();
            assert!(err.to_string().contains("mock failure in fill"));
        }

        #[tokio::test]
        async fn test_pause_is_recorded_not_slept() {
            let driver = MockDriver::new();
            driver.pause(Duration::from_secs(7)).await;
            driver.pause(Duration::from_millis(300)).await;
            assert_eq!(driver.total_paused().await, Duration::from_millis(7300));
        }

        #[tokio::test]
        async fn test_detached_handle() {
            let driver = MockDriver::new();
            let ghost = ElementHandle::new("div", 3, "div");
            assert!(driver.text_content(&ghost).await.is_err());
        }

        #[tokio::test]
        async fn test_screenshot_returns_png_magic() {
            let driver = MockDriver::new();
            let png = driver.screenshot(true).await.unwrap();
            assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
        }
    }

    #[test]
    fn test_element_handle_is_tag() {
        let handle = ElementHandle::new("div.h-80", 0, "div");
        assert!(handle.is_tag("DIV"));
        assert!(!handle.is_tag("span"));
    }
}
