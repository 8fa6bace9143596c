//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature this module launches Chromium through
//! chromiumoxide and exposes each tab as a [`crate::PageDriver`]. Every DOM
//! query is a small JavaScript expression evaluated in the page, so the
//! driver never holds remote object ids across a reload.

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Quote a string as a JavaScript literal
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Expression evaluating to the `index`-th match of `selector` (or undefined)
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn js_element(selector: &str, index: usize) -> String {
    format!("document.querySelectorAll({})[{index}]", js_string(selector))
}

/// Expression listing lowercase tag names of all matches
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn js_tag_names(selector: &str) -> String {
    format!(
        "Array.prototype.map.call(document.querySelectorAll({}), function (el) {{ return el.tagName.toLowerCase(); }})",
        js_string(selector)
    )
}

/// Expression returning the element's textContent, or null when detached
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn js_text_content(selector: &str, index: usize) -> String {
    format!(
        "[{}].map(function (el) {{ return el ? (el.textContent || '') : null; }})[0]",
        js_element(selector, index)
    )
}

/// Expression setting a control's value through the native setter so
/// framework-managed inputs see the change, then firing `input`
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn js_set_value(selector: &str, index: usize, text: &str) -> String {
    format!(
        "[{}].map(function (el) {{ \
            if (!el) {{ return false; }} \
            el.focus(); \
            var proto = Object.getPrototypeOf(el); \
            var desc = Object.getOwnPropertyDescriptor(proto, 'value'); \
            if (desc && desc.set) {{ desc.set.call(el, {text}); }} else {{ el.value = {text}; }} \
            el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
            el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
            return true; \
        }})[0]",
        js_element(selector, index),
        text = js_string(text)
    )
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const JS_BODY_TEXT: &str = "document.body ? document.body.textContent : ''";

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const JS_NETWORK_PROBE: &str =
    "[document.readyState, performance.getEntriesByType('resource').length]";

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::{
        js_set_value, js_tag_names, js_text_content, BrowserConfig, JS_BODY_TEXT,
        JS_NETWORK_PROBE,
    };
    use crate::driver::{DriverFactory, ElementHandle, PageDriver};
    use crate::result::{ProbeError, ProbeResult};
    use crate::wait::{NETWORK_IDLE_POLL_MS, NETWORK_IDLE_THRESHOLD_MS};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
    use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::time::{Duration, Instant};
    use tracing::debug;

    /// Running Chromium instance
    #[derive(Debug)]
    pub struct ChromiumBrowser {
        config: BrowserConfig,
        inner: CdpBrowser,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumBrowser {
        /// Launch a new browser instance
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        debug!("CDP handler loop ended");
                        break;
                    }
                }
            });

            Ok(Self {
                config,
                inner: browser,
                handle,
            })
        }

        /// Open a new tab
        ///
        /// # Errors
        ///
        /// Returns error if the tab cannot be created
        pub async fn new_driver(&self) -> ProbeResult<ChromiumDriver> {
            let page = self
                .inner
                .new_page("about:blank")
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            Ok(ChromiumDriver { page })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Returns error if the browser does not shut down cleanly
        pub async fn close(mut self) -> ProbeResult<()> {
            self.inner
                .close()
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            self.handle.abort();
            Ok(())
        }
    }

    /// One browser tab
    #[derive(Debug)]
    pub struct ChromiumDriver {
        page: CdpPage,
    }

    impl ChromiumDriver {
        async fn eval<T: DeserializeOwned>(&self, expression: String) -> ProbeResult<T> {
            let params = EvaluateParams::builder()
                .expression(expression)
                .return_by_value(true)
                .build()
                .map_err(ProbeError::page)?;
            let result = self
                .page
                .evaluate_expression(params)
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            result
                .into_value()
                .map_err(|e| ProbeError::page(e.to_string()))
        }

        /// Close the tab
        ///
        /// # Errors
        ///
        /// Returns error if the tab cannot be closed
        pub async fn close(self) -> ProbeResult<()> {
            self.page
                .close()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))
        }
    }

    #[async_trait]
    impl DriverFactory for ChromiumBrowser {
        type Driver = ChromiumDriver;

        async fn create(&self) -> ProbeResult<ChromiumDriver> {
            self.new_driver().await
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn goto(&mut self, url: &str) -> ProbeResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn wait_for_network_idle(&self, timeout: Duration) -> ProbeResult<()> {
            let start = Instant::now();
            let threshold = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
            let mut last_count = None;
            let mut quiet_since = Instant::now();

            loop {
                let (ready_state, count): (String, u64) =
                    self.eval(JS_NETWORK_PROBE.to_string()).await?;
                if last_count != Some(count) || ready_state != "complete" {
                    last_count = Some(count);
                    quiet_since = Instant::now();
                } else if quiet_since.elapsed() >= threshold {
                    debug!(resources = count, "network idle");
                    return Ok(());
                }
                if start.elapsed() >= timeout {
                    return Err(ProbeError::Timeout {
                        ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                tokio::time::sleep(Duration::from_millis(NETWORK_IDLE_POLL_MS)).await;
            }
        }

        async fn query_all(&self, selector: &str) -> ProbeResult<Vec<ElementHandle>> {
            let tags: Vec<String> = self.eval(js_tag_names(selector)).await?;
            Ok(tags
                .into_iter()
                .enumerate()
                .map(|(i, tag)| ElementHandle::new(selector, i, tag))
                .collect())
        }

        async fn text_content(&self, element: &ElementHandle) -> ProbeResult<String> {
            let text: Option<String> = self
                .eval(js_text_content(&element.selector, element.index))
                .await?;
            text.ok_or_else(|| {
                ProbeError::page(format!(
                    "element {}[{}] is detached",
                    element.selector, element.index
                ))
            })
        }

        async fn click(&self, element: &ElementHandle) -> ProbeResult<()> {
            let elements = self
                .page
                .find_elements(element.selector.as_str())
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            let target = elements.get(element.index).ok_or_else(|| {
                ProbeError::page(format!(
                    "element {}[{}] is detached",
                    element.selector, element.index
                ))
            })?;
            target
                .click()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            Ok(())
        }

        async fn clear(&self, element: &ElementHandle) -> ProbeResult<()> {
            self.fill(element, "").await
        }

        async fn fill(&self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
            let ok: bool = self
                .eval(js_set_value(&element.selector, element.index, text))
                .await?;
            if ok {
                Ok(())
            } else {
                Err(ProbeError::page(format!(
                    "element {}[{}] is detached",
                    element.selector, element.index
                )))
            }
        }

        async fn body_text(&self) -> ProbeResult<String> {
            self.eval(JS_BODY_TEXT.to_string()).await
        }

        async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(full_page)
                .build();
            self.page
                .screenshot(params)
                .await
                .map_err(|e| ProbeError::Screenshot {
                    message: e.to_string(),
                })
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumBrowser, ChromiumDriver};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_default_config() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert!(config.chromium_path.is_none());
        }

        #[test]
        fn test_builder() {
            let config = BrowserConfig::default()
                .with_headless(false)
                .with_viewport(800, 600)
                .with_chromium_path("/usr/bin/chromium")
                .with_no_sandbox();
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 800);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert!(!config.sandbox);
        }
    }

    mod script_tests {
        use super::*;

        #[test]
        fn test_selector_is_json_quoted() {
            let js = js_element(r#"textarea[placeholder*="Singlish"]"#, 0);
            assert_eq!(
                js,
                r#"document.querySelectorAll("textarea[placeholder*=\"Singlish\"]")[0]"#
            );
        }

        #[test]
        fn test_set_value_escapes_text() {
            let js = js_set_value("textarea", 0, "it's \"quoted\"\n");
            assert!(js.contains(r#""it's \"quoted\"\n""#));
            assert!(js.contains("new Event('input'"));
        }

        #[test]
        fn test_text_content_expression_is_not_a_function() {
            let js = js_text_content("div", 2);
            assert!(js.starts_with('['));
            assert!(js.contains("[2]"));
        }

        #[test]
        fn test_tag_names_expression() {
            let js = js_tag_names("div.h-80");
            assert!(js.starts_with("Array.prototype.map.call"));
            assert!(js.contains(r#""div.h-80""#));
        }
    }
}
