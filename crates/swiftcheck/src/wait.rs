//! Translation wait policies.
//!
//! The page translates as the user types and gives no completion signal.
//! Two policies exist:
//!
//! - **Fixed** (default): sleep for the length bucket's duration (S 3s,
//!   M 5s, L 7s).
//! - **Stabilize**: poll the output text and stop once it has read the same
//!   non-empty value for `stable_polls` consecutive polls, or when the
//!   bucket's ceiling is reached. Reads equal to the text captured before the
//!   input was typed never count, so stale output cannot settle the wait.
//!
//! Polling is counted, not timed: the number of polls is
//! `ceil(ceiling / poll_interval)`, so the policy is deterministic under a
//! driver whose `pause` does not really sleep.

use crate::driver::{ElementHandle, PageDriver};
use crate::fixture::LengthType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Ceiling for short inputs
pub const SHORT_WAIT_MS: u64 = 3000;

/// Ceiling for medium inputs
pub const MEDIUM_WAIT_MS: u64 = 5000;

/// Ceiling for long inputs
pub const LONG_WAIT_MS: u64 = 7000;

/// Default output polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default number of identical reads that count as stable
pub const DEFAULT_STABLE_POLLS: u32 = 3;

/// Network idle threshold (500ms without new resources)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// Network idle polling interval
pub const NETWORK_IDLE_POLL_MS: u64 = 100;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// How to wait for the translation to appear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitPolicy {
    /// Unconditional sleep for the bucket's ceiling
    #[default]
    Fixed,
    /// Poll until the output changes and then stops changing
    Stabilize,
}

/// Wait configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Policy
    pub policy: WaitPolicy,
    /// Ceiling for `S` inputs (ms)
    pub short_ms: u64,
    /// Ceiling for `M` inputs (ms)
    pub medium_ms: u64,
    /// Ceiling for `L` inputs (ms)
    pub long_ms: u64,
    /// Interval between output reads (ms)
    pub poll_interval_ms: u64,
    /// Consecutive identical reads required
    pub stable_polls: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            policy: WaitPolicy::default(),
            short_ms: SHORT_WAIT_MS,
            medium_ms: MEDIUM_WAIT_MS,
            long_ms: LONG_WAIT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stable_polls: DEFAULT_STABLE_POLLS,
        }
    }
}

impl WaitConfig {
    /// Fixed-sleep configuration with the default ceilings
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            policy: WaitPolicy::Fixed,
            ..Self::default()
        }
    }

    /// Stabilization polling with the default ceilings
    #[must_use]
    pub fn stabilize() -> Self {
        Self {
            policy: WaitPolicy::Stabilize,
            ..Self::default()
        }
    }

    /// Ceiling for a length bucket
    #[must_use]
    pub const fn ceiling(&self, length: LengthType) -> Duration {
        let ms = match length {
            LengthType::S => self.short_ms,
            LengthType::M => self.medium_ms,
            LengthType::L => self.long_ms,
        };
        Duration::from_millis(ms)
    }

    /// Poll interval, never zero
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Number of polls that fit in the bucket's ceiling (at least one)
    #[must_use]
    pub fn max_polls(&self, length: LengthType) -> u64 {
        let ceiling = match length {
            LengthType::S => self.short_ms,
            LengthType::M => self.medium_ms,
            LengthType::L => self.long_ms,
        };
        ceiling.div_ceil(self.poll_interval_ms.max(1)).max(1)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a translation wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the output settled before the ceiling
    pub settled: bool,
    /// Time spent waiting
    pub waited: Duration,
    /// Number of output reads
    pub polls: u64,
}

impl WaitResult {
    fn fixed(waited: Duration) -> Self {
        Self {
            settled: false,
            waited,
            polls: 0,
        }
    }
}

// =============================================================================
// WAITING
// =============================================================================

async fn read_output<D: PageDriver + ?Sized>(driver: &D, field: Option<&ElementHandle>) -> String {
    let text = match field {
        Some(field) => driver.text_content(field).await,
        None => driver.body_text().await,
    };
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}

/// Output text as it stands before the input is typed.
///
/// Pass it to [`wait_for_translation_since`] as the baseline.
pub async fn snapshot_output<D: PageDriver + ?Sized>(
    driver: &D,
    output_field: Option<&ElementHandle>,
) -> String {
    read_output(driver, output_field).await
}

/// Wait for the translation of an input in the given length bucket, with no
/// baseline text.
pub async fn wait_for_translation<D: PageDriver + ?Sized>(
    driver: &D,
    config: &WaitConfig,
    length: LengthType,
    output_field: Option<&ElementHandle>,
) -> WaitResult {
    wait_for_translation_since(driver, config, length, output_field, "").await
}

/// Wait for the translation of an input in the given length bucket.
///
/// Under the stabilize policy a read equal to `baseline` (the output before
/// typing) resets the count. With no located output field the body text is
/// watched instead.
pub async fn wait_for_translation_since<D: PageDriver + ?Sized>(
    driver: &D,
    config: &WaitConfig,
    length: LengthType,
    output_field: Option<&ElementHandle>,
    baseline: &str,
) -> WaitResult {
    let ceiling = config.ceiling(length);

    if config.policy == WaitPolicy::Fixed {
        debug!(?ceiling, "fixed translation wait");
        driver.pause(ceiling).await;
        return WaitResult::fixed(ceiling);
    }

    let interval = config.poll_interval();
    let max_polls = config.max_polls(length);
    let required = config.stable_polls.max(1);
    let baseline = baseline.trim();
    let mut waited = Duration::ZERO;
    let mut last = String::new();
    let mut run = 0u32;

    for poll in 1..=max_polls {
        driver.pause(interval).await;
        waited += interval;

        let text = read_output(driver, output_field).await;
        if text.is_empty() || text == baseline {
            run = 0;
        } else if text == last {
            run += 1;
        } else {
            run = 1;
        }
        last = text;

        if run >= required {
            debug!(polls = poll, ?waited, "translation settled");
            return WaitResult {
                settled: true,
                waited,
                polls: poll,
            };
        }
    }

    debug!(?waited, "translation wait hit ceiling");
    WaitResult {
        settled: false,
        waited,
        polls: max_polls,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};

    mod config_tests {
        use super::*;

        #[test]
        fn test_default_ceilings() {
            let config = WaitConfig::default();
            assert_eq!(config.policy, WaitPolicy::Fixed);
            assert_eq!(config.ceiling(LengthType::S), Duration::from_millis(3000));
            assert_eq!(config.ceiling(LengthType::M), Duration::from_millis(5000));
            assert_eq!(config.ceiling(LengthType::L), Duration::from_millis(7000));
        }

        #[test]
        fn test_max_polls_rounds_up() {
            let config = WaitConfig {
                poll_interval_ms: 400,
                ..WaitConfig::default()
            };
            assert_eq!(config.max_polls(LengthType::S), 8);
            assert_eq!(config.max_polls(LengthType::L), 18);
        }

        #[test]
        fn test_zero_interval_is_clamped() {
            let config = WaitConfig {
                poll_interval_ms: 0,
                short_ms: 0,
                ..WaitConfig::default()
            };
            assert_eq!(config.poll_interval(), Duration::from_millis(1));
            assert_eq!(config.max_polls(LengthType::S), 1);
        }

        #[test]
        fn test_policy_yaml() {
            let config: WaitConfig =
                serde_yaml_ng::from_str("policy: stabilize\nlong_ms: 9000\n").unwrap();
            assert_eq!(config.policy, WaitPolicy::Stabilize);
            assert_eq!(config.long_ms, 9000);
            assert_eq!(config.short_ms, SHORT_WAIT_MS);
        }
    }

    mod wait_tests {
        use super::*;

        fn page_with_output(text: &str) -> (MockDriver, ElementHandle) {
            let driver = MockDriver::new().with_element(MockElement::new("div").class("h-80").text(text));
            (driver, ElementHandle::new("div.h-80", 0, "div"))
        }

        #[tokio::test]
        async fn test_fixed_sleeps_full_ceiling() {
            let (driver, field) = page_with_output("මම");
            let result =
                wait_for_translation(&driver, &WaitConfig::fixed(), LengthType::M, Some(&field)).await;
            assert!(!result.settled);
            assert_eq!(driver.total_paused().await, Duration::from_millis(5000));
        }

        #[tokio::test]
        async fn test_stable_output_returns_early() {
            let (driver, field) = page_with_output("මම පාසලට යනවා");
            let result =
                wait_for_translation(&driver, &WaitConfig::stabilize(), LengthType::L, Some(&field)).await;
            assert!(result.settled);
            assert_eq!(result.polls, 3);
            assert_eq!(driver.total_paused().await, Duration::from_millis(750));
        }

        #[tokio::test]
        async fn test_empty_output_waits_until_ceiling() {
            let (driver, field) = page_with_output("");
            let result =
                wait_for_translation(&driver, &WaitConfig::stabilize(), LengthType::S, Some(&field)).await;
            assert!(!result.settled);
            assert_eq!(result.polls, 12);
            assert_eq!(result.waited, Duration::from_millis(3000));
        }

        #[tokio::test]
        async fn test_watches_body_without_field() {
            let driver = MockDriver::new().with_element(MockElement::new("p").text("ඔහු"));
            let result = wait_for_translation(&driver, &WaitConfig::stabilize(), LengthType::S, None).await;
            assert!(result.settled);
        }

        #[tokio::test]
        async fn test_default_policy_sleeps_full_bucket() {
            let (driver, field) = page_with_output("Sinhala");
            let result =
                wait_for_translation(&driver, &WaitConfig::default(), LengthType::L, Some(&field)).await;
            assert!(!result.settled);
            assert_eq!(result.waited, Duration::from_millis(7000));
            assert_eq!(driver.total_paused().await, Duration::from_millis(7000));
        }

        fn late_translator() -> (MockDriver, ElementHandle, ElementHandle) {
            let driver = MockDriver::new()
                .with_element(MockElement::new("textarea"))
                .with_element(MockElement::new("div").class("h-80").text("Sinhala"))
                .with_output_target(1)
                .with_translation("mama pasalata yanawa", "මම පාසලට යනවා")
                .with_translation_lag(6);
            (
                driver,
                ElementHandle::new("textarea", 0, "textarea"),
                ElementHandle::new("div.h-80", 0, "div"),
            )
        }

        #[tokio::test]
        async fn test_stale_output_does_not_settle() {
            let (driver, input, field) = late_translator();
            let baseline = snapshot_output(&driver, Some(&field)).await;
            assert_eq!(baseline, "Sinhala");
            driver.fill(&input, "mama pasalata yanawa").await.unwrap();

            let result = wait_for_translation_since(
                &driver,
                &WaitConfig::stabilize(),
                LengthType::L,
                Some(&field),
                &baseline,
            )
            .await;
            assert!(result.settled);
            assert!(result.polls > 6);
            assert_eq!(
                driver.text_content(&field).await.unwrap(),
                "මම පාසලට යනවා"
            );
        }
    }
}
