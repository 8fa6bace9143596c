//! Result and error types for swiftcheck.

use thiserror::Error;

/// Result type for swiftcheck operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the translator page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No text-entry control could be identified on the page
    #[error("Input field not found: {message}")]
    ElementNotFound {
        /// Error message
        message: String,
    },

    /// Scraped output was too weak to use
    #[error("Extracted output is degenerate: {message}")]
    ExtractionDegenerate {
        /// Error message
        message: String,
    },

    /// Any other failure while executing a test case
    #[error("Test execution error: {message}")]
    Execution {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page interaction error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Forced assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Fixture could not be loaded or is invalid
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Report externalization failed
    #[error("Report error: {message}")]
    Report {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create an execution error
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create a report error
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Message without the variant prefix, as written into result records
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::ExtractionDegenerate { message }
            | Self::Execution { message }
            | Self::BrowserLaunch { message }
            | Self::Page { message }
            | Self::Screenshot { message }
            | Self::AssertionFailed { message }
            | Self::Fixture { message }
            | Self::Report { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
