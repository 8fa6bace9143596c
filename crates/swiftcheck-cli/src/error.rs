//! CLI errors. Library failures arrive wrapped in [`CliError::Probe`].

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Everything a subcommand can fail with
#[derive(Debug, Error)]
pub enum CliError {
    /// Config file unreadable or malformed
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Suite could not run, or cases were reported failed
    #[error("Test execution failed: {message}")]
    TestExecution {
        /// Error message
        message: String,
    },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness library error
    #[error("{0}")]
    Probe(#[from] swiftcheck::ProbeError),

    /// Flag value out of range or filters matching nothing
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Backup could not be turned into a spreadsheet
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a test execution error
    #[must_use]
    pub fn test_execution(message: impl Into<String>) -> Self {
        Self::TestExecution {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_test_execution_error() {
        let err = CliError::test_execution("3 case(s) failed");
        assert!(err.to_string().contains("Test execution"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("workers must be positive");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_report_generation_error() {
        let err = CliError::report_generation("no records");
        assert!(err.to_string().contains("Report"));
    }

    #[test]
    fn test_probe_error_from() {
        let err: CliError = swiftcheck::ProbeError::Timeout { ms: 30_000 }.into();
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
