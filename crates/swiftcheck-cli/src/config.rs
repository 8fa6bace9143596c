//! CLI configuration

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use swiftcheck::HarnessConfig;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Map `-q` / `-v` count to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Log filter used when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "swiftcheck=error,swiftcheck_cli=error",
            Self::Normal => "swiftcheck=warn,swiftcheck_cli=warn",
            Self::Verbose => "swiftcheck=info,swiftcheck_cli=info",
            Self::Debug => "swiftcheck=debug,swiftcheck_cli=debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// JSON log lines instead of text
    pub log_json: bool,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set JSON logging
    #[must_use]
    pub const fn with_log_json(mut self, log_json: bool) -> Self {
        self.log_json = log_json;
        self
    }
}

/// Resolve the harness configuration: defaults, then `path`, then the
/// environment seen through `lookup`
pub fn load_harness_config<F>(path: Option<&Path>, lookup: F) -> CliResult<HarnessConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match path {
        Some(path) => HarnessConfig::load(path)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?,
        None => HarnessConfig::default(),
    };
    Ok(base.with_env(lookup))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Debug);
        }

        #[test]
        fn test_log_filter_levels() {
            assert!(Verbosity::Normal.log_filter().starts_with("swiftcheck=warn"));
            assert!(Verbosity::Verbose.log_filter().starts_with("swiftcheck=info"));
            assert!(Verbosity::Debug.log_filter().starts_with("swiftcheck=debug"));
        }

        #[test]
        fn test_predicates() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod harness_tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_defaults_without_file() {
            let config = load_harness_config(None, |_| None).unwrap();
            assert_eq!(config.base_url, swiftcheck::DEFAULT_BASE_URL);
        }

        #[test]
        fn test_env_overrides_file() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("swiftcheck.yaml");
            std::fs::write(&path, "base_url: http://file.test/\nworkers: 3\n").unwrap();

            let config = load_harness_config(Some(&path), |key| {
                (key == "SWIFTCHECK_BASE_URL").then(|| "http://env.test/".to_string())
            })
            .unwrap();
            assert_eq!(config.base_url, "http://env.test/");
            assert_eq!(config.workers, 3);
        }

        #[test]
        fn test_missing_file_is_config_error() {
            let err = load_harness_config(Some(Path::new("/nonexistent/x.yaml")), |_| None)
                .unwrap_err();
            assert!(err.to_string().contains("Configuration"));
        }
    }
}
