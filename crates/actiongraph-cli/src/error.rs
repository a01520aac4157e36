//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Requested graph does not exist
    #[error("No stored graph for {what}")]
    GraphNotFound {
        /// Spec id and optional scenario
        what: String,
    },

    /// Some inputs of a batch failed
    #[error("{failed} of {total} scenario files failed to build")]
    BatchFailed {
        /// Failed inputs
        failed: usize,
        /// All inputs
        total: usize,
    },

    /// Replay finished with failures
    #[error("Replay failed: {message}")]
    ReplayFailed {
        /// Error message
        message: String,
    },

    /// Drift found with `--fail-on-drift`
    #[error("Selector drift detected: {missing} missing, {updated} updated, {new} new")]
    DriftDetected {
        /// Missing entries
        missing: usize,
        /// Updated entries
        updated: usize,
        /// New entries
        new: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error("[{code}] {0}", code = .0.code())]
    ActionGraph(#[from] actiongraph::ActionGraphError),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
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

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap anything convertible into the library error
    #[must_use]
    pub fn library(err: impl Into<actiongraph::ActionGraphError>) -> Self {
        Self::ActionGraph(err.into())
    }
}

impl From<actiongraph::config::ConfigError> for CliError {
    fn from(err: actiongraph::config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use actiongraph::graph::StoreError;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_library_error_carries_code() {
        let err = CliError::library(StoreError::MissingScenarioName);
        assert!(err.to_string().starts_with("[graph_store_failed]"));
    }

    #[test]
    fn test_drift_error_message() {
        let err = CliError::DriftDetected {
            missing: 1,
            updated: 0,
            new: 2,
        };
        assert_eq!(
            err.to_string(),
            "Selector drift detected: 1 missing, 0 updated, 2 new"
        );
    }

    #[test]
    fn test_batch_error_message() {
        let err = CliError::BatchFailed { failed: 1, total: 3 };
        assert!(err.to_string().contains("1 of 3"));
    }
}
