//! Result and error types for actiongraph.
//!
//! Every module owns a focused error enum; [`ActionGraphError`] unifies them so
//! automated pipelines can branch on [`ActionGraphError::code`] instead of
//! matching message text.

use thiserror::Error;

use crate::compiler::CompileError;
use crate::completion::CompletionError;
use crate::config::ConfigError;
use crate::drift::DriftError;
use crate::graph::{BuildError, StoreError};
use crate::page::PageError;
use crate::registry::RegistryError;
use crate::resolver::ResolveError;
use crate::runtime::InstructionError;

/// Result type for actiongraph operations
pub type ActionGraphResult<T> = Result<T, ActionGraphError>;

/// Errors that can occur anywhere in actiongraph
#[derive(Debug, Error)]
pub enum ActionGraphError {
    /// Graph could not be built or failed validation
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Graph persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Compiling a graph into artifacts failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A node's instruction cannot be executed
    #[error(transparent)]
    Instruction(#[from] InstructionError),

    /// A selector could not be resolved to exactly one element
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Selector registry read/write failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The page driver reported an error
    #[error(transparent)]
    Page(#[from] PageError),

    /// Completion service call failed
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Drift detection failed
    #[error(transparent)]
    Drift(#[from] DriftError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A replayed step assertion failed
    #[error("Assertion failed on {node_id}: {message}")]
    AssertionFailed {
        /// Node whose assertion failed
        node_id: String,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ActionGraphError {
    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Build(_) => "graph_build_failed",
            Self::Store(StoreError::Ambiguous { .. }) => "graph_scenario_ambiguous",
            Self::Store(_) => "graph_store_failed",
            Self::Compile(_) => "graph_compile_failed",
            Self::Instruction(_) => "instruction_invalid",
            Self::Resolve(ResolveError::Ambiguous { .. }) => "selector_ambiguous",
            Self::Resolve(ResolveError::NotFound { .. }) => "selector_not_found",
            Self::Resolve(_) => "selector_resolution_failed",
            Self::Registry(_) => "registry_failed",
            Self::Page(PageError::Timeout { .. }) => "page_timeout",
            Self::Page(_) => "page_failed",
            Self::Completion(err) => err.code.as_str(),
            Self::Drift(_) => "drift_failed",
            Self::Config(_) => "config_invalid",
            Self::AssertionFailed { .. } => "assertion_failed",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// Whether retrying the failed operation can succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Completion(err) => err.is_retriable(),
            Self::Page(PageError::Timeout { .. }) => true,
            _ => false,
        }
    }
}
