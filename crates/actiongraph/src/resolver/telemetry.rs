//! Resolution telemetry.
//!
//! Every attempt the resolver makes, successful or not, is reported to a
//! [`ResolutionSink`]. Closures implement the trait, so tests can collect
//! attempts into a `Mutex<Vec<_>>` while production code logs them through
//! [`TracingSink`].

use serde::Serialize;
use std::fmt;

use super::strategy::Strategy;

/// Where a tried selector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptSource {
    /// A registry entry
    Registry,
    /// Built from a DOM attribute pattern
    Attribute,
    /// Built from accessible text
    Heuristic,
}

/// Which step of resolution produced an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    /// Exact registry id shortcut
    RegistryId,
    /// Locator recorded on the graph node itself
    GraphLocator,
    /// A strategy of the chain
    Strategy(Strategy),
}

impl AttemptKind {
    /// Wire name (`id` for the shortcut)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegistryId => "id",
            Self::GraphLocator => "locator",
            Self::Strategy(strategy) => strategy.as_str(),
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AttemptKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One attempt against the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAttempt {
    /// Strategy (or id shortcut)
    pub strategy: AttemptKind,
    /// Selector text tried
    pub selector: String,
    /// Registry id, when the selector came from the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Lower-cased hint tokens
    pub tokens: Vec<String>,
    /// Candidate origin
    pub source: AttemptSource,
    /// Tag-satisfying matches; `None` when the attempt could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

impl fmt::Display for ResolutionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (strategy {}", self.selector, self.strategy)?;
        if let Some(id) = &self.entry_id {
            write!(f, ", entry {id}")?;
        }
        match self.match_count {
            Some(count) => write!(f, ", {count} match{})", if count == 1 { "" } else { "es" }),
            None => write!(f, ", not tried)"),
        }
    }
}

/// Receiver of resolution telemetry
pub trait ResolutionSink: Send + Sync {
    /// Record one attempt
    fn record(&self, attempt: &ResolutionAttempt);
}

impl<F> ResolutionSink for F
where
    F: Fn(&ResolutionAttempt) + Send + Sync,
{
    fn record(&self, attempt: &ResolutionAttempt) {
        self(attempt);
    }
}

/// Logs attempts at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ResolutionSink for TracingSink {
    fn record(&self, attempt: &ResolutionAttempt) {
        tracing::debug!(
            strategy = %attempt.strategy,
            selector = %attempt.selector,
            entry_id = attempt.entry_id.as_deref(),
            source = ?attempt.source,
            match_count = attempt.match_count,
            "selector attempt"
        );
    }
}
