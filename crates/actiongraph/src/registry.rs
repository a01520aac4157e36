//! Selector Registry - persisted map of logical selector id to locator
//! metadata.
//!
//! The on-disk document is
//!
//! ```json
//! {
//!   "version": "2026-10-18",
//!   "lastScanned": "2026-10-18T09:30:00Z",
//!   "selectors": {
//!     "log-in-button": {
//!       "id": "log-in-button",
//!       "type": "role",
//!       "selector": "role=button[name=\"Log in\"]",
//!       "priority": 1,
//!       "lastSeen": "2026-10-18T09:30:00Z",
//!       "stability": "high",
//!       "page": "/login",
//!       "accessible": true
//!     }
//!   }
//! }
//! ```
//!
//! Ids are lower-cased and unique. A write replaces an existing entry only
//! when the incoming priority number is lower (more preferred) or the id is
//! new; see [`SelectorRegistry::upsert`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::locator::Locator;

/// Default registry location, relative to the working directory
pub const DEFAULT_REGISTRY_PATH: &str = ".actiongraph/selectors.json";

/// Environment variable overriding the registry location
pub const REGISTRY_PATH_ENV: &str = "ACTIONGRAPH_REGISTRY_PATH";

/// Lowest-preference priority value
pub const MAX_PRIORITY: u8 = 4;

/// Errors from registry load/save
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File could not be read or written
    #[error("Registry I/O error at {path}: {source}")]
    Io {
        /// Registry path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not a valid registry document
    #[error("Invalid registry document {path}: {source}")]
    Parse {
        /// Registry path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Registry could not be serialized
    #[error("Failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Entry violates a registry invariant
    #[error("Invalid selector entry '{id}': {message}")]
    InvalidEntry {
        /// Entry id
        id: String,
        /// What is wrong
        message: String,
    },
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Locator engine of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    /// Accessible role + name
    Role,
    /// Associated label text
    Label,
    /// `data-testid`
    #[serde(rename = "testid")]
    TestId,
    /// Raw CSS
    Css,
}

impl SelectorType {
    /// All selector types, most preferred first
    pub const ALL: [Self; 4] = [Self::Role, Self::Label, Self::TestId, Self::Css];

    /// Lower-case wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Label => "label",
            Self::TestId => "testid",
            Self::Css => "css",
        }
    }

    /// Priority assigned to candidates of this type during collection
    #[must_use]
    pub const fn default_priority(self) -> u8 {
        match self {
            Self::Role => 1,
            Self::Label => 2,
            Self::TestId => 3,
            Self::Css => 4,
        }
    }

    /// Stability class assigned to candidates of this type during collection
    #[must_use]
    pub const fn default_stability(self) -> Stability {
        match self {
            Self::Role => Stability::High,
            Self::Label | Self::TestId => Stability::Medium,
            Self::Css => Stability::Low,
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "role" => Ok(Self::Role),
            "label" => Ok(Self::Label),
            "testid" | "test-id" | "test_id" => Ok(Self::TestId),
            "css" => Ok(Self::Css),
            other => Err(format!("unknown selector type '{other}'")),
        }
    }
}

/// How likely a selector is to survive UI changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// Semantic locators
    High,
    /// Label and test-id locators
    Medium,
    /// Structural CSS
    Low,
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorEntry {
    /// Logical id (lower-case)
    pub id: String,
    /// Locator engine
    #[serde(rename = "type")]
    pub kind: SelectorType,
    /// Raw locator string
    pub selector: String,
    /// 1 = most preferred, 4 = least
    pub priority: u8,
    /// When the selector was last observed on the page
    pub last_seen: DateTime<Utc>,
    /// Stability class
    pub stability: Stability,
    /// Route the selector belongs to
    pub page: String,
    /// Whether the locator is accessibility-based
    pub accessible: bool,
}

impl SelectorEntry {
    /// Create an entry with the type's default priority and stability.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: SelectorType,
        selector: impl Into<String>,
        page: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into().to_lowercase(),
            kind,
            selector: selector.into(),
            priority: kind.default_priority(),
            last_seen: Utc::now(),
            stability: kind.default_stability(),
            page: page.into(),
            accessible: matches!(kind, SelectorType::Role | SelectorType::Label),
        }
    }

    /// Override the priority (clamped to 1..=4)
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, MAX_PRIORITY);
        self
    }

    /// Override the stability class
    #[must_use]
    pub const fn with_stability(mut self, stability: Stability) -> Self {
        self.stability = stability;
        self
    }

    /// Override the accessibility flag
    #[must_use]
    pub const fn with_accessible(mut self, accessible: bool) -> Self {
        self.accessible = accessible;
        self
    }

    /// Set the last-seen timestamp
    #[must_use]
    pub const fn seen_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen = at;
        self
    }

    /// Parsed locator for this entry
    #[must_use]
    pub fn locator(&self) -> Locator {
        Locator::for_entry(self.kind, &self.selector)
    }

    /// Names of the tracked fields that differ from `other`.
    ///
    /// `lastSeen` and `stability` are bookkeeping and never count as drift.
    #[must_use]
    pub fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.selector != other.selector {
            changed.push("selector");
        }
        if self.kind != other.kind {
            changed.push("type");
        }
        if self.priority != other.priority {
            changed.push("priority");
        }
        if self.accessible != other.accessible {
            changed.push("accessible");
        }
        if self.page != other.page {
            changed.push("page");
        }
        changed
    }

    /// Lower-case haystack used for token containment checks
    pub(crate) fn search_text(&self) -> String {
        format!("{} {} {}", self.id, self.selector, self.page).to_lowercase()
    }

    fn validate(&self) -> RegistryResult<()> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::InvalidEntry {
                id: self.id.clone(),
                message: "id must not be empty".to_string(),
            });
        }
        if !(1..=MAX_PRIORITY).contains(&self.priority) {
            return Err(RegistryError::InvalidEntry {
                id: self.id.clone(),
                message: format!("priority {} is outside 1..={MAX_PRIORITY}", self.priority),
            });
        }
        Ok(())
    }
}

/// What happened to one entry during a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Id was new
    Inserted,
    /// Incoming priority was preferred
    Replaced,
    /// Existing entry kept
    Kept,
}

/// Counts from a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// New ids
    pub inserted: usize,
    /// Entries replaced by a preferred candidate
    pub replaced: usize,
    /// Entries left as they were
    pub kept: usize,
}

/// A route that could not be scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRoute {
    /// Route path
    pub route: String,
    /// Why it was skipped
    pub reason: String,
}

/// Fresh selector candidates collected from a set of routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// When the scan ran
    pub scanned_at: DateTime<Utc>,
    /// Application base URL
    pub base_url: String,
    /// Routes that were requested
    pub routes: Vec<String>,
    /// Routes that failed to load
    #[serde(default)]
    pub skipped_routes: Vec<SkippedRoute>,
    /// Candidates by id
    pub entries: BTreeMap<String, SelectorEntry>,
}

impl ScanResult {
    /// Empty scan stamped with the current time
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            scanned_at: Utc::now(),
            base_url: base_url.into(),
            routes: Vec::new(),
            skipped_routes: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Add a candidate, keeping the preferred one on id collision
    pub fn insert(&mut self, entry: SelectorEntry) {
        let mut entry = entry;
        entry.id = entry.id.to_lowercase();
        match self.entries.get(&entry.id) {
            Some(existing) if existing.priority <= entry.priority => {}
            _ => {
                self.entries.insert(entry.id.clone(), entry);
            }
        }
    }

    /// Routes that were scanned successfully
    pub fn scanned_routes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(String::as_str).filter(|route| {
            !self
                .skipped_routes
                .iter()
                .any(|skipped| skipped.route == *route)
        })
    }
}

/// Versioned selector registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRegistry {
    /// `YYYY-MM-DD` of the last write
    pub version: String,
    /// When a scan was last merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scanned: Option<DateTime<Utc>>,
    /// Entries by id
    #[serde(default)]
    pub selectors: BTreeMap<String, SelectorEntry>,
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorRegistry {
    /// Empty registry versioned today
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: Utc::now().format("%Y-%m-%d").to_string(),
            last_scanned: None,
            selectors: BTreeMap::new(),
        }
    }

    /// Registry path: explicit override, else `ACTIONGRAPH_REGISTRY_PATH`,
    /// else [`DEFAULT_REGISTRY_PATH`].
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        std::env::var_os(REGISTRY_PATH_ENV)
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH), PathBuf::from)
    }

    /// Load a registry document. A missing file is an empty registry.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "registry not found, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&content).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a registry document, normalizing ids to lower case.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: Self = serde_json::from_str(json)?;
        let mut registry = Self {
            version: raw.version,
            last_scanned: raw.last_scanned,
            selectors: BTreeMap::new(),
        };
        for (key, mut entry) in raw.selectors {
            let id = if entry.id.is_empty() { key } else { entry.id };
            entry.id = id.to_lowercase();
            registry.selectors.insert(entry.id.clone(), entry);
        }
        Ok(registry)
    }

    /// Pretty JSON with a trailing newline
    pub fn to_json(&self) -> RegistryResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the registry, creating parent directories.
    pub fn save(&self, path: &Path) -> RegistryResult<()> {
        let io_err = |source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_json()?).map_err(io_err)?;
        tracing::info!(path = %path.display(), selectors = self.len(), "registry saved");
        Ok(())
    }

    /// Look up an entry (case-insensitive id)
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SelectorEntry> {
        self.selectors.get(&id.to_lowercase())
    }

    /// Whether an id is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// All entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &SelectorEntry> {
        self.selectors.values()
    }

    /// Entries of one type in id order
    pub fn entries_of_type(&self, kind: SelectorType) -> impl Iterator<Item = &SelectorEntry> {
        self.selectors.values().filter(move |entry| entry.kind == kind)
    }

    /// Entries registered for a page
    pub fn entries_on_page<'a>(&'a self, page: &'a str) -> impl Iterator<Item = &'a SelectorEntry> {
        self.selectors.values().filter(move |entry| entry.page == page)
    }

    /// Insert or replace under the "lower priority number wins" rule.
    pub fn upsert(&mut self, entry: SelectorEntry) -> RegistryResult<UpsertOutcome> {
        let mut entry = entry;
        entry.id = entry.id.to_lowercase();
        entry.validate()?;
        let outcome = match self.selectors.get(&entry.id) {
            None => UpsertOutcome::Inserted,
            Some(existing) if entry.priority < existing.priority => UpsertOutcome::Replaced,
            Some(_) => return Ok(UpsertOutcome::Kept),
        };
        self.selectors.insert(entry.id.clone(), entry);
        Ok(outcome)
    }

    /// Unconditionally store an entry, returning the one it displaced.
    pub fn replace(&mut self, entry: SelectorEntry) -> RegistryResult<Option<SelectorEntry>> {
        let mut entry = entry;
        entry.id = entry.id.to_lowercase();
        entry.validate()?;
        Ok(self.selectors.insert(entry.id.clone(), entry))
    }

    /// Remove an entry
    pub fn remove(&mut self, id: &str) -> Option<SelectorEntry> {
        self.selectors.remove(&id.to_lowercase())
    }

    /// Merge a scan into the registry.
    ///
    /// Merging the same scan twice leaves the registry as merging it once:
    /// the version and `lastScanned` stamps come from the scan, not the clock.
    pub fn merge(&mut self, scan: &ScanResult) -> RegistryResult<MergeSummary> {
        let mut summary = MergeSummary::default();
        for entry in scan.entries.values() {
            match self.upsert(entry.clone())? {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Replaced => summary.replaced += 1,
                UpsertOutcome::Kept => summary.kept += 1,
            }
        }
        self.stamp(scan.scanned_at);
        tracing::info!(
            inserted = summary.inserted,
            replaced = summary.replaced,
            kept = summary.kept,
            "merged scan into registry"
        );
        Ok(summary)
    }

    pub(crate) fn stamp(&mut self, at: DateTime<Utc>) {
        self.version = at.format("%Y-%m-%d").to_string();
        self.last_scanned = Some(at);
    }
}
