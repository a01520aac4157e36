//! Graph persistence.
//!
//! Graphs live as JSON files named `{specId}__{scenarioSlug}.json`
//! (non-versioned) or `{specId}__{scenarioSlug}__v{epochMillis}.json`
//! (versioned, the default). Reads return the newest snapshot.

use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::model::{ActionGraph, BuildError};
use crate::slug::slugify;

/// Default store directory, relative to the working directory
pub const DEFAULT_GRAPHS_DIR: &str = ".actiongraph/graphs";

const SEPARATOR: &str = "__";
const VERSION_PREFIX: &str = "v";

/// Errors from graph persistence
#[derive(Debug, Error)]
pub enum StoreError {
    /// Graph has no scenario name to derive a filename from
    #[error("Graph requires a scenario name to be stored")]
    MissingScenarioName,

    /// Spec id cannot be used in a filename
    #[error("Spec id '{spec_id}' is not filesystem-safe")]
    InvalidSpecId {
        /// Offending spec id
        spec_id: String,
    },

    /// Several scenarios share the spec id and none was named
    #[error(
        "Spec '{spec_id}' has multiple scenarios ({}); pass a scenario name",
        scenarios.join(", ")
    )]
    Ambiguous {
        /// Spec id
        spec_id: String,
        /// Distinct scenario slugs found
        scenarios: Vec<String>,
    },

    /// Graph failed validation on write or read
    #[error("Invalid graph{}: {source}", describe_path(path))]
    InvalidGraph {
        /// File the graph came from
        path: Option<PathBuf>,
        /// Validation error
        #[source]
        source: BuildError,
    },

    /// Filesystem error
    #[error("Graph store I/O error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON error
    #[error("Graph JSON error at {path}: {source}")]
    Json {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A graph file in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGraph {
    /// Full path
    pub path: PathBuf,
    /// Spec id parsed from the filename
    pub spec_id: String,
    /// Scenario slug parsed from the filename
    pub scenario_slug: String,
    /// Epoch millis for versioned files
    pub version: Option<i64>,
}

impl StoredGraph {
    /// Filename without directories
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Parse `{spec}__{slug}[__v{millis}].json`
    fn parse(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".json")?;
        let mut parts = stem.split(SEPARATOR);
        let spec_id = parts.next()?.to_string();
        let scenario_slug = parts.next()?.to_string();
        let version = match parts.next() {
            None => None,
            Some(raw) => Some(raw.strip_prefix(VERSION_PREFIX)?.parse::<i64>().ok()?),
        };
        if parts.next().is_some() || spec_id.is_empty() || scenario_slug.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            spec_id,
            scenario_slug,
            version,
        })
    }
}

/// File-backed graph store
#[derive(Debug, Clone)]
pub struct GraphStore {
    root: PathBuf,
    versioned: bool,
}

impl GraphStore {
    /// Versioned store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            versioned: true,
        }
    }

    /// Toggle versioned filenames
    #[must_use]
    pub const fn with_versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    /// Store directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a graph, returning the written path.
    pub fn write(&self, graph: &ActionGraph) -> StoreResult<PathBuf> {
        let spec_id = graph.metadata.spec_id.as_str();
        check_spec_id(spec_id)?;
        let slug = slugify(&graph.metadata.scenario_name);
        if slug.is_empty() {
            return Err(StoreError::MissingScenarioName);
        }
        graph
            .validate()
            .map_err(|source| StoreError::InvalidGraph { path: None, source })?;

        std::fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let file_name = if self.versioned {
            let version = self.next_version(spec_id, &slug)?;
            format!("{spec_id}{SEPARATOR}{slug}{SEPARATOR}{VERSION_PREFIX}{version}.json")
        } else {
            format!("{spec_id}{SEPARATOR}{slug}.json")
        };
        let path = self.root.join(file_name);
        let json = graph.to_json().map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), graph_id = %graph.graph_id, "stored action graph");
        Ok(path)
    }

    /// Current epoch millis, bumped past any existing version so no
    /// snapshot is overwritten.
    fn next_version(&self, spec_id: &str, slug: &str) -> StoreResult<i64> {
        let now = Utc::now().timestamp_millis();
        let latest = self
            .list_by_spec(spec_id)?
            .into_iter()
            .filter(|g| g.scenario_slug == slug)
            .filter_map(|g| g.version)
            .max();
        Ok(match latest {
            Some(latest) if latest >= now => latest + 1,
            _ => now,
        })
    }

    /// Newest graph for a spec, optionally for one scenario.
    ///
    /// Returns `Ok(None)` when nothing matches. Without a scenario name, more
    /// than one distinct scenario under the spec is an error.
    pub fn read(&self, spec_id: &str, scenario_name: Option<&str>) -> StoreResult<Option<ActionGraph>> {
        let Some(stored) = self.find(spec_id, scenario_name)? else {
            return Ok(None);
        };
        self.load(&stored.path).map(Some)
    }

    /// Newest matching file, without loading it
    pub fn find(&self, spec_id: &str, scenario_name: Option<&str>) -> StoreResult<Option<StoredGraph>> {
        let mut candidates = self.list_by_spec(spec_id)?;
        match scenario_name {
            Some(name) => {
                let slug = slugify(name);
                candidates.retain(|g| g.scenario_slug == slug);
            }
            None => {
                let mut scenarios: Vec<String> =
                    candidates.iter().map(|g| g.scenario_slug.clone()).collect();
                scenarios.sort();
                scenarios.dedup();
                if scenarios.len() > 1 {
                    return Err(StoreError::Ambiguous {
                        spec_id: spec_id.to_string(),
                        scenarios,
                    });
                }
            }
        }
        Ok(candidates.into_iter().next())
    }

    /// Load and validate one graph file
    pub fn load(&self, path: &Path) -> StoreResult<ActionGraph> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let graph = ActionGraph::from_json(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        graph.validate().map_err(|source| StoreError::InvalidGraph {
            path: Some(path.to_path_buf()),
            source,
        })?;
        Ok(graph)
    }

    /// Files for a spec, newest first
    pub fn list_by_spec(&self, spec_id: &str) -> StoreResult<Vec<StoredGraph>> {
        let mut graphs: Vec<StoredGraph> = self
            .list_all()?
            .into_iter()
            .filter(|g| g.spec_id == spec_id)
            .collect();
        sort_newest_first(&mut graphs);
        Ok(graphs)
    }

    /// Every graph file in the store, newest first
    pub fn list_all(&self) -> StoreResult<Vec<StoredGraph>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };
        let mut graphs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            if let Some(stored) = StoredGraph::parse(&entry.path()) {
                graphs.push(stored);
            }
        }
        sort_newest_first(&mut graphs);
        Ok(graphs)
    }

    /// Delete a spec's files (one scenario when named); returns the count.
    pub fn delete(&self, spec_id: &str, scenario_name: Option<&str>) -> StoreResult<usize> {
        let slug = scenario_name.map(slugify);
        let targets: Vec<StoredGraph> = self
            .list_by_spec(spec_id)?
            .into_iter()
            .filter(|g| slug.as_ref().map_or(true, |s| *s == g.scenario_slug))
            .collect();
        remove_all(&targets)
    }

    /// Delete every graph file; returns the count.
    pub fn clear(&self) -> StoreResult<usize> {
        remove_all(&self.list_all()?)
    }
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

fn remove_all(targets: &[StoredGraph]) -> StoreResult<usize> {
    for stored in targets {
        std::fs::remove_file(&stored.path).map_err(|source| StoreError::Io {
            path: stored.path.clone(),
            source,
        })?;
    }
    if !targets.is_empty() {
        tracing::info!(count = targets.len(), "removed stored graphs");
    }
    Ok(targets.len())
}

fn sort_newest_first(graphs: &mut [StoredGraph]) {
    graphs.sort_by(|a, b| {
        b.version
            .cmp(&a.version)
            .then_with(|| b.file_name().cmp(&a.file_name()))
    });
}

fn check_spec_id(spec_id: &str) -> StoreResult<()> {
    let safe = !spec_id.is_empty()
        && !spec_id.contains(SEPARATOR)
        && !spec_id.starts_with('.')
        && spec_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        Ok(())
    } else {
        Err(StoreError::InvalidSpecId {
            spec_id: spec_id.to_string(),
        })
    }
}
