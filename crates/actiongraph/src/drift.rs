//! Selector drift detection.
//!
//! Compares a fresh [`ScanResult`] against the stored registry and classifies
//! every registry entry as missing, updated or unchanged; scan ids the
//! registry does not know are new. Entries on a route the scan failed to
//! load are unverified rather than missing. With `apply_updates` the updated and new
//! entries are merged back and the registry is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::collect::{collect_selectors, CollectOptions};
use crate::page::Page;
use crate::registry::{RegistryError, ScanResult, SelectorEntry, SelectorRegistry, SkippedRoute};

/// Errors from drift detection
#[derive(Debug, Error)]
pub enum DriftError {
    /// Registry load or save failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Report could not be written
    #[error("Failed to write drift report {path}: {source}")]
    Io {
        /// Report path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Report could not be serialized
    #[error("Failed to serialize drift report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for drift operations
pub type DriftResult<T> = Result<T, DriftError>;

/// Counts per class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    /// Registry entries examined
    pub total_tracked: usize,
    /// Entries absent from the scan
    pub missing: usize,
    /// Entries whose tracked fields changed
    pub updated: usize,
    /// Scan ids absent from the registry
    pub new: usize,
    /// Entries found as stored
    pub unchanged: usize,
    /// Entries on routes the scan could not load
    #[serde(default)]
    pub unverified: usize,
}

/// A registry entry the scan no longer finds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingSelector {
    /// Registry id
    pub id: String,
    /// Stored locator
    pub selector: String,
    /// Stored route
    pub page: String,
    /// Suggested replacement id from the scan
    pub suggestion: Option<String>,
}

/// A registry entry whose tracked fields changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedSelector {
    /// Registry id
    pub id: String,
    /// Changed field names
    pub changes: Vec<String>,
    /// Stored entry
    pub previous: SelectorEntry,
    /// Scanned entry
    pub current: SelectorEntry,
}

/// Drift report, written as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    /// When the scan ran
    pub timestamp: DateTime<Utc>,
    /// Application base URL
    pub base_url: String,
    /// Routes requested
    pub routes: Vec<String>,
    /// Registry compared against
    pub registry_path: String,
    /// Counts
    pub summary: DriftSummary,
    /// Missing entries
    pub missing: Vec<MissingSelector>,
    /// Updated entries
    pub updated: Vec<UpdatedSelector>,
    /// New scan entries
    pub added: Vec<SelectorEntry>,
    /// Ids found as stored
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unchanged: Vec<String>,
    /// Ids whose route was skipped, so absence proves nothing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unverified: Vec<String>,
    /// Routes the scan could not load
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_routes: Vec<SkippedRoute>,
}

impl DriftReport {
    /// Whether anything differs
    #[must_use]
    pub fn has_drift(&self) -> bool {
        self.summary.missing + self.summary.updated + self.summary.new > 0
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write(&self, path: &Path) -> DriftResult<()> {
        let io = |source| DriftError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json).map_err(io)
    }
}

/// Classify every registry entry against a scan.
#[must_use]
pub fn detect_drift(registry: &SelectorRegistry, scan: &ScanResult, registry_path: &Path) -> DriftReport {
    let mut summary = DriftSummary {
        total_tracked: registry.len(),
        ..DriftSummary::default()
    };
    let mut missing = Vec::new();
    let mut updated = Vec::new();
    let mut unchanged = Vec::new();
    let mut unverified = Vec::new();
    let scanned: BTreeSet<&str> = scan.scanned_routes().collect();
    let unscanned = |page: &str| scan.routes.iter().any(|r| r == page) && !scanned.contains(page);

    for stored in registry.entries() {
        match scan.entries.get(&stored.id) {
            None if unscanned(&stored.page) => unverified.push(stored.id.clone()),
            None => missing.push(MissingSelector {
                id: stored.id.clone(),
                selector: stored.selector.clone(),
                page: stored.page.clone(),
                suggestion: suggest_replacement(stored, scan),
            }),
            Some(current) => {
                let changes = stored.changed_fields(current);
                if changes.is_empty() {
                    unchanged.push(stored.id.clone());
                } else {
                    updated.push(UpdatedSelector {
                        id: stored.id.clone(),
                        changes: changes.into_iter().map(str::to_string).collect(),
                        previous: stored.clone(),
                        current: current.clone(),
                    });
                }
            }
        }
    }

    let added: Vec<SelectorEntry> = scan
        .entries
        .values()
        .filter(|entry| !registry.contains(&entry.id))
        .cloned()
        .collect();

    summary.missing = missing.len();
    summary.updated = updated.len();
    summary.unchanged = unchanged.len();
    summary.new = added.len();
    summary.unverified = unverified.len();

    DriftReport {
        timestamp: scan.scanned_at,
        base_url: scan.base_url.clone(),
        routes: scan.routes.clone(),
        registry_path: registry_path.display().to_string(),
        summary,
        missing,
        updated,
        added,
        unchanged,
        unverified,
        skipped_routes: scan.skipped_routes.clone(),
    }
}

/// A scan entry carrying the same locator, else the most preferred entry on
/// the same page (ties broken by id).
fn suggest_replacement(stored: &SelectorEntry, scan: &ScanResult) -> Option<String> {
    if let Some(same) = scan.entries.values().find(|e| e.selector == stored.selector) {
        return Some(same.id.clone());
    }
    scan.entries
        .values()
        .filter(|e| e.page == stored.page)
        .min_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)))
        .map(|e| e.id.clone())
}

/// Merge a report's updated and new entries into `registry`.
///
/// Updated entries keep their previous stability class. Missing entries are
/// left alone so a flaky route never deletes selectors.
pub fn apply_drift(registry: &mut SelectorRegistry, report: &DriftReport) -> DriftResult<usize> {
    let mut applied = 0;
    for change in &report.updated {
        let mut entry = change.current.clone();
        entry.stability = change.previous.stability;
        registry.replace(entry)?;
        applied += 1;
    }
    for entry in &report.added {
        registry.replace(entry.clone())?;
        applied += 1;
    }
    registry.stamp(report.timestamp);
    tracing::info!(applied, "applied selector drift");
    Ok(applied)
}

/// Scan, diff against the registry at `registry_path` and optionally
/// persist the merge.
pub async fn run_drift<P: Page + ?Sized>(
    page: &mut P,
    options: &CollectOptions,
    registry_path: &Path,
    apply_updates: bool,
) -> DriftResult<DriftReport> {
    let mut registry = SelectorRegistry::load(registry_path)?;
    let scan = collect_selectors(page, options).await;
    let report = detect_drift(&registry, &scan, registry_path);
    tracing::info!(
        missing = report.summary.missing,
        updated = report.summary.updated,
        new = report.summary.new,
        unchanged = report.summary.unchanged,
        "drift detected"
    );
    if apply_updates && (report.summary.updated + report.summary.new) > 0 {
        apply_drift(&mut registry, &report)?;
        registry.save(registry_path)?;
    }
    Ok(report)
}
