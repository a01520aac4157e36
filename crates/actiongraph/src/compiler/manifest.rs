//! Artifact manifests.
//!
//! Every written artifact gets a sibling `<file>.manifest.json` holding the
//! BLAKE3 hash of the artifact and of the graph it was compiled from.
//! [`verify_artifact`] reports hand edits so they can be recompiled away
//! instead of silently drifting from the graph.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{CompileError, CompileResult};
use crate::graph::ActionGraph;

/// Manifest stored next to a compiled artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    /// Manifest format version
    pub manifest_version: u32,
    /// Artifact file name
    pub output_path: String,
    /// BLAKE3 of the artifact contents
    pub output_hash: String,
    /// BLAKE3 of the graph JSON
    pub graph_hash: String,
    /// Source graph id
    pub graph_id: String,
    /// Source spec id
    pub spec_id: String,
    /// Compiler version
    pub tool_version: String,
}

impl ArtifactManifest {
    /// Current manifest format version
    pub const VERSION: u32 = 1;

    /// Manifest for `contents` compiled from `graph`
    pub fn new(output_path: &Path, contents: &str, graph: &ActionGraph) -> CompileResult<Self> {
        Ok(Self {
            manifest_version: Self::VERSION,
            output_path: output_path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            output_hash: hash_contents(contents),
            graph_hash: hash_contents(&graph.to_json()?),
            graph_id: graph.graph_id.clone(),
            spec_id: graph.metadata.spec_id.clone(),
            tool_version: crate::VERSION.to_string(),
        })
    }

    /// `<artifact>.manifest.json`
    #[must_use]
    pub fn manifest_path(artifact: &Path) -> PathBuf {
        let mut name = artifact
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        name.push_str(".manifest.json");
        artifact.with_file_name(name)
    }

    /// Read a manifest
    pub fn read(path: &Path) -> CompileResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write a manifest
    pub fn write(&self, path: &Path) -> CompileResult<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// BLAKE3 hex digest
#[must_use]
pub fn hash_contents(contents: &str) -> String {
    blake3::hash(contents.as_bytes()).to_hex().to_string()
}

/// Write an artifact and its manifest
pub fn write_with_manifest(path: &Path, contents: &str, graph: &ActionGraph) -> CompileResult<()> {
    std::fs::write(path, contents).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ArtifactManifest::new(path, contents, graph)?.write(&ArtifactManifest::manifest_path(path))
}

/// Check an artifact against its manifest.
///
/// Fails with [`CompileError::ManifestMissing`] when there is no manifest and
/// [`CompileError::HashMismatch`] when the artifact was edited.
pub fn verify_artifact(path: &Path) -> CompileResult<ArtifactManifest> {
    let manifest_path = ArtifactManifest::manifest_path(path);
    if !manifest_path.exists() {
        return Err(CompileError::ManifestMissing {
            path: path.to_path_buf(),
        });
    }
    let manifest = ArtifactManifest::read(&manifest_path)?;
    let contents = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let actual = hash_contents(&contents);
    if actual != manifest.output_hash {
        return Err(CompileError::HashMismatch {
            path: path.to_path_buf(),
            expected: manifest.output_hash,
            actual,
        });
    }
    Ok(manifest)
}
