//! Action Graph compiler.
//!
//! Turns a validated [`ActionGraph`] into two artifacts:
//!
//! - a Gherkin scenario document (`<scenario-slug>.feature`)
//! - a Rust step-definition module (`<scenario_slug>_steps.rs`)
//!
//! Both are pure functions of the graph. Compiling the same persisted graph
//! twice, on any machine, yields byte-identical files.

mod document;
mod manifest;
mod steps;

pub use document::render_feature;
pub use manifest::{hash_contents, verify_artifact, write_with_manifest, ArtifactManifest};
pub use steps::{render_steps, WORLD_TYPE};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::graph::{ActionGraph, BuildError};
use crate::slug::{slugify, snake_case};

/// Default directory for scenario documents
pub const DEFAULT_FEATURE_DIR: &str = "features";

/// Default directory for step-definition modules
pub const DEFAULT_STEPS_DIR: &str = "tests/steps";

/// Errors from compilation
#[derive(Debug, Error)]
pub enum CompileError {
    /// The graph failed validation
    #[error("Cannot compile invalid graph: {0}")]
    InvalidGraph(#[from] BuildError),

    /// Two nodes share a step sentence but do different things
    #[error("Step '{keyword} {text}' is defined by {first} and {second} with different instructions; reword one of them")]
    ConflictingStep {
        /// Keyword the step registers under
        keyword: String,
        /// Step sentence
        text: String,
        /// Node that defined the step first
        first: String,
        /// Node whose instruction disagrees
        second: String,
    },

    /// Filesystem error
    #[error("Compiler I/O error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON error
    #[error("Compiler JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No manifest next to an artifact
    #[error("No manifest for '{path}'; recompile the graph")]
    ManifestMissing {
        /// Artifact path
        path: PathBuf,
    },

    /// Artifact differs from what was compiled
    #[error("'{path}' was modified after compilation (expected {expected}, found {actual}); recompile the graph")]
    HashMismatch {
        /// Artifact path
        path: PathBuf,
        /// Hash recorded at compile time
        expected: String,
        /// Current hash
        actual: String,
    },
}

/// Result type for compiler operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Where and how to compile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Scenario document directory
    pub feature_dir: PathBuf,
    /// Step-definition directory
    pub steps_dir: PathBuf,
    /// Render without writing
    pub dry_run: bool,
    /// Add graph id / spec id / node count comments
    pub include_metadata: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            feature_dir: PathBuf::from(DEFAULT_FEATURE_DIR),
            steps_dir: PathBuf::from(DEFAULT_STEPS_DIR),
            dry_run: false,
            include_metadata: false,
        }
    }
}

impl CompileOptions {
    /// Options writing into the given directories
    #[must_use]
    pub fn new(feature_dir: impl Into<PathBuf>, steps_dir: impl Into<PathBuf>) -> Self {
        Self {
            feature_dir: feature_dir.into(),
            steps_dir: steps_dir.into(),
            ..Self::default()
        }
    }

    /// Render only
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Add metadata comments
    #[must_use]
    pub const fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

/// Output of [`compile_action_graph`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifacts {
    /// Scenario document path
    pub feature_path: PathBuf,
    /// Step-definition path
    pub steps_path: PathBuf,
    /// Scenario document contents
    pub feature: String,
    /// Step-definition contents
    pub steps: String,
    /// Whether the files were written
    pub written: bool,
}

/// `<scenario-slug>.feature`
#[must_use]
pub fn feature_file_name(graph: &ActionGraph) -> String {
    let slug = slugify(&graph.metadata.scenario_name);
    if slug.is_empty() {
        "scenario.feature".to_string()
    } else {
        format!("{slug}.feature")
    }
}

/// `<scenario_slug>_steps.rs`
#[must_use]
pub fn steps_file_name(graph: &ActionGraph) -> String {
    format!("{}_steps.rs", snake_case(&graph.metadata.scenario_name))
}

/// Compile a graph into its scenario document and step definitions.
///
/// This is the only place compilation touches the filesystem; with
/// `dry_run` nothing is written and the rendered contents are returned.
pub fn compile_action_graph(
    graph: &ActionGraph,
    options: &CompileOptions,
) -> CompileResult<CompiledArtifacts> {
    graph.validate()?;
    let feature = render_feature(graph, options.include_metadata);
    let steps = render_steps(graph, options.include_metadata)?;
    let feature_path = options.feature_dir.join(feature_file_name(graph));
    let steps_path = options.steps_dir.join(steps_file_name(graph));

    if !options.dry_run {
        create_dir(&options.feature_dir)?;
        create_dir(&options.steps_dir)?;
        write_with_manifest(&feature_path, &feature, graph)?;
        write_with_manifest(&steps_path, &steps, graph)?;
        tracing::info!(
            feature = %feature_path.display(),
            steps = %steps_path.display(),
            graph_id = %graph.graph_id,
            "compiled action graph"
        );
    }

    Ok(CompiledArtifacts {
        feature_path,
        steps_path,
        feature,
        steps,
        written: !options.dry_run,
    })
}

fn create_dir(dir: &Path) -> CompileResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| CompileError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::graph::{
        DeterministicAction, DeterministicInstruction, GraphBuilder, Keyword, ScenarioStep,
    };
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn sample() -> ActionGraph {
        GraphBuilder::new()
            .spec_id("checkout")
            .scenario_name("Pay by card")
            .graph_id("g-7")
            .step(ScenarioStep::new(Keyword::Given, "I have a cart"))
            .step(
                ScenarioStep::new(Keyword::When, "I pay").instruction(
                    DeterministicInstruction::action(DeterministicAction::Click).selector("pay-button"),
                ),
            )
            .build()
            .unwrap()
    }

    mod compile_tests {
        use super::*;

        #[test]
        fn test_file_names() {
            let g = sample();
            assert_eq!(feature_file_name(&g), "pay-by-card.feature");
            assert_eq!(steps_file_name(&g), "pay_by_card_steps.rs");
        }

        #[test]
        fn test_dry_run_writes_nothing() {
            let dir = TempDir::new().unwrap();
            let options = CompileOptions::new(dir.path().join("f"), dir.path().join("s")).dry_run(true);
            let out = compile_action_graph(&sample(), &options).unwrap();
            assert!(!out.written);
            assert!(!out.feature_path.exists());
            assert!(out.feature.contains("Scenario: Pay by card"));
        }

        #[test]
        fn test_writes_artifacts_with_manifests() {
            let dir = TempDir::new().unwrap();
            let options = CompileOptions::new(dir.path().join("f"), dir.path().join("s"));
            let out = compile_action_graph(&sample(), &options).unwrap();
            assert!(out.written);
            assert_eq!(std::fs::read_to_string(&out.feature_path).unwrap(), out.feature);
            assert_eq!(std::fs::read_to_string(&out.steps_path).unwrap(), out.steps);
            verify_artifact(&out.feature_path).unwrap();
            verify_artifact(&out.steps_path).unwrap();
        }

        #[test]
        fn test_recompile_is_byte_identical() {
            let dir = TempDir::new().unwrap();
            let options = CompileOptions::new(dir.path().join("f"), dir.path().join("s"))
                .include_metadata(true);
            let graph = ActionGraph::from_json(&sample().to_json().unwrap()).unwrap();
            let first = compile_action_graph(&graph, &options).unwrap();
            let manifest_before =
                std::fs::read(ArtifactManifest::manifest_path(&first.steps_path)).unwrap();
            let second = compile_action_graph(&graph, &options).unwrap();
            assert_eq!(first, second);
            assert_eq!(
                manifest_before,
                std::fs::read(ArtifactManifest::manifest_path(&second.steps_path)).unwrap()
            );
        }

        #[test]
        fn test_invalid_graph_rejected() {
            let mut g = sample();
            g.nodes.clear();
            let err = compile_action_graph(&g, &CompileOptions::default().dry_run(true)).unwrap_err();
            assert!(matches!(err, CompileError::InvalidGraph(BuildError::NoNodes)));
        }

        #[test]
        fn test_unexecutable_instruction_compiles_as_observation() {
            let g = GraphBuilder::new()
                .spec_id("s")
                .scenario_name("n")
                .step(
                    ScenarioStep::new(Keyword::When, "I pause")
                        .instruction(DeterministicInstruction::action(DeterministicAction::Wait)),
                )
                .step(
                    ScenarioStep::new(Keyword::Then, "I see Hi")
                        .instruction(DeterministicInstruction::expect_text("Hi")),
                )
                .build()
                .unwrap();
            let out = compile_action_graph(&g, &CompileOptions::default().dry_run(true)).unwrap();
            assert!(out.steps.contains(
                "async fn step_0(world: &mut ActionWorld) -> StepResult {\n    // Invalid instruction on step_0: wait needs a duration\n    let _ = world;\n    Ok(())\n}"
            ));
            assert!(out.steps.contains("world.runtime.assert_text(None, \"Hi\").await"));
        }

        #[test]
        fn test_same_sentence_different_targets_rejected() {
            let g = GraphBuilder::new()
                .spec_id("s")
                .scenario_name("n")
                .step(
                    ScenarioStep::new(Keyword::When, "I click the button").instruction(
                        DeterministicInstruction::action(DeterministicAction::Click).selector("save-button"),
                    ),
                )
                .step(
                    ScenarioStep::new(Keyword::And, "I click the button").instruction(
                        DeterministicInstruction::action(DeterministicAction::Click).selector("delete-button"),
                    ),
                )
                .build()
                .unwrap();
            let err = compile_action_graph(&g, &CompileOptions::default().dry_run(true)).unwrap_err();
            match err {
                CompileError::ConflictingStep { keyword, text, first, second } => {
                    assert_eq!(keyword, "when");
                    assert_eq!(text, "I click the button");
                    assert_eq!(first, "step_0");
                    assert_eq!(second, "step_1");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod property_tests {
        use super::*;

        fn arb_step() -> impl Strategy<Value = ScenarioStep> {
            (
                prop::sample::select(vec![
                    Keyword::Given,
                    Keyword::When,
                    Keyword::Then,
                    Keyword::And,
                    Keyword::But,
                ]),
                "[A-Za-z0-9 \"$().?]{1,24}",
                proptest::option::of(prop::sample::select(vec!["email-input", "log-in-button"])),
            )
                .prop_map(|(keyword, text, selector)| {
                    let step = ScenarioStep::new(keyword, text);
                    match selector {
                        Some(id) => step.instruction(
                            DeterministicInstruction::action(DeterministicAction::Click).selector(id),
                        ),
                        None => step,
                    }
                })
        }

        proptest! {
            #[test]
            fn prop_compile_is_deterministic(
                background in prop::collection::vec(arb_step(), 0..3),
                steps in prop::collection::vec(arb_step(), 1..6),
                tags in prop::collection::vec("[a-z]{1,6}", 0..3),
            ) {
                let mut builder = GraphBuilder::new()
                    .spec_id("prop")
                    .scenario_name("Generated scenario")
                    .tags(tags);
                for step in background {
                    builder = builder.background(step);
                }
                for step in steps {
                    builder = builder.step(step);
                }
                let graph = builder.build().unwrap();
                let reloaded = ActionGraph::from_json(&graph.to_json().unwrap()).unwrap();
                let options = CompileOptions::default().dry_run(true).include_metadata(true);

                match (
                    compile_action_graph(&graph, &options),
                    compile_action_graph(&reloaded, &options),
                ) {
                    (Ok(a), Ok(b)) => {
                        prop_assert_eq!(a.feature, b.feature);
                        prop_assert_eq!(a.steps, b.steps);
                    }
                    (Err(a), Err(b)) => {
                        let is_conflict = matches!(a, CompileError::ConflictingStep { .. });
                        prop_assert!(is_conflict);
                        prop_assert_eq!(a.to_string(), b.to_string());
                    }
                    (a, b) => prop_assert!(false, "outcomes differ: {:?} vs {:?}", a.is_ok(), b.is_ok()),
                }
            }
        }
    }
}
