//! actiongraph: deterministic scenario IR for end-to-end UI tests
//!
//! A Gherkin scenario is turned into an [`ActionGraph`](graph::ActionGraph),
//! a small versioned JSON document with one node per step. Graphs are
//! persisted, compiled into a scenario document plus Rust step definitions,
//! and replayed against a page. Every element lookup goes through the
//! registry-backed [`Resolver`](resolver::Resolver), so renamed buttons are a
//! registry update instead of a test rewrite.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌────────────┐    ┌────────────┐
//! │ Scenario   │    │ Action     │    │ Compiler   │    │ .feature + │
//! │ (yaml/json)│───►│ Graph      │───►│            │───►│ _steps.rs  │
//! └────────────┘    └─────┬──────┘    └────────────┘    └────────────┘
//!                         │ replay
//!                   ┌─────▼──────┐    ┌────────────┐    ┌────────────┐
//!                   │ Step       │───►│ Resolver   │◄───│ Selector   │
//!                   │ Runtime    │    │            │    │ Registry   │
//!                   └────────────┘    └────────────┘    └─────▲──────┘
//!                                                             │ scan / drift
//!                                                       ┌─────┴──────┐
//!                                                       │ Page       │
//!                                                       └────────────┘
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod collect;
pub mod compiler;
pub mod completion;
pub mod config;
pub mod dom;
pub mod drift;
pub mod graph;
pub mod locator;
pub mod page;
pub mod registry;
pub mod replay;
pub mod resolver;
pub mod result;
pub mod runtime;
pub mod slug;

pub use result::{ActionGraphError, ActionGraphResult};

/// Crate version, recorded in artifact manifests
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a step-definition module or driver integration needs
pub mod prelude {
    pub use super::batch::{build_all, run_bounded, BuildOutcome, BuiltGraph};
    pub use super::collect::{collect_selectors, CollectOptions};
    pub use super::compiler::{compile_action_graph, CompileError, CompileOptions, CompiledArtifacts};
    pub use super::completion::{
        call_with_retry, CompletionError, CompletionErrorCode, CompletionRequest,
        CompletionResponse, CompletionService, RetryPolicy,
    };
    pub use super::config::ActionGraphConfig;
    pub use super::dom::{DomElement, DomSnapshot, StaticPage};
    pub use super::drift::{apply_drift, detect_drift, run_drift, DriftReport};
    pub use super::graph::{
        ActionGraph, ActionNode, BuildError, DeterministicAction, DeterministicInstruction,
        GraphBuilder, GraphStore, Keyword, NodeType, ScenarioDefinition, ScenarioStep,
    };
    pub use super::locator::Locator;
    pub use super::page::{ElementHandle, Page, PageError, PageResult};
    pub use super::registry::{ScanResult, SelectorEntry, SelectorRegistry, SelectorType};
    pub use super::replay::{replay_graph, ReplaySummary};
    pub use super::resolver::{
        AmbiguityPolicy, RegistryCache, ResolveError, ResolveOptions, Resolver, Strategy,
    };
    pub use super::result::{ActionGraphError, ActionGraphResult};
    pub use super::runtime::{StepCall, StepResult, StepRuntime, Target};
}
