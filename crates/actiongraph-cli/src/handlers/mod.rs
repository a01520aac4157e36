//! Command handlers
//!
//! Each handler module contains the execution logic for one command plus
//! its pure helpers, kept out of `main.rs` for testability.

pub mod build;
pub mod compile;
pub mod config;
pub mod drift;
pub mod graphs;
pub mod registry;
pub mod replay;
pub mod resolve;

use actiongraph::config::ActionGraphConfig;
use actiongraph::dom::{DomSnapshot, StaticPage};
use actiongraph::graph::{ActionGraph, GraphStore};
use std::future::Future;

use crate::commands::{GraphSelector, OutputDirs, SnapshotArgs};
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::settings::CliSettings;

/// Base URL used when neither the flag nor the snapshot names one
pub const FALLBACK_BASE_URL: &str = "http://localhost";

/// Everything a handler needs
#[derive(Debug)]
pub struct Context {
    /// Presentation settings
    pub settings: CliSettings,
    /// Effective library configuration
    pub config: ActionGraphConfig,
    /// Output
    pub reporter: Reporter,
}

impl Context {
    /// Context for the given settings and configuration
    #[must_use]
    pub fn new(settings: CliSettings, config: ActionGraphConfig) -> Self {
        Self {
            reporter: Reporter::new(&settings),
            settings,
            config,
        }
    }

    /// Graph store from the configuration
    #[must_use]
    pub fn store(&self) -> GraphStore {
        self.config.store()
    }

    /// Config with per-command output directories applied
    #[must_use]
    pub fn with_output_dirs(&self, dirs: &OutputDirs) -> ActionGraphConfig {
        let mut config = self.config.clone();
        if let Some(dir) = &dirs.feature_dir {
            config = config.with_feature_dir(dir);
        }
        if let Some(dir) = &dirs.steps_dir {
            config = config.with_steps_dir(dir);
        }
        config
    }

    /// Load the selected graph or fail with [`CliError::GraphNotFound`]
    pub fn load_graph(&self, selector: &GraphSelector) -> CliResult<ActionGraph> {
        self.store()
            .read(&selector.spec_id, selector.scenario.as_deref())
            .map_err(CliError::library)?
            .ok_or_else(|| CliError::GraphNotFound {
                what: describe(selector),
            })
    }
}

/// `spec` or `spec / scenario`
#[must_use]
pub fn describe(selector: &GraphSelector) -> String {
    match &selector.scenario {
        Some(scenario) => format!("{} / {scenario}", selector.spec_id),
        None => selector.spec_id.clone(),
    }
}

/// A loaded DOM snapshot
#[derive(Debug)]
pub struct LoadedSnapshot {
    /// Page over the snapshot
    pub page: StaticPage,
    /// Base URL for navigation
    pub base_url: String,
    /// Every route the snapshot contains
    pub routes: Vec<String>,
}

/// Load the snapshot named by `args`
pub fn load_snapshot(args: &SnapshotArgs) -> CliResult<LoadedSnapshot> {
    let snapshot = DomSnapshot::load(&args.snapshot).map_err(CliError::library)?;
    let base_url = args
        .base_url
        .clone()
        .or_else(|| snapshot.url.clone())
        .unwrap_or_else(|| FALLBACK_BASE_URL.to_string());
    let routes = snapshot.pages.keys().cloned().collect();
    Ok(LoadedSnapshot {
        page: StaticPage::new(snapshot),
        base_url,
        routes,
    })
}

/// Run a future to completion on a single-threaded runtime
pub fn block_on<F: Future>(future: F) -> CliResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
