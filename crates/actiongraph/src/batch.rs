//! Bounded batch processing.
//!
//! Graph builds are CPU-bound and independent, so a batch fans out over a
//! scoped worker pool. Workers pull the next index from a shared counter;
//! results come back in input order regardless of completion order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::compiler::{compile_action_graph, CompileOptions, CompiledArtifacts};
use crate::graph::{GraphStore, ScenarioDefinition};
use crate::result::ActionGraphResult;

/// Worker count with 0 meaning one per core
#[must_use]
#[allow(clippy::redundant_closure_for_method_calls)]
pub fn effective_workers(requested: usize) -> usize {
    if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        requested
    }
}

/// Apply `f` to every item on at most `workers` threads.
///
/// Output order matches input order. A panic in `f` propagates to the caller
/// once the scope joins.
pub fn run_bounded<T, U, F>(items: &[T], workers: usize, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync,
{
    let workers = effective_workers(workers).min(items.len());
    if workers <= 1 {
        return items.iter().map(&f).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<U>>> = Mutex::new((0..items.len()).map(|_| None).collect());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                let value = f(item);
                if let Ok(mut slots) = slots.lock() {
                    slots[index] = Some(value);
                }
            });
        }
    });

    slots
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect()
}

/// One scenario file turned into a stored graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltGraph {
    /// Graph id
    pub graph_id: String,
    /// Owning spec
    pub spec_id: String,
    /// Scenario name
    pub scenario_name: String,
    /// Where the graph was written
    pub graph_path: PathBuf,
    /// Compiled artifacts, when compilation was requested
    pub artifacts: Option<CompiledArtifacts>,
}

/// Outcome for one input file
#[derive(Debug)]
pub struct BuildOutcome {
    /// Scenario file
    pub source: PathBuf,
    /// Build result
    pub result: ActionGraphResult<BuiltGraph>,
}

impl BuildOutcome {
    /// Whether the file built cleanly
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Build, persist and optionally compile a single scenario file.
pub fn build_one(
    path: &Path,
    store: &GraphStore,
    compile: Option<&CompileOptions>,
) -> ActionGraphResult<BuiltGraph> {
    let graph = ScenarioDefinition::load(path)?.build()?;
    let graph_path = store.write(&graph)?;
    let artifacts = match compile {
        Some(options) => Some(compile_action_graph(&graph, options)?),
        None => None,
    };
    Ok(BuiltGraph {
        graph_id: graph.graph_id.clone(),
        spec_id: graph.metadata.spec_id.clone(),
        scenario_name: graph.metadata.scenario_name.clone(),
        graph_path,
        artifacts,
    })
}

/// Build every scenario file on a bounded pool.
///
/// A failing file is reported in its outcome and never stops the batch.
pub fn build_all(
    paths: &[PathBuf],
    store: &GraphStore,
    compile: Option<&CompileOptions>,
    workers: usize,
) -> Vec<BuildOutcome> {
    let outcomes = run_bounded(paths, workers, |path| {
        let result = build_one(path, store, compile);
        if let Err(err) = &result {
            tracing::warn!(source = %path.display(), error = %err, "scenario build failed");
        }
        BuildOutcome {
            source: path.clone(),
            result,
        }
    });
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(total = outcomes.len(), failed, "batch build finished");
    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOGIN: &str = "\
specId: auth
scenarioName: User logs in
background:
  - { keyword: given, text: the app is running }
steps:
  - keyword: when
    text: I click log in
    selectorId: log-in-button
    instruction: { action: click }
";

    mod pool_tests {
        use super::*;

        #[test]
        fn test_results_keep_input_order() {
            let items: Vec<u64> = (0..50).collect();
            let out = run_bounded(&items, 4, |n| {
                std::thread::sleep(std::time::Duration::from_millis(50 - n));
                n * 2
            });
            assert_eq!(out, items.iter().map(|n| n * 2).collect::<Vec<_>>());
        }

        #[test]
        fn test_empty_and_single_worker() {
            let empty: Vec<u8> = Vec::new();
            assert!(run_bounded(&empty, 8, |n| *n).is_empty());
            assert_eq!(run_bounded(&[1, 2, 3], 1, |n| n + 1), vec![2, 3, 4]);
        }

        #[test]
        fn test_never_exceeds_worker_bound() {
            let active = AtomicUsize::new(0);
            let peak = AtomicUsize::new(0);
            let items: Vec<usize> = (0..24).collect();
            run_bounded(&items, 3, |_| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(5));
                active.fetch_sub(1, Ordering::SeqCst);
            });
            assert!(peak.load(Ordering::SeqCst) <= 3);
        }

        #[test]
        fn test_effective_workers() {
            assert_eq!(effective_workers(5), 5);
            assert!(effective_workers(0) >= 1);
        }
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_build_all_reports_each_file() {
            let dir = TempDir::new().unwrap();
            let good = dir.path().join("login.yaml");
            std::fs::write(&good, LOGIN).unwrap();
            let bad = dir.path().join("broken.yaml");
            std::fs::write(&bad, "specId: auth\nsteps: []\n").unwrap();

            let store = GraphStore::new(dir.path().join("graphs")).with_versioned(false);
            let outcomes = build_all(&[good.clone(), bad.clone()], &store, None, 2);

            assert_eq!(outcomes.len(), 2);
            assert_eq!(outcomes[0].source, good);
            let built = outcomes[0].result.as_ref().unwrap();
            assert_eq!(built.spec_id, "auth");
            assert!(built.graph_path.exists());
            assert!(built.artifacts.is_none());
            assert!(!outcomes[1].is_ok());
        }

        #[test]
        fn test_build_one_compiles_when_asked() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("login.yaml");
            std::fs::write(&file, LOGIN).unwrap();
            let store = GraphStore::new(dir.path().join("graphs"));
            let options = CompileOptions::new(dir.path().join("features"), dir.path().join("steps"));

            let built = build_one(&file, &store, Some(&options)).unwrap();
            let artifacts = built.artifacts.unwrap();
            assert!(artifacts.feature_path.ends_with("user-logs-in.feature"));
            assert!(artifacts.steps_path.exists());
            assert_eq!(store.read("auth", None).unwrap().unwrap().graph_id, built.graph_id);
        }
    }
}
