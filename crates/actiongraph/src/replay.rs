//! Graph replay.
//!
//! Executes a graph's nodes in step order through a [`StepRuntime`] and
//! writes each node's [`Execution`] record back into the graph, so a replayed
//! graph can be persisted as-is.
//!
//! Node metadata drives the loop: `retries` extra attempts, a per-attempt
//! `timeout` in milliseconds, and `critical`, which skips every later node
//! once the node fails.

use chrono::Utc;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::graph::{ActionGraph, ActionNode, Execution, ExecutionState};
use crate::page::{Page, PageError};
use crate::result::{ActionGraphError, ActionGraphResult};
use crate::runtime::StepRuntime;

/// Outcome of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    /// Node id
    pub node_id: String,
    /// Final state
    pub state: ExecutionState,
    /// Attempts made (0 when skipped)
    pub attempts: u32,
    /// Last error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    /// Replayed graph
    pub graph_id: String,
    /// Nodes that succeeded
    pub passed: usize,
    /// Nodes that failed
    pub failed: usize,
    /// Nodes never attempted
    pub skipped: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Per-node outcomes in step order
    pub nodes: Vec<NodeReport>,
}

impl ReplaySummary {
    /// No node failed or was skipped
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// First failing node
    #[must_use]
    pub fn first_failure(&self) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.state == ExecutionState::Failed)
    }
}

/// Replay every node of `graph` against the runtime's page.
pub async fn replay_graph<P: Page>(
    runtime: &mut StepRuntime<P>,
    graph: &mut ActionGraph,
) -> ReplaySummary {
    let started = Instant::now();
    let mut order: Vec<usize> = (0..graph.nodes.len()).collect();
    order.sort_by_key(|&i| graph.nodes[i].step_index);

    for node in &mut graph.nodes {
        node.execution = Execution::default();
    }

    let mut reports = Vec::with_capacity(order.len());
    let mut halted_by: Option<String> = None;

    for index in order {
        let node = &mut graph.nodes[index];
        if let Some(critical) = &halted_by {
            node.execution.state = ExecutionState::Skipped;
            node.execution.error = Some(format!("skipped after critical failure of {critical}"));
            reports.push(NodeReport {
                node_id: node.node_id.clone(),
                state: ExecutionState::Skipped,
                attempts: 0,
                error: None,
            });
            continue;
        }

        let report = run_node(runtime, node).await;
        if report.state == ExecutionState::Failed && node.is_critical() {
            tracing::warn!(node_id = %node.node_id, "critical step failed, skipping the rest");
            halted_by = Some(node.node_id.clone());
        }
        reports.push(report);
    }

    let count = |state| reports.iter().filter(|r| r.state == state).count();
    let summary = ReplaySummary {
        graph_id: graph.graph_id.clone(),
        passed: count(ExecutionState::Success),
        failed: count(ExecutionState::Failed),
        skipped: count(ExecutionState::Skipped),
        duration_ms: elapsed_ms(started),
        nodes: reports,
    };
    tracing::info!(
        graph_id = %summary.graph_id,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        "replay finished"
    );
    summary
}

async fn run_node<P: Page>(runtime: &mut StepRuntime<P>, node: &mut ActionNode) -> NodeReport {
    let started = Instant::now();
    node.execution.state = ExecutionState::Running;
    node.execution.started_at = Some(Utc::now());

    let max_attempts = node.retries().saturating_add(1);
    let mut attempts = 0;
    let mut outcome = Ok(());
    while attempts < max_attempts {
        attempts += 1;
        outcome = attempt(runtime, node).await;
        match &outcome {
            Ok(()) => break,
            Err(ActionGraphError::Instruction(_)) => break,
            Err(err) => {
                tracing::debug!(node_id = %node.node_id, attempt = attempts, error = %err, "step attempt failed");
            }
        }
    }

    node.execution.completed_at = Some(Utc::now());
    node.execution.duration = Some(elapsed_ms(started));
    node.execution.result = Some(serde_json::json!({ "attempts": attempts }));
    let error = match outcome {
        Ok(()) => {
            node.execution.state = ExecutionState::Success;
            None
        }
        Err(err) => {
            node.execution.state = ExecutionState::Failed;
            node.execution.error = Some(err.to_string());
            Some(err.to_string())
        }
    };
    NodeReport {
        node_id: node.node_id.clone(),
        state: node.execution.state,
        attempts,
        error,
    }
}

async fn attempt<P: Page>(runtime: &mut StepRuntime<P>, node: &ActionNode) -> ActionGraphResult<()> {
    match node.timeout_ms() {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), runtime.execute(node))
            .await
            .unwrap_or_else(|_| Err(ActionGraphError::Page(PageError::Timeout { ms }))),
        None => runtime.execute(node).await,
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
