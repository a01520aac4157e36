//! Replay command handler

use actiongraph::graph::ExecutionState;
use actiongraph::replay::{replay_graph, ReplaySummary};
use actiongraph::runtime::StepRuntime;

use super::{block_on, load_snapshot, Context};
use crate::commands::ReplayArgs;
use crate::error::{CliError, CliResult};

/// Execute the replay command
pub fn execute_replay(ctx: &Context, args: &ReplayArgs) -> CliResult<()> {
    let mut graph = ctx.load_graph(&args.graph)?;
    let loaded = load_snapshot(&args.page)?;
    let mut runtime = StepRuntime::new(loaded.page, ctx.config.resolver())
        .with_base_url(loaded.base_url)
        .with_navigation_timeout(ctx.config.navigation_timeout());

    let summary = block_on(replay_graph(&mut runtime, &mut graph))?;

    if args.save {
        let path = ctx.store().write(&graph).map_err(CliError::library)?;
        tracing::info!(path = %path.display(), "saved replayed graph");
    }

    if args.json {
        let json = serde_json::to_string_pretty(&summary).map_err(CliError::library)?;
        ctx.reporter.raw(&json)?;
    } else {
        print_summary(ctx, &summary);
    }

    match summary.first_failure() {
        None if summary.is_success() => Ok(()),
        Some(node) => Err(CliError::ReplayFailed {
            message: format!(
                "{}: {}",
                node.node_id,
                node.error.as_deref().unwrap_or("unknown error")
            ),
        }),
        None => Err(CliError::ReplayFailed {
            message: format!("{} steps skipped", summary.skipped),
        }),
    }
}

fn print_summary(ctx: &Context, summary: &ReplaySummary) {
    for node in &summary.nodes {
        match node.state {
            ExecutionState::Success => ctx.reporter.success(&node.node_id),
            ExecutionState::Failed => ctx.reporter.failure(&format!(
                "{} (after {} attempt{}): {}",
                node.node_id,
                node.attempts,
                if node.attempts == 1 { "" } else { "s" },
                node.error.as_deref().unwrap_or_default()
            )),
            _ => ctx.reporter.warning(&format!("{} skipped", node.node_id)),
        }
    }
    ctx.reporter.detail(&format!(
        "{} passed, {} failed, {} skipped in {}ms",
        summary.passed, summary.failed, summary.skipped, summary.duration_ms
    ));
}
