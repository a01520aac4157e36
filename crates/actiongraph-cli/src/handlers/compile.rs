//! Compile command handler

use actiongraph::compiler::compile_action_graph;

use super::Context;
use crate::commands::CompileArgs;
use crate::error::{CliError, CliResult};

/// Execute the compile command
pub fn execute_compile(ctx: &Context, args: &CompileArgs) -> CliResult<()> {
    let graph = ctx.load_graph(&args.graph)?;
    let options = ctx
        .with_output_dirs(&args.output)
        .compile_options()
        .dry_run(args.dry_run)
        .include_metadata(args.include_metadata);

    let artifacts = compile_action_graph(&graph, &options).map_err(CliError::library)?;

    if artifacts.written {
        ctx.reporter.success(&format!(
            "compiled {} ({} nodes)",
            graph.metadata.scenario_name,
            graph.nodes.len()
        ));
        ctx.reporter.detail(&artifacts.feature_path.display().to_string());
        ctx.reporter.detail(&artifacts.steps_path.display().to_string());
    } else {
        ctx.reporter.raw(&format!("# {}\n", artifacts.feature_path.display()))?;
        ctx.reporter.raw(&artifacts.feature)?;
        ctx.reporter.raw(&format!("\n// {}\n", artifacts.steps_path.display()))?;
        ctx.reporter.raw(&artifacts.steps)?;
    }
    Ok(())
}
