//! Build command handler

use actiongraph::batch::{build_all, effective_workers, BuildOutcome};
use std::path::PathBuf;

use super::Context;
use crate::commands::BuildArgs;
use crate::error::{CliError, CliResult};

/// Execute the build command
pub fn execute_build(ctx: &Context, args: &BuildArgs) -> CliResult<()> {
    let config = ctx
        .with_output_dirs(&args.output)
        .with_versioned(ctx.config.versioned && !args.no_version);
    let workers = effective_workers(args.jobs.unwrap_or(config.workers));
    let compile = args.compile.then(|| config.compile_options());
    let files = expand_inputs(&args.files)?;

    tracing::debug!(files = files.len(), workers, "building scenario files");
    let outcomes = build_all(&files, &config.store(), compile.as_ref(), workers);
    report(ctx, &outcomes);

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

/// Directories expand to the scenario files they contain, sorted by name.
pub fn expand_inputs(inputs: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| is_scenario_file(path))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        return Err(CliError::invalid_argument("no scenario files found"));
    }
    Ok(files)
}

/// `.yaml`, `.yml` or `.json`
#[must_use]
pub fn is_scenario_file(path: &std::path::Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml" | "json"))
}

fn report(ctx: &Context, outcomes: &[BuildOutcome]) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(built) => {
                ctx.reporter.success(&format!(
                    "{} / {} → {}",
                    built.spec_id,
                    built.scenario_name,
                    built.graph_path.display()
                ));
                if let Some(artifacts) = &built.artifacts {
                    ctx.reporter.detail(&artifacts.feature_path.display().to_string());
                    ctx.reporter.detail(&artifacts.steps_path.display().to_string());
                }
            }
            Err(err) => ctx
                .reporter
                .failure(&format!("{}: {err}", outcome.source.display())),
        }
    }
}
