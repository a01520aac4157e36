//! Drift command handler

use actiongraph::drift::{run_drift, DriftReport};

use super::registry::collect_options;
use super::{block_on, load_snapshot, Context};
use crate::commands::DriftArgs;
use crate::error::{CliError, CliResult};

/// Execute the drift command
pub fn execute_drift(ctx: &Context, args: &DriftArgs) -> CliResult<()> {
    let options = collect_options(ctx, &args.scan)?;
    let mut loaded = load_snapshot(&args.scan.page)?;
    let report = block_on(run_drift(
        &mut loaded.page,
        &options,
        &ctx.config.registry_path,
        args.apply,
    ))?
    .map_err(CliError::library)?;

    if let Some(path) = &args.report {
        report.write(path).map_err(CliError::library)?;
        ctx.reporter.detail(&format!("report written to {}", path.display()));
    }
    print_report(ctx, &report);

    if args.apply && report.summary.updated + report.summary.new > 0 {
        ctx.reporter.success(&format!(
            "applied {} updated and {} new selectors",
            report.summary.updated, report.summary.new
        ));
    }
    if args.fail_on_drift && report.has_drift() {
        return Err(CliError::DriftDetected {
            missing: report.summary.missing,
            updated: report.summary.updated,
            new: report.summary.new,
        });
    }
    Ok(())
}

fn print_report(ctx: &Context, report: &DriftReport) {
    for skipped in &report.skipped_routes {
        ctx.reporter
            .warning(&format!("skipped {}: {}", skipped.route, skipped.reason));
    }
    for missing in &report.missing {
        let hint = missing
            .suggestion
            .as_deref()
            .map_or_else(String::new, |s| format!(" (try '{s}')"));
        ctx.reporter.failure(&format!(
            "missing {} on {}{hint}",
            missing.id, missing.page
        ));
    }
    for id in &report.unverified {
        ctx.reporter
            .warning(&format!("unverified {id}: its route was not scanned"));
    }
    for updated in &report.updated {
        ctx.reporter
            .warning(&format!("updated {}: {}", updated.id, updated.changes.join(", ")));
    }
    for added in &report.added {
        ctx.reporter.detail(&format!("new {} ({})", added.id, added.selector));
    }
    let s = report.summary;
    let line = format!(
        "{} tracked: {} missing, {} updated, {} new, {} unchanged",
        s.total_tracked, s.missing, s.updated, s.new, s.unchanged
    );
    if report.has_drift() {
        ctx.reporter.warning(&line);
    } else {
        ctx.reporter.success(&line);
    }
}
