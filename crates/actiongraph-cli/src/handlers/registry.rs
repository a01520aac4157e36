//! Registry command handlers

use actiongraph::collect::{collect_selectors, CollectOptions};
use actiongraph::registry::{SelectorEntry, SelectorRegistry};

use super::{block_on, load_snapshot, Context};
use crate::commands::{RegistryCommand, ScanArgs};
use crate::error::{CliError, CliResult};

/// Execute a `registry` subcommand
pub fn execute_registry(ctx: &Context, command: &RegistryCommand) -> CliResult<()> {
    let path = &ctx.config.registry_path;
    match command {
        RegistryCommand::Show { page, json } => {
            let registry = SelectorRegistry::load(path).map_err(CliError::library)?;
            if *json {
                ctx.reporter.raw(&registry.to_json().map_err(CliError::library)?)?;
                return Ok(());
            }
            let entries: Vec<&SelectorEntry> = match page {
                Some(page) => registry.entries_on_page(page).collect(),
                None => registry.entries().collect(),
            };
            if entries.is_empty() {
                ctx.reporter.warning(&format!("no selectors in {}", path.display()));
            }
            for entry in entries {
                ctx.reporter.raw(&format_entry(entry))?;
            }
        }
        RegistryCommand::Merge(args) => {
            let mut registry = SelectorRegistry::load(path).map_err(CliError::library)?;
            let options = collect_options(ctx, args)?;
            let mut loaded = load_snapshot(&args.page)?;
            let scan = block_on(collect_selectors(&mut loaded.page, &options))?;
            for skipped in &scan.skipped_routes {
                ctx.reporter
                    .warning(&format!("skipped {}: {}", skipped.route, skipped.reason));
            }
            let summary = registry.merge(&scan).map_err(CliError::library)?;
            registry.save(path).map_err(CliError::library)?;
            ctx.reporter.success(&format!(
                "merged {} candidates into {}: {} inserted, {} replaced, {} kept",
                scan.entries.len(),
                path.display(),
                summary.inserted,
                summary.replaced,
                summary.kept
            ));
        }
    }
    Ok(())
}

/// Collect options from scan arguments: explicit routes, else every route
/// in the snapshot.
pub fn collect_options(ctx: &Context, args: &ScanArgs) -> CliResult<CollectOptions> {
    let loaded = load_snapshot(&args.page)?;
    let routes = if args.routes.is_empty() {
        loaded.routes
    } else {
        args.routes.clone()
    };
    if routes.is_empty() {
        return Err(CliError::invalid_argument("snapshot has no routes to scan"));
    }
    Ok(CollectOptions::new(loaded.base_url, routes).with_navigation_timeout(ctx.config.navigation_timeout()))
}

/// `id  type  priority  page  selector`
#[must_use]
pub fn format_entry(entry: &SelectorEntry) -> String {
    format!(
        "{:<28} {:<7} p{} {:<16} {}",
        entry.id,
        entry.kind.as_str(),
        entry.priority,
        entry.page,
        entry.selector
    )
}
