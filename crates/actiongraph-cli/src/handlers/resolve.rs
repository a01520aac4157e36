//! Resolve command handler
//!
//! Loads one route of a snapshot and runs the resolver with a collecting
//! sink, printing every attempt so a failing hint can be debugged.

use actiongraph::page::Page;
use actiongraph::resolver::{
    parse_strategy_list, RegistryCache, ResolutionAttempt, ResolutionSink, ResolveOptions,
    Resolver,
};
use actiongraph::ActionGraphError;
use std::sync::{Arc, Mutex};

use super::{block_on, load_snapshot, Context};
use crate::commands::ResolveArgs;
use crate::error::{CliError, CliResult};

/// Sink that keeps attempts for printing
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    attempts: Arc<Mutex<Vec<ResolutionAttempt>>>,
}

impl CollectingSink {
    /// Recorded attempts
    #[must_use]
    pub fn attempts(&self) -> Vec<ResolutionAttempt> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl ResolutionSink for CollectingSink {
    fn record(&self, attempt: &ResolutionAttempt) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(attempt.clone());
        }
    }
}

/// Execute the resolve command
pub fn execute_resolve(ctx: &Context, args: &ResolveArgs) -> CliResult<()> {
    let mut loaded = load_snapshot(&args.page)?;
    let url = format!(
        "{}/{}",
        loaded.base_url.trim_end_matches('/'),
        args.route.trim_start_matches('/')
    );

    let sink = CollectingSink::default();
    let mut resolver = Resolver::new(RegistryCache::new(&ctx.config.registry_path))
        .with_sink(sink.clone())
        .with_policy(args.policy.map_or(ctx.config.ambiguity_policy, Into::into));
    if let Some(order) = &ctx.config.strategy_order {
        resolver = resolver.with_strategy_order(order.clone());
    }

    let mut options = ResolveOptions::new().with_expected_tags(&args.tags);
    if let Some(raw) = &args.strategies {
        options = options.with_strategy_order(parse_strategy_list(raw));
    }

    let result = block_on(async {
        loaded.page.navigate(&url).await?;
        let resolution = resolver.resolve(&loaded.page, &args.hint, &options).await?;
        Ok::<_, ActionGraphError>(resolution)
    })?;

    for attempt in sink.attempts() {
        ctx.reporter.detail(&attempt.to_string());
    }
    let resolution = result.map_err(CliError::library)?;
    ctx.reporter.success(&format!(
        "{} → {} via {} ({})",
        args.hint,
        resolution.element.describe(),
        resolution.strategy.as_str(),
        resolution.selector
    ));
    if resolution.was_ambiguous() {
        ctx.reporter.warning(&format!(
            "{} elements matched; the first was used",
            resolution.match_count
        ));
    }
    Ok(())
}
