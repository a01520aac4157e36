//! Config command handler

use actiongraph::config::ActionGraphConfig;

use super::Context;
use crate::commands::ConfigArgs;
use crate::error::{CliError, CliResult};

/// Execute the config command
pub fn execute_config(ctx: &Context, args: &ConfigArgs) -> CliResult<()> {
    let config = if args.defaults {
        ActionGraphConfig::default()
    } else {
        ctx.config.clone()
    };
    ctx.reporter.raw(&render_config(&config)?)?;
    if !args.defaults {
        ctx.reporter
            .detail(&format!("workers (effective): {}", config.effective_workers()));
    }
    Ok(())
}

/// YAML rendering of a configuration
pub fn render_config(config: &ActionGraphConfig) -> CliResult<String> {
    config
        .to_yaml()
        .map_err(|e| CliError::config(format!("cannot render configuration: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let yaml = render_config(&ActionGraphConfig::default()).unwrap();
        assert!(yaml.contains("graphs_dir: .actiongraph/graphs"));
        assert!(yaml.contains("ambiguity_policy: first"));
        assert!(!yaml.contains("strategy_order"));
    }
}
