//! actiongraph CLI library
//!
//! Command definitions, presentation settings and handlers behind the
//! `actiongraph` binary.

#![warn(missing_docs)]

mod commands;
mod error;
pub mod handlers;
mod output;
mod settings;

pub use commands::{
    BuildArgs, Cli, ColorArg, Commands, CompileArgs, ConfigArgs, DriftArgs, GraphSelector,
    GraphsCommand, OutputDirs, PolicyArg, RegistryCommand, ReplayArgs, ResolveArgs, ScanArgs,
    SnapshotArgs,
};
pub use error::{CliError, CliResult};
pub use output::{init_logging, Reporter};
pub use settings::{CliSettings, ColorChoice, Verbosity};

use actiongraph::config::ActionGraphConfig;
use handlers::Context;

/// Presentation settings from the global flags
#[must_use]
pub fn settings_from(cli: &Cli) -> CliSettings {
    CliSettings::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into())
}

/// Effective configuration: file and environment, then global flags
pub fn config_from(cli: &Cli) -> CliResult<ActionGraphConfig> {
    let mut config = ActionGraphConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.graphs_dir {
        config = config.with_graphs_dir(dir);
    }
    if let Some(path) = &cli.registry {
        config = config.with_registry_path(path);
    }
    Ok(config)
}

/// Run a parsed command line
pub fn run(cli: Cli) -> CliResult<()> {
    let settings = settings_from(&cli);
    init_logging(&settings);
    let ctx = Context::new(settings, config_from(&cli)?);

    match &cli.command {
        Commands::Build(args) => handlers::build::execute_build(&ctx, args),
        Commands::Compile(args) => handlers::compile::execute_compile(&ctx, args),
        Commands::Replay(args) => handlers::replay::execute_replay(&ctx, args),
        Commands::Graphs { command } => handlers::graphs::execute_graphs(&ctx, command),
        Commands::Registry { command } => handlers::registry::execute_registry(&ctx, command),
        Commands::Drift(args) => handlers::drift::execute_drift(&ctx, args),
        Commands::Resolve(args) => handlers::resolve::execute_resolve(&ctx, args),
        Commands::Config(args) => handlers::config::execute_config(&ctx, args),
    }
}
