//! CLI command definitions using clap

use actiongraph::resolver::AmbiguityPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// actiongraph: build, compile and replay deterministic UI test scenarios
#[derive(Parser, Debug)]
#[command(name = "actiongraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Config file (defaults to ./actiongraph.yaml when present)
    #[arg(long, global = true, env = "ACTIONGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Graph store directory
    #[arg(long, global = true)]
    pub graphs_dir: Option<PathBuf>,

    /// Selector registry file
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build Action Graphs from scenario files (YAML or JSON)
    Build(BuildArgs),

    /// Compile a stored graph into a scenario document and step definitions
    Compile(CompileArgs),

    /// Replay a stored graph against a DOM snapshot
    Replay(ReplayArgs),

    /// Inspect and manage stored graphs
    Graphs {
        /// Graph store action
        #[command(subcommand)]
        command: GraphsCommand,
    },

    /// Inspect and update the selector registry
    Registry {
        /// Registry action
        #[command(subcommand)]
        command: RegistryCommand,
    },

    /// Compare the registry against a fresh scan
    Drift(DriftArgs),

    /// Resolve a selector hint against a DOM snapshot
    Resolve(ResolveArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Compile output locations shared by `build` and `compile`
#[derive(Args, Debug, Clone, Default)]
pub struct OutputDirs {
    /// Scenario document directory
    #[arg(long)]
    pub feature_dir: Option<PathBuf>,

    /// Step-definition directory
    #[arg(long)]
    pub steps_dir: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Scenario files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Compile each graph after persisting it
    #[arg(long)]
    pub compile: bool,

    /// Number of parallel workers (0 = one per core)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Overwrite the latest graph instead of writing a versioned snapshot
    #[arg(long)]
    pub no_version: bool,

    /// Compile output directories
    #[command(flatten)]
    pub output: OutputDirs,
}

/// Which stored graph to act on
#[derive(Args, Debug, Clone)]
pub struct GraphSelector {
    /// Spec id
    pub spec_id: String,

    /// Scenario name (required when the spec has several scenarios)
    #[arg(short, long)]
    pub scenario: Option<String>,
}

/// Arguments for the compile command
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Graph to compile
    #[command(flatten)]
    pub graph: GraphSelector,

    /// Print the artifacts instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Add graph id, spec id and node count comments
    #[arg(long)]
    pub include_metadata: bool,

    /// Compile output directories
    #[command(flatten)]
    pub output: OutputDirs,
}

/// DOM snapshot and routes to load
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// DOM snapshot JSON file
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Application base URL (defaults to the snapshot's url)
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Arguments for the replay command
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Graph to replay
    #[command(flatten)]
    pub graph: GraphSelector,

    /// Page to replay against
    #[command(flatten)]
    pub page: SnapshotArgs,

    /// Persist the graph with its execution records
    #[arg(long)]
    pub save: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Graph store actions
#[derive(Subcommand, Debug)]
pub enum GraphsCommand {
    /// List stored graphs
    List {
        /// Only graphs of this spec
        #[arg(long)]
        spec: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored graph
    Show(GraphSelector),

    /// Delete every stored version of a graph
    Delete(GraphSelector),

    /// Delete every stored graph
    Clear,
}

/// Registry actions
#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Print registry entries
    Show {
        /// Only entries on this route
        #[arg(long)]
        page: Option<String>,

        /// Print the registry document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan a DOM snapshot and merge the candidates into the registry
    Merge(ScanArgs),
}

/// Scan input shared by `registry merge` and `drift`
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Page to scan
    #[command(flatten)]
    pub page: SnapshotArgs,

    /// Routes to visit (defaults to every route in the snapshot)
    #[arg(short, long = "route")]
    pub routes: Vec<String>,
}

/// Arguments for the drift command
#[derive(Parser, Debug)]
pub struct DriftArgs {
    /// Scan input
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Merge updated and new selectors into the registry
    #[arg(long)]
    pub apply: bool,

    /// Write the JSON report here
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Exit with an error when drift is found
    #[arg(long)]
    pub fail_on_drift: bool,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Registry id or free-text hint
    pub hint: String,

    /// Page to resolve on
    #[command(flatten)]
    pub page: SnapshotArgs,

    /// Route to load before resolving
    #[arg(long, default_value = "/")]
    pub route: String,

    /// Ambiguity policy
    #[arg(long)]
    pub policy: Option<PolicyArg>,

    /// Comma-separated strategy order
    #[arg(long)]
    pub strategies: Option<String>,

    /// Restrict matches to these tag names
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Color choice argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::settings::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Ambiguity policy argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    /// Fail on multiple matches
    Error,
    /// Log and take the first match
    Warn,
    /// Take the first match
    First,
}

impl From<PolicyArg> for AmbiguityPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Error => Self::Error,
            PolicyArg::Warn => Self::Warn,
            PolicyArg::First => Self::First,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["actiongraph", "build", "a.yaml", "b.yaml", "--compile", "-j", "2"]);
        let Commands::Build(args) = cli.command else {
            unreachable!("expected build");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.compile);
        assert_eq!(args.jobs, Some(2));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["actiongraph", "graphs", "list", "-vv", "--registry", "r.json"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.registry, Some(PathBuf::from("r.json")));
        assert!(matches!(cli.command, Commands::Graphs { command: GraphsCommand::List { .. } }));
    }

    #[test]
    fn test_parse_drift_routes() {
        let cli = Cli::parse_from([
            "actiongraph",
            "drift",
            "--snapshot",
            "dom.json",
            "-r",
            "/login",
            "-r",
            "/legacy",
            "--apply",
        ]);
        let Commands::Drift(args) = cli.command else {
            unreachable!("expected drift");
        };
        assert_eq!(args.scan.routes, vec!["/login", "/legacy"]);
        assert!(args.apply);
    }

    #[test]
    fn test_policy_conversion() {
        assert_eq!(AmbiguityPolicy::from(PolicyArg::Error), AmbiguityPolicy::Error);
    }
}
