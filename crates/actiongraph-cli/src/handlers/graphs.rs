//! Graph store command handlers

use actiongraph::graph::StoredGraph;
use serde::Serialize;

use super::{describe, Context};
use crate::commands::GraphsCommand;
use crate::error::{CliError, CliResult};

/// One row of `graphs list --json`
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphListing {
    /// Spec id
    pub spec_id: String,
    /// Scenario slug
    pub scenario: String,
    /// Snapshot version (epoch millis), absent for the unversioned file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// File path
    pub path: String,
}

impl From<&StoredGraph> for GraphListing {
    fn from(stored: &StoredGraph) -> Self {
        Self {
            spec_id: stored.spec_id.clone(),
            scenario: stored.scenario_slug.clone(),
            version: stored.version,
            path: stored.path.display().to_string(),
        }
    }
}

/// Execute a `graphs` subcommand
pub fn execute_graphs(ctx: &Context, command: &GraphsCommand) -> CliResult<()> {
    let store = ctx.store();
    match command {
        GraphsCommand::List { spec, json } => {
            let stored = match spec {
                Some(spec) => store.list_by_spec(spec),
                None => store.list_all(),
            }
            .map_err(CliError::library)?;
            let rows: Vec<GraphListing> = stored.iter().map(GraphListing::from).collect();
            if *json {
                let out = serde_json::to_string_pretty(&rows).map_err(CliError::library)?;
                ctx.reporter.raw(&out)?;
            } else if rows.is_empty() {
                ctx.reporter.warning(&format!("no graphs in {}", store.root().display()));
            } else {
                for row in &rows {
                    ctx.reporter.raw(&format_row(row))?;
                }
            }
        }
        GraphsCommand::Show(selector) => {
            let graph = ctx.load_graph(selector)?;
            let json = graph.to_json().map_err(CliError::library)?;
            ctx.reporter.raw(&json)?;
        }
        GraphsCommand::Delete(selector) => {
            let removed = store
                .delete(&selector.spec_id, selector.scenario.as_deref())
                .map_err(CliError::library)?;
            if removed == 0 {
                return Err(CliError::GraphNotFound {
                    what: describe(selector),
                });
            }
            ctx.reporter
                .success(&format!("deleted {removed} file(s) for {}", describe(selector)));
        }
        GraphsCommand::Clear => {
            let removed = store.clear().map_err(CliError::library)?;
            ctx.reporter.success(&format!("deleted {removed} graph file(s)"));
        }
    }
    Ok(())
}

/// `spec  scenario  version  path`
#[must_use]
pub fn format_row(row: &GraphListing) -> String {
    let version = row
        .version
        .map_or_else(|| "latest".to_string(), |v| format!("v{v}"));
    format!("{:<20} {:<32} {:<16} {}", row.spec_id, row.scenario, version, row.path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_row() {
        let row = GraphListing {
            spec_id: "auth".into(),
            scenario: "user-logs-in".into(),
            version: None,
            path: "g/auth__user-logs-in.json".into(),
        };
        let line = format_row(&row);
        assert!(line.starts_with("auth "));
        assert!(line.contains("latest"));
        assert!(line.ends_with("g/auth__user-logs-in.json"));
    }

    #[test]
    fn test_listing_json_skips_missing_version() {
        let row = GraphListing {
            spec_id: "auth".into(),
            scenario: "x".into(),
            version: None,
            path: "p".into(),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("version"));
        assert!(json.contains("specId"));
    }
}
