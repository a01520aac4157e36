//! Scenario document rendering.

use crate::graph::{ActionGraph, ActionNode};

const INDENT: &str = "  ";

/// Render the Gherkin document for a graph.
///
/// Output depends only on the graph: no clock, no hash-map ordering.
#[must_use]
pub fn render_feature(graph: &ActionGraph, include_metadata: bool) -> String {
    let meta = &graph.metadata;
    let mut out = String::new();

    if include_metadata {
        out.push_str(&format!("# graph: {}\n", graph.graph_id));
        out.push_str(&format!("# spec: {}\n", meta.spec_id));
        out.push_str(&format!("# nodes: {}\n", graph.nodes.len()));
    }
    let feature = meta.feature_name.as_deref().unwrap_or(&meta.scenario_name);
    out.push_str(&format!("Feature: {}\n", single_line(feature)));

    let background: Vec<&ActionNode> = graph.background_nodes().collect();
    if !background.is_empty() {
        out.push('\n');
        out.push_str(&format!("{INDENT}Background:\n"));
        push_steps(&mut out, &background);
    }

    out.push('\n');
    let tags = graph.tags();
    if !tags.is_empty() {
        let line: Vec<String> = tags.iter().map(|t| format!("@{t}")).collect();
        out.push_str(&format!("{INDENT}{}\n", line.join(" ")));
    }
    out.push_str(&format!("{INDENT}Scenario: {}\n", single_line(&meta.scenario_name)));
    let steps: Vec<&ActionNode> = graph.scenario_nodes().collect();
    push_steps(&mut out, &steps);
    out
}

fn push_steps(out: &mut String, nodes: &[&ActionNode]) {
    for node in nodes {
        out.push_str(&format!(
            "{INDENT}{INDENT}{} {}\n",
            node.gherkin_step.keyword.title(),
            single_line(&node.gherkin_step.text)
        ));
    }
}

/// Gherkin lines cannot span lines
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Keyword, ScenarioStep};

    fn graph(with_background: bool) -> ActionGraph {
        let mut builder = GraphBuilder::new()
            .spec_id("auth")
            .scenario_name("User logs in")
            .feature_name("Authentication")
            .graph_id("g-1")
            .tag("smoke");
        if with_background {
            builder = builder.background(ScenarioStep::new(Keyword::Given, "the app is running"));
        }
        builder
            .step(ScenarioStep::new(Keyword::When, "I log in"))
            .step(ScenarioStep::new(Keyword::Then, "I see the\n dashboard"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_render_with_background() {
        let doc = render_feature(&graph(true), false);
        assert_eq!(
            doc,
            "Feature: Authentication\n\
             \n  Background:\n    Given the app is running\n\
             \n  @smoke\n  Scenario: User logs in\n    When I log in\n    Then I see the dashboard\n"
        );
    }

    #[test]
    fn test_render_without_background() {
        let doc = render_feature(&graph(false), false);
        assert!(!doc.contains("Background:"));
        assert!(doc.starts_with("Feature: Authentication\n\n  @smoke\n"));
    }

    #[test]
    fn test_metadata_header() {
        let doc = render_feature(&graph(false), true);
        assert!(doc.starts_with("# graph: g-1\n# spec: auth\n# nodes: 2\nFeature:"));
    }

    #[test]
    fn test_feature_name_defaults_to_scenario() {
        let g = GraphBuilder::new()
            .spec_id("s")
            .scenario_name("Only scenario")
            .step(ScenarioStep::new(Keyword::Given, "x"))
            .build()
            .unwrap();
        assert!(render_feature(&g, false).starts_with("Feature: Only scenario\n"));
    }
}
