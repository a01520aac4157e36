//! Step-definition source rendering.
//!
//! Emits a Rust module of `cucumber` step functions. Each function matches
//! its step sentence exactly and drives the world's
//! [`StepRuntime`](crate::runtime::StepRuntime):
//!
//! ```text
//! #[when(regex = r"^I enter my email$")]
//! async fn step_1(world: &mut ActionWorld) -> StepResult {
//!     world.runtime.fill("email-input", "user@example.com").await
//! }
//! ```

use std::collections::BTreeMap;

use super::CompileError;
use crate::graph::{ActionGraph, ActionNode, Keyword};
use crate::runtime::{StepCall, Target};

/// World type the generated module expects from its parent module
pub const WORLD_TYPE: &str = "ActionWorld";

/// Render the step-definition module for a graph.
///
/// Nodes whose instruction cannot be executed still get a step function,
/// with an observational body and a comment naming the problem. Two nodes
/// sharing a step sentence share one function when they plan the same
/// call; otherwise the graph is rejected with
/// [`CompileError::ConflictingStep`].
pub fn render_steps(graph: &ActionGraph, include_metadata: bool) -> Result<String, CompileError> {
    let meta = &graph.metadata;
    let mut out = String::new();
    out.push_str(&format!(
        "//! Step definitions for \"{}\".\n//!\n//! Generated by actiongraph; recompile the graph instead of editing.\n",
        one_line(&meta.scenario_name)
    ));
    if include_metadata {
        out.push_str(&format!("//!\n//! graph: {}\n", graph.graph_id));
        out.push_str(&format!("//! spec: {}\n", meta.spec_id));
        out.push_str(&format!("//! nodes: {}\n", graph.nodes.len()));
    }
    out.push('\n');

    let mut bodies = Vec::with_capacity(graph.nodes.len());
    let mut defined: BTreeMap<(Keyword, String), (String, StepCall)> = BTreeMap::new();
    let mut used_keywords: Vec<Keyword> = Vec::new();
    let mut uses_target = false;
    let mut concrete = Keyword::Given;

    for node in &graph.nodes {
        let keyword = node.gherkin_step.keyword;
        if !keyword.is_conjunction() {
            concrete = keyword;
        }
        let text = one_line(&node.gherkin_step.text);
        let (call, note) = plan_or_observe(node);

        if let Some((first, first_call)) = defined.get(&(concrete, text.clone())) {
            if *first_call != call {
                return Err(CompileError::ConflictingStep {
                    keyword: concrete.as_str().to_string(),
                    text,
                    first: first.clone(),
                    second: node.node_id.clone(),
                });
            }
            bodies.push(format!(
                "// {} reuses {first}: {} {}\n",
                node.node_id,
                concrete.as_str(),
                text
            ));
            continue;
        }
        if !used_keywords.contains(&concrete) {
            used_keywords.push(concrete);
        }
        uses_target |= call_uses_target(&call);

        let mut body = String::new();
        body.push_str(&format!(
            "#[{}(regex = {})]\n",
            concrete.as_str(),
            raw_literal(&format!("^{}$", regex::escape(&text)))
        ));
        body.push_str(&format!(
            "async fn {}(world: &mut {WORLD_TYPE}) -> StepResult {{\n",
            node.node_id
        ));
        if let Some(note) = note {
            body.push_str(&format!("    // {note}\n"));
        }
        body.push_str(&format!("    {}\n", render_call(&call)));
        body.push_str("}\n");
        bodies.push(body);
        defined.insert((concrete, text), (node.node_id.clone(), call));
    }

    used_keywords.sort();
    let imports: Vec<&str> = used_keywords.iter().map(|k| k.as_str()).collect();
    if uses_target {
        out.push_str("use actiongraph::runtime::{StepResult, Target};\n");
    } else {
        out.push_str("use actiongraph::runtime::StepResult;\n");
    }
    match imports.as_slice() {
        [single] => out.push_str(&format!("use cucumber::{single};\n\n")),
        _ => out.push_str(&format!("use cucumber::{{{}}};\n\n", imports.join(", "))),
    }
    out.push_str(&format!("use super::{WORLD_TYPE};\n"));
    for body in bodies {
        out.push('\n');
        out.push_str(&body);
    }
    Ok(out)
}

/// The node's call, or an observational call plus the reason it was
/// downgraded
fn plan_or_observe(node: &ActionNode) -> (StepCall, Option<String>) {
    match StepCall::plan(node) {
        Ok(call) => (call, None),
        Err(err) => {
            tracing::warn!(
                node_id = %node.node_id,
                error = %err,
                "instruction cannot be executed; step compiled as observational"
            );
            (StepCall::Observe, Some(one_line(&err.to_string())))
        }
    }
}

fn call_uses_target(call: &StepCall) -> bool {
    match call {
        StepCall::Click { target }
        | StepCall::Fill { target, .. }
        | StepCall::Select { target, .. }
        | StepCall::Check { target, .. }
        | StepCall::AssertVisible { target } => target.locator.is_some(),
        StepCall::AssertText { target, .. } => {
            target.as_ref().is_some_and(|t| t.locator.is_some())
        }
        StepCall::Navigate { .. } | StepCall::Wait { .. } | StepCall::Observe => false,
    }
}

fn render_call(call: &StepCall) -> String {
    match call {
        StepCall::Click { target } => format!("world.runtime.click({}).await", target_expr(target)),
        StepCall::Fill { target, value } => {
            format!("world.runtime.fill({}, {}).await", target_expr(target), lit(value))
        }
        StepCall::Select { target, value } => {
            format!("world.runtime.select({}, {}).await", target_expr(target), lit(value))
        }
        StepCall::Check { target, checked } => {
            format!("world.runtime.check({}, {checked}).await", target_expr(target))
        }
        StepCall::Navigate { url } => format!("world.runtime.navigate({}).await", lit(url)),
        StepCall::Wait { ms } => format!("world.runtime.wait_ms({ms}).await"),
        StepCall::AssertText { target, expected } => format!(
            "world.runtime.assert_text({}, {}).await",
            target.as_ref().map_or_else(
                || "None".to_string(),
                |t| match t.locator {
                    Some(_) => format!("Some({})", target_expr(t)),
                    None => format!("Some({}.into())", lit(&t.hint)),
                }
            ),
            lit(expected)
        ),
        StepCall::AssertVisible { target } => {
            format!("world.runtime.assert_visible({}).await", target_expr(target))
        }
        StepCall::Observe => "let _ = world;\n    Ok(())".to_string(),
    }
}

/// Bare hint literal, or a `Target` carrying the graph's locator
fn target_expr(target: &Target) -> String {
    match &target.locator {
        Some(locator) => format!(
            "Target::new({}).with_locator({})",
            lit(&target.hint),
            lit(locator)
        ),
        None => lit(&target.hint),
    }
}

/// Rust string literal
fn lit(value: &str) -> String {
    format!("{value:?}")
}

/// Raw string literal with enough `#`s to hold `value`
fn raw_literal(value: &str) -> String {
    let mut hashes = 0;
    while value.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{value}\"{fence}")
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
