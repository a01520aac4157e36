//! Scenario definition → Action Graph.
//!
//! ```
//! use actiongraph::graph::{GraphBuilder, Keyword, ScenarioStep};
//!
//! let graph = GraphBuilder::new()
//!     .spec_id("auth")
//!     .scenario_name("User logs in")
//!     .background(ScenarioStep::new(Keyword::Given, "the app is running"))
//!     .step(ScenarioStep::new(Keyword::When, "I click log in"))
//!     .step(ScenarioStep::new(Keyword::And, "I wait"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.nodes.len(), 3);
//! assert_eq!(graph.edges.len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::model::{
    metadata_keys, ActionGraph, ActionNode, Authorship, BuildError, DeterministicInstruction,
    Edge, Execution, GherkinStep, GraphMetadata, Instructions, Keyword, NodeType, SelectorRef,
    BACKGROUND_PREFIX, GRAPH_VERSION, STEP_PREFIX,
};

/// One authored step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStep {
    /// Gherkin keyword
    pub keyword: Keyword,
    /// Sentence
    pub text: String,
    /// Scenario-local selector id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_id: Option<String>,
    /// Fixture values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<serde_json::Value>,
    /// Explicit node type, bypassing keyword inference
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    /// Deterministic instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<DeterministicInstruction>,
    /// Replay retry count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Replay timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Abort the scenario when this step fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
}

impl ScenarioStep {
    /// Step with a keyword and sentence
    #[must_use]
    pub fn new(keyword: Keyword, text: impl Into<String>) -> Self {
        Self {
            keyword,
            text: text.into(),
            selector_id: None,
            test_data: None,
            node_type: None,
            instruction: None,
            retries: None,
            timeout: None,
            critical: None,
        }
    }

    /// Reference a scenario-local selector
    #[must_use]
    pub fn selector(mut self, id: impl Into<String>) -> Self {
        self.selector_id = Some(id.into());
        self
    }

    /// Attach fixture values
    #[must_use]
    pub fn test_data(mut self, data: serde_json::Value) -> Self {
        self.test_data = Some(data);
        self
    }

    /// Force the node type
    #[must_use]
    pub const fn of_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Attach a deterministic instruction
    #[must_use]
    pub fn instruction(mut self, instruction: DeterministicInstruction) -> Self {
        self.instruction = Some(instruction);
        self
    }

    /// Set replay retries
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Set replay timeout
    #[must_use]
    pub const fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Some(ms);
        self
    }

    /// Mark critical
    #[must_use]
    pub const fn critical(mut self) -> Self {
        self.critical = Some(true);
        self
    }
}

/// Serialized scenario definition (YAML or JSON)
///
/// ```yaml
/// specId: auth
/// scenarioName: User logs in
/// tags: [smoke]
/// selectors:
///   email-input: label=Email
/// background:
///   - { keyword: given, text: the app is running }
/// steps:
///   - keyword: when
///     text: I enter my email
///     selectorId: email-input
///     instruction: { action: fill, value: a@b.com }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    /// Owning spec
    pub spec_id: String,
    /// Scenario name
    pub scenario_name: String,
    /// Feature name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    /// Tags without `@`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Background steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background: Vec<ScenarioStep>,
    /// Scenario steps
    #[serde(default, alias = "scenario")]
    pub steps: Vec<ScenarioStep>,
    /// Scenario-local selector id → raw locator
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selectors: BTreeMap<String, String>,
    /// Authorship
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<Authorship>,
}

impl ScenarioDefinition {
    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, BuildError> {
        serde_yaml_ng::from_str(yaml).map_err(|e| BuildError::InvalidScenario {
            message: e.to_string(),
        })
    }

    /// Parse JSON
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        serde_json::from_str(json).map_err(|e| BuildError::InvalidScenario {
            message: e.to_string(),
        })
    }

    /// Load by extension (`.json`, else YAML)
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path).map_err(|e| BuildError::InvalidScenario {
            message: format!("{}: {e}", path.display()),
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Builder pre-loaded with this definition
    #[must_use]
    pub fn into_builder(self) -> GraphBuilder {
        let mut builder = GraphBuilder::new()
            .spec_id(self.spec_id)
            .scenario_name(self.scenario_name)
            .tags(self.tags);
        builder.feature_name = self.feature_name;
        builder.authorship = self.authorship;
        builder.selectors = self.selectors;
        builder.background = self.background;
        builder.steps = self.steps;
        builder
    }

    /// Build the graph
    pub fn build(self) -> Result<ActionGraph, BuildError> {
        self.into_builder().build()
    }
}

/// Resolve a node type from its keyword.
///
/// The mapping is the same inside and outside the Background block.
/// `previous` is the resolved type of the preceding node, across the
/// background/scenario boundary; conjunctions inherit it, defaulting to
/// [`NodeType::Act`].
#[must_use]
pub const fn infer_node_type(keyword: Keyword, previous: Option<NodeType>) -> NodeType {
    match keyword {
        Keyword::Given => NodeType::Setup,
        Keyword::When => NodeType::Act,
        Keyword::Then => NodeType::Assert,
        Keyword::And | Keyword::But => match previous {
            Some(node_type) => node_type,
            None => NodeType::Act,
        },
    }
}

/// Consuming builder for [`ActionGraph`].
///
/// Every method takes `self`; [`GraphBuilder::build`] consumes the builder and
/// returns a validated graph.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    spec_id: Option<String>,
    scenario_name: Option<String>,
    feature_name: Option<String>,
    tags: Vec<String>,
    authorship: Option<Authorship>,
    selectors: BTreeMap<String, String>,
    background: Vec<ScenarioStep>,
    steps: Vec<ScenarioStep>,
    graph_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl GraphBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the spec id
    #[must_use]
    pub fn spec_id(mut self, spec_id: impl Into<String>) -> Self {
        self.spec_id = Some(spec_id.into());
        self
    }

    /// Set the scenario name
    #[must_use]
    pub fn scenario_name(mut self, name: impl Into<String>) -> Self {
        self.scenario_name = Some(name.into());
        self
    }

    /// Set the feature name
    #[must_use]
    pub fn feature_name(mut self, name: impl Into<String>) -> Self {
        self.feature_name = Some(name.into());
        self
    }

    /// Add a tag (leading `@` is stripped)
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let tag = tag.trim().trim_start_matches('@');
        if !tag.is_empty() {
            self.tags.push(tag.to_string());
        }
        self
    }

    /// Add several tags
    #[must_use]
    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().fold(self, Self::tag)
    }

    /// Set authorship
    #[must_use]
    pub fn authorship(mut self, authorship: Authorship) -> Self {
        self.authorship = Some(authorship);
        self
    }

    /// Register a scenario-local selector
    #[must_use]
    pub fn selector(mut self, id: impl Into<String>, locator: impl Into<String>) -> Self {
        self.selectors.insert(id.into(), locator.into());
        self
    }

    /// Append a background step
    #[must_use]
    pub fn background(mut self, step: ScenarioStep) -> Self {
        self.background.push(step);
        self
    }

    /// Append a scenario step
    #[must_use]
    pub fn step(mut self, step: ScenarioStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Use a fixed graph id instead of a fresh UUID
    #[must_use]
    pub fn graph_id(mut self, graph_id: impl Into<String>) -> Self {
        self.graph_id = Some(graph_id.into());
        self
    }

    /// Use a fixed creation timestamp instead of the clock
    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Finalize into a validated graph.
    pub fn build(self) -> Result<ActionGraph, BuildError> {
        let spec_id = self
            .spec_id
            .filter(|s| !s.trim().is_empty())
            .ok_or(BuildError::MissingSpecId)?;
        let scenario_name = self
            .scenario_name
            .filter(|s| !s.trim().is_empty())
            .ok_or(BuildError::MissingScenarioName)?;

        let mut nodes = Vec::with_capacity(self.background.len() + self.steps.len());
        let mut previous: Option<NodeType> = None;
        let blocks = [
            (BACKGROUND_PREFIX, self.background),
            (STEP_PREFIX, self.steps),
        ];
        for (prefix, steps) in blocks {
            for (i, step) in steps.into_iter().enumerate() {
                let node_type = step
                    .node_type
                    .unwrap_or_else(|| infer_node_type(step.keyword, previous));
                previous = Some(node_type);
                let step_index = nodes.len();
                nodes.push(make_node(
                    format!("{prefix}{i}"),
                    step_index,
                    node_type,
                    step,
                    &self.selectors,
                ));
            }
        }
        if nodes.is_empty() {
            return Err(BuildError::NoNodes);
        }

        let edges = nodes
            .windows(2)
            .map(|pair| Edge::sequential(pair[0].node_id.clone(), pair[1].node_id.clone()))
            .collect();

        let graph = ActionGraph {
            graph_id: self
                .graph_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            version: GRAPH_VERSION.to_string(),
            nodes,
            edges,
            metadata: GraphMetadata {
                created_at: self.created_at.unwrap_or_else(Utc::now),
                spec_id,
                scenario_name,
                feature_name: self.feature_name,
                scenario_tags: (!self.tags.is_empty()).then_some(self.tags),
                authorship: self.authorship,
            },
        };
        graph.validate()?;
        tracing::debug!(
            spec_id = %graph.metadata.spec_id,
            nodes = graph.nodes.len(),
            "built action graph"
        );
        Ok(graph)
    }
}

fn make_node(
    node_id: String,
    step_index: usize,
    node_type: NodeType,
    step: ScenarioStep,
    selectors: &BTreeMap<String, String>,
) -> ActionNode {
    let mut metadata = BTreeMap::new();
    if let Some(data) = step.test_data {
        metadata.insert(metadata_keys::TEST_DATA.to_string(), data);
    }
    if let Some(retries) = step.retries {
        metadata.insert(metadata_keys::RETRIES.to_string(), retries.into());
    }
    if let Some(timeout) = step.timeout {
        metadata.insert(metadata_keys::TIMEOUT.to_string(), timeout.into());
    }
    if let Some(critical) = step.critical {
        metadata.insert(metadata_keys::CRITICAL.to_string(), critical.into());
    }

    let mut node_selectors = Vec::new();
    let referenced = step
        .selector_id
        .as_ref()
        .or_else(|| step.instruction.as_ref().and_then(|i| i.selector.as_ref()));
    if let Some(id) = referenced {
        if let Some(locator) = selectors.get(id) {
            node_selectors.push(SelectorRef {
                id: id.clone(),
                locator: Some(locator.clone()),
                verified: Some(true),
            });
        } else {
            tracing::debug!(%node_id, selector = %id, "selector id not in scenario map");
        }
    }

    let deterministic = step.instruction.map(|mut instruction| {
        if instruction.selector.is_none() {
            instruction.selector.clone_from(&step.selector_id);
        }
        instruction
    });

    ActionNode {
        node_id,
        node_type,
        step_index,
        instructions: Instructions {
            natural: step.text.clone(),
            deterministic,
        },
        gherkin_step: GherkinStep {
            keyword: step.keyword,
            text: step.text,
        },
        selectors: node_selectors,
        execution: Execution::default(),
        metadata,
    }
}
