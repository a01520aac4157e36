//! Action Graph IR.
//!
//! A graph is one scenario: typed nodes in emission order plus the edges that
//! order them. Everything here serializes to camelCase JSON so persisted graphs
//! are portable and byte-stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Only supported IR version
pub const GRAPH_VERSION: &str = "1.0";

/// Node id prefix for background steps
pub const BACKGROUND_PREFIX: &str = "bg_";

/// Node id prefix for scenario steps
pub const STEP_PREFIX: &str = "step_";

/// Reserved metadata keys
pub mod metadata_keys {
    /// Retry count for replay
    pub const RETRIES: &str = "retries";
    /// Per-node timeout in milliseconds
    pub const TIMEOUT: &str = "timeout";
    /// Abort the rest of the scenario on failure
    pub const CRITICAL: &str = "critical";
    /// Fixture values
    pub const TEST_DATA: &str = "testData";
}

/// Errors raised while building or validating a graph
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// `specId` not set
    #[error("Graph requires a spec id")]
    MissingSpecId,

    /// `scenarioName` not set
    #[error("Graph requires a scenario name")]
    MissingScenarioName,

    /// Neither background nor scenario steps
    #[error("Graph must contain at least one node")]
    NoNodes,

    /// Unsupported IR version
    #[error("Unsupported graph version '{version}' (expected {GRAPH_VERSION})")]
    UnsupportedVersion {
        /// Version found
        version: String,
    },

    /// Two nodes share an id
    #[error("Duplicate node id '{node_id}'")]
    DuplicateNodeId {
        /// Offending id
        node_id: String,
    },

    /// `stepIndex` not strictly increasing
    #[error("Node '{node_id}' has stepIndex {current} after {previous}")]
    StepIndexOrder {
        /// Offending node
        node_id: String,
        /// Index of the previous node
        previous: usize,
        /// Index of this node
        current: usize,
    },

    /// Background node emitted after a scenario node
    #[error("Background node '{node_id}' appears after scenario steps")]
    BackgroundOrder {
        /// Offending node
        node_id: String,
    },

    /// Edge endpoint does not exist
    #[error("Edge {from} -> {to} references an unknown node")]
    DanglingEdge {
        /// Edge source
        from: String,
        /// Edge target
        to: String,
    },

    /// Edges form a cycle
    #[error("Edges form a cycle through '{node_id}'")]
    Cycle {
        /// A node on the cycle
        node_id: String,
    },

    /// Scenario definition could not be parsed
    #[error("Invalid scenario definition: {message}")]
    InvalidScenario {
        /// Parser message
        message: String,
    },
}

/// Semantic node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Go to a URL
    Navigate,
    /// Look at the page without acting
    Observe,
    /// Interact with an element
    Act,
    /// Read a value out of the page
    Extract,
    /// Check an expectation
    Assert,
    /// Precondition
    Setup,
    /// Cleanup
    Teardown,
}

impl NodeType {
    /// Lower-case wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Observe => "observe",
            Self::Act => "act",
            Self::Extract => "extract",
            Self::Assert => "assert",
            Self::Setup => "setup",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gherkin step keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    /// Given
    Given,
    /// When
    When,
    /// Then
    Then,
    /// And
    And,
    /// But
    But,
}

impl Keyword {
    /// Capitalized form used in documents
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        }
    }

    /// Lower-case form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Given => "given",
            Self::When => "when",
            Self::Then => "then",
            Self::And => "and",
            Self::But => "but",
        }
    }

    /// `and` / `but`
    #[must_use]
    pub const fn is_conjunction(self) -> bool {
        matches!(self, Self::And | Self::But)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Keyword {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "given" => Ok(Self::Given),
            "when" => Ok(Self::When),
            "then" => Ok(Self::Then),
            "and" => Ok(Self::And),
            "but" => Ok(Self::But),
            other => Err(BuildError::InvalidScenario {
                message: format!("unknown keyword '{other}'"),
            }),
        }
    }
}

/// Gherkin keyword and sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GherkinStep {
    /// Keyword
    pub keyword: Keyword,
    /// Sentence after the keyword
    pub text: String,
}

/// Machine-executable action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeterministicAction {
    /// Click the element
    Click,
    /// Type `value` into the element
    Fill,
    /// Choose option `value`
    Select,
    /// Go to URL `value`
    Navigate,
    /// Pause `value` milliseconds
    Wait,
    /// Set checkbox state from `value`
    Check,
}

impl DeterministicAction {
    /// Lower-case wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Select => "select",
            Self::Navigate => "navigate",
            Self::Wait => "wait",
            Self::Check => "check",
        }
    }

    /// Whether the action targets an element
    #[must_use]
    pub const fn needs_element(self) -> bool {
        !matches!(self, Self::Navigate | Self::Wait)
    }
}

/// `{selector?, action?, value?}` triple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicInstruction {
    /// Selector id or free-text hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Action to perform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<DeterministicAction>,
    /// Action argument or expected text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl DeterministicInstruction {
    /// Instruction performing `action`
    #[must_use]
    pub fn action(action: DeterministicAction) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    /// Set the selector
    #[must_use]
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Set the value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Assertion that `text` is present
    #[must_use]
    pub fn expect_text(text: impl Into<String>) -> Self {
        Self::default().value(text)
    }
}

/// Natural and deterministic forms of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    /// Raw sentence, always retained
    pub natural: String,
    /// Machine-executable form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deterministic: Option<DeterministicInstruction>,
}

/// Selector known at build time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRef {
    /// Selector id
    pub id: String,
    /// Raw locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// Whether the locator came from a trusted source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// Execution lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Not started
    #[default]
    Pending,
    /// In progress
    Running,
    /// Completed
    Success,
    /// Errored
    Failed,
    /// Not attempted
    Skipped,
}

/// Execution record of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Lifecycle state
    pub state: ExecutionState,
    /// Start timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// End timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Served from cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Cache key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    /// Unique id (`bg_i` / `step_i`)
    pub node_id: String,
    /// Semantic type
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// 0-based emission order
    pub step_index: usize,
    /// Human-readable step
    pub gherkin_step: GherkinStep,
    /// Natural and deterministic instructions
    pub instructions: Instructions,
    /// Known selectors
    #[serde(default)]
    pub selectors: Vec<SelectorRef>,
    /// Execution record
    #[serde(default)]
    pub execution: Execution,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ActionNode {
    /// Whether the node belongs to the Background block
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.node_id.starts_with(BACKGROUND_PREFIX)
    }

    /// Deterministic instruction, if any
    #[must_use]
    pub fn instruction(&self) -> Option<&DeterministicInstruction> {
        self.instructions.deterministic.as_ref()
    }

    /// Resolver hint: the instruction selector, else the first selector
    /// reference's id.
    #[must_use]
    pub fn selector_hint(&self) -> Option<&str> {
        self.instruction()
            .and_then(|i| i.selector.as_deref())
            .or_else(|| self.selectors.first().map(|s| s.id.as_str()))
    }

    /// Locator recorded for selector `id`, unless it was marked unverified
    #[must_use]
    pub fn selector_locator(&self, id: &str) -> Option<&str> {
        self.selectors
            .iter()
            .filter(|s| s.id == id && s.verified != Some(false))
            .find_map(|s| s.locator.as_deref())
    }

    /// `retries` metadata (0 when absent)
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.metadata
            .get(metadata_keys::RETRIES)
            .and_then(serde_json::Value::as_u64)
            .map_or(0, |n| n.min(u64::from(u32::MAX)) as u32)
    }

    /// `timeout` metadata in milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> Option<u64> {
        self.metadata
            .get(metadata_keys::TIMEOUT)
            .and_then(serde_json::Value::as_u64)
    }

    /// `critical` metadata
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.metadata
            .get(metadata_keys::CRITICAL)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// `testData` metadata
    #[must_use]
    pub fn test_data(&self) -> Option<&serde_json::Value> {
        self.metadata.get(metadata_keys::TEST_DATA)
    }
}

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// `to` runs after `from`
    Sequential,
    /// `to` runs when `condition` holds
    Conditional,
    /// `to` may run alongside `from`
    Parallel,
}

/// Ordering edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id
    pub from: String,
    /// Target node id
    pub to: String,
    /// Edge kind
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Guard expression for conditional edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Edge {
    /// Sequential edge
    #[must_use]
    pub fn sequential(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: EdgeType::Sequential,
            condition: None,
        }
    }
}

/// Who authored the scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthoredBy {
    /// Drafted by a language model
    Llm,
    /// Written by hand
    Manual,
    /// Both
    Hybrid,
}

/// Authorship record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorship {
    /// Free-form mode label (`recorded`, `interactive`, ...)
    pub authoring_mode: String,
    /// Author class
    pub authored_by: AuthoredBy,
}

/// Graph-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Owning spec
    pub spec_id: String,
    /// Scenario name
    pub scenario_name: String,
    /// Feature name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    /// Scenario tags without `@`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_tags: Option<Vec<String>>,
    /// Authorship
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<Authorship>,
}

/// A versioned scenario graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGraph {
    /// Fresh id per snapshot
    pub graph_id: String,
    /// IR version
    pub version: String,
    /// Nodes in emission order
    pub nodes: Vec<ActionNode>,
    /// Ordering edges
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Graph metadata
    pub metadata: GraphMetadata,
}

impl ActionGraph {
    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.version != GRAPH_VERSION {
            return Err(BuildError::UnsupportedVersion {
                version: self.version.clone(),
            });
        }
        if self.metadata.spec_id.trim().is_empty() {
            return Err(BuildError::MissingSpecId);
        }
        if self.metadata.scenario_name.trim().is_empty() {
            return Err(BuildError::MissingScenarioName);
        }
        if self.nodes.is_empty() {
            return Err(BuildError::NoNodes);
        }

        let mut seen = HashSet::new();
        let mut previous: Option<&ActionNode> = None;
        let mut in_scenario = false;
        for node in &self.nodes {
            if !seen.insert(node.node_id.as_str()) {
                return Err(BuildError::DuplicateNodeId {
                    node_id: node.node_id.clone(),
                });
            }
            if let Some(prev) = previous {
                if node.step_index <= prev.step_index {
                    return Err(BuildError::StepIndexOrder {
                        node_id: node.node_id.clone(),
                        previous: prev.step_index,
                        current: node.step_index,
                    });
                }
            }
            if node.is_background() {
                if in_scenario {
                    return Err(BuildError::BackgroundOrder {
                        node_id: node.node_id.clone(),
                    });
                }
            } else {
                in_scenario = true;
            }
            previous = Some(node);
        }

        for edge in &self.edges {
            if !seen.contains(edge.from.as_str()) || !seen.contains(edge.to.as_str()) {
                return Err(BuildError::DanglingEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            }
        }
        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), BuildError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            adjacency
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for node in &self.nodes {
            let start = node.node_id.as_str();
            if marks.contains_key(start) {
                continue;
            }
            // Iterative DFS: (node, next child index)
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Visiting);
            while let Some((current, child)) = stack.pop() {
                let children = adjacency.get(current).map_or(&[][..], Vec::as_slice);
                if let Some(&next) = children.get(child) {
                    stack.push((current, child + 1));
                    match marks.get(next) {
                        Some(Mark::Visiting) => {
                            return Err(BuildError::Cycle {
                                node_id: next.to_string(),
                            })
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(next, Mark::Visiting);
                            stack.push((next, 0));
                        }
                    }
                } else {
                    marks.insert(current, Mark::Done);
                }
            }
        }
        Ok(())
    }

    /// Background nodes in order
    pub fn background_nodes(&self) -> impl Iterator<Item = &ActionNode> {
        self.nodes.iter().filter(|n| n.is_background())
    }

    /// Scenario nodes in order
    pub fn scenario_nodes(&self) -> impl Iterator<Item = &ActionNode> {
        self.nodes.iter().filter(|n| !n.is_background())
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&ActionNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    /// Scenario tags, empty when unset
    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.metadata.scenario_tags.as_deref().unwrap_or(&[])
    }

    /// Pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse graph JSON (not validated)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn node(id: &str, index: usize, keyword: Keyword, node_type: NodeType) -> ActionNode {
        ActionNode {
            node_id: id.to_string(),
            node_type,
            step_index: index,
            gherkin_step: GherkinStep {
                keyword,
                text: format!("step {id}"),
            },
            instructions: Instructions {
                natural: format!("step {id}"),
                deterministic: None,
            },
            selectors: Vec::new(),
            execution: Execution::default(),
            metadata: BTreeMap::new(),
        }
    }

    fn graph(nodes: Vec<ActionNode>, edges: Vec<Edge>) -> ActionGraph {
        ActionGraph {
            graph_id: "g-1".to_string(),
            version: GRAPH_VERSION.to_string(),
            nodes,
            edges,
            metadata: GraphMetadata {
                created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
                spec_id: "auth".to_string(),
                scenario_name: "Login".to_string(),
                feature_name: None,
                scenario_tags: None,
                authorship: None,
            },
        }
    }

    fn linear() -> ActionGraph {
        graph(
            vec![
                node("bg_0", 0, Keyword::Given, NodeType::Setup),
                node("step_0", 1, Keyword::When, NodeType::Act),
                node("step_1", 2, Keyword::Then, NodeType::Assert),
            ],
            vec![Edge::sequential("bg_0", "step_0"), Edge::sequential("step_0", "step_1")],
        )
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_linear_graph_is_valid() {
            assert!(linear().validate().is_ok());
        }

        #[test]
        fn test_version_must_match() {
            let mut g = linear();
            g.version = "2.0".to_string();
            assert!(matches!(g.validate(), Err(BuildError::UnsupportedVersion { .. })));
        }

        #[test]
        fn test_empty_graph() {
            assert_eq!(graph(vec![], vec![]).validate(), Err(BuildError::NoNodes));
        }

        #[test]
        fn test_missing_metadata() {
            let mut g = linear();
            g.metadata.scenario_name = " ".to_string();
            assert_eq!(g.validate(), Err(BuildError::MissingScenarioName));
            g.metadata.spec_id = String::new();
            assert_eq!(g.validate(), Err(BuildError::MissingSpecId));
        }

        #[test]
        fn test_duplicate_ids() {
            let mut g = linear();
            g.nodes[2].node_id = "step_0".to_string();
            assert!(matches!(g.validate(), Err(BuildError::DuplicateNodeId { .. })));
        }

        #[test]
        fn test_step_index_must_increase() {
            let mut g = linear();
            g.nodes[2].step_index = 1;
            assert!(matches!(g.validate(), Err(BuildError::StepIndexOrder { current: 1, .. })));
        }

        #[test]
        fn test_background_after_scenario() {
            let g = graph(
                vec![
                    node("step_0", 0, Keyword::Given, NodeType::Setup),
                    node("bg_0", 1, Keyword::Given, NodeType::Setup),
                ],
                vec![],
            );
            assert!(matches!(g.validate(), Err(BuildError::BackgroundOrder { .. })));
        }

        #[test]
        fn test_dangling_edge() {
            let mut g = linear();
            g.edges.push(Edge::sequential("step_1", "step_9"));
            assert!(matches!(g.validate(), Err(BuildError::DanglingEdge { .. })));
        }

        #[test]
        fn test_cycle_rejected() {
            let mut g = linear();
            g.edges.push(Edge::sequential("step_1", "bg_0"));
            assert!(matches!(g.validate(), Err(BuildError::Cycle { .. })));
        }

        #[test]
        fn test_diamond_is_not_a_cycle() {
            let mut g = linear();
            g.edges.push(Edge::sequential("bg_0", "step_1"));
            assert!(g.validate().is_ok());
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_camel_case_wire_format() {
            let json = serde_json::to_value(linear()).unwrap();
            assert_eq!(json["graphId"], "g-1");
            assert_eq!(json["nodes"][0]["nodeId"], "bg_0");
            assert_eq!(json["nodes"][0]["type"], "setup");
            assert_eq!(json["nodes"][0]["gherkinStep"]["keyword"], "given");
            assert_eq!(json["nodes"][0]["execution"]["state"], "pending");
            assert_eq!(json["edges"][0]["type"], "sequential");
            assert_eq!(json["metadata"]["specId"], "auth");
        }

        #[test]
        fn test_json_round_trip_is_stable() {
            let g = linear();
            let first = g.to_json().unwrap();
            let parsed = ActionGraph::from_json(&first).unwrap();
            assert_eq!(parsed, g);
            assert_eq!(parsed.to_json().unwrap(), first);
        }
    }

    mod node_tests {
        use super::*;

        #[test]
        fn test_reserved_metadata() {
            let mut n = node("step_0", 0, Keyword::When, NodeType::Act);
            assert_eq!(n.retries(), 0);
            assert!(!n.is_critical());
            n.metadata.insert("retries".into(), serde_json::json!(2));
            n.metadata.insert("timeout".into(), serde_json::json!(500));
            n.metadata.insert("critical".into(), serde_json::json!(true));
            assert_eq!(n.retries(), 2);
            assert_eq!(n.timeout_ms(), Some(500));
            assert!(n.is_critical());
        }

        #[test]
        fn test_selector_hint_prefers_instruction() {
            let mut n = node("step_0", 0, Keyword::When, NodeType::Act);
            n.selectors.push(SelectorRef {
                id: "from-ref".into(),
                locator: None,
                verified: None,
            });
            assert_eq!(n.selector_hint(), Some("from-ref"));
            n.instructions.deterministic =
                Some(DeterministicInstruction::action(DeterministicAction::Click).selector("btn"));
            assert_eq!(n.selector_hint(), Some("btn"));
        }

        #[test]
        fn test_keyword_parsing() {
            assert_eq!(" Then ".parse::<Keyword>().unwrap(), Keyword::Then);
            assert!("whenever".parse::<Keyword>().is_err());
            assert_eq!(Keyword::But.to_string(), "But");
        }
    }
}
