//! Action Graph: IR, builder and persistence.

mod builder;
mod model;
mod store;

pub use builder::{infer_node_type, GraphBuilder, ScenarioDefinition, ScenarioStep};
pub use model::{
    metadata_keys, ActionGraph, ActionNode, AuthoredBy, Authorship, BuildError,
    DeterministicAction, DeterministicInstruction, Edge, EdgeType, Execution, ExecutionState,
    GherkinStep, GraphMetadata, Instructions, Keyword, NodeType, SelectorRef, BACKGROUND_PREFIX,
    GRAPH_VERSION, STEP_PREFIX,
};
pub use store::{GraphStore, StoreError, StoreResult, StoredGraph, DEFAULT_GRAPHS_DIR};
