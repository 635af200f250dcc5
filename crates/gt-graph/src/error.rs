//! Network-layer error types.

use gt_core::{CoreError, NodeId};
use thiserror::Error;

use crate::port::PortTag;
use crate::state::StateKind;

pub type StateResult<T> = Result<T, StateError>;
pub type NodeResult<T> = Result<T, NodeError>;
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors raised by PortState operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("PortState kind mismatch: {left} vs {right}")]
    KindMismatch { left: StateKind, right: StateKind },

    #[error("Vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Relaxation coefficient {value} outside [0, 1]")]
    InvalidCoefficient { value: f64 },

    #[error("{kind} state has no scalar value")]
    NotScalar { kind: StateKind },
}

/// Errors a node reports from `process`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Port '{tag}' is not declared by this node")]
    UnknownPort { tag: PortTag },

    #[error("Required port '{tag}' carries no value")]
    MissingInput { tag: PortTag },

    #[error("Expected {expected} output states, got {found}")]
    OutputCount { expected: usize, found: usize },

    #[error("Invalid input: {what}")]
    Domain { what: String },

    #[error(transparent)]
    State(#[from] StateError),
}

impl NodeError {
    /// Shorthand for a domain-invalid input.
    pub fn domain(what: impl Into<String>) -> Self {
        NodeError::Domain { what: what.into() }
    }
}

/// Errors raised while wiring, ordering or solving a network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Unknown node {node}")]
    UnknownNode { node: NodeId },

    #[error("Node {node} has no port '{tag}'")]
    UnknownPort { node: NodeId, tag: PortTag },

    #[error("Node {node} declares port '{tag}' more than once")]
    DuplicatePort { node: NodeId, tag: PortTag },

    #[error("Cannot link port '{tag}' of node {node} to another port of the same node")]
    SelfLink { node: NodeId, tag: PortTag },

    #[error("Free port: '{tag}' of node {node} ('{name}') is not linked")]
    FreePort {
        node: NodeId,
        name: String,
        tag: PortTag,
    },

    #[error("Context of node {node} ('{name}') is not defined")]
    ContextUndefined { node: NodeId, name: String },

    #[error("No start nodes: every node requires another (cycle among {})", join_nodes(.cycle))]
    NoStartNodes { cycle: Vec<NodeId> },

    #[error("Unresolvable dependency cycle among nodes {}", join_nodes(.nodes))]
    Cycle { nodes: Vec<NodeId> },

    #[error("Node {node} ('{name}') failed: {source}")]
    Process {
        node: NodeId,
        name: String,
        #[source]
        source: NodeError,
    },

    #[error("Snapshot shape mismatch: {before} vs {after} ports")]
    SnapshotMismatch { before: usize, after: usize },

    #[error("Residual of port '{tag}' on node {node}: {source}")]
    Residual {
        node: NodeId,
        tag: PortTag,
        #[source]
        source: StateError,
    },

    #[error("Port '{tag}' of node {node} holds {found}, expected a vector")]
    NotVector {
        node: NodeId,
        tag: PortTag,
        found: StateKind,
    },

    #[error("Port '{tag}' of node {node} carries no value")]
    EmptyPort { node: NodeId, tag: PortTag },

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn join_nodes(nodes: &[NodeId]) -> String {
    nodes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
