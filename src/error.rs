use thiserror::Error;

use crate::{common::DType, graph::NodeId};

/// Failure to construct an operator from its inputs and parameters.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("{op}: shape mismatch, {relation}")]
    ShapeMismatch { op: String, relation: String },
    #[error("{op}: input {input} has element type {found}, expected {expected}")]
    TypeMismatch { op: String, input: usize, expected: DType, found: DType },
    #[error("{op}: got {actual} inputs, supported arities are {expected:?}")]
    ArityMismatch { op: String, expected: Vec<usize>, actual: usize },
}

impl OperationError {
    pub fn shape_mismatch(op: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::ShapeMismatch { op: op.into(), relation: relation.into() }
    }
}

/// Failure to turn a validated operator into a kernel.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("no kernel builder registered for {op}")]
    UnsupportedOperator { op: String },
    #[error("{op}: buffer descriptors do not match operator, {reason}")]
    InvalidBuffers { op: String, reason: String },
    #[error("{op}: configuration not supported by kernel, {reason}")]
    UnsupportedConfiguration { op: String, reason: String },
    #[error("failed to lower node {node:?}")]
    Node {
        node: NodeId,
        #[source]
        source: Box<LowerError>,
    },
}

/// Failure while invoking a kernel on concrete buffers.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("invalid buffers: {0}")]
    InvalidBuffers(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0:?} does not exist")]
    NodeDoesNotExist(NodeId),
    #[error("node {node:?} has no output {index}")]
    OutputOutOfBounds { node: NodeId, index: usize },
    #[error("output {index} of node {node:?} does not match the type declared by its producer")]
    InvalidOutput { node: NodeId, index: usize },
    #[error(transparent)]
    Operation(#[from] OperationError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("input node {0:?} was not seeded")]
    MissingInput(NodeId),
    #[error("node {0:?} is not an input and cannot be seeded")]
    SeededNonLeaf(NodeId),
    #[error("seed for node {0:?} does not match its type")]
    InvalidSeed(NodeId),
    #[error("kernel for node {node:?} failed")]
    Kernel {
        node: NodeId,
        #[source]
        source: KernelError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}
