//! Graph errors
//!
//! Structural problems found while restoring a record are skipped and
//! logged; only contract violations by the caller surface as errors.

use crate::node::NodeKey;
use crate::pin::{PinAddress, PinDirection};
use crate::storage::StorageError;
use crate::value::ValueType;
use thiserror::Error;

/// Errors returned by node script operations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0:?} is not part of this script")]
    NodeNotFound(NodeKey),

    #[error("the exit node cannot be removed")]
    ExitNodeRemoval,

    #[error("pin {0:?} does not exist")]
    PinNotFound(PinAddress),

    #[error("node {node:?} has no pin collection {collection}")]
    CollectionNotFound { node: NodeKey, collection: usize },

    #[error("cannot connect two {0:?} pins")]
    SameDirection(PinDirection),

    #[error("an input of type {input} cannot accept an output of type {output}")]
    IncompatibleTypes { output: ValueType, input: ValueType },

    #[error("pin collection '{0}' is already at its minimum size")]
    CollectionAtMinimum(String),

    #[error("script '{0}' is already initialized")]
    AlreadyInitialized(String),

    #[error("no node type '{type_name}' registered by plugin '{plugin}'")]
    UnknownNodeType { plugin: String, type_name: String },

    #[error("record error: {0}")]
    Record(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
