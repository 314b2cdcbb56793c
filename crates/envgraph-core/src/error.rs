//! Errors raised while assembling a topology.

use thiserror::Error;

/// Result type alias for topology mutations.
pub type TopologyResult<T> = Result<T, TopologyError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate resource id: {0}")]
    DuplicateResource(String),

    #[error("unknown resource id: {0}")]
    UnknownResource(String),

    #[error("resource {0} cannot follow itself")]
    SelfOrdering(String),
}
