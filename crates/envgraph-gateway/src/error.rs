//! Gateway error types.

use thiserror::Error;

/// Result type alias for provisioning operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised while handing a plan to a backend.
///
/// Nothing here is retried. `ApplyFailed` carries the position in the
/// build order so a later run can pick up from there.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("apply failed at position {position} ({resource}): {reason}")]
    ApplyFailed {
        resource: String,
        position: usize,
        reason: String,
    },

    #[error("backend reported {received} outcomes for {expected} resources")]
    IncompleteApply { expected: usize, received: usize },

    #[error("state file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
