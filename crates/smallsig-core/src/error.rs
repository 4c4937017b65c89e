//! Error types for smallsig-core.

use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot allocate matrix entry ({row}, {col}): {reason}")]
    Allocation {
        row: NodeId,
        col: NodeId,
        reason: String,
    },

    #[error("late bind of matrix entry ({row}, {col}) after setup finished")]
    LateBind { row: NodeId, col: NodeId },

    #[error("singular matrix")]
    SingularMatrix,

    #[error("invalid matrix dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("duplicate equation name: {0}")]
    DuplicateName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
