// SPDX-License-Identifier: MIT OR Apache-2.0

use canopy_core::{GrantId, NodeId, UserId};
use canopy_store::StoreError;
use thiserror::Error;

/// Errors raised by engine operations.
///
/// Every mutation error aborts the enclosing transaction with no partial
/// effect. Store failures mid-cascade surface as [`EngineError::Store`];
/// callers are expected to retry the whole operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("grant {0} not found")]
    GrantNotFound(GrantId),

    #[error("invalid grant input: {0}")]
    InvalidInput(String),

    #[error("invalid tree operation: {0}")]
    InvalidOperation(String),

    #[error("user {0} lacks the capability required for this operation")]
    Unauthorized(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
