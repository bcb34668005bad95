//! Error types for lease operations.

use thiserror::Error;

/// Errors surfaced by lease backends.
#[derive(Debug, Error)]
pub enum LeaseError {
    /// A usable capacity snapshot could not be fetched: the pool is unknown,
    /// the management API exhausted its retry budget, or the payload was
    /// empty or unparseable.
    #[error("backend unavailable for pool {pool_id}: {reason}")]
    BackendUnavailable { pool_id: String, reason: String },

    /// The snapshot was fetched but the size update was refused after the
    /// retry budget.
    #[error("backend rejected size update for pool {pool_id}: {reason}")]
    BackendRejected { pool_id: String, reason: String },

    /// The serializing lock could not be acquired right now.
    ///
    /// Callers should treat this as "try again later". The autoscaling lend
    /// path never surfaces it (see `AutoscalingLeaseBackend::lend_instances`).
    #[error("lock unavailable for pool {pool_id}")]
    LockUnavailable { pool_id: String },

    /// The request itself was malformed.
    #[error("invalid lease request: {0}")]
    InvalidRequest(String),
}

impl LeaseError {
    /// Whether the caller may expect the same request to succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            LeaseError::BackendUnavailable { .. } => true,
            LeaseError::BackendRejected { .. } => true,
            LeaseError::LockUnavailable { .. } => true,
            LeaseError::InvalidRequest(_) => false,
        }
    }
}
