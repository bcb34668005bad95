//! The lease contract implemented by every backend.

use async_trait::async_trait;

use crate::error::LeaseError;

/// Uniform capacity-leasing interface over heterogeneous cluster backends.
///
/// Upstream policy code depends only on this trait, never on backend
/// internals. `count` must be positive; callers choose it based on domain
/// policy, this layer performs no admission control. Neither operation is
/// atomic end-to-end: only the read-snapshot/compute-target/write-target
/// sequence of a single call is covered by the backend's own concurrency
/// policy.
#[async_trait]
pub trait LeaseBackend: Send + Sync {
    /// Increase the pool's effective capacity by `count` instances.
    async fn lend_instances(&self, pool_id: &str, count: u32) -> Result<(), LeaseError>;

    /// Decrease the pool's effective capacity by `count` instances.
    async fn return_instances(&self, pool_id: &str, count: u32) -> Result<(), LeaseError>;
}

/// Reject non-positive lease counts before touching any backend.
pub(crate) fn validate_count(pool_id: &str, count: u32) -> Result<(), LeaseError> {
    if count == 0 {
        return Err(LeaseError::InvalidRequest(format!(
            "lease count must be positive for pool {pool_id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_is_invalid() {
        let err = validate_count("pool-x", 0).unwrap_err();
        assert!(matches!(err, LeaseError::InvalidRequest(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn positive_count_is_valid() {
        assert!(validate_count("pool-x", 1).is_ok());
    }
}
