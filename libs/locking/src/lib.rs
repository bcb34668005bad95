//! Distributed lock primitives for serializing pool mutations.
//!
//! The actual mutual-exclusion guarantee lives in an external lock service
//! (database advisory locks, a coordination service, or the in-memory
//! implementation shipped here for tests and single-process deployments).
//! This crate only defines the contract and the scoped-release discipline:
//!
//! - Acquisition is **non-blocking**: `Ok(None)` means "held elsewhere right
//!   now", not a failure. A stuck service must surface as an error or `None`,
//!   never as an indefinite hang.
//! - Every caller that acquires must release on all exit paths of the
//!   protected section, including when the protected work fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the underlying lock service.
///
/// Callers should treat these as retryable conditions, not as proof that the
/// lock is held by someone else.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock service could not be reached.
    #[error("lock service unreachable: {0}")]
    Unreachable(String),

    /// The lock service refused the request.
    #[error("lock service rejected request: {0}")]
    Rejected(String),
}

/// Opaque proof of a held lock.
///
/// Consumed by [`LockService::release`]; dropping a handle without releasing
/// leaks the lock until the service's own expiry reclaims it.
#[derive(Debug)]
pub struct LockHandle {
    name: String,
    token: u64,
}

impl LockHandle {
    /// Name of the lock this handle was issued for.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Non-blocking distributed lock service.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Attempt to acquire the named lock.
    ///
    /// Returns `Ok(None)` when the lock is currently held elsewhere. Must not
    /// block waiting for the holder; contention is reported, not queued.
    async fn acquire(&self, name: &str) -> Result<Option<LockHandle>, LockError>;

    /// Release a previously acquired lock.
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}

/// Thin stateless wrapper around a [`LockService`] used by lease backends.
#[derive(Clone)]
pub struct LockCoordinator {
    service: Arc<dyn LockService>,
}

impl LockCoordinator {
    /// Create a coordinator over the given service.
    pub fn new(service: Arc<dyn LockService>) -> Self {
        Self { service }
    }

    /// Attempt to acquire the named lock without blocking.
    pub async fn try_acquire(&self, name: &str) -> Result<Option<LockHandle>, LockError> {
        let handle = self.service.acquire(name).await?;
        if handle.is_none() {
            debug!(lock = %name, "lock held elsewhere");
        }
        Ok(handle)
    }

    /// Release a held lock.
    ///
    /// Release failures are logged and absorbed: the caller's result must
    /// reflect the protected work, and the service's expiry will reclaim a
    /// lock we failed to hand back.
    pub async fn release(&self, handle: LockHandle) {
        let name = handle.name().to_string();
        if let Err(err) = self.service.release(handle).await {
            warn!(lock = %name, error = %err, "failed to release lock");
        }
    }
}

/// In-process lock service for tests and single-node deployments.
pub struct InMemoryLockService {
    /// Lock name -> token of the current holder.
    held: Mutex<HashMap<String, u64>>,

    /// Counter for issuing handle tokens.
    next_token: AtomicU64,

    /// Whether acquire calls should fail with a service error.
    fail_acquires: bool,
}

impl InMemoryLockService {
    /// Create a new empty lock service.
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            fail_acquires: false,
        }
    }

    /// Create a lock service that fails every acquire.
    pub fn failing() -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            fail_acquires: true,
        }
    }

    /// Returns true if the named lock is currently held.
    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().unwrap().contains_key(name)
    }
}

impl Default for InMemoryLockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn acquire(&self, name: &str) -> Result<Option<LockHandle>, LockError> {
        if self.fail_acquires {
            return Err(LockError::Unreachable(
                "in-memory service configured to fail".to_string(),
            ));
        }

        let mut held = self.held.lock().unwrap();
        if held.contains_key(name) {
            return Ok(None);
        }

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        held.insert(name.to_string(), token);
        Ok(Some(LockHandle {
            name: name.to_string(),
            token,
        }))
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let mut held = self.held.lock().unwrap();
        // Only the current holder's handle may release; a stale handle from an
        // earlier acquisition is a no-op.
        if held.get(&handle.name) == Some(&handle.token) {
            held.remove(&handle.name);
        }
        Ok(())
    }
}
