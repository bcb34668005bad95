//! Lease backend for autoscaling-group pools.
//!
//! Lends and returns capacity by nudging a group's desired size inside its
//! configured [min, max] band. The lend path is serialized per pool through
//! the distributed lock; the return path is not, and concurrent
//! read-modify-write races on the desired size are an accepted limitation of
//! the current design.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use fleetlease_locking::LockCoordinator;
use tracing::{info, warn};

use crate::contract::{validate_count, LeaseBackend};
use crate::error::LeaseError;

/// Configured bounds and desired size of an autoscaling group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupInfo {
    pub min_size: u32,
    pub max_size: u32,
    pub current_size: u32,
}

/// Read/write access to the autoscaling provider's group API.
#[async_trait]
pub trait AutoscalingProvider: Send + Sync {
    /// Fetch a group's bounds and desired size. `None` when the group is
    /// unknown to the provider.
    async fn get_group_info(&self, group_name: &str) -> Result<Option<GroupInfo>>;

    /// Replace a group's desired size.
    async fn update_group(&self, group_name: &str, desired_size: u32) -> Result<()>;
}

/// Lease backend over an autoscaling provider.
pub struct AutoscalingLeaseBackend {
    provider: Arc<dyn AutoscalingProvider>,
    locks: LockCoordinator,
}

impl AutoscalingLeaseBackend {
    /// Create a backend over the given provider and lock coordinator.
    pub fn new(provider: Arc<dyn AutoscalingProvider>, locks: LockCoordinator) -> Self {
        Self { provider, locks }
    }

    fn lending_lock_name(pool_id: &str) -> String {
        format!("{pool_id}-lending")
    }

    async fn fetch_group(&self, pool_id: &str) -> Result<GroupInfo, LeaseError> {
        match self.provider.get_group_info(pool_id).await {
            Ok(Some(info)) => Ok(info),
            Ok(None) => Err(LeaseError::BackendUnavailable {
                pool_id: pool_id.to_string(),
                reason: "autoscaling group not found".to_string(),
            }),
            Err(err) => Err(LeaseError::BackendUnavailable {
                pool_id: pool_id.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    async fn push_size(&self, pool_id: &str, new_size: u32) -> Result<(), LeaseError> {
        self.provider
            .update_group(pool_id, new_size)
            .await
            .map_err(|err| LeaseError::BackendRejected {
                pool_id: pool_id.to_string(),
                reason: err.to_string(),
            })
    }

    async fn grow(&self, pool_id: &str, count: u32) -> Result<(), LeaseError> {
        let group = self.fetch_group(pool_id).await?;
        let new_size = group.current_size.saturating_add(count).min(group.max_size);
        info!(
            pool = %pool_id,
            current = group.current_size,
            requested = count,
            new_size,
            "lending instances"
        );
        self.push_size(pool_id, new_size).await
    }
}

#[async_trait]
impl LeaseBackend for AutoscalingLeaseBackend {
    /// Lend instances by raising the group's desired size, clamped at
    /// `max_size`.
    ///
    /// The whole operation runs under the pool's lending lock. When the lock
    /// cannot be acquired -- held by a concurrent lender, or the lock service
    /// itself is down -- the call returns `Ok(())` without touching the
    /// group: a concurrent lender is already adjusting the pool, so this call
    /// yields instead of waiting or erroring. Callers depend on the lend path
    /// being non-blocking, so lend requests can be silently dropped under
    /// contention.
    async fn lend_instances(&self, pool_id: &str, count: u32) -> Result<(), LeaseError> {
        validate_count(pool_id, count)?;

        let lock_name = Self::lending_lock_name(pool_id);
        let handle = match self.locks.try_acquire(&lock_name).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                info!(pool = %pool_id, "lend skipped, pool is being adjusted elsewhere");
                return Ok(());
            }
            Err(err) => {
                warn!(pool = %pool_id, error = %err, "lend skipped, lock service unavailable");
                return Ok(());
            }
        };

        // Release on every exit path of the locked section, including when
        // the fetch or the update fails.
        let outcome = self.grow(pool_id, count).await;
        self.locks.release(handle).await;
        outcome
    }

    /// Return instances by lowering the group's desired size, clamped at
    /// `min_size`.
    ///
    /// Unlike `lend_instances` this path takes no lock, so it can race a
    /// concurrent lend on the same pool.
    async fn return_instances(&self, pool_id: &str, count: u32) -> Result<(), LeaseError> {
        validate_count(pool_id, count)?;

        let group = self.fetch_group(pool_id).await?;
        let new_size = group.current_size.saturating_sub(count).max(group.min_size);
        info!(
            pool = %pool_id,
            current = group.current_size,
            requested = count,
            new_size,
            "returning instances"
        );
        self.push_size(pool_id, new_size).await
    }
}

/// In-memory autoscaling provider for tests and development.
pub struct MockAutoscalingGroups {
    groups: Mutex<HashMap<String, GroupInfo>>,

    /// Number of `update_group` calls observed.
    update_calls: AtomicU32,

    /// Whether updates should fail.
    fail_updates: bool,
}

impl MockAutoscalingGroups {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            update_calls: AtomicU32::new(0),
            fail_updates: false,
        }
    }

    /// Create a provider that fails every update.
    pub fn failing_updates() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            update_calls: AtomicU32::new(0),
            fail_updates: true,
        }
    }

    /// Register a group.
    pub fn with_group(self, name: &str, min: u32, max: u32, current: u32) -> Self {
        self.groups.lock().unwrap().insert(
            name.to_string(),
            GroupInfo {
                min_size: min,
                max_size: max,
                current_size: current,
            },
        );
        self
    }

    /// Current state of a registered group.
    pub fn group(&self, name: &str) -> Option<GroupInfo> {
        self.groups.lock().unwrap().get(name).copied()
    }

    /// How many times `update_group` has been called.
    pub fn update_call_count(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAutoscalingGroups {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutoscalingProvider for MockAutoscalingGroups {
    async fn get_group_info(&self, group_name: &str) -> Result<Option<GroupInfo>> {
        Ok(self.groups.lock().unwrap().get(group_name).copied())
    }

    async fn update_group(&self, group_name: &str, desired_size: u32) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates {
            anyhow::bail!("mock provider configured to fail updates");
        }

        let mut groups = self.groups.lock().unwrap();
        match groups.get_mut(group_name) {
            Some(info) => {
                info.current_size = desired_size;
                Ok(())
            }
            None => anyhow::bail!("unknown group {group_name}"),
        }
    }
}
