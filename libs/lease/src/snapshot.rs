//! Per-pool capacity snapshot.
//!
//! A snapshot is read fresh from the backend's live API at the start of every
//! lease operation, used in memory to compute the new target, and discarded
//! after the update call returns. It is never cached or persisted, which
//! bounds the stale-read window to the single round-trip between read and
//! write.

/// Point-in-time view of a pool's configured size and instance composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacitySnapshot {
    /// Stable identifier of the pool or cluster.
    pub pool_id: String,

    /// Operator-configured lower bound.
    pub min_size: u32,

    /// Operator-configured upper bound (`>= min_size`).
    pub max_size: u32,

    /// Desired/target size as currently configured. Not necessarily equal to
    /// the live running count.
    pub current_size: u32,

    /// Live nodes provisioned as reserved instances. Informational only,
    /// never fed into sizing math.
    pub reserved_instance_count: u32,

    /// Live nodes provisioned as spot instances. Informational only.
    pub spot_instance_count: u32,
}

impl CapacitySnapshot {
    /// Target size after lending `count` instances, clamped at the upper
    /// bound. Requesting more than the available headroom truncates rather
    /// than erroring.
    pub fn grow_target(&self, count: u32) -> u32 {
        self.current_size.saturating_add(count).min(self.max_size)
    }

    /// Target size after returning `count` instances, clamped at the lower
    /// bound so a return never drives the pool below its configured floor.
    pub fn shrink_target(&self, count: u32) -> u32 {
        self.current_size.saturating_sub(count).max(self.min_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(min: u32, max: u32, current: u32) -> CapacitySnapshot {
        CapacitySnapshot {
            pool_id: "pool-x".to_string(),
            min_size: min,
            max_size: max,
            current_size: current,
            reserved_instance_count: 0,
            spot_instance_count: 0,
        }
    }

    #[test]
    fn grow_clamps_at_max() {
        assert_eq!(snapshot(2, 10, 8).grow_target(5), 10);
        assert_eq!(snapshot(2, 10, 8).grow_target(1), 9);
        assert_eq!(snapshot(2, 10, 10).grow_target(3), 10);
    }

    #[test]
    fn shrink_clamps_at_min() {
        assert_eq!(snapshot(2, 10, 3).shrink_target(5), 2);
        assert_eq!(snapshot(2, 10, 8).shrink_target(1), 7);
        assert_eq!(snapshot(0, 10, 2).shrink_target(7), 0);
    }

    #[test]
    fn grow_never_exceeds_max() {
        for count in 1..64u32 {
            assert!(snapshot(2, 10, 8).grow_target(count) <= 10);
        }
    }

    #[test]
    fn shrink_never_undercuts_min() {
        for count in 1..64u32 {
            assert!(snapshot(2, 10, 8).shrink_target(count) >= 2);
        }
    }
}
