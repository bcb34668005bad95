//! # fleetlease-lease
//!
//! Instance lease coordinator: lets one compute pool temporarily borrow
//! running instances from (or return them to) another pool across two
//! structurally different cluster backends.
//!
//! ## Design principles
//!
//! - One contract, two backends: policy code depends on [`LeaseBackend`]
//!   only, never on backend internals.
//! - Snapshots are fetched fresh before every mutation and never cached; the
//!   update is always a full replacement of the sized fields.
//! - The autoscaling backend clamps a scalar desired size inside a fixed
//!   [min, max] band; the analytics backend shifts the band itself. The two
//!   sizing policies are intentionally separate algorithms.
//! - Every outbound call carries a timeout and a finite retry budget; no
//!   lease operation blocks forever.
//!
//! ## Modules
//!
//! - `contract`: the uniform lend/return trait
//! - `snapshot`: per-fetch capacity snapshot model
//! - `autoscaling`: autoscaling-group backend (locked lend path)
//! - `analytics`: analytics-cluster REST backend (band shift)
//! - `http`: retrying JSON client for the analytics API
//! - `config`: injected connection settings
//! - `error`: the lease error taxonomy

pub mod analytics;
pub mod autoscaling;
pub mod config;
pub mod contract;
pub mod error;
pub mod http;
pub mod snapshot;

// Re-export commonly used types
pub use analytics::{AnalyticsClusterBackend, NodeConfiguration};
pub use autoscaling::{
    AutoscalingLeaseBackend, AutoscalingProvider, GroupInfo, MockAutoscalingGroups,
};
pub use config::AnalyticsConfig;
pub use contract::LeaseBackend;
pub use error::LeaseError;
pub use snapshot::CapacitySnapshot;
