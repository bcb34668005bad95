//! Lease backend for analytics-cluster pools.
//!
//! The cluster management API exposes no scalar desired size, only a
//! [initial_nodes, max_nodes] band, so a lease shifts the whole band by the
//! requested count instead of clamping inside it. That is a genuine policy
//! difference from the autoscaling backend and is kept as a separate
//! algorithm on purpose.
//!
//! No lock is taken here: the API's own request ordering plus the short
//! read-to-write window is the only serialization. This backend is meant for
//! low-concurrency, human- or cron-triggered borrowing, not for
//! high-contention use.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AnalyticsConfig;
use crate::contract::{validate_count, LeaseBackend};
use crate::error::LeaseError;
use crate::http::RestClient;
use crate::snapshot::CapacitySnapshot;

use async_trait::async_trait;

/// The sized fields of a cluster's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfiguration {
    pub initial_nodes: u32,
    pub max_nodes: u32,
}

#[derive(Debug, Deserialize)]
struct ClusterConfiguration {
    node_configuration: NodeConfiguration,
}

#[derive(Debug, Deserialize)]
struct ClusterState {
    nodes: Vec<ClusterNode>,
}

#[derive(Debug, Deserialize)]
struct ClusterNode {
    is_spot_instance: bool,
}

/// PUT body for a configuration update. `push` makes the change take effect
/// immediately instead of only persisting.
#[derive(Debug, Serialize)]
struct ClusterUpdate {
    node_configuration: NodeConfiguration,
    push: bool,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Lend,
    Return,
}

/// Lease backend over the analytics cluster REST API.
pub struct AnalyticsClusterBackend {
    rest: RestClient,
}

impl AnalyticsClusterBackend {
    /// Create a backend from connection settings.
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            rest: RestClient::new(config),
        }
    }

    /// Fetch a fresh capacity snapshot from the cluster's configuration and
    /// live node inventory.
    ///
    /// `current_size` is the live node count; the spot/reserved split is
    /// informational and never feeds back into sizing math.
    pub async fn fetch_cluster(&self, cluster_id: &str) -> Result<CapacitySnapshot, LeaseError> {
        let state_payload = self
            .rest
            .get_text(&format!("clusters/{cluster_id}/state"))
            .await
            .map_err(|err| unavailable(cluster_id, err.to_string()))?;

        let config_payload = self
            .rest
            .get_text(&format!("clusters/{cluster_id}"))
            .await
            .map_err(|err| unavailable(cluster_id, err.to_string()))?;

        let band = parse_configuration(cluster_id, &config_payload)?;
        let (reserved, spot) = parse_state(cluster_id, &state_payload)?;
        debug!(
            cluster = %cluster_id,
            initial_nodes = band.initial_nodes,
            max_nodes = band.max_nodes,
            reserved,
            spot,
            "fetched cluster snapshot"
        );

        Ok(CapacitySnapshot {
            pool_id: cluster_id.to_string(),
            min_size: band.initial_nodes,
            max_size: band.max_nodes,
            current_size: reserved + spot,
            reserved_instance_count: reserved,
            spot_instance_count: spot,
        })
    }

    async fn change_size(
        &self,
        cluster_id: &str,
        count: u32,
        direction: Direction,
    ) -> Result<(), LeaseError> {
        let snapshot = self.fetch_cluster(cluster_id).await?;
        let band = NodeConfiguration {
            initial_nodes: snapshot.min_size,
            max_nodes: snapshot.max_size,
        };

        // The whole band shifts; it is not clamped against the old band. A
        // return larger than the current floor saturates at zero rather than
        // sending a negative node count.
        let shifted = match direction {
            Direction::Lend => NodeConfiguration {
                initial_nodes: band.initial_nodes.saturating_add(count),
                max_nodes: band.max_nodes.saturating_add(count),
            },
            Direction::Return => NodeConfiguration {
                initial_nodes: band.initial_nodes.saturating_sub(count),
                max_nodes: band.max_nodes.saturating_sub(count),
            },
        };

        let update = ClusterUpdate {
            node_configuration: shifted,
            push: true,
        };
        self.rest
            .put_json(&format!("clusters/{cluster_id}"), &update)
            .await
            .map_err(|err| LeaseError::BackendRejected {
                pool_id: cluster_id.to_string(),
                reason: err.to_string(),
            })?;

        info!(
            cluster = %cluster_id,
            old_initial = band.initial_nodes,
            old_max = band.max_nodes,
            new_initial = shifted.initial_nodes,
            new_max = shifted.max_nodes,
            "pushed cluster band update"
        );
        Ok(())
    }
}

#[async_trait]
impl LeaseBackend for AnalyticsClusterBackend {
    /// Lend instances by shifting the cluster's node band up by `count`.
    async fn lend_instances(&self, cluster_id: &str, count: u32) -> Result<(), LeaseError> {
        validate_count(cluster_id, count)?;
        self.change_size(cluster_id, count, Direction::Lend).await
    }

    /// Return instances by shifting the cluster's node band down by `count`.
    async fn return_instances(&self, cluster_id: &str, count: u32) -> Result<(), LeaseError> {
        validate_count(cluster_id, count)?;
        self.change_size(cluster_id, count, Direction::Return).await
    }
}

fn unavailable(cluster_id: &str, reason: String) -> LeaseError {
    LeaseError::BackendUnavailable {
        pool_id: cluster_id.to_string(),
        reason,
    }
}

/// Parse the sized fields out of a cluster configuration payload. An empty
/// payload means "no cluster data", never a default-zero band.
fn parse_configuration(cluster_id: &str, payload: &str) -> Result<NodeConfiguration, LeaseError> {
    if payload.trim().is_empty() {
        return Err(unavailable(cluster_id, "empty configuration payload".to_string()));
    }

    let configuration: ClusterConfiguration = serde_json::from_str(payload)
        .map_err(|err| unavailable(cluster_id, format!("unparseable configuration: {err}")))?;
    Ok(configuration.node_configuration)
}

/// Count live nodes into (reserved, spot) buckets. Every node lands in
/// exactly one bucket.
fn parse_state(cluster_id: &str, payload: &str) -> Result<(u32, u32), LeaseError> {
    if payload.trim().is_empty() {
        return Err(unavailable(cluster_id, "empty state payload".to_string()));
    }

    let state: ClusterState = serde_json::from_str(payload)
        .map_err(|err| unavailable(cluster_id, format!("unparseable state: {err}")))?;

    let mut reserved = 0u32;
    let mut spot = 0u32;
    for node in &state.nodes {
        if node.is_spot_instance {
            spot += 1;
        } else {
            reserved += 1;
        }
    }
    Ok((reserved, spot))
}
