//! Integration tests for the analytics-cluster backend against a mock HTTP
//! API.

use fleetlease_lease::{AnalyticsClusterBackend, AnalyticsConfig, LeaseBackend, LeaseError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-credential";

fn test_config(server: &MockServer) -> AnalyticsConfig {
    let mut config = AnalyticsConfig::new(server.uri(), TOKEN);
    config.max_retries = 2;
    config
}

fn configuration_body(initial_nodes: u32, max_nodes: u32) -> serde_json::Value {
    serde_json::json!({
        "id": "c1",
        "node_configuration": {
            "initial_nodes": initial_nodes,
            "max_nodes": max_nodes
        }
    })
}

fn state_body(spot_flags: &[bool]) -> serde_json::Value {
    let nodes: Vec<serde_json::Value> = spot_flags
        .iter()
        .map(|spot| serde_json::json!({"is_spot_instance": spot, "private_ip": "10.1.2.3"}))
        .collect();
    serde_json::json!({ "nodes": nodes })
}

async fn mount_reads(server: &MockServer, initial_nodes: u32, max_nodes: u32) {
    Mock::given(method("GET"))
        .and(path("/clusters/c1/state"))
        .and(header("X-AUTH-TOKEN", TOKEN))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state_body(&[false, true])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/clusters/c1"))
        .and(header("X-AUTH-TOKEN", TOKEN))
        .and(header("Accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(configuration_body(initial_nodes, max_nodes)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn lend_shifts_band_up() {
    let server = MockServer::start().await;
    mount_reads(&server, 4, 12).await;

    Mock::given(method("PUT"))
        .and(path("/clusters/c1"))
        .and(header("X-AUTH-TOKEN", TOKEN))
        .and(header("Content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "node_configuration": { "initial_nodes": 7, "max_nodes": 15 },
            "push": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    backend.lend_instances("c1", 3).await.unwrap();
}

#[tokio::test]
async fn return_shifts_band_down() {
    let server = MockServer::start().await;
    mount_reads(&server, 4, 12).await;

    Mock::given(method("PUT"))
        .and(path("/clusters/c1"))
        .and(body_json(serde_json::json!({
            "node_configuration": { "initial_nodes": 1, "max_nodes": 9 },
            "push": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    backend.return_instances("c1", 3).await.unwrap();
}

#[tokio::test]
async fn oversized_return_saturates_at_zero() {
    let server = MockServer::start().await;
    mount_reads(&server, 2, 9).await;

    Mock::given(method("PUT"))
        .and(path("/clusters/c1"))
        .and(body_json(serde_json::json!({
            "node_configuration": { "initial_nodes": 0, "max_nodes": 4 },
            "push": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    backend.return_instances("c1", 5).await.unwrap();
}

#[tokio::test]
async fn snapshot_classifies_every_node_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/clusters/c1/state"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(state_body(&[true, true, false, false, false])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clusters/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configuration_body(4, 12)))
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    let snapshot = backend.fetch_cluster("c1").await.unwrap();

    assert_eq!(snapshot.reserved_instance_count, 3);
    assert_eq!(snapshot.spot_instance_count, 2);
    assert_eq!(snapshot.current_size, 5);
    assert_eq!(snapshot.min_size, 4);
    assert_eq!(snapshot.max_size, 12);
}

#[tokio::test]
async fn empty_state_payload_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/clusters/c1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clusters/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(configuration_body(4, 12)))
        .mount(&server)
        .await;
    // No write may go out without a usable snapshot.
    Mock::given(method("PUT"))
        .and(path("/clusters/c1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    let err = backend.lend_instances("c1", 3).await.unwrap_err();
    assert!(matches!(err, LeaseError::BackendUnavailable { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unknown_cluster_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/clusters/c1/state"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such cluster"))
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    let err = backend.lend_instances("c1", 3).await.unwrap_err();
    assert!(matches!(err, LeaseError::BackendUnavailable { .. }));
}

#[tokio::test]
async fn transient_read_failure_is_retried_within_budget() {
    let server = MockServer::start().await;

    // First attempt fails with a server error, the retry succeeds.
    Mock::given(method("GET"))
        .and(path("/clusters/c1/state"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_reads(&server, 4, 12).await;

    Mock::given(method("PUT"))
        .and(path("/clusters/c1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    backend.lend_instances("c1", 3).await.unwrap();
}

#[tokio::test]
async fn rejected_update_after_retries_is_backend_rejected() {
    let server = MockServer::start().await;
    mount_reads(&server, 4, 12).await;

    Mock::given(method("PUT"))
        .and(path("/clusters/c1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let backend = AnalyticsClusterBackend::new(&test_config(&server));
    let err = backend.lend_instances("c1", 3).await.unwrap_err();
    assert!(matches!(err, LeaseError::BackendRejected { .. }));
}
