//! Discovery engine tests with a mocked leaf client

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

use super::common::{discovery_config, order_info, order_status};
use crate::config::{DiscoveryConfig, ServiceConfig};
use crate::error::ControlPlaneError;
use crate::services::discovery::DiscoveryEngine;
use crate::traits::MockLeafServiceClient;
use shared::{FaultToggleState, OFFLINE_STATUS};

fn order_service() -> Vec<ServiceConfig> {
    vec![ServiceConfig::new("ts-order-service", "Order Service")]
}

fn engine(client: MockLeafServiceClient, services: Vec<ServiceConfig>) -> DiscoveryEngine<MockLeafServiceClient> {
    DiscoveryEngine::new(Arc::new(client), discovery_config(), services)
}

fn timeout_error(service_id: &str) -> ControlPlaneError {
    ControlPlaneError::leaf_transport(service_id, "operation timed out")
}

#[tokio::test]
async fn test_unreachable_service_listed_offline() {
    let mut client = MockLeafServiceClient::new();
    client
        .expect_fetch_info()
        .returning(|endpoint| Err(timeout_error(&endpoint.service_id)));
    client
        .expect_fetch_status()
        .returning(|endpoint| Err(timeout_error(&endpoint.service_id)));
    let engine = engine(client, order_service());

    engine.discover_all().await;

    let statuses = engine.all_status().await;
    assert_eq!(statuses.len(), 1);
    let status = &statuses[0];
    assert_eq!(status.service_id, "ts-order-service");
    assert_eq!(status.service_name, "Order Service");
    assert!(!status.reachable);
    assert_eq!(status.status, OFFLINE_STATUS);
    assert!(status.details.starts_with("Service unreachable:"));
    assert!(status.faults.is_empty());
    assert!(engine.info("ts-order-service").await.is_none());
}

#[tokio::test]
async fn test_offline_record_keeps_known_faults() {
    let polls = Arc::new(AtomicUsize::new(0));
    let info_polls = Arc::clone(&polls);

    let mut client = MockLeafServiceClient::new();
    client.expect_fetch_info().returning(move |endpoint| {
        if info_polls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(order_info(&["slow-sql-error", "external-api-error"]))
        } else {
            Err(timeout_error(&endpoint.service_id))
        }
    });
    let status_polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&status_polls);
    client.expect_fetch_status().returning(move |endpoint| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(order_status(vec![FaultToggleState {
                id: "slow-sql-error".to_string(),
                enabled: true,
                delay_ms: Some(8000),
                ..FaultToggleState::default()
            }]))
        } else {
            Err(timeout_error(&endpoint.service_id))
        }
    });
    let engine = engine(client, order_service());

    engine.discover_all().await;
    let online = engine.status("ts-order-service").await.unwrap();
    assert!(online.reachable);
    assert!(online.fault("slow-sql-error").unwrap().enabled);

    engine.discover_all().await;
    let offline = engine.status("ts-order-service").await.unwrap();
    assert!(!offline.reachable);
    assert_eq!(
        offline.faults,
        vec![
            FaultToggleState::disabled("slow-sql-error"),
            FaultToggleState::disabled("external-api-error"),
        ]
    );
    // Info from the last good poll is retained
    assert_eq!(engine.info("ts-order-service").await.unwrap().faults.len(), 2);
}

#[tokio::test]
async fn test_reachable_status_fills_missing_identity() {
    let mut client = MockLeafServiceClient::new();
    client.expect_fetch_info().returning(|_| Ok(order_info(&[])));
    client.expect_fetch_status().returning(|_| {
        let mut status = order_status(Vec::new());
        status.service_id.clear();
        status.service_name.clear();
        Ok(status)
    });
    let engine = engine(client, vec![ServiceConfig::new("ts-order-service", "Orders")]);

    engine.discover_all().await;

    let status = engine.status("ts-order-service").await.unwrap();
    assert!(status.reachable);
    assert_eq!(status.service_id, "ts-order-service");
    assert_eq!(status.service_name, "Orders");
}

#[tokio::test]
async fn test_one_failing_service_does_not_block_others() {
    let mut client = MockLeafServiceClient::new();
    client.expect_fetch_info().returning(|endpoint| {
        if endpoint.service_id == "ts-order-service" {
            Ok(order_info(&["slow-sql-error"]))
        } else {
            Err(timeout_error(&endpoint.service_id))
        }
    });
    client.expect_fetch_status().returning(|endpoint| {
        if endpoint.service_id == "ts-order-service" {
            Ok(order_status(Vec::new()))
        } else {
            Err(ControlPlaneError::LeafStatusError {
                service_id: endpoint.service_id.clone(),
                status: 503,
            })
        }
    });
    let engine = engine(
        client,
        vec![
            ServiceConfig::new("ts-station-service", "Station Service"),
            ServiceConfig::new("ts-order-service", "Order Service"),
        ],
    );

    engine.discover_all().await;

    let statuses = engine.all_status().await;
    let ids: Vec<_> = statuses.iter().map(|s| s.service_id.as_str()).collect();
    assert_eq!(ids, vec!["ts-order-service", "ts-station-service"]);
    assert!(statuses[0].reachable);
    assert!(!statuses[1].reachable);
    assert_eq!(engine.all_info().await.len(), 1);
}

#[tokio::test]
async fn test_refresh_unknown_service_is_noop() {
    let mut client = MockLeafServiceClient::new();
    client.expect_fetch_info().never();
    client.expect_fetch_status().never();
    let engine = engine(client, order_service());

    assert!(!engine.refresh_service("ts-ghost-service").await);
    assert!(engine.all_status().await.is_empty());
}

#[tokio::test]
async fn test_endpoint_prefers_configured_address() {
    let engine = engine(
        MockLeafServiceClient::new(),
        vec![ServiceConfig::new("ts-order-service", "Order Service").with_address("http://127.0.0.1:18080")],
    );

    assert_eq!(engine.endpoint_for("ts-order-service").base_url, "http://127.0.0.1:18080");
    assert_eq!(
        engine.endpoint_for("ts-food-service").base_url,
        "http://ts-food-service:8080"
    );
}

#[tokio::test]
async fn test_disabled_discovery_starts_nothing() {
    let mut client = MockLeafServiceClient::new();
    client.expect_fetch_info().never();
    client.expect_fetch_status().never();
    let engine = Arc::new(engine(client, order_service()));
    let (_tx, rx) = watch::channel(false);

    assert!(engine.start(rx).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_start_runs_boot_and_settle_passes() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    let mut client = MockLeafServiceClient::new();
    client.expect_fetch_info().returning(|_| Ok(order_info(&[])));
    client.expect_fetch_status().returning(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(order_status(Vec::new()))
    });

    let config = DiscoveryConfig {
        enabled: true,
        settle_delay_ms: 2_000,
        scan_interval_ms: 30_000,
        ..DiscoveryConfig::default()
    };
    let engine = Arc::new(DiscoveryEngine::new(Arc::new(client), config, order_service()));
    let (tx, rx) = watch::channel(false);

    let handle = engine.start(rx).await.expect("discovery enabled");
    assert_eq!(polls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(std::time::Duration::from_millis(2_100)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 3);

    tx.send(true).unwrap();
    handle.await.unwrap();
}
