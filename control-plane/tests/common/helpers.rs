//! Test helpers and builder for control plane integration tests
//!
//! Leaf services are real fault agents bound to loopback ports; the cluster
//! is a mock so no kubectl is needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use control_plane::config::{ControlPlaneConfig, DiscoveryConfig, ServiceConfig};
use control_plane::services::HttpLeafClient;
use control_plane::types::ApplyOutcome;
use control_plane::{ControlPlane, MockClusterClient, ServiceCatalog, web};
use fault_agent::FaultSwitchSet;
use shared::FaultServiceInfo;

pub type TestPlane = ControlPlane<HttpLeafClient, MockClusterClient>;

/// Builder for a control plane over real HTTP leaf calls and a mocked cluster
pub struct ControlPlaneBuilder {
    services: Vec<ServiceConfig>,
    cluster: MockClusterClient,
    catalog: ServiceCatalog,
    permissive_cluster: bool,
}

impl ControlPlaneBuilder {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            cluster: MockClusterClient::new(),
            catalog: ServiceCatalog::empty(),
            permissive_cluster: true,
        }
    }

    /// Add a leaf service reachable at `base_url`
    pub fn with_service(mut self, id: &str, name: &str, base_url: &str) -> Self {
        self.services.push(ServiceConfig::new(id, name).with_address(base_url));
        self
    }

    pub fn with_catalog(mut self, raw: &str) -> Self {
        self.catalog = ServiceCatalog::from_json(raw).unwrap();
        self
    }

    /// Configure the cluster mock instead of the accept-everything default
    pub fn with_cluster<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockClusterClient),
    {
        setup(&mut self.cluster);
        self.permissive_cluster = false;
        self
    }

    pub fn build(self) -> Arc<TestPlane> {
        let mut cluster = self.cluster;
        if self.permissive_cluster {
            cluster.expect_apply().returning(|_| ApplyOutcome {
                success: true,
                output: "created".to_string(),
            });
            cluster.expect_delete().returning(|_, _, _| true).times(0..);
            cluster.expect_list_names().returning(|_, _| Vec::new()).times(0..);
        }

        let config = ControlPlaneConfig {
            services: self.services,
            discovery: DiscoveryConfig {
                enabled: false,
                timeout_ms: 500,
                ..DiscoveryConfig::default()
            },
            ..ControlPlaneConfig::default()
        };
        let leaf_client = HttpLeafClient::new(Duration::from_millis(500)).unwrap();
        Arc::new(ControlPlane::new(config, leaf_client, cluster, self.catalog))
    }

    pub fn router(self) -> (Arc<TestPlane>, Router) {
        let plane = self.build();
        let router = web::build_router(Arc::clone(&plane));
        (plane, router)
    }
}

/// Start a fault agent on a loopback port, returning its base URL
pub async fn spawn_agent(info: FaultServiceInfo, env: &[(&str, &str)]) -> String {
    let env: HashMap<String, String> = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let switches = FaultSwitchSet::from_lookup(info, |key| env.get(key).cloned()).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(fault_agent::serve(listener, Arc::new(switches), std::future::pending()));
    format!("http://{addr}")
}

/// Base URL nothing listens on
pub fn dead_address() -> String {
    "http://127.0.0.1:1".to_string()
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}
