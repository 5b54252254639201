//! Trait definitions with mockall annotations for testing
//!
//! The two seams where the control plane leaves the process: the cluster
//! (`kubectl`) and the leaf services' fault endpoints.

use crate::error::ControlPlaneResult;
use crate::types::{ApplyOutcome, ResourceKind};
use shared::{FaultControlRequest, FaultControlResponse, FaultServiceInfo, FaultStatus};

/// Where a leaf service can be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEndpoint {
    pub service_id: String,
    /// Base URL without trailing slash, e.g. `http://ts-order-service:8080`
    pub base_url: String,
}

impl LeafEndpoint {
    pub fn new(service_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            base_url: base_url.into(),
        }
    }
}

/// Orchestration client abstraction over chaos-mesh custom resources
///
/// Implementations never return errors: failures are logged with context and
/// reported as `false`, an unsuccessful outcome or an empty list.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    /// Apply a rendered manifest
    async fn apply(&self, manifest: &str) -> ApplyOutcome;

    /// Delete a named resource; an already-absent resource counts as deleted
    async fn delete(&self, kind: ResourceKind, name: &str, namespace: &str) -> bool;

    /// Names of every resource of `kind` in `namespace`, empty on failure
    async fn list_names(&self, kind: ResourceKind, namespace: &str) -> Vec<String>;
}

/// HTTP client for the leaf-service fault contract
#[mockall::automock]
#[async_trait::async_trait]
pub trait LeafServiceClient: Send + Sync {
    /// `GET /fault/info`
    async fn fetch_info(&self, endpoint: &LeafEndpoint) -> ControlPlaneResult<FaultServiceInfo>;

    /// `GET /fault/status`
    async fn fetch_status(&self, endpoint: &LeafEndpoint) -> ControlPlaneResult<FaultStatus>;

    /// `POST /fault/control`
    ///
    /// A non-200 answer is reported as `ControlPlaneError::LeafStatusError`.
    async fn send_control(
        &self,
        endpoint: &LeafEndpoint,
        request: &FaultControlRequest,
    ) -> ControlPlaneResult<FaultControlResponse>;
}
