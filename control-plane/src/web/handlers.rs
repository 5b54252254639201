//! HTTP handlers
//!
//! Write endpoints always answer 200 with a `success` flag; validation
//! failures are reported in the body, not as status codes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::control_plane::{ControlPlane, StopAllResponse};
use crate::core::catalog::ServiceInterface;
use crate::traits::{ClusterClient, LeafServiceClient};
use crate::types::{
    FaultActionResponse, InjectedFaultRecord, JvmFaultRequest, JvmLatencyFaultRequest, NetworkDelayRequest,
};
use shared::{FaultControlRequest, FaultControlResponse, FaultServiceInfo, FaultStatus};

pub type PlaneState<L, C> = State<Arc<ControlPlane<L, C>>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshParams {
    pub service_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopParams {
    pub chaos_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterfaceParams {
    pub service_name: String,
    /// Comma-separated upstream service names
    pub direct_upstream_services: Option<String>,
}

/// Toggle command addressed to one service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlApiRequest {
    pub service_id: String,
    pub fault_id: String,
    pub enable: bool,
    pub delay_ms: Option<i64>,
    pub error_code: Option<i32>,
    pub probability: Option<f64>,
}

impl From<ControlApiRequest> for (String, FaultControlRequest) {
    fn from(request: ControlApiRequest) -> Self {
        (
            request.service_id,
            FaultControlRequest {
                fault_id: request.fault_id,
                enable: request.enable,
                delay_ms: request.delay_ms,
                error_code: request.error_code,
                probability: request.probability,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
}

pub async fn health<L, C>(State(plane): PlaneState<L, C>) -> Json<serde_json::Value>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(json!({
        "status": "UP",
        "uptimeSeconds": plane.uptime_seconds(),
        "services": plane.discovery().services().len(),
    }))
}

pub async fn list_status<L, C>(State(plane): PlaneState<L, C>) -> Json<Vec<FaultStatus>>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.discovery().all_status().await)
}

pub async fn get_status<L, C>(State(plane): PlaneState<L, C>, Path(service_id): Path<String>) -> impl IntoResponse
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    match plane.discovery().status(&service_id).await {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::NOT_FOUND, format!("Unknown service {service_id}")).into_response(),
    }
}

pub async fn list_info<L, C>(State(plane): PlaneState<L, C>) -> Json<Vec<FaultServiceInfo>>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.discovery().all_info().await)
}

pub async fn get_info<L, C>(State(plane): PlaneState<L, C>, Path(service_id): Path<String>) -> impl IntoResponse
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    match plane.discovery().info(&service_id).await {
        Some(info) => Json(info).into_response(),
        None => (StatusCode::NOT_FOUND, format!("Unknown service {service_id}")).into_response(),
    }
}

pub async fn refresh<L, C>(State(plane): PlaneState<L, C>, Query(params): Query<RefreshParams>) -> Json<RefreshResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    let response = match params.service_id.filter(|id| !id.trim().is_empty()) {
        Some(service_id) => {
            if plane.discovery().refresh_service(&service_id).await {
                RefreshResponse {
                    success: true,
                    message: format!("Service {service_id} status refreshed"),
                }
            } else {
                RefreshResponse {
                    success: false,
                    message: format!("Unknown service {service_id}"),
                }
            }
        }
        None => {
            plane.discovery().refresh_all().await;
            RefreshResponse {
                success: true,
                message: "All service status refreshed".to_string(),
            }
        }
    };
    Json(response)
}

pub async fn control<L, C>(
    State(plane): PlaneState<L, C>,
    Json(request): Json<ControlApiRequest>,
) -> Json<FaultControlResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    let (service_id, request) = request.into();
    Json(plane.control().control_fault(&service_id, request).await)
}

pub async fn chaos_apply<L, C>(
    State(plane): PlaneState<L, C>,
    Json(request): Json<NetworkDelayRequest>,
) -> Json<FaultActionResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.network().apply(&request).await)
}

pub async fn chaos_stop<L, C>(
    State(plane): PlaneState<L, C>,
    Query(params): Query<StopParams>,
) -> Json<FaultActionResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.network().stop(&params.chaos_name).await)
}

pub async fn chaos_stop_all<L, C>(State(plane): PlaneState<L, C>) -> Json<StopAllResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.stop_all_faults().await)
}

pub async fn chaos_active<L, C>(State(plane): PlaneState<L, C>) -> Json<Vec<InjectedFaultRecord>>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.active_faults())
}

pub async fn jvm_apply<L, C>(
    State(plane): PlaneState<L, C>,
    Json(request): Json<JvmFaultRequest>,
) -> Json<FaultActionResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.jvm().apply(&request).await)
}

pub async fn jvm_stop<L, C>(
    State(plane): PlaneState<L, C>,
    Query(params): Query<StopParams>,
) -> Json<FaultActionResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.jvm().stop(&params.chaos_name).await)
}

pub async fn jvm_latency_apply<L, C>(
    State(plane): PlaneState<L, C>,
    Json(request): Json<JvmLatencyFaultRequest>,
) -> Json<FaultActionResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.jvm_latency().apply(&request).await)
}

pub async fn jvm_latency_stop<L, C>(
    State(plane): PlaneState<L, C>,
    Query(params): Query<StopParams>,
) -> Json<FaultActionResponse>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.jvm_latency().stop(&params.chaos_name).await)
}

pub async fn service_interfaces<L, C>(
    State(plane): PlaneState<L, C>,
    Query(params): Query<InterfaceParams>,
) -> Json<Vec<ServiceInterface>>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Json(plane.catalog().interfaces(&params.service_name))
}

pub async fn filtered_service_interfaces<L, C>(
    State(plane): PlaneState<L, C>,
    Query(params): Query<InterfaceParams>,
) -> Json<Vec<ServiceInterface>>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    let upstreams: Vec<String> = params
        .direct_upstream_services
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();
    Json(plane.catalog().interfaces_filtered_by_upstream(&params.service_name, &upstreams))
}
