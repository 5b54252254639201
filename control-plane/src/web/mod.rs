//! HTTP API of the control plane
//!
//! Thin axum layer over [`ControlPlane`]; every route delegates to one
//! operation and serializes its result as camelCase JSON.

pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::control_plane::ControlPlane;
use crate::error::{ControlPlaneError, ControlPlaneResult};
use crate::traits::{ClusterClient, LeafServiceClient};
use shared::{ProcessId, logging, process_info};

use handlers::*;

pub fn build_router<L, C>(plane: Arc<ControlPlane<L, C>>) -> Router
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    Router::new()
        .route("/health", get(health::<L, C>))
        // Discovery and toggles
        .route("/api/status", get(list_status::<L, C>))
        .route("/api/status/:service_id", get(get_status::<L, C>))
        .route("/api/info", get(list_info::<L, C>))
        .route("/api/info/:service_id", get(get_info::<L, C>))
        .route("/api/refresh", post(refresh::<L, C>))
        .route("/api/control", post(control::<L, C>))
        // Network delay
        .route("/api/chaos/apply", post(chaos_apply::<L, C>))
        .route("/api/chaos/stop", post(chaos_stop::<L, C>))
        .route("/api/chaos/stop-all", post(chaos_stop_all::<L, C>))
        .route("/api/chaos/active", get(chaos_active::<L, C>))
        // JVM rules
        .route("/api/jvm/apply", post(jvm_apply::<L, C>))
        .route("/api/jvm/stop", post(jvm_stop::<L, C>))
        .route("/api/jvm/latency/apply", post(jvm_latency_apply::<L, C>))
        .route("/api/jvm/latency/stop", post(jvm_latency_stop::<L, C>))
        // Catalog lookups
        .route("/api/service/interfaces", get(service_interfaces::<L, C>))
        .route("/api/service/interfaces/filtered", get(filtered_service_interfaces::<L, C>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(plane)
}

/// Serve the API until `shutdown` flips to `true` or its sender is dropped
pub async fn serve<L, C>(
    plane: Arc<ControlPlane<L, C>>,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> ControlPlaneResult<()>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControlPlaneError::ServerStartup(format!("bind {addr}: {e}")))?;

    let local = listener.local_addr()?;
    process_info!(ProcessId::current(), "🌐 Control plane API listening on http://{}", local);

    axum::serve(listener, build_router(plane))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .map_err(|e| ControlPlaneError::ServerStartup(e.to_string()))?;

    logging::log_shutdown(ProcessId::current(), "HTTP API stopped");
    Ok(())
}
