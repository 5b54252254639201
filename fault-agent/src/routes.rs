//! Fault contract endpoints
//!
//! - `GET /fault/info`
//! - `GET /fault/status`
//! - `POST /fault/control`

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::{AgentError, AgentResult};
use crate::switches::FaultSwitchSet;
use shared::{FaultControlRequest, FaultControlResponse, FaultServiceInfo, FaultStatus, ProcessId, process_info};

pub fn router(switches: Arc<FaultSwitchSet>) -> Router {
    Router::new()
        .route("/fault/info", get(info))
        .route("/fault/status", get(status))
        .route("/fault/control", post(control))
        .layer(TraceLayer::new_for_http())
        .with_state(switches)
}

async fn info(State(switches): State<Arc<FaultSwitchSet>>) -> Json<FaultServiceInfo> {
    Json(switches.info())
}

async fn status(State(switches): State<Arc<FaultSwitchSet>>) -> Json<FaultStatus> {
    Json(switches.status())
}

async fn control(
    State(switches): State<Arc<FaultSwitchSet>>,
    Json(request): Json<FaultControlRequest>,
) -> Json<FaultControlResponse> {
    Json(switches.control(&request))
}

/// Serve the fault endpoints on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, switches: Arc<FaultSwitchSet>, shutdown: F) -> AgentResult<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    process_info!(
        ProcessId::current(),
        "🌐 Fault endpoints for {} on http://{}",
        switches.service_id(),
        local
    );

    axum::serve(listener, router(switches))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AgentError::Server(e.to_string()))
}
