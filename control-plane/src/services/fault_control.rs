//! Fault control façade
//!
//! Forwards a toggle command to one leaf service and, when the service
//! accepts it, re-polls that service so the status cache reflects the change
//! right away.

use std::sync::Arc;

use crate::error::ControlPlaneError;
use crate::services::discovery::DiscoveryEngine;
use crate::traits::LeafServiceClient;
use shared::{FaultControlRequest, FaultControlResponse, ProcessId, process_info, process_warn};

pub struct FaultControlFacade<L: LeafServiceClient> {
    client: Arc<L>,
    discovery: Arc<DiscoveryEngine<L>>,
}

impl<L: LeafServiceClient + 'static> FaultControlFacade<L> {
    pub fn new(client: Arc<L>, discovery: Arc<DiscoveryEngine<L>>) -> Self {
        Self { client, discovery }
    }

    pub async fn control_fault(&self, service_id: &str, request: FaultControlRequest) -> FaultControlResponse {
        if service_id.trim().is_empty() {
            return FaultControlResponse::failure(request.fault_id, "serviceId is required");
        }
        if request.fault_id.trim().is_empty() {
            return FaultControlResponse::failure(request.fault_id, "faultId is required");
        }

        let endpoint = self.discovery.endpoint_for(service_id);
        match self.client.send_control(&endpoint, &request).await {
            Ok(response) => {
                process_info!(
                    ProcessId::current(),
                    "🎛️ {} {} on {}: {}",
                    if request.enable { "Enabled" } else { "Disabled" },
                    request.fault_id,
                    service_id,
                    response.message
                );
                self.discovery.refresh_service(service_id).await;
                response
            }
            Err(ControlPlaneError::LeafStatusError { status, .. }) => {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Control of {} on {} got HTTP {}",
                    request.fault_id,
                    service_id,
                    status
                );
                FaultControlResponse::failure(request.fault_id, format!("HTTP error: {status}"))
            }
            Err(e) => {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Control of {} on {} failed: {}",
                    request.fault_id,
                    service_id,
                    e
                );
                FaultControlResponse::failure(request.fault_id, format!("control failed: {e}"))
            }
        }
    }
}
