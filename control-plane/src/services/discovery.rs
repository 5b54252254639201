//! Service discovery engine
//!
//! Polls every configured leaf service's `/fault/info` and `/fault/status`
//! endpoints and keeps two caches keyed by service id. An unreachable
//! service is never an error: it becomes an `offline` status record that
//! keeps the fault ids last seen in its info.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::config::{DiscoveryConfig, ServiceConfig, default_base_url};
use crate::services::scheduler::{run_periodic, sleep_or_shutdown};
use crate::traits::{LeafEndpoint, LeafServiceClient};
use shared::{
    FaultServiceInfo, FaultStatus, FaultToggleState, ProcessId, epoch_millis, logging, process_debug, process_info,
};

pub struct DiscoveryEngine<L: LeafServiceClient> {
    client: Arc<L>,
    config: DiscoveryConfig,
    services: Vec<ServiceConfig>,
    status_cache: RwLock<HashMap<String, FaultStatus>>,
    info_cache: RwLock<HashMap<String, FaultServiceInfo>>,
}

impl<L: LeafServiceClient + 'static> DiscoveryEngine<L> {
    pub fn new(client: Arc<L>, config: DiscoveryConfig, services: Vec<ServiceConfig>) -> Self {
        Self {
            client,
            config,
            services,
            status_cache: RwLock::new(HashMap::new()),
            info_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn services(&self) -> &[ServiceConfig] {
        &self.services
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Address of a service, configured or by naming convention
    pub fn endpoint_for(&self, service_id: &str) -> LeafEndpoint {
        let base_url = self
            .services
            .iter()
            .find(|s| s.id == service_id)
            .map(|s| s.base_url(self.config.service_port))
            .unwrap_or_else(|| default_base_url(service_id, self.config.service_port));
        LeafEndpoint::new(service_id, base_url)
    }

    /// Boot-time pass, then a catch-up pass after the settle delay, then the
    /// periodic scan starting one interval later
    ///
    /// Returns `None` when discovery is disabled.
    pub async fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            process_info!(ProcessId::current(), "🔕 Service discovery disabled");
            return None;
        }

        logging::log_startup(
            ProcessId::current(),
            &format!(
                "service discovery for {} services every {}ms",
                self.services.len(),
                self.config.scan_interval_ms
            ),
        );
        self.discover_all().await;

        let engine = Arc::clone(self);
        let mut shutdown = shutdown;
        Some(tokio::spawn(async move {
            if !sleep_or_shutdown(engine.config.settle_delay(), &mut shutdown).await {
                return;
            }
            logging::log_progress(ProcessId::current(), "Discovery", "catch-up pass after settle delay");
            engine.discover_all().await;

            let period = engine.config.scan_interval();
            run_periodic("discovery", period, shutdown, || {
                let engine = Arc::clone(&engine);
                async move { engine.discover_all().await }
            })
            .await;
        }))
    }

    /// Poll one service and overwrite both cache entries
    pub async fn discover_one(&self, service: &ServiceConfig) {
        let endpoint = LeafEndpoint::new(&service.id, service.base_url(self.config.service_port));

        match self.client.fetch_info(&endpoint).await {
            Ok(info) => {
                self.info_cache.write().await.insert(service.id.clone(), info);
            }
            Err(e) => {
                process_debug!(ProcessId::current(), "ℹ️ No fault info from {}: {}", service.id, e);
            }
        }

        let status = match self.client.fetch_status(&endpoint).await {
            Ok(mut status) => {
                status.reachable = true;
                if status.service_id.is_empty() {
                    status.service_id = service.id.clone();
                }
                if status.service_name.is_empty() {
                    status.service_name = service.name.clone();
                }
                status
            }
            Err(e) => {
                process_debug!(ProcessId::current(), "📴 {} offline: {}", service.id, e);
                self.offline_status(service, &e.to_string()).await
            }
        };

        self.status_cache.write().await.insert(service.id.clone(), status);
    }

    async fn offline_status(&self, service: &ServiceConfig, reason: &str) -> FaultStatus {
        let known_faults = self
            .info_cache
            .read()
            .await
            .get(&service.id)
            .map(|info| info.faults.iter().map(|f| FaultToggleState::disabled(&f.id)).collect())
            .unwrap_or_default();

        FaultStatus::offline(
            &service.id,
            &service.name,
            format!("Service unreachable: {reason}"),
            known_faults,
            epoch_millis(),
        )
    }

    /// Poll every configured service concurrently
    pub async fn discover_all(&self) {
        join_all(self.services.iter().map(|service| self.discover_one(service))).await;

        let reachable = self.status_cache.read().await.values().filter(|s| s.reachable).count();
        process_debug!(
            ProcessId::current(),
            "🔍 Discovery pass done: {}/{} reachable",
            reachable,
            self.services.len()
        );
    }

    /// Re-poll one configured service; unknown ids are ignored
    pub async fn refresh_service(&self, service_id: &str) -> bool {
        match self.services.iter().find(|s| s.id == service_id) {
            Some(service) => {
                self.discover_one(service).await;
                true
            }
            None => {
                process_debug!(ProcessId::current(), "❓ Refresh requested for unknown service {}", service_id);
                false
            }
        }
    }

    pub async fn refresh_all(&self) {
        self.discover_all().await;
    }

    /// Every cached status, ordered by service id
    pub async fn all_status(&self) -> Vec<FaultStatus> {
        let mut statuses: Vec<_> = self.status_cache.read().await.values().cloned().collect();
        statuses.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        statuses
    }

    /// Every cached info record, ordered by service id
    pub async fn all_info(&self) -> Vec<FaultServiceInfo> {
        let cache = self.info_cache.read().await;
        let mut ids: Vec<_> = cache.keys().cloned().collect();
        ids.sort();
        ids.iter().filter_map(|id| cache.get(id).cloned()).collect()
    }

    pub async fn status(&self, service_id: &str) -> Option<FaultStatus> {
        self.status_cache.read().await.get(service_id).cloned()
    }

    pub async fn info(&self, service_id: &str) -> Option<FaultServiceInfo> {
        self.info_cache.read().await.get(service_id).cloned()
    }
}
