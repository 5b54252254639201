//! Control plane composition root
//!
//! Wires discovery, fault control, the three injectors and the service
//! catalog together over one leaf client and one cluster client, and owns
//! the background tasks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ControlPlaneConfig;
use crate::core::catalog::ServiceCatalog;
use crate::core::registry::{FaultRegistry, RecordIdClock};
use crate::services::discovery::DiscoveryEngine;
use crate::services::fault_control::FaultControlFacade;
use crate::services::injection::{
    FaultInjector, InjectionSettings, JvmException, JvmExceptionInjector, JvmLatency, JvmLatencyInjector, NetworkDelay,
    NetworkInjector,
};
use crate::services::scheduler::spawn_expiry_sweep;
use crate::traits::{ClusterClient, LeafServiceClient};
use crate::types::{InjectedFaultRecord, StopAllSummary};
use shared::{ProcessId, logging};

/// Combined result of stopping every network and JVM fault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopAllResponse {
    pub success: bool,
    pub message: String,
    pub network: StopAllSummary,
    pub jvm: StopAllSummary,
}

pub struct ControlPlane<L: LeafServiceClient, C: ClusterClient> {
    config: ControlPlaneConfig,
    catalog: Arc<ServiceCatalog>,
    discovery: Arc<DiscoveryEngine<L>>,
    control: FaultControlFacade<L>,
    network: Arc<NetworkInjector<C>>,
    jvm: Arc<JvmExceptionInjector<C>>,
    jvm_latency: Arc<JvmLatencyInjector<C>>,
    started_at: Instant,
}

impl<L, C> ControlPlane<L, C>
where
    L: LeafServiceClient + 'static,
    C: ClusterClient + 'static,
{
    pub fn new(config: ControlPlaneConfig, leaf_client: L, cluster: C, catalog: ServiceCatalog) -> Self {
        let leaf_client = Arc::new(leaf_client);
        let cluster = Arc::new(cluster);
        let catalog = Arc::new(catalog);
        let clock = Arc::new(RecordIdClock::new());
        let settings = InjectionSettings::from(&config.chaos);

        let discovery = Arc::new(DiscoveryEngine::new(
            Arc::clone(&leaf_client),
            config.discovery.clone(),
            config.services.clone(),
        ));
        let control = FaultControlFacade::new(leaf_client, Arc::clone(&discovery));

        let network = FaultInjector::new(
            NetworkDelay,
            Arc::clone(&cluster),
            Arc::new(FaultRegistry::new()),
            Arc::clone(&clock),
            settings.clone(),
        );

        let jvm_registry = Arc::new(FaultRegistry::new());
        let jvm = FaultInjector::new(
            JvmException::new(Arc::clone(&catalog)),
            Arc::clone(&cluster),
            Arc::clone(&jvm_registry),
            Arc::clone(&clock),
            settings.clone(),
        );
        let jvm_latency = FaultInjector::new(
            JvmLatency::new(Arc::clone(&catalog)),
            cluster,
            jvm_registry,
            clock,
            settings,
        );

        Self {
            config,
            catalog,
            discovery,
            control,
            network: Arc::new(network),
            jvm: Arc::new(jvm),
            jvm_latency: Arc::new(jvm_latency),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn discovery(&self) -> &Arc<DiscoveryEngine<L>> {
        &self.discovery
    }

    pub fn control(&self) -> &FaultControlFacade<L> {
        &self.control
    }

    pub fn network(&self) -> &NetworkInjector<C> {
        &self.network
    }

    pub fn jvm(&self) -> &JvmExceptionInjector<C> {
        &self.jvm
    }

    pub fn jvm_latency(&self) -> &JvmLatencyInjector<C> {
        &self.jvm_latency
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Stop every network fault, then every JVM fault
    pub async fn stop_all_faults(&self) -> StopAllResponse {
        let network = self.network.stop_all().await;
        let jvm = self.jvm.stop_all().await;

        StopAllResponse {
            success: network.resources_failed == 0 && jvm.resources_failed == 0,
            message: format!("network: {network}; jvm: {jvm}"),
            network,
            jvm,
        }
    }

    /// Tracked network and JVM records
    pub fn active_faults(&self) -> Vec<InjectedFaultRecord> {
        let mut records = self.network.active();
        records.extend(self.jvm.active());
        records
    }

    /// Start discovery and one expiry sweep per registry
    pub async fn start_background(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(handle) = self.discovery.start(shutdown.clone()).await {
            handles.push(handle);
        }

        let period = self.config.chaos.sweep_interval();
        handles.push(spawn_expiry_sweep(
            "network expiry sweep",
            Arc::clone(&self.network),
            period,
            shutdown.clone(),
        ));
        handles.push(spawn_expiry_sweep("jvm expiry sweep", Arc::clone(&self.jvm), period, shutdown));

        logging::log_success(
            ProcessId::current(),
            &format!("Background tasks running ({} loops)", handles.len()),
        );
        handles
    }
}
