//! Fault injection over chaos-mesh resources
//!
//! One generic [`FaultInjector`] drives every fault domain. A domain only
//! decides how a request is validated and which manifest it becomes; record
//! ids, cluster calls, registry bookkeeping, stop, stop-all and the expiry
//! sweep are shared.
//!
//! Domains:
//! - [`NetworkDelay`]: `NetworkChaos` delay rules, record prefix `network-delay`
//! - [`JvmException`]: `JVMChaos` Byteman rule throwing at method entry, prefix `jvm`
//! - [`JvmLatency`]: `JVMChaos` latency rule, prefix `jvm-latency`
//!
//! The two JVM domains are built over the same registry.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::ChaosConfig;
use crate::core::catalog::ServiceCatalog;
use crate::core::manifest::{
    JvmRuleMode, JvmRuleSpec, NetworkDelaySpec, render_jvm_rule, render_network_delay,
};
use crate::core::registry::{FaultRegistry, RecordIdClock};
use crate::error::{ControlPlaneError, ControlPlaneResult};
use crate::traits::ClusterClient;
use crate::types::{
    FaultActionResponse, FaultKind, FaultRecordStatus, InjectedFaultRecord, JvmFaultRequest, JvmLatencyFaultRequest,
    NetworkDelayRequest, ResourceKind, StopAllSummary,
};
use shared::{ProcessId, logging, process_info, process_warn};

/// Validated, normalized form of an injection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultPlan {
    /// Service name stored on the record
    pub service_name: String,
    /// Service part of the record id
    pub id_fragment: String,
    pub delay_seconds: u64,
    pub duration_minutes: u64,
    pub manifest: ManifestPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestPlan {
    NetworkDelay {
        source_service: String,
        target_service: String,
    },
    JvmRule {
        service_name: String,
        class_name: String,
        method_name: String,
        mode: JvmPlanMode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmPlanMode {
    Exception { interface_name: String },
    Latency { latency_ms: u64 },
}

/// Cluster-side settings every injector shares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionSettings {
    pub namespace: String,
    pub jvm_port: u16,
    pub protected_resources: Vec<String>,
}

impl From<&ChaosConfig> for InjectionSettings {
    fn from(config: &ChaosConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            jvm_port: config.jvm_port,
            protected_resources: config.protected_resources.clone(),
        }
    }
}

impl FaultPlan {
    fn render(&self, record_id: &str, settings: &InjectionSettings, nonce: i64) -> String {
        match &self.manifest {
            ManifestPlan::NetworkDelay {
                source_service,
                target_service,
            } => render_network_delay(&NetworkDelaySpec {
                name: record_id,
                namespace: &settings.namespace,
                source_service,
                target_service,
                delay_seconds: self.delay_seconds,
                duration_minutes: self.duration_minutes,
            }),
            ManifestPlan::JvmRule {
                service_name,
                class_name,
                method_name,
                mode,
            } => render_jvm_rule(&JvmRuleSpec {
                name: record_id,
                namespace: &settings.namespace,
                service_name,
                duration_minutes: self.duration_minutes,
                port: settings.jvm_port,
                class_name,
                method_name,
                mode: match mode {
                    JvmPlanMode::Exception { interface_name } => JvmRuleMode::Exception { interface_name },
                    JvmPlanMode::Latency { latency_ms } => JvmRuleMode::Latency {
                        latency_ms: *latency_ms,
                    },
                },
                nonce,
            }),
        }
    }
}

/// Capability set distinguishing one fault domain from another
pub trait FaultDomain: Send + Sync {
    type Request: Send + Sync;

    fn kind(&self) -> FaultKind;

    fn resource_kind(&self) -> ResourceKind;

    fn record_prefix(&self) -> &'static str;

    /// Whether `record_id` names a resource this domain creates
    fn owns_record_id(&self, record_id: &str) -> bool {
        record_id
            .strip_prefix(self.record_prefix())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Human-readable name used in response messages
    fn label(&self) -> &'static str;

    /// Validate a request and turn it into a plan; no I/O
    fn plan(&self, request: &Self::Request) -> ControlPlaneResult<FaultPlan>;
}

fn required_text(value: Option<&str>, field: &str) -> ControlPlaneResult<String> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ControlPlaneError::validation(format!("{field} is required"))),
    }
}

/// Longest window chaos-mesh accepts (Go `time.Duration` limit)
pub const MAX_DURATION_MINUTES: u64 = 153_722_867;

fn positive(value: Option<i64>, field: &str) -> ControlPlaneResult<u64> {
    match value {
        Some(v) if v > 0 => Ok(v as u64),
        Some(v) => Err(ControlPlaneError::validation(format!("{field} must be greater than 0, got {v}"))),
        None => Err(ControlPlaneError::validation(format!("{field} is required"))),
    }
}

fn duration_window(value: Option<i64>) -> ControlPlaneResult<u64> {
    let minutes = positive(value, "durationMinutes")?;
    if minutes > MAX_DURATION_MINUTES {
        return Err(ControlPlaneError::validation(format!(
            "durationMinutes must be at most {MAX_DURATION_MINUTES}, got {minutes}"
        )));
    }
    Ok(minutes)
}

fn strip_marker(service_name: &str) -> String {
    service_name.strip_prefix("chaos_").unwrap_or(service_name).to_string()
}

/// `NetworkChaos` delay rules
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkDelay;

impl FaultDomain for NetworkDelay {
    type Request = NetworkDelayRequest;

    fn kind(&self) -> FaultKind {
        FaultKind::NetworkDelay
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::NetworkChaos
    }

    fn record_prefix(&self) -> &'static str {
        "network-delay"
    }

    fn label(&self) -> &'static str {
        "Network delay fault"
    }

    fn plan(&self, request: &NetworkDelayRequest) -> ControlPlaneResult<FaultPlan> {
        let service_name = required_text(Some(request.service_name.as_str()), "serviceName")?;
        if let Some(fault_type) = request.fault_type.as_deref().filter(|t| !t.is_empty()) {
            if fault_type != FaultKind::NetworkDelay.as_str() {
                return Err(ControlPlaneError::validation(format!("unsupported faultType: {fault_type}")));
            }
        }
        let delay_seconds = positive(request.delay_seconds, "delaySeconds")?;
        let duration_minutes = duration_window(request.duration_minutes)?;

        let clean = strip_marker(&service_name);
        let directional = (
            request.delay_upstream.unwrap_or(false),
            request.source_service.as_deref().filter(|s| !s.is_empty()),
            request.target_service.as_deref().filter(|s| !s.is_empty()),
        );
        let (source_service, target_service) = match directional {
            (true, Some(source), Some(target)) => (strip_marker(source), strip_marker(target)),
            _ => (clean.clone(), clean.clone()),
        };

        Ok(FaultPlan {
            service_name,
            id_fragment: clean,
            delay_seconds,
            duration_minutes,
            manifest: ManifestPlan::NetworkDelay {
                source_service,
                target_service,
            },
        })
    }
}

/// Resolved JVM rule target inside one service
struct JvmTarget {
    service_name: String,
    interface_name: String,
    method_name: String,
    class_name: String,
    duration_minutes: u64,
}

fn resolve_jvm_target(
    catalog: &ServiceCatalog,
    service_name: &str,
    interface_name: Option<&str>,
    method_name: Option<&str>,
    class_name: Option<&str>,
    duration_minutes: Option<i64>,
) -> ControlPlaneResult<JvmTarget> {
    let service_name = required_text(Some(service_name), "serviceName")?;
    if !catalog.contains(&service_name) {
        return Err(ControlPlaneError::validation(format!("service not found: {service_name}")));
    }
    let duration_minutes = duration_window(duration_minutes)?;

    let interface_name = interface_name.map(str::trim).filter(|i| !i.is_empty());
    let method_name = method_name.map(str::trim).filter(|m| !m.is_empty());

    let method_name = match (method_name, interface_name) {
        (Some(method), _) => method.to_string(),
        (None, Some(interface)) => catalog
            .method_for_interface(&service_name, interface)
            .ok_or_else(|| ControlPlaneError::validation(format!("no method known for interface {interface}")))?,
        (None, None) => return Err(ControlPlaneError::validation("methodName or interfaceName is required")),
    };
    let interface_name = match interface_name {
        Some(interface) => interface.to_string(),
        None => catalog
            .interface_for_method(&service_name, &method_name)
            .unwrap_or_else(|| method_name.clone()),
    };
    let class_name = catalog.resolve_class_name(&service_name, &interface_name, &method_name, class_name);

    Ok(JvmTarget {
        service_name,
        interface_name,
        method_name,
        class_name,
        duration_minutes,
    })
}

fn jvm_id_fragment(service_name: &str) -> String {
    service_name.replace("ts-", "")
}

/// `JVMChaos` rules throwing a runtime exception at method entry
#[derive(Debug, Clone)]
pub struct JvmException {
    catalog: Arc<ServiceCatalog>,
}

impl JvmException {
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        Self { catalog }
    }
}

impl FaultDomain for JvmException {
    type Request = JvmFaultRequest;

    fn kind(&self) -> FaultKind {
        FaultKind::JvmException
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::JvmChaos
    }

    fn record_prefix(&self) -> &'static str {
        "jvm"
    }

    fn label(&self) -> &'static str {
        "JVM fault"
    }

    fn plan(&self, request: &JvmFaultRequest) -> ControlPlaneResult<FaultPlan> {
        let target = resolve_jvm_target(
            &self.catalog,
            &request.service_name,
            request.interface_name.as_deref(),
            request.method_name.as_deref(),
            request.class_name.as_deref(),
            request.duration_minutes,
        )?;

        Ok(FaultPlan {
            id_fragment: jvm_id_fragment(&target.service_name),
            service_name: target.service_name.clone(),
            delay_seconds: 0,
            duration_minutes: target.duration_minutes,
            manifest: ManifestPlan::JvmRule {
                service_name: target.service_name,
                class_name: target.class_name,
                method_name: target.method_name,
                mode: JvmPlanMode::Exception {
                    interface_name: target.interface_name,
                },
            },
        })
    }
}

/// `JVMChaos` rules delaying a method
#[derive(Debug, Clone)]
pub struct JvmLatency {
    catalog: Arc<ServiceCatalog>,
}

impl JvmLatency {
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        Self { catalog }
    }
}

impl FaultDomain for JvmLatency {
    type Request = JvmLatencyFaultRequest;

    fn kind(&self) -> FaultKind {
        FaultKind::JvmLatency
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::JvmChaos
    }

    fn record_prefix(&self) -> &'static str {
        "jvm-latency"
    }

    /// Exception and latency rules are both `JVMChaos` under the `jvm` prefix
    fn owns_record_id(&self, record_id: &str) -> bool {
        record_id.starts_with("jvm-")
    }

    fn label(&self) -> &'static str {
        "JVM latency fault"
    }

    fn plan(&self, request: &JvmLatencyFaultRequest) -> ControlPlaneResult<FaultPlan> {
        let target = resolve_jvm_target(
            &self.catalog,
            &request.service_name,
            request.interface_name.as_deref(),
            request.method_name.as_deref(),
            request.class_name.as_deref(),
            request.duration_minutes,
        )?;
        let latency_ms = positive(request.latency_ms, "latencyMs")?;

        Ok(FaultPlan {
            id_fragment: jvm_id_fragment(&target.service_name),
            service_name: target.service_name.clone(),
            delay_seconds: latency_ms / 1000,
            duration_minutes: target.duration_minutes,
            manifest: ManifestPlan::JvmRule {
                service_name: target.service_name,
                class_name: target.class_name,
                method_name: target.method_name,
                mode: JvmPlanMode::Latency { latency_ms },
            },
        })
    }
}

/// Generic apply/stop/sweep engine for one fault domain
pub struct FaultInjector<D: FaultDomain, C: ClusterClient> {
    domain: D,
    cluster: Arc<C>,
    registry: Arc<FaultRegistry>,
    clock: Arc<RecordIdClock>,
    settings: InjectionSettings,
}

pub type NetworkInjector<C> = FaultInjector<NetworkDelay, C>;
pub type JvmExceptionInjector<C> = FaultInjector<JvmException, C>;
pub type JvmLatencyInjector<C> = FaultInjector<JvmLatency, C>;

impl<D: FaultDomain, C: ClusterClient> FaultInjector<D, C> {
    pub fn new(
        domain: D,
        cluster: Arc<C>,
        registry: Arc<FaultRegistry>,
        clock: Arc<RecordIdClock>,
        settings: InjectionSettings,
    ) -> Self {
        Self {
            domain,
            cluster,
            registry,
            clock,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<FaultRegistry> {
        &self.registry
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Validate, render, apply and record one fault
    pub async fn apply(&self, request: &D::Request) -> FaultActionResponse {
        let plan = match self.domain.plan(request) {
            Ok(plan) => plan,
            Err(ControlPlaneError::ValidationError { message }) => {
                process_warn!(ProcessId::current(), "⚠️ Rejected {} request: {}", self.domain.label(), message);
                return FaultActionResponse::failure(message);
            }
            Err(e) => return FaultActionResponse::failure(e.to_string()),
        };

        let now = Utc::now();
        let millis = self.clock.next_at(now);
        let record_id = format!("{}-{}-{}", self.domain.record_prefix(), plan.id_fragment, millis);
        let record = match InjectedFaultRecord::active(
            record_id.clone(),
            plan.service_name.clone(),
            self.domain.kind(),
            plan.delay_seconds,
            plan.duration_minutes,
            now,
        ) {
            Ok(record) => record,
            Err(e) => return FaultActionResponse::failure(e.to_string()),
        };
        let manifest = plan.render(&record_id, &self.settings, millis);

        let outcome = self.cluster.apply(&manifest).await;
        if !outcome.success {
            let message = format!("{} injection failed: {}", self.domain.label(), outcome.output);
            return FaultActionResponse::failure(message).with_record(record_id, plan.service_name);
        }

        process_info!(
            ProcessId::current(),
            "💥 Injected {} {} on {} until {}",
            self.domain.kind(),
            record_id,
            plan.service_name,
            record.end_time
        );
        self.registry.put(record);

        FaultActionResponse::success(format!("{} injection successful", self.domain.label()))
            .with_record(record_id, plan.service_name)
    }

    /// Delete the cluster resource, then drop the record
    ///
    /// `Ok(None)` means the resource is gone but nothing was tracked under
    /// that id. On delete failure the record stays in place.
    pub async fn stop_record(&self, record_id: &str) -> ControlPlaneResult<Option<InjectedFaultRecord>> {
        let record_id = record_id.trim();
        if record_id.is_empty() {
            return Err(ControlPlaneError::validation("chaosName is required"));
        }
        if self.registry.get(record_id).is_none() && !self.domain.owns_record_id(record_id) {
            return Err(ControlPlaneError::validation(format!(
                "{record_id} is not a {} record",
                self.domain.kind()
            )));
        }

        let deleted = self
            .cluster
            .delete(self.domain.resource_kind(), record_id, &self.settings.namespace)
            .await;
        if !deleted {
            return Err(ControlPlaneError::ResourceDeleteFailed {
                kind: self.domain.resource_kind().to_string(),
                name: record_id.to_string(),
            });
        }

        let stopped = self
            .registry
            .remove(record_id)
            .map(|record| record.with_status(FaultRecordStatus::Stopped));
        if let Some(record) = &stopped {
            process_info!(ProcessId::current(), "🛑 Stopped {} on {}", record.record_id, record.service_name);
        }
        Ok(stopped)
    }

    pub async fn stop(&self, record_id: &str) -> FaultActionResponse {
        match self.stop_record(record_id).await {
            Ok(Some(record)) => {
                FaultActionResponse::success(format!("{} stopped successfully", self.domain.label()))
                    .with_record(record.record_id, record.service_name)
            }
            Ok(None) => {
                FaultActionResponse::success(format!("{} stopped successfully", self.domain.label()))
            }
            Err(ControlPlaneError::ValidationError { message }) => FaultActionResponse::failure(message),
            Err(e) => FaultActionResponse::failure(format!("{} stop failed: {e}", self.domain.label())),
        }
    }

    /// Forget every tracked record, then delete every unprotected resource
    pub async fn stop_all(&self) -> StopAllSummary {
        let cleared = self.registry.drain();
        for record in &cleared {
            process_info!(ProcessId::current(), "🛑 Cleared {} on {}", record.record_id, record.service_name);
        }

        let mut summary = StopAllSummary {
            records_cleared: cleared.len(),
            ..StopAllSummary::default()
        };

        let kind = self.domain.resource_kind();
        for name in self.cluster.list_names(kind, &self.settings.namespace).await {
            if self.settings.protected_resources.contains(&name) {
                process_info!(ProcessId::current(), "🔒 Keeping protected {} {}", kind, name);
                summary.resources_skipped += 1;
                continue;
            }
            if self.cluster.delete(kind, &name, &self.settings.namespace).await {
                summary.resources_deleted += 1;
            } else {
                summary.resources_failed += 1;
            }
        }

        logging::log_success(ProcessId::current(), &format!("Stop-all {}: {}", kind, summary));
        summary
    }

    /// Remove records whose end time is before `now` and delete their resources
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> Vec<InjectedFaultRecord> {
        let expired: Vec<_> = self
            .registry
            .remove_if(|record| record.is_expired_at(now))
            .into_iter()
            .map(|record| record.with_status(FaultRecordStatus::Expired))
            .collect();

        for record in &expired {
            process_info!(
                ProcessId::current(),
                "⌛ Expired {} on {} (ended {})",
                record.record_id,
                record.service_name,
                record.end_time
            );
            let deleted = self
                .cluster
                .delete(self.domain.resource_kind(), &record.record_id, &self.settings.namespace)
                .await;
            if !deleted {
                logging::log_degraded(
                    ProcessId::current(),
                    "Expired fault left in cluster",
                    &record.record_id,
                );
            }
        }
        expired
    }

    pub async fn cleanup_expired(&self) -> Vec<InjectedFaultRecord> {
        self.sweep_expired_at(Utc::now()).await
    }

    /// Snapshot of tracked records
    pub fn active(&self) -> Vec<InjectedFaultRecord> {
        self.registry.get_all()
    }
}
