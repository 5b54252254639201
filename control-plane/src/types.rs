//! Core types for fault injection requests, results and bookkeeping records

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ControlPlaneError, ControlPlaneResult};

/// Fault type label stored on injected-fault records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    #[serde(rename = "network-delay")]
    NetworkDelay,
    #[serde(rename = "jvm-500-error")]
    JvmException,
    #[serde(rename = "jvm-latency")]
    JvmLatency,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::NetworkDelay => "network-delay",
            FaultKind::JvmException => "jvm-500-error",
            FaultKind::JvmLatency => "jvm-latency",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an injected-fault record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultRecordStatus {
    Active,
    Expired,
    Stopped,
}

/// Chaos-mesh custom resource kinds the control plane manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    NetworkChaos,
    JvmChaos,
}

impl ResourceKind {
    /// Resource name as understood by `kubectl`
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::NetworkChaos => "networkchaos",
            ResourceKind::JvmChaos => "jvmchaos",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping entry for one injected, time-bounded fault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedFaultRecord {
    pub record_id: String,
    pub service_name: String,
    pub fault_type: FaultKind,
    pub delay_seconds: u64,
    pub duration_minutes: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: FaultRecordStatus,
}

impl InjectedFaultRecord {
    /// New `active` record ending `duration_minutes` after `start_time`
    ///
    /// Fails when the end time is not representable.
    pub fn active(
        record_id: impl Into<String>,
        service_name: impl Into<String>,
        fault_type: FaultKind,
        delay_seconds: u64,
        duration_minutes: u64,
        start_time: DateTime<Utc>,
    ) -> ControlPlaneResult<Self> {
        let end_time = i64::try_from(duration_minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .and_then(|window| start_time.checked_add_signed(window))
            .ok_or_else(|| {
                ControlPlaneError::validation(format!("durationMinutes {duration_minutes} is out of range"))
            })?;
        Ok(Self {
            record_id: record_id.into(),
            service_name: service_name.into(),
            fault_type,
            delay_seconds,
            duration_minutes,
            start_time,
            end_time,
            status: FaultRecordStatus::Active,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    pub fn with_status(mut self, status: FaultRecordStatus) -> Self {
        self.status = status;
        self
    }
}

/// Network delay injection request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkDelayRequest {
    pub service_name: String,
    pub fault_type: Option<String>,
    pub delay_seconds: Option<i64>,
    pub duration_minutes: Option<i64>,
    /// Service whose inbound traffic is delayed
    pub target_service: Option<String>,
    /// Service originating the delayed traffic
    pub source_service: Option<String>,
    pub delay_upstream: Option<bool>,
}

/// JVM exception (HTTP 500) injection request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JvmFaultRequest {
    pub service_name: String,
    pub interface_name: Option<String>,
    pub method_name: Option<String>,
    pub http_method: Option<String>,
    pub class_name: Option<String>,
    pub duration_minutes: Option<i64>,
    pub exception_message: Option<String>,
    pub error_code: Option<i32>,
    pub latency_ms: Option<i64>,
    pub probability: Option<f64>,
}

/// JVM method latency injection request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JvmLatencyFaultRequest {
    pub service_name: String,
    pub interface_name: Option<String>,
    pub method_name: Option<String>,
    pub http_method: Option<String>,
    pub class_name: Option<String>,
    pub duration_minutes: Option<i64>,
    pub latency_ms: Option<i64>,
    pub probability: Option<f64>,
}

/// Result of an apply or stop call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl FaultActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            record_id: None,
            service_name: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(message)
        }
    }

    pub fn with_record(mut self, record_id: impl Into<String>, service_name: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self.service_name = Some(service_name.into());
        self
    }
}

/// Counts reported by a stop-all pass over one fault domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopAllSummary {
    pub records_cleared: usize,
    pub resources_deleted: usize,
    pub resources_failed: usize,
    pub resources_skipped: usize,
}

impl fmt::Display for StopAllSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cleared {} records, deleted {} resources ({} failed, {} skipped)",
            self.records_cleared, self.resources_deleted, self.resources_failed, self.resources_skipped
        )
    }
}

/// Outcome of a manifest apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub success: bool,
    pub output: String,
}
