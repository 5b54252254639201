//! Leaf-service fault contract
//!
//! Every service that wants to be discovered and controlled by the control
//! plane serves these payloads:
//!
//! - `GET /fault/info`     -> [`FaultServiceInfo`]
//! - `GET /fault/status`   -> [`FaultStatus`]
//! - `POST /fault/control` with [`FaultControlRequest`] -> [`FaultControlResponse`]
//!
//! Field names are camelCase on the wire. Optional numeric knobs are omitted
//! when unset.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{SharedError, SharedResult};

/// Status string stored for services the control plane could not reach
pub const OFFLINE_STATUS: &str = "offline";

/// Decode one contract payload
pub fn decode<T: DeserializeOwned>(raw: &str) -> SharedResult<T> {
    Ok(serde_json::from_str(raw)?)
}

/// Treat an explicit `null` list the same as a missing one
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Static description of one fault switch a service offers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub fault_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_delay: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_probability: Option<f64>,
}

/// Service metadata served from `/fault/info`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultServiceInfo {
    pub service_name: String,
    pub service_id: String,
    pub description: String,
    pub version: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub faults: Vec<FaultDescriptor>,
}

impl FaultServiceInfo {
    /// Parse a descriptor document a service publishes about itself
    ///
    /// Unlike a discovered payload, a self-description must carry its own
    /// service id and an id on every fault.
    pub fn from_json(raw: &str) -> SharedResult<Self> {
        let info: Self = decode(raw)?;
        if info.service_id.trim().is_empty() {
            return Err(SharedError::ProtocolError {
                message: "serviceId is missing".to_string(),
            });
        }
        if let Some(index) = info.faults.iter().position(|fault| fault.id.trim().is_empty()) {
            return Err(SharedError::ProtocolError {
                message: format!("fault #{index} has no id"),
            });
        }
        Ok(info)
    }
}

/// Observed state of one fault switch on one service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultToggleState {
    pub id: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl FaultToggleState {
    /// A switch known by id only, reported as off
    pub fn disabled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Service status served from `/fault/status` and cached by the control plane
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultStatus {
    pub service_id: String,
    pub service_name: String,
    pub status: String,
    pub details: String,
    /// Epoch milliseconds of the observation
    pub timestamp: i64,
    pub reachable: bool,
    #[serde(deserialize_with = "null_as_empty")]
    pub faults: Vec<FaultToggleState>,
}

impl FaultStatus {
    /// Synthetic record for a service that could not be polled
    pub fn offline(
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        details: impl Into<String>,
        faults: Vec<FaultToggleState>,
        timestamp: i64,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            status: OFFLINE_STATUS.to_string(),
            details: details.into(),
            timestamp,
            reachable: false,
            faults,
        }
    }

    /// Look up a switch by id
    pub fn fault(&self, fault_id: &str) -> Option<&FaultToggleState> {
        self.faults.iter().find(|f| f.id == fault_id)
    }
}

/// Toggle command sent to `/fault/control`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultControlRequest {
    pub fault_id: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

impl FaultControlRequest {
    pub fn new(fault_id: impl Into<String>, enable: bool) -> Self {
        Self {
            fault_id: fault_id.into(),
            enable,
            ..Self::default()
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: i64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

/// Result of a toggle command
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaultControlResponse {
    pub success: bool,
    pub message: String,
    pub fault_id: String,
    pub enabled: bool,
}

impl FaultControlResponse {
    pub fn failure(fault_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            fault_id: fault_id.into(),
            enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_document_requires_ids() {
        let info = FaultServiceInfo::from_json(
            r#"{"serviceId": "ts-order-service", "faults": [{"id": "slow-sql-error", "type": "delay"}]}"#,
        )
        .unwrap();
        assert_eq!(info.faults.len(), 1);

        let anonymous = FaultServiceInfo::from_json(r#"{"serviceName": "Order Service"}"#);
        assert!(matches!(anonymous, Err(SharedError::ProtocolError { .. })));

        let blank_fault = FaultServiceInfo::from_json(r#"{"serviceId": "ts-order-service", "faults": [{"id": " "}]}"#);
        assert!(matches!(blank_fault, Err(SharedError::ProtocolError { .. })));

        let garbled = FaultServiceInfo::from_json("{not json");
        assert!(matches!(garbled, Err(SharedError::DeserializationError { .. })));
    }

    #[test]
    fn test_status_defaults_missing_faults_to_empty() {
        let status: FaultStatus = serde_json::from_value(json!({
            "serviceId": "ts-order-service",
            "serviceName": "Order Service",
            "status": "ok",
            "details": "",
            "timestamp": 1,
            "reachable": false
        }))
        .unwrap();

        assert!(status.faults.is_empty());
        assert_eq!(status.service_id, "ts-order-service");
    }

    #[test]
    fn test_null_fault_list_is_empty() {
        let info: FaultServiceInfo = serde_json::from_value(json!({
            "serviceName": "Food Service",
            "serviceId": "ts-food-service",
            "faults": null
        }))
        .unwrap();

        assert!(info.faults.is_empty());
    }

    #[test]
    fn test_descriptor_type_field_is_renamed() {
        let descriptor: FaultDescriptor = serde_json::from_value(json!({
            "id": "slow-sql-error",
            "name": "Slow SQL",
            "type": "delay",
            "defaultDelay": 8000
        }))
        .unwrap();

        assert_eq!(descriptor.fault_type, "delay");
        assert_eq!(descriptor.default_delay, Some(8000));
        assert_eq!(serde_json::to_value(&descriptor).unwrap()["type"], "delay");
    }

    #[test]
    fn test_control_request_omits_unset_knobs() {
        let request = FaultControlRequest::new("slow-sql-error", true).with_delay_ms(8000);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["faultId"], "slow-sql-error");
        assert_eq!(value["enable"], true);
        assert_eq!(value["delayMs"], 8000);
        assert!(value.get("errorCode").is_none());
        assert!(value.get("probability").is_none());
    }

    #[test]
    fn test_offline_status_shape() {
        let status = FaultStatus::offline(
            "ts-food-service",
            "Food Service",
            "connection refused",
            vec![FaultToggleState::disabled("a")],
            42,
        );

        assert_eq!(status.status, OFFLINE_STATUS);
        assert!(!status.reachable);
        assert_eq!(status.fault("a"), Some(&FaultToggleState::disabled("a")));
    }
}
