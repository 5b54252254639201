//! Per-service fault switch set
//!
//! A service's switches are described once (usually from a JSON file) and
//! seeded from the environment at startup:
//!
//! - `FAULT_<ID>=true` enables a switch, `<ID>` being the fault id upper-cased
//!   with `-` replaced by `_` (`slow-sql-error` -> `FAULT_SLOW_SQL_ERROR`)
//! - `FAULT_<ID>_DELAY_MS=<n>` sets that switch's delay
//! - `FAULT_DELAY_TIME_MS=<n>` sets the delay of every delay-type switch
//!   without its own value
//!
//! After startup the set only changes through [`FaultSwitchSet::control`].

use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::{AgentError, AgentResult};
use shared::{
    FaultControlRequest, FaultControlResponse, FaultDescriptor, FaultServiceInfo, FaultStatus, FaultToggleState,
    ProcessId, epoch_millis, process_info,
};

/// Upper bound applied to every delay
pub const MAX_DELAY_MS: i64 = 300_000;

/// Shared fallback delay for delay-type switches
pub const GLOBAL_DELAY_KEY: &str = "FAULT_DELAY_TIME_MS";

const STATUS_NORMAL: &str = "normal";

/// `slow-sql-error` -> `FAULT_SLOW_SQL_ERROR`
pub fn env_key(fault_id: &str) -> String {
    format!("FAULT_{}", fault_id.to_uppercase().replace(['-', '.', ' '], "_"))
}

fn clamp_delay(delay_ms: i64) -> i64 {
    delay_ms.clamp(0, MAX_DELAY_MS)
}

fn is_delay_fault(descriptor: &FaultDescriptor) -> bool {
    descriptor.fault_type == "delay" || descriptor.default_delay.is_some()
}

/// Read a service's descriptor document from disk
pub fn load_descriptors(path: &Path) -> AgentResult<FaultServiceInfo> {
    let raw = std::fs::read_to_string(path).map_err(|e| AgentError::DescriptorError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(FaultServiceInfo::from_json(&raw)?)
}

#[derive(Debug)]
pub struct FaultSwitchSet {
    info: FaultServiceInfo,
    states: RwLock<HashMap<String, FaultToggleState>>,
}

impl FaultSwitchSet {
    /// All switches off, defaults taken from the descriptors
    pub fn new(info: FaultServiceInfo) -> AgentResult<Self> {
        Self::from_lookup(info, |_| None)
    }

    /// Seed switch state from the process environment
    pub fn from_env(info: FaultServiceInfo) -> AgentResult<Self> {
        Self::from_lookup(info, |key| std::env::var(key).ok())
    }

    /// Seed switch state from an arbitrary key lookup
    pub fn from_lookup<F>(info: FaultServiceInfo, lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut seen = HashSet::new();
        for descriptor in &info.faults {
            if !seen.insert(descriptor.id.as_str()) {
                return Err(AgentError::DuplicateFault {
                    id: descriptor.id.clone(),
                });
            }
        }

        let global_delay = parse_delay(&lookup, GLOBAL_DELAY_KEY)?;
        let mut states = HashMap::new();
        for descriptor in &info.faults {
            let key = env_key(&descriptor.id);
            let enabled = lookup(&key).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
            let own_delay = parse_delay(&lookup, &format!("{key}_DELAY_MS"))?;

            let delay_ms = match own_delay {
                Some(delay) => Some(delay),
                None if is_delay_fault(descriptor) => global_delay.or(descriptor.default_delay).map(clamp_delay),
                None => None,
            };

            if enabled {
                process_info!(ProcessId::current(), "🔥 {} enabled from environment ({})", descriptor.id, key);
            }
            states.insert(
                descriptor.id.clone(),
                FaultToggleState {
                    id: descriptor.id.clone(),
                    enabled,
                    delay_ms,
                    error_code: descriptor.default_error_code,
                    probability: descriptor.default_probability,
                },
            );
        }

        Ok(Self {
            info,
            states: RwLock::new(states),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, FaultToggleState>> {
        self.states.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, FaultToggleState>> {
        self.states.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn service_id(&self) -> &str {
        &self.info.service_id
    }

    pub fn info(&self) -> FaultServiceInfo {
        self.info.clone()
    }

    /// Current switch states in descriptor order
    pub fn status(&self) -> FaultStatus {
        let states = self.read();
        let faults: Vec<FaultToggleState> = self
            .info
            .faults
            .iter()
            .filter_map(|descriptor| states.get(&descriptor.id).cloned())
            .collect();
        let enabled = faults.iter().filter(|f| f.enabled).count();

        FaultStatus {
            service_id: self.info.service_id.clone(),
            service_name: self.info.service_name.clone(),
            status: STATUS_NORMAL.to_string(),
            details: format!("{enabled} of {} faults enabled", faults.len()),
            timestamp: epoch_millis(),
            reachable: true,
            faults,
        }
    }

    /// Apply a toggle command; unknown ids change nothing
    pub fn control(&self, request: &FaultControlRequest) -> FaultControlResponse {
        let mut states = self.write();
        let Some(state) = states.get_mut(&request.fault_id) else {
            return FaultControlResponse::failure(&request.fault_id, format!("Unknown fault: {}", request.fault_id));
        };

        state.enabled = request.enable;
        if let Some(delay_ms) = request.delay_ms {
            state.delay_ms = Some(clamp_delay(delay_ms));
        }
        if let Some(error_code) = request.error_code {
            state.error_code = Some(error_code);
        }
        if let Some(probability) = request.probability {
            state.probability = Some(probability.clamp(0.0, 1.0));
        }

        let message = match (state.enabled, state.delay_ms) {
            (true, Some(delay_ms)) if request.delay_ms.is_some() => {
                format!("Fault {} enabled with delay {}ms", state.id, delay_ms)
            }
            (true, _) => format!("Fault {} enabled", state.id),
            (false, _) => format!("Fault {} disabled", state.id),
        };
        process_info!(ProcessId::current(), "🎛️ {}", message);

        FaultControlResponse {
            success: true,
            message,
            fault_id: state.id.clone(),
            enabled: state.enabled,
        }
    }

    pub fn is_enabled(&self, fault_id: &str) -> bool {
        self.read().get(fault_id).is_some_and(|s| s.enabled)
    }

    /// Delay to inject for an enabled switch
    pub fn delay_for(&self, fault_id: &str) -> Option<Duration> {
        self.read()
            .get(fault_id)
            .filter(|s| s.enabled)
            .and_then(|s| s.delay_ms)
            .map(|ms| Duration::from_millis(ms.max(0) as u64))
    }

    /// Error code to answer with for an enabled switch
    pub fn error_code_for(&self, fault_id: &str) -> Option<i32> {
        self.read().get(fault_id).filter(|s| s.enabled).and_then(|s| s.error_code)
    }

    /// Whether an enabled switch fires on this call
    pub fn should_trigger(&self, fault_id: &str) -> bool {
        self.should_trigger_with(fault_id, &mut rand::thread_rng())
    }

    /// Same as [`Self::should_trigger`] with a caller-supplied RNG
    ///
    /// A switch without a probability fires every time.
    pub fn should_trigger_with<R: Rng>(&self, fault_id: &str, rng: &mut R) -> bool {
        let probability = match self.read().get(fault_id) {
            Some(state) if state.enabled => state.probability.unwrap_or(1.0),
            _ => return false,
        };
        rng.gen_bool(probability.max(0.0).min(1.0))
    }
}

fn parse_delay<F>(lookup: &F, key: &str) -> AgentResult<Option<i64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse::<i64>()
            .map(|delay| Some(clamp_delay(delay)))
            .map_err(|_| AgentError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shared::SharedError;

    fn descriptor(id: &str, fault_type: &str) -> FaultDescriptor {
        FaultDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            fault_type: fault_type.to_string(),
            ..FaultDescriptor::default()
        }
    }

    fn order_info() -> FaultServiceInfo {
        FaultServiceInfo {
            service_name: "Order Service".to_string(),
            service_id: "ts-order-service".to_string(),
            description: "order faults".to_string(),
            version: "1.0.0".to_string(),
            faults: vec![
                descriptor("empty-order-query", "boolean"),
                descriptor("external-api-error", "boolean"),
                FaultDescriptor {
                    default_delay: Some(10_000),
                    ..descriptor("slow-sql-error", "delay")
                },
            ],
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_descriptors_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faults.json");
        std::fs::write(&path, serde_json::to_string(&order_info()).unwrap()).unwrap();

        let info = load_descriptors(&path).unwrap();

        assert_eq!(info, order_info());
    }

    #[test]
    fn test_load_descriptors_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_descriptors(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(AgentError::DescriptorError { .. })));

        let anonymous = dir.path().join("anonymous.json");
        std::fs::write(&anonymous, r#"{"serviceName": "Order Service", "faults": []}"#).unwrap();
        assert!(matches!(
            load_descriptors(&anonymous),
            Err(AgentError::ContractError(SharedError::ProtocolError { .. }))
        ));
    }

    #[test]
    fn test_env_key_format() {
        assert_eq!(env_key("slow-sql-error"), "FAULT_SLOW_SQL_ERROR");
        assert_eq!(env_key("empty-station-query"), "FAULT_EMPTY_STATION_QUERY");
    }

    #[test]
    fn test_lookup_enables_named_switch() {
        let switches = FaultSwitchSet::from_lookup(
            order_info(),
            lookup_from(&[("FAULT_SLOW_SQL_ERROR", "TRUE"), ("FAULT_SLOW_SQL_ERROR_DELAY_MS", "8000")]),
        )
        .unwrap();

        assert!(switches.is_enabled("slow-sql-error"));
        assert!(!switches.is_enabled("external-api-error"));
        assert_eq!(switches.delay_for("slow-sql-error"), Some(Duration::from_millis(8000)));
    }

    #[test]
    fn test_global_delay_applies_to_delay_switches_only() {
        let switches =
            FaultSwitchSet::from_lookup(order_info(), lookup_from(&[(GLOBAL_DELAY_KEY, "2500")])).unwrap();
        let status = switches.status();

        assert_eq!(status.fault("slow-sql-error").unwrap().delay_ms, Some(2500));
        assert_eq!(status.fault("empty-order-query").unwrap().delay_ms, None);
        // Disabled switches inject nothing
        assert_eq!(switches.delay_for("slow-sql-error"), None);
    }

    #[test]
    fn test_invalid_delay_is_rejected() {
        let result = FaultSwitchSet::from_lookup(order_info(), lookup_from(&[(GLOBAL_DELAY_KEY, "soon")]));

        assert!(matches!(result, Err(AgentError::InvalidEnv { .. })));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut info = order_info();
        info.faults.push(descriptor("slow-sql-error", "delay"));

        assert!(matches!(
            FaultSwitchSet::new(info),
            Err(AgentError::DuplicateFault { .. })
        ));
    }

    #[test]
    fn test_unknown_fault_changes_nothing() {
        let switches = FaultSwitchSet::new(order_info()).unwrap();
        let before = switches.status().faults;

        let response = switches.control(&FaultControlRequest::new("no-such-fault", true));

        assert!(!response.success);
        assert_eq!(response.message, "Unknown fault: no-such-fault");
        assert!(!response.enabled);
        assert_eq!(switches.status().faults, before);
    }

    #[test]
    fn test_control_updates_and_clamps() {
        let switches = FaultSwitchSet::new(order_info()).unwrap();

        let response = switches.control(&FaultControlRequest::new("slow-sql-error", true).with_delay_ms(900_000));

        assert!(response.success);
        assert!(response.enabled);
        assert_eq!(response.message, "Fault slow-sql-error enabled with delay 300000ms");
        assert_eq!(
            switches.delay_for("slow-sql-error"),
            Some(Duration::from_millis(MAX_DELAY_MS as u64))
        );

        let off = switches.control(&FaultControlRequest::new("slow-sql-error", false));
        assert_eq!(off.message, "Fault slow-sql-error disabled");
        assert!(!switches.is_enabled("slow-sql-error"));
    }

    #[test]
    fn test_status_follows_descriptor_order() {
        let switches = FaultSwitchSet::new(order_info()).unwrap();
        switches.control(&FaultControlRequest::new("external-api-error", true));

        let status = switches.status();
        let ids: Vec<_> = status.faults.iter().map(|f| f.id.as_str()).collect();

        assert_eq!(ids, vec!["empty-order-query", "external-api-error", "slow-sql-error"]);
        assert!(status.reachable);
        assert_eq!(status.details, "1 of 3 faults enabled");
    }

    #[test]
    fn test_trigger_probability() {
        let switches = FaultSwitchSet::new(order_info()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(!switches.should_trigger_with("external-api-error", &mut rng));

        switches.control(&FaultControlRequest::new("external-api-error", true));
        assert!(switches.should_trigger_with("external-api-error", &mut rng));

        switches.control(&FaultControlRequest {
            probability: Some(0.0),
            ..FaultControlRequest::new("external-api-error", true)
        });
        assert!(!switches.should_trigger_with("external-api-error", &mut rng));
    }

    #[test]
    fn test_error_code_only_while_enabled() {
        let mut info = order_info();
        info.faults[1].default_error_code = Some(503);
        let switches = FaultSwitchSet::new(info).unwrap();

        assert_eq!(switches.error_code_for("external-api-error"), None);
        assert!(!switches.should_trigger("external-api-error"));

        switches.control(&FaultControlRequest::new("external-api-error", true));
        assert_eq!(switches.error_code_for("external-api-error"), Some(503));
        assert!(switches.should_trigger("external-api-error"));
    }
}
