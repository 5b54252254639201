//! Core types used throughout the control plane workspace

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Identity used when no binary has claimed the process (tests, embedding)
static EMBEDDED: ProcessId = ProcessId::Embedded;

/// Process identifier for any component in the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Control plane process (singleton)
    ControlPlane,
    /// Leaf fault agent, named after the service it fronts
    FaultAgent(String),
    /// Library code running without an initialized binary identity
    Embedded,
}

impl ProcessId {
    /// Initialize the global process ID for the control plane
    pub fn init_control_plane() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::ControlPlane)
    }

    /// Initialize the global process ID for a fault agent
    pub fn init_fault_agent(service_id: impl Into<String>) -> &'static ProcessId {
        let service_id = service_id.into();
        PROCESS_ID.get_or_init(|| ProcessId::FaultAgent(service_id))
    }

    /// Get the global process ID, or `Embedded` when no binary initialized one
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&EMBEDDED)
    }

    /// Crate target used to build the default log filter for this process
    pub fn log_target(&self) -> &'static str {
        match self {
            ProcessId::ControlPlane | ProcessId::Embedded => "control_plane",
            ProcessId::FaultAgent(_) => "fault_agent",
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::ControlPlane => write!(f, "control_plane"),
            ProcessId::FaultAgent(service) => write!(f, "fault_agent_{service}"),
            ProcessId::Embedded => write!(f, "embedded"),
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId::ControlPlane.to_string(), "control_plane");
        assert_eq!(
            ProcessId::FaultAgent("ts-order-service".to_string()).to_string(),
            "fault_agent_ts-order-service"
        );
        assert_eq!(ProcessId::Embedded.to_string(), "embedded");
    }

    #[test]
    fn test_log_targets() {
        assert_eq!(ProcessId::ControlPlane.log_target(), "control_plane");
        assert_eq!(ProcessId::FaultAgent("x".into()).log_target(), "fault_agent");
    }
}
