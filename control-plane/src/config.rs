//! Control-plane configuration
//!
//! Loaded from an optional JSON file, then adjusted by environment variables
//! (after `.env` has been read) and finally by CLI flags in `main`. Every field
//! has a default, so an empty `{}` file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ControlPlaneError, ControlPlaneResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    pub server: ServerConfig,
    pub discovery: DiscoveryConfig,
    pub services: Vec<ServiceConfig>,
    pub chaos: ChaosConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    pub scan_interval_ms: u64,
    /// Connect and total timeout for each leaf-service call
    pub timeout_ms: u64,
    /// Pause between the boot-time pass and the catch-up pass
    pub settle_delay_ms: u64,
    pub service_port: u16,
}

/// One leaf service the discovery engine polls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    /// Base URL override, e.g. `http://127.0.0.1:18080`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub namespace: String,
    pub jvm_port: u16,
    pub command_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    pub kubectl: String,
    /// Cluster resources stop-all must leave in place
    pub protected_resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
    /// Service name -> Java package used when no class name is known
    pub package_overrides: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_ms: 30_000,
            timeout_ms: 5_000,
            settle_delay_ms: 2_000,
            service_port: 8080,
        }
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            namespace: "chaos".to_string(),
            jvm_port: 9277,
            command_timeout_ms: 30_000,
            sweep_interval_ms: 60_000,
            kubectl: "kubectl".to_string(),
            protected_resources: Vec::new(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("service_dependencies_with_upstream.json")),
            package_overrides: HashMap::new(),
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            discovery: DiscoveryConfig::default(),
            services: default_services(),
            chaos: ChaosConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

/// The train-ticket services that expose the fault contract
fn default_services() -> Vec<ServiceConfig> {
    [
        ("ts-order-service", "Order Service"),
        ("ts-station-service", "Station Service"),
        ("ts-food-service", "Food Service"),
        ("ts-station-food-service", "Station Food Service"),
        ("ts-train-food-service", "Train Food Service"),
        ("ts-travel-service", "Travel Service"),
        ("ts-route-service", "Route Service"),
        ("ts-price-service", "Price Service"),
        ("ts-seat-service", "Seat Service"),
        ("ts-preserve-service", "Preserve Service"),
        ("ts-user-service", "User Service"),
        ("ts-auth-service", "Auth Service"),
    ]
    .into_iter()
    .map(|(id, name)| ServiceConfig::new(id, name))
    .collect()
}

impl ServiceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Base URL of the service, without trailing slash
    pub fn base_url(&self, service_port: u16) -> String {
        match &self.address {
            Some(address) => address.trim_end_matches('/').to_string(),
            None => default_base_url(&self.id, service_port),
        }
    }
}

/// `http://{service_id}:{port}`, the in-cluster address convention
pub fn default_base_url(service_id: &str, service_port: u16) -> String {
    format!("http://{service_id}:{service_port}")
}

impl DiscoveryConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl ChaosConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl ControlPlaneConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> ControlPlaneResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ControlPlaneError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> ControlPlaneResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CONTROL_PLANE_*`, `CHAOS_*` and `FAULT_DISCOVERY_*` overrides
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> ControlPlaneResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("CONTROL_PLANE_PORT") {
            self.server.port = parse_env("CONTROL_PLANE_PORT", &port)?;
        }
        if let Some(namespace) = lookup("CHAOS_NAMESPACE") {
            self.chaos.namespace = namespace;
        }
        if let Some(kubectl) = lookup("CHAOS_KUBECTL") {
            self.chaos.kubectl = kubectl;
        }
        if let Some(protected) = lookup("CHAOS_PROTECTED_RESOURCES") {
            self.chaos.protected_resources = protected
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(enabled) = lookup("FAULT_DISCOVERY_ENABLED") {
            self.discovery.enabled = parse_env("FAULT_DISCOVERY_ENABLED", &enabled)?;
        }
        if let Some(interval) = lookup("FAULT_DISCOVERY_SCAN_INTERVAL_MS") {
            self.discovery.scan_interval_ms = parse_env("FAULT_DISCOVERY_SCAN_INTERVAL_MS", &interval)?;
        }
        if let Some(timeout) = lookup("FAULT_DISCOVERY_TIMEOUT_MS") {
            self.discovery.timeout_ms = parse_env("FAULT_DISCOVERY_TIMEOUT_MS", &timeout)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> ControlPlaneResult<()> {
        if self.discovery.scan_interval_ms == 0 {
            return Err(ControlPlaneError::config("discovery.scan_interval_ms must be positive"));
        }
        if self.discovery.timeout_ms == 0 {
            return Err(ControlPlaneError::config("discovery.timeout_ms must be positive"));
        }
        if self.chaos.sweep_interval_ms == 0 {
            return Err(ControlPlaneError::config("chaos.sweep_interval_ms must be positive"));
        }
        if self.chaos.command_timeout_ms == 0 {
            return Err(ControlPlaneError::config("chaos.command_timeout_ms must be positive"));
        }
        if self.chaos.namespace.trim().is_empty() {
            return Err(ControlPlaneError::config("chaos.namespace must not be empty"));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.id.trim().is_empty() {
                return Err(ControlPlaneError::config("services[].id must not be empty"));
            }
            if !seen.insert(service.id.as_str()) {
                return Err(ControlPlaneError::config(format!("duplicate service id {}", service.id)));
            }
        }
        Ok(())
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.id == service_id)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ControlPlaneResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ControlPlaneError::config(format!("{key}={value} is not valid")))
}
