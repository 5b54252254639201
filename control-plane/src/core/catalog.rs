//! Service interface catalog
//!
//! Read-only view of `service_dependencies_with_upstream.json`: which
//! services exist, which HTTP interfaces each exposes, the Java class behind
//! each interface and the upstream callers of it. JVM fault requests are
//! validated and completed against this catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ControlPlaneError, ControlPlaneResult};
use shared::{ProcessId, logging, process_info};

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    service_dependencies: Vec<CatalogService>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogService {
    service_name: String,
    #[serde(default)]
    interfaces: Vec<ServiceInterface>,
}

/// One HTTP interface of a service
///
/// Read from the snake_case catalog file, served as camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct ServiceInterface {
    pub interface_name: String,
    pub method_name: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub upstream_services: Vec<UpstreamService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct UpstreamService {
    pub service_name: String,
    #[serde(default)]
    pub interface_name: String,
    #[serde(default)]
    pub method_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<CatalogService>,
    package_overrides: HashMap<String, String>,
}

impl ServiceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> ControlPlaneResult<Self> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        Ok(Self {
            services: document.service_dependencies,
            package_overrides: HashMap::new(),
        })
    }

    /// Load the catalog file, falling back to an empty catalog on any error
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(catalog) => {
                process_info!(
                    ProcessId::current(),
                    "📚 Loaded service catalog with {} services from {}",
                    catalog.services.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                logging::log_error(ProcessId::current(), "Service catalog load", &e);
                Self::empty()
            }
        }
    }

    pub fn load(path: &Path) -> ControlPlaneResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ControlPlaneError::CatalogError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&raw).map_err(|e| ControlPlaneError::CatalogError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn with_package_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.package_overrides = overrides;
        self
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.service_name.clone()).collect()
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.services.iter().any(|s| s.service_name == service_name)
    }

    pub fn interfaces(&self, service_name: &str) -> Vec<ServiceInterface> {
        self.services
            .iter()
            .find(|s| s.service_name == service_name)
            .map(|s| s.interfaces.clone())
            .unwrap_or_default()
    }

    pub fn method_for_interface(&self, service_name: &str, interface_name: &str) -> Option<String> {
        self.find_interface(service_name, |i| i.interface_name == interface_name)
            .map(|i| i.method_name.clone())
    }

    pub fn interface_for_method(&self, service_name: &str, method_name: &str) -> Option<String> {
        self.find_interface(service_name, |i| i.method_name == method_name)
            .map(|i| i.interface_name.clone())
    }

    /// Interfaces with at least one upstream caller in `upstreams`
    ///
    /// An empty filter returns every interface of the service.
    pub fn interfaces_filtered_by_upstream(&self, service_name: &str, upstreams: &[String]) -> Vec<ServiceInterface> {
        let interfaces = self.interfaces(service_name);
        if upstreams.is_empty() {
            return interfaces;
        }
        interfaces
            .into_iter()
            .filter(|i| {
                i.upstream_services
                    .iter()
                    .any(|u| upstreams.iter().any(|wanted| *wanted == u.service_name))
            })
            .collect()
    }

    /// Java class targeted by a JVM rule
    ///
    /// An explicit non-empty name wins, then the catalog entry matching both
    /// interface and method, then `<package>.controller.<Package>Controller`.
    pub fn resolve_class_name(
        &self,
        service_name: &str,
        interface_name: &str,
        method_name: &str,
        explicit: Option<&str>,
    ) -> String {
        if let Some(class_name) = explicit.filter(|c| !c.trim().is_empty()) {
            return class_name.to_string();
        }

        let from_catalog = self
            .find_interface(service_name, |i| i.interface_name == interface_name && i.method_name == method_name)
            .and_then(|i| i.class_name.clone())
            .filter(|c| !c.is_empty());

        from_catalog.unwrap_or_else(|| {
            let package = self.package_name(service_name);
            format!("{package}.controller.{}Controller", capitalize(&package))
        })
    }

    /// Java package of a service's controllers
    pub fn package_name(&self, service_name: &str) -> String {
        if let Some(package) = self.package_overrides.get(service_name) {
            return package.clone();
        }
        service_name.replace("ts-", "").replace("-service", "")
    }

    fn find_interface<P>(&self, service_name: &str, predicate: P) -> Option<&ServiceInterface>
    where
        P: Fn(&ServiceInterface) -> bool,
    {
        self.services
            .iter()
            .find(|s| s.service_name == service_name)
            .and_then(|s| s.interfaces.iter().find(|i| predicate(i)))
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
