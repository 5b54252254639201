//! Service-specific tests
//!
//! One file per service, sharing the fixtures in `common`.

#[cfg(test)]
mod discovery;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::sync::{Arc, Mutex};

    use crate::config::DiscoveryConfig;
    use crate::core::catalog::ServiceCatalog;
    use crate::services::injection::InjectionSettings;
    use crate::traits::MockClusterClient;
    use crate::types::ApplyOutcome;
    use shared::{FaultDescriptor, FaultServiceInfo, FaultStatus, FaultToggleState};

    pub const NAMESPACE: &str = "chaos";

    pub fn settings() -> InjectionSettings {
        InjectionSettings {
            namespace: NAMESPACE.to_string(),
            jvm_port: 9277,
            protected_resources: Vec::new(),
        }
    }

    /// Catalog with ts-order-service and ts-station-service
    pub fn catalog() -> Arc<ServiceCatalog> {
        let raw = r#"{"service_dependencies": [
            {"service_name": "ts-order-service", "interfaces": [
                {"interface_name": "/api/v1/orderservice/order/refresh", "method_name": "queryOrders",
                 "http_method": "POST", "class_name": "order.controller.OrderController",
                 "upstream_services": [{"service_name": "ts-preserve-service",
                                        "interface_name": "/api/v1/preserveservice/preserve",
                                        "method_name": "preserve"}]}
            ]},
            {"service_name": "ts-station-service", "interfaces": [
                {"interface_name": "/api/v1/stationservice/stations", "method_name": "query", "http_method": "GET"}
            ]}
        ]}"#;
        Arc::new(ServiceCatalog::from_json(raw).expect("valid catalog fixture"))
    }

    /// Discovery settings with background passes effectively disabled
    pub fn discovery_config() -> DiscoveryConfig {
        DiscoveryConfig {
            enabled: false,
            timeout_ms: 500,
            ..DiscoveryConfig::default()
        }
    }

    /// Cluster mock accepting every apply and delete, recording manifests
    pub fn accepting_cluster(manifests: Arc<Mutex<Vec<String>>>) -> MockClusterClient {
        let mut cluster = MockClusterClient::new();
        cluster.expect_apply().returning(move |manifest| {
            manifests.lock().unwrap().push(manifest.to_string());
            ApplyOutcome {
                success: true,
                output: "created".to_string(),
            }
        });
        cluster.expect_delete().returning(|_, _, _| true);
        cluster.expect_list_names().returning(|_, _| Vec::new());
        cluster
    }

    pub fn order_info(fault_ids: &[&str]) -> FaultServiceInfo {
        FaultServiceInfo {
            service_name: "Order Service".to_string(),
            service_id: "ts-order-service".to_string(),
            description: "order faults".to_string(),
            version: "1.0".to_string(),
            faults: fault_ids
                .iter()
                .map(|id| FaultDescriptor {
                    id: id.to_string(),
                    name: id.to_string(),
                    description: String::new(),
                    fault_type: "delay".to_string(),
                    default_delay: None,
                    default_error_code: None,
                    default_probability: None,
                })
                .collect(),
        }
    }

    pub fn order_status(faults: Vec<FaultToggleState>) -> FaultStatus {
        FaultStatus {
            service_id: "ts-order-service".to_string(),
            service_name: "Order Service".to_string(),
            status: "running".to_string(),
            details: String::new(),
            timestamp: 1,
            reachable: false,
            faults,
        }
    }
}
