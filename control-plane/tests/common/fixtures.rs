//! Shared fixtures for control plane integration tests

use shared::{FaultDescriptor, FaultServiceInfo};

pub struct TestFixtures;

impl TestFixtures {
    pub const ORDER_SERVICE: &'static str = "ts-order-service";
    pub const STATION_SERVICE: &'static str = "ts-station-service";

    pub fn order_faults() -> FaultServiceInfo {
        FaultServiceInfo {
            service_name: "Order Service".to_string(),
            service_id: Self::ORDER_SERVICE.to_string(),
            description: "Order creation and query".to_string(),
            version: "1.0.0".to_string(),
            faults: vec![
                FaultDescriptor {
                    id: "external-api-error".to_string(),
                    name: "Third-party API failure".to_string(),
                    fault_type: "boolean".to_string(),
                    ..FaultDescriptor::default()
                },
                FaultDescriptor {
                    id: "slow-sql-error".to_string(),
                    name: "Slow SQL".to_string(),
                    fault_type: "delay".to_string(),
                    default_delay: Some(10_000),
                    ..FaultDescriptor::default()
                },
            ],
        }
    }

    pub fn catalog() -> &'static str {
        r#"{"service_dependencies": [
            {"service_name": "ts-order-service", "interfaces": [
                {"interface_name": "/api/v1/orderservice/order/refresh", "method_name": "queryOrders",
                 "http_method": "POST",
                 "upstream_services": [{"service_name": "ts-preserve-service",
                                        "interface_name": "/api/v1/preserveservice/preserve",
                                        "method_name": "preserve"}]},
                {"interface_name": "/api/v1/orderservice/order/{orderId}", "method_name": "getOrderById",
                 "http_method": "GET",
                 "upstream_services": [{"service_name": "ts-cancel-service",
                                        "interface_name": "/api/v1/cancelservice/cancel",
                                        "method_name": "cancelTicket"}]}
            ]}
        ]}"#
    }
}
