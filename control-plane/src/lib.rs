//! Chaos control plane for the train-ticket microservice system
//!
//! Discovers per-service fault switches, forwards toggle commands to leaf
//! services, and injects network-delay and JVM faults by rendering chaos-mesh
//! manifests and applying them through `kubectl`. Every injected fault is
//! tracked in an in-memory registry and expires on its own.

pub mod config;
pub mod control_plane;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use config::ControlPlaneConfig;
pub use crate::control_plane::{ControlPlane, StopAllResponse};
pub use crate::core::{FaultRegistry, RecordIdClock, ServiceCatalog};
pub use error::{ClusterError, ControlPlaneError, ControlPlaneResult};
pub use traits::{ClusterClient, LeafEndpoint, LeafServiceClient, MockClusterClient, MockLeafServiceClient};
