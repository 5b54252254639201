//! Core domain logic with no network or process I/O
//!
//! - `manifest`: chaos-mesh YAML rendering
//! - `registry`: per-domain injected-fault bookkeeping and record-id clock
//! - `catalog`: service interface catalog used by JVM faults

pub mod catalog;
pub mod manifest;
pub mod registry;

pub use catalog::{ServiceCatalog, ServiceInterface, UpstreamService};
pub use manifest::{JvmRuleMode, JvmRuleSpec, NetworkDelaySpec, render_jvm_rule, render_network_delay};
pub use registry::{FaultRegistry, RecordIdClock};
