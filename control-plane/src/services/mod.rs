//! Service implementations
//!
//! Real implementations of the I/O traits plus the engines built on them.

pub mod discovery;
pub mod fault_control;
pub mod injection;
pub mod kubectl;
pub mod leaf_client;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use discovery::DiscoveryEngine;
pub use fault_control::FaultControlFacade;
pub use injection::{
    FaultDomain, FaultInjector, InjectionSettings, JvmException, JvmExceptionInjector, JvmLatency, JvmLatencyInjector,
    NetworkDelay, NetworkInjector,
};
pub use kubectl::KubectlClient;
pub use leaf_client::HttpLeafClient;
