//! Shared types for the chaos control plane
//!
//! Contains the leaf-service fault contract spoken between the control plane
//! and every participating service, plus process identity and logging helpers
//! used by all binaries in the workspace.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

// Re-export the leaf contract at the crate root
pub use messages::{
    FaultControlRequest, FaultControlResponse, FaultDescriptor, FaultServiceInfo, FaultStatus, FaultToggleState,
    OFFLINE_STATUS, decode,
};
