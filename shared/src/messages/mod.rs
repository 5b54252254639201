//! Message types exchanged with leaf services
//!
//! - `fault`: the `/fault/info`, `/fault/status` and `/fault/control` contract
//!   every participating leaf service implements

pub mod fault;

pub use fault::{
    FaultControlRequest, FaultControlResponse, FaultDescriptor, FaultServiceInfo, FaultStatus, FaultToggleState,
    OFFLINE_STATUS, decode,
};
