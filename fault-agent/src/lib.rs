//! Leaf-side fault agent
//!
//! Serves the fault contract (`/fault/info`, `/fault/status`,
//! `/fault/control`) for one service from an explicitly constructed
//! [`FaultSwitchSet`], so the control plane can discover and toggle it.

pub mod error;
pub mod routes;
pub mod switches;

pub use error::{AgentError, AgentResult};
pub use routes::{router, serve};
pub use switches::{FaultSwitchSet, load_descriptors};
