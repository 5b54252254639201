//! Common test utilities and infrastructure
//!
//! Shared fixtures, the control plane builder and HTTP helpers used by the
//! integration suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{ControlPlaneBuilder, dead_address, get, post, post_json, spawn_agent};
