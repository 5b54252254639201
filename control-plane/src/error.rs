//! Control-plane error types

use shared::SharedError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Invalid request: {message}")]
    ValidationError { message: String },

    #[error("Service catalog unavailable at {path}: {message}")]
    CatalogError { path: String, message: String },

    #[error("Leaf service {service_id} unreachable: {message}")]
    LeafTransportError { service_id: String, message: String },

    #[error("Leaf service {service_id} answered HTTP {status}")]
    LeafStatusError { service_id: String, status: u16 },

    #[error("Could not delete {kind} {name}")]
    ResourceDeleteFailed { kind: String, name: String },

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Leaf service {service_id} broke the fault contract: {source}")]
    ContractError { service_id: String, source: SharedError },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ControlPlaneError {
    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError { message: message.into() }
    }

    pub fn contract(service_id: impl Into<String>, source: SharedError) -> Self {
        Self::ContractError {
            service_id: service_id.into(),
            source,
        }
    }

    pub fn leaf_transport(service_id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::LeafTransportError {
            service_id: service_id.into(),
            message: err.to_string(),
        }
    }
}

/// Failures of a single `kubectl` invocation
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("failed to spawn `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("I/O with `{command}` failed: {message}")]
    Io { command: String, message: String },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` exited with {code:?}: {output}")]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

pub type ControlPlaneResult<T> = Result<T, ControlPlaneError>;
pub type ClusterResult<T> = Result<T, ClusterError>;
