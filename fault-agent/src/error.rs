//! Fault agent error types

use shared::SharedError;
use thiserror::Error;

/// Result type for fault agent operations
pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Cannot read fault descriptors from {path}: {message}")]
    DescriptorError { path: String, message: String },

    #[error("Duplicate fault id {id}")]
    DuplicateFault { id: String },

    #[error("Invalid environment value {key}={value}")]
    InvalidEnv { key: String, value: String },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid fault descriptors: {0}")]
    ContractError(#[from] SharedError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
