//! Shared error types for the chaos control plane workspace

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Leaf contract violation: {message}")]
    ProtocolError { message: String },
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        SharedError::DeserializationError { message: err.to_string() }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
