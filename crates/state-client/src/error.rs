//! State store failure types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Transport-level failure (connect, DNS, TLS, body read).
    #[error("state store request failed: {0}")]
    Http(String),

    /// Non-success HTTP status from the store.
    #[error("state store returned status {code}")]
    Status { code: u16 },

    /// Response body did not match the expected shape.
    #[error("state store response could not be decoded: {0}")]
    Decode(String),

    /// The HTTP-layer circuit breaker is open.
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

impl StateStoreError {
    /// True for failures worth retrying at the HTTP layer.
    pub fn is_transient(&self) -> bool {
        match self {
            StateStoreError::Http(_) => true,
            StateStoreError::Status { code } => *code >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StateStoreError::Status { code: 404 })
    }
}
