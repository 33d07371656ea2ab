use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
}
