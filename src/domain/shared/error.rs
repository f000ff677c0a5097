//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A call session was asked to move to a status its current one forbids
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A vendor payload was missing fields the event requires
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Standard result type for domain operations
pub type Result<T> = std::result::Result<T, DomainError>;
