//! Protocol error types

use thiserror::Error;

/// Startup-time protocol errors.
///
/// Request-time failures never show up here; they travel as
/// [`Outcome::Failure`](crate::Outcome::Failure).
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Command registered twice: {0}")]
    DuplicateCommand(String),

    #[error("Core error: {0}")]
    Core(#[from] led_core::Error),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
