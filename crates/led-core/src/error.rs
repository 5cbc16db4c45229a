//! Error types for LED Core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Codec for {enum_name} has no token for {value}")]
    MissingToken { enum_name: &'static str, value: String },

    #[error("Codec for {enum_name} maps {value} more than once")]
    DuplicateValue { enum_name: &'static str, value: String },

    #[error("Codec for {enum_name} uses token {token:?} more than once")]
    DuplicateToken { enum_name: &'static str, token: &'static str },

    #[error("Blink rate out of range: {rate} > {max}")]
    RateOutOfRange { rate: u64, max: u8 },
}

/// Result type alias for LED Core operations
pub type Result<T> = std::result::Result<T, Error>;
