//! Transport error types

use std::io;
use thiserror::Error;

/// Errors that end a connection or prevent the server from starting
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Read error: {0}")]
    Read(#[source] io::Error),

    #[error("Write error: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to set up {path}: {source}")]
    Setup {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
