//! LED Transport Layer
//!
//! Carries protocol lines over a duplex byte channel:
//! - Handler: the read-dispatch-write loop over any async byte stream
//! - FIFO: a pair of named pipes on Unix, one per direction

pub mod error;
#[cfg(unix)]
pub mod fifo;
pub mod handler;

pub use error::{TransportError, TransportResult};
#[cfg(unix)]
pub use fifo::{FifoPaths, FifoServer};
pub use handler::{ConnectionHandler, SessionEnd};
