//! LED control line protocol
//!
//! A newline-terminated text protocol for reading and changing LED state.
//!
//! ## Request Format
//! ```text
//! <command>[ <parameter>]\n
//! ```
//!
//! ## Response Format
//! ```text
//! OK [payload]    # Success, payload omitted when empty
//! FAILED          # Any failure, no reason given
//! ```

pub mod command;
pub mod error;
pub mod parser;
pub mod response;

pub use command::{led_registry, register_led_commands, LedCommand, LedController};
pub use error::{ProtocolError, ProtocolResult};
pub use parser::{CommandRegistry, Handler, RequestLine};
pub use response::Outcome;
