//! LED Core - device model and token codecs
//!
//! This crate provides the state behind the LED control server:
//! - A bidirectional codec between closed enums and their wire tokens
//! - The LED device model (color, power state, blink rate)

pub mod codec;
pub mod device;
pub mod error;

pub use codec::{CodecEnum, EnumCodec};
pub use device::{BlinkRate, Color, LedDevice, Power};
pub use error::{Error, Result};
