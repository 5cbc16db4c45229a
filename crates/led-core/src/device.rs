//! LED device model

use crate::codec::{CodecEnum, EnumCodec};
use crate::error::{Error, Result};
use std::fmt;

/// LED color
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Color {
    #[default]
    Red,
    Green,
    Blue,
}

impl CodecEnum for Color {
    const NAME: &'static str = "color";
    const ALL: &'static [Self] = &[Color::Red, Color::Green, Color::Blue];
}

impl Color {
    /// Canonical wire tokens
    pub fn codec() -> Result<EnumCodec<Color>> {
        EnumCodec::new(&[
            (Color::Red, "red"),
            (Color::Green, "green"),
            (Color::Blue, "blue"),
        ])
    }
}

/// LED power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Power {
    #[default]
    Off,
    On,
}

impl CodecEnum for Power {
    const NAME: &'static str = "state";
    const ALL: &'static [Self] = &[Power::Off, Power::On];
}

impl Power {
    /// Canonical wire tokens
    pub fn codec() -> Result<EnumCodec<Power>> {
        EnumCodec::new(&[(Power::Off, "off"), (Power::On, "on")])
    }
}

/// Blink rate, always within `0..=BlinkRate::MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlinkRate(u8);

impl BlinkRate {
    pub const MAX: u8 = 5;

    pub fn new(rate: u64) -> Result<Self> {
        if rate > u64::from(Self::MAX) {
            return Err(Error::RateOutOfRange {
                rate,
                max: Self::MAX,
            });
        }
        Ok(Self(rate as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BlinkRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable state of the simulated LED.
///
/// There is no locking here: the device has exactly one owner, which lends
/// it out mutably to one command at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedDevice {
    color: Color,
    power: Power,
    rate: BlinkRate,
}

impl LedDevice {
    pub fn new(color: Color, power: Power, rate: BlinkRate) -> Self {
        Self { color, power, rate }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn power(&self) -> Power {
        self.power
    }

    pub fn set_power(&mut self, power: Power) {
        self.power = power;
    }

    pub fn rate(&self) -> BlinkRate {
        self.rate
    }

    /// Set the blink rate. Out-of-range values leave the device unchanged.
    pub fn set_rate(&mut self, rate: u64) -> Result<BlinkRate> {
        let rate = BlinkRate::new(rate)?;
        self.rate = rate;
        Ok(rate)
    }
}
