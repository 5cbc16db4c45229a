//! LED command set
//!
//! Binds the LED device to the six protocol commands. The registry stores
//! [`LedCommand`] descriptors; the [`LedController`] they act on is handed
//! to [`CommandRegistry::dispatch`] by its single owner.

use crate::error::ProtocolResult;
use crate::parser::{CommandRegistry, Handler};
use crate::response::Outcome;
use led_core::{Color, EnumCodec, LedDevice, Power};
use tracing::debug;

/// All supported LED commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedCommand {
    /// set-led-color <red|green|blue>
    SetColor,

    /// get-led-color
    GetColor,

    /// set-led-state <on|off>
    SetState,

    /// get-led-state
    GetState,

    /// set-led-rate <0..5>
    SetRate,

    /// get-led-rate
    GetRate,
}

impl LedCommand {
    pub const ALL: [LedCommand; 6] = [
        LedCommand::SetColor,
        LedCommand::GetColor,
        LedCommand::SetState,
        LedCommand::GetState,
        LedCommand::SetRate,
        LedCommand::GetRate,
    ];

    /// Wire name of the command
    pub fn name(self) -> &'static str {
        match self {
            LedCommand::SetColor => "set-led-color",
            LedCommand::GetColor => "get-led-color",
            LedCommand::SetState => "set-led-state",
            LedCommand::GetState => "get-led-state",
            LedCommand::SetRate => "set-led-rate",
            LedCommand::GetRate => "get-led-rate",
        }
    }
}

impl Handler for LedCommand {
    type Target = LedController;

    fn call(&self, led: &mut LedController, parameter: &str) -> Outcome {
        match self {
            LedCommand::SetColor => led.set_color(parameter),
            LedCommand::GetColor => no_parameter(*self, parameter, || led.color()),
            LedCommand::SetState => led.set_state(parameter),
            LedCommand::GetState => no_parameter(*self, parameter, || led.state()),
            LedCommand::SetRate => led.set_rate(parameter),
            LedCommand::GetRate => no_parameter(*self, parameter, || led.rate()),
        }
    }
}

/// Register every [`LedCommand`] under its wire name
pub fn register_led_commands(registry: &mut CommandRegistry<LedCommand>) -> ProtocolResult<()> {
    for command in LedCommand::ALL {
        registry.register(command.name(), command)?;
    }
    Ok(())
}

/// A registry holding exactly the LED commands
pub fn led_registry() -> ProtocolResult<CommandRegistry<LedCommand>> {
    let mut registry = CommandRegistry::new();
    register_led_commands(&mut registry)?;
    Ok(registry)
}

/// The LED device together with the codecs used to talk about it
#[derive(Debug, Clone)]
pub struct LedController {
    device: LedDevice,
    colors: EnumCodec<Color>,
    states: EnumCodec<Power>,
}

impl LedController {
    /// Wrap a device. Fails if a codec does not cover its enum.
    pub fn new(device: LedDevice) -> ProtocolResult<Self> {
        Ok(Self {
            device,
            colors: Color::codec()?,
            states: Power::codec()?,
        })
    }

    pub fn device(&self) -> &LedDevice {
        &self.device
    }

    fn set_color(&mut self, token: &str) -> Outcome {
        match self.colors.decode(token) {
            Some(color) => {
                self.device.set_color(color);
                Outcome::success(token)
            }
            None => {
                debug!(token = %token, "Unknown color");
                Outcome::Failure
            }
        }
    }

    fn color(&self) -> String {
        self.colors.encode(self.device.color()).to_string()
    }

    fn set_state(&mut self, token: &str) -> Outcome {
        match self.states.decode(token) {
            Some(power) => {
                self.device.set_power(power);
                Outcome::success(token)
            }
            None => {
                debug!(token = %token, "Unknown state");
                Outcome::Failure
            }
        }
    }

    fn state(&self) -> String {
        self.states.encode(self.device.power()).to_string()
    }

    fn set_rate(&mut self, parameter: &str) -> Outcome {
        let Some(value) = parse_rate(parameter) else {
            debug!(rate = %parameter, "Rate is not a non-negative integer");
            return Outcome::Failure;
        };

        match self.device.set_rate(value) {
            Ok(rate) => Outcome::success(rate.to_string()),
            Err(e) => {
                debug!(error = %e, "Rate rejected");
                Outcome::Failure
            }
        }
    }

    fn rate(&self) -> String {
        self.device.rate().to_string()
    }
}

/// Run a getter, failing if the caller passed a parameter
fn no_parameter(command: LedCommand, parameter: &str, get: impl FnOnce() -> String) -> Outcome {
    if !parameter.is_empty() {
        debug!(command = command.name(), parameter = %parameter, "Unexpected parameter");
        return Outcome::Failure;
    }
    Outcome::Success(get())
}

/// Plain decimal digits only: no sign, no whitespace
fn parse_rate(parameter: &str) -> Option<u64> {
    if parameter.is_empty() || !parameter.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    parameter.parse().ok()
}
