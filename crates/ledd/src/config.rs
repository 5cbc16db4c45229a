//! Command line arguments and configuration file

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use led_core::{BlinkRate, CodecEnum, Color, EnumCodec, LedDevice, Power};
use serde::Deserialize;

pub const DEFAULT_PIPE: &str = "/tmp/led-server";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// LED control server
#[derive(Parser, Debug, Default)]
#[command(name = "ledd")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base path of the FIFO pair (<pipe>_client, <pipe>_server)
    #[arg(long, env = "LEDD_PIPE")]
    pub pipe: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "LEDD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LEDD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Close idle client connections after this many seconds (0 = never)
    #[arg(long, env = "LEDD_READ_TIMEOUT")]
    pub read_timeout: Option<u64>,

    /// Exit after the first client disconnects
    #[arg(long)]
    pub once: bool,

    /// Initial LED color
    #[arg(long)]
    pub color: Option<String>,

    /// Initial LED state
    #[arg(long)]
    pub state: Option<String>,

    /// Initial blink rate
    #[arg(long)]
    pub rate: Option<u64>,
}

/// Contents of the TOML configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub pipe: Option<PathBuf>,
    pub log_level: Option<String>,
    pub read_timeout_secs: Option<u64>,
    pub once: Option<bool>,
    pub led: LedConfig,
}

/// Initial LED state, as wire tokens
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LedConfig {
    pub color: Option<String>,
    pub state: Option<String>,
    pub rate: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Effective server settings: arguments, then file, then defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub pipe: PathBuf,
    pub log_level: String,
    pub read_timeout: Option<Duration>,
    pub once: bool,
    pub device: LedDevice,
}

impl Settings {
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let colors = Color::codec()?;
        let states = Power::codec()?;

        let color = match args.color.as_ref().or(file.led.color.as_ref()) {
            Some(token) => decode(&colors, token)?,
            None => Color::default(),
        };
        let power = match args.state.as_ref().or(file.led.state.as_ref()) {
            Some(token) => decode(&states, token)?,
            None => Power::default(),
        };
        let rate = match args.rate.or(file.led.rate) {
            Some(rate) => BlinkRate::new(rate).context("Invalid initial blink rate")?,
            None => BlinkRate::default(),
        };

        let read_timeout = args
            .read_timeout
            .or(file.read_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            pipe: args
                .pipe
                .clone()
                .or(file.pipe)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PIPE)),
            log_level: args
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            read_timeout,
            once: args.once || file.once.unwrap_or(false),
            device: LedDevice::new(color, power, rate),
        })
    }
}

fn decode<E: CodecEnum>(codec: &EnumCodec<E>, token: &str) -> Result<E> {
    codec.decode(token).with_context(|| {
        let expected: Vec<_> = codec.tokens().collect();
        format!(
            "Invalid initial {} {:?} (expected one of: {})",
            E::NAME,
            token,
            expected.join(", ")
        )
    })
}
