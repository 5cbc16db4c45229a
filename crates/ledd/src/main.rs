//! LED Server Daemon (ledd)
//!
//! Serves the LED line protocol over a pair of named pipes.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (/tmp/led-server_client, /tmp/led-server_server)
//! ledd
//!
//! # Custom pipe base path
//! ledd --pipe /run/led
//!
//! # Start green, blinking at rate 2
//! ledd --color green --state on --rate 2
//!
//! # With configuration file
//! ledd --config /etc/ledd/ledd.toml
//! ```

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use led_protocol::{led_registry, LedController};
use led_transport::FifoServer;

use crate::config::{Args, FileConfig, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, file)?;

    FmtSubscriber::builder()
        .with_max_level(parse_level(&settings.log_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner();

    // Codec or registry defects abort here, before any client connects
    let registry = Arc::new(led_registry().context("Failed to build command registry")?);
    let mut led = LedController::new(settings.device.clone())
        .context("Failed to initialize LED controller")?;

    let server = FifoServer::create(&settings.pipe, registry)
        .context("Failed to create named pipes")?
        .with_read_timeout(settings.read_timeout)
        .once(settings.once);

    info!(
        pipe = %settings.pipe.display(),
        read_timeout = ?settings.read_timeout,
        once = settings.once,
        device = ?settings.device,
        "Starting LED server"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(async move { server.run(&mut led, shutdown_rx).await });

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down...");
            let _ = shutdown_tx.send(true);
            server_task.await??;
        }
    }

    Ok(())
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn print_banner() {
    println!(
        r#"
  ledd - LED control server
  Version {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
