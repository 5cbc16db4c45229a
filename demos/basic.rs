//! Basic LED Server Example
//!
//! Drives the LED command set directly, then over an in-memory byte stream
//! through the same transport loop the FIFO server uses.
//!
//! Run with: cargo run --example basic

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use led_core::LedDevice;
use led_protocol::{led_registry, LedController};
use led_transport::ConnectionHandler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("LED Server Basic Example\n");

    println!("=== Embedded Mode ===\n");
    embedded_example()?;

    println!("\n=== Stream Mode ===\n");
    stream_example().await?;

    Ok(())
}

fn embedded_example() -> Result<()> {
    let registry = led_registry()?;
    let mut led = LedController::new(LedDevice::default())?;

    for line in [
        "set-led-color red",
        "get-led-color",
        "set-led-color grin",
        "get-led-color",
        "set-led-rate 6",
    ] {
        let outcome = registry.dispatch(&mut led, line);
        print!("{:<22} -> {}", line, String::from_utf8_lossy(&outcome.encode()));
    }

    println!("\nDevice: {:?}", led.device());
    Ok(())
}

async fn stream_example() -> Result<()> {
    let handler = ConnectionHandler::new("demo".into(), Arc::new(led_registry()?));
    let (_shutdown_tx, mut shutdown) = watch::channel(false);

    let (client, server) = tokio::io::duplex(1024);
    let (server_read, server_write) = tokio::io::split(server);

    let session = tokio::spawn(async move {
        let mut led = LedController::new(LedDevice::default())?;
        let end = handler
            .serve(&mut led, BufReader::new(server_read), server_write, &mut shutdown)
            .await?;
        anyhow::Ok(end)
    });

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut client_read = BufReader::new(client_read);

    for request in ["set-led-state on", "get-led-state", "set-led-rate 0", "get-led-rate"] {
        client_write.write_all(format!("{}\n", request).as_bytes()).await?;
        let mut response = String::new();
        client_read.read_line(&mut response).await?;
        print!("{:<22} -> {}", request, response);
    }

    drop(client_write);
    drop(client_read);
    println!("\nSession ended: {:?}", session.await??);

    Ok(())
}
