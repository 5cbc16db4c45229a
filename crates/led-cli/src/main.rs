//! LED CLI Client
//!
//! Interactive command-line client for the LED control server.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the default pipe pair
//! ledctl
//!
//! # Connect to a custom pipe base path
//! ledctl --pipe /run/led
//!
//! # Execute single command
//! ledctl -c "set-led-color green"
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use led_transport::FifoPaths;

/// LED control client
#[derive(Parser, Debug)]
#[command(name = "ledctl")]
#[command(author, version, about = "ledctl - LED control server client")]
struct Args {
    /// Base path of the server's FIFO pair
    #[arg(long, default_value = "/tmp/led-server", env = "LEDD_PIPE")]
    pipe: PathBuf,

    /// Execute command and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Quiet mode (no banner)
    #[arg(short, long)]
    quiet: bool,
}

/// Both ends of an open connection to the server
struct Connection {
    requests: File,
    responses: BufReader<File>,
}

impl Connection {
    /// Open the request pipe first; the server is already reading it and
    /// only opens the response pipe once we do.
    fn open(paths: &FifoPaths) -> Result<Self> {
        let requests = OpenOptions::new()
            .write(true)
            .open(&paths.request)
            .with_context(|| format!("Failed to open {}", paths.request.display()))?;
        let responses = File::open(&paths.response)
            .with_context(|| format!("Failed to open {}", paths.response.display()))?;

        Ok(Self {
            requests,
            responses: BufReader::new(responses),
        })
    }

    fn send(&mut self, cmd: &str) -> Result<String> {
        writeln!(self.requests, "{}", cmd)?;
        self.requests.flush()?;

        let mut response = String::new();
        if self.responses.read_line(&mut response)? == 0 {
            bail!("Server closed the connection");
        }
        Ok(response.trim_end_matches('\n').to_string())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = FifoPaths::new(&args.pipe);

    let mut conn = Connection::open(&paths)?;

    // Single command mode
    if let Some(cmd) = args.command {
        return execute_command(&mut conn, &cmd);
    }

    if !args.quiet {
        println!(
            "{}",
            format!(
                "\n  ledctl    Connected to {}\n            Type 'help' for commands, 'quit' to exit\n",
                args.pipe.display()
            )
            .cyan()
        );
    }

    // Interactive mode
    let mut rl = DefaultEditor::new()?;
    let history_path = dirs::home_dir()
        .map(|p| p.join(".ledctl_history"))
        .unwrap_or_default();

    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", "led".green());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle local commands
                match line {
                    "quit" | "exit" => break,
                    "help" => {
                        print_help();
                        continue;
                    }
                    "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = execute_command(&mut conn, line) {
                    eprintln!("{} {}", "Error:".red(), e);

                    // The server reopens its pipes for the next client
                    match Connection::open(&paths) {
                        Ok(new_conn) => {
                            conn = new_conn;
                            println!("{}", "Reconnected.".yellow());
                        }
                        Err(_) => {
                            eprintln!("{}", "Connection lost.".red());
                            break;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn execute_command(conn: &mut Connection, cmd: &str) -> Result<()> {
    let response = conn.send(cmd)?;

    if response.starts_with("OK") {
        println!("{}", response.green());
    } else if response == "FAILED" {
        println!("{}", response.red());
    } else {
        println!("{}", response);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"
{}

{}
  set-led-color <red|green|blue>   Set LED color
  get-led-color                    Get LED color
  set-led-state <on|off>           Switch LED on or off
  get-led-state                    Get LED state
  set-led-rate <0..5>              Set blink rate
  get-led-rate                     Get blink rate

{}
  help                             Show this help
  clear                            Clear screen
  quit/exit                        Exit CLI
"#,
        "LED Commands".cyan().bold(),
        "Device".yellow().bold(),
        "Local".yellow().bold(),
    );
}
