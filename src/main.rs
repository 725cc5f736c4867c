//! `znp-transport`: bring-up and diagnostics for ZNP dongles.
//!
//! ```bash
//! znp-transport ports --json
//! znp-transport --port /dev/ttyACM0 probe
//! znp-transport --port COM3 --magic-number 0x01 monitor
//! znp-transport config init
//! ```

use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info, warn};
use znp_transport::config::{self, Config, ConfigLoader};
use znp_transport::coordinator::{Coordinator, CoordinatorStatus};
use znp_transport::port::available_ports;
use znp_transport::{logging, ByteStreamPort, InputStream, ZnpTransport};

#[derive(Parser, Debug)]
#[command(
    name = "znp-transport",
    version,
    about = "Serial transport for ZigBee ZNP coordinators (CC2531)",
    long_about = "Opens a ZNP dongle at 230400 8N1, sends the firmware handshake byte and exposes the raw byte stream for bring-up and diagnostics."
)]
struct Cli {
    /// Configuration file (defaults to the standard resolution order)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial device or alias, e.g. /dev/ttyACM0 or COM3
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Handshake byte, decimal or 0x-prefixed hex
    #[arg(long, global = true, value_parser = config::parse_int::<u8>)]
    magic_number: Option<u8>,

    /// Log level or filter directive
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports visible to the operating system
    Ports {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Open the port, send the handshake and report the first response
    Probe {
        /// How long to wait for the dongle to answer, in milliseconds
        #[arg(long, default_value_t = 500)]
        listen_ms: u64,
    },
    /// Open the coordinator and hex-dump everything it sends until Ctrl-C
    Monitor,
    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Target path (defaults to the platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Ports { json } => list_ports(json)?,
        Command::Probe { listen_ms } => probe(&config, Duration::from_millis(listen_ms)).await?,
        Command::Monitor => monitor(&config).await?,
        Command::Config { action } => match action {
            ConfigAction::Init { path, force } => init_config(path, force)?,
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
        },
    }

    Ok(())
}

fn load_config(cli: &Cli) -> config::ConfigResult<Config> {
    let mut config = match cli.config {
        Some(ref path) => ConfigLoader::load_from(path)?.into_config(),
        None => ConfigLoader::load()?.into_config(),
    };

    if let Some(ref port) = cli.port {
        config.transport.port = Some(port.clone());
    }
    if let Some(magic) = cli.magic_number {
        config.transport.magic_number = magic;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn list_ports(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ports = available_ports()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        let usb = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => String::new(),
        };
        println!(
            "{:<20} {:<10} {:<10} {}",
            port.name,
            port.kind,
            usb,
            port.product.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn probe(config: &Config, listen: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.transport.settings()?;
    let magic = settings.magic_number;
    let mut transport = ZnpTransport::system(settings);

    transport.try_open()?;
    println!(
        "{}: open, handshake {magic:#04x} sent",
        transport.port_name()
    );

    let signal = transport.data_signal();
    let input = transport.input_stream();
    let answer = tokio::task::spawn_blocking(move || {
        if !signal.wait_timeout(listen) {
            return Ok(Vec::new());
        }
        let mut buf = [0u8; 256];
        match input {
            Some(mut input) => input.read(&mut buf).map(|n| buf[..n].to_vec()),
            None => Ok(Vec::new()),
        }
    })
    .await??;

    if answer.is_empty() {
        println!("no data within {} ms", listen.as_millis());
    } else {
        println!("{}", hex_line(&answer));
    }

    transport.close();
    Ok(())
}

async fn monitor(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let transport = ZnpTransport::system(config.transport.settings()?);
    let mut coordinator = Coordinator::new(transport, config.network.identity());

    if let CoordinatorStatus::Offline { reason } = coordinator.initialize().clone() {
        return Err(format!("{}: {reason}", coordinator.port().port_name()).into());
    }
    let Some(input) = coordinator.port().input_stream() else {
        return Err("coordinator online without an input stream".into());
    };

    let stopping = Arc::new(AtomicBool::new(false));
    let pump = tokio::task::spawn_blocking({
        let stopping = stopping.clone();
        move || dump(input, &stopping)
    });

    info!("Monitoring {}; press Ctrl-C to stop", coordinator.port().port_name());
    shutdown_signal().await;

    stopping.store(true, Ordering::SeqCst);
    coordinator.dispose();

    match pump.await? {
        Ok(total) => info!("Received {} bytes", total),
        Err(e) => warn!("Monitor read failed: {}", e),
    }
    Ok(())
}

/// Hex-dump the input stream until it closes. Returns the byte count.
fn dump(mut input: InputStream, stopping: &AtomicBool) -> io::Result<u64> {
    let mut total = 0u64;
    let mut buf = [0u8; 256];
    loop {
        match input.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                total += n as u64;
                println!("{}", hex_line(&buf[..n]));
            }
            Err(e) if stopping.load(Ordering::SeqCst) => {
                debug!("Input closed: {}", e);
                return Ok(total);
            }
            Err(e) => return Err(e),
        }
    }
}

fn hex_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path
        .or_else(config::default_config_path)
        .ok_or("no platform config directory; pass --path")?;
    if path.exists() && !force {
        return Err(format!("{} exists; pass --force to overwrite", path.display()).into());
    }

    ConfigLoader::with_defaults().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
