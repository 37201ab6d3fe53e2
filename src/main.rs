use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

use netaccess::config::EngineConfig;
use netaccess::scanner::Credentials;
use netaccess::scanner::manager::ScanManager;
use netaccess::web;

#[derive(Parser)]
#[command(name = "netaccess", version, about = "Discover LAN devices and how to manage them")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the local network
    Scan {
        /// Probe management ports of every discovered device
        #[arg(long)]
        probe: bool,
        /// Reverse-resolve neighbor hostnames
        #[arg(long)]
        resolve_hostnames: bool,
    },
    /// Probe one device and recommend an access method
    Handshake {
        ip: Ipv4Addr,
        #[arg(long, default_value = "unknown")]
        device_type: String,
    },
    /// Try one set of credentials over the recommended access method
    Connect {
        ip: Ipv4Addr,
        #[arg(long, default_value = "unknown")]
        device_type: String,
        #[arg(long, default_value = "admin")]
        username: String,
        #[arg(long, default_value = "admin")]
        password: String,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "127.0.0.1:5001")]
        bind: SocketAddr,
    },
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = EngineConfig::from_env();

    match cli.command {
        Commands::Scan {
            probe,
            resolve_hostnames,
        } => {
            config.probe_devices |= probe;
            config.resolve_hostnames |= resolve_hostnames;
            let manager = ScanManager::live(config)?;
            print_json(&manager.scan().await?)?;
        }
        Commands::Handshake { ip, device_type } => {
            let manager = ScanManager::live(config)?;
            print_json(&manager.handshake(ip, &device_type).await?)?;
        }
        Commands::Connect {
            ip,
            device_type,
            username,
            password,
        } => {
            let manager = ScanManager::live(config)?;
            let credentials = Credentials::new(username, password);
            print_json(&manager.auto_connect(ip, &device_type, &credentials).await?)?;
        }
        Commands::Serve { bind } => {
            let manager = Arc::new(ScanManager::live(config)?);
            tokio::task::spawn_blocking(move || web::run(bind, manager)).await??;
        }
    }

    Ok(())
}
