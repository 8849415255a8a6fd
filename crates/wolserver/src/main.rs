use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wolserver::{ServerConfig, WolServer};

#[derive(Parser, Debug)]
#[command(name = "wolserver", version, about = "Matchmaking/chat server for period RTS clients")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hostname advertised to clients (overrides the config file).
    #[arg(long)]
    hostname: Option<String>,

    /// IP address to listen on (overrides the config file).
    #[arg(long)]
    listen_ip: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(hostname) = args.hostname {
        config.hostname = hostname;
    }
    if let Some(listen_ip) = args.listen_ip {
        config.listen_ip = listen_ip;
    }

    let server = WolServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
