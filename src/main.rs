use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use olsrd::runtime::config::load_daemon_config;
use olsrd::runtime::engine::Engine;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "olsrd")]
#[command(about = "OLSR (RFC 3626) routing daemon")]
struct Args {
    #[arg(long)]
    config: PathBuf,
    #[arg(long, default_value = "INFO")]
    log_level: String,
    /// Override the node's own address from the config file, for quick
    /// manual runs against a shared config.
    #[arg(long)]
    address: Option<Ipv4Addr>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut cfg = load_daemon_config(&args.config)?;
    if let Some(address) = args.address {
        cfg.self_ip = address;
    }
    let mut engine = Engine::new(cfg)?;
    engine.run_forever()?;
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
    Ok(())
}
