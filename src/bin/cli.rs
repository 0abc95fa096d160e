use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ehub_gateway::artnet::ArtNetSender;
use ehub_gateway::config::GatewayConfig;
use ehub_gateway::constants::DEFAULT_RECORD_DIR;
use ehub_gateway::gateway::{run, Options};
use ehub_gateway::patch::PatchOverlay;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(about = "eHuB to ArtNet gateway")]
struct Opt {
    /// JSON configuration (controllers, port, universe, max fps)
    #[clap(long, default_value = "config/config.json")]
    config: PathBuf,

    /// Listen address, overrides the configured port (IPv4, multicast allowed)
    #[clap(long)]
    listen: Option<String>,

    /// eHuB universe to accept, overrides the configuration
    #[clap(long)]
    universe: Option<u8>,

    /// ArtNet frame-rate ceiling, overrides the configuration
    #[clap(long)]
    max_fps: Option<u32>,

    /// Patch table (Source_Channel,Target_Channel); enabled when present
    #[clap(long, default_value = "patches.csv")]
    patches: PathBuf,

    /// Record the loaded patch table at startup (directory defaults to patch_record)
    #[clap(long, num_args = 0..=1, default_missing_value = DEFAULT_RECORD_DIR)]
    record_dir: Option<PathBuf>,

    /// Interval for the JSON stats snapshot, 0 disables it
    #[clap(long, default_value_t = 10)]
    refresh: u64,

    /// Probe every configured controller on the ArtNet port and exit
    #[clap(long, default_value_t = false)]
    check_network: bool,

    /// Log filter when RUST_LOG is unset
    #[clap(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opt.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = GatewayConfig::load_or_default(&opt.config)?;
    if let Some(universe) = opt.universe {
        config.ehub_universe = universe;
    }
    if let Some(fps) = opt.max_fps {
        config.max_fps = fps;
    }
    config.validate()?;

    if opt.check_network {
        return check_network(&config).await;
    }

    let mut patches = PatchOverlay::new();
    if opt.patches.exists() {
        let count = patches.load_file(&opt.patches)?;
        patches.enable();
        tracing::info!("{count} patches loaded from {}", opt.patches.display());
        if let Some(dir) = &opt.record_dir {
            let path = patches.record(dir)?;
            tracing::info!("patch table recorded to {}", path.display());
        }
    } else {
        tracing::info!("no patch file at {}, patching disabled", opt.patches.display());
    }

    let addr: SocketAddr = match &opt.listen {
        Some(s) => s.parse()?,
        None => SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.listen_port)),
    };

    run(
        Options {
            addr,
            ehub_universe: config.ehub_universe,
            refresh_secs: opt.refresh,
        },
        config,
        patches,
    )
    .await
}

async fn check_network(config: &GatewayConfig) -> anyhow::Result<()> {
    let sender = ArtNetSender::new(config.max_fps);
    let mut ips: Vec<&str> = config.controllers.values().map(|c| c.ip.as_str()).collect();
    ips.sort_unstable();
    ips.dedup();

    println!("ArtNet connectivity (UDP 6454, local send only):");
    let mut failures = 0;
    for ip in ips {
        if sender.connectivity_check(ip, Duration::from_secs(1)).await {
            println!("[OK]   {ip}");
        } else {
            println!("[FAIL] {ip}");
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} controller(s) unreachable");
    }
    Ok(())
}
