use std::{
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::{net::UdpSocket, sync::watch, task::JoinHandle};
use tracing::{info, warn};

use crate::artnet::ArtNetSender;
use crate::config::GatewayConfig;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::mapping::EntityMapper;
use crate::network::create_udp_socket;
use crate::patch::PatchOverlay;
use crate::processor::PacketProcessor;
use crate::report::Reporter;
use crate::stats::GatewayStats;
use crate::types::Options;

/// Running gateway: the ingestion task plus the periodic stats task.
pub struct GatewayHandle {
    shutdown: watch::Sender<bool>,
    ingest: JoinHandle<()>,
    reporter: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    stats: Arc<GatewayStats>,
}

impl GatewayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &Arc<GatewayStats> {
        &self.stats
    }

    /// Stops listening. The datagram in flight is finished, then sockets are
    /// closed; waits at most `timeout` for the ingestion task.
    pub async fn stop(mut self, timeout: Duration) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        if let Some(reporter) = self.reporter.take() {
            reporter.abort();
        }
        match tokio::time::timeout(timeout, &mut self.ingest).await {
            Ok(joined) => joined?,
            Err(_) => {
                self.ingest.abort();
                anyhow::bail!("ingestion task did not stop within {timeout:?}");
            }
        }
        info!("gateway stopped");
        Ok(())
    }
}

/// Binds the inbound socket and spawns the ingestion and stats tasks.
pub async fn start(opts: Options, processor: PacketProcessor) -> anyhow::Result<GatewayHandle> {
    let socket = create_udp_socket(opts.addr)?;
    let sock = UdpSocket::from_std(socket.into())?;
    let local_addr = sock.local_addr()?;
    let stats = processor.stats.clone();

    let (shutdown, shutdown_rx) = watch::channel(false);
    let ingest = tokio::spawn(ingest_loop(sock, processor, shutdown_rx));

    let reporter = (opts.refresh_secs > 0).then(|| {
        tokio::spawn(report_loop(
            stats.clone(),
            opts.ehub_universe,
            Duration::from_secs(opts.refresh_secs),
        ))
    });

    info!(%local_addr, universe = opts.ehub_universe, "listening for eHuB");
    Ok(GatewayHandle { shutdown, ingest, reporter, local_addr, stats })
}

/// Builds the pipeline from `config`, runs until Ctrl-C.
pub async fn run(opts: Options, config: GatewayConfig, patches: PatchOverlay) -> anyhow::Result<()> {
    config.validate()?;

    let stats = Arc::new(GatewayStats::new());
    let processor = PacketProcessor::new(
        opts.ehub_universe,
        EntityMapper::new(config.topology()),
        patches,
        ArtNetSender::new(config.max_fps),
        stats,
    );
    let handle = start(opts, processor).await?;
    info!(
        controllers = config.controllers.len(),
        max_fps = config.max_fps,
        "gateway running, Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("stop requested");
    handle.stop(Duration::from_secs(1)).await
}

async fn ingest_loop(sock: UdpSocket, mut processor: PacketProcessor, mut shutdown: watch::Receiver<bool>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (n, peer) = tokio::select! {
            _ = shutdown.changed() => break,
            res = sock.recv_from(&mut buf) => match res {
                Ok(r) => r,
                Err(e) => {
                    warn!("recv failed: {e}");
                    continue;
                }
            },
        };
        if let Err(e) = processor.process_datagram(&buf[..n]).await {
            warn!(%peer, len = n, "datagram dropped: {e}");
        }
    }

    processor.shutdown();
}

async fn report_loop(stats: Arc<GatewayStats>, ehub_universe: u8, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await; // first tick is immediate
    loop {
        ticker.tick().await;
        println!("{}", Reporter::generate_json_report(&stats, ehub_universe));
    }
}
