//! Art-Net output
//!
//! Art-Net carries DMX512 frames over UDP port 6454. Every packet built here
//! is an OpDmx frame advertising a full 512-channel universe; channels not
//! present in the input are sent as zero.
//!
//! One UDP socket is kept per destination controller and reused across
//! batches. A global minimum interval of `1 / max_fps` is enforced per call
//! to [`ArtNetSender::send`]: a batch issued too early waits out the
//! remainder before anything goes on the wire.

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tokio::net::UdpSocket;
use tracing::{trace, warn};

use crate::constants::*;
use crate::error::{GatewayError, Result};
use crate::types::DmxPacket;

/// Builds an OpDmx packet for `universe`.
pub fn encode_packet(universe: u16, channels: &BTreeMap<u16, u8>) -> Vec<u8> {
    let mut packet = BytesMut::with_capacity(ARTNET_PACKET_SIZE);
    packet.put_slice(ARTNET_SIGNATURE);
    packet.put_u16_le(ARTNET_OPCODE_DMX);
    packet.put_u16(ARTNET_PROTOCOL_VERSION);
    packet.put_u8(0); // sequence (disabled)
    packet.put_u8(0); // physical port
    packet.put_u16_le(universe);
    packet.put_u16(DMX_CHANNELS_PER_UNIVERSE);

    let mut data = [0u8; DMX_CHANNELS_PER_UNIVERSE as usize];
    for (&channel, &value) in channels.range(1..=DMX_CHANNELS_PER_UNIVERSE) {
        data[channel as usize - 1] = value;
    }
    packet.put_slice(&data);
    packet.to_vec()
}

/// Result of one `send` batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// destination IP of every packet that left the host
    pub sent: Vec<String>,
    pub failed: usize,
}

pub struct ArtNetSender {
    enabled: bool,
    min_interval: Duration,
    last_send: Option<Instant>,
    sockets: HashMap<IpAddr, UdpSocket>,
    port: u16,
}

impl ArtNetSender {
    /// `max_fps` is clamped to at least 1.
    pub fn new(max_fps: u32) -> Self {
        Self {
            enabled: true,
            min_interval: frame_interval(max_fps),
            last_send: None,
            sockets: HashMap::new(),
            port: ARTNET_PORT,
        }
    }

    /// Destination port override (tests, non-standard nodes).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn set_max_fps(&mut self, max_fps: u32) {
        self.min_interval = frame_interval(max_fps);
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    /// Sends one ArtNet datagram per packet. Per-destination failures are
    /// logged and counted; they never abort the rest of the batch.
    pub async fn send(&mut self, packets: &[DmxPacket]) -> SendReport {
        let mut report = SendReport::default();
        if !self.enabled {
            return report;
        }

        if let Some(last) = self.last_send {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        for packet in packets {
            match self.send_one(packet).await {
                Ok(()) => report.sent.push(packet.controller_ip.clone()),
                Err(e) => {
                    warn!(controller = %packet.controller_ip, universe = packet.universe, "{e}");
                    report.failed += 1;
                }
            }
        }

        self.last_send = Some(Instant::now());
        report
    }

    async fn send_one(&mut self, packet: &DmxPacket) -> Result<()> {
        let ip: IpAddr = packet.controller_ip.parse().map_err(|_| {
            GatewayError::Config(format!("invalid controller address {:?}", packet.controller_ip))
        })?;
        let data = encode_packet(packet.universe, &packet.channels);
        let target = SocketAddr::new(ip, self.port);

        let socket = match self.sockets.entry(ip) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let sock = bind_outbound(ip)
                    .await
                    .map_err(|source| GatewayError::Transmit { ip, source })?;
                e.insert(sock)
            }
        };
        if let Err(source) = socket.send_to(&data, target).await {
            // drop the socket so the next batch starts clean
            self.sockets.remove(&ip);
            return Err(GatewayError::Transmit { ip, source });
        }
        trace!(%target, universe = packet.universe, channels = packet.channels.len(), "ArtDmx sent");
        Ok(())
    }

    /// Sends a small probe to `ip` on the ArtNet port.
    ///
    /// `true` only means the datagram left this host without a local network
    /// error (route present, interface up). UDP has no handshake, so this does
    /// not prove that a controller is listening or understood the probe.
    pub async fn connectivity_check(&self, ip: &str, timeout: Duration) -> bool {
        let Ok(addr) = ip.parse::<IpAddr>() else {
            warn!(ip, "connectivity check: invalid address");
            return false;
        };
        let target = SocketAddr::new(addr, self.port);
        let probe = async {
            let sock = bind_outbound(addr).await?;
            sock.send_to(b"test", target).await
        };
        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(ip, "connectivity check failed: {e}");
                false
            }
            Err(_) => {
                warn!(ip, "connectivity check timed out");
                false
            }
        }
    }

    /// Releases every outbound socket.
    pub fn close_all(&mut self) {
        self.sockets.clear();
    }
}

fn frame_interval(max_fps: u32) -> Duration {
    Duration::from_secs(1) / max_fps.max(1)
}

async fn bind_outbound(dest: IpAddr) -> std::io::Result<UdpSocket> {
    let local = match dest {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED), 0),
    };
    let sock = UdpSocket::bind(local).await?;
    if dest.is_ipv4() {
        sock.set_broadcast(true)?;
    }
    Ok(sock)
}
