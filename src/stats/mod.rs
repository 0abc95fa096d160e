//! Pipeline counters shared between the ingestion task and the stats task

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use crate::artnet::SendReport;
use crate::mapping::{RebuildReport, TranslateReport};
use crate::types::DmxPacket;

/// Monotonic counters; written by the ingestion task, read by anyone.
pub struct GatewayStats {
    started: Instant,
    pub datagrams: AtomicU64,
    pub config_messages: AtomicU64,
    pub update_messages: AtomicU64,
    pub decode_errors: AtomicU64,
    pub filtered: AtomicU64,
    pub entities_received: AtomicU64,
    pub entities_mapped: AtomicU64,
    pub entities_unmapped: AtomicU64,
    pub mapped_table_size: AtomicU64,
    pub dmx_packets: AtomicU64,
    pub dmx_channels: AtomicU64,
    pub artnet_sent: AtomicU64,
    pub artnet_failed: AtomicU64,
    /// active patch count, 0 while patching is disabled
    pub patches_active: AtomicU64,
    per_destination: Mutex<BTreeMap<String, u64>>,
}

/// Point-in-time copy of [`GatewayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub datagrams: u64,
    pub config_messages: u64,
    pub update_messages: u64,
    pub decode_errors: u64,
    pub filtered: u64,
    pub entities_received: u64,
    pub entities_mapped: u64,
    pub entities_unmapped: u64,
    pub mapped_table_size: u64,
    pub dmx_packets: u64,
    pub dmx_channels: u64,
    pub artnet_sent: u64,
    pub artnet_failed: u64,
    pub patches_active: u64,
    pub sends_per_destination: BTreeMap<String, u64>,
}

fn bump(counter: &AtomicU64, n: usize) {
    counter.fetch_add(n as u64, Ordering::Relaxed);
}

impl GatewayStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            datagrams: AtomicU64::new(0),
            config_messages: AtomicU64::new(0),
            update_messages: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            entities_received: AtomicU64::new(0),
            entities_mapped: AtomicU64::new(0),
            entities_unmapped: AtomicU64::new(0),
            mapped_table_size: AtomicU64::new(0),
            dmx_packets: AtomicU64::new(0),
            dmx_channels: AtomicU64::new(0),
            artnet_sent: AtomicU64::new(0),
            artnet_failed: AtomicU64::new(0),
            patches_active: AtomicU64::new(0),
            per_destination: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record_datagram(&self) {
        bump(&self.datagrams, 1);
    }

    pub fn record_decode_error(&self) {
        bump(&self.decode_errors, 1);
    }

    pub fn record_filtered(&self) {
        bump(&self.filtered, 1);
    }

    pub fn record_config(&self, report: &RebuildReport) {
        bump(&self.config_messages, 1);
        self.mapped_table_size
            .store(report.mapped_entities as u64, Ordering::Relaxed);
    }

    pub fn record_update(&self, received: usize, report: &TranslateReport) {
        bump(&self.update_messages, 1);
        bump(&self.entities_received, received);
        bump(&self.entities_mapped, report.mapped);
        bump(&self.entities_unmapped, report.unmapped);
    }

    pub fn record_packets(&self, packets: &[DmxPacket]) {
        bump(&self.dmx_packets, packets.len());
        bump(&self.dmx_channels, packets.iter().map(|p| p.channels.len()).sum());
    }

    pub fn record_send(&self, report: &SendReport) {
        bump(&self.artnet_sent, report.sent.len());
        bump(&self.artnet_failed, report.failed);
        if report.sent.is_empty() {
            return;
        }
        let mut per_dest = self.per_destination.lock();
        for ip in &report.sent {
            *per_dest.entry(ip.clone()).or_default() += 1;
        }
    }

    pub fn record_patch_table(&self, active: usize) {
        self.patches_active.store(active as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            datagrams: get(&self.datagrams),
            config_messages: get(&self.config_messages),
            update_messages: get(&self.update_messages),
            decode_errors: get(&self.decode_errors),
            filtered: get(&self.filtered),
            entities_received: get(&self.entities_received),
            entities_mapped: get(&self.entities_mapped),
            entities_unmapped: get(&self.entities_unmapped),
            mapped_table_size: get(&self.mapped_table_size),
            dmx_packets: get(&self.dmx_packets),
            dmx_channels: get(&self.dmx_channels),
            artnet_sent: get(&self.artnet_sent),
            artnet_failed: get(&self.artnet_failed),
            patches_active: get(&self.patches_active),
            sends_per_destination: self.per_destination.lock().clone(),
        }
    }
}

impl Default for GatewayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = GatewayStats::new();
        stats.record_datagram();
        stats.record_datagram();
        stats.record_update(3, &TranslateReport { mapped: 2, unmapped: 1 });
        stats.record_packets(&[DmxPacket::with_channels("10.0.0.1", 0, [(1, 1), (2, 2), (3, 3)])]);
        stats.record_send(&SendReport {
            sent: vec!["10.0.0.1".into(), "10.0.0.1".into(), "10.0.0.2".into()],
            failed: 1,
        });

        let snap = stats.snapshot();
        assert_eq!(snap.datagrams, 2);
        assert_eq!(snap.update_messages, 1);
        assert_eq!(snap.entities_received, 3);
        assert_eq!(snap.entities_unmapped, 1);
        assert_eq!(snap.dmx_channels, 3);
        assert_eq!(snap.artnet_sent, 3);
        assert_eq!(snap.artnet_failed, 1);
        assert_eq!(snap.sends_per_destination["10.0.0.1"], 2);
        assert_eq!(snap.sends_per_destination["10.0.0.2"], 1);
    }

    #[test]
    fn test_table_size_tracks_latest_config() {
        let stats = GatewayStats::new();
        stats.record_config(&RebuildReport { mapped_entities: 170, ..Default::default() });
        stats.record_config(&RebuildReport { mapped_entities: 10, ..Default::default() });
        let snap = stats.snapshot();
        assert_eq!(snap.config_messages, 2);
        assert_eq!(snap.mapped_table_size, 10);
    }
}
