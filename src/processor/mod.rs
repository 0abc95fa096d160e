//! Per-datagram processing: decode, route, map, patch, transmit

use std::sync::Arc;

use tracing::{debug, info};

use crate::artnet::{ArtNetSender, SendReport};
use crate::ehub::{self, decode_header};
use crate::error::Result;
use crate::mapping::{EntityMapper, RebuildReport, TranslateReport};
use crate::patch::PatchOverlay;
use crate::stats::GatewayStats;
use crate::types::Message;

/// What happened to one datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Addressed to another eHuB universe
    Filtered { universe: u8 },
    Config(RebuildReport),
    Update {
        translate: TranslateReport,
        packets: usize,
        send: SendReport,
    },
}

/// Owns all mutable pipeline state. Lives on the ingestion task only, so the
/// mapping and patch tables need no locking.
pub struct PacketProcessor {
    pub ehub_universe: u8,
    pub mapper: EntityMapper,
    pub patches: PatchOverlay,
    pub sender: ArtNetSender,
    pub stats: Arc<GatewayStats>,
}

impl PacketProcessor {
    pub fn new(
        ehub_universe: u8,
        mapper: EntityMapper,
        patches: PatchOverlay,
        sender: ArtNetSender,
        stats: Arc<GatewayStats>,
    ) -> Self {
        stats.record_patch_table(active_patches(&patches));
        Self { ehub_universe, mapper, patches, sender, stats }
    }

    /// Processes one datagram. Structural decode errors abort this datagram
    /// only and are returned to the caller.
    pub async fn process_datagram(&mut self, data: &[u8]) -> Result<Outcome> {
        self.stats.record_datagram();

        let header = decode_header(data).inspect_err(|_| self.stats.record_decode_error())?;
        if header.universe != self.ehub_universe {
            self.stats.record_filtered();
            return Ok(Outcome::Filtered { universe: header.universe });
        }

        let message = ehub::decode(data).inspect_err(|_| self.stats.record_decode_error())?;
        Ok(match message {
            Message::Config(ranges) => {
                let report = self.mapper.rebuild(&ranges);
                self.stats.record_config(&report);
                info!(
                    ranges = ranges.len(),
                    mapped = report.mapped_entities,
                    rejected = report.rejected_ranges + report.unmapped_ranges,
                    "CONFIG applied"
                );
                Outcome::Config(report)
            }
            Message::Update(entities) => {
                let translation = self.mapper.translate(&entities);
                self.stats.record_update(entities.len(), &translation.report);

                let packets = self.patches.apply(translation.packets);
                self.stats.record_packets(&packets);

                let send = self.sender.send(&packets).await;
                self.stats.record_send(&send);
                debug!(
                    entities = entities.len(),
                    packets = packets.len(),
                    sent = send.sent.len(),
                    failed = send.failed,
                    "UPDATE forwarded"
                );
                Outcome::Update {
                    translate: translation.report,
                    packets: packets.len(),
                    send,
                }
            }
        })
    }

    /// Re-publishes the patch count after an external add/remove/replay.
    pub fn refresh_patch_stats(&self) {
        self.stats.record_patch_table(active_patches(&self.patches));
    }

    pub fn shutdown(&mut self) {
        self.sender.close_all();
    }
}

fn active_patches(patches: &PatchOverlay) -> usize {
    if patches.is_enabled() { patches.len() } else { 0 }
}
