//! Entity → DMX mapping engine
//!
//! The table is rebuilt from scratch on every CONFIG message. Each entity gets
//! three consecutive channels (R, G, B) inside one universe of the controller
//! whose entity range contains it. A universe holds 170 RGB fixtures
//! (512 / 3, floored), so the entity offset inside the controller selects the
//! universe (`offset / 170`) and the slot inside it (`offset % 170`).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{CHANNELS_PER_FIXTURE, DMX_CHANNELS_PER_UNIVERSE, FIXTURES_PER_UNIVERSE};
use crate::types::{ControllerTopology, DmxPacket, EntityRange, EntityUpdate, MappingRecord};

/// Outcome of a CONFIG rebuild
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub mapped_entities: usize,
    /// entity_start > entity_end
    pub rejected_ranges: usize,
    /// no controller contains the range
    pub unmapped_ranges: usize,
    /// universe unassigned or channel overflow
    pub skipped_entities: usize,
}

/// Per-call counters of `translate`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TranslateReport {
    pub mapped: usize,
    pub unmapped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub packets: Vec<DmxPacket>,
    pub report: TranslateReport,
}

pub struct EntityMapper {
    controllers: Vec<ControllerTopology>,
    table: HashMap<u16, MappingRecord>,
}

impl EntityMapper {
    pub fn new(controllers: Vec<ControllerTopology>) -> Self {
        Self {
            controllers,
            table: HashMap::new(),
        }
    }

    /// Replaces the whole table with the mapping derived from `ranges`.
    pub fn rebuild(&mut self, ranges: &[EntityRange]) -> RebuildReport {
        self.table.clear();
        let mut report = RebuildReport::default();

        for range in ranges {
            let (start, end) = (range.entity_start as u32, range.entity_end as u32);
            if start > end {
                warn!(start, end, "rejecting CONFIG range with start after end");
                report.rejected_ranges += 1;
                continue;
            }

            let Some(ctrl) = self.controllers.iter().find(|c| c.contains(start, end)) else {
                warn!(start, end, "no controller covers CONFIG range");
                report.unmapped_ranges += 1;
                continue;
            };

            for entity in start..=end {
                match channel_slot(ctrl, entity) {
                    Some(record) => {
                        // start..=end lies inside u16 because it came off the wire as u16
                        self.table.insert(entity as u16, record);
                        report.mapped_entities += 1;
                    }
                    None => report.skipped_entities += 1,
                }
            }
        }

        if report.skipped_entities > 0 {
            warn!(skipped = report.skipped_entities, "entities without an assignable universe");
        }
        debug!(
            mapped = report.mapped_entities,
            rejected = report.rejected_ranges,
            unmapped = report.unmapped_ranges,
            skipped = report.skipped_entities,
            "entity mapping rebuilt"
        );
        report
    }

    /// Groups entity colours into one packet per (controller, universe).
    pub fn translate(&self, entities: &[EntityUpdate]) -> Translation {
        let mut report = TranslateReport::default();
        let mut packets: BTreeMap<(&str, u16), DmxPacket> = BTreeMap::new();

        for entity in entities {
            let Some(rec) = self.table.get(&entity.id) else {
                report.unmapped += 1;
                continue;
            };
            let pkt = packets
                .entry((rec.controller_ip.as_str(), rec.universe))
                .or_insert_with(|| DmxPacket::new(rec.controller_ip.clone(), rec.universe));
            // W has no channel in the RGB layout.
            pkt.channels.insert(rec.r_channel, entity.r);
            pkt.channels.insert(rec.g_channel, entity.g);
            pkt.channels.insert(rec.b_channel, entity.b);
            report.mapped += 1;
        }

        if report.unmapped > 0 {
            debug!(unmapped = report.unmapped, "entities without mapping skipped");
        }
        Translation {
            packets: packets.into_values().collect(),
            report,
        }
    }

    pub fn lookup(&self, entity: u16) -> Option<&MappingRecord> {
        self.table.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn controllers(&self) -> &[ControllerTopology] {
        &self.controllers
    }
}

/// Universe and channels for `entity` inside `ctrl`, or `None` when the
/// controller has no universe for it.
fn channel_slot(ctrl: &ControllerTopology, entity: u32) -> Option<MappingRecord> {
    let offset = entity - ctrl.start_entity;
    let universe_index = (offset / FIXTURES_PER_UNIVERSE) as usize;
    let position = (offset % FIXTURES_PER_UNIVERSE) as u16;

    let Some(&universe) = ctrl.universes.get(universe_index) else {
        debug!(entity, universe_index, controller = %ctrl.ip, "entity falls outside configured universes");
        return None;
    };

    let channel_start = position * CHANNELS_PER_FIXTURE + 1;
    let record = MappingRecord {
        controller_ip: ctrl.ip.clone(),
        universe,
        r_channel: channel_start,
        g_channel: channel_start + 1,
        b_channel: channel_start + 2,
    };
    if !channels_valid(&record) {
        debug!(entity, channel_start, "channel overflow, entity skipped");
        return None;
    }
    Some(record)
}

fn channels_valid(rec: &MappingRecord) -> bool {
    [rec.r_channel, rec.g_channel, rec.b_channel]
        .iter()
        .all(|&ch| (1..=DMX_CHANNELS_PER_UNIVERSE).contains(&ch))
}
