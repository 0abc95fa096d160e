use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{EHUB_TYPE_CONFIG, EHUB_TYPE_UPDATE};
use crate::error::{GatewayError, Result};

/// Colour update for one logical entity (UPDATE record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityUpdate {
    pub id: u16,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl EntityUpdate {
    pub fn new(id: u16, r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { id, r, g, b, w }
    }

    /// Builds an update from untyped values (generators, JSON tooling).
    /// Fails with `Validation` when the id exceeds u16 or a colour exceeds 255.
    pub fn from_wide(id: i64, r: i64, g: i64, b: i64, w: i64) -> Result<Self> {
        let id = u16::try_from(id)
            .map_err(|_| GatewayError::Validation(format!("entity id {id} out of range")))?;
        let channel = |name: &str, v: i64| {
            u8::try_from(v).map_err(|_| {
                GatewayError::Validation(format!("entity {id}: {name}={v} out of 0..=255"))
            })
        };
        Ok(Self {
            id,
            r: channel("r", r)?,
            g: channel("g", g)?,
            b: channel("b", b)?,
            w: channel("w", w)?,
        })
    }
}

/// Entity range announced by a CONFIG record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityRange {
    pub payload_start: u16,
    pub entity_start: u16,
    pub payload_end: u16,
    pub entity_end: u16,
}

impl EntityRange {
    pub fn new(payload_start: u16, entity_start: u16, payload_end: u16, entity_end: u16) -> Self {
        Self { payload_start, entity_start, payload_end, entity_end }
    }
}

/// eHuB message type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Config,
    Update,
}

impl MessageType {
    pub fn as_byte(self) -> u8 {
        match self {
            MessageType::Config => EHUB_TYPE_CONFIG,
            MessageType::Update => EHUB_TYPE_UPDATE,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = GatewayError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            EHUB_TYPE_CONFIG => Ok(MessageType::Config),
            EHUB_TYPE_UPDATE => Ok(MessageType::Update),
            other => Err(GatewayError::Protocol(format!("unknown message type {other}"))),
        }
    }
}

/// Fixed 10-byte eHuB header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: u8,
    pub universe: u8,
    pub record_count: u16,
    pub payload_len: u16,
}

/// A decoded eHuB datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Config(Vec<EntityRange>),
    Update(Vec<EntityUpdate>),
}

/// Static description of one physical ArtNet controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerTopology {
    pub ip: String,
    pub start_entity: u32,
    pub end_entity: u32,
    pub universes: Vec<u16>,
}

impl ControllerTopology {
    pub fn contains(&self, start: u32, end: u32) -> bool {
        self.start_entity <= start && end <= self.end_entity
    }
}

/// Where one entity lands on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRecord {
    pub controller_ip: String,
    pub universe: u16,
    pub r_channel: u16,
    pub g_channel: u16,
    pub b_channel: u16,
}

/// DMX values for one (controller, universe) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmxPacket {
    pub controller_ip: String,
    pub universe: u16,
    /// channel (1..=512) -> value
    pub channels: BTreeMap<u16, u8>,
}

impl DmxPacket {
    pub fn new(controller_ip: impl Into<String>, universe: u16) -> Self {
        Self {
            controller_ip: controller_ip.into(),
            universe,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_channels(
        controller_ip: impl Into<String>,
        universe: u16,
        channels: impl IntoIterator<Item = (u16, u8)>,
    ) -> Self {
        Self {
            controller_ip: controller_ip.into(),
            universe,
            channels: channels.into_iter().collect(),
        }
    }
}

/// Runtime options for the ingestion loop
#[derive(Debug, Clone)]
pub struct Options {
    pub addr: std::net::SocketAddr,
    pub ehub_universe: u8,
    pub refresh_secs: u64,
}
