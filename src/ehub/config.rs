use bytes::{Buf, BufMut};

use crate::constants::CONFIG_RECORD_SIZE;
use crate::ehub::frame::{encode_frame, Frame};
use crate::error::Result;
use crate::types::{EntityRange, MessageType};

/// Decodes a CONFIG datagram into entity ranges.
pub fn decode_config(data: &[u8]) -> Result<Vec<EntityRange>> {
    let frame = Frame::new(data)?;
    frame.require(MessageType::Config)?;
    Ok(parse_config_records(&frame.decompress()?))
}

/// 8-byte strides; a trailing partial record is dropped like UPDATE bodies.
pub fn parse_config_records(raw: &[u8]) -> Vec<EntityRange> {
    raw.chunks_exact(CONFIG_RECORD_SIZE)
        .map(|mut rec| EntityRange {
            payload_start: rec.get_u16_le(),
            entity_start: rec.get_u16_le(),
            payload_end: rec.get_u16_le(),
            entity_end: rec.get_u16_le(),
        })
        .collect()
}

pub fn encode_config(universe: u8, ranges: &[EntityRange]) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(ranges.len() * CONFIG_RECORD_SIZE);
    for r in ranges {
        raw.put_u16_le(r.payload_start);
        raw.put_u16_le(r.entity_start);
        raw.put_u16_le(r.payload_end);
        raw.put_u16_le(r.entity_end);
    }
    encode_frame(MessageType::Config, universe, ranges.len(), &raw)
}
