use bytes::{Buf, BufMut};

use crate::constants::UPDATE_RECORD_SIZE;
use crate::ehub::frame::{encode_frame, Frame};
use crate::error::Result;
use crate::types::{EntityUpdate, MessageType};

/// Decodes an UPDATE datagram into entity colours.
pub fn decode_update(data: &[u8]) -> Result<Vec<EntityUpdate>> {
    let frame = Frame::new(data)?;
    frame.require(MessageType::Update)?;
    Ok(parse_update_records(&frame.decompress()?))
}

/// Walks the inflated body in 6-byte strides.
///
/// A trailing partial record (fewer than 6 bytes) is dropped without error so
/// truncated transmissions still deliver their complete records. This also
/// hides a body that is simply the wrong length, which is accepted.
pub fn parse_update_records(raw: &[u8]) -> Vec<EntityUpdate> {
    raw.chunks_exact(UPDATE_RECORD_SIZE)
        .map(|mut rec| EntityUpdate {
            id: rec.get_u16_le(),
            r: rec.get_u8(),
            g: rec.get_u8(),
            b: rec.get_u8(),
            w: rec.get_u8(),
        })
        .collect()
}

pub fn encode_update(universe: u8, entities: &[EntityUpdate]) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(entities.len() * UPDATE_RECORD_SIZE);
    for e in entities {
        raw.put_u16_le(e.id);
        raw.put_slice(&[e.r, e.g, e.b, e.w]);
    }
    encode_frame(MessageType::Update, universe, entities.len(), &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ehub::frame::compress;
    use crate::error::GatewayError;

    #[test]
    fn test_update_round_trip() {
        let entities = vec![
            EntityUpdate::new(1, 255, 0, 0, 0),
            EntityUpdate::new(2, 0, 255, 0, 12),
            EntityUpdate::new(65535, 1, 2, 3, 4),
        ];
        let msg = encode_update(0, &entities).unwrap();
        assert_eq!(&msg[..4], b"eHuB");
        assert_eq!(msg[4], 2);
        assert_eq!(u16::from_le_bytes([msg[6], msg[7]]), 3);
        assert_eq!(u16::from_le_bytes([msg[8], msg[9]]) as usize, msg.len() - 10);
        assert_eq!(decode_update(&msg).unwrap(), entities);
    }

    #[test]
    fn test_empty_update() {
        let msg = encode_update(3, &[]).unwrap();
        assert!(decode_update(&msg).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_payload_drops_partial_record() {
        // Two complete records plus 4 stray bytes.
        let mut raw = vec![0x01, 0x00, 255, 0, 0, 0, 0x02, 0x00, 0, 255, 0, 0];
        raw.extend_from_slice(&[0x03, 0x00, 9, 9]);
        let body = compress(&raw).unwrap();
        let mut msg = b"eHuB\x02\x00\x03\x00".to_vec();
        msg.extend_from_slice(&(body.len() as u16).to_le_bytes());
        msg.extend_from_slice(&body);

        let entities = decode_update(&msg).unwrap();
        assert_eq!(entities.len(), raw.len() / UPDATE_RECORD_SIZE);
        assert_eq!(entities[1], EntityUpdate::new(2, 0, 255, 0, 0));
    }

    #[test]
    fn test_multi_member_body_keeps_every_record() {
        let mut body = compress(&[1, 0, 9, 9, 9, 9]).unwrap();
        body.extend(compress(&[2, 0, 8, 8, 8, 8]).unwrap());
        let mut msg = b"eHuB\x02\x00\x02\x00".to_vec();
        msg.extend_from_slice(&(body.len() as u16).to_le_bytes());
        msg.extend_from_slice(&body);

        let entities = decode_update(&msg).unwrap();
        assert_eq!(entities, vec![EntityUpdate::new(1, 9, 9, 9, 9), EntityUpdate::new(2, 8, 8, 8, 8)]);
    }

    #[test]
    fn test_update_decoder_rejects_config() {
        let msg = crate::ehub::encode_config(0, &[]).unwrap();
        let err = decode_update(&msg).unwrap_err();
        assert!(matches!(err, GatewayError::TypeMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_garbage_body_after_valid_header() {
        let msg = b"eHuB\x02\x00\x01\x00\x04\x00\xde\xad\xbe\xef";
        assert!(matches!(decode_update(msg), Err(GatewayError::Decompression(_))));
    }
}
