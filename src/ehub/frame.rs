// ehub/frame.rs
//! Generic eHuB frame reader: header validation and gzip body handling.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::constants::{EHUB_HEADER_SIZE, EHUB_SIGNATURE, MAX_INFLATED_SIZE};
use crate::error::{GatewayError, Result};
use crate::types::{Header, MessageType};

/// Header plus the compressed body it announces.
pub struct Frame<'a> {
    pub header: Header,
    pub body: &'a [u8], // at most `payload_len` bytes after the header
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = decode_header(data)?;
        let rest = &data[EHUB_HEADER_SIZE..];
        // A datagram cut short keeps whatever body bytes arrived; gzip decides.
        let end = rest.len().min(header.payload_len as usize);
        Ok(Self { header, body: &rest[..end] })
    }

    /// Fails with `TypeMismatch` unless the frame carries `expected`.
    pub fn require(&self, expected: MessageType) -> Result<()> {
        if self.header.kind != expected.as_byte() {
            return Err(GatewayError::TypeMismatch {
                expected: expected.as_byte(),
                found: self.header.kind,
            });
        }
        Ok(())
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        decompress(self.body)
    }
}

/// Parses the fixed 10-byte header.
pub fn decode_header(data: &[u8]) -> Result<Header> {
    if data.len() < EHUB_HEADER_SIZE {
        return Err(GatewayError::Protocol(format!(
            "message too short: {} bytes, header needs {EHUB_HEADER_SIZE}",
            data.len()
        )));
    }
    if &data[..4] != EHUB_SIGNATURE {
        return Err(GatewayError::Protocol("invalid eHuB signature".into()));
    }
    let mut buf = &data[4..EHUB_HEADER_SIZE];
    Ok(Header {
        kind: buf.get_u8(),
        universe: buf.get_u8(),
        record_count: buf.get_u16_le(),
        payload_len: buf.get_u16_le(),
    })
}

/// Inflates a gzip body, concatenated members included.
///
/// Output is capped at `MAX_INFLATED_SIZE`; a body inflating past it is a
/// `Decompression` error.
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(compressed.len() * 4);
    MultiGzDecoder::new(compressed)
        .take(MAX_INFLATED_SIZE as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| GatewayError::Decompression(e.to_string()))?;
    if out.len() > MAX_INFLATED_SIZE {
        return Err(GatewayError::Decompression(format!(
            "body inflates past {MAX_INFLATED_SIZE} bytes"
        )));
    }
    Ok(out)
}

pub fn compress(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len()), Compression::default());
    encoder
        .write_all(raw)
        .map_err(|e| GatewayError::Protocol(format!("gzip write failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| GatewayError::Protocol(format!("gzip finish failed: {e}")))
}

/// Builds header + gzip body around an already serialized record block.
pub fn encode_frame(kind: MessageType, universe: u8, record_count: usize, raw: &[u8]) -> Result<Vec<u8>> {
    let record_count = u16::try_from(record_count)
        .map_err(|_| GatewayError::Protocol(format!("{record_count} records exceed u16 count field")))?;
    let body = compress(raw)?;
    let payload_len = u16::try_from(body.len())
        .map_err(|_| GatewayError::Protocol(format!("compressed payload of {} bytes exceeds u16 length field", body.len())))?;

    let mut out = BytesMut::with_capacity(EHUB_HEADER_SIZE + body.len());
    out.put_slice(EHUB_SIGNATURE);
    out.put_u8(kind.as_byte());
    out.put_u8(universe);
    out.put_u16_le(record_count);
    out.put_u16_le(payload_len);
    out.put_slice(&body);
    Ok(out.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_little_endian() {
        let data = b"eHuB\x02\x05\x01\x02\x06\x00";
        let header = decode_header(data).unwrap();
        assert_eq!(header.kind, 2);
        assert_eq!(header.universe, 5);
        assert_eq!(header.record_count, 0x0201);
        assert_eq!(header.payload_len, 6);
    }

    #[test]
    fn test_short_header_rejected() {
        let err = decode_header(b"eHuB\x02").unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
        assert!(decode_header(&[]).is_err());
    }

    #[test]
    fn test_bad_signature_rejected() {
        let err = decode_header(b"eHuX\x02\x00\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[test]
    fn test_corrupt_body_is_decompression_error() {
        let err = decompress(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, GatewayError::Decompression(_)));
    }

    #[test]
    fn test_concatenated_members_all_inflated() {
        let mut body = compress(&[1, 0, 9, 9, 9, 9]).unwrap();
        body.extend(compress(&[2, 0, 8, 8, 8, 8]).unwrap());
        assert_eq!(decompress(&body).unwrap(), vec![1, 0, 9, 9, 9, 9, 2, 0, 8, 8, 8, 8]);
    }

    #[test]
    fn test_inflation_capped() {
        let at_cap = compress(&vec![0u8; MAX_INFLATED_SIZE]).unwrap();
        assert_eq!(decompress(&at_cap).unwrap().len(), MAX_INFLATED_SIZE);

        let bomb = compress(&vec![0u8; MAX_INFLATED_SIZE * 20]).unwrap();
        let err = decompress(&bomb).unwrap_err();
        assert!(matches!(err, GatewayError::Decompression(_)));
    }

    #[test]
    fn test_frame_body_limited_to_payload_len() {
        let mut data = b"eHuB\x01\x00\x00\x00\x03\x00".to_vec();
        data.extend_from_slice(&[1, 2, 3, 4, 5]);
        let frame = Frame::new(&data).unwrap();
        assert_eq!(frame.body, &[1, 2, 3]);
    }

    #[test]
    fn test_frame_type_check() {
        let frame = Frame::new(b"eHuB\x01\x00\x00\x00\x00\x00").unwrap();
        assert!(frame.require(MessageType::Config).is_ok());
        let err = frame.require(MessageType::Update).unwrap_err();
        assert!(matches!(err, GatewayError::TypeMismatch { expected: 2, found: 1 }));
    }
}
