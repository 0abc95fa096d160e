//! eHuB protocol codec
//!
//! Wire layout (integers little-endian):
//!
//! | offset | size | field                  |
//! |--------|------|------------------------|
//! | 0      | 4    | signature `eHuB`       |
//! | 4      | 1    | type (1 CONFIG, 2 UPDATE) |
//! | 5      | 1    | universe               |
//! | 6      | 2    | record count           |
//! | 8      | 2    | compressed body length |
//! | 10     | n    | gzip body              |
//!
//! The inflated body is a flat run of fixed-size records: 6 bytes per UPDATE
//! entity, 8 bytes per CONFIG range.

pub mod frame;
pub mod update;
pub mod config;

pub use frame::{decode_header, decompress, Frame};
pub use update::{decode_update, encode_update};
pub use config::{decode_config, encode_config};

use crate::error::Result;
use crate::types::{Message, MessageType};

/// Decodes any eHuB datagram, dispatching on its type byte.
pub fn decode(data: &[u8]) -> Result<Message> {
    let frame = Frame::new(data)?;
    let kind = MessageType::try_from(frame.header.kind)?;
    let raw = frame.decompress()?;
    Ok(match kind {
        MessageType::Config => Message::Config(config::parse_config_records(&raw)),
        MessageType::Update => Message::Update(update::parse_update_records(&raw)),
    })
}
