//! Constants for eHuB decoding, DMX addressing and ArtNet output

/// eHuB header constants
pub const EHUB_SIGNATURE: &[u8; 4] = b"eHuB";
pub const EHUB_HEADER_SIZE: usize = 10;
pub const EHUB_TYPE_CONFIG: u8 = 1;
pub const EHUB_TYPE_UPDATE: u8 = 2;

/// eHuB record sizes (decompressed payload)
pub const UPDATE_RECORD_SIZE: usize = 6; // u16 id + r g b w
pub const CONFIG_RECORD_SIZE: usize = 8; // 4 x u16

/// Largest inflated body: the u16 record count times the widest record
pub const MAX_INFLATED_SIZE: usize = u16::MAX as usize * CONFIG_RECORD_SIZE;

/// DMX512 addressing
pub const DMX_CHANNELS_PER_UNIVERSE: u16 = 512;
pub const CHANNELS_PER_FIXTURE: u16 = 3; // R, G, B
pub const FIXTURES_PER_UNIVERSE: u32 = 170; // floor(512 / 3)

/// ArtNet (Art-Net 4) OpDmx constants
pub const ARTNET_PORT: u16 = 6454;
pub const ARTNET_SIGNATURE: &[u8; 8] = b"Art-Net\0";
pub const ARTNET_OPCODE_DMX: u16 = 0x5000;
pub const ARTNET_PROTOCOL_VERSION: u16 = 14;
pub const ARTNET_HEADER_SIZE: usize = 18;
pub const ARTNET_PACKET_SIZE: usize = ARTNET_HEADER_SIZE + DMX_CHANNELS_PER_UNIVERSE as usize;

/// Ingestion defaults
pub const DEFAULT_LISTEN_PORT: u16 = 8765;
pub const DEFAULT_MAX_FPS: u32 = 40;
pub const MAX_DATAGRAM_SIZE: usize = 65536;
pub const RECV_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Patch persistence
pub const PATCH_CSV_HEADER: &str = "Source_Channel,Target_Channel";
pub const DEFAULT_RECORD_DIR: &str = "patch_record";
