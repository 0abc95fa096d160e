// src/lib.rs
pub mod gateway {
    pub use crate::core::{run, start, GatewayHandle};
    pub use crate::types::Options;
}

pub mod artnet;
pub mod config;
pub mod constants;
pub mod ehub;
pub mod error;
pub mod mapping;
pub mod network;
pub mod patch;
pub mod processor;
pub mod report;
pub mod stats;
pub mod types;
mod core;

pub use error::{GatewayError, Result};
pub use types::{ControllerTopology, DmxPacket, EntityRange, EntityUpdate, MappingRecord, Message};
