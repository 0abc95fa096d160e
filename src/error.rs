//! Error types for the gateway
use std::net::IpAddr;

use thiserror::Error;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Bad signature, short header or unknown message type
    #[error("eHuB protocol error: {0}")]
    Protocol(String),

    /// Compressed payload could not be inflated
    #[error("eHuB decompression error: {0}")]
    Decompression(String),

    /// Decoder invoked on the wrong message type
    #[error("eHuB type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: u8, found: u8 },

    /// Entity id or colour value out of range
    #[error("validation error: {0}")]
    Validation(String),

    /// Network failure towards one ArtNet destination
    #[error("ArtNet transmit to {ip} failed: {source}")]
    Transmit {
        ip: IpAddr,
        #[source]
        source: std::io::Error,
    },

    /// Patch replay with no resolvable path
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed patch table file
    #[error("invalid patch file (line {line}): {reason}")]
    InvalidPatchFile { line: usize, reason: String },

    /// Inconsistent gateway configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
