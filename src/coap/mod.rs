//! Constrained request/response message codec
//!
//! This module provides the wire format, option set, and serializer/parser for the
//! compact CoAP-style protocol spoken by low-power nodes.

mod codec;
mod error;
mod header;
mod message;
pub(crate) mod metrics;
mod option;
mod types;

pub use codec::{
    parse, parse_with_telemetry, records_per_message, serialize, serialize_with_telemetry,
    telemetry_room,
};
pub use error::{Error, Result};
pub use header::MessageHeader;
pub use message::{Block, Message, MessageIdGenerator};
pub use metrics::{CodecMetricsSnapshot, snapshot as metrics_snapshot};
pub use option::OptionNumber;
pub use types::{Code, MessageType};

/// Protocol version carried in every header
pub const VERSION: u8 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 4;

/// Maximum token length in bytes
pub const MAX_TOKEN_LEN: usize = 8;

/// Maximum stored length of ETag and If-Match values
pub const MAX_ETAG_LEN: usize = 8;

/// Maximum size of everything before the payload (header, token, options, telemetry block)
pub const MAX_HEADER_SIZE: usize = HEADER_SIZE + MAX_TOKEN_LEN + 58;

/// Maximum payload size carried by one message (both directions)
pub const MAX_CHUNK_SIZE: usize = 64;

/// Marker byte separating options from the payload
pub const PAYLOAD_MARKER: u8 = 0xFF;

/// Marker byte introducing a piggybacked telemetry block
pub const PIGGYBACK_MARKER: u8 = 0xFA;

/// Bytes reserved for lower-layer header compression when piggybacking telemetry
pub const COMPRESSION_MARGIN: usize = 11;

/// Max-Age value assumed when the option is absent (seconds)
pub const DEFAULT_MAX_AGE: u32 = 60;
