//! Message codec (serialize/parse)
//!
//! # Format
//!
//! ```text
//! [HEADER (4)] [TOKEN (0-8)] [OPTIONS] [0xFA LEN TELEMETRY]? [0xFF PAYLOAD]?
//! ```
//!
//! Options are written in ascending option-number order. The telemetry block is
//! only present when a caller asked for piggybacking and it fit.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use super::message::Message;
use super::metrics::{MessageDirection, Metrics, PiggybackEvent};
use super::option::{self, OptionNumber};
use super::{
    COMPRESSION_MARGIN, Error, HEADER_SIZE, MAX_CHUNK_SIZE, MAX_HEADER_SIZE, MessageHeader,
    PAYLOAD_MARKER, PIGGYBACK_MARKER, Result,
};

/// Bytes of a chunk reserved for framing when a payload is packed with telemetry records
const RECORD_PACKING_OVERHEAD: usize = 14;

/// Serialize a message to bytes
///
/// # Errors
///
/// Returns [`Error::HeaderTooLarge`] when header, token and options exceed
/// [`MAX_HEADER_SIZE`], and [`Error::OptionTooLong`] for oversized option values.
pub fn serialize(message: &Message) -> Result<Vec<u8>> {
    serialize_inner(message, None)
}

/// Serialize a message, piggybacking a telemetry block when it fits
///
/// The block is written only for CON/NON messages and only while
/// `payload + telemetry + 2 + COMPRESSION_MARGIN <= MAX_CHUNK_SIZE`; otherwise the
/// message is serialized exactly as [`serialize`] would.
pub fn serialize_with_telemetry(message: &Message, telemetry: &[u8]) -> Result<Vec<u8>> {
    serialize_inner(message, Some(telemetry))
}

fn serialize_inner(message: &Message, telemetry: Option<&[u8]>) -> Result<Vec<u8>> {
    let result = write_message(message, telemetry);
    match &result {
        Ok(bytes) => {
            Metrics::record_message(MessageDirection::Serialized, message.message_type());
            debug!(
                mid = message.message_id(),
                len = bytes.len(),
                payload_len = message.payload().len(),
                "serialized message"
            );
        }
        Err(err) => {
            Metrics::record_error(MessageDirection::Serialized);
            warn!(mid = message.message_id(), error = %err, "serialization failed");
        }
    }
    result
}

fn write_message(message: &Message, telemetry: Option<&[u8]>) -> Result<Vec<u8>> {
    // empty messages are the bare header, TKL 0
    let token = if message.is_empty() {
        &[][..]
    } else {
        message.token()
    };
    let header = MessageHeader::new(
        message.message_type(),
        message.code(),
        message.message_id(),
        token.len() as u8,
    );

    let mut out = BytesMut::with_capacity(MAX_HEADER_SIZE + message.payload().len());
    out.put_slice(&header.to_bytes());

    if message.is_empty() {
        trace!(mid = message.message_id(), "empty message, header only");
        return Ok(out.to_vec());
    }

    out.put_slice(token);

    let mut writer = OptionWriter::new(&mut out);
    writer.opaque(OptionNumber::IF_MATCH, message.if_match.as_deref())?;
    writer.string(OptionNumber::URI_HOST, message.uri_host.as_deref(), None)?;
    writer.opaque(OptionNumber::ETAG, message.etag.as_deref())?;
    writer.empty(OptionNumber::IF_NONE_MATCH, message.if_none_match)?;
    writer.uint(OptionNumber::OBSERVE, message.observe)?;
    writer.uint(OptionNumber::URI_PORT, message.uri_port.map(u32::from))?;
    writer.string(
        OptionNumber::LOCATION_PATH,
        message.location_path.as_deref(),
        Some('/'),
    )?;
    writer.string(OptionNumber::URI_PATH, message.uri_path.as_deref(), Some('/'))?;
    writer.uint(
        OptionNumber::CONTENT_FORMAT,
        message.content_format.map(u32::from),
    )?;
    writer.uint(OptionNumber::MAX_AGE, message.max_age)?;
    writer.string(OptionNumber::URI_QUERY, message.uri_query.as_deref(), Some('&'))?;
    writer.uint(OptionNumber::ACCEPT, message.accept.map(u32::from))?;
    writer.string(
        OptionNumber::LOCATION_QUERY,
        message.location_query.as_deref(),
        Some('&'),
    )?;
    writer.uint(OptionNumber::BLOCK2, message.block2.map(|b| b.to_value()))?;
    writer.uint(OptionNumber::BLOCK1, message.block1.map(|b| b.to_value()))?;
    writer.uint(OptionNumber::SIZE2, message.size2)?;
    writer.string(OptionNumber::PROXY_URI, message.proxy_uri.as_deref(), None)?;
    writer.string(OptionNumber::PROXY_SCHEME, message.proxy_scheme.as_deref(), None)?;
    writer.uint(OptionNumber::SIZE1, message.size1)?;

    if out.len() > MAX_HEADER_SIZE {
        return Err(Error::HeaderTooLarge {
            size: out.len(),
            max: MAX_HEADER_SIZE,
        });
    }

    if let Some(block) = telemetry {
        put_telemetry(&mut out, message, block);
    }

    let payload = message.payload();
    if !payload.is_empty() {
        out.put_u8(PAYLOAD_MARKER);
        out.put_slice(payload);
    }

    Ok(out.to_vec())
}

/// Bytes a piggybacked telemetry block may occupy in `message`
///
/// Zero for ACK and RST. Otherwise the chunk left after the payload, the block
/// marker and length byte, and the header-compression margin, capped by the
/// one-byte length field.
#[must_use]
pub fn telemetry_room(message: &Message) -> usize {
    if !message.message_type().carries_telemetry() {
        return 0;
    }
    MAX_CHUNK_SIZE
        .saturating_sub(message.payload().len() + 2 + COMPRESSION_MARGIN)
        .min(usize::from(u8::MAX))
}

fn put_telemetry(out: &mut BytesMut, message: &Message, block: &[u8]) {
    if block.len() > telemetry_room(message) {
        Metrics::record_piggyback(PiggybackEvent::Skipped);
        debug!(
            msg_type = %message.message_type(),
            payload_len = message.payload().len(),
            telemetry_len = block.len(),
            "telemetry block not piggybacked"
        );
        return;
    }

    out.put_u8(PIGGYBACK_MARKER);
    out.put_u8(block.len() as u8);
    out.put_slice(block);
    Metrics::record_piggyback(PiggybackEvent::Sent);
    trace!(len = block.len(), "telemetry block piggybacked");
}

/// Writes options in ascending order, tracking the running option number
struct OptionWriter<'a> {
    out: &'a mut BytesMut,
    current: u16,
}

impl<'a> OptionWriter<'a> {
    fn new(out: &'a mut BytesMut) -> Self {
        Self { out, current: 0 }
    }

    fn put(&mut self, number: OptionNumber, value: &[u8]) -> Result<()> {
        let delta = u32::from(number.as_u16() - self.current);
        option::put_header(self.out, number, delta, value.len())?;
        self.out.put_slice(value);
        self.current = number.as_u16();
        Ok(())
    }

    fn uint(&mut self, number: OptionNumber, value: Option<u32>) -> Result<()> {
        if let Some(value) = value {
            let (bytes, len) = option::encode_uint(value);
            self.put(number, &bytes[..len])?;
        }
        Ok(())
    }

    fn opaque(&mut self, number: OptionNumber, value: Option<&[u8]>) -> Result<()> {
        if let Some(value) = value {
            self.put(number, value)?;
        }
        Ok(())
    }

    fn empty(&mut self, number: OptionNumber, present: bool) -> Result<()> {
        if present {
            self.put(number, &[])?;
        }
        Ok(())
    }

    fn string(
        &mut self,
        number: OptionNumber,
        value: Option<&str>,
        separator: Option<char>,
    ) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        match separator {
            Some(separator) => {
                for segment in value.split(separator) {
                    self.put(number, segment.as_bytes())?;
                }
            }
            None => self.put(number, value.as_bytes())?,
        }
        Ok(())
    }
}

/// Parse a message from bytes
///
/// A piggybacked telemetry block is skipped and logged; use
/// [`parse_with_telemetry`] to keep it.
///
/// # Errors
///
/// Returns an error if:
/// - Buffer is shorter than the header or any declared field
/// - Version is not 1 or the token is longer than 8 bytes
/// - An unknown critical option or a proxy option is present
/// - A string option is not valid UTF-8
pub fn parse(bytes: &[u8]) -> Result<Message> {
    parse_with_telemetry(bytes).map(|(message, _)| message)
}

/// Parse a message from bytes, returning any piggybacked telemetry block
pub fn parse_with_telemetry(bytes: &[u8]) -> Result<(Message, Option<Bytes>)> {
    let result = read_message(bytes);
    match &result {
        Ok((message, telemetry)) => {
            Metrics::record_message(MessageDirection::Parsed, message.message_type());
            if telemetry.is_some() {
                Metrics::record_piggyback(PiggybackEvent::Received);
            }
            debug!(
                mid = message.message_id(),
                len = bytes.len(),
                payload_len = message.payload().len(),
                "parsed message"
            );
        }
        Err(err) => {
            Metrics::record_error(MessageDirection::Parsed);
            warn!(len = bytes.len(), error = %err, "rejecting malformed message");
        }
    }
    result
}

fn read_message(bytes: &[u8]) -> Result<(Message, Option<Bytes>)> {
    let header = MessageHeader::from_bytes(bytes)?;

    let mut pos = HEADER_SIZE;
    let token_len = usize::from(header.token_len());
    let token = bytes.get(pos..pos + token_len).ok_or(Error::Truncated {
        what: "token",
        offset: pos,
    })?;
    pos += token_len;

    let mut message = Message::new(header.message_type(), header.code(), header.message_id());
    message.set_raw_token(token);

    let mut number: u32 = 0;
    let mut telemetry = None;

    while let Some(&byte) = bytes.get(pos) {
        if byte & 0xF0 == 0xF0 {
            if byte == PIGGYBACK_MARKER {
                telemetry = Some(read_telemetry(bytes, &mut pos)?);
                continue;
            }
            // 0xFF, or a reserved 0xF_ value treated the same way
            pos += 1;
            let payload = &bytes[pos..];
            if payload.len() > MAX_CHUNK_SIZE {
                debug!(
                    len = payload.len(),
                    max = MAX_CHUNK_SIZE,
                    "truncating oversized payload"
                );
            }
            message.set_raw_payload(&payload[..payload.len().min(MAX_CHUNK_SIZE)]);
            break;
        }

        let header_offset = pos;
        pos += 1;
        let delta = option::read_extended(byte >> 4, bytes, &mut pos, "option delta", header_offset)?;
        let length = option::read_extended(
            byte & 0x0F,
            bytes,
            &mut pos,
            "option length",
            header_offset,
        )? as usize;

        let value = bytes.get(pos..pos + length).ok_or(Error::Truncated {
            what: "option value",
            offset: pos,
        })?;
        pos += length;

        number += delta;
        let option_number = u16::try_from(number)
            .map(OptionNumber::new)
            .map_err(|_| Error::OptionNumberOverflow {
                offset: header_offset,
            })?;

        message.decode_option(option_number, value)?;
    }

    Ok((message, telemetry))
}

fn read_telemetry(bytes: &[u8], pos: &mut usize) -> Result<Bytes> {
    let len_offset = *pos + 1;
    let len = usize::from(*bytes.get(len_offset).ok_or(Error::Truncated {
        what: "telemetry length",
        offset: len_offset,
    })?);
    let start = len_offset + 1;
    let block = bytes.get(start..start + len).ok_or(Error::Truncated {
        what: "telemetry block",
        offset: start,
    })?;
    *pos = start + len;
    debug!(len, "consumed piggybacked telemetry block");
    Ok(Bytes::copy_from_slice(block))
}

/// Number of fixed-size telemetry records that fit into one message payload
#[must_use]
pub fn records_per_message(record_size: usize) -> usize {
    if record_size == 0 {
        return 0;
    }
    MAX_CHUNK_SIZE.saturating_sub(RECORD_PACKING_OVERHEAD) / record_size
}
