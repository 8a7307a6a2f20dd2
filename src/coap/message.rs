//! Message model with typed option accessors

use bytes::Bytes;
use tracing::trace;
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

use super::option::{OptionNumber, decode_uint};
use super::{
    Code, DEFAULT_MAX_AGE, Error, MAX_CHUNK_SIZE, MAX_ETAG_LEN, MAX_TOKEN_LEN, MessageType, Result,
};

const MIN_BLOCK_SIZE: u16 = 16;
const MAX_BLOCK_SIZE: u16 = 2048;
const MAX_BLOCK_NUM: u32 = 0x0F_FFFF;

/// Block-wise transfer descriptor (Block1 / Block2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    num: u32,
    more: bool,
    size: u16,
}

impl Block {
    /// Create a block descriptor, validating size and number
    pub fn new(num: u32, more: bool, size: u16) -> Result<Self> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&size) || !size.is_power_of_two() {
            return Err(Error::InvalidBlockSize { size });
        }
        if num > MAX_BLOCK_NUM {
            return Err(Error::InvalidBlockNumber { num });
        }
        Ok(Self { num, more, size })
    }

    /// Block number
    #[must_use]
    pub const fn num(&self) -> u32 {
        self.num
    }

    /// More blocks follow
    #[must_use]
    pub const fn more(&self) -> bool {
        self.more
    }

    /// Block size in bytes
    #[must_use]
    pub const fn size(&self) -> u16 {
        self.size
    }

    /// Byte offset of this block within the full body
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.num.saturating_mul(self.size as u32)
    }

    pub(crate) const fn to_value(self) -> u32 {
        let szx = self.size.trailing_zeros() - 4;
        (self.num << 4) | ((self.more as u32) << 3) | szx
    }

    pub(crate) const fn from_value(value: u32) -> Self {
        Self {
            num: value >> 4,
            more: value & 0x08 != 0,
            size: 16 << (value & 0x07),
        }
    }
}

/// Request/response message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    msg_type: MessageType,
    code: Code,
    message_id: u16,
    token: Bytes,
    pub(crate) if_match: Option<Bytes>,
    pub(crate) uri_host: Option<String>,
    pub(crate) etag: Option<Bytes>,
    pub(crate) if_none_match: bool,
    pub(crate) observe: Option<u32>,
    pub(crate) uri_port: Option<u16>,
    pub(crate) location_path: Option<String>,
    pub(crate) uri_path: Option<String>,
    pub(crate) content_format: Option<u16>,
    pub(crate) max_age: Option<u32>,
    pub(crate) uri_query: Option<String>,
    pub(crate) accept: Option<u16>,
    pub(crate) location_query: Option<String>,
    pub(crate) block2: Option<Block>,
    pub(crate) block1: Option<Block>,
    pub(crate) size2: Option<u32>,
    pub(crate) proxy_uri: Option<String>,
    pub(crate) proxy_scheme: Option<String>,
    pub(crate) size1: Option<u32>,
    payload: Bytes,
}

impl Message {
    /// Create a new message without token, options, or payload
    #[must_use]
    pub fn new(msg_type: MessageType, code: Code, message_id: u16) -> Self {
        Self {
            msg_type,
            code,
            message_id,
            token: Bytes::new(),
            if_match: None,
            uri_host: None,
            etag: None,
            if_none_match: false,
            observe: None,
            uri_port: None,
            location_path: None,
            uri_path: None,
            content_format: None,
            max_age: None,
            uri_query: None,
            accept: None,
            location_query: None,
            block2: None,
            block1: None,
            size2: None,
            proxy_uri: None,
            proxy_scheme: None,
            size1: None,
            payload: Bytes::new(),
        }
    }

    /// Get message type
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// Set message type
    pub fn set_message_type(&mut self, msg_type: MessageType) {
        self.msg_type = msg_type;
    }

    /// Get code
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Set method or response code
    pub fn set_code(&mut self, code: Code) {
        self.code = code;
    }

    /// Get message ID
    #[must_use]
    pub const fn message_id(&self) -> u16 {
        self.message_id
    }

    /// Set message ID
    pub fn set_message_id(&mut self, message_id: u16) {
        self.message_id = message_id;
    }

    /// Get token
    #[must_use]
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// Set token, keeping at most 8 bytes. Returns the stored length.
    pub fn set_token(&mut self, token: &[u8]) -> usize {
        let len = token.len().min(MAX_TOKEN_LEN);
        self.token = Bytes::copy_from_slice(&token[..len]);
        len
    }

    /// Get payload
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Set payload, keeping at most [`MAX_CHUNK_SIZE`] bytes. Returns the stored length.
    pub fn set_payload(&mut self, payload: impl Into<Bytes>) -> usize {
        let mut payload = payload.into();
        payload.truncate(MAX_CHUNK_SIZE);
        self.payload = payload;
        self.payload.len()
    }

    /// Check whether this is an empty message (code 0.00)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Check whether an option is present
    #[must_use]
    pub fn has_option(&self, number: OptionNumber) -> bool {
        match number {
            OptionNumber::IF_MATCH => self.if_match.is_some(),
            OptionNumber::URI_HOST => self.uri_host.is_some(),
            OptionNumber::ETAG => self.etag.is_some(),
            OptionNumber::IF_NONE_MATCH => self.if_none_match,
            OptionNumber::OBSERVE => self.observe.is_some(),
            OptionNumber::URI_PORT => self.uri_port.is_some(),
            OptionNumber::LOCATION_PATH => self.location_path.is_some(),
            OptionNumber::URI_PATH => self.uri_path.is_some(),
            OptionNumber::CONTENT_FORMAT => self.content_format.is_some(),
            OptionNumber::MAX_AGE => self.max_age.is_some(),
            OptionNumber::URI_QUERY => self.uri_query.is_some(),
            OptionNumber::ACCEPT => self.accept.is_some(),
            OptionNumber::LOCATION_QUERY => self.location_query.is_some(),
            OptionNumber::BLOCK2 => self.block2.is_some(),
            OptionNumber::BLOCK1 => self.block1.is_some(),
            OptionNumber::SIZE2 => self.size2.is_some(),
            OptionNumber::PROXY_URI => self.proxy_uri.is_some(),
            OptionNumber::PROXY_SCHEME => self.proxy_scheme.is_some(),
            OptionNumber::SIZE1 => self.size1.is_some(),
            _ => false,
        }
    }

    /// Get Content-Format
    #[must_use]
    pub const fn content_format(&self) -> Option<u16> {
        self.content_format
    }

    /// Set Content-Format
    pub fn set_content_format(&mut self, format: u16) {
        self.content_format = Some(format);
    }

    /// Get Accept
    #[must_use]
    pub const fn accept(&self) -> Option<u16> {
        self.accept
    }

    /// Set Accept
    pub fn set_accept(&mut self, format: u16) {
        self.accept = Some(format);
    }

    /// Get Max-Age, falling back to the protocol default when absent
    #[must_use]
    pub fn max_age(&self) -> u32 {
        self.max_age.unwrap_or(DEFAULT_MAX_AGE)
    }

    /// Set Max-Age
    pub fn set_max_age(&mut self, age: u32) {
        self.max_age = Some(age);
    }

    /// Get ETag
    #[must_use]
    pub fn etag(&self) -> Option<&[u8]> {
        self.etag.as_deref()
    }

    /// Set ETag, keeping at most 8 bytes. Returns the stored length.
    pub fn set_etag(&mut self, etag: &[u8]) -> usize {
        let stored = truncate_etag(etag);
        let len = stored.len();
        self.etag = Some(stored);
        len
    }

    /// Derive an 8-byte ETag from representation bytes
    pub fn set_etag_from(&mut self, representation: &[u8]) {
        let digest = xxh3_64(representation).to_be_bytes();
        self.etag = Some(Bytes::copy_from_slice(&digest));
    }

    /// Get If-Match
    #[must_use]
    pub fn if_match(&self) -> Option<&[u8]> {
        self.if_match.as_deref()
    }

    /// Set If-Match, keeping at most 8 bytes. Returns the stored length.
    pub fn set_if_match(&mut self, etag: &[u8]) -> usize {
        let stored = truncate_etag(etag);
        let len = stored.len();
        self.if_match = Some(stored);
        len
    }

    /// Whether If-None-Match is present
    #[must_use]
    pub const fn if_none_match(&self) -> bool {
        self.if_none_match
    }

    /// Set If-None-Match
    pub fn set_if_none_match(&mut self) {
        self.if_none_match = true;
    }

    /// Get Proxy-Uri
    #[must_use]
    pub fn proxy_uri(&self) -> Option<&str> {
        self.proxy_uri.as_deref()
    }

    /// Set Proxy-Uri
    pub fn set_proxy_uri(&mut self, uri: &str) -> usize {
        self.proxy_uri = Some(uri.to_owned());
        uri.len()
    }

    /// Get Proxy-Scheme
    #[must_use]
    pub fn proxy_scheme(&self) -> Option<&str> {
        self.proxy_scheme.as_deref()
    }

    /// Set Proxy-Scheme
    pub fn set_proxy_scheme(&mut self, scheme: &str) -> usize {
        self.proxy_scheme = Some(scheme.to_owned());
        scheme.len()
    }

    /// Get Uri-Host
    #[must_use]
    pub fn uri_host(&self) -> Option<&str> {
        self.uri_host.as_deref()
    }

    /// Set Uri-Host
    pub fn set_uri_host(&mut self, host: &str) -> usize {
        self.uri_host = Some(host.to_owned());
        host.len()
    }

    /// Get Uri-Port
    #[must_use]
    pub const fn uri_port(&self) -> Option<u16> {
        self.uri_port
    }

    /// Set Uri-Port
    pub fn set_uri_port(&mut self, port: u16) {
        self.uri_port = Some(port);
    }

    /// Get Uri-Path (segments joined with `/`)
    #[must_use]
    pub fn uri_path(&self) -> Option<&str> {
        self.uri_path.as_deref()
    }

    /// Set Uri-Path; leading slashes are dropped. Returns the stored length.
    pub fn set_uri_path(&mut self, path: &str) -> usize {
        let path = path.trim_start_matches('/');
        self.uri_path = Some(path.to_owned());
        path.len()
    }

    /// Get Uri-Query (terms joined with `&`)
    #[must_use]
    pub fn uri_query(&self) -> Option<&str> {
        self.uri_query.as_deref()
    }

    /// Set Uri-Query; leading question marks are dropped. Returns the stored length.
    pub fn set_uri_query(&mut self, query: &str) -> usize {
        let query = query.trim_start_matches('?');
        self.uri_query = Some(query.to_owned());
        query.len()
    }

    /// Get Location-Path
    #[must_use]
    pub fn location_path(&self) -> Option<&str> {
        self.location_path.as_deref()
    }

    /// Set Location-Path; a `?` splits off Location-Query. Returns the stored path length.
    pub fn set_location_path(&mut self, path: &str) -> usize {
        let path = path.trim_start_matches('/');
        let path = match path.split_once('?') {
            Some((path, query)) => {
                self.set_location_query(query);
                path
            }
            None => path,
        };
        if !path.is_empty() {
            self.location_path = Some(path.to_owned());
        }
        path.len()
    }

    /// Get Location-Query
    #[must_use]
    pub fn location_query(&self) -> Option<&str> {
        self.location_query.as_deref()
    }

    /// Set Location-Query; leading question marks are dropped. Returns the stored length.
    pub fn set_location_query(&mut self, query: &str) -> usize {
        let query = query.trim_start_matches('?');
        self.location_query = Some(query.to_owned());
        query.len()
    }

    /// Get Observe
    #[must_use]
    pub const fn observe(&self) -> Option<u32> {
        self.observe
    }

    /// Set Observe
    pub fn set_observe(&mut self, observe: u32) {
        self.observe = Some(observe);
    }

    /// Get Block2
    #[must_use]
    pub const fn block2(&self) -> Option<Block> {
        self.block2
    }

    /// Set Block2
    pub fn set_block2(&mut self, num: u32, more: bool, size: u16) -> Result<()> {
        self.block2 = Some(Block::new(num, more, size)?);
        Ok(())
    }

    /// Get Block1
    #[must_use]
    pub const fn block1(&self) -> Option<Block> {
        self.block1
    }

    /// Set Block1
    pub fn set_block1(&mut self, num: u32, more: bool, size: u16) -> Result<()> {
        self.block1 = Some(Block::new(num, more, size)?);
        Ok(())
    }

    /// Get Size2
    #[must_use]
    pub const fn size2(&self) -> Option<u32> {
        self.size2
    }

    /// Set Size2
    pub fn set_size2(&mut self, size: u32) {
        self.size2 = Some(size);
    }

    /// Get Size1
    #[must_use]
    pub const fn size1(&self) -> Option<u32> {
        self.size1
    }

    /// Set Size1
    pub fn set_size1(&mut self, size: u32) {
        self.size1 = Some(size);
    }

    /// Look up `name=value` in Uri-Query
    #[must_use]
    pub fn query_variable(&self, name: &str) -> Option<&str> {
        self.uri_query
            .as_deref()
            .and_then(|query| find_variable(query, name))
    }

    /// Look up `name=value` in a form-encoded payload
    #[must_use]
    pub fn post_variable(&self, name: &str) -> Option<&str> {
        std::str::from_utf8(&self.payload)
            .ok()
            .and_then(|body| find_variable(body, name))
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        super::serialize(self)
    }

    /// Parse from bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        super::parse(bytes)
    }

    pub(crate) fn set_raw_token(&mut self, token: &[u8]) {
        self.token = Bytes::copy_from_slice(token);
    }

    pub(crate) fn set_raw_payload(&mut self, payload: &[u8]) {
        self.payload = Bytes::copy_from_slice(payload);
    }

    /// Store one decoded option value; repeated multi-valued options are merged
    pub(crate) fn decode_option(&mut self, number: OptionNumber, value: &[u8]) -> Result<()> {
        match number {
            OptionNumber::CONTENT_FORMAT => {
                self.content_format = Some(saturating_u16(decode_uint(value)));
            }
            OptionNumber::MAX_AGE => self.max_age = Some(decode_uint(value)),
            OptionNumber::ETAG => self.etag = Some(truncate_etag(value)),
            OptionNumber::ACCEPT => self.accept = Some(saturating_u16(decode_uint(value))),
            OptionNumber::IF_MATCH => self.if_match = Some(truncate_etag(value)),
            OptionNumber::IF_NONE_MATCH => self.if_none_match = true,
            OptionNumber::PROXY_URI | OptionNumber::PROXY_SCHEME => {
                return Err(Error::ProxyingNotSupported {
                    number: number.as_u16(),
                });
            }
            OptionNumber::URI_HOST => self.uri_host = Some(utf8(number, value)?.to_owned()),
            OptionNumber::URI_PORT => self.uri_port = Some(saturating_u16(decode_uint(value))),
            OptionNumber::URI_PATH => merge(&mut self.uri_path, utf8(number, value)?, '/'),
            OptionNumber::URI_QUERY => merge(&mut self.uri_query, utf8(number, value)?, '&'),
            OptionNumber::LOCATION_PATH => {
                merge(&mut self.location_path, utf8(number, value)?, '/');
            }
            OptionNumber::LOCATION_QUERY => {
                merge(&mut self.location_query, utf8(number, value)?, '&');
            }
            OptionNumber::OBSERVE => self.observe = Some(decode_uint(value)),
            OptionNumber::BLOCK2 => self.block2 = Some(Block::from_value(decode_uint(value))),
            OptionNumber::BLOCK1 => self.block1 = Some(Block::from_value(decode_uint(value))),
            OptionNumber::SIZE2 => self.size2 = Some(decode_uint(value)),
            OptionNumber::SIZE1 => self.size1 = Some(decode_uint(value)),
            _ if number.is_critical() => {
                return Err(Error::BadOption {
                    number: number.as_u16(),
                });
            }
            _ => {
                trace!(option = number.as_u16(), "ignoring unknown elective option");
                return Ok(());
            }
        }
        trace!(option = %number, len = value.len(), "decoded option");
        Ok(())
    }
}

fn truncate_etag(value: &[u8]) -> Bytes {
    Bytes::copy_from_slice(&value[..value.len().min(MAX_ETAG_LEN)])
}

fn saturating_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn utf8(number: OptionNumber, value: &[u8]) -> Result<&str> {
    std::str::from_utf8(value).map_err(|_| Error::InvalidUtf8 {
        number: number.as_u16(),
    })
}

fn merge(target: &mut Option<String>, fragment: &str, separator: char) {
    match target {
        Some(existing) => {
            existing.push(separator);
            existing.push_str(fragment);
        }
        None => *target = Some(fragment.to_owned()),
    }
}

fn find_variable<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Message ID source: random start, incremented per message
#[derive(Debug, Clone)]
pub struct MessageIdGenerator {
    current: u16,
}

impl MessageIdGenerator {
    /// Create a generator starting at a random message ID
    #[must_use]
    pub fn new() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        Self::with_start(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Create a generator whose first issued ID is `start + 1`
    #[must_use]
    pub const fn with_start(start: u16) -> Self {
        Self { current: start }
    }

    /// Issue the next message ID
    pub fn next_id(&mut self) -> u16 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    /// Generate a random token of the maximum length
    #[must_use]
    pub fn random_token() -> [u8; MAX_TOKEN_LEN] {
        let bytes = Uuid::new_v4().into_bytes();
        let mut token = [0u8; MAX_TOKEN_LEN];
        token.copy_from_slice(&bytes[..MAX_TOKEN_LEN]);
        token
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
