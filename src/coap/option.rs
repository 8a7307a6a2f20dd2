//! Option numbers and the delta/length option header
//!
//! Every option starts with one byte holding a 4-bit delta (distance from the
//! previous option number) and a 4-bit value length. Nibble values 13 and 14
//! announce one or two extension bytes:
//!
//! ```text
//!   0   1   2   3   4   5   6   7
//! +---------------+---------------+
//! |  Option Delta | Option Length |   1 byte
//! +---------------+---------------+
//! /         Option Delta          /   0-2 bytes (nibble 13: value-13, 14: value-269)
//! +-------------------------------+
//! /         Option Length         /   0-2 bytes
//! +-------------------------------+
//! /         Option Value          /   0 or more bytes
//! +-------------------------------+
//! ```

use std::fmt;

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::{Error, Result};

const ONE_BYTE_EXTENSION: u32 = 13;
const TWO_BYTE_EXTENSION: u32 = 269;

/// Largest delta or length expressible with two extension bytes
pub(crate) const MAX_EXTENDED_VALUE: u32 = TWO_BYTE_EXTENSION + 0xFFFF;

/// Option number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptionNumber(u16);

/// How an option value is represented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionFormat {
    /// Zero-length option
    Empty,
    /// Big-endian unsigned integer, leading zero bytes stripped
    Uint,
    /// Raw bytes
    Opaque,
    /// UTF-8 text; repeated options joined with the separator, if any
    String(Option<char>),
}

impl OptionNumber {
    /// If-Match
    pub const IF_MATCH: Self = Self(1);
    /// Uri-Host
    pub const URI_HOST: Self = Self(3);
    /// ETag
    pub const ETAG: Self = Self(4);
    /// If-None-Match
    pub const IF_NONE_MATCH: Self = Self(5);
    /// Observe
    pub const OBSERVE: Self = Self(6);
    /// Uri-Port
    pub const URI_PORT: Self = Self(7);
    /// Location-Path
    pub const LOCATION_PATH: Self = Self(8);
    /// Uri-Path
    pub const URI_PATH: Self = Self(11);
    /// Content-Format
    pub const CONTENT_FORMAT: Self = Self(12);
    /// Max-Age
    pub const MAX_AGE: Self = Self(14);
    /// Uri-Query
    pub const URI_QUERY: Self = Self(15);
    /// Accept
    pub const ACCEPT: Self = Self(17);
    /// Location-Query
    pub const LOCATION_QUERY: Self = Self(20);
    /// Block2
    pub const BLOCK2: Self = Self(23);
    /// Block1
    pub const BLOCK1: Self = Self(27);
    /// Size2
    pub const SIZE2: Self = Self(28);
    /// Proxy-Uri
    pub const PROXY_URI: Self = Self(35);
    /// Proxy-Scheme
    pub const PROXY_SCHEME: Self = Self(39);
    /// Size1
    pub const SIZE1: Self = Self(60);

    /// Create from raw number
    #[must_use]
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// Raw option number
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Odd option numbers must be understood by the receiver
    #[must_use]
    pub const fn is_critical(self) -> bool {
        self.0 & 1 == 1
    }

    /// Whether the codec knows how to decode this option
    #[must_use]
    pub fn is_known(self) -> bool {
        self.format().is_some()
    }

    pub(crate) fn format(self) -> Option<OptionFormat> {
        let format = match self {
            Self::IF_NONE_MATCH => OptionFormat::Empty,
            Self::IF_MATCH | Self::ETAG => OptionFormat::Opaque,
            Self::URI_HOST | Self::PROXY_URI | Self::PROXY_SCHEME => OptionFormat::String(None),
            Self::LOCATION_PATH | Self::URI_PATH => OptionFormat::String(Some('/')),
            Self::URI_QUERY | Self::LOCATION_QUERY => OptionFormat::String(Some('&')),
            Self::OBSERVE
            | Self::URI_PORT
            | Self::CONTENT_FORMAT
            | Self::MAX_AGE
            | Self::ACCEPT
            | Self::BLOCK2
            | Self::BLOCK1
            | Self::SIZE2
            | Self::SIZE1 => OptionFormat::Uint,
            _ => return None,
        };
        Some(format)
    }

    /// Human readable option name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            1 => "If-Match",
            3 => "Uri-Host",
            4 => "ETag",
            5 => "If-None-Match",
            6 => "Observe",
            7 => "Uri-Port",
            8 => "Location-Path",
            11 => "Uri-Path",
            12 => "Content-Format",
            14 => "Max-Age",
            15 => "Uri-Query",
            17 => "Accept",
            20 => "Location-Query",
            23 => "Block2",
            27 => "Block1",
            28 => "Size2",
            35 => "Proxy-Uri",
            39 => "Proxy-Scheme",
            60 => "Size1",
            _ => "unknown",
        }
    }
}

impl fmt::Display for OptionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

const fn nibble(value: u32) -> u8 {
    if value < ONE_BYTE_EXTENSION {
        value as u8
    } else if value < TWO_BYTE_EXTENSION {
        13
    } else {
        14
    }
}

fn put_extension(out: &mut BytesMut, value: u32) {
    if value >= TWO_BYTE_EXTENSION {
        out.put_u16((value - TWO_BYTE_EXTENSION) as u16);
    } else if value >= ONE_BYTE_EXTENSION {
        out.put_u8((value - ONE_BYTE_EXTENSION) as u8);
    }
}

/// Number of bytes an option header with this delta and length occupies
#[must_use]
pub(crate) const fn header_len(delta: u32, length: u32) -> usize {
    const fn extension(value: u32) -> usize {
        if value >= TWO_BYTE_EXTENSION {
            2
        } else if value >= ONE_BYTE_EXTENSION {
            1
        } else {
            0
        }
    }
    1 + extension(delta) + extension(length)
}

/// Write an option header, returning the number of bytes written
pub(crate) fn put_header(
    out: &mut BytesMut,
    number: OptionNumber,
    delta: u32,
    length: usize,
) -> Result<usize> {
    let length = u32::try_from(length)
        .ok()
        .filter(|len| *len <= MAX_EXTENDED_VALUE)
        .ok_or(Error::OptionTooLong {
            number: number.as_u16(),
            len: length,
        })?;

    out.put_u8(nibble(delta) << 4 | nibble(length));
    put_extension(out, delta);
    put_extension(out, length);

    let written = header_len(delta, length);
    trace!(option = %number, delta, length, written, "option header");
    Ok(written)
}

/// Read the extension bytes for one nibble, advancing `pos`
pub(crate) fn read_extended(
    nibble: u8,
    bytes: &[u8],
    pos: &mut usize,
    what: &'static str,
    header_offset: usize,
) -> Result<u32> {
    match nibble {
        0..=12 => Ok(u32::from(nibble)),
        13 => {
            let byte = *bytes.get(*pos).ok_or(Error::Truncated {
                what,
                offset: *pos,
            })?;
            *pos += 1;
            Ok(ONE_BYTE_EXTENSION + u32::from(byte))
        }
        14 => {
            let pair = bytes.get(*pos..*pos + 2).ok_or(Error::Truncated {
                what,
                offset: *pos,
            })?;
            *pos += 2;
            Ok(TWO_BYTE_EXTENSION + u32::from(u16::from_be_bytes([pair[0], pair[1]])))
        }
        _ => Err(Error::ReservedNibble {
            offset: header_offset,
        }),
    }
}

/// Encode an integer option value with leading zero bytes stripped
#[must_use]
pub(crate) fn encode_uint(value: u32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let mut out = [0u8; 4];
    let len = 4 - skip;
    out[..len].copy_from_slice(&bytes[skip..]);
    (out, len)
}

/// Decode a big-endian integer option value; values longer than 4 bytes keep the low 32 bits
#[must_use]
pub(crate) fn decode_uint(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte))
}
