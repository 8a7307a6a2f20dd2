//! Message codec error types

use thiserror::Error;

use super::Code;

/// Errors produced while building, serializing, or parsing messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer shorter than the fixed header
    #[error("message too short: need {needed} bytes, got {got}")]
    MessageTooShort {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Header carries a version other than 1
    #[error("unsupported version: {version}")]
    UnsupportedVersion {
        /// Version found in the header
        version: u8,
    },

    /// Token length nibble above the protocol maximum
    #[error("token length {len} exceeds maximum of 8")]
    TokenTooLong {
        /// Declared token length
        len: usize,
    },

    /// A field runs past the end of the buffer
    #[error("truncated {what} at offset {offset}")]
    Truncated {
        /// Field being read
        what: &'static str,
        /// Byte offset where the read was attempted
        offset: usize,
    },

    /// Option header uses the reserved nibble value 15
    #[error("reserved option nibble at offset {offset}")]
    ReservedNibble {
        /// Byte offset of the option header
        offset: usize,
    },

    /// Option value too long for the two-byte length extension
    #[error("option {number} value too long: {len} bytes")]
    OptionTooLong {
        /// Option number
        number: u16,
        /// Value length
        len: usize,
    },

    /// Accumulated option number no longer fits in 16 bits
    #[error("option number overflow at offset {offset}")]
    OptionNumberOverflow {
        /// Byte offset of the offending option header
        offset: usize,
    },

    /// Unknown critical (odd-numbered) option
    #[error("unsupported critical option {number}")]
    BadOption {
        /// Option number
        number: u16,
    },

    /// Proxy options are not handled on a constrained node
    #[error("proxying not supported (option {number})")]
    ProxyingNotSupported {
        /// Option number
        number: u16,
    },

    /// String option is not valid UTF-8
    #[error("option {number} is not valid UTF-8")]
    InvalidUtf8 {
        /// Option number
        number: u16,
    },

    /// Header region exceeds the serializer's maximum
    #[error("serialized header too large: {size} bytes (max {max})")]
    HeaderTooLarge {
        /// Header size that would have been written
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Block size outside 16..=2048 or not a power of two
    #[error("invalid block size: {size}")]
    InvalidBlockSize {
        /// Requested size
        size: u16,
    },

    /// Block number above the 20-bit limit
    #[error("invalid block number: {num}")]
    InvalidBlockNumber {
        /// Requested number
        num: u32,
    },
}

impl Error {
    /// Response code a server answers with when this error aborts request handling
    #[must_use]
    pub const fn response_code(&self) -> Code {
        match self {
            Self::BadOption { .. } => Code::BAD_OPTION,
            Self::ProxyingNotSupported { .. } => Code::PROXYING_NOT_SUPPORTED,
            Self::HeaderTooLarge { .. }
            | Self::InvalidBlockSize { .. }
            | Self::InvalidBlockNumber { .. } => Code::INTERNAL_SERVER_ERROR,
            _ => Code::BAD_REQUEST,
        }
    }

    /// Whether the error stems from malformed input rather than local misuse
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MessageTooShort { .. }
                | Self::UnsupportedVersion { .. }
                | Self::TokenTooLong { .. }
                | Self::Truncated { .. }
                | Self::ReservedNibble { .. }
                | Self::OptionNumberOverflow { .. }
                | Self::InvalidUtf8 { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
