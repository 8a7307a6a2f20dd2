//! Message types and codes

use std::fmt;

/// Message types carried in the two type bits of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageType {
    /// Confirmable
    Con = 0,
    /// Non-confirmable
    Non = 1,
    /// Acknowledgement
    Ack = 2,
    /// Reset
    Rst = 3,
}

impl MessageType {
    /// Convert from the two-bit wire value
    #[must_use]
    pub const fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Con,
            1 => Self::Non,
            2 => Self::Ack,
            _ => Self::Rst,
        }
    }

    /// Convert to the two-bit wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this type may carry a piggybacked telemetry block
    #[must_use]
    pub const fn carries_telemetry(self) -> bool {
        matches!(self, Self::Con | Self::Non)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Con => "CON",
            Self::Non => "NON",
            Self::Ack => "ACK",
            Self::Rst => "RST",
        };
        write!(f, "{name}")
    }
}

/// Method or response code (`class.detail`, 3 + 5 bits)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code(u8);

impl Code {
    /// Empty message
    pub const EMPTY: Self = Self(0);
    /// GET request
    pub const GET: Self = Self(1);
    /// POST request
    pub const POST: Self = Self(2);
    /// PUT request
    pub const PUT: Self = Self(3);
    /// DELETE request
    pub const DELETE: Self = Self(4);

    /// 2.01 Created
    pub const CREATED: Self = Self::response(2, 1);
    /// 2.02 Deleted
    pub const DELETED: Self = Self::response(2, 2);
    /// 2.03 Valid
    pub const VALID: Self = Self::response(2, 3);
    /// 2.04 Changed
    pub const CHANGED: Self = Self::response(2, 4);
    /// 2.05 Content
    pub const CONTENT: Self = Self::response(2, 5);
    /// 2.31 Continue
    pub const CONTINUE: Self = Self::response(2, 31);

    /// 4.00 Bad Request
    pub const BAD_REQUEST: Self = Self::response(4, 0);
    /// 4.01 Unauthorized
    pub const UNAUTHORIZED: Self = Self::response(4, 1);
    /// 4.02 Bad Option
    pub const BAD_OPTION: Self = Self::response(4, 2);
    /// 4.03 Forbidden
    pub const FORBIDDEN: Self = Self::response(4, 3);
    /// 4.04 Not Found
    pub const NOT_FOUND: Self = Self::response(4, 4);
    /// 4.05 Method Not Allowed
    pub const METHOD_NOT_ALLOWED: Self = Self::response(4, 5);
    /// 4.06 Not Acceptable
    pub const NOT_ACCEPTABLE: Self = Self::response(4, 6);
    /// 4.08 Request Entity Incomplete
    pub const REQUEST_ENTITY_INCOMPLETE: Self = Self::response(4, 8);
    /// 4.12 Precondition Failed
    pub const PRECONDITION_FAILED: Self = Self::response(4, 12);
    /// 4.13 Request Entity Too Large
    pub const REQUEST_ENTITY_TOO_LARGE: Self = Self::response(4, 13);
    /// 4.15 Unsupported Content-Format
    pub const UNSUPPORTED_MEDIA_TYPE: Self = Self::response(4, 15);

    /// 5.00 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: Self = Self::response(5, 0);
    /// 5.01 Not Implemented
    pub const NOT_IMPLEMENTED: Self = Self::response(5, 1);
    /// 5.02 Bad Gateway
    pub const BAD_GATEWAY: Self = Self::response(5, 2);
    /// 5.03 Service Unavailable
    pub const SERVICE_UNAVAILABLE: Self = Self::response(5, 3);
    /// 5.04 Gateway Timeout
    pub const GATEWAY_TIMEOUT: Self = Self::response(5, 4);
    /// 5.05 Proxying Not Supported
    pub const PROXYING_NOT_SUPPORTED: Self = Self::response(5, 5);

    const fn response(class: u8, detail: u8) -> Self {
        Self((class << 5) | (detail & 0x1F))
    }

    /// Create from raw byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        Self(value)
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Code class (upper 3 bits)
    #[must_use]
    pub const fn class(self) -> u8 {
        self.0 >> 5
    }

    /// Code detail (lower 5 bits)
    #[must_use]
    pub const fn detail(self) -> u8 {
        self.0 & 0x1F
    }

    /// Check if this is the empty code
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if this is a request method
    #[must_use]
    pub const fn is_request(self) -> bool {
        self.class() == 0 && self.0 != 0
    }

    /// Check if this is a response code
    #[must_use]
    pub const fn is_response(self) -> bool {
        self.class() >= 2
    }
}

impl From<u8> for Code {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::GET => write!(f, "GET"),
            Self::POST => write!(f, "POST"),
            Self::PUT => write!(f, "PUT"),
            Self::DELETE => write!(f, "DELETE"),
            _ => write!(f, "{}.{:02}", self.class(), self.detail()),
        }
    }
}
