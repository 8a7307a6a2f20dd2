//! Fixed message header
//!
//! The header is 4 bytes, big-endian on the wire.

use super::{Code, Error, HEADER_SIZE, MAX_TOKEN_LEN, MessageType, Result, VERSION};

const VERSION_MASK: u8 = 0xC0;
const VERSION_POSITION: u8 = 6;
const TYPE_MASK: u8 = 0x30;
const TYPE_POSITION: u8 = 4;
const TOKEN_LEN_MASK: u8 = 0x0F;

/// Message header (4 bytes)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Ver| T |  TKL  |      Code     |          Message ID           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    version: u8,
    msg_type: MessageType,
    token_len: u8,
    code: Code,
    message_id: u16,
}

impl MessageHeader {
    /// Create a new message header
    #[must_use]
    pub fn new(msg_type: MessageType, code: Code, message_id: u16, token_len: u8) -> Self {
        Self {
            version: VERSION,
            msg_type,
            token_len: token_len.min(MAX_TOKEN_LEN as u8),
            code,
            message_id,
        }
    }

    /// Get version
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Get message type
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// Get token length
    #[must_use]
    pub const fn token_len(&self) -> u8 {
        self.token_len
    }

    /// Get code
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Get message ID
    #[must_use]
    pub const fn message_id(&self) -> u16 {
        self.message_id
    }

    /// Validate header
    pub fn validate(&self) -> Result<()> {
        if self.version != VERSION {
            return Err(Error::UnsupportedVersion {
                version: self.version,
            });
        }

        if usize::from(self.token_len) > MAX_TOKEN_LEN {
            return Err(Error::TokenTooLong {
                len: usize::from(self.token_len),
            });
        }

        Ok(())
    }

    /// Convert to bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0] = (VERSION_MASK & (self.version << VERSION_POSITION))
            | (TYPE_MASK & (self.msg_type.as_u8() << TYPE_POSITION))
            | (TOKEN_LEN_MASK & self.token_len);
        bytes[1] = self.code.as_u8();
        bytes[2..4].copy_from_slice(&self.message_id.to_be_bytes());

        bytes
    }

    /// Parse from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::MessageTooShort {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        }

        let header = Self {
            version: (bytes[0] & VERSION_MASK) >> VERSION_POSITION,
            msg_type: MessageType::from_bits((bytes[0] & TYPE_MASK) >> TYPE_POSITION),
            token_len: bytes[0] & TOKEN_LEN_MASK,
            code: Code::from_u8(bytes[1]),
            message_id: u16::from_be_bytes([bytes[2], bytes[3]]),
        };

        header.validate()?;
        Ok(header)
    }
}

impl Default for MessageHeader {
    fn default() -> Self {
        Self::new(MessageType::Con, Code::EMPTY, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = MessageHeader::new(MessageType::Non, Code::CONTENT, 0xBEEF, 3);
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0x53, 0x45, 0xBE, 0xEF]);

        let decoded = MessageHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_invalid_version() {
        let result = MessageHeader::from_bytes(&[0x80, 0x01, 0x00, 0x01]);
        assert!(matches!(
            result,
            Err(Error::UnsupportedVersion { version: 2 })
        ));
    }

    #[test]
    fn test_token_too_long() {
        let result = MessageHeader::from_bytes(&[0x49, 0x01, 0x00, 0x01]);
        assert!(matches!(result, Err(Error::TokenTooLong { len: 9 })));
    }

    #[test]
    fn test_short_buffer() {
        let result = MessageHeader::from_bytes(&[0x40, 0x01]);
        assert!(matches!(
            result,
            Err(Error::MessageTooShort { needed: 4, got: 2 })
        ));
    }
}
