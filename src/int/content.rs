//! Telemetry header and content
//!
//! ```text
//!   0         1         2          3
//! +---------+---------+----------+--------+------------------+
//! | subtype | control | sequence | bitmap | records (N*size) |
//! +---------+---------+----------+--------+------------------+
//! ```
//!
//! Control bits 0-1 are the overflow flag: set once a hop had to drop or skip
//! records because the frame budget ran out.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::{INT_HEADER_SIZE, IntError, OVERFLOW_MASK, RecordLayout, Result, TelemetryRecord};

/// Telemetry control byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlFlags(u8);

impl ControlFlags {
    /// Create from raw bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check the overflow flag
    #[must_use]
    pub const fn is_overflowed(self) -> bool {
        self.0 & OVERFLOW_MASK != 0
    }

    /// Set the overflow flag, keeping the other bits
    pub fn set_overflowed(&mut self) {
        self.0 |= OVERFLOW_MASK;
    }
}

/// Fixed four-byte telemetry header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryHeader {
    /// Sub-element tag
    pub subtype: u8,
    /// Control byte
    pub control: ControlFlags,
    /// Number of records admitted so far (wrapping)
    pub sequence: u8,
    /// Which nodes should report
    pub bitmap: u8,
}

impl TelemetryHeader {
    /// Header for a carrier created by this node
    #[must_use]
    pub const fn fresh(subtype: u8, control: u8, bitmap: u8) -> Self {
        Self {
            subtype,
            control: ControlFlags::from_bits(control),
            sequence: 0,
            bitmap,
        }
    }

    /// Whether the bitmap asks `node_id` to report (bit `node_id % 8`)
    #[must_use]
    pub const fn selects(&self, node_id: u16) -> bool {
        self.bitmap & (1 << (node_id % 8)) != 0
    }

    /// Wire form
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; INT_HEADER_SIZE] {
        [self.subtype, self.control.bits(), self.sequence, self.bitmap]
    }

    /// Parse the first four bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let [subtype, control, sequence, bitmap] = bytes
            .get(..INT_HEADER_SIZE)
            .and_then(|head| <[u8; INT_HEADER_SIZE]>::try_from(head).ok())
            .ok_or(IntError::MalformedElement {
                offset: 0,
                reason: "telemetry header truncated",
            })?;
        Ok(Self {
            subtype,
            control: ControlFlags::from_bits(control),
            sequence,
            bitmap,
        })
    }
}

/// Telemetry header plus the records it carries
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryContent {
    /// Header
    pub header: TelemetryHeader,
    /// Records, first hop first
    pub records: Vec<TelemetryRecord>,
}

impl TelemetryContent {
    /// Bytes the content occupies inside its element
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        INT_HEADER_SIZE
            + self
                .records
                .iter()
                .map(TelemetryRecord::encoded_len)
                .sum::<usize>()
    }

    /// Append the wire form
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_slice(&self.header.to_bytes());
        for record in &self.records {
            record.encode(out);
        }
    }

    /// Wire form as a new buffer
    #[must_use]
    pub fn to_bytes(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }

    /// Decode header and `(len - 4) / record_size` records
    pub fn decode(bytes: &[u8], layout: RecordLayout) -> Result<Self> {
        let header = TelemetryHeader::from_bytes(bytes)?;
        let size = layout.record_size();
        if size == 0 {
            return Err(IntError::LayoutMismatch {
                expected: 0,
                got: bytes.len() - INT_HEADER_SIZE,
            });
        }
        let body = &bytes[INT_HEADER_SIZE..];
        let chunks = body.chunks_exact(size);
        let trailing = chunks.remainder().len();
        let records = chunks
            .map(|chunk| TelemetryRecord::decode(layout, chunk))
            .collect::<Result<Vec<_>>>()?;
        if trailing > 0 {
            trace!(trailing, "ignoring partial trailing record");
        }
        Ok(Self { header, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::SampleRecord;

    #[test]
    fn test_overflow_flag_keeps_other_bits() {
        let mut control = ControlFlags::from_bits(0xA0);
        assert!(!control.is_overflowed());
        control.set_overflowed();
        assert!(control.is_overflowed());
        assert_eq!(control.bits(), 0xA3);
    }

    #[test]
    fn test_bitmap_selection() {
        let header = TelemetryHeader::fresh(0x2A, 0xA0, 0b0000_0100);
        assert!(header.selects(2));
        assert!(header.selects(10));
        assert!(!header.selects(3));
        assert!(TelemetryHeader::fresh(0x2A, 0xA0, 0xFF).selects(7));
    }

    #[test]
    fn test_content_roundtrip_with_trailing_bytes() {
        let content = TelemetryContent {
            header: TelemetryHeader::fresh(0x2A, 0xA0, 0xFF),
            records: vec![
                SampleRecord::new(1, 3, 100, -40).into(),
                SampleRecord::new(2, 3, 101, -55).into(),
            ],
        };
        let mut bytes = content.to_bytes();
        assert_eq!(bytes.len(), 14);
        assert_eq!(&bytes[..4], &[0x2A, 0xA0, 0x00, 0xFF]);
        bytes.extend_from_slice(&[0xEE, 0xEE]);
        assert_eq!(
            TelemetryContent::decode(&bytes, RecordLayout::Sample).unwrap(),
            content
        );
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            TelemetryContent::decode(&[0x2A, 0x00], RecordLayout::Sample),
            Err(IntError::MalformedElement { .. })
        ));
    }
}
