//! Telemetry records
//!
//! A sample record is five bytes, little-endian:
//!
//! ```text
//! +---------+---------+-----------------------+------+
//! | node id (LE)      | channel:4 | slot:12 (LE) | rssi |
//! +---------+---------+-----------------------+------+
//! ```

use bytes::{BufMut, Bytes};

use super::{IntError, RecordLayout, Result, SAMPLE_RECORD_SIZE};

const SLOT_MASK: u16 = 0x0FFF;

/// Per-hop state: identity, time slot and signal strength
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleRecord {
    /// Reporting node
    pub node_id: u16,
    /// Channel in the top four bits, time slot in the low twelve
    pub channel_and_slot: u16,
    /// Last RSSI sample in dBm, 0 when the node originated the frame
    pub rssi: i8,
}

impl SampleRecord {
    /// Build a record from its parts; the slot keeps its low twelve bits
    #[must_use]
    pub const fn new(node_id: u16, channel: u8, slot: u16, rssi: i8) -> Self {
        Self {
            node_id,
            channel_and_slot: ((channel as u16 & 0x0F) << 12) | (slot & SLOT_MASK),
            rssi,
        }
    }

    /// Channel offset nibble
    #[must_use]
    pub const fn channel(&self) -> u8 {
        (self.channel_and_slot >> 12) as u8
    }

    /// Time slot (12 bits)
    #[must_use]
    pub const fn slot(&self) -> u16 {
        self.channel_and_slot & SLOT_MASK
    }

    /// Replace the channel nibble, keeping the slot
    pub fn set_channel(&mut self, channel: u8) {
        self.channel_and_slot = (u16::from(channel & 0x0F) << 12) | self.slot();
    }

    fn to_bytes(self) -> [u8; SAMPLE_RECORD_SIZE] {
        let node = self.node_id.to_le_bytes();
        let cs = self.channel_and_slot.to_le_bytes();
        [node[0], node[1], cs[0], cs[1], self.rssi.to_le_bytes()[0]]
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            node_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            channel_and_slot: u16::from_le_bytes([bytes[2], bytes[3]]),
            rssi: i8::from_le_bytes([bytes[4]]),
        }
    }
}

/// One telemetry record in the engine's configured layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TelemetryRecord {
    /// Structured per-hop sample
    Sample(SampleRecord),
    /// Fixed-size opaque filler
    Opaque(Bytes),
}

impl TelemetryRecord {
    /// Bytes this record occupies on the wire
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Sample(_) => SAMPLE_RECORD_SIZE,
            Self::Opaque(bytes) => bytes.len(),
        }
    }

    /// Whether the record is encoded with the given layout
    #[must_use]
    pub fn matches(&self, layout: RecordLayout) -> bool {
        match (self, layout) {
            (Self::Sample(_), RecordLayout::Sample) => true,
            (Self::Opaque(bytes), RecordLayout::Opaque { len }) => bytes.len() == len,
            _ => false,
        }
    }

    /// Sample view, if this is a structured record
    #[must_use]
    pub const fn as_sample(&self) -> Option<&SampleRecord> {
        match self {
            Self::Sample(sample) => Some(sample),
            Self::Opaque(_) => None,
        }
    }

    /// Append the wire form of the record
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        match self {
            Self::Sample(sample) => out.put_slice(&sample.to_bytes()),
            Self::Opaque(bytes) => out.put_slice(bytes),
        }
    }

    /// Wire form as an owned buffer, ready for a message piggyback
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Sample(sample) => Bytes::copy_from_slice(&sample.to_bytes()),
            Self::Opaque(bytes) => bytes.clone(),
        }
    }

    /// Decode exactly one record of the given layout
    pub fn decode(layout: RecordLayout, bytes: &[u8]) -> Result<Self> {
        let expected = layout.record_size();
        if bytes.len() != expected {
            return Err(IntError::LayoutMismatch {
                expected,
                got: bytes.len(),
            });
        }
        Ok(match layout {
            RecordLayout::Sample => Self::Sample(SampleRecord::from_bytes(bytes)),
            RecordLayout::Opaque { .. } => Self::Opaque(Bytes::copy_from_slice(bytes)),
        })
    }
}

impl From<SampleRecord> for TelemetryRecord {
    fn from(sample: SampleRecord) -> Self {
        Self::Sample(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_sample_wire_layout() {
        let record = TelemetryRecord::from(SampleRecord::new(0x0102, 0xA, 0x345, -70));
        let mut out = BytesMut::new();
        record.encode(&mut out);
        assert_eq!(&out[..], &[0x02, 0x01, 0x45, 0xA3, 0xBA]);
        assert_eq!(
            TelemetryRecord::decode(RecordLayout::Sample, &out).unwrap(),
            record
        );
    }

    #[test]
    fn test_to_bytes_matches_encode() {
        let sample = TelemetryRecord::from(SampleRecord::new(7, 3, 0x10, -42));
        let mut out = BytesMut::new();
        sample.encode(&mut out);
        assert_eq!(sample.to_bytes(), out.freeze());

        let opaque = TelemetryRecord::Opaque(Bytes::from_static(&[9; 8]));
        assert_eq!(opaque.to_bytes().len(), 8);
    }

    #[test]
    fn test_channel_and_slot_split() {
        let mut sample = SampleRecord::new(1, 0, 0x1FFF, 0);
        assert_eq!(sample.slot(), 0x0FFF);
        assert_eq!(sample.channel(), 0);
        sample.set_channel(11);
        assert_eq!(sample.channel(), 11);
        assert_eq!(sample.slot(), 0x0FFF);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(
            TelemetryRecord::decode(RecordLayout::Sample, &[1, 2, 3]),
            Err(IntError::LayoutMismatch {
                expected: 5,
                got: 3
            })
        );
        let opaque = TelemetryRecord::decode(RecordLayout::Opaque { len: 3 }, &[9, 9, 9]).unwrap();
        assert!(opaque.matches(RecordLayout::Opaque { len: 3 }));
        assert!(!opaque.matches(RecordLayout::Sample));
        assert_eq!(opaque.encoded_len(), 3);
    }
}
