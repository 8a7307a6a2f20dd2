//! IEEE 802.15.4e information elements carrying telemetry
//!
//! Every element starts with a little-endian 16-bit descriptor:
//!
//! ```text
//! Header IE:   | length:7 | element id:8 | type=0 |
//! Payload IE:  | length:11 | group id:4  | type=1 |
//! ```
//!
//! Telemetry travels as an IETF payload IE (group 0x5) whose content starts
//! with the telemetry sub-element id. It is preceded by header termination 1
//! and followed by payload termination.

use std::ops::Range;

use tracing::trace;

use super::{IntError, Result};

/// Header termination 1 (element id 0x7E, no content)
pub const HEADER_TERMINATION_1: [u8; 2] = [0x00, 0x3F];

/// Payload termination (group 0xF, no content)
pub const PAYLOAD_TERMINATION: [u8; 2] = [0x00, 0xF8];

/// Payload IE group used for telemetry
pub const IETF_GROUP_ID: u8 = 0x5;

const DESCRIPTOR_LEN: usize = 2;
const PAYLOAD_TYPE: u16 = 0x8000;
const HEADER_LEN_MASK: u16 = 0x007F;
const PAYLOAD_LEN_MASK: u16 = 0x07FF;
const HT1_ID: u8 = 0x7E;
const HT2_ID: u8 = 0x7F;
const PT_GROUP_ID: u8 = 0xF;

/// Descriptor of an IETF payload IE declaring `len` content bytes
pub fn ietf_descriptor(len: usize) -> Result<[u8; 2]> {
    let len = u16::try_from(len)
        .ok()
        .filter(|len| *len <= PAYLOAD_LEN_MASK)
        .ok_or(IntError::MalformedElement {
            offset: 0,
            reason: "element content exceeds 11-bit length",
        })?;
    Ok((PAYLOAD_TYPE | (u16::from(IETF_GROUP_ID) << 11) | len).to_le_bytes())
}

/// One decoded element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformationElement<'a> {
    /// Header IE
    Header {
        /// Element id
        element_id: u8,
        /// Content bytes
        content: &'a [u8],
    },
    /// Payload IE
    Payload {
        /// Group id
        group_id: u8,
        /// Content bytes
        content: &'a [u8],
    },
}

impl InformationElement<'_> {
    /// Whether this element closes the list
    #[must_use]
    pub const fn ends_list(&self) -> bool {
        match self {
            Self::Header { element_id, .. } => *element_id == HT2_ID,
            Self::Payload { group_id, .. } => *group_id == PT_GROUP_ID,
        }
    }

    /// Whether this element is header termination 1
    #[must_use]
    pub const fn is_header_termination(&self) -> bool {
        matches!(self, Self::Header { element_id, .. } if *element_id == HT1_ID)
    }
}

/// Walks an element list, yielding `(offset, element)` pairs
///
/// Stops after a list-ending element (payload termination or header
/// termination 2) or at the end of the input.
#[derive(Debug, Clone)]
pub struct ElementIter<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ElementIter<'a> {
    /// Iterate over the elements at the start of `bytes`
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            done: false,
        }
    }

    /// Bytes consumed so far
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    fn read(&mut self) -> Result<(usize, InformationElement<'a>)> {
        let offset = self.pos;
        let descriptor = self
            .bytes
            .get(offset..offset + DESCRIPTOR_LEN)
            .map(|d| u16::from_le_bytes([d[0], d[1]]))
            .ok_or(IntError::MalformedElement {
                offset,
                reason: "descriptor truncated",
            })?;

        let (len, element) = if descriptor & PAYLOAD_TYPE == 0 {
            let len = usize::from(descriptor & HEADER_LEN_MASK);
            let element_id = ((descriptor >> 7) & 0xFF) as u8;
            (len, Some(element_id))
        } else {
            (usize::from(descriptor & PAYLOAD_LEN_MASK), None)
        };

        let start = offset + DESCRIPTOR_LEN;
        let content = self
            .bytes
            .get(start..start + len)
            .ok_or(IntError::MalformedElement {
                offset,
                reason: "content runs past the frame",
            })?;
        self.pos = start + len;

        let element = match element {
            Some(element_id) => InformationElement::Header {
                element_id,
                content,
            },
            None => InformationElement::Payload {
                group_id: ((descriptor >> 11) & 0x0F) as u8,
                content,
            },
        };
        Ok((offset, element))
    }
}

impl<'a> Iterator for ElementIter<'a> {
    type Item = Result<(usize, InformationElement<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.bytes.len() {
            return None;
        }
        let item = self.read();
        match &item {
            Ok((_, element)) => self.done = element.ends_list(),
            Err(_) => self.done = true,
        }
        Some(item)
    }
}

/// Location of telemetry content inside an element list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryElement {
    /// Content range (starting at the sub-element id) relative to the list start
    pub content: Range<usize>,
    /// Bytes the whole element list occupies, terminators included
    pub list_len: usize,
}

/// Find the telemetry payload IE tagged with `subie_id`
///
/// The walk stops at the telemetry element. A payload termination IE directly
/// after it is counted into `list_len`; without one the frame payload follows.
pub fn find_telemetry(bytes: &[u8], subie_id: u8) -> Result<Option<TelemetryElement>> {
    for item in ElementIter::new(bytes) {
        let (offset, element) = item?;
        trace!(offset, ?element, "information element");
        if let InformationElement::Payload {
            group_id: IETF_GROUP_ID,
            content: body,
        } = element
        {
            if body.first() == Some(&subie_id) {
                let start = offset + DESCRIPTOR_LEN;
                let end = start + body.len();
                let terminated = bytes.get(end..end + PAYLOAD_TERMINATION.len())
                    == Some(&PAYLOAD_TERMINATION[..]);
                let list_len = if terminated {
                    end + PAYLOAD_TERMINATION.len()
                } else {
                    end
                };
                return Ok(Some(TelemetryElement {
                    content: start..end,
                    list_len,
                }));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_bytes() {
        let mut elements = ElementIter::new(&HEADER_TERMINATION_1);
        let (_, ht1) = elements.next().unwrap().unwrap();
        assert!(ht1.is_header_termination());
        assert!(!ht1.ends_list());

        let (_, pt) = ElementIter::new(&PAYLOAD_TERMINATION)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(
            pt,
            InformationElement::Payload {
                group_id: 0xF,
                content: &[]
            }
        );
        assert!(pt.ends_list());
    }

    #[test]
    fn test_ietf_descriptor_encoding() {
        assert_eq!(ietf_descriptor(9).unwrap(), [0x09, 0xA8]);
        assert_eq!(ietf_descriptor(0x123).unwrap(), [0x23, 0xA9]);
        assert!(ietf_descriptor(0x800).is_err());
    }

    #[test]
    fn test_find_telemetry_in_list() {
        let mut list = Vec::new();
        list.extend_from_slice(&HEADER_TERMINATION_1);
        list.extend_from_slice(&ietf_descriptor(4).unwrap());
        list.extend_from_slice(&[0x2A, 0xA0, 0x00, 0xFF]);
        list.extend_from_slice(&PAYLOAD_TERMINATION);
        list.extend_from_slice(b"payload");

        let found = find_telemetry(&list, 0x2A).unwrap().unwrap();
        assert_eq!(found.content, 4..8);
        assert_eq!(found.list_len, 10);
        assert_eq!(find_telemetry(&list, 0x2B).unwrap(), None);
    }

    #[test]
    fn test_find_telemetry_without_payload_termination() {
        let mut list = Vec::new();
        list.extend_from_slice(&HEADER_TERMINATION_1);
        list.extend_from_slice(&ietf_descriptor(4).unwrap());
        list.extend_from_slice(&[0x2A, 0xA0, 0x00, 0xFF]);
        list.extend_from_slice(b"hello");

        let found = find_telemetry(&list, 0x2A).unwrap().unwrap();
        assert_eq!(found.content, 4..8);
        assert_eq!(found.list_len, 8);
        assert_eq!(&list[found.list_len..], b"hello");
    }

    #[test]
    fn test_truncated_element_is_malformed() {
        let list = [0x00, 0x3F, 0x09, 0xA8, 0x2A];
        assert!(matches!(
            find_telemetry(&list, 0x2A),
            Err(IntError::MalformedElement { offset: 2, .. })
        ));
        assert!(matches!(
            find_telemetry(&[0x00], 0x2A),
            Err(IntError::MalformedElement { offset: 0, .. })
        ));
    }
}
