//! Link-layer frame buffer seen by the telemetry engine.
//!
//! The engine never parses link headers itself; it needs the frame length,
//! room to grow the header region towards the front, and the bytes that
//! follow the link header on receipt.

use bytes::Bytes;

/// Header room reserved in front of an outgoing frame (maximum PHY frame size).
pub const DEFAULT_HEADER_ROOM: usize = 127;

/// Kind of frame handed to the link layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameKind {
    /// Unicast data frame.
    Data,
    /// Broadcast frame.
    Broadcast,
    /// Routing protocol control message.
    RoutingControl,
    /// Schedule negotiation control message.
    ScheduleControl,
}

impl FrameKind {
    /// Only unicast data frames carry telemetry.
    #[must_use]
    pub const fn carries_telemetry(self) -> bool {
        matches!(self, Self::Data)
    }
}

/// Frame transport operations the engine relies on.
pub trait FrameBuffer {
    /// Link header plus everything queued behind it.
    fn frame_len(&self) -> usize;

    /// Kind of frame.
    fn kind(&self) -> FrameKind;

    /// Grow the header region by `len` bytes towards the front and return the
    /// new bytes, or `None` when there is no room.
    fn header_alloc(&mut self, len: usize) -> Option<&mut [u8]>;

    /// Bytes after the consumed region (element list, then payload).
    fn data(&self) -> &[u8];

    /// Move `len` bytes from the data region into the consumed header region.
    fn consume(&mut self, len: usize) -> bool;

    /// Whether the link header announces an element list.
    fn ie_list_present(&self) -> bool;

    /// Set the element-list flag of the link header.
    fn set_ie_list_present(&mut self, present: bool);

    /// Full frame bytes for capture tools, when the transport can provide them.
    fn snapshot(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Contiguous frame buffer with header room in front of the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketBuf {
    kind: FrameKind,
    link_header: Bytes,
    buf: Vec<u8>,
    hdr_start: usize,
    data_start: usize,
    ie_list_present: bool,
}

impl PacketBuf {
    /// Outgoing frame with [`DEFAULT_HEADER_ROOM`] bytes of header room.
    #[must_use]
    pub fn outgoing(kind: FrameKind, link_header: impl Into<Bytes>, payload: &[u8]) -> Self {
        Self::with_header_room(kind, link_header, payload, DEFAULT_HEADER_ROOM)
    }

    /// Outgoing frame with an explicit amount of header room.
    #[must_use]
    pub fn with_header_room(
        kind: FrameKind,
        link_header: impl Into<Bytes>,
        payload: &[u8],
        room: usize,
    ) -> Self {
        let mut buf = vec![0u8; room + payload.len()];
        buf[room..].copy_from_slice(payload);
        Self {
            kind,
            link_header: link_header.into(),
            buf,
            hdr_start: room,
            data_start: room,
            ie_list_present: false,
        }
    }

    /// Received frame: `body` is everything after the parsed link header.
    #[must_use]
    pub fn incoming(
        kind: FrameKind,
        link_header: impl Into<Bytes>,
        ie_list_present: bool,
        body: &[u8],
    ) -> Self {
        Self {
            kind,
            link_header: link_header.into(),
            buf: body.to_vec(),
            hdr_start: 0,
            data_start: 0,
            ie_list_present,
        }
    }

    /// Turn a transmitted frame into the frame its neighbour receives.
    #[must_use]
    pub fn into_received(self) -> Self {
        let body = self.body().to_vec();
        Self::incoming(self.kind, self.link_header, self.ie_list_present, &body)
    }

    /// Link header bytes.
    #[must_use]
    pub fn link_header(&self) -> &[u8] {
        &self.link_header
    }

    /// Header region written so far.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.buf[self.hdr_start..self.data_start]
    }

    /// Header region followed by data: the bytes after the link header.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.buf[self.hdr_start..]
    }

    /// Full frame as sent on air (link header, header region, data).
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.frame_len());
        wire.extend_from_slice(&self.link_header);
        wire.extend_from_slice(self.body());
        wire
    }

    /// Header room still available.
    #[must_use]
    pub const fn header_room(&self) -> usize {
        self.hdr_start
    }
}

impl FrameBuffer for PacketBuf {
    fn frame_len(&self) -> usize {
        self.link_header.len() + self.buf.len() - self.hdr_start
    }

    fn kind(&self) -> FrameKind {
        self.kind
    }

    fn header_alloc(&mut self, len: usize) -> Option<&mut [u8]> {
        let start = self.hdr_start.checked_sub(len)?;
        self.hdr_start = start;
        Some(&mut self.buf[start..start + len])
    }

    fn data(&self) -> &[u8] {
        &self.buf[self.data_start..]
    }

    fn consume(&mut self, len: usize) -> bool {
        if len > self.buf.len() - self.data_start {
            return false;
        }
        self.data_start += len;
        true
    }

    fn ie_list_present(&self) -> bool {
        self.ie_list_present
    }

    fn set_ie_list_present(&mut self, present: bool) {
        self.ie_list_present = present;
    }

    fn snapshot(&self) -> Option<Vec<u8>> {
        Some(self.to_wire())
    }
}
