//! Builds this node's own telemetry record

use bytes::Bytes;
use tracing::{debug, trace};

use super::{NodeEnvironment, RecordLayout, SampleRecord, TelemetryHeader, TelemetryRecord};

const TIME_MASK: u64 = 0x0FFF;

/// Where the outgoing frame comes from, relative to this node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrafficOrigin {
    /// The local application generated the frame
    Originator,
    /// The frame is being relayed for another node
    Forwarder,
}

/// Produces records in the engine's layout
#[derive(Debug, Clone, Copy)]
pub struct RecordFactory {
    layout: RecordLayout,
}

impl RecordFactory {
    /// Factory for the given layout
    #[must_use]
    pub const fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }

    /// Configured layout
    #[must_use]
    pub const fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Record describing this node, or `None` when the bitmap does not select it
    ///
    /// Originators stamp the low twelve clock bits and report RSSI 0; forwarders
    /// stamp the low twelve slot-number bits and the last RSSI. The channel nibble
    /// is left zero for the receiver to fill in.
    pub fn produce<E: NodeEnvironment>(
        &self,
        env: &E,
        bitmap: u8,
        origin: TrafficOrigin,
    ) -> Option<TelemetryRecord> {
        let node_id = env.node_id();
        let selector = TelemetryHeader::fresh(0, 0, bitmap);
        if !selector.selects(node_id) {
            debug!(node_id, bitmap, "node not selected by bitmap");
            return None;
        }

        let record = match self.layout {
            RecordLayout::Sample => {
                let (time, rssi) = match origin {
                    TrafficOrigin::Originator => (u64::from(env.clock_now()), 0),
                    TrafficOrigin::Forwarder => (env.current_asn(), env.last_rssi()),
                };
                let slot = (time & TIME_MASK) as u16;
                TelemetryRecord::Sample(SampleRecord::new(node_id, 0, slot, rssi))
            }
            RecordLayout::Opaque { len } => {
                TelemetryRecord::Opaque(Bytes::from(vec![node_id as u8; len]))
            }
        };
        trace!(node_id, ?origin, ?record, "produced telemetry record");
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::SimEnvironment;

    fn env() -> SimEnvironment {
        let mut env = SimEnvironment::new(0x0107, 1);
        env.clock = 0x0001_2345;
        env.asn = 0x00AB_CDEF;
        env.last_rssi = -61;
        env
    }

    #[test]
    fn originator_uses_clock_and_zero_rssi() {
        let factory = RecordFactory::new(RecordLayout::Sample);
        let record = factory
            .produce(&env(), 0xFF, TrafficOrigin::Originator)
            .unwrap();
        let sample = record.as_sample().copied().unwrap();
        assert_eq!(sample.node_id, 0x0107);
        assert_eq!(sample.slot(), 0x345);
        assert_eq!(sample.channel(), 0);
        assert_eq!(sample.rssi, 0);
    }

    #[test]
    fn forwarder_uses_asn_and_last_rssi() {
        let factory = RecordFactory::new(RecordLayout::Sample);
        let record = factory
            .produce(&env(), 0xFF, TrafficOrigin::Forwarder)
            .unwrap();
        let sample = record.as_sample().copied().unwrap();
        assert_eq!(sample.slot(), 0xDEF);
        assert_eq!(sample.rssi, -61);
    }

    #[test]
    fn opaque_layout_repeats_node_id() {
        let factory = RecordFactory::new(RecordLayout::Opaque { len: 6 });
        let record = factory
            .produce(&env(), 0xFF, TrafficOrigin::Forwarder)
            .unwrap();
        assert_eq!(record, TelemetryRecord::Opaque(Bytes::from_static(&[7; 6])));
    }

    #[test]
    fn unselected_node_produces_nothing() {
        let factory = RecordFactory::new(RecordLayout::Sample);
        // node 0x0107 maps to bit 7
        assert!(factory
            .produce(&env(), 0x7F, TrafficOrigin::Forwarder)
            .is_none());
        assert!(factory
            .produce(&env(), 0x80, TrafficOrigin::Forwarder)
            .is_some());
    }
}
