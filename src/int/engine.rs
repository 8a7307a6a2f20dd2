//! Telemetry engine: budget-driven admission, frame embedding and extraction.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, instrument, trace, warn};

use crate::coap::{self, Message};

#[cfg(feature = "debug-tools")]
use super::debug::PcapRecorder;
use super::{
    BudgetDecision, BudgetEngine, CarrierLoad, CarrierState, FrameBuffer, HEADER_TERMINATION_1,
    IntConfig, IntError, IntStats, NodeEnvironment, PAYLOAD_TERMINATION, RecordFactory,
    RecordStore, Result, SamplingPolicy, TelemetryContent, TelemetryHeader, TelemetryRecord,
    TrafficOrigin, admission_percent, find_telemetry, ietf_descriptor,
};

/// Percent scale for probabilistic admission draws
const DRAW_RANGE: u32 = 100;

/// What one budget decision did to the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// No carrier exists and none could be created.
    NoCarrier,
    /// The carrier was freed; not even its header fits.
    Discarded,
    /// Carried records were dropped; header kept with overflow set.
    Truncated {
        /// Records dropped.
        dropped: usize,
    },
    /// Carrier kept unchanged apart from possibly the overflow flag.
    Held {
        /// The overflow flag was set by this decision.
        overflow_set: bool,
    },
    /// This node's record was added.
    Admitted {
        /// Sequence number after the addition.
        sequence: u8,
    },
    /// Room was available but the sampling draw declined it.
    SampledOut,
    /// Room was available but the bitmap does not select this node.
    NotSelected,
    /// Room was available but the carrier pool is full.
    PoolExhausted,
}

/// Per-node telemetry engine.
///
/// Owns the carrier, the record pools and the counters. The link layer calls
/// [`prepare_outgoing`](Self::prepare_outgoing) for every frame it is about to
/// send and [`on_frame_received`](Self::on_frame_received) for every frame it
/// accepts; the application drains telemetry with
/// [`next_telemetry`](Self::next_telemetry).
#[derive(Debug)]
pub struct IntEngine<E> {
    config: IntConfig,
    env: E,
    budget: BudgetEngine,
    factory: RecordFactory,
    store: RecordStore,
    carrier: Option<TelemetryHeader>,
    stats: IntStats,
    #[cfg(feature = "debug-tools")]
    recorder: Option<PcapRecorder>,
}

impl<E: NodeEnvironment> IntEngine<E> {
    /// Build an engine after validating `config`.
    pub fn new(config: IntConfig, env: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            budget: BudgetEngine::new(&config),
            factory: RecordFactory::new(config.layout),
            store: RecordStore::new(config.carrier_capacity, config.consumption_capacity),
            carrier: None,
            stats: IntStats::default(),
            #[cfg(feature = "debug-tools")]
            recorder: None,
            config,
            env,
        })
    }

    /// Record describing this node, if `bitmap` selects it.
    #[must_use]
    pub fn produce_record(&self, bitmap: u8, origin: TrafficOrigin) -> Option<TelemetryRecord> {
        self.factory.produce(&self.env, bitmap, origin)
    }

    /// Apply the budget to an outgoing frame of `frame_len` bytes.
    ///
    /// Creates, trims, flags or extends the carrier as the budget allows. An
    /// originating node always starts from a fresh carrier.
    #[instrument(level = "debug", skip(self), fields(node_id = self.env.node_id()))]
    pub fn budget_decide_and_admit(
        &mut self,
        frame_len: usize,
        origin: TrafficOrigin,
    ) -> AdmissionOutcome {
        if origin == TrafficOrigin::Originator && self.carrier.is_some() {
            debug!("originating traffic, resetting carrier");
            self.free_carrier();
        }

        let decision = match self.budget.evaluate(frame_len, self.load()) {
            BudgetDecision::Initialize => {
                self.carrier = Some(TelemetryHeader::fresh(
                    self.config.subie_id,
                    self.config.initial_control,
                    self.config.default_bitmap,
                ));
                self.stats.carriers_created += 1;
                debug!(frame_len, "carrier created");
                self.budget.evaluate(frame_len, self.load())
            }
            decision => decision,
        };

        match decision {
            // a second Initialize cannot happen once a carrier exists
            BudgetDecision::Skip | BudgetDecision::Initialize => {
                warn!(
                    frame_len,
                    needed = self.budget.init_cost(),
                    budget = self.budget.budget(),
                    "no room to initialize telemetry"
                );
                AdmissionOutcome::NoCarrier
            }
            BudgetDecision::Discard => {
                warn!(
                    frame_len,
                    needed = self.budget.init_cost(),
                    budget = self.budget.budget(),
                    "no room for carried telemetry header, carrier removed"
                );
                self.free_carrier();
                self.stats.carriers_discarded += 1;
                AdmissionOutcome::Discarded
            }
            BudgetDecision::Truncate => {
                let dropped = self.store.clear_carrier();
                self.stats.records_dropped += dropped as u64;
                self.set_overflow();
                warn!(frame_len, dropped, "no room for carried records, header kept");
                AdmissionOutcome::Truncated { dropped }
            }
            BudgetDecision::Hold { overflow } => {
                if overflow {
                    self.set_overflow();
                    warn!(
                        frame_len,
                        records = self.store.carrier_len(),
                        "no room for a new record, overflow set"
                    );
                } else {
                    debug!("carrier overflowed, forwarding as received");
                }
                AdmissionOutcome::Held {
                    overflow_set: overflow,
                }
            }
            BudgetDecision::Admit { remaining_slots } => self.admit(remaining_slots, origin),
        }
    }

    fn admit(&mut self, remaining_slots: usize, origin: TrafficOrigin) -> AdmissionOutcome {
        if self.config.sampling == SamplingPolicy::RootDistanceWeighted {
            if !self.env.is_reachable() {
                debug!("root unreachable, record not sampled");
                self.stats.records_sampled_out += 1;
                return AdmissionOutcome::SampledOut;
            }
            let threshold = admission_percent(remaining_slots, self.env.root_distance());
            let draw = self.env.random_below(DRAW_RANGE);
            if u64::from(draw) >= threshold {
                trace!(draw, threshold, remaining_slots, "record sampled out");
                self.stats.records_sampled_out += 1;
                return AdmissionOutcome::SampledOut;
            }
            trace!(draw, threshold, remaining_slots, "record sampled in");
        }

        let Some(header) = self.carrier.as_mut() else {
            return AdmissionOutcome::NoCarrier;
        };
        let Some(record) = self.factory.produce(&self.env, header.bitmap, origin) else {
            self.stats.records_not_selected += 1;
            return AdmissionOutcome::NotSelected;
        };
        if self.store.push_carrier(record).is_err() {
            self.stats.pool_exhaustions += 1;
            return AdmissionOutcome::PoolExhausted;
        }

        header.sequence = header.sequence.wrapping_add(1);
        self.stats.records_admitted += 1;
        debug!(
            sequence = header.sequence,
            records = self.store.carrier_len(),
            "record admitted"
        );
        AdmissionOutcome::Admitted {
            sequence: header.sequence,
        }
    }

    /// Write the carrier into the frame's header region and free it.
    ///
    /// The carrier is freed whether or not the write succeeds. Returns the
    /// number of bytes added to the frame.
    #[instrument(level = "debug", skip(self, frame), fields(node_id = self.env.node_id()))]
    pub fn embed_into_frame<F: FrameBuffer>(&mut self, frame: &mut F) -> Result<usize> {
        let Some(header) = self.carrier.take() else {
            warn!("no carrier to embed");
            return Err(IntError::NoCarrier);
        };
        let content = TelemetryContent {
            header,
            records: self.store.drain_carrier(),
        };

        match write_elements(frame, &content) {
            Ok(written) => {
                frame.set_ie_list_present(true);
                self.stats.frames_embedded += 1;
                self.stats.telemetry_bytes_sent += written as u64;
                debug!(
                    written,
                    records = content.records.len(),
                    sequence = content.header.sequence,
                    "telemetry embedded"
                );
                Ok(written)
            }
            Err(err) => {
                self.stats.embed_failures += 1;
                warn!(error = %err, "embedding failed, carrier dropped");
                Err(err)
            }
        }
    }

    /// Strip the telemetry elements from a received frame.
    ///
    /// Records go to the consumption queue. When the frame travels further
    /// (`destined_here == false`) and no carrier exists yet, the received
    /// telemetry becomes this node's carrier.
    #[instrument(level = "debug", skip(self, frame), fields(node_id = self.env.node_id()))]
    pub fn extract_from_frame<F: FrameBuffer>(
        &mut self,
        frame: &mut F,
        destined_here: bool,
    ) -> Result<Option<TelemetryContent>> {
        if !frame.ie_list_present() {
            trace!("no element list in frame");
            return Ok(None);
        }

        let layout = self.config.layout;
        let decoded = find_telemetry(frame.data(), self.config.subie_id).and_then(|found| {
            let Some(element) = found else {
                return Ok(None);
            };
            let list_len = element.list_len;
            TelemetryContent::decode(&frame.data()[element.content], layout)
                .map(|content| Some((content, list_len)))
        });
        let (mut content, list_len) = match decoded {
            Ok(Some(found)) => found,
            Ok(None) => {
                debug!("element list without telemetry");
                return Ok(None);
            }
            Err(err) => {
                self.stats.malformed_frames += 1;
                return Err(err);
            }
        };

        frame.consume(list_len);
        frame.set_ie_list_present(false);

        let channel = self.env.current_channel();
        for record in &mut content.records {
            if let TelemetryRecord::Sample(sample) = record {
                if sample.channel() == 0 {
                    sample.set_channel(channel);
                }
            }
        }

        self.stats.records_received += content.records.len() as u64;
        for record in &content.records {
            if self.store.push_consumption(record.clone()).is_err() {
                self.stats.pool_exhaustions += 1;
            }
        }
        debug!(
            records = content.records.len(),
            sequence = content.header.sequence,
            overflowed = content.header.control.is_overflowed(),
            "telemetry extracted"
        );

        if !destined_here {
            self.carry(&content);
        }
        Ok(Some(content))
    }

    fn carry(&mut self, content: &TelemetryContent) {
        if self.carrier.is_some() {
            debug!("already carrying telemetry, received content not merged");
            return;
        }
        let mut header = content.header;
        for record in &content.records {
            if self.store.push_carrier(record.clone()).is_err() {
                self.stats.pool_exhaustions += 1;
                if !header.control.is_overflowed() {
                    header.control.set_overflowed();
                    self.stats.overflow_events += 1;
                }
                break;
            }
        }
        self.carrier = Some(header);
        self.stats.carriers_received += 1;
        trace!(records = self.store.carrier_len(), "carrying received telemetry");
    }

    /// Link-layer output hook: filter, budget, embed.
    ///
    /// Frames other than unicast data pass through untouched. Failures only
    /// cost the telemetry; the frame itself is always left sendable. Returns
    /// the number of telemetry bytes added.
    pub fn prepare_outgoing<F: FrameBuffer>(&mut self, frame: &mut F, origin: TrafficOrigin) -> usize {
        self.stats.frames_seen += 1;
        if !frame.kind().carries_telemetry() {
            trace!(kind = ?frame.kind(), "frame passed through without telemetry");
            self.stats.frames_passed_through += 1;
            self.capture(frame);
            return 0;
        }

        let outcome = self.budget_decide_and_admit(frame.frame_len(), origin);
        trace!(?outcome, "budget applied");
        let written = if self.carrier.is_some() {
            self.embed_into_frame(frame).unwrap_or(0)
        } else {
            0
        };
        self.capture(frame);
        written
    }

    /// Link-layer input hook; malformed telemetry is logged and dropped.
    pub fn on_frame_received<F: FrameBuffer>(
        &mut self,
        frame: &mut F,
        destined_here: bool,
    ) -> Option<TelemetryContent> {
        self.capture(frame);
        match self.extract_from_frame(frame, destined_here) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "dropping malformed telemetry");
                None
            }
        }
    }

    /// Most recently received record, for the application.
    pub fn next_telemetry(&mut self) -> Option<TelemetryRecord> {
        let record = self.store.pop_consumption()?;
        self.stats.records_consumed += 1;
        Some(record)
    }

    /// Encode up to `max_records` received records, newest first, into one
    /// block for a message-level piggyback. Nothing is removed; call
    /// [`commit_telemetry`](Self::commit_telemetry) once the block was sent.
    #[must_use]
    pub fn telemetry_block(&self, max_records: usize) -> Bytes {
        let mut out = BytesMut::with_capacity(max_records * self.config.record_size());
        for record in self.store.consumption_records().take(max_records) {
            record.encode(&mut out);
        }
        out.freeze()
    }

    /// Remove the `count` newest received records after they left in a
    /// piggyback. Returns how many were removed.
    pub fn commit_telemetry(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count && self.next_telemetry().is_some() {
            removed += 1;
        }
        removed
    }

    /// Serialize `message` with as many received records piggybacked as its
    /// remaining room allows. Records that did not fit stay queued.
    pub fn serialize_with_pending(&mut self, message: &Message) -> coap::Result<Vec<u8>> {
        let record_size = self.config.record_size();
        let room = coap::telemetry_room(message) / record_size;
        let block = self.telemetry_block(room.min(coap::records_per_message(record_size)));
        if block.is_empty() {
            if self.pending_telemetry() > 0 {
                debug!(
                    pending = self.pending_telemetry(),
                    payload_len = message.payload().len(),
                    "no room for piggyback, records stay queued"
                );
            }
            return coap::serialize(message);
        }

        let bytes = coap::serialize_with_telemetry(message, &block)?;
        let sent = self.commit_telemetry(block.len() / record_size);
        debug!(sent, pending = self.pending_telemetry(), "records piggybacked");
        Ok(bytes)
    }

    /// Current carrier state.
    #[must_use]
    pub fn state(&self) -> CarrierState {
        match &self.carrier {
            None => CarrierState::Empty,
            Some(header) if header.control.is_overflowed() => CarrierState::Overflowed,
            Some(_) => CarrierState::Active,
        }
    }

    /// Carrier header, if a carrier exists.
    #[must_use]
    pub fn carrier(&self) -> Option<&TelemetryHeader> {
        self.carrier.as_ref()
    }

    /// Records currently carried, head first.
    pub fn carrier_records(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.store.carrier_records()
    }

    /// Records waiting for the application.
    #[must_use]
    pub fn pending_telemetry(&self) -> usize {
        self.store.consumption_len()
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &IntStats {
        &self.stats
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &IntConfig {
        &self.config
    }

    /// Node environment.
    #[must_use]
    pub const fn env(&self) -> &E {
        &self.env
    }

    /// Node environment, mutably.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Capture every frame this engine handles.
    #[cfg(feature = "debug-tools")]
    pub fn set_recorder(&mut self, recorder: PcapRecorder) {
        self.recorder = Some(recorder);
    }

    #[cfg(feature = "debug-tools")]
    fn capture<F: FrameBuffer>(&self, frame: &F) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        if let Some(bytes) = frame.snapshot() {
            if let Err(err) = recorder.record(&bytes) {
                warn!(error = %err, "frame capture failed");
            }
        }
    }

    #[cfg(not(feature = "debug-tools"))]
    #[allow(clippy::unused_self)]
    fn capture<F: FrameBuffer>(&self, _frame: &F) {}

    fn load(&self) -> Option<CarrierLoad> {
        self.carrier.map(|header| CarrierLoad {
            records: self.store.carrier_len(),
            overflowed: header.control.is_overflowed(),
        })
    }

    fn set_overflow(&mut self) {
        if let Some(header) = self.carrier.as_mut() {
            header.control.set_overflowed();
            self.stats.overflow_events += 1;
        }
    }

    fn free_carrier(&mut self) {
        self.carrier = None;
        let freed = self.store.clear_carrier();
        trace!(freed, "carrier freed");
    }
}

/// Header termination, IETF descriptor, content, payload termination, in one
/// header allocation so a failure leaves the frame untouched.
fn write_elements<F: FrameBuffer>(frame: &mut F, content: &TelemetryContent) -> Result<usize> {
    let content_len = content.encoded_len();
    let descriptor = ietf_descriptor(content_len)?;
    let total = HEADER_TERMINATION_1.len() + descriptor.len() + content_len + PAYLOAD_TERMINATION.len();

    let mut region = frame
        .header_alloc(total)
        .ok_or(IntError::HeaderAllocation { needed: total })?;
    region.put_slice(&HEADER_TERMINATION_1);
    region.put_slice(&descriptor);
    content.encode(&mut region);
    region.put_slice(&PAYLOAD_TERMINATION);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::{
        DEFAULT_SUBIE_ID, FrameKind, PacketBuf, RecordLayout, SampleRecord, SimEnvironment,
    };

    const LINK_HEADER: usize = 21;

    fn engine(node_id: u16) -> IntEngine<SimEnvironment> {
        IntEngine::new(IntConfig::default(), SimEnvironment::new(node_id, 7)).unwrap()
    }

    fn data_frame(payload: &[u8]) -> PacketBuf {
        PacketBuf::outgoing(FrameKind::Data, vec![0u8; LINK_HEADER], payload)
    }

    #[test]
    fn test_originator_embeds_fresh_carrier() {
        let mut node = engine(7);
        let mut frame = data_frame(b"0123456789");

        let written = node.prepare_outgoing(&mut frame, TrafficOrigin::Originator);

        assert_eq!(written, 15);
        assert_eq!(
            frame.header(),
            &[
                0x00, 0x3F, // HT1
                0x09, 0xA8, // IETF payload IE, 9 bytes
                0x2A, 0xA0, 0x01, 0xFF, // subtype, control, sequence, bitmap
                0x07, 0x00, 0x00, 0x00, 0x00, // node 7, slot 0, rssi 0
                0x00, 0xF8, // PT
            ]
        );
        assert!(frame.ie_list_present());
        assert_eq!(node.state(), CarrierState::Empty);
        assert_eq!(node.stats().carriers_created, 1);
        assert_eq!(node.stats().telemetry_bytes_sent, 15);
    }

    #[test]
    fn test_non_data_frames_pass_through() {
        let mut node = engine(7);
        let mut frame = PacketBuf::outgoing(FrameKind::Broadcast, vec![0u8; 10], b"eb");
        assert_eq!(node.prepare_outgoing(&mut frame, TrafficOrigin::Originator), 0);
        assert!(frame.header().is_empty());
        assert_eq!(node.stats().frames_passed_through, 1);
        assert_eq!(node.state(), CarrierState::Empty);
    }

    #[test]
    fn test_forwarder_extends_received_carrier() {
        let mut source = engine(2);
        let mut frame = data_frame(b"temp=21");
        source.prepare_outgoing(&mut frame, TrafficOrigin::Originator);

        let mut relay = engine(3);
        relay.env_mut().channel = 11;
        relay.env_mut().last_rssi = -48;
        relay.env_mut().asn = 0x1234;
        let mut received = frame.into_received();
        let content = relay.on_frame_received(&mut received, false).unwrap();

        assert_eq!(received.data(), b"temp=21");
        assert_eq!(content.records.len(), 1);
        let first = content.records[0].as_sample().copied().unwrap();
        assert_eq!(first.node_id, 2);
        assert_eq!(first.channel(), 11);
        assert_eq!(relay.state(), CarrierState::Active);
        assert_eq!(relay.pending_telemetry(), 1);

        let mut next = data_frame(received.data());
        relay.prepare_outgoing(&mut next, TrafficOrigin::Forwarder);
        let mut at_root = next.into_received();
        let mut root = engine(1);
        let content = root.on_frame_received(&mut at_root, true).unwrap();

        assert_eq!(content.header.sequence, 2);
        let ids: Vec<_> = content
            .records
            .iter()
            .filter_map(|r| r.as_sample().map(|s| s.node_id))
            .collect();
        assert_eq!(ids, vec![2, 3]);
        let hop = content.records[1].as_sample().copied().unwrap();
        assert_eq!(hop.slot(), 0x234);
        assert_eq!(hop.rssi, -48);
        assert_eq!(root.state(), CarrierState::Empty);
        assert_eq!(root.pending_telemetry(), 2);
    }

    #[test]
    fn test_existing_carrier_is_not_merged() {
        let mut a = engine(2);
        let mut b = engine(4);
        let mut relay = engine(3);

        let mut first = data_frame(b"a");
        a.prepare_outgoing(&mut first, TrafficOrigin::Originator);
        let mut second = data_frame(b"b");
        b.prepare_outgoing(&mut second, TrafficOrigin::Originator);

        relay.on_frame_received(&mut first.into_received(), false);
        relay.on_frame_received(&mut second.into_received(), false);

        let carried: Vec<_> = relay
            .carrier_records()
            .filter_map(|r| r.as_sample().map(|s| s.node_id))
            .collect();
        assert_eq!(carried, vec![2]);
        assert_eq!(relay.pending_telemetry(), 2);
        assert_eq!(
            relay.next_telemetry().and_then(|r| r.as_sample().map(|s| s.node_id)),
            Some(4)
        );
    }

    #[test]
    fn test_embed_without_carrier() {
        let mut node = engine(7);
        let mut frame = data_frame(b"x");
        assert_eq!(node.embed_into_frame(&mut frame), Err(IntError::NoCarrier));
    }

    #[test]
    fn test_header_allocation_failure_keeps_frame_sendable() {
        let mut node = engine(7);
        let mut frame = PacketBuf::with_header_room(FrameKind::Data, vec![0u8; 5], b"data", 8);

        assert_eq!(node.prepare_outgoing(&mut frame, TrafficOrigin::Originator), 0);
        assert!(frame.header().is_empty());
        assert!(!frame.ie_list_present());
        assert_eq!(node.state(), CarrierState::Empty);
        assert_eq!(node.stats().embed_failures, 1);
    }

    #[test]
    fn test_malformed_element_list() {
        let mut node = engine(7);
        let mut frame = PacketBuf::incoming(FrameKind::Data, Bytes::new(), true, &[0x00, 0x3F, 0x09]);
        assert!(node.on_frame_received(&mut frame, false).is_none());
        assert_eq!(node.stats().malformed_frames, 1);
        assert_eq!(node.state(), CarrierState::Empty);
    }

    #[test]
    fn test_frame_without_element_list_is_ignored() {
        let mut node = engine(7);
        let mut frame = PacketBuf::incoming(FrameKind::Data, Bytes::new(), false, b"plain");
        assert_eq!(node.extract_from_frame(&mut frame, false), Ok(None));
        assert_eq!(frame.data(), b"plain");
    }

    #[test]
    fn test_unselected_node_keeps_carrier_unchanged() {
        let config = IntConfig {
            default_bitmap: 0b0000_0001,
            ..Default::default()
        };
        let mut node = IntEngine::new(config, SimEnvironment::new(3, 1)).unwrap();
        let outcome = node.budget_decide_and_admit(30, TrafficOrigin::Originator);
        assert_eq!(outcome, AdmissionOutcome::NotSelected);
        assert_eq!(node.state(), CarrierState::Active);
        assert_eq!(node.carrier().map(|h| h.sequence), Some(0));
    }

    #[test]
    fn test_opaque_layout_roundtrip() {
        let config = IntConfig {
            layout: RecordLayout::Opaque { len: 8 },
            ..Default::default()
        };
        let mut source = IntEngine::new(config.clone(), SimEnvironment::new(5, 1)).unwrap();
        let mut sink = IntEngine::new(config, SimEnvironment::new(1, 1)).unwrap();

        let mut frame = data_frame(b"p");
        assert_eq!(source.prepare_outgoing(&mut frame, TrafficOrigin::Originator), 18);
        let content = sink.on_frame_received(&mut frame.into_received(), true).unwrap();
        assert_eq!(
            content.records,
            vec![TelemetryRecord::Opaque(Bytes::from_static(&[5; 8]))]
        );
    }

    fn with_received(node: &mut IntEngine<SimEnvironment>, sources: &[u16]) {
        for &id in sources {
            let mut source = engine(id);
            let mut frame = data_frame(b"x");
            source.prepare_outgoing(&mut frame, TrafficOrigin::Originator);
            node.on_frame_received(&mut frame.into_received(), true);
        }
    }

    #[test]
    fn test_telemetry_block_peeks_newest_first() {
        let mut node = engine(1);
        with_received(&mut node, &[10, 11, 12]);

        let block = node.telemetry_block(2);
        assert_eq!(block.len(), 10);
        assert_eq!(&block[..2], &12u16.to_le_bytes());
        assert_eq!(&block[5..7], &11u16.to_le_bytes());
        assert_eq!(node.pending_telemetry(), 3);
        assert_eq!(node.stats().records_consumed, 0);

        assert_eq!(node.commit_telemetry(2), 2);
        assert_eq!(node.pending_telemetry(), 1);
        assert_eq!(node.stats().records_consumed, 2);
        assert_eq!(node.commit_telemetry(5), 1);
    }

    #[test]
    fn test_serialize_with_pending_keeps_records_without_room() {
        let mut node = engine(1);
        with_received(&mut node, &[10, 11]);

        let mut full = Message::new(coap::MessageType::Con, coap::Code::POST, 1);
        full.set_payload(vec![0u8; 60]);
        let bytes = node.serialize_with_pending(&full).unwrap();
        assert_eq!(coap::parse_with_telemetry(&bytes).unwrap().1, None);
        assert_eq!(node.pending_telemetry(), 2);

        let ack = Message::new(coap::MessageType::Ack, coap::Code::CONTENT, 2);
        node.serialize_with_pending(&ack).unwrap();
        assert_eq!(node.pending_telemetry(), 2);
    }

    #[test]
    fn test_serialize_with_pending_sends_what_fits() {
        let mut node = engine(1);
        with_received(&mut node, &[10, 11, 12]);

        // 64 - 40 - 2 - 11 leaves room for two records
        let mut report = Message::new(coap::MessageType::Non, coap::Code::POST, 3);
        report.set_payload(vec![0u8; 40]);
        let bytes = node.serialize_with_pending(&report).unwrap();
        let (_, telemetry) = coap::parse_with_telemetry(&bytes).unwrap();
        let telemetry = telemetry.unwrap();
        assert_eq!(telemetry.len(), 10);
        assert_eq!(&telemetry[..2], &12u16.to_le_bytes());
        assert_eq!(node.pending_telemetry(), 1);
        assert_eq!(
            node.next_telemetry().and_then(|r| r.as_sample().map(|s| s.node_id)),
            Some(10)
        );
    }

    #[test]
    fn test_extract_without_payload_termination() {
        let record = TelemetryRecord::from(SampleRecord::new(6, 4, 0x20, -60));
        let mut content = vec![DEFAULT_SUBIE_ID, 0x00, 0x00, 0x00];
        content.extend_from_slice(&record.to_bytes());
        let mut data = HEADER_TERMINATION_1.to_vec();
        data.extend_from_slice(&ietf_descriptor(content.len()).unwrap());
        data.extend_from_slice(&content);
        data.extend_from_slice(b"hello");

        let mut node = engine(1);
        let mut frame = PacketBuf::incoming(FrameKind::Data, Bytes::new(), true, &data);
        let received = node.on_frame_received(&mut frame, true).unwrap();
        assert_eq!(received.records, vec![record]);
        assert_eq!(frame.data(), b"hello");
        assert!(!frame.ie_list_present());
        assert_eq!(node.stats().malformed_frames, 0);
    }

    #[test]
    fn test_produce_record_uses_environment() {
        let mut node = engine(9);
        node.env_mut().clock = 0x5678;
        let record = node
            .produce_record(0xFF, TrafficOrigin::Originator)
            .unwrap();
        assert_eq!(record, TelemetryRecord::Sample(SampleRecord::new(9, 0, 0x678, 0)));
    }
}
