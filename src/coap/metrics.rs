use std::sync::atomic::{AtomicU64, Ordering};

use super::MessageType;

/// Track codec counters without external dependencies.
pub(crate) struct Metrics;

static SERIALIZED_MESSAGES: AtomicU64 = AtomicU64::new(0);
static PARSED_MESSAGES: AtomicU64 = AtomicU64::new(0);
static PARSE_ERRORS: AtomicU64 = AtomicU64::new(0);
static SERIALIZE_ERRORS: AtomicU64 = AtomicU64::new(0);
static TELEMETRY_BLOCKS_SENT: AtomicU64 = AtomicU64::new(0);
static TELEMETRY_BLOCKS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static TELEMETRY_BLOCKS_SKIPPED: AtomicU64 = AtomicU64::new(0);

struct MessageTypeCounters {
    con: AtomicU64,
    non: AtomicU64,
    ack: AtomicU64,
    rst: AtomicU64,
}

static MESSAGE_COUNTERS: MessageTypeCounters = MessageTypeCounters::new();

impl MessageTypeCounters {
    const fn new() -> Self {
        Self {
            con: AtomicU64::new(0),
            non: AtomicU64::new(0),
            ack: AtomicU64::new(0),
            rst: AtomicU64::new(0),
        }
    }

    fn increment(&self, msg_type: MessageType) {
        let counter = match msg_type {
            MessageType::Con => &self.con,
            MessageType::Non => &self.non,
            MessageType::Ack => &self.ack,
            MessageType::Rst => &self.rst,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Direction of message flow for counting.
#[derive(Clone, Copy)]
pub(crate) enum MessageDirection {
    Serialized,
    Parsed,
}

/// Outcome of a piggyback attempt.
#[derive(Clone, Copy)]
pub(crate) enum PiggybackEvent {
    Sent,
    Received,
    Skipped,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_message(direction: MessageDirection, msg_type: MessageType) {
        match direction {
            MessageDirection::Serialized => {
                SERIALIZED_MESSAGES.fetch_add(1, Ordering::Relaxed);
            }
            MessageDirection::Parsed => {
                PARSED_MESSAGES.fetch_add(1, Ordering::Relaxed);
            }
        }
        MESSAGE_COUNTERS.increment(msg_type);
    }

    #[inline]
    pub(crate) fn record_error(direction: MessageDirection) {
        match direction {
            MessageDirection::Serialized => SERIALIZE_ERRORS.fetch_add(1, Ordering::Relaxed),
            MessageDirection::Parsed => PARSE_ERRORS.fetch_add(1, Ordering::Relaxed),
        };
    }

    #[inline]
    pub(crate) fn record_piggyback(event: PiggybackEvent) {
        let counter = match event {
            PiggybackEvent::Sent => &TELEMETRY_BLOCKS_SENT,
            PiggybackEvent::Received => &TELEMETRY_BLOCKS_RECEIVED,
            PiggybackEvent::Skipped => &TELEMETRY_BLOCKS_SKIPPED,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> CodecMetricsSnapshot {
        CodecMetricsSnapshot {
            serialized_messages: SERIALIZED_MESSAGES.load(Ordering::Relaxed),
            parsed_messages: PARSED_MESSAGES.load(Ordering::Relaxed),
            serialize_errors: SERIALIZE_ERRORS.load(Ordering::Relaxed),
            parse_errors: PARSE_ERRORS.load(Ordering::Relaxed),
            con_messages: MESSAGE_COUNTERS.con.load(Ordering::Relaxed),
            non_messages: MESSAGE_COUNTERS.non.load(Ordering::Relaxed),
            ack_messages: MESSAGE_COUNTERS.ack.load(Ordering::Relaxed),
            rst_messages: MESSAGE_COUNTERS.rst.load(Ordering::Relaxed),
            telemetry_blocks_sent: TELEMETRY_BLOCKS_SENT.load(Ordering::Relaxed),
            telemetry_blocks_received: TELEMETRY_BLOCKS_RECEIVED.load(Ordering::Relaxed),
            telemetry_blocks_skipped: TELEMETRY_BLOCKS_SKIPPED.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the process-wide codec counters.
pub fn snapshot() -> CodecMetricsSnapshot {
    Metrics::totals()
}

/// Lightweight snapshot of codec counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecMetricsSnapshot {
    /// Messages successfully serialized
    pub serialized_messages: u64,
    /// Messages successfully parsed
    pub parsed_messages: u64,
    /// Serialization attempts that failed
    pub serialize_errors: u64,
    /// Parse attempts that failed
    pub parse_errors: u64,
    /// Confirmable messages seen in either direction
    pub con_messages: u64,
    /// Non-confirmable messages seen in either direction
    pub non_messages: u64,
    /// Acknowledgements seen in either direction
    pub ack_messages: u64,
    /// Resets seen in either direction
    pub rst_messages: u64,
    /// Telemetry blocks written into outgoing messages
    pub telemetry_blocks_sent: u64,
    /// Telemetry blocks found in incoming messages
    pub telemetry_blocks_received: u64,
    /// Telemetry blocks left out for lack of space or message type
    pub telemetry_blocks_skipped: u64,
}

impl CodecMetricsSnapshot {
    /// Share of parse attempts that failed, if any were made.
    #[must_use]
    pub fn parse_error_ratio(&self) -> Option<f64> {
        let attempts = self.parsed_messages + self.parse_errors;
        if attempts == 0 {
            return None;
        }
        Some(self.parse_errors as f64 / attempts as f64)
    }
}
