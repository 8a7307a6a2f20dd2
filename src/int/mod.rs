//! In-band network telemetry (INT)
//!
//! Forwarding nodes append a small per-hop record to unicast data frames while
//! the frame still fits the link-layer budget. The accumulated telemetry travels
//! in the frame's information-element list:
//!
//! ```text
//! +--------+--------+---------+-------+-------+--------+---------+--------+---------+
//! | HT1 IE | IETF   | subtype | ctrl  | seq   | bitmap | records | PT IE  | payload |
//! | 2      | desc 2 | 1       | 1     | 1     | 1      | N*size  | 2      |         |
//! +--------+--------+---------+-------+-------+--------+---------+--------+---------+
//! ```
//!
//! The receiving side strips the elements again, hands the records to the local
//! consumption queue and, when the frame is forwarded further, keeps carrying
//! the telemetry.

#[cfg(feature = "debug-tools")]
pub mod debug;

mod budget;
mod config;
mod content;
mod engine;
mod env;
mod error;
mod factory;
mod frame;
mod ie;
mod pool;
mod record;
mod stats;
mod store;

pub use budget::{BudgetDecision, BudgetEngine, CarrierLoad, CarrierState, admission_percent};
pub use config::{IntConfig, RecordLayout, SamplingPolicy};
pub use content::{ControlFlags, TelemetryContent, TelemetryHeader};
pub use engine::{AdmissionOutcome, IntEngine};
pub use env::{NodeEnvironment, SimEnvironment};
pub use error::{IntError, Result};
pub use factory::{RecordFactory, TrafficOrigin};
pub use frame::{DEFAULT_HEADER_ROOM, FrameBuffer, FrameKind, PacketBuf};
pub use ie::{
    ElementIter, HEADER_TERMINATION_1, IETF_GROUP_ID, InformationElement, PAYLOAD_TERMINATION,
    TelemetryElement, find_telemetry, ietf_descriptor,
};
pub use pool::{SlotId, SlotPool};
pub use record::{SampleRecord, TelemetryRecord};
pub use stats::IntStats;
pub use store::RecordStore;

/// Telemetry header size on the wire (subtype, control, sequence, bitmap)
pub const INT_HEADER_SIZE: usize = 4;

/// Size of one sample record on the wire (node id, channel/slot, rssi)
pub const SAMPLE_RECORD_SIZE: usize = 5;

/// Bytes the information-element wrapping adds around the telemetry content
pub const DEFAULT_IE_OVERHEAD: usize = 7;

/// Per-frame byte budget (maximum PHY payload minus FCS)
pub const DEFAULT_FRAME_BUDGET: usize = 127 - 2;

/// Sub-element identifier tagging telemetry content
pub const DEFAULT_SUBIE_ID: u8 = 0x2A;

/// Control byte of a freshly created carrier
pub const FRESH_CONTROL: u8 = 0xA0;

/// Selection bitmap of a freshly created carrier (every node)
pub const DEFAULT_BITMAP: u8 = 0xFF;

/// Control bits signalling that records were dropped along the path
pub const OVERFLOW_MASK: u8 = 0x03;

/// Default capacity of the carrier record pool
pub const DEFAULT_CARRIER_CAPACITY: usize = 32;

/// Default capacity of the consumption record pool
pub const DEFAULT_CONSUMPTION_CAPACITY: usize = 256;
