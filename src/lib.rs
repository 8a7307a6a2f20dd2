//! tsch-int - Protocol core for low-power 6TiSCH-style mesh nodes
//!
//! This library provides two pieces:
//!
//! - [`coap`]: a compact CoAP-style request/response codec (4-byte header,
//!   delta-encoded options, payload marker) with optional piggybacking of a
//!   telemetry block.
//! - [`int`]: an in-band network telemetry engine that appends per-hop records
//!   to forwarded data frames under a strict per-frame byte budget, and pulls
//!   them back out on receipt. Received records can ride upstream in a
//!   message piggyback.
//!
//! # Quick Start
//!
//! ```rust
//! use tsch_int::coap::{self, Code, Message, MessageType};
//!
//! let mut msg = Message::new(MessageType::Con, Code::POST, 0x1234);
//! msg.set_uri_path("send/dummy");
//! msg.set_payload(&b"DA\0"[..]);
//!
//! let bytes = coap::serialize(&msg)?;
//! let decoded = coap::parse(&bytes)?;
//! assert_eq!(decoded, msg);
//! # Ok::<(), tsch_int::coap::Error>(())
//! ```
//!
//! ```rust
//! use tsch_int::int::{FrameKind, IntConfig, IntEngine, PacketBuf, SimEnvironment, TrafficOrigin};
//!
//! let mut engine = IntEngine::new(IntConfig::default(), SimEnvironment::new(7, 42))?;
//! let mut frame = PacketBuf::outgoing(FrameKind::Data, vec![0u8; 21], b"hello");
//! let added = engine.prepare_outgoing(&mut frame, TrafficOrigin::Originator);
//! assert!(added > 0);
//! # Ok::<(), tsch_int::int::IntError>(())
//! ```
//!
//! # Features
//!
//! - `serde` - derive `Serialize`/`Deserialize` for records, configuration and message types
//! - `debug-tools` - pcap capture of frames passing through the telemetry engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod coap;
pub mod int;

pub use coap::{Code, Message, MessageType};
pub use int::{IntConfig, IntEngine, IntError, TelemetryRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
