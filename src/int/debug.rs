//! Frame capture for inspecting telemetry with packet analyzers.
//!
//! Frames are written as IEEE 802.15.4 without FCS, so Wireshark decodes the
//! information-element list directly.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
const PCAP_SNAPLEN: u32 = 127;
const LINKTYPE_IEEE802_15_4_NOFCS: u32 = 230;

/// Shared pcap sink; clones write to the same capture.
#[derive(Clone)]
pub struct PcapRecorder {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl PcapRecorder {
    /// Create a capture file at `path`, truncating any existing file.
    pub fn create(path: &Path) -> io::Result<Self> {
        Self::from_writer(BufWriter::new(File::create(path)?))
    }

    /// Capture into any writer, starting with the global header.
    pub fn from_writer<W: Write + Send + 'static>(mut writer: W) -> io::Result<Self> {
        write_global_header(&mut writer)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        })
    }

    /// Append one frame stamped with the current system time.
    pub fn record(&self, frame: &[u8]) -> io::Result<()> {
        let (sec, usec) = micros(SystemTime::now());
        let captured = frame.len().min(PCAP_SNAPLEN as usize);
        let mut header = [0u8; 16];
        header[0..4].copy_from_slice(&sec.to_le_bytes());
        header[4..8].copy_from_slice(&usec.to_le_bytes());
        header[8..12].copy_from_slice(&(captured as u32).to_le_bytes());
        header[12..16].copy_from_slice(&(frame.len().min(u32::MAX as usize) as u32).to_le_bytes());

        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("pcap recorder poisoned"))?;
        guard.write_all(&header)?;
        guard.write_all(&frame[..captured])?;
        guard.flush()
    }
}

impl std::fmt::Debug for PcapRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcapRecorder").finish_non_exhaustive()
    }
}

fn write_global_header<W: Write>(writer: &mut W) -> io::Result<()> {
    let mut header = [0u8; 24];
    header[0..4].copy_from_slice(&PCAP_MAGIC.to_le_bytes());
    header[4..6].copy_from_slice(&PCAP_VERSION_MAJOR.to_le_bytes());
    header[6..8].copy_from_slice(&PCAP_VERSION_MINOR.to_le_bytes());
    // thiszone and sigfigs stay zero
    header[16..20].copy_from_slice(&PCAP_SNAPLEN.to_le_bytes());
    header[20..24].copy_from_slice(&LINKTYPE_IEEE802_15_4_NOFCS.to_le_bytes());
    writer.write_all(&header)
}

fn micros(timestamp: SystemTime) -> (u32, u32) {
    let duration = timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs().min(u64::from(u32::MAX)) as u32;
    (secs, duration.subsec_micros())
}
