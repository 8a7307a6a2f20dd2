//! Per-engine telemetry counters

/// Counters kept by one [`IntEngine`](super::IntEngine)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntStats {
    /// Outgoing frames offered to the engine
    pub frames_seen: u64,
    /// Outgoing frames passed through untouched (not unicast data)
    pub frames_passed_through: u64,
    /// Frames that left with telemetry embedded
    pub frames_embedded: u64,
    /// Carriers created by this node
    pub carriers_created: u64,
    /// Carriers taken over from received frames
    pub carriers_received: u64,
    /// Carriers freed because not even the header fit
    pub carriers_discarded: u64,
    /// Own records added to a carrier
    pub records_admitted: u64,
    /// Admissions lost to probabilistic sampling
    pub records_sampled_out: u64,
    /// Admissions skipped because the bitmap did not select this node
    pub records_not_selected: u64,
    /// Carried records dropped to keep the header
    pub records_dropped: u64,
    /// Times the overflow flag was set by this node
    pub overflow_events: u64,
    /// Record allocations refused by a full pool
    pub pool_exhaustions: u64,
    /// Embedding attempts that failed
    pub embed_failures: u64,
    /// Telemetry bytes added to outgoing frames
    pub telemetry_bytes_sent: u64,
    /// Records extracted from received frames
    pub records_received: u64,
    /// Records handed to the application
    pub records_consumed: u64,
    /// Received frames whose element list did not decode
    pub malformed_frames: u64,
}

impl IntStats {
    /// Share of budget-permitted admissions that produced a record
    #[must_use]
    pub fn admission_ratio(&self) -> Option<f64> {
        let attempts = self.records_admitted + self.records_sampled_out;
        if attempts == 0 {
            return None;
        }
        Some(self.records_admitted as f64 / attempts as f64)
    }
}
