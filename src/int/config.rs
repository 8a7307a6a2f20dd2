//! Engine configuration

use super::{
    DEFAULT_BITMAP, DEFAULT_CARRIER_CAPACITY, DEFAULT_CONSUMPTION_CAPACITY, DEFAULT_FRAME_BUDGET,
    DEFAULT_IE_OVERHEAD, DEFAULT_SUBIE_ID, FRESH_CONTROL, INT_HEADER_SIZE, IntError, Result,
    SAMPLE_RECORD_SIZE,
};

/// Element wrapping that is always written: HT1, IETF descriptor, payload termination
const MIN_IE_OVERHEAD: usize = 6;

/// Largest content length an IETF payload descriptor can declare
const MAX_ELEMENT_CONTENT: usize = 0x07FF;

/// Record representation, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecordLayout {
    /// Node id, channel/slot and RSSI
    #[default]
    Sample,
    /// Fixed-size filler bytes for payload-size experiments
    Opaque {
        /// Bytes per record
        len: usize,
    },
}

impl RecordLayout {
    /// Bytes one record occupies on the wire
    #[must_use]
    pub const fn record_size(self) -> usize {
        match self {
            Self::Sample => SAMPLE_RECORD_SIZE,
            Self::Opaque { len } => len,
        }
    }
}

/// How a node decides whether to add its record once the budget allows it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SamplingPolicy {
    /// Always add when there is room
    #[default]
    Deterministic,
    /// Add with probability `remaining_slots / root_distance`, so nodes far
    /// from the root leave room for the hops that follow
    RootDistanceWeighted,
}

/// Telemetry engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntConfig {
    /// Record representation
    pub layout: RecordLayout,
    /// Maximum frame length the telemetry may grow the frame to
    pub frame_budget: usize,
    /// Bytes the element wrapping adds on top of the telemetry header
    pub ie_overhead: usize,
    /// Records a carrier may hold
    pub carrier_capacity: usize,
    /// Received records buffered for local consumption
    pub consumption_capacity: usize,
    /// Admission policy
    pub sampling: SamplingPolicy,
    /// Sub-element identifier written as the telemetry subtype
    pub subie_id: u8,
    /// Control byte of a fresh carrier
    pub initial_control: u8,
    /// Selection bitmap of a fresh carrier
    pub default_bitmap: u8,
}

impl Default for IntConfig {
    fn default() -> Self {
        Self {
            layout: RecordLayout::Sample,
            frame_budget: DEFAULT_FRAME_BUDGET,
            ie_overhead: DEFAULT_IE_OVERHEAD,
            carrier_capacity: DEFAULT_CARRIER_CAPACITY,
            consumption_capacity: DEFAULT_CONSUMPTION_CAPACITY,
            sampling: SamplingPolicy::Deterministic,
            subie_id: DEFAULT_SUBIE_ID,
            initial_control: FRESH_CONTROL,
            default_bitmap: DEFAULT_BITMAP,
        }
    }
}

impl IntConfig {
    /// Bytes one record occupies on the wire
    #[must_use]
    pub const fn record_size(&self) -> usize {
        self.layout.record_size()
    }

    /// Bytes needed to carry an empty telemetry header in a frame
    #[must_use]
    pub const fn init_cost(&self) -> usize {
        INT_HEADER_SIZE + self.ie_overhead
    }

    /// Check that the values describe a usable engine
    pub fn validate(&self) -> Result<()> {
        if self.record_size() == 0 {
            return Err(invalid("layout", "record size must be non-zero"));
        }
        if self.ie_overhead < MIN_IE_OVERHEAD {
            return Err(invalid("ie_overhead", "must cover the three element descriptors"));
        }
        if self.frame_budget < self.init_cost() {
            return Err(invalid("frame_budget", "smaller than the telemetry header cost"));
        }
        if self.carrier_capacity == 0 {
            return Err(invalid("carrier_capacity", "must be non-zero"));
        }
        if self.consumption_capacity == 0 {
            return Err(invalid("consumption_capacity", "must be non-zero"));
        }
        let max_content = INT_HEADER_SIZE
            .saturating_add(self.carrier_capacity.saturating_mul(self.record_size()));
        if max_content > MAX_ELEMENT_CONTENT {
            return Err(invalid(
                "carrier_capacity",
                "full carrier exceeds the element length field",
            ));
        }
        Ok(())
    }
}

const fn invalid(field: &'static str, reason: &'static str) -> IntError {
    IntError::InvalidConfig { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IntConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.init_cost(), 11);
        assert_eq!(config.record_size(), 5);
        assert_eq!(config.frame_budget, 125);
    }

    #[test]
    fn test_rejects_zero_sized_records() {
        let config = IntConfig {
            layout: RecordLayout::Opaque { len: 0 },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IntError::InvalidConfig { field: "layout", .. })
        ));
    }

    #[test]
    fn test_rejects_budget_below_header_cost() {
        let config = IntConfig {
            frame_budget: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IntError::InvalidConfig { field: "frame_budget", .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_carrier() {
        let config = IntConfig {
            layout: RecordLayout::Opaque { len: 100 },
            carrier_capacity: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde_roundtrip() {
        let config = IntConfig {
            layout: RecordLayout::Opaque { len: 8 },
            sampling: SamplingPolicy::RootDistanceWeighted,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: IntConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
