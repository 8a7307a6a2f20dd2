//! Node facts the engine consumes from the rest of the stack

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Routing, radio, clock and randomness as seen by the telemetry engine
///
/// A node stack implements this over its real collaborators; tests and the
/// relay demo use [`SimEnvironment`].
pub trait NodeEnvironment {
    /// This node's identifier
    fn node_id(&self) -> u16;

    /// Whether routing currently has a path towards the root
    fn is_reachable(&self) -> bool;

    /// Hops to the root
    fn root_distance(&self) -> u16;

    /// RSSI of the last received frame, in dBm
    fn last_rssi(&self) -> i8;

    /// Local clock ticks
    fn clock_now(&self) -> u32;

    /// Absolute slot number of the current slot
    fn current_asn(&self) -> u64;

    /// Channel used in the current slot
    fn current_channel(&self) -> u8;

    /// Uniform draw in `[0, bound)`
    fn random_below(&mut self, bound: u32) -> u32;
}

/// Settable environment backed by a seeded random source
#[derive(Debug, Clone)]
pub struct SimEnvironment {
    /// Node identifier
    pub node_id: u16,
    /// Route to root available
    pub reachable: bool,
    /// Hops to root
    pub root_distance: u16,
    /// Last RSSI sample
    pub last_rssi: i8,
    /// Clock ticks
    pub clock: u32,
    /// Absolute slot number
    pub asn: u64,
    /// Current channel
    pub channel: u8,
    rng: StdRng,
}

impl SimEnvironment {
    /// Reachable node one hop from the root, with a reproducible random source
    #[must_use]
    pub fn new(node_id: u16, seed: u64) -> Self {
        Self {
            node_id,
            reachable: true,
            root_distance: 1,
            last_rssi: 0,
            clock: 0,
            asn: 0,
            channel: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Set the distance to the root
    #[must_use]
    pub fn with_root_distance(mut self, hops: u16) -> Self {
        self.root_distance = hops;
        self
    }

    /// Advance clock and slot counter
    pub fn advance(&mut self, slots: u64, ticks: u32) {
        self.asn = self.asn.wrapping_add(slots);
        self.clock = self.clock.wrapping_add(ticks);
    }
}

impl NodeEnvironment for SimEnvironment {
    fn node_id(&self) -> u16 {
        self.node_id
    }

    fn is_reachable(&self) -> bool {
        self.reachable
    }

    fn root_distance(&self) -> u16 {
        self.root_distance
    }

    fn last_rssi(&self) -> i8 {
        self.last_rssi
    }

    fn clock_now(&self) -> u32 {
        self.clock
    }

    fn current_asn(&self) -> u64 {
        self.asn
    }

    fn current_channel(&self) -> u8 {
        self.channel
    }

    fn random_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_reproducible_and_bounded() {
        let mut a = SimEnvironment::new(1, 99);
        let mut b = SimEnvironment::new(1, 99);
        for _ in 0..100 {
            let draw = a.random_below(100);
            assert!(draw < 100);
            assert_eq!(draw, b.random_below(100));
        }
        assert_eq!(a.random_below(0), 0);
    }
}
