//! Per-frame byte budget for carried telemetry.
//!
//! Every cost is checked with the same rule: a layout fits iff
//! `frame_len + init_cost + records * record_size (+ record_size) <= budget`.

use super::IntConfig;

/// Lifecycle of the node's telemetry carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierState {
    /// No carrier exists.
    Empty,
    /// Carrier exists and may still take records.
    Active,
    /// Carrier exists with its overflow flag set; no more records are added.
    Overflowed,
}

/// What the current carrier holds, as seen by the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierLoad {
    /// Records already carried.
    pub records: usize,
    /// Overflow flag already set.
    pub overflowed: bool,
}

/// Outcome of checking a frame against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    /// No carrier, and not even an empty header would fit.
    Skip,
    /// No carrier yet; an empty header fits, so one may be created.
    Initialize,
    /// The existing carrier cannot keep its header; free it.
    Discard,
    /// Records do not fit; drop them, keep the header, set overflow.
    Truncate,
    /// Keep the carrier as is; `overflow` asks to set the flag now.
    Hold {
        /// One more record would not fit and the flag is not set yet.
        overflow: bool,
    },
    /// One more record fits.
    Admit {
        /// Whole records that still fit before this node adds its own.
        remaining_slots: usize,
    },
}

/// Budget arithmetic for one engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct BudgetEngine {
    budget: usize,
    init_cost: usize,
    record_size: usize,
}

impl BudgetEngine {
    /// Construct from the engine configuration.
    #[must_use]
    pub const fn new(config: &IntConfig) -> Self {
        Self {
            budget: config.frame_budget,
            init_cost: config.init_cost(),
            record_size: config.record_size(),
        }
    }

    /// Classify a frame of `frame_len` bytes given the current carrier, if any.
    #[must_use]
    pub const fn evaluate(&self, frame_len: usize, carrier: Option<CarrierLoad>) -> BudgetDecision {
        let header_total = frame_len.saturating_add(self.init_cost);
        let Some(load) = carrier else {
            return if header_total > self.budget {
                BudgetDecision::Skip
            } else {
                BudgetDecision::Initialize
            };
        };

        if header_total > self.budget {
            return BudgetDecision::Discard;
        }

        let current = header_total.saturating_add(load.records.saturating_mul(self.record_size));
        if current > self.budget {
            return BudgetDecision::Truncate;
        }

        if load.overflowed {
            return BudgetDecision::Hold { overflow: false };
        }
        if current.saturating_add(self.record_size) > self.budget {
            return BudgetDecision::Hold { overflow: true };
        }

        let remaining_slots = match (self.budget - current).checked_div(self.record_size) {
            Some(slots) => slots,
            None => 0,
        };
        BudgetDecision::Admit { remaining_slots }
    }

    /// Bytes the telemetry adds to a frame for `records` records.
    #[must_use]
    pub const fn telemetry_cost(&self, records: usize) -> usize {
        self.init_cost + records * self.record_size
    }

    /// Configured frame budget.
    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Cost of an empty header in a frame.
    #[must_use]
    pub const fn init_cost(&self) -> usize {
        self.init_cost
    }

    /// Bytes per record.
    #[must_use]
    pub const fn record_size(&self) -> usize {
        self.record_size
    }
}

/// Admission threshold in percent: a draw in `[0, 100)` admits iff it is below this.
///
/// Equals `100 * remaining_slots / root_distance`, with the distance clamped to at
/// least one hop.
#[must_use]
pub fn admission_percent(remaining_slots: usize, root_distance: u16) -> u64 {
    let distance = u64::from(root_distance.max(1));
    (remaining_slots as u64).saturating_mul(100) / distance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> BudgetEngine {
        BudgetEngine::new(&IntConfig::default())
    }

    fn load(records: usize, overflowed: bool) -> Option<CarrierLoad> {
        Some(CarrierLoad {
            records,
            overflowed,
        })
    }

    #[test]
    fn fresh_carrier_thresholds() {
        let engine = engine();
        assert_eq!(engine.evaluate(114, None), BudgetDecision::Initialize);
        assert_eq!(engine.evaluate(115, None), BudgetDecision::Skip);
        assert_eq!(
            engine.evaluate(109, load(0, false)),
            BudgetDecision::Admit { remaining_slots: 1 }
        );
        assert_eq!(
            engine.evaluate(110, load(0, false)),
            BudgetDecision::Hold { overflow: true }
        );
    }

    #[test]
    fn existing_carrier_is_discarded_or_truncated() {
        let engine = engine();
        assert_eq!(engine.evaluate(115, load(3, false)), BudgetDecision::Discard);
        // 100 + 11 + 3*5 = 126 > 125
        assert_eq!(engine.evaluate(100, load(3, false)), BudgetDecision::Truncate);
        // 99 + 11 + 15 = 125 fits, but no room for another
        assert_eq!(
            engine.evaluate(99, load(3, false)),
            BudgetDecision::Hold { overflow: true }
        );
    }

    #[test]
    fn overflow_is_sticky() {
        let engine = engine();
        assert_eq!(
            engine.evaluate(0, load(0, true)),
            BudgetDecision::Hold { overflow: false }
        );
    }

    #[test]
    fn remaining_slots_counts_whole_records() {
        let engine = engine();
        // 125 - 11 - 10 - 50 = 54 -> 10 slots
        assert_eq!(
            engine.evaluate(50, load(2, false)),
            BudgetDecision::Admit {
                remaining_slots: 10
            }
        );
        assert_eq!(engine.telemetry_cost(2), 21);
    }

    #[test]
    fn admission_percent_clamps_distance() {
        assert_eq!(admission_percent(3, 0), 300);
        assert_eq!(admission_percent(3, 1), 300);
        assert_eq!(admission_percent(1, 4), 25);
        assert_eq!(admission_percent(2, 3), 66);
    }
}
