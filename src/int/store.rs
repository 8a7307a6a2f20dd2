//! Record storage: the carrier queue and the consumption queue.
//!
//! Both queues hold slot handles into fixed-capacity pools, so memory use is
//! bounded by configuration. The carrier queue is FIFO (embedded head first);
//! the consumption queue is LIFO (newest record served first).

use std::collections::VecDeque;

use tracing::{trace, warn};

use super::{IntError, Result, SlotId, SlotPool, TelemetryRecord};

/// Pools and queues for telemetry records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    carrier_pool: SlotPool<TelemetryRecord>,
    carrier: VecDeque<SlotId>,
    consumption_pool: SlotPool<TelemetryRecord>,
    consumption: Vec<SlotId>,
}

impl RecordStore {
    /// Create a store with the given pool capacities.
    #[must_use]
    pub fn new(carrier_capacity: usize, consumption_capacity: usize) -> Self {
        Self {
            carrier_pool: SlotPool::new(carrier_capacity),
            carrier: VecDeque::with_capacity(carrier_capacity),
            consumption_pool: SlotPool::new(consumption_capacity),
            consumption: Vec::with_capacity(consumption_capacity),
        }
    }

    /// Append a record to the carrier queue.
    pub fn push_carrier(&mut self, record: TelemetryRecord) -> Result<()> {
        match self.carrier_pool.insert(record) {
            Ok(id) => {
                self.carrier.push_back(id);
                trace!(records = self.carrier.len(), "carrier record queued");
                Ok(())
            }
            Err(_) => {
                let capacity = self.carrier_pool.capacity();
                warn!(capacity, "carrier record pool exhausted");
                Err(IntError::PoolExhausted {
                    pool: "carrier",
                    capacity,
                })
            }
        }
    }

    /// Records currently carried, head first.
    pub fn carrier_records(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.carrier
            .iter()
            .filter_map(|id| self.carrier_pool.get(*id))
    }

    /// Number of carried records.
    #[must_use]
    pub fn carrier_len(&self) -> usize {
        self.carrier.len()
    }

    /// Remove every carried record, head first, freeing their slots.
    pub fn drain_carrier(&mut self) -> Vec<TelemetryRecord> {
        let mut records = Vec::with_capacity(self.carrier.len());
        while let Some(id) = self.carrier.pop_front() {
            if let Some(record) = self.carrier_pool.remove(id) {
                records.push(record);
            }
        }
        records
    }

    /// Free every carried record, returning how many were dropped.
    pub fn clear_carrier(&mut self) -> usize {
        self.drain_carrier().len()
    }

    /// Queue a received record for local consumption.
    pub fn push_consumption(&mut self, record: TelemetryRecord) -> Result<()> {
        match self.consumption_pool.insert(record) {
            Ok(id) => {
                self.consumption.push(id);
                Ok(())
            }
            Err(_) => {
                let capacity = self.consumption_pool.capacity();
                warn!(
                    capacity,
                    "consumption pool full, application is not draining telemetry"
                );
                Err(IntError::PoolExhausted {
                    pool: "consumption",
                    capacity,
                })
            }
        }
    }

    /// Take the most recently received record.
    pub fn pop_consumption(&mut self) -> Option<TelemetryRecord> {
        let id = self.consumption.pop()?;
        self.consumption_pool.remove(id)
    }

    /// Records waiting for consumption, newest first, left in place.
    pub fn consumption_records(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.consumption
            .iter()
            .rev()
            .filter_map(|id| self.consumption_pool.get(*id))
    }

    /// Number of records waiting for consumption.
    #[must_use]
    pub fn consumption_len(&self) -> usize {
        self.consumption.len()
    }

    /// Free carrier slots.
    #[must_use]
    pub fn carrier_available(&self) -> usize {
        self.carrier_pool.available()
    }

    /// Free consumption slots.
    #[must_use]
    pub fn consumption_available(&self) -> usize {
        self.consumption_pool.available()
    }
}
