//! Fixed-capacity slot pool for telemetry records.

use std::collections::VecDeque;

/// Handle to an occupied pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    /// Slot index inside the pool.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Pool of pre-allocated slots; never grows past its capacity.
#[derive(Debug, Clone)]
pub struct SlotPool<T> {
    slots: Vec<Option<T>>,
    free: VecDeque<usize>,
}

impl<T> SlotPool<T> {
    /// Create a pool with `capacity` empty slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            free: (0..capacity).collect(),
        }
    }

    /// Store a value, returning it back when no slot is free.
    pub fn insert(&mut self, value: T) -> Result<SlotId, T> {
        let Some(index) = self.free.pop_front() else {
            return Err(value);
        };
        self.slots[index] = Some(value);
        Ok(SlotId(index))
    }

    /// Release a slot, returning its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let value = self.slots.get_mut(id.0)?.take()?;
        self.free.push_back(id.0);
        Some(value)
    }

    /// Borrow the value in a slot.
    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0)?.as_ref()
    }

    /// Borrow the value in a slot mutably.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Check whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhausts_and_recovers() {
        let mut pool = SlotPool::new(2);
        let a = pool.insert('a').unwrap();
        let _b = pool.insert('b').unwrap();
        assert_eq!(pool.insert('c'), Err('c'));
        assert_eq!(pool.available(), 0);

        assert_eq!(pool.remove(a), Some('a'));
        assert_eq!(pool.remove(a), None);
        let c = pool.insert('c').unwrap();
        assert_eq!(pool.get(c), Some(&'c'));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn slots_are_reused_in_release_order() {
        let mut pool = SlotPool::new(3);
        let ids: Vec<_> = (0..3).map(|i| pool.insert(i).unwrap()).collect();
        pool.remove(ids[2]);
        pool.remove(ids[0]);
        assert_eq!(pool.insert(7).unwrap(), ids[2]);
        assert_eq!(pool.insert(8).unwrap(), ids[0]);
    }

    #[test]
    fn zero_capacity_pool_rejects_everything() {
        let mut pool: SlotPool<u8> = SlotPool::new(0);
        assert!(pool.is_empty());
        assert_eq!(pool.insert(1), Err(1));
    }
}
