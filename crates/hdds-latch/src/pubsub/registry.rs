// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-capacity subscriber registry.
//!
//! Slots are indices into a flat table with a free list. Each allocation gets
//! a fresh non-zero id, so a stale [`SlotRef`] can never release a slot that
//! has since been reused by another subscriber.

use super::signal::SubscriberSignal;
use crate::error::{Error, Result};
use std::sync::Arc;

/// Handle to an occupied registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotRef {
    pub(crate) index: usize,
    pub(crate) id: u64,
}

struct SlotEntry {
    id: u64,
    channel: usize,
    signal: Arc<SubscriberSignal>,
}

pub(crate) struct Registry {
    entries: Vec<Option<SlotEntry>>,
    free: Vec<usize>,
    next_id: u64,
}

impl Registry {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            next_id: 1,
        }
    }

    /// Reserve room for `max_slots` entries so fan-out and reuse never grow
    /// the table afterwards.
    pub(crate) fn reserve(&mut self, max_slots: usize) -> Result<()> {
        let additional = max_slots.saturating_sub(self.entries.len());
        self.entries
            .try_reserve_exact(additional)
            .map_err(|_| Error::OutOfMemory)?;
        self.free
            .try_reserve_exact(max_slots.saturating_sub(self.free.len()))
            .map_err(|_| Error::OutOfMemory)?;
        Ok(())
    }

    /// Bind `signal` to a free slot. `Ok(None)` when all `max_slots` are taken.
    pub(crate) fn allocate(
        &mut self,
        channel: usize,
        signal: Arc<SubscriberSignal>,
        max_slots: usize,
    ) -> Result<Option<SlotRef>> {
        if self.entries.capacity() < max_slots {
            self.reserve(max_slots)?;
        }

        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            let index = self.entries.len();
            if index >= max_slots {
                return Ok(None);
            }
            self.entries.push(None);
            index
        };

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        self.entries[index] = Some(SlotEntry {
            id,
            channel,
            signal,
        });
        Ok(Some(SlotRef { index, id }))
    }

    /// Free the slot if it still belongs to `slot`. Returns the detached signal.
    pub(crate) fn release(&mut self, slot: SlotRef) -> Option<Arc<SubscriberSignal>> {
        let entry = self.entries.get_mut(slot.index)?;
        if entry.as_ref().map(|current| current.id) != Some(slot.id) {
            return None;
        }
        let removed = entry.take()?;
        self.free.push(slot.index);
        Some(removed.signal)
    }

    /// Visit every signal bound to `channel`. Never allocates.
    #[inline]
    pub(crate) fn for_each_on_channel(&self, channel: usize, mut f: impl FnMut(&SubscriberSignal)) {
        for entry in self.entries.iter().flatten() {
            if entry.channel == channel {
                f(&entry.signal);
            }
        }
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> Arc<SubscriberSignal> {
        Arc::new(SubscriberSignal::new().expect("signal"))
    }

    #[test]
    fn test_allocate_until_full() {
        let mut registry = Registry::new();
        assert!(registry.allocate(0, signal(), 2).unwrap().is_some());
        assert!(registry.allocate(1, signal(), 2).unwrap().is_some());
        assert!(registry.allocate(0, signal(), 2).unwrap().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_released_slot_is_reused_with_new_id() {
        let mut registry = Registry::new();
        let first = registry.allocate(0, signal(), 1).unwrap().expect("slot");
        assert!(registry.release(first).is_some());
        assert_eq!(registry.len(), 0);

        let second = registry.allocate(2, signal(), 1).unwrap().expect("slot");
        assert_eq!(second.index, first.index);
        assert_ne!(second.id, first.id);

        // The stale handle must not evict the new occupant.
        assert!(registry.release(first).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fan_out_filters_by_channel() {
        let mut registry = Registry::new();
        let a = signal();
        let b = signal();
        let c = signal();
        registry.allocate(1, Arc::clone(&a), 4).unwrap();
        registry.allocate(3, Arc::clone(&b), 4).unwrap();
        registry.allocate(1, Arc::clone(&c), 4).unwrap();

        registry.for_each_on_channel(1, SubscriberSignal::raise);

        assert!(a.is_pending());
        assert!(!b.is_pending());
        assert!(c.is_pending());
    }

    #[test]
    fn test_release_out_of_range_is_ignored() {
        let mut registry = Registry::new();
        assert!(registry.release(SlotRef { index: 9, id: 1 }).is_none());
    }
}
