// SPDX-License-Identifier: Apache-2.0 OR MIT
// Fixed-size registry of channel slots with a lock-free free-list

use crate::channel::Channel;
use crate::error::PoolError;
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// One registry entry. The channel pointer changes only under the slot's
/// write lock; `epoch` ticks on every arming so the drain can tell a reused
/// slot from its previous occupant.
struct Slot {
    channel: RwLock<Option<Arc<Channel>>>,
    epoch: AtomicU64,
    /// Set when the owning writer released the slot. The slot is not handed
    /// out again until its ring is empty.
    retired: AtomicBool,
}

/// Bounded registry of channels, sized once at engine init.
///
/// Acquisition pops a slot index off a lock-free free-list and arms a fresh
/// ring in that slot; nothing on the write hot path ever touches the pool.
/// The drain loop visits slots in index order, which keeps the consumption
/// order deterministic for a given arrival pattern.
pub(crate) struct ChannelPool {
    slots: Box<[Slot]>,
    free: SegQueue<usize>,
}

impl ChannelPool {
    pub(crate) fn new(slot_count: usize) -> Self {
        let slots: Vec<Slot> = (0..slot_count)
            .map(|_| Slot {
                channel: RwLock::new(None),
                epoch: AtomicU64::new(0),
                retired: AtomicBool::new(false),
            })
            .collect();

        let free = SegQueue::new();
        for idx in 0..slot_count {
            free.push(idx);
        }

        Self {
            slots: slots.into_boxed_slice(),
            free,
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Hand out exclusive ownership of one free slot, armed with a ring of
    /// at least `capacity` lines (rounded up to a power of two).
    ///
    /// Fails fast: no waiting, no allocation beyond the ring itself.
    pub(crate) fn acquire(&self, capacity: usize) -> Result<(usize, Arc<Channel>), PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }
        let Some(idx) = self.free.pop() else {
            return Err(PoolError::Exhausted {
                pool_size: self.slots.len(),
            });
        };

        let channel = Arc::new(Channel::new(capacity.next_power_of_two(), idx as u32));
        {
            let slot = &self.slots[idx];
            let mut guard = slot.channel.write().unwrap();
            *guard = Some(Arc::clone(&channel));
            slot.retired.store(false, Ordering::Release);
            slot.epoch.fetch_add(1, Ordering::Release);
        }
        Ok((idx, channel))
    }

    /// Called from the writer handle's drop. Marks the slot retired and
    /// rearms it immediately when its ring is already empty; otherwise the
    /// drain loop rearms it after consuming the backlog.
    pub(crate) fn release(&self, idx: usize) {
        self.slots[idx].retired.store(true, Ordering::Release);
        self.try_rearm(idx);
    }

    /// Return a retired, fully drained slot to the free-list. Idempotent and
    /// safe to race between the releasing thread and the drain loop: the
    /// slot's write lock arbitrates, and the channel is taken exactly once.
    pub(crate) fn try_rearm(&self, idx: usize) {
        let slot = &self.slots[idx];
        let mut guard = slot.channel.write().unwrap();
        if !slot.retired.load(Ordering::Acquire) {
            return;
        }
        match guard.as_ref() {
            Some(channel) if channel.is_empty() => {}
            _ => return,
        }
        *guard = None;
        slot.retired.store(false, Ordering::Release);
        self.free.push(idx);
    }

    /// Current occupant of a slot, if any. Drain side.
    pub(crate) fn channel_at(&self, idx: usize) -> Option<Arc<Channel>> {
        self.slots[idx].channel.read().unwrap().clone()
    }

    pub(crate) fn epoch_at(&self, idx: usize) -> u64 {
        self.slots[idx].epoch.load(Ordering::Acquire)
    }

    pub(crate) fn is_retired(&self, idx: usize) -> bool {
        self.slots[idx].retired.load(Ordering::Acquire)
    }

    /// Number of slots currently available for acquisition.
    pub(crate) fn free_slots(&self) -> usize {
        self.free.len()
    }
}
