// Per-producer SPSC ring buffer and the owning writer handle
//
// Each producer thread holds exactly one ChannelWriter; the drain thread is
// the only reader. Decomposing the N-producer problem into N independent
// single-producer rings removes every lock from the hot path: the producer
// owns write_seq and the slot contents, the drain owns read_seq, and
// publication rides on a release store of write_seq.

use crate::config::OverflowPolicy;
use crate::engine::EngineShared;
use crate::error::WriteError;
use crate::line::{LogLine, TextBuf};
use crate::severity::Severity;
use crossbeam_utils::Backoff;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache-aligned wrapper to prevent false sharing
#[repr(align(64))]
struct CacheAligned<T>(T);

/// Lock-free single-producer single-consumer ring of [`LogLine`] slots.
///
/// Invariant: `read_seq <= write_seq <= read_seq + capacity`. The producer
/// never claims a slot the drain has not consumed; a rejected write leaves
/// both sequences untouched.
pub(crate) struct Channel {
    slots: Box<[UnsafeCell<LogLine>]>,
    capacity: usize,
    write_seq: CacheAligned<AtomicU64>,
    read_seq: CacheAligned<AtomicU64>,
    lost_total: AtomicU64,
    producer_id: u32,
}

// SAFETY: Channel is Sync because
// - only the owning producer writes slots and write_seq (single writer by
//   construction: the ChannelWriter handle is not cloneable and write takes
//   &mut self)
// - only the drain thread advances read_seq
// - a slot is only overwritten after the fullness check proves the drain
//   consumed its previous occupant, and the release store of write_seq
//   publishes the slot contents before the drain's acquire load can see them
unsafe impl Sync for Channel {}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("capacity", &self.capacity)
            .field("producer_id", &self.producer_id)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Create a ring with `capacity` slots (must be a power of two).
    pub(crate) fn new(capacity: usize, producer_id: u32) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be power of 2");

        let slots: Vec<UnsafeCell<LogLine>> = (0..capacity)
            .map(|_| UnsafeCell::new(LogLine::empty()))
            .collect();

        Self {
            slots: slots.into_boxed_slice(),
            capacity,
            write_seq: CacheAligned(AtomicU64::new(0)),
            read_seq: CacheAligned(AtomicU64::new(0)),
            lost_total: AtomicU64::new(0),
            producer_id,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn producer_id(&self) -> u32 {
        self.producer_id
    }

    /// Producer side: copy `line` into the next slot and publish it.
    ///
    /// Returns false without touching anything when the ring is full; the
    /// caller decides whether that becomes a drop or a wait.
    pub(crate) fn try_write(&self, line: &LogLine) -> bool {
        let seq = self.write_seq.0.load(Ordering::Relaxed);
        let read = self.read_seq.0.load(Ordering::Acquire);
        if seq - read >= self.capacity as u64 {
            return false;
        }

        let pos = (seq as usize) & (self.capacity - 1);
        // SAFETY: single producer, and the fullness check above proved the
        // drain consumed this slot's previous occupant (acquire on read_seq
        // orders that consumption before this overwrite).
        unsafe {
            let slot = &mut *self.slots[pos].get();
            slot.clone_from(line);
            slot.seq = seq;
        }
        // Publish: the drain's acquire load of write_seq sees the slot whole.
        self.write_seq.0.store(seq + 1, Ordering::Release);
        true
    }

    /// Producer side: count one line discarded because the ring was full.
    pub(crate) fn record_loss(&self) {
        self.lost_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Total lines discarded since this ring was armed.
    pub(crate) fn lost_total(&self) -> u64 {
        self.lost_total.load(Ordering::Relaxed)
    }

    /// Drain side: iterator over the lines written up to the moment of the
    /// call, advancing `read_seq` as each is taken. Bounded by the backlog
    /// at entry, so a fast producer cannot pin the drain on one channel.
    pub(crate) fn drain_available(&self) -> DrainIter<'_> {
        DrainIter {
            channel: self,
            end: self.write_seq.0.load(Ordering::Acquire),
        }
    }

    /// Number of lines currently queued.
    pub(crate) fn len(&self) -> usize {
        let write = self.write_seq.0.load(Ordering::Relaxed);
        let read = self.read_seq.0.load(Ordering::Relaxed);
        (write.saturating_sub(read) as usize).min(self.capacity)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drain-side iterator returned by [`Channel::drain_available`].
pub(crate) struct DrainIter<'a> {
    channel: &'a Channel,
    end: u64,
}

impl Iterator for DrainIter<'_> {
    type Item = LogLine;

    fn next(&mut self) -> Option<LogLine> {
        let read = self.channel.read_seq.0.load(Ordering::Relaxed);
        if read >= self.end {
            return None;
        }
        let pos = (read as usize) & (self.channel.capacity - 1);
        // SAFETY: read < end <= write_seq, so the producer published this
        // slot and will not overwrite it until read_seq advances past it.
        let line = unsafe { (*self.channel.slots[pos].get()).clone() };
        // Release: hand the slot back to the producer only after the copy.
        self.channel.read_seq.0.store(read + 1, Ordering::Release);
        Some(line)
    }
}

/// Exclusive producer handle for one pool slot.
///
/// Held by exactly one thread; the handle cannot be cloned and writing takes
/// `&mut self`, so the single-writer contract of the underlying ring is
/// enforced at the type level. Dropping the handle releases the slot back to
/// the pool.
pub struct ChannelWriter {
    channel: Arc<Channel>,
    shared: Arc<EngineShared>,
    slot: usize,
}

impl ChannelWriter {
    pub(crate) fn new(channel: Arc<Channel>, shared: Arc<EngineShared>, slot: usize) -> Self {
        Self {
            channel,
            shared,
            slot,
        }
    }

    /// Write a pre-rendered line at `severity`.
    ///
    /// Lines below the engine's minimum severity are discarded up front
    /// without touching the ring or any counter, and report success. On a
    /// full ring the outcome depends on the engine's overflow policy: Drop
    /// counts the line in `lost_total` and returns [`WriteError::Dropped`];
    /// Block suspends until the drain frees a slot.
    pub fn write(&mut self, severity: Severity, text: &str) -> Result<(), WriteError> {
        if !severity.passes(self.min_severity()) {
            return Ok(());
        }
        self.write_line(severity, text)
    }

    /// Like [`write`](Self::write), but renders format arguments into a
    /// bounded stack buffer first. No heap allocation on this path.
    pub fn write_fmt(
        &mut self,
        severity: Severity,
        args: fmt::Arguments<'_>,
    ) -> Result<(), WriteError> {
        if !severity.passes(self.min_severity()) {
            return Ok(());
        }
        let mut buf = TextBuf::new();
        // TextBuf never errors; overflow is truncated.
        let _ = fmt::Write::write_fmt(&mut buf, args);
        self.write_line(severity, buf.as_str())
    }

    fn write_line(&mut self, severity: Severity, text: &str) -> Result<(), WriteError> {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(WriteError::ShutDown);
        }

        let line = LogLine::new(severity, self.channel.producer_id(), text);
        if self.channel.try_write(&line) {
            return Ok(());
        }

        match self.shared.policy {
            OverflowPolicy::Drop => {
                self.channel.record_loss();
                Err(WriteError::Dropped)
            }
            OverflowPolicy::Block => {
                // Wake condition: the drain advances read_seq past the slot
                // this write needs. Spins briefly, then yields.
                let backoff = Backoff::new();
                loop {
                    if !self.shared.running.load(Ordering::Acquire) {
                        return Err(WriteError::ShutDown);
                    }
                    if self.channel.try_write(&line) {
                        return Ok(());
                    }
                    backoff.snooze();
                }
            }
        }
    }

    /// Pool slot index of this channel, stamped on every line it emits.
    pub fn producer_id(&self) -> u32 {
        self.channel.producer_id()
    }

    /// Slot count of the underlying ring.
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Lines discarded on this channel since acquisition.
    pub fn lost_total(&self) -> u64 {
        self.channel.lost_total()
    }

    /// Lines written but not yet drained.
    pub fn backlog(&self) -> usize {
        self.channel.len()
    }

    /// Return the slot to the pool. Equivalent to dropping the handle; the
    /// drain finishes any queued lines before the slot is reused.
    pub fn release(self) {}

    fn min_severity(&self) -> Severity {
        Severity::from_u8(self.shared.min_severity.load(Ordering::Relaxed))
            .unwrap_or(Severity::Info)
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.shared.pool.release(self.slot);
    }
}

impl fmt::Debug for ChannelWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("producer_id", &self.producer_id())
            .field("capacity", &self.capacity())
            .field("lost_total", &self.lost_total())
            .finish()
    }
}
