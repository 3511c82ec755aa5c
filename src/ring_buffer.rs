//! The ring buffer aggregate: cursors, consumer registry, slot storage,
//! and the claim/commit/wait/release protocol that ties them together.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_utils::Backoff;

use crate::error::{Result, RingBufferError};
use crate::padded::{PaddedSequence, VACANT};
use crate::slot::Slot;

/// A consumer's registration: which registry slot it owns, and the
/// next sequence it has not yet read. [`RingBuffer::wait_for_published`]
/// never touches this field; it only reads it as the wait target and
/// hands back the newly published upper bound. The caller reads the
/// batch `sequence..=upto` and is responsible for advancing `sequence`
/// to `upto + 1` once it has processed (and released) that batch — see
/// the crate-level example.
pub struct ConsumerHandle {
    slot_index: usize,
    /// The next sequence this consumer has not yet read.
    pub sequence: u64,
}

impl ConsumerHandle {
    /// The registry slot this handle owns.
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }
}

/// A lock-free multi-producer / multi-consumer ring buffer.
///
/// `T` is the payload type, `CAPACITY` the slot count (a power of two,
/// `>= 2`), `MAX_CONSUMERS` the fixed size of the consumer registry
/// (`>= 1`). Both are `const` generics so indexing (`sequence & mask`)
/// and the registry scan are monomorphized per instantiation rather than
/// computed from runtime fields.
///
/// Construct with [`RingBuffer::new`] or the [`RingBufferBuilder`]; wrap
/// the result in an [`Arc`] to share it across publisher and consumer
/// threads; there is no other per-instance state, so the type works
/// equally well on the stack, behind a `static`, or on the heap.
pub struct RingBuffer<T, const CAPACITY: usize, const MAX_CONSUMERS: usize> {
    write_cursor: PaddedSequence,
    published_cursor: PaddedSequence,
    slowest_consumer: PaddedSequence,
    consumers: [PaddedSequence; MAX_CONSUMERS],
    slots: Box<[Slot<T>]>,
    mask: u64,
}

impl<T, const CAPACITY: usize, const MAX_CONSUMERS: usize> RingBuffer<T, CAPACITY, MAX_CONSUMERS>
where
    T: Default + Send,
{
    /// Validate `CAPACITY`/`MAX_CONSUMERS` and construct a freshly
    /// initialized ring buffer: all slots default-valued, every consumer
    /// registry slot `VACANT`, cursors at zero.
    pub fn new() -> Result<Arc<Self>> {
        if CAPACITY < 2 || !CAPACITY.is_power_of_two() {
            return Err(RingBufferError::MisconfiguredCapacity { capacity: CAPACITY });
        }
        if MAX_CONSUMERS == 0 {
            return Err(RingBufferError::MisconfiguredConsumers);
        }

        let slots: Box<[Slot<T>]> = (0..CAPACITY).map(|_| Slot::default()).collect();
        if slots.len() != CAPACITY {
            return Err(RingBufferError::AllocationFailure {
                requested_bytes: CAPACITY * std::mem::size_of::<Slot<T>>(),
            });
        }

        let consumers = std::array::from_fn(|_| PaddedSequence::new(VACANT));

        Ok(Arc::new(Self {
            write_cursor: PaddedSequence::new(0),
            published_cursor: PaddedSequence::new(0),
            slowest_consumer: PaddedSequence::new(VACANT),
            consumers,
            slots,
            mask: (CAPACITY as u64) - 1,
        }))
    }

    #[inline(always)]
    fn index(&self, sequence: u64) -> usize {
        (sequence & self.mask) as usize
    }

    /// Read-only view of the entry at `sequence`.
    ///
    /// # Safety
    ///
    /// `sequence` must be `<= ` the caller's consumer handle's current
    /// upper bound (i.e. already established as published via
    /// [`RingBuffer::wait_for_published`]).
    #[inline(always)]
    pub unsafe fn entry(&self, sequence: u64) -> &T {
        self.slots[self.index(sequence)].show()
    }

    /// Exclusive, mutable view of the entry at `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must currently hold `sequence` from a successful claim
    /// and must not have committed it yet.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn entry_mut(&self, sequence: u64) -> &mut T {
        self.slots[self.index(sequence)].acquire()
    }

    // ---- consumer registry (§4.2) ----------------------------------

    /// Register a new consumer, retrying indefinitely if the registry
    /// is currently full (by contract the caller sizes `MAX_CONSUMERS`
    /// to demand).
    pub fn register(&self) -> ConsumerHandle {
        let backoff = Backoff::new();
        loop {
            for slot_index in 0..MAX_CONSUMERS {
                let published = self.published_cursor.load(Ordering::Acquire);
                if self.consumers[slot_index]
                    .compare_exchange(VACANT, published, Ordering::Release, Ordering::Relaxed)
                    .is_ok()
                {
                    let sequence = if published == 0 {
                        let _ = self.consumers[slot_index].compare_exchange(
                            0,
                            1,
                            Ordering::Release,
                            Ordering::Relaxed,
                        );
                        1
                    } else {
                        published
                    };
                    tracing::debug!(slot_index, sequence, "consumer registered");
                    return ConsumerHandle { slot_index, sequence };
                }
            }
            tracing::trace!(max_consumers = MAX_CONSUMERS, "consumer registry full, retrying");
            backoff.snooze();
        }
    }

    /// Release a consumer's registry slot. The handle must not be used
    /// afterward; it is consumed to make that a compile-time fact in the
    /// ordinary case.
    pub fn unregister(&self, handle: ConsumerHandle) {
        self.consumers[handle.slot_index].store(VACANT, Ordering::Release);
        tracing::debug!(slot_index = handle.slot_index, "consumer unregistered");
    }

    // ---- consumer barrier (§4.3) -----------------------------------

    /// Block until `handle.sequence` (the next unread sequence) has been
    /// published, then return the current published cursor. `handle`
    /// is not modified: the caller reads the batch `handle.sequence
    /// ..= returned`, releases through the returned value, and only
    /// then advances `handle.sequence` to `returned + 1` for the next
    /// call. This keeps "next to read" and "just published" as two
    /// distinct values so a consumer that falls behind still reads
    /// every sequence in between instead of jumping straight to the
    /// latest one.
    pub fn wait_for_published(&self, handle: &mut ConsumerHandle) -> u64 {
        let backoff = Backoff::new();
        while handle.sequence > self.published_cursor.load(Ordering::Relaxed) {
            backoff.snooze();
        }
        self.published_cursor.load(Ordering::Acquire)
    }

    /// Non-blocking variant: `None` if nothing new is published yet,
    /// otherwise `Some(published)`. Leaves `handle` untouched, same as
    /// the blocking variant.
    pub fn try_wait_for_published(&self, handle: &mut ConsumerHandle) -> Option<u64> {
        if handle.sequence > self.published_cursor.load(Ordering::Relaxed) {
            return None;
        }
        Some(self.published_cursor.load(Ordering::Acquire))
    }

    /// Record that this consumer has finished processing through
    /// `upto_sequence`, inclusive.
    pub fn release(&self, handle: &ConsumerHandle, upto_sequence: u64) {
        self.consumers[handle.slot_index].store(upto_sequence, Ordering::Relaxed);
    }

    // ---- publisher port (§4.4) --------------------------------------

    fn slowest_consumer_of(&self, claimed: u64, order: Ordering) -> u64 {
        let mut slowest = VACANT;
        for consumer in &self.consumers {
            let seq = consumer.load(order);
            if seq < slowest {
                slowest = seq;
            }
        }
        if slowest == VACANT {
            slowest = claimed - (claimed & self.mask);
        }
        slowest
    }

    /// Claim the next sequence, blocking (spin-then-yield) while doing
    /// so would lap the slowest consumer by more than `CAPACITY`.
    pub fn claim(&self) -> u64 {
        let claimed = 1 + self.write_cursor.fetch_add(1, Ordering::Release);
        let backoff = Backoff::new();
        loop {
            let slowest = self.slowest_consumer_of(claimed, Ordering::Acquire);
            self.slowest_consumer.store(slowest, Ordering::Release);
            if (claimed - slowest) <= self.mask {
                return claimed;
            }
            tracing::trace!(claimed, slowest, "publisher back-pressured, waiting for consumers");
            backoff.snooze();
        }
    }

    /// Non-blocking claim: `None` if claiming right now would lap the
    /// slowest consumer; otherwise the sequence, with `write_cursor`
    /// advanced by exactly one via a successful CAS.
    pub fn try_claim(&self) -> Option<u64> {
        let claimed = 1 + self.write_cursor.load(Ordering::Relaxed);
        let slowest = self.slowest_consumer_of(claimed, Ordering::Acquire);
        self.slowest_consumer.store(slowest, Ordering::Release);
        if (claimed - slowest) > self.mask {
            return None;
        }
        self.write_cursor
            .compare_exchange(claimed - 1, claimed, Ordering::Relaxed, Ordering::Relaxed)
            .ok()
    }

    /// Commit `claimed`, blocking (spin-then-yield) until every
    /// earlier-claimed sequence has already committed, then advance the
    /// published cursor by one.
    pub fn commit(&self, claimed: u64) {
        let backoff = Backoff::new();
        while self.published_cursor.load(Ordering::Relaxed) != claimed - 1 {
            backoff.snooze();
        }
        self.published_cursor.fetch_add(1, Ordering::Release);
    }

    /// Non-blocking commit: `false` if an earlier sequence hasn't
    /// committed yet, otherwise advances the published cursor and
    /// returns `true`.
    pub fn try_commit(&self, claimed: u64) -> bool {
        if self.published_cursor.load(Ordering::Relaxed) != claimed - 1 {
            return false;
        }
        self.published_cursor.fetch_add(1, Ordering::Release);
        true
    }

    /// The highest sequence currently safe to read. Exposed for
    /// diagnostics and tests; the protocol itself only ever needs
    /// [`RingBuffer::wait_for_published`].
    pub fn published_sequence(&self) -> u64 {
        self.published_cursor.load(Ordering::Acquire)
    }

    /// The next sequence that will be handed out by a claim. Exposed
    /// for diagnostics and tests.
    pub fn write_sequence(&self) -> u64 {
        self.write_cursor.load(Ordering::Acquire)
    }

    /// The ring's capacity (== `CAPACITY`).
    pub fn capacity(&self) -> usize {
        CAPACITY
    }
}

/// Ergonomic construction surface mirroring the builder pattern used by
/// this codebase's sibling ring buffer variants. Validates `CAPACITY`
/// and `MAX_CONSUMERS` up front and produces the same errors
/// [`RingBuffer::new`] would; it carries no state of its own beyond the
/// const generics already fixed in its type.
pub struct RingBufferBuilder<T, const CAPACITY: usize, const MAX_CONSUMERS: usize> {
    _marker: std::marker::PhantomData<T>,
}

impl<T, const CAPACITY: usize, const MAX_CONSUMERS: usize> Default
    for RingBufferBuilder<T, CAPACITY, MAX_CONSUMERS>
{
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, const CAPACITY: usize, const MAX_CONSUMERS: usize>
    RingBufferBuilder<T, CAPACITY, MAX_CONSUMERS>
where
    T: Default + Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and allocate. Equivalent to `RingBuffer::new()`.
    pub fn build(self) -> Result<Arc<RingBuffer<T, CAPACITY, MAX_CONSUMERS>>> {
        RingBuffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_capacity() {
        let err = RingBuffer::<u64, 3, 1>::new().unwrap_err();
        assert!(matches!(err, RingBufferError::MisconfiguredCapacity { capacity: 3 }));
    }

    #[test]
    fn rejects_capacity_below_two() {
        assert!(RingBuffer::<u64, 1, 1>::new().is_err());
    }

    #[test]
    fn rejects_zero_consumers() {
        let err = RingBuffer::<u64, 4, 0>::new().unwrap_err();
        assert!(matches!(err, RingBufferError::MisconfiguredConsumers));
    }

    #[test]
    fn fresh_buffer_has_zeroed_cursors() {
        let rb = RingBuffer::<u64, 8, 2>::new().unwrap();
        assert_eq!(rb.write_sequence(), 0);
        assert_eq!(rb.published_sequence(), 0);
    }

    #[test]
    fn claim_and_commit_advance_in_order() {
        let rb = RingBuffer::<u64, 8, 1>::new().unwrap();
        let s1 = rb.claim();
        let s2 = rb.claim();
        assert_eq!(s1, 1);
        assert_eq!(s2, 2);
        unsafe {
            *rb.entry_mut(s1) = s1;
            *rb.entry_mut(s2) = s2;
        }
        rb.commit(s1);
        assert_eq!(rb.published_sequence(), 1);
        rb.commit(s2);
        assert_eq!(rb.published_sequence(), 2);
    }

    #[test]
    fn register_coerces_zero_published_to_one() {
        let rb = RingBuffer::<u64, 8, 2>::new().unwrap();
        let handle = rb.register();
        assert_eq!(handle.sequence, 1);
    }

    #[test]
    fn register_starts_at_live_published_cursor() {
        let rb = RingBuffer::<u64, 16, 2>::new().unwrap();
        for _ in 0..5 {
            let s = rb.claim();
            rb.commit(s);
        }
        let handle = rb.register();
        assert_eq!(handle.sequence, 5);
    }

    #[test]
    fn unregister_frees_the_slot_for_reuse() {
        let rb = RingBuffer::<u64, 8, 1>::new().unwrap();
        let h1 = rb.register();
        let idx = h1.slot_index();
        rb.unregister(h1);
        let h2 = rb.register();
        assert_eq!(h2.slot_index(), idx);
    }

    #[test]
    fn zero_consumers_permits_filling_capacity() {
        let rb = RingBuffer::<u64, 4, 1>::new().unwrap();
        // No registered consumer: slowest defaults to claimed - (claimed & mask),
        // so a publisher can claim a full ring of uncommitted slots without
        // being spuriously back-pressured by an empty registry.
        let claims: Vec<u64> = (0..4).map(|_| rb.try_claim().expect("claim should succeed")).collect();
        assert_eq!(claims, vec![1, 2, 3, 4]);
        for s in claims {
            rb.commit(s);
        }
        assert_eq!(rb.published_sequence(), 4);
    }

    #[test]
    fn non_blocking_claim_respects_back_pressure() {
        let rb = RingBuffer::<u64, 2, 1>::new().unwrap();
        let mut handle = rb.register();
        handle.sequence = 1;

        let s1 = rb.try_claim().unwrap();
        rb.commit(s1);
        let s2 = rb.try_claim().unwrap();
        rb.commit(s2);
        // consumer hasn't released anything yet; capacity is 2, so a third
        // claim would lap it.
        assert!(rb.try_claim().is_none());

        let published = rb.try_wait_for_published(&mut handle).unwrap();
        assert_eq!(published, 2);
        rb.release(&handle, published);

        assert!(rb.try_claim().is_some());
    }

    #[test]
    fn wait_for_published_blocks_until_commit() {
        let rb = RingBuffer::<u64, 8, 1>::new().unwrap();
        let mut handle = rb.register();
        assert!(rb.try_wait_for_published(&mut handle).is_none());
        let s = rb.claim();
        rb.commit(s);
        let published = rb.wait_for_published(&mut handle);
        assert_eq!(published, 1);
    }
}
