//! Flux: a lock-free multi-producer / multi-consumer ring buffer
//! implementing the LMAX Disruptor protocol.
//!
//! Publishers claim a sequence number, write a payload into the slot it
//! maps to, then commit; commits are serialized in strict claim order so
//! the published cursor only ever advances over fully-written slots.
//! Consumers register dynamically, wait for the published cursor to
//! advance past their last-read point, read in batches, then release
//! what they've finished with so publishers know it's safe to reuse.
//!
//! Capacity and the maximum number of concurrently-registered consumers
//! are `const` generic parameters on [`RingBuffer`], so indexing and the
//! consumer-registry scan are monomorphized per instantiation:
//!
//! ```
//! use flux::RingBuffer;
//!
//! let ring = RingBuffer::<u64, 16, 4>::new().unwrap();
//! let mut consumer = ring.register();
//!
//! let seq = ring.claim();
//! unsafe {
//!     *ring.entry_mut(seq) = seq;
//! }
//! ring.commit(seq);
//!
//! let batch_start = consumer.sequence;
//! let upto = ring.wait_for_published(&mut consumer);
//! for s in batch_start..=upto {
//!     let value = unsafe { ring.entry(s) };
//!     assert_eq!(*value, s);
//! }
//! ring.release(&consumer, upto);
//! consumer.sequence = upto + 1; // next call's target
//! ```
//!
//! See [`RingBuffer`] for the full claim/commit/wait/release protocol,
//! and the crate's `demos/` directory for multi-threaded usage.

pub mod constants;
pub mod error;
mod padded;
mod ring_buffer;
mod slot;

pub use error::{Result, RingBufferError};
pub use padded::VACANT;
pub use ring_buffer::{ConsumerHandle, RingBuffer, RingBufferBuilder};
pub use slot::Slot;
