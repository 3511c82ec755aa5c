//! Several producers and several consumers sharing one ring.
//!
//! Each producer publishes a run of sequence-stamped entries followed
//! by its own sentinel; each consumer reads until it has seen a
//! sentinel from every producer, verifying `payload == sequence` for
//! everything else along the way.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use flux::RingBuffer;

const CAPACITY: usize = 16;
const MAX_CONSUMERS: usize = 2;
const PRODUCERS: usize = 3;
const CONSUMERS: usize = 2;
const PER_PRODUCER: u64 = 400;
const SENTINEL: u64 = u64::MAX;

fn main() {
    tracing_subscriber::fmt::init();

    let ring: Arc<RingBuffer<u64, CAPACITY, MAX_CONSUMERS>> = RingBuffer::new().unwrap();
    let sentinels_seen = Arc::new(AtomicUsize::new(0));

    let mut producers = Vec::with_capacity(PRODUCERS);
    for id in 0..PRODUCERS {
        let ring = ring.clone();
        producers.push(thread::spawn(move || {
            for _ in 0..PER_PRODUCER {
                let seq = ring.claim();
                unsafe {
                    *ring.entry_mut(seq) = seq;
                }
                ring.commit(seq);
            }
            let seq = ring.claim();
            unsafe {
                *ring.entry_mut(seq) = SENTINEL;
            }
            ring.commit(seq);
            println!("producer {id}: done");
        }));
    }

    let mut consumers = Vec::with_capacity(CONSUMERS);
    for id in 0..CONSUMERS {
        let ring = ring.clone();
        let sentinels_seen = sentinels_seen.clone();
        consumers.push(thread::spawn(move || {
            let mut handle = ring.register();
            let mut non_sentinel = 0u64;
            let mut sentinels = 0usize;
            loop {
                let upto = ring.wait_for_published(&mut handle);
                let start = handle.sequence.min(upto);
                for seq in start..=upto {
                    let value = unsafe { *ring.entry(seq) };
                    if value == SENTINEL {
                        sentinels += 1;
                        sentinels_seen.fetch_add(1, Ordering::Relaxed);
                    } else {
                        assert_eq!(value, seq, "payload must equal its own sequence");
                        non_sentinel += 1;
                    }
                }
                ring.release(&handle, upto);
                handle.sequence = upto + 1;
                if sentinels >= PRODUCERS {
                    break;
                }
            }
            println!("consumer {id}: read {non_sentinel} entries, {sentinels} sentinels");
            non_sentinel
        }));
    }

    for p in producers {
        p.join().unwrap();
    }
    let mut total = 0u64;
    for c in consumers {
        total += c.join().unwrap();
    }

    let expected = PRODUCERS as u64 * PER_PRODUCER * CONSUMERS as u64;
    println!("total non-sentinel reads across all consumers: {total} (expected {expected})");
    assert_eq!(total, expected);
}
