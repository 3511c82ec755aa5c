//! Single-producer / single-consumer walkthrough.
//!
//! Publishes a run of sequence-stamped entries followed by a sentinel,
//! and has the consumer read them back in order.

use std::sync::Arc;
use std::thread;

use flux::RingBuffer;

const CAPACITY: usize = 16;
const MAX_CONSUMERS: usize = 2;
const COUNT: u64 = 400;
const SENTINEL: u64 = u64::MAX;

fn main() {
    tracing_subscriber::fmt::init();

    let ring: Arc<RingBuffer<u64, CAPACITY, MAX_CONSUMERS>> = RingBuffer::new().unwrap();

    let consumer_ring = ring.clone();
    let consumer = thread::spawn(move || {
        let mut handle = consumer_ring.register();
        let mut received = 0u64;
        loop {
            let upto = consumer_ring.wait_for_published(&mut handle);
            let start = handle.sequence.min(upto);
            for seq in start..=upto {
                let value = unsafe { *consumer_ring.entry(seq) };
                if value == SENTINEL {
                    println!("consumer: saw sentinel at sequence {seq}, received {received}");
                    return received;
                }
                assert_eq!(value, seq, "payload must equal its own sequence");
                received += 1;
            }
            consumer_ring.release(&handle, upto);
            handle.sequence = upto + 1;
        }
    });

    for _ in 0..COUNT {
        let seq = ring.claim();
        unsafe {
            *ring.entry_mut(seq) = seq;
        }
        ring.commit(seq);
    }
    let sentinel_seq = ring.claim();
    unsafe {
        *ring.entry_mut(sentinel_seq) = SENTINEL;
    }
    ring.commit(sentinel_seq);

    let received = consumer.join().unwrap();
    println!("producer: published {COUNT} entries, consumer received {received}");
    assert_eq!(received, COUNT);
}
