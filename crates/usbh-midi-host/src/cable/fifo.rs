//! Fixed-capacity inbound byte FIFO, split into producer and consumer halves.
//!
//! - Producer: host receive path ([`FifoProducer::write`])
//! - Consumer: cable transport feeding the parser ([`FifoConsumer::read`])
//!
//! Backed by a `ringbuf` heap ring allocated once. The halves may live in
//! different contexts without locks as long as each has exactly one owner.
//! Writes never overwrite: a write larger than the free space stores the
//! prefix that fits, drops the rest and latches the shared overflow flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

pub struct ByteFifo {
    rb: HeapRb<u8>,
}

impl ByteFifo {
    /// # Panics
    /// If `capacity` is 0. `HostConfig::validate` rules this out.
    pub fn new(capacity: usize) -> Self {
        Self {
            rb: HeapRb::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.rb.capacity().get()
    }

    pub fn split(self) -> (FifoProducer, FifoConsumer) {
        let overflow = Arc::new(AtomicBool::new(false));
        let (prod, cons) = self.rb.split();
        (
            FifoProducer {
                prod,
                overflow: overflow.clone(),
            },
            FifoConsumer { cons, overflow },
        )
    }
}

pub struct FifoProducer {
    prod: HeapProd<u8>,
    overflow: Arc<AtomicBool>,
}

impl FifoProducer {
    /// Returns the number of bytes stored, which is less than `bytes.len()` on overflow.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let written = self.prod.push_slice(bytes);
        if written < bytes.len() {
            self.overflow.store(true, Ordering::Release);
        }
        written
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.prod.vacant_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.prod.capacity().get()
    }

    /// Set by a short `write`, cleared by the next successful read.
    #[inline]
    pub fn overflow(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }
}

pub struct FifoConsumer {
    cons: HeapCons<u8>,
    overflow: Arc<AtomicBool>,
}

impl FifoConsumer {
    /// `None` on underflow. A successful read clears the overflow flag.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        let byte = self.cons.try_pop()?;
        self.overflow.store(false, Ordering::Release);
        Some(byte)
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.cons.occupied_len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cons.capacity().get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }

    #[inline]
    pub fn overflow(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }

    /// Discard everything buffered and reset the overflow flag.
    pub fn clear(&mut self) {
        self.cons.clear();
        self.overflow.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for FifoProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoProducer")
            .field("capacity", &self.capacity())
            .field("free", &self.free())
            .field("overflow", &self.overflow())
            .finish()
    }
}

impl std::fmt::Debug for FifoConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoConsumer")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("overflow", &self.overflow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fifo(capacity: usize) -> (FifoProducer, FifoConsumer) {
        ByteFifo::new(capacity).split()
    }

    #[test]
    fn test_write_then_read() {
        let (mut tx, mut rx) = fifo(8);
        assert_eq!(tx.write(&[1, 2, 3]), 3);
        assert_eq!(rx.available(), 3);
        assert_eq!(tx.free(), 5);
        assert_eq!(rx.read(), Some(1));
        assert_eq!(rx.read(), Some(2));
        assert_eq!(rx.read(), Some(3));
        assert_eq!(rx.read(), None);
    }

    #[test]
    fn test_overflow_keeps_prefix() {
        let (mut tx, mut rx) = fifo(4);
        assert_eq!(tx.write(&[10, 11, 12, 13, 14, 15]), 4);
        assert!(tx.overflow() && rx.overflow());
        assert_eq!(tx.write(&[16]), 0);
        let drained: Vec<u8> = std::iter::from_fn(|| rx.read()).collect();
        assert_eq!(drained, vec![10, 11, 12, 13]);
        assert!(rx.is_empty());
        assert!(!rx.overflow());
    }

    #[test]
    fn test_clear() {
        let (mut tx, mut rx) = fifo(4);
        tx.write(&[1, 2, 3, 4, 5]);
        rx.clear();
        assert_eq!(rx.available(), 0);
        assert!(!tx.overflow());
        assert_eq!(rx.capacity(), 4);
        assert_eq!(rx.read(), None);
        assert_eq!(tx.free(), 4);
    }

    #[test]
    fn test_wraps_around() {
        let (mut tx, mut rx) = fifo(3);
        for round in 0..10u8 {
            assert_eq!(tx.write(&[round, round + 1]), 2);
            assert_eq!(rx.read(), Some(round));
            assert_eq!(rx.read(), Some(round + 1));
        }
    }

    #[test]
    fn test_halves_on_different_threads() {
        let (mut tx, mut rx) = fifo(16);
        let producer = std::thread::spawn(move || {
            for byte in 0..200u8 {
                while tx.write(&[byte]) == 0 {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = Vec::new();
        while received.len() < 200 {
            match rx.read() {
                Some(byte) => received.push(byte),
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert_eq!(received, (0..200u8).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn prop_fifo_preserves_order(chunks in prop::collection::vec(
            prop::collection::vec(any::<u8>(), 0..16), 0..8)
        ) {
            let capacity = 128;
            let (mut tx, mut rx) = fifo(capacity);
            let mut expected = Vec::new();
            for chunk in &chunks {
                if expected.len() + chunk.len() > capacity {
                    break;
                }
                prop_assert_eq!(tx.write(chunk), chunk.len());
                expected.extend_from_slice(chunk);
            }
            let drained: Vec<u8> = std::iter::from_fn(|| rx.read()).collect();
            prop_assert_eq!(drained, expected);
        }

        #[test]
        fn prop_short_write_means_full(capacity in 1usize..32, len in 0usize..64) {
            let (mut tx, _rx) = fifo(capacity);
            let bytes = vec![0xAA; len];
            let written = tx.write(&bytes);
            prop_assert_eq!(written, len.min(capacity));
            prop_assert_eq!(tx.overflow(), written < len);
            if written < len {
                prop_assert_eq!(tx.free(), 0);
            }
        }
    }
}
