//! Thread-safe FIFO of serialized trade records
//!
//! Single producer (the session worker) and, in practice, a single polling
//! consumer. Strict insertion order, at-least-once across reconnects, no
//! dedup; duplicate trade ids after a reconnect are the consumer's problem.

use log::warn;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Bounded FIFO of serialized trade records.
///
/// `push` always succeeds: when the bound is reached the oldest record is
/// dropped so a starved consumer costs memory-bounded data loss instead of
/// unbounded growth.
pub struct TradeQueue {
    inner: Mutex<VecDeque<String>>,
    available: Condvar,
    capacity: usize,
}

impl TradeQueue {
    /// Create a queue holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a record, waking one waiting consumer.
    pub fn push(&self, record: String) {
        let mut queue = self.inner.lock();

        if queue.len() >= self.capacity {
            queue.pop_front();
            warn!(
                "trade queue full ({} records), dropping oldest",
                self.capacity
            );
        }

        queue.push_back(record);
        drop(queue);
        self.available.notify_one();
    }

    /// Remove and return the oldest record without blocking.
    pub fn try_pop(&self) -> Option<String> {
        self.inner.lock().pop_front()
    }

    /// Remove and return the oldest record, waiting up to `timeout` for one
    /// to arrive.
    pub fn pop_wait(&self, timeout: Duration) -> Option<String> {
        let mut queue = self.inner.lock();

        if let Some(record) = queue.pop_front() {
            return Some(record);
        }

        self.available.wait_for(&mut queue, timeout);
        queue.pop_front()
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop all queued records.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
