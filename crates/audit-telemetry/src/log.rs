//! Bounded event log.
//!
//! Provides:
//! - **RingBuffer**: fixed-capacity circular buffer that hands back the
//!   item it evicts and supports removal from the oldest end
//! - **BoundedEventLog**: the shared, thread-safe FIFO window of recent
//!   [`EventRecord`]s that every producer, reader and the drainer touch

use std::sync::Arc;

use authz_audit_types::EventRecord;
use parking_lot::Mutex;

/// Default retention window.
pub const MAX_CAPACITY: usize = 10_000;

// ── Ring Buffer ─────────────────────────────────────────────────────────

/// A bounded circular buffer.
///
/// When full, pushing overwrites the oldest item and returns it.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<Option<T>>,
    /// Next write slot.
    head: usize,
    len: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a ring buffer with the given capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            buffer: vec![None; cap],
            head: 0,
            len: 0,
        }
    }

    /// Push an item at the newest end. Returns the evicted oldest item
    /// when the buffer was already full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.len == self.buffer.len() {
            self.buffer[self.head].take()
        } else {
            self.len += 1;
            None
        };
        self.buffer[self.head] = Some(item);
        self.head = (self.head + 1) % self.buffer.len();
        evicted
    }

    /// Remove and return the oldest item.
    pub fn pop_oldest(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let tail = self.tail();
        self.len -= 1;
        self.buffer[tail].take()
    }

    /// Remove up to `n` oldest items, oldest first.
    pub fn drain_oldest(&mut self, n: usize) -> Vec<T> {
        let take = n.min(self.len);
        let mut out = Vec::with_capacity(take);
        for _ in 0..take {
            match self.pop_oldest() {
                Some(item) => out.push(item),
                None => break,
            }
        }
        out
    }

    /// Iterate over items in insertion order (oldest first).
    pub fn iter(&self) -> RingBufferIter<'_, T> {
        RingBufferIter {
            buffer: &self.buffer,
            pos: self.tail(),
            remaining: self.len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Utilization as a fraction (0.0 to 1.0).
    pub fn utilization(&self) -> f64 {
        self.len as f64 / self.buffer.len() as f64
    }

    pub fn clear(&mut self) {
        for slot in &mut self.buffer {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    fn tail(&self) -> usize {
        let cap = self.buffer.len();
        (self.head + cap - self.len) % cap
    }
}

/// Iterator over a RingBuffer.
pub struct RingBufferIter<'a, T> {
    buffer: &'a [Option<T>],
    pos: usize,
    remaining: usize,
}

impl<'a, T> Iterator for RingBufferIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.buffer[self.pos].as_ref();
        self.pos = (self.pos + 1) % self.buffer.len();
        self.remaining -= 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

// ── Bounded Event Log ───────────────────────────────────────────────────

/// Thread-safe FIFO window over the most recent records.
///
/// Every operation takes a short internal lock and does no I/O, so
/// appends never wait on anything but other in-memory mutations.
/// [`snapshot`](Self::snapshot) copies `Arc` handles out under the lock:
/// the returned vector is a consistent cut of the log at that moment, but
/// the log may change the instant the call returns, so readers must treat
/// it as an eventually consistent view rather than a live one.
#[derive(Debug)]
pub struct BoundedEventLog {
    inner: Mutex<RingBuffer<Arc<EventRecord>>>,
}

impl BoundedEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    /// Append a record, evicting and returning the oldest one if full.
    pub fn append(&self, record: Arc<EventRecord>) -> Option<Arc<EventRecord>> {
        self.inner.lock().push(record)
    }

    /// Append several records in order under a single lock acquisition.
    /// Returns how many older records were evicted to make room.
    pub fn append_batch(&self, records: Vec<Arc<EventRecord>>) -> usize {
        let mut inner = self.inner.lock();
        records
            .into_iter()
            .filter_map(|r| inner.push(r))
            .count()
    }

    /// Atomically remove up to `n` oldest records.
    pub fn drain_batch(&self, n: usize) -> Vec<Arc<EventRecord>> {
        self.inner.lock().drain_oldest(n)
    }

    /// Oldest-first copy of the retained records.
    pub fn snapshot(&self) -> Vec<Arc<EventRecord>> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Up to `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<EventRecord>> {
        let inner = self.inner.lock();
        let skip = inner.len().saturating_sub(limit);
        let mut out: Vec<_> = inner.iter().skip(skip).cloned().collect();
        out.reverse();
        out
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn utilization(&self) -> f64 {
        self.inner.lock().utilization()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for BoundedEventLog {
    fn default() -> Self {
        Self::new(MAX_CAPACITY)
    }
}
