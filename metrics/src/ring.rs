use std::collections::VecDeque;
use std::sync::Mutex;

/// Fixed-capacity concurrent FIFO with overwrite-on-full.
///
/// `push` never blocks and never fails: once the buffer is full the oldest
/// element is discarded. `snapshot` returns a copy in insertion order,
/// oldest first. Many writers, few readers; a coarse mutex around the body
/// is enough because the critical section is one deque operation.
pub struct RingBuffer<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, item: T) {
        let mut buf = self.inner.lock().expect("poisoned ring buffer");
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(item);
    }

    /// Copy of the contents, oldest to newest.
    pub fn snapshot(&self) -> Vec<T> {
        let buf = self.inner.lock().expect("poisoned ring buffer");
        buf.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().expect("poisoned ring buffer").clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("poisoned ring buffer").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
