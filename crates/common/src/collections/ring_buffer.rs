#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! A fixed-capacity circular buffer that hands back the element it evicts.
//!
//! [`RingBuffer`] keeps the most recent `capacity` items in insertion order.
//! When [`push`](RingBuffer::push) receives a value while the buffer is full,
//! the oldest element is removed and returned to the caller. Sliding-window
//! aggregations rely on that: a running counter can be decremented for the
//! evicted item and incremented for the new one in O(1), without rescanning
//! the window.
//!
//! # Complexity
//! - `push`, `pop`, `len`, `is_empty`, `is_full`, `capacity` and `clear` are
//!   **O(1)** (amortised for `clear`).
//!
//! # Thread Safety
//! - No interior mutability. Wrap in a lock to share between threads.

use std::collections::VecDeque;

/// A fixed-capacity FIFO window over the most recent items.
///
/// # Examples
///
/// ```rust
/// use bulwark_common::collections::RingBuffer;
///
/// let mut window = RingBuffer::new(2);
/// assert_eq!(window.push("a"), None);
/// assert_eq!(window.push("b"), None);
/// assert_eq!(window.push("c"), Some("a"));
/// assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec!["b", "c"]);
/// ```
/// Upper bound on the slots reserved up front; larger buffers grow on demand
const MAX_PREALLOCATED: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a buffer holding at most `capacity` items.
    ///
    /// A capacity of zero is clamped to `1`. At most 1024 slots are
    /// allocated here, so a huge capacity costs nothing until it fills.
    #[inline]
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: VecDeque::with_capacity(capacity.min(MAX_PREALLOCATED)), capacity }
    }

    /// Appends `item`, returning the evicted oldest item when the buffer was
    /// already full.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.buf.pop_front() } else { None };
        self.buf.push_back(item);
        evicted
    }

    /// Removes and returns the oldest item.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    /// Returns the most recently pushed item.
    #[inline]
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Number of items currently stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` when nothing has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// `true` once the buffer holds `capacity` items.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    /// Maximum number of items retained.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every item, keeping the capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Iterates from oldest to newest.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.buf.iter()
    }
}
