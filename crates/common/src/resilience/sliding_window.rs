//! Count-based sliding window of call outcomes

use crate::collections::RingBuffer;

/// Outcome kind stored in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedOutcome {
    Success,
    Failure,
}

/// The last `window_size` outcomes plus running counters.
///
/// The success and failure counters always equal the number of matching
/// entries in the window. Rejected calls are counted separately and never
/// enter the window.
#[derive(Debug, Clone)]
pub struct SlidingMetrics {
    window: RingBuffer<RecordedOutcome>,
    minimum_calls: usize,
    successes: u64,
    failures: u64,
    not_permitted: u64,
}

impl SlidingMetrics {
    /// `minimum_calls` is the number of buffered outcomes below which the
    /// failure rate reads as zero.
    pub fn new(window_size: usize, minimum_calls: usize) -> Self {
        Self {
            window: RingBuffer::new(window_size),
            minimum_calls,
            successes: 0,
            failures: 0,
            not_permitted: 0,
        }
    }

    pub fn record(&mut self, outcome: RecordedOutcome) {
        if let Some(evicted) = self.window.push(outcome) {
            match evicted {
                RecordedOutcome::Success => self.successes -= 1,
                RecordedOutcome::Failure => self.failures -= 1,
            }
        }
        match outcome {
            RecordedOutcome::Success => self.successes += 1,
            RecordedOutcome::Failure => self.failures += 1,
        }
    }

    pub fn record_not_permitted(&mut self) {
        self.not_permitted += 1;
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn not_permitted(&self) -> u64 {
        self.not_permitted
    }

    /// Outcomes currently in the window
    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    pub fn window_size(&self) -> usize {
        self.window.capacity()
    }

    /// `true` once enough outcomes are buffered for the rate to count.
    pub fn has_minimum_calls(&self) -> bool {
        self.buffered() > 0 && self.buffered() >= self.minimum_calls
    }

    /// Failure percentage in `[0.0, 100.0]`, or `0.0` below the minimum.
    pub fn failure_rate(&self) -> f64 {
        if !self.has_minimum_calls() {
            return 0.0;
        }
        self.failures as f64 * 100.0 / self.buffered() as f64
    }
}
