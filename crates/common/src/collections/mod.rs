//! Specialized data structures
//!
//! - **[`ring_buffer`]**: fixed-size window that reports evictions, the
//!   storage behind the circuit breaker's sliding metrics

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
