//! Event stream emitted by the resilience primitives
//!
//! Every primitive owns an [`EventPublisher`]. Listeners are invoked
//! synchronously on the publishing task, after any internal lock has been
//! released, so a listener must be cheap and must never block. Forward to a
//! channel ([`ChannelListener`]) when the consumer needs to do real work.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::circuit_breaker::CircuitState;

/// What happened
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceEventKind {
    /// Circuit breaker changed state
    StateTransition { from: CircuitState, to: CircuitState },
    /// A permitted call completed successfully
    CallSucceeded { elapsed: Duration },
    /// A permitted call failed
    CallFailed { elapsed: Duration, error: String },
    /// Circuit breaker refused a call
    CallNotPermitted,
    /// Retry scheduled another attempt
    Retry { attempt: u32, wait: Duration, error: String },
    /// Retry gave up
    RetryExhausted { attempts: u32, error: String },
    /// Bulkhead refused a call
    BulkheadRejected { capacity: usize },
    /// An attempt exceeded its time limit
    Timeout { timeout: Duration },
    /// Administrative reset of a circuit breaker
    Reset,
}

impl ResilienceEventKind {
    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::StateTransition { .. } => "state_transition",
            Self::CallSucceeded { .. } => "call_succeeded",
            Self::CallFailed { .. } => "call_failed",
            Self::CallNotPermitted => "call_not_permitted",
            Self::Retry { .. } => "retry",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::BulkheadRejected { .. } => "bulkhead_rejected",
            Self::Timeout { .. } => "timeout",
            Self::Reset => "reset",
        }
    }
}

/// An event tagged with the name of the primitive that emitted it
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceEvent {
    pub source: Arc<str>,
    pub kind: ResilienceEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl ResilienceEvent {
    pub fn new(source: Arc<str>, kind: ResilienceEventKind) -> Self {
        Self { source, kind, occurred_at: Utc::now() }
    }
}

impl fmt::Display for ResilienceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ResilienceEventKind::StateTransition { from, to } => {
                write!(f, "[{}] state {} -> {}", self.source, from, to)
            }
            ResilienceEventKind::CallSucceeded { elapsed } => {
                write!(f, "[{}] call succeeded in {:?}", self.source, elapsed)
            }
            ResilienceEventKind::CallFailed { elapsed, error } => {
                write!(f, "[{}] call failed after {:?}: {}", self.source, elapsed, error)
            }
            ResilienceEventKind::CallNotPermitted => {
                write!(f, "[{}] call not permitted", self.source)
            }
            ResilienceEventKind::Retry { attempt, wait, error } => {
                write!(f, "[{}] attempt {} failed ({}), retrying in {:?}", self.source, attempt, error, wait)
            }
            ResilienceEventKind::RetryExhausted { attempts, error } => {
                write!(f, "[{}] gave up after {} attempts: {}", self.source, attempts, error)
            }
            ResilienceEventKind::BulkheadRejected { capacity } => {
                write!(f, "[{}] bulkhead full ({} concurrent calls)", self.source, capacity)
            }
            ResilienceEventKind::Timeout { timeout } => {
                write!(f, "[{}] attempt timed out after {:?}", self.source, timeout)
            }
            ResilienceEventKind::Reset => write!(f, "[{}] reset", self.source),
        }
    }
}

/// Receives events. Must not block.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &ResilienceEvent);
}

/// Fan-out point shared by clones of a primitive
#[derive(Clone, Default)]
pub struct EventPublisher {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher").field("listeners", &self.listener_count()).finish()
    }
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every subsequent event
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.read().is_empty()
    }

    /// Deliver `kind` from `source` to every listener.
    pub fn publish(&self, source: &Arc<str>, kind: ResilienceEventKind) {
        // Snapshot so a listener that subscribes from inside a callback
        // cannot deadlock the publisher.
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }

        let event = ResilienceEvent::new(Arc::clone(source), kind);
        for listener in &listeners {
            listener.on_event(&event);
        }
    }
}

/// Writes every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&self, event: &ResilienceEvent) {
        let source = &*event.source;
        match &event.kind {
            ResilienceEventKind::StateTransition { from, to } => {
                info!(source, from = %from, to = %to, "circuit breaker state transition");
            }
            ResilienceEventKind::CallSucceeded { elapsed } => {
                debug!(source, elapsed_ms = elapsed.as_millis() as u64, "call succeeded");
            }
            ResilienceEventKind::CallFailed { elapsed, error } => {
                warn!(source, elapsed_ms = elapsed.as_millis() as u64, error = %error, "call failed");
            }
            ResilienceEventKind::CallNotPermitted => {
                warn!(source, "call not permitted, circuit breaker is open");
            }
            ResilienceEventKind::Retry { attempt, wait, error } => {
                warn!(source, attempt, wait_ms = wait.as_millis() as u64, error = %error, "retrying");
            }
            ResilienceEventKind::RetryExhausted { attempts, error } => {
                warn!(source, attempts, error = %error, "retries exhausted");
            }
            ResilienceEventKind::BulkheadRejected { capacity } => {
                warn!(source, capacity, "bulkhead full, call rejected");
            }
            ResilienceEventKind::Timeout { timeout } => {
                warn!(source, timeout_ms = timeout.as_millis() as u64, "attempt timed out");
            }
            ResilienceEventKind::Reset => {
                info!(source, "circuit breaker reset");
            }
        }
    }
}

/// Forwards events into an unbounded tokio channel
///
/// Sending never blocks. Once the receiver is dropped events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ResilienceEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResilienceEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventListener for ChannelListener {
    fn on_event(&self, event: &ResilienceEvent) {
        let _ = self.sender.send(event.clone());
    }
}
