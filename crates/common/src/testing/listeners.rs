//! Event listener that keeps everything it receives

use parking_lot::Mutex;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::events::{EventListener, ResilienceEvent, ResilienceEventKind};

/// Records events in arrival order for later assertions
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ResilienceEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event seen so far
    pub fn events(&self) -> Vec<ResilienceEvent> {
        self.events.lock().clone()
    }

    /// Event labels in arrival order
    pub fn labels(&self) -> Vec<String> {
        self.events.lock().iter().map(|event| event.kind.label().to_string()).collect()
    }

    /// Number of events with `label`
    pub fn count(&self, label: &str) -> usize {
        self.events.lock().iter().filter(|event| event.kind.label() == label).count()
    }

    /// Circuit breaker transitions in order
    pub fn transitions(&self) -> Vec<(CircuitState, CircuitState)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event.kind {
                ResilienceEventKind::StateTransition { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &ResilienceEvent) {
        self.events.lock().push(event.clone());
    }
}
