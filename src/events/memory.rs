use std::sync::Mutex;

use super::{EventDispatcher, NodeEvent};

/// In-memory `EventDispatcher` that records every event it receives, in
/// the order received. Used by tests to assert that events published
/// from a single handler appear on the event bus in program order.
#[derive(Default)]
pub struct RecordingEventDispatcher {
    events: Mutex<Vec<NodeEvent>>,
}

impl RecordingEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NodeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventDispatcher for RecordingEventDispatcher {
    fn handle(&self, event: NodeEvent) {
        self.events.lock().unwrap().push(event);
    }
}
