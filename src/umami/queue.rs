use serde::Serialize;

use crate::umami::types::{EventData, Umami};

/// A `track` call captured while the tracker was not ready.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueuedEvent {
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
}

/// Ordered backlog of `track` calls waiting for the tracker to load.
#[derive(Debug, Default)]
pub struct EventQueue {
    entries: Vec<QueuedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event_name: &str, data: Option<EventData>) {
        self.entries.push(QueuedEvent {
            event_name: event_name.to_string(),
            data,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes every pending entry, leaving the queue empty.
    pub fn take(&mut self) -> Vec<QueuedEvent> {
        std::mem::take(&mut self.entries)
    }
}

/// Replays `events` against `tracker` in insertion order and returns how many were sent.
pub(crate) fn flush(events: Vec<QueuedEvent>, tracker: &dyn Umami) -> usize {
    let count = events.len();
    for QueuedEvent { event_name, data } in events {
        tracker.track(&event_name, data);
    }
    count
}
