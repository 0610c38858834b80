use std::sync::{Arc, Mutex};

use crate::umami::{EventData, Umami};

#[derive(Clone, Debug, PartialEq)]
pub enum TrackerCall {
    Track(String, Option<EventData>),
    Identify(EventData),
}

/// Tracker double that records every call it receives.
#[derive(Clone, Default)]
pub struct RecordingTracker {
    calls: Arc<Mutex<Vec<TrackerCall>>>,
}

impl RecordingTracker {
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tracked_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackerCall::Track(name, _) => Some(name),
                TrackerCall::Identify(_) => None,
            })
            .collect()
    }
}

impl Umami for RecordingTracker {
    fn track(&self, event_name: &str, data: Option<EventData>) {
        self.calls
            .lock()
            .unwrap()
            .push(TrackerCall::Track(event_name.to_string(), data));
    }

    fn identify(&self, session_data: EventData) {
        self.calls
            .lock()
            .unwrap()
            .push(TrackerCall::Identify(session_data));
    }
}
