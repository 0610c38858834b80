use std::sync::Arc;

use serde_json::{Map, Value};

/// Key/value payload attached to tracked events and identify calls.
pub type EventData = Map<String, Value>;

/// Capability surface of the Umami tracker.
///
/// The live tracker obtained from the loaded script implements this trait, and so does the
/// [`UmamiAnalytics`](crate::umami::UmamiAnalytics) facade handed out to the rest of the
/// application. Both methods are fire-and-forget.
pub trait Umami: Send + Sync {
    /// Tracks an event, optionally carrying additional data.
    fn track(&self, event_name: &str, data: Option<EventData>);

    /// Identifies the current session.
    fn identify(&self, session_data: EventData);
}

/// Live tracker instance captured once the script signals readiness.
pub type TrackerHandle = Arc<dyn Umami>;

/// Standalone `track` capability returned by [`use_track`](crate::umami::use_track).
pub type TrackFn = Arc<dyn Fn(&str, Option<EventData>) + Send + Sync>;

/// Standalone `identify` capability returned by [`use_identify`](crate::umami::use_identify).
pub type IdentifyFn = Arc<dyn Fn(EventData) + Send + Sync>;

/// Outcome of the loader's current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Loaded,
    Failed,
    Unmounted,
}
