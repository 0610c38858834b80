//! Test utilities shared across crate-level unit tests.

pub mod host;
pub mod tracker;

pub use host::FakeScriptHost;
pub use tracker::{RecordingTracker, TrackerCall};

/// Gives detached load continuations on the current-thread runtime a chance to run.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
