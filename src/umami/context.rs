//! Scoped distribution of the tracker facade.
//!
//! A provider scope makes one [`Umami`] implementation reachable from any code running on the
//! same thread until the scope is dropped, so call sites can grab `track`/`identify` without the
//! facade being threaded through every signature. Scopes nest: the most recently opened scope
//! that is still alive wins. Accessors called outside every scope return
//! `umami/outside-provider` rather than silently doing nothing.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::umami::error::{outside_provider, UmamiResult};
use crate::umami::types::{EventData, IdentifyFn, TrackFn, Umami};

struct ScopeEntry {
    id: u64,
    umami: Arc<dyn Umami>,
}

thread_local! {
    static SCOPES: RefCell<Vec<ScopeEntry>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a provider registered for the current thread; dropping it ends the scope.
#[must_use = "the provider is unregistered as soon as the scope is dropped"]
pub struct ProviderScope {
    id: u64,
    _thread_bound: PhantomData<Rc<()>>,
}

impl Drop for ProviderScope {
    fn drop(&mut self) {
        let id = self.id;
        let _ = SCOPES.try_with(|scopes| {
            scopes.borrow_mut().retain(|entry| entry.id != id);
        });
    }
}

/// Registers `umami` as the innermost provider for the current thread.
pub fn provide(umami: Arc<dyn Umami>) -> ProviderScope {
    static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);
    let id = NEXT_SCOPE.fetch_add(1, Ordering::Relaxed);
    SCOPES.with(|scopes| scopes.borrow_mut().push(ScopeEntry { id, umami }));
    ProviderScope {
        id,
        _thread_bound: PhantomData,
    }
}

/// Runs `f` with `umami` provided, ending the scope when `f` returns.
pub fn with_provider<R>(umami: Arc<dyn Umami>, f: impl FnOnce() -> R) -> R {
    let _scope = provide(umami);
    f()
}

fn current_provider() -> Option<Arc<dyn Umami>> {
    SCOPES.with(|scopes| scopes.borrow().last().map(|entry| entry.umami.clone()))
}

/// Returns the `track` operation of the innermost provider.
pub fn use_track() -> UmamiResult<TrackFn> {
    let umami = current_provider().ok_or_else(|| outside_provider("use_track"))?;
    Ok(Arc::new(move |event_name: &str, data: Option<EventData>| {
        umami.track(event_name, data)
    }))
}

/// Returns the `identify` operation of the innermost provider.
pub fn use_identify() -> UmamiResult<IdentifyFn> {
    let umami = current_provider().ok_or_else(|| outside_provider("use_identify"))?;
    Ok(Arc::new(move |session_data: EventData| {
        umami.identify(session_data)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingTracker, TrackerCall};
    use serde_json::json;

    #[test]
    fn accessors_fail_outside_a_provider() {
        let track = use_track();
        let identify = use_identify();
        assert_eq!(
            track.err().map(|err| err.code_str()),
            Some("umami/outside-provider")
        );
        assert_eq!(
            identify.err().map(|err| err.code_str()),
            Some("umami/outside-provider")
        );
    }

    #[test]
    fn accessors_reach_the_provided_facade() {
        let tracker = RecordingTracker::default();
        let session = json!({"user": "u-1"}).as_object().cloned().unwrap();

        with_provider(Arc::new(tracker.clone()), || {
            use_track().unwrap()("signup", None);
            use_identify().unwrap()(session.clone());
        });

        assert_eq!(
            tracker.calls(),
            vec![
                TrackerCall::Track("signup".into(), None),
                TrackerCall::Identify(session),
            ]
        );
        assert!(use_track().is_err());
    }

    #[test]
    fn inner_scope_shadows_outer_until_dropped() {
        let outer = RecordingTracker::default();
        let inner = RecordingTracker::default();

        let _outer_scope = provide(Arc::new(outer.clone()));
        let inner_scope = provide(Arc::new(inner.clone()));
        use_track().unwrap()("inner", None);
        drop(inner_scope);
        use_track().unwrap()("outer", None);

        assert_eq!(inner.tracked_names(), vec!["inner"]);
        assert_eq!(outer.tracked_names(), vec!["outer"]);
    }

    #[test]
    fn scopes_can_end_out_of_order() {
        let first = RecordingTracker::default();
        let second = RecordingTracker::default();

        let first_scope = provide(Arc::new(first.clone()));
        let second_scope = provide(Arc::new(second.clone()));
        drop(first_scope);
        use_track().unwrap()("still-second", None);
        drop(second_scope);

        assert_eq!(second.tracked_names(), vec!["still-second"]);
        assert!(first.calls().is_empty());
        assert!(use_identify().is_err());
    }

    #[test]
    fn accessor_keeps_working_after_the_scope_ends() {
        let tracker = RecordingTracker::default();
        let track = with_provider(Arc::new(tracker.clone()), || use_track().unwrap());
        track("captured", None);
        assert_eq!(tracker.tracked_names(), vec!["captured"]);
    }
}
