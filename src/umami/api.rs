use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::platform::runtime::spawn_detached;
use crate::umami::config::UmamiConfig;
use crate::umami::context::{provide, ProviderScope};
use crate::umami::error::LoadError;
use crate::umami::queue::{flush, EventQueue};
use crate::umami::script::{default_script_host, ScriptDescriptor, ScriptGuard, ScriptHost, ScriptLoad};
use crate::umami::types::{EventData, LoadStatus, TrackerHandle, Umami};

/// Loads the Umami tracker script and exposes `track`/`identify` while it loads.
///
/// `track` calls made before the script is ready are queued and replayed, in order, right after
/// the `on_load` observer has run. `identify` calls made before that point are dropped. Clones
/// share the same loader; the injected script is removed on [`unmount`](Self::unmount),
/// on [`reconfigure`](Self::reconfigure), or when the last clone is dropped. Tearing the loader
/// down from inside `on_load` cancels the replay.
///
/// The replay runs after the loader already reports ready. `track` calls issued from other
/// threads while it is running (multi-threaded runtime, or the background thread used when no
/// runtime is present) reach the tracker directly and may interleave with the replayed events.
#[derive(Clone)]
pub struct UmamiAnalytics {
    inner: Arc<UmamiInner>,
}

impl fmt::Debug for UmamiAnalytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.inner.run.lock().unwrap();
        f.debug_struct("UmamiAnalytics")
            .field("website_id", &run.config.website_id())
            .field("status", &run.status)
            .finish()
    }
}

struct UmamiInner {
    host: Arc<dyn ScriptHost>,
    run: Mutex<LoaderRun>,
}

/// State of the current activation. `generation` changes on every activation and teardown so
/// load signals from earlier scripts can be recognised and ignored.
struct LoaderRun {
    generation: u64,
    config: UmamiConfig,
    status: LoadStatus,
    state: TrackerState,
    script: Option<ScriptGuard>,
}

enum TrackerState {
    Unready(EventQueue),
    Ready(TrackerHandle),
    Unmounted,
}

impl UmamiAnalytics {
    /// Mounts the tracker into the platform's default document.
    pub fn mount(config: UmamiConfig) -> Self {
        Self::mount_with_host(config, default_script_host())
    }

    /// Mounts the tracker into `host`.
    pub fn mount_with_host(config: UmamiConfig, host: Arc<dyn ScriptHost>) -> Self {
        let inner = UmamiInner {
            host,
            run: Mutex::new(LoaderRun {
                generation: 0,
                config: config.clone(),
                status: LoadStatus::Unmounted,
                state: TrackerState::Unmounted,
                script: None,
            }),
        };
        let analytics = Self {
            inner: Arc::new(inner),
        };
        analytics.activate(config);
        analytics
    }

    /// Applies a new configuration. Identical configurations are ignored; anything else removes
    /// the current script, discards its tracker and queued events, and loads the script again.
    /// Reconfiguring an unmounted loader mounts it again.
    pub fn reconfigure(&self, config: UmamiConfig) {
        {
            let run = self.inner.run.lock().unwrap();
            if run.config == config && run.status != LoadStatus::Unmounted {
                return;
            }
        }
        self.teardown();
        self.activate(config);
    }

    /// Removes the injected script. Later `track`/`identify` calls are dropped and load signals
    /// still in flight are ignored.
    pub fn unmount(&self) {
        self.teardown();
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.run.lock().unwrap().status
    }

    pub fn config(&self) -> UmamiConfig {
        self.inner.run.lock().unwrap().config.clone()
    }

    /// Number of `track` calls waiting for the tracker.
    pub fn queued_event_count(&self) -> usize {
        match &self.inner.run.lock().unwrap().state {
            TrackerState::Unready(queue) => queue.len(),
            TrackerState::Ready(_) | TrackerState::Unmounted => 0,
        }
    }

    /// Makes this instance reachable through [`use_track`](crate::umami::use_track) and
    /// [`use_identify`](crate::umami::use_identify) until the returned scope is dropped.
    pub fn provide(&self) -> ProviderScope {
        provide(Arc::new(self.clone()))
    }

    fn activate(&self, config: UmamiConfig) {
        let script = ScriptDescriptor::from_config(&config);
        let generation = {
            let mut run = self.inner.run.lock().unwrap();
            run.generation += 1;
            run.config = config;
            run.status = LoadStatus::Loading;
            run.state = TrackerState::Unready(EventQueue::new());
            run.generation
        };

        match self.inner.host.inject(&script) {
            Ok(ScriptLoad { id, signal }) => {
                log::debug!("injected tracker {id} from {}", script.src());
                let guard = ScriptGuard::new(self.inner.host.clone(), id);
                let stale = {
                    let mut run = self.inner.run.lock().unwrap();
                    if run.generation == generation {
                        run.script = Some(guard);
                        None
                    } else {
                        Some(guard)
                    }
                };
                drop(stale);

                let weak: Weak<UmamiInner> = Arc::downgrade(&self.inner);
                spawn_detached(async move {
                    let outcome = signal.await;
                    if let Some(inner) = weak.upgrade() {
                        UmamiAnalytics { inner }.complete_load(generation, outcome);
                    }
                });
            }
            Err(err) => {
                log::warn!("failed to inject tracker script {}: {err}", script.src());
                self.fail_load(generation, LoadError::from(err));
            }
        }
    }

    fn teardown(&self) {
        let (script, dropped) = {
            let mut run = self.inner.run.lock().unwrap();
            run.generation += 1;
            run.status = LoadStatus::Unmounted;
            let dropped = match std::mem::replace(&mut run.state, TrackerState::Unmounted) {
                TrackerState::Unready(queue) => queue.len(),
                TrackerState::Ready(_) | TrackerState::Unmounted => 0,
            };
            (run.script.take(), dropped)
        };
        if dropped > 0 {
            log::warn!("discarding {dropped} queued tracker events on teardown");
        }
        drop(script);
    }

    pub(crate) fn complete_load(
        &self,
        generation: u64,
        outcome: Result<TrackerHandle, LoadError>,
    ) {
        match outcome {
            Ok(tracker) => self.finish_load(generation, tracker),
            Err(error) => self.fail_load(generation, error),
        }
    }

    fn finish_load(&self, generation: u64, tracker: TrackerHandle) {
        let (observer, backlog) = {
            let mut guard = self.inner.run.lock().unwrap();
            let run = &mut *guard;
            let backlog = match &mut run.state {
                TrackerState::Unready(queue) if run.generation == generation => queue.take(),
                _ => {
                    log::debug!("ignoring load signal from a discarded tracker script");
                    return;
                }
            };
            run.state = TrackerState::Ready(tracker.clone());
            run.status = LoadStatus::Loaded;
            (run.config.on_load_observer(), backlog)
        };

        if let Some(observer) = observer {
            observer(&tracker);
            let current = {
                let run = self.inner.run.lock().unwrap();
                run.generation == generation && matches!(run.state, TrackerState::Ready(_))
            };
            if !current {
                log::warn!(
                    "discarding {} queued tracker events: loader was torn down during on_load",
                    backlog.len()
                );
                return;
            }
        }
        let flushed = flush(backlog, tracker.as_ref());
        log::debug!("tracker ready; replayed {flushed} queued events");
    }

    fn fail_load(&self, generation: u64, error: LoadError) {
        let observer = {
            let mut run = self.inner.run.lock().unwrap();
            if run.generation != generation || !matches!(run.state, TrackerState::Unready(_)) {
                log::debug!("ignoring load failure from a discarded tracker script");
                return;
            }
            run.status = LoadStatus::Failed;
            run.config.on_load_error_observer()
        };

        log::warn!("tracker script failed to load: {error}");
        if let Some(observer) = observer {
            observer(&error);
        }
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.inner.run.lock().unwrap().generation
    }
}

impl Umami for UmamiAnalytics {
    fn track(&self, event_name: &str, data: Option<EventData>) {
        let tracker = {
            let mut run = self.inner.run.lock().unwrap();
            match &mut run.state {
                TrackerState::Ready(tracker) => tracker.clone(),
                TrackerState::Unready(queue) => {
                    queue.push(event_name, data);
                    return;
                }
                TrackerState::Unmounted => {
                    log::debug!("dropping `{event_name}` event: tracker is unmounted");
                    return;
                }
            }
        };
        tracker.track(event_name, data);
    }

    fn identify(&self, session_data: EventData) {
        let tracker = match &self.inner.run.lock().unwrap().state {
            TrackerState::Ready(tracker) => tracker.clone(),
            TrackerState::Unready(_) | TrackerState::Unmounted => {
                log::debug!("dropping identify call: tracker is not loaded");
                return;
            }
        };
        tracker.identify(session_data);
    }
}
