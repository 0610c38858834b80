use std::sync::{Arc, Mutex};

use crate::umami::error::{script_injection, LoadError, UmamiResult};
use crate::umami::script::{load_channel, LoadNotifier, ScriptDescriptor, ScriptHost, ScriptId, ScriptLoad};
use crate::umami::TrackerHandle;

/// In-memory page that records injections and lets tests resolve load signals by hand.
#[derive(Clone, Default)]
pub struct FakeScriptHost {
    state: Arc<Mutex<HostState>>,
}

#[derive(Default)]
struct HostState {
    injected: Vec<Injection>,
    removed: Vec<ScriptId>,
    refuse: bool,
}

struct Injection {
    id: ScriptId,
    script: ScriptDescriptor,
    notifier: Option<LoadNotifier>,
}

impl FakeScriptHost {
    /// Makes every later injection fail.
    pub fn refuse_injection(&self) {
        self.state.lock().unwrap().refuse = true;
    }

    pub fn injected(&self) -> Vec<ScriptDescriptor> {
        let state = self.state.lock().unwrap();
        state.injected.iter().map(|entry| entry.script.clone()).collect()
    }

    pub fn injected_ids(&self) -> Vec<ScriptId> {
        let state = self.state.lock().unwrap();
        state.injected.iter().map(|entry| entry.id).collect()
    }

    pub fn removed(&self) -> Vec<ScriptId> {
        self.state.lock().unwrap().removed.clone()
    }

    /// Ids injected and not removed yet.
    pub fn live_ids(&self) -> Vec<ScriptId> {
        let state = self.state.lock().unwrap();
        state
            .injected
            .iter()
            .map(|entry| entry.id)
            .filter(|id| !state.removed.contains(id))
            .collect()
    }

    pub fn take_notifier(&self, index: usize) -> Option<LoadNotifier> {
        self.state
            .lock()
            .unwrap()
            .injected
            .get_mut(index)
            .and_then(|entry| entry.notifier.take())
    }

    /// Reports the most recent script as loaded.
    pub fn succeed(&self, tracker: TrackerHandle) {
        if let Some(notifier) = self.take_latest() {
            notifier.succeed(tracker);
        }
    }

    /// Reports the most recent script as failed.
    pub fn fail(&self, error: LoadError) {
        if let Some(notifier) = self.take_latest() {
            notifier.fail(error);
        }
    }

    fn take_latest(&self) -> Option<LoadNotifier> {
        self.state
            .lock()
            .unwrap()
            .injected
            .last_mut()
            .and_then(|entry| entry.notifier.take())
    }
}

impl ScriptHost for FakeScriptHost {
    fn inject(&self, script: &ScriptDescriptor) -> UmamiResult<ScriptLoad> {
        let mut state = self.state.lock().unwrap();
        if state.refuse {
            return Err(script_injection("document refused the script"));
        }
        let (notifier, signal) = load_channel();
        let id = ScriptId::next();
        state.injected.push(Injection {
            id,
            script: script.clone(),
            notifier: Some(notifier),
        });
        Ok(ScriptLoad { id, signal })
    }

    fn remove(&self, id: ScriptId) {
        self.state.lock().unwrap().removed.push(id);
    }
}
