#![cfg(not(target_arch = "wasm32"))]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use umami_rs_sdk::umami::script::{LoadNotifier, ScriptLoad};
use umami_rs_sdk::umami::{
    load_channel, use_identify, use_track, EventData, LoadStatus, ScriptDescriptor, ScriptHost,
    ScriptId, Umami, UmamiAnalytics, UmamiConfig, UmamiResult,
};

#[derive(Default)]
struct ManualPage {
    notifier: Mutex<Option<LoadNotifier>>,
    scripts: Mutex<Vec<String>>,
}

impl ScriptHost for ManualPage {
    fn inject(&self, script: &ScriptDescriptor) -> UmamiResult<ScriptLoad> {
        let (notifier, signal) = load_channel();
        *self.notifier.lock().unwrap() = Some(notifier);
        self.scripts.lock().unwrap().push(script.to_html());
        Ok(ScriptLoad {
            id: ScriptId::next(),
            signal,
        })
    }

    fn remove(&self, _id: ScriptId) {
        self.scripts.lock().unwrap().pop();
    }
}

#[derive(Default)]
struct Calls(Mutex<Vec<(String, Option<Value>)>>);

impl Umami for Calls {
    fn track(&self, event_name: &str, data: Option<EventData>) {
        self.0
            .lock()
            .unwrap()
            .push((event_name.to_string(), data.map(Value::Object)));
    }

    fn identify(&self, session_data: EventData) {
        self.0
            .lock()
            .unwrap()
            .push(("identify".to_string(), Some(Value::Object(session_data))));
    }
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "current_thread")]
async fn signup_and_purchase_are_replayed_once_loaded() {
    let page = Arc::new(ManualPage::default());
    let analytics = UmamiAnalytics::mount_with_host(
        UmamiConfig::new("https://cloud.umami.is/script.js", "abc123"),
        page.clone(),
    );

    {
        let _scope = analytics.provide();
        let track = use_track().unwrap();
        let identify = use_identify().unwrap();
        track("signup", None);
        track("purchase", json!({"amount": 10}).as_object().cloned());
        identify(json!({"user": "early"}).as_object().cloned().unwrap());
    }

    let calls = Arc::new(Calls::default());
    let notifier = page.notifier.lock().unwrap().take().unwrap();
    notifier.succeed(calls.clone());
    settle().await;

    assert_eq!(analytics.status(), LoadStatus::Loaded);
    assert_eq!(analytics.queued_event_count(), 0);
    assert_eq!(
        *calls.0.lock().unwrap(),
        vec![
            ("signup".to_string(), None),
            ("purchase".to_string(), Some(json!({"amount": 10}))),
        ]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn rendered_tag_reflects_the_configuration() {
    let page = Arc::new(ManualPage::default());
    let config = UmamiConfig::new("https://cloud.umami.is/script.js", "abc123")
        .with_domains(["a.com", "b.com"])
        .with_host_url("https://stats.example.com");
    let analytics = UmamiAnalytics::mount_with_host(config, page.clone());

    assert_eq!(
        *page.scripts.lock().unwrap(),
        vec![
            "<script async defer src=\"https://cloud.umami.is/script.js\" \
             data-auto-track=\"true\" data-domains=\"a.com,b.com\" \
             data-host-url=\"https://stats.example.com\" data-website-id=\"abc123\"></script>"
                .to_string()
        ]
    );

    analytics.unmount();
    assert!(page.scripts.lock().unwrap().is_empty());
}

#[test]
fn accessors_require_a_provider() {
    assert_eq!(
        use_track().err().map(|err| err.code_str()),
        Some("umami/outside-provider")
    );
}
