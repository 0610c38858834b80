//! Browser [`ScriptHost`] backed by the page document.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::umami::error::{script_injection, LoadError, UmamiResult};
use crate::umami::script::{load_channel, LoadNotifier, ScriptDescriptor, ScriptHost, ScriptId, ScriptLoad};
use crate::umami::types::{EventData, TrackerHandle, Umami};

/// Injects tracker scripts into `document.head` (or `document.body` when there is no head).
#[derive(Default)]
pub struct DocumentScriptHost {
    scripts: Mutex<HashMap<ScriptId, InjectedScript>>,
}

struct InjectedScript {
    element: web_sys::HtmlScriptElement,
    _onload: Closure<dyn FnMut()>,
    _onerror: Closure<dyn FnMut(web_sys::Event)>,
}

// wasm32 is single-threaded; the element and closures never leave the page thread.
unsafe impl Send for DocumentScriptHost {}
unsafe impl Sync for DocumentScriptHost {}

impl DocumentScriptHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptHost for DocumentScriptHost {
    fn inject(&self, script: &ScriptDescriptor) -> UmamiResult<ScriptLoad> {
        let window = web_sys::window().ok_or_else(|| script_injection("Window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| script_injection("Document not available"))?;

        let element = document
            .create_element("script")
            .map_err(|err| script_injection(format!("Failed to create script: {err:?}")))?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| script_injection("Script element has wrong type"))?;
        element.set_src(script.src());
        element.set_async(script.async_load());
        element.set_defer(script.defer());
        for (name, value) in script.attributes() {
            element
                .set_attribute(name, value)
                .map_err(|err| script_injection(format!("Failed to set `{name}`: {err:?}")))?;
        }

        let (notifier, signal) = load_channel();
        let notifier: Rc<RefCell<Option<LoadNotifier>>> = Rc::new(RefCell::new(Some(notifier)));

        let success_notifier = notifier.clone();
        let onload = Closure::wrap(Box::new(move || {
            if let Some(notifier) = success_notifier.borrow_mut().take() {
                match window_tracker() {
                    Some(tracker) => notifier.succeed(tracker),
                    None => notifier.fail(LoadError::message(
                        "tracker script loaded but `window.umami` is not defined",
                    )),
                }
            }
        }) as Box<dyn FnMut()>);

        let error_notifier = notifier;
        let onerror = Closure::wrap(Box::new(move |event: web_sys::Event| {
            if let Some(notifier) = error_notifier.borrow_mut().take() {
                notifier.fail(LoadError::Event {
                    event_type: event.type_(),
                });
            }
        }) as Box<dyn FnMut(web_sys::Event)>);

        element.set_onload(Some(onload.as_ref().unchecked_ref()));
        element.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        if let Some(head) = document.head() {
            head.append_child(&element)
                .map_err(|err| script_injection(format!("Failed to append script to <head>: {err:?}")))?;
        } else if let Some(body) = document.body() {
            body.append_child(&element)
                .map_err(|err| script_injection(format!("Failed to append script to <body>: {err:?}")))?;
        } else {
            return Err(script_injection("No <head> or <body> element found"));
        }

        let id = ScriptId::next();
        self.scripts.lock().unwrap().insert(
            id,
            InjectedScript {
                element,
                _onload: onload,
                _onerror: onerror,
            },
        );
        Ok(ScriptLoad { id, signal })
    }

    fn remove(&self, id: ScriptId) {
        let Some(script) = self.scripts.lock().unwrap().remove(&id) else {
            return;
        };
        script.element.set_onload(None);
        script.element.set_onerror(None);
        script.element.remove();
    }
}

fn window_tracker() -> Option<TrackerHandle> {
    let window = web_sys::window()?;
    let value = js_sys::Reflect::get(&window, &JsValue::from_str("umami")).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    Some(Arc::new(WindowUmami { value }))
}

/// `window.umami` as installed by the tracker script.
struct WindowUmami {
    value: JsValue,
}

unsafe impl Send for WindowUmami {}
unsafe impl Sync for WindowUmami {}

impl WindowUmami {
    fn call(&self, method: &str, args: &js_sys::Array) {
        let function = match js_sys::Reflect::get(&self.value, &JsValue::from_str(method))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
        {
            Some(function) => function,
            None => {
                log::warn!("window.umami.{method} is not a function");
                return;
            }
        };
        if let Err(err) = function.apply(&self.value, args) {
            log::warn!("window.umami.{method} threw: {}", js_error_message(err));
        }
    }
}

impl Umami for WindowUmami {
    fn track(&self, event_name: &str, data: Option<EventData>) {
        let args = js_sys::Array::new();
        args.push(&JsValue::from_str(event_name));
        if let Some(data) = data {
            args.push(&to_js_object(&data));
        }
        self.call("track", &args);
    }

    fn identify(&self, session_data: EventData) {
        let args = js_sys::Array::of1(&to_js_object(&session_data));
        self.call("identify", &args);
    }
}

fn to_js_object(data: &EventData) -> JsValue {
    match serde_json::to_string(data) {
        Ok(json) => js_sys::JSON::parse(&json).unwrap_or_else(|err| {
            log::warn!("failed to convert tracker payload: {}", js_error_message(err));
            JsValue::UNDEFINED
        }),
        Err(err) => {
            log::warn!("failed to serialize tracker payload: {err}");
            JsValue::UNDEFINED
        }
    }
}

fn js_error_message(value: JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        format!("{}", error.message())
    } else if let Some(string) = value.as_string() {
        string
    } else {
        format!("{value:?}")
    }
}
