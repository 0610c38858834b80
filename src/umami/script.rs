//! Script-tag description and the page abstraction the loader injects it into.
//!
//! The tracker reads its configuration from `data-*` attributes on its own `<script>` element
//! (<https://umami.is/docs/tracker-configuration>), so the attribute names produced here are a
//! wire contract with the tracker and must not change.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::umami::config::UmamiConfig;
use crate::umami::error::{LoadError, UmamiResult};
use crate::umami::types::TrackerHandle;

pub const WEBSITE_ID_ATTRIBUTE: &str = "data-website-id";
pub const AUTO_TRACK_ATTRIBUTE: &str = "data-auto-track";
pub const HOST_URL_ATTRIBUTE: &str = "data-host-url";
pub const DOMAINS_ATTRIBUTE: &str = "data-domains";
pub const TAG_ATTRIBUTE: &str = "data-tag";

/// Fully resolved `<script>` element for one configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptDescriptor {
    src: String,
    async_load: bool,
    defer: bool,
    attributes: BTreeMap<&'static str, String>,
}

impl ScriptDescriptor {
    pub fn from_config(config: &UmamiConfig) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(WEBSITE_ID_ATTRIBUTE, config.website_id().to_string());
        if config.auto_track() {
            attributes.insert(AUTO_TRACK_ATTRIBUTE, "true".to_string());
        }
        if let Some(host_url) = config.host_url().filter(|url| !url.is_empty()) {
            attributes.insert(HOST_URL_ATTRIBUTE, host_url.to_string());
        }
        if let Some(domains) = config.domains() {
            attributes.insert(DOMAINS_ATTRIBUTE, domains.join(","));
        }
        if let Some(tag) = config.tag().filter(|tag| !tag.is_empty()) {
            attributes.insert(TAG_ATTRIBUTE, tag.to_string());
        }

        Self {
            src: config.src().to_string(),
            async_load: config.async_load(),
            defer: config.defer(),
            attributes,
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn async_load(&self) -> bool {
        self.async_load
    }

    pub fn defer(&self) -> bool {
        self.defer
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// `data-*` attributes ordered by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.attributes
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
    }

    /// Renders the element as HTML, for pages assembled on the server.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<script");
        if self.async_load {
            html.push_str(" async");
        }
        if self.defer {
            html.push_str(" defer");
        }
        push_attribute(&mut html, "src", &self.src);
        for (name, value) in self.attributes() {
            push_attribute(&mut html, name, value);
        }
        html.push_str("></script>");
        html
    }
}

fn push_attribute(html: &mut String, name: &str, value: &str) {
    html.push(' ');
    html.push_str(name);
    html.push_str("=\"");
    for ch in value.chars() {
        match ch {
            '&' => html.push_str("&amp;"),
            '"' => html.push_str("&quot;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            other => html.push(other),
        }
    }
    html.push('"');
}

/// Identifies one injected script element within its host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(u64);

impl ScriptId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script#{}", self.0)
    }
}

/// Page that tracker scripts are injected into.
pub trait ScriptHost: Send + Sync {
    /// Appends the script to the page and starts loading it.
    fn inject(&self, script: &ScriptDescriptor) -> UmamiResult<ScriptLoad>;

    /// Removes a previously injected script. Unknown ids are ignored.
    fn remove(&self, id: ScriptId);
}

/// Result of a successful injection: the element's id and its pending load outcome.
pub struct ScriptLoad {
    pub id: ScriptId,
    pub signal: LoadSignal,
}

/// Sending half of a load signal, held by whatever observes the script element.
pub struct LoadNotifier {
    sender: oneshot::Sender<Result<TrackerHandle, LoadError>>,
}

impl LoadNotifier {
    pub fn succeed(self, tracker: TrackerHandle) {
        let _ = self.sender.send(Ok(tracker));
    }

    pub fn fail(self, error: LoadError) {
        let _ = self.sender.send(Err(error));
    }
}

/// Single-shot future resolving once the script has loaded or failed.
///
/// A notifier dropped without reporting resolves to a [`LoadError::Message`].
pub struct LoadSignal {
    receiver: oneshot::Receiver<Result<TrackerHandle, LoadError>>,
}

impl Future for LoadSignal {
    type Output = Result<TrackerHandle, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(LoadError::message(
                "tracker script was discarded before reporting its load outcome",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn load_channel() -> (LoadNotifier, LoadSignal) {
    let (sender, receiver) = oneshot::channel();
    (LoadNotifier { sender }, LoadSignal { receiver })
}

/// Owns an injected script and removes it from its host when dropped.
pub(crate) struct ScriptGuard {
    host: Arc<dyn ScriptHost>,
    id: ScriptId,
}

impl ScriptGuard {
    pub(crate) fn new(host: Arc<dyn ScriptHost>, id: ScriptId) -> Self {
        Self { host, id }
    }
}

impl Drop for ScriptGuard {
    fn drop(&mut self) {
        log::debug!("removing tracker {}", self.id);
        self.host.remove(self.id);
    }
}

/// Host used outside the browser, where there is no document to inject into.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedScriptHost;

impl ScriptHost for UnsupportedScriptHost {
    fn inject(&self, script: &ScriptDescriptor) -> UmamiResult<ScriptLoad> {
        Err(crate::umami::error::unsupported_environment(format!(
            "cannot inject `{}`: no document is available on this platform",
            script.src()
        )))
    }

    fn remove(&self, _id: ScriptId) {}
}

/// Returns the host for the current target: the page document on `wasm32` with the `wasm-web`
/// feature, [`UnsupportedScriptHost`] everywhere else.
pub fn default_script_host() -> Arc<dyn ScriptHost> {
    #[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
    {
        Arc::new(crate::umami::web::DocumentScriptHost::new())
    }
    #[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
    {
        Arc::new(UnsupportedScriptHost)
    }
}
