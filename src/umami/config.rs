use std::fmt;
use std::sync::Arc;

use crate::umami::error::LoadError;
use crate::umami::types::TrackerHandle;

/// Observer notified with the live tracker once the script has loaded.
pub type OnLoad = Arc<dyn Fn(&TrackerHandle) + Send + Sync>;

/// Observer notified when the tracker script could not be loaded.
pub type OnLoadError = Arc<dyn Fn(&LoadError) + Send + Sync>;

/// Tracker configuration supplied to [`UmamiAnalytics::mount`](crate::umami::UmamiAnalytics::mount).
///
/// Values are passed through to the tracker script untouched; an empty website id or a bogus
/// host URL is only rejected by the tracker itself. Two configurations are equal when every data
/// field matches and both observers are the same `Arc`s.
#[derive(Clone)]
pub struct UmamiConfig {
    src: String,
    website_id: String,
    auto_track: bool,
    host_url: Option<String>,
    domains: Option<Vec<String>>,
    tag: Option<String>,
    async_load: bool,
    defer: bool,
    on_load: Option<OnLoad>,
    on_load_error: Option<OnLoadError>,
}

impl UmamiConfig {
    /// Creates a configuration for the tracker script at `src` reporting to `website_id`.
    ///
    /// Auto-tracking, async loading and deferred execution start enabled.
    pub fn new(src: impl Into<String>, website_id: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            website_id: website_id.into(),
            auto_track: true,
            host_url: None,
            domains: None,
            tag: None,
            async_load: true,
            defer: true,
            on_load: None,
            on_load_error: None,
        }
    }

    pub fn with_auto_track(mut self, auto_track: bool) -> Self {
        self.auto_track = auto_track;
        self
    }

    /// Sends collected data to `host_url` instead of the origin serving the script.
    pub fn with_host_url(mut self, host_url: impl Into<String>) -> Self {
        self.host_url = Some(host_url.into());
        self
    }

    /// Restricts the tracker to the listed domains.
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    /// Collects events under `tag` so they can be filtered in the dashboard.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_async(mut self, async_load: bool) -> Self {
        self.async_load = async_load;
        self
    }

    pub fn with_defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    pub fn on_load<F>(mut self, observer: F) -> Self
    where
        F: Fn(&TrackerHandle) + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(observer));
        self
    }

    pub fn on_load_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&LoadError) + Send + Sync + 'static,
    {
        self.on_load_error = Some(Arc::new(observer));
        self
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn website_id(&self) -> &str {
        &self.website_id
    }

    pub fn auto_track(&self) -> bool {
        self.auto_track
    }

    pub fn host_url(&self) -> Option<&str> {
        self.host_url.as_deref()
    }

    pub fn domains(&self) -> Option<&[String]> {
        self.domains.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn async_load(&self) -> bool {
        self.async_load
    }

    pub fn defer(&self) -> bool {
        self.defer
    }

    pub(crate) fn on_load_observer(&self) -> Option<OnLoad> {
        self.on_load.clone()
    }

    pub(crate) fn on_load_error_observer(&self) -> Option<OnLoadError> {
        self.on_load_error.clone()
    }
}

impl PartialEq for UmamiConfig {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src
            && self.website_id == other.website_id
            && self.auto_track == other.auto_track
            && self.host_url == other.host_url
            && self.domains == other.domains
            && self.tag == other.tag
            && self.async_load == other.async_load
            && self.defer == other.defer
            && same_observer(&self.on_load, &other.on_load)
            && same_observer(&self.on_load_error, &other.on_load_error)
    }
}

fn same_observer<T: ?Sized>(left: &Option<Arc<T>>, right: &Option<Arc<T>>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => Arc::ptr_eq(left, right),
        (None, None) => true,
        _ => false,
    }
}

impl fmt::Debug for UmamiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UmamiConfig")
            .field("src", &self.src)
            .field("website_id", &self.website_id)
            .field("auto_track", &self.auto_track)
            .field("host_url", &self.host_url)
            .field("domains", &self.domains)
            .field("tag", &self.tag)
            .field("async_load", &self.async_load)
            .field("defer", &self.defer)
            .field("on_load", &self.on_load.is_some())
            .field("on_load_error", &self.on_load_error.is_some())
            .finish()
    }
}
