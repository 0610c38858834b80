mod api;
mod config;
mod context;
pub mod error;
mod queue;
pub mod script;
mod types;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
mod web;

pub use api::UmamiAnalytics;
pub use config::{OnLoad, OnLoadError, UmamiConfig};
pub use context::{provide, use_identify, use_track, with_provider, ProviderScope};
pub use error::{LoadError, UmamiError, UmamiErrorCode, UmamiResult};
pub use queue::{EventQueue, QueuedEvent};
pub use script::{default_script_host, load_channel, ScriptDescriptor, ScriptHost, ScriptId};
pub use types::{EventData, IdentifyFn, LoadStatus, TrackFn, TrackerHandle, Umami};
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use web::DocumentScriptHost;
