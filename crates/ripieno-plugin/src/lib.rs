//! Uniform plugin hosting capability surface.
//!
//! The sequencing engine never talks to a plugin format directly. Concrete
//! VST3/LV2/AU/CLAP adapters live behind two flat trait objects:
//!
//! - [`PluginInstance`]: one live plugin — audio/event processing, parameter
//!   access, state and presets, UI lifecycle, and parameter-change listeners.
//! - [`PluginHost`]: the hosting layer — plugin catalog, scanning, and
//!   asynchronous instance creation.
//!
//! Both are deliberately flat (no per-format sub-traits); the format is
//! plain data ([`PluginFormat`]).

mod context;
mod error;
mod format;
mod host;
mod instance;
mod metadata;

pub use context::{AudioBus, ProcessContext};
pub use error::{HostError, Result};
pub use format::PluginFormat;
pub use host::{InstanceFuture, InstanceRequest, PluginHost};
pub use instance::{
    ListenerToken, ParameterChangeListener, ParameterInfo, PluginInstance, PresetInfo,
};
pub use metadata::{PluginCatalog, PluginInfo};
