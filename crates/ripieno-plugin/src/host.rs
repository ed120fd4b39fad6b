//! The plugin hosting capability: catalog, scanning, asynchronous
//! instance creation.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::format::PluginFormat;
use crate::instance::PluginInstance;
use crate::metadata::PluginCatalog;

/// Everything the hosting layer needs to build one instance.
#[derive(Clone, Debug)]
pub struct InstanceRequest {
    pub sample_rate: u32,
    pub input_channels: u32,
    pub output_channels: u32,
    pub offline_mode: bool,
    pub format: PluginFormat,
    pub plugin_id: String,
}

/// Future resolving to a live instance or a hosting error.
pub type InstanceFuture = Pin<Box<dyn Future<Output = Result<Box<dyn PluginInstance>>> + Send>>;

/// The hosting layer the engine is constructed with.
///
/// Injected as `Arc<dyn PluginHost>` so tests can substitute a fake;
/// there is no process-wide singleton.
pub trait PluginHost: Send + Sync {
    /// Snapshot of the current plugin catalog.
    fn catalog(&self) -> PluginCatalog;

    /// (Re)scan installed plugins. Blocking; control-thread only.
    fn perform_plugin_scanning(&self, rescan: bool);

    /// Instantiate a plugin asynchronously. The returned future is driven
    /// on the control thread and must never be awaited while holding a
    /// lock the audio thread takes.
    fn create_instance(&self, request: InstanceRequest) -> InstanceFuture;
}
