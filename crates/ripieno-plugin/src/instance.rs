//! The per-instance plugin capability trait.

use crate::context::ProcessContext;
use crate::format::PluginFormat;
use crate::Result;

/// Token returned by [`PluginInstance::add_parameter_change_listener`];
/// `0` means registration was refused.
pub type ListenerToken = u64;

/// Callback invoked by the plugin backend when a parameter changes from the
/// plugin side (UI gesture, host automation applied inside the plugin, ...).
/// Arguments are the parameter index and the plain value.
///
/// The backend may invoke this from any thread.
pub type ParameterChangeListener = Box<dyn Fn(u32, f64) + Send + Sync>;

/// Metadata for one exposed plugin parameter.
#[derive(Clone, Debug)]
pub struct ParameterInfo {
    pub index: u32,
    pub name: String,
    pub default_value: f64,
    pub min_value: f64,
    pub max_value: f64,
}

/// Metadata for one factory preset.
#[derive(Clone, Debug)]
pub struct PresetInfo {
    pub index: u32,
    pub name: String,
}

/// One live plugin instance of any format, behind a single flat interface.
///
/// Implementations are provided by the format adapters (VST3/LV2/AU/CLAP);
/// the engine owns instances as `Box<dyn PluginInstance>` and never
/// inspects the format beyond [`PluginInstance::format`].
pub trait PluginInstance: Send {
    fn format(&self) -> PluginFormat;

    fn plugin_id(&self) -> &str;

    /// Process one buffer: consume `ctx.events_in` and `ctx.input`, produce
    /// `ctx.output` and optionally `ctx.events_out`.
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<()>;

    fn parameters(&self) -> Vec<ParameterInfo>;

    /// Plain value.
    fn get_parameter(&self, index: u32) -> f64;

    /// Plain value; `timestamp` is the host time the change applies at
    /// (0 for immediate).
    fn set_parameter(&mut self, index: u32, value: f64, timestamp: i64);

    fn save_state(&mut self) -> Result<Vec<u8>> {
        Err(crate::HostError::StateSave("state not supported".into()))
    }

    fn load_state(&mut self, _data: &[u8]) -> Result<()> {
        Err(crate::HostError::StateRestore("state not supported".into()))
    }

    fn presets(&self) -> Vec<PresetInfo> {
        Vec::new()
    }

    fn load_preset(&mut self, _index: u32) -> Result<()> {
        Ok(())
    }

    // UI lifecycle. All optional; headless instances keep the defaults.

    fn has_ui(&self) -> bool {
        false
    }

    fn create_ui(&mut self) -> Result<()> {
        Ok(())
    }

    fn show_ui(&mut self) {}

    fn hide_ui(&mut self) {}

    fn resize_ui(&mut self, _width: u32, _height: u32) {}

    /// Destroy any created UI. Idempotent; also invoked by the engine
    /// before the instance is dropped.
    fn destroy_ui(&mut self) {}

    fn add_parameter_change_listener(&mut self, listener: ParameterChangeListener)
        -> ListenerToken;

    fn remove_parameter_change_listener(&mut self, token: ListenerToken);

    /// Whether the format processes in-place over a single buffer
    /// (replacing) rather than reading input and writing output separately.
    fn requires_replacing_process(&self) -> bool {
        false
    }
}
