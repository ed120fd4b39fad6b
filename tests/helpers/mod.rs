//! Shared test fixtures: a fake plugin host and scriptable fake instances.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use ripieno::plugin::{
    HostError, InstanceFuture, InstanceRequest, ListenerToken, ParameterChangeListener,
    ParameterInfo, PluginCatalog, PluginFormat, PluginHost, PluginInfo, PluginInstance,
    ProcessContext,
};

/// Observation handles for one created fake instance.
#[derive(Clone)]
pub struct InstanceProbe {
    pub plugin_id: String,
    pub seen_events: Arc<Mutex<Vec<u32>>>,
    pub listeners: Arc<Mutex<HashMap<ListenerToken, ParameterChangeListener>>>,
    pub ui_alive: Arc<Mutex<bool>>,
}

impl InstanceProbe {
    /// Fire every registered parameter-change listener, as a backend would
    /// from an arbitrary thread.
    pub fn notify_parameter_change(&self, index: u32, value: f64) {
        for listener in self.listeners.lock().values() {
            listener(index, value);
        }
    }
}

/// Fake plugin instance: writes a constant sample value, optionally emits a
/// fixed UMP sequence every process call, and records received events.
pub struct FakeInstance {
    plugin_id: String,
    value: f32,
    emit_events: Vec<u32>,
    params: Mutex<HashMap<u32, f64>>,
    next_token: ListenerToken,
    probe: InstanceProbe,
}

impl FakeInstance {
    fn new(plugin_id: &str, value: f32, emit_events: Vec<u32>) -> Self {
        let probe = InstanceProbe {
            plugin_id: plugin_id.to_string(),
            seen_events: Arc::new(Mutex::new(Vec::new())),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            ui_alive: Arc::new(Mutex::new(false)),
        };
        Self {
            plugin_id: plugin_id.to_string(),
            value,
            emit_events,
            params: Mutex::new(HashMap::new()),
            next_token: 1,
            probe,
        }
    }
}

impl PluginInstance for FakeInstance {
    fn format(&self) -> PluginFormat {
        PluginFormat::Clap
    }

    fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), HostError> {
        self.probe
            .seen_events
            .lock()
            .extend_from_slice(ctx.events_in.words());
        for ch in 0..ctx.output.channel_count() {
            ctx.output.channel_mut(ch).fill(self.value);
        }
        if !self.emit_events.is_empty() {
            ctx.events_out.extend_from_words(&self.emit_events);
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        Vec::new()
    }

    fn get_parameter(&self, index: u32) -> f64 {
        self.params.lock().get(&index).copied().unwrap_or(0.0)
    }

    fn set_parameter(&mut self, index: u32, value: f64, _timestamp: i64) {
        self.params.lock().insert(index, value);
    }

    fn has_ui(&self) -> bool {
        *self.probe.ui_alive.lock()
    }

    fn create_ui(&mut self) -> Result<(), HostError> {
        *self.probe.ui_alive.lock() = true;
        Ok(())
    }

    fn destroy_ui(&mut self) {
        *self.probe.ui_alive.lock() = false;
    }

    fn add_parameter_change_listener(
        &mut self,
        listener: ParameterChangeListener,
    ) -> ListenerToken {
        let token = self.next_token;
        self.next_token += 1;
        self.probe.listeners.lock().insert(token, listener);
        token
    }

    fn remove_parameter_change_listener(&mut self, token: ListenerToken) {
        self.probe.listeners.lock().remove(&token);
    }
}

/// Fake hosting layer backing the engine in tests. Created instances are
/// observable through [`FakeHost::probes`] in creation order.
pub struct FakeHost {
    catalog: PluginCatalog,
    instance_value: f32,
    emit_events: Vec<u32>,
    fail_with: Option<String>,
    probes: Arc<Mutex<Vec<InstanceProbe>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::with_catalog(default_catalog())
    }

    pub fn with_catalog(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            instance_value: 0.5,
            emit_events: Vec::new(),
            fail_with: None,
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_instance_value(mut self, value: f32) -> Self {
        self.instance_value = value;
        self
    }

    pub fn emitting(mut self, words: Vec<u32>) -> Self {
        self.emit_events = words;
        self
    }

    pub fn failing_with(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn probes(&self) -> Arc<Mutex<Vec<InstanceProbe>>> {
        self.probes.clone()
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginHost for FakeHost {
    fn catalog(&self) -> PluginCatalog {
        self.catalog.clone()
    }

    fn perform_plugin_scanning(&self, _rescan: bool) {}

    fn create_instance(&self, request: InstanceRequest) -> InstanceFuture {
        if let Some(message) = self.fail_with.clone() {
            return Box::pin(async move { Err(HostError::Instantiation(message)) });
        }
        let instance = FakeInstance::new(
            &request.plugin_id,
            self.instance_value,
            self.emit_events.clone(),
        );
        self.probes.lock().push(instance.probe.clone());
        Box::pin(async move { Ok(Box::new(instance) as Box<dyn PluginInstance>) })
    }
}

/// Catalog with a handful of fake plugins.
pub fn default_catalog() -> PluginCatalog {
    PluginCatalog::new(vec![
        PluginInfo::new(PluginFormat::Clap, "fake.synth", "Fake Synth"),
        PluginInfo::new(PluginFormat::Clap, "fake.pad", "Fake Pad"),
        PluginInfo::new(PluginFormat::Vst3, "fake.verb", "Fake Verb"),
    ])
}
