//! Shared fake plugin instance for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use ripieno_plugin::{
    HostError, InstanceFuture, InstanceRequest, ListenerToken, ParameterChangeListener,
    ParameterInfo, PluginCatalog, PluginFormat, PluginHost, PluginInstance, ProcessContext,
};

/// Scriptable instance: emits a constant sample value, optionally emits a
/// fixed UMP sequence on every process call, and records what it received.
pub(crate) struct TestInstance {
    value: f32,
    emit_events: Vec<u32>,
    seen_events: Arc<Mutex<Vec<u32>>>,
    params: Arc<Mutex<HashMap<u32, f64>>>,
    listeners: Arc<Mutex<HashMap<ListenerToken, ParameterChangeListener>>>,
    next_token: ListenerToken,
    ui_alive: bool,
}

/// Handles for observing a [`TestInstance`] from outside the engine.
#[derive(Clone)]
pub(crate) struct TestInstanceProbe {
    pub seen_events: Arc<Mutex<Vec<u32>>>,
    pub listeners: Arc<Mutex<HashMap<ListenerToken, ParameterChangeListener>>>,
}

impl TestInstanceProbe {
    /// Fire every registered parameter-change listener, as a plugin
    /// backend would from an arbitrary thread.
    pub fn notify_parameter_change(&self, index: u32, value: f64) {
        for listener in self.listeners.lock().values() {
            listener(index, value);
        }
    }
}

impl TestInstance {
    pub fn new(value: f32) -> (Self, TestInstanceProbe) {
        let seen_events = Arc::new(Mutex::new(Vec::new()));
        let params = Arc::new(Mutex::new(HashMap::new()));
        let listeners = Arc::new(Mutex::new(HashMap::new()));
        let probe = TestInstanceProbe {
            seen_events: seen_events.clone(),
            listeners: listeners.clone(),
        };
        (
            Self {
                value,
                emit_events: Vec::new(),
                seen_events,
                params,
                listeners,
                next_token: 1,
                ui_alive: false,
            },
            probe,
        )
    }

    pub fn silent() -> (Self, TestInstanceProbe) {
        Self::new(0.0)
    }

    /// Emit `words` into the event output on every process call.
    pub fn with_emitted_events(mut self, words: Vec<u32>) -> Self {
        self.emit_events = words;
        self
    }
}

impl PluginInstance for TestInstance {
    fn format(&self) -> PluginFormat {
        PluginFormat::Clap
    }

    fn plugin_id(&self) -> &str {
        "test.instance"
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), HostError> {
        self.seen_events
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
        self.ui_alive
    }

    fn create_ui(&mut self) -> Result<(), HostError> {
        self.ui_alive = true;
        Ok(())
    }

    fn destroy_ui(&mut self) {
        self.ui_alive = false;
    }

    fn add_parameter_change_listener(
        &mut self,
        listener: ParameterChangeListener,
    ) -> ListenerToken {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.lock().insert(token, listener);
        token
    }

    fn remove_parameter_change_listener(&mut self, token: ListenerToken) {
        self.listeners.lock().remove(&token);
    }
}

/// In-process fake hosting layer.
///
/// Every successful instantiation produces a [`TestInstance`]; the probes
/// of created instances are shared through [`FakeHost::probes`] in creation
/// order so tests can observe them after the host moved into the engine.
pub(crate) struct FakeHost {
    catalog: PluginCatalog,
    instance_value: f32,
    emit_events: Vec<u32>,
    fail_with: Option<String>,
    probes: Arc<Mutex<Vec<TestInstanceProbe>>>,
}

impl FakeHost {
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            instance_value: 0.5,
            emit_events: Vec::new(),
            fail_with: None,
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every created instance emits these UMP words per process call.
    pub fn emitting(mut self, words: Vec<u32>) -> Self {
        self.emit_events = words;
        self
    }

    /// Fail every instantiation with this backend error string.
    pub fn failing_with(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Shared probe list, in instance creation order.
    pub fn probes(&self) -> Arc<Mutex<Vec<TestInstanceProbe>>> {
        self.probes.clone()
    }
}

impl PluginHost for FakeHost {
    fn catalog(&self) -> PluginCatalog {
        self.catalog.clone()
    }

    fn perform_plugin_scanning(&self, _rescan: bool) {}

    fn create_instance(&self, _request: InstanceRequest) -> InstanceFuture {
        if let Some(message) = self.fail_with.clone() {
            return Box::pin(async move { Err(HostError::Instantiation(message)) });
        }
        let (instance, probe) = TestInstance::new(self.instance_value);
        let instance = instance.with_emitted_events(self.emit_events.clone());
        self.probes.lock().push(probe);
        Box::pin(async move { Ok(Box::new(instance) as Box<dyn PluginInstance>) })
    }
}
