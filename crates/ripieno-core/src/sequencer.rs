//! The plugin sequencer: asynchronous track/plugin lifecycle, function-block
//! routing, the NRPN parameter side channel, and the audio-callback entry
//! point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use ripieno_plugin::{
    InstanceRequest, PluginCatalog, PluginFormat, PluginHost,
};
use ripieno_ump::packet::{packet_words, rewrite_group, with_group};
use ripieno_ump::{builder, nrpn, EventBuffer};

use crate::audio_file::AudioFileBuffer;
use crate::engine::{AudioProcessContext, SequencerEngine};
use crate::error::{Error, Result};
use crate::groups::GroupAllocator;
use crate::registry::InstanceRegistry;
use crate::routing::{Route, RouteTable};
use crate::track::{PluginNode, Track};
use crate::InstanceId;

/// Default MIDI 2.0 note velocity used by the note helpers (full 7-bit
/// velocity left-justified to 16 bits).
const DEFAULT_NOTE_VELOCITY: u16 = 0xF800;

/// First minted instance id. Sits above the group (0-15) and practical
/// track-index ranges, so the three routing-target interpretations cannot
/// shadow each other.
const FIRST_INSTANCE_ID: InstanceId = 0x100;

/// One queued plugin parameter change, produced by the plugin's own change
/// notification or decoded from its NRPN output, consumed by polling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterUpdate {
    pub index: i32,
    pub value: f64,
}

/// Downstream consumer for a plugin's outbound UMP traffic (typically a
/// virtual MIDI device send).
pub type PluginOutputSink = Arc<dyn Fn(&[u32]) + Send + Sync>;

/// Description of one plugin mounted on a track.
#[derive(Clone, Debug)]
pub struct PluginNodeInfo {
    pub instance_id: InstanceId,
    pub plugin_id: String,
    pub format: PluginFormat,
    pub display_name: String,
}

/// Description of one track and its plugin chain.
#[derive(Clone, Debug)]
pub struct TrackInfo {
    pub track_index: usize,
    pub nodes: Vec<PluginNodeInfo>,
}

/// Control-plane state touched only under one short lock: the group
/// allocator and the derived route table. The audio thread reads cached
/// copies (each node's group atomic) instead.
struct ControlState {
    groups: GroupAllocator,
    routes: RouteTable,
}

/// Hosts plugin instances on tracks and routes UMP traffic between
/// external endpoints and the owning instances.
///
/// Lifecycle operations run on the control thread and are serialized by
/// the control lock; [`AudioPluginSequencer::process_audio`] is driven by
/// the audio callback and works off an immutable topology snapshot.
pub struct AudioPluginSequencer {
    host: Arc<dyn PluginHost>,
    engine: SequencerEngine,
    control: Mutex<ControlState>,
    registry: InstanceRegistry,
    pending_params: Arc<Mutex<HashMap<InstanceId, Vec<ParameterUpdate>>>>,
    output_sinks: ArcSwap<HashMap<InstanceId, PluginOutputSink>>,
    next_instance_id: AtomicI32,
    offline_rendering: AtomicBool,
}

impl AudioPluginSequencer {
    pub fn new(
        sample_rate: u32,
        buffer_frames: usize,
        event_capacity_words: usize,
        host: Arc<dyn PluginHost>,
    ) -> Self {
        Self {
            host,
            engine: SequencerEngine::new(sample_rate, buffer_frames, event_capacity_words),
            control: Mutex::new(ControlState {
                groups: GroupAllocator::new(),
                routes: RouteTable::new(),
            }),
            registry: InstanceRegistry::new(),
            pending_params: Arc::new(Mutex::new(HashMap::new())),
            output_sinks: ArcSwap::from_pointee(HashMap::new()),
            next_instance_id: AtomicI32::new(FIRST_INSTANCE_ID),
            offline_rendering: AtomicBool::new(false),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    pub fn engine(&self) -> &SequencerEngine {
        &self.engine
    }

    pub fn set_default_channels(&self, inputs: u32, outputs: u32) {
        self.engine.set_default_channels(inputs, outputs);
    }

    // ------------------------------------------------------------------
    // Plugin hosting passthrough
    // ------------------------------------------------------------------

    pub fn catalog(&self) -> PluginCatalog {
        self.host.catalog()
    }

    pub fn perform_plugin_scanning(&self, rescan: bool) {
        self.host.perform_plugin_scanning(rescan);
    }

    pub fn offline_rendering(&self) -> bool {
        self.offline_rendering.load(Ordering::Acquire)
    }

    pub fn set_offline_rendering(&self, enabled: bool) {
        self.offline_rendering.store(enabled, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a new track whose chain starts with a freshly instantiated
    /// plugin. Resolves to the new instance id.
    pub async fn add_simple_track(
        &self,
        format: PluginFormat,
        plugin_id: &str,
    ) -> Result<InstanceId> {
        let instance = self.instantiate(format, plugin_id).await?;
        let instance_id = self.next_instance_id.fetch_add(1, Ordering::Relaxed);
        let node = Arc::new(PluginNode::new(instance_id, instance));

        {
            let mut control = self.control.lock();
            let (track, track_index) = self.engine.push_track(node.clone());
            control.routes.insert(instance_id, track, track_index);
            node.set_group(control.groups.assign(instance_id));
        }

        self.finish_install(instance_id, &node);
        tracing::info!(instance_id, plugin_id, %format, "created track for plugin instance");
        Ok(instance_id)
    }

    /// Instantiate a plugin and append it to an existing track's chain.
    pub async fn add_plugin_to_track(
        &self,
        track_index: usize,
        format: PluginFormat,
        plugin_id: &str,
    ) -> Result<InstanceId> {
        if track_index >= self.engine.track_count() {
            return Err(Error::InvalidTrackIndex(track_index));
        }

        let instance = self.instantiate(format, plugin_id).await?;

        // The track may have vanished while the backend instantiated.
        let instance_id = self.next_instance_id.fetch_add(1, Ordering::Relaxed);
        let node = Arc::new(PluginNode::new(instance_id, instance));
        {
            let mut control = self.control.lock();
            let track = self.engine.append_node_to_track(track_index, node.clone())?;
            control.routes.insert(instance_id, track, track_index);
            node.set_group(control.groups.assign(instance_id));
        }

        self.finish_install(instance_id, &node);
        tracing::info!(instance_id, plugin_id, track_index, "added plugin to track");
        Ok(instance_id)
    }

    /// Tear down a plugin instance: UI, parameter listener, group, route,
    /// registry entry, and - when its track ends up empty - the track
    /// itself. Returns whether the instance existed.
    pub fn remove_plugin_instance(&self, instance_id: InstanceId) -> bool {
        let Some((node, listener_token)) = self.registry.remove(instance_id) else {
            tracing::warn!(instance_id, "remove requested for unknown plugin instance");
            return false;
        };

        {
            let mut instance = node.instance().lock();
            instance.destroy_ui();
            if let Some(token) = listener_token {
                instance.remove_parameter_change_listener(token);
            }
        }

        {
            let mut control = self.control.lock();
            control.routes.remove(instance_id);
            control.groups.release(instance_id);
            node.set_group(None);
            if !self.engine.remove_instance_node(instance_id) {
                tracing::warn!(instance_id, "instance missing from track topology");
            }
        }

        self.set_plugin_output_sink(instance_id, None);
        self.pending_params.lock().remove(&instance_id);
        self.refresh_routes();
        tracing::info!(instance_id, "removed plugin instance");
        true
    }

    /// Rebuild the route table and group caches from the current topology.
    ///
    /// Called after every lifecycle mutation; track indices handed out
    /// before this call are invalid afterwards.
    pub fn refresh_routes(&self) {
        let topology = self.engine.topology_snapshot();
        let mut control = self.control.lock();
        let ControlState { groups, routes } = &mut *control;
        routes.refresh(&topology.tracks, groups);
    }

    async fn instantiate(
        &self,
        format: PluginFormat,
        plugin_id: &str,
    ) -> Result<Box<dyn ripieno_plugin::PluginInstance>> {
        if self.host.catalog().find(format, plugin_id).is_none() {
            return Err(Error::PluginNotFound {
                format,
                plugin_id: plugin_id.to_string(),
            });
        }

        let request = InstanceRequest {
            sample_rate: self.engine.sample_rate(),
            input_channels: 2,
            output_channels: 2,
            offline_mode: self.offline_rendering(),
            format,
            plugin_id: plugin_id.to_string(),
        };
        self.host
            .create_instance(request)
            .await
            .map_err(|e| Error::Instantiation(e.to_string()))
    }

    /// Registry entry, parameter-change listener, and a route refresh for
    /// a freshly installed node.
    fn finish_install(&self, instance_id: InstanceId, node: &Arc<PluginNode>) {
        self.registry.add(instance_id, node.clone());

        let pending = Arc::clone(&self.pending_params);
        let token = node.instance().lock().add_parameter_change_listener(Box::new(
            move |index, value| {
                pending
                    .lock()
                    .entry(instance_id)
                    .or_default()
                    .push(ParameterUpdate {
                        index: index as i32,
                        value,
                    });
            },
        ));
        if token != 0 {
            self.registry.set_listener_token(instance_id, token);
        }

        self.refresh_routes();
    }

    // ------------------------------------------------------------------
    // Routing / event dispatch
    // ------------------------------------------------------------------

    fn resolve_target(&self, target: i32) -> Option<Route> {
        let topology = self.engine.topology_snapshot();
        let mut control = self.control.lock();
        let ControlState { groups, routes } = &mut *control;
        routes.resolve(target, &topology.tracks, groups)
    }

    /// Group assigned to an instance, if any.
    pub fn plugin_group(&self, instance_id: InstanceId) -> Option<u8> {
        self.control.lock().groups.group_for_instance(instance_id)
    }

    /// Instance currently holding a group, if any.
    pub fn instance_for_group(&self, group: u8) -> Option<InstanceId> {
        self.control.lock().groups.instance_for_group(group)
    }

    /// Rewrite `words` to carry the target's group and enqueue them on the
    /// resolved track. Unresolved targets and full queues are logged and
    /// dropped, never retried.
    pub fn enqueue_ump(&self, target: i32, words: &mut [u32], timestamp: i64) {
        let Some(route) = self.resolve_target(target) else {
            tracing::warn!(target, "failed to enqueue UMP events: unresolved target");
            return;
        };
        if let Some(group) = self.group_of(&route.track, route.instance_id) {
            rewrite_group(words, group);
        }
        if !route.track.schedule_events(timestamp, words) {
            tracing::warn!(target, size = words.len(), "failed to enqueue UMP events");
        }
    }

    /// Like [`enqueue_ump`](Self::enqueue_ump) but addressed directly at a
    /// known instance; a no-op when the instance has no route.
    pub fn enqueue_ump_for_instance(
        &self,
        instance_id: InstanceId,
        words: &mut [u32],
        timestamp: i64,
    ) {
        let Some(route) = self.control.lock().routes.get(instance_id) else {
            return;
        };
        if let Some(group) = self.group_of(&route.track, instance_id) {
            rewrite_group(words, group);
        }
        route.track.schedule_events(timestamp, words);
    }

    fn group_of(&self, track: &Arc<Track>, instance_id: InstanceId) -> Option<u8> {
        track.find_node(instance_id).and_then(|node| node.group())
    }

    /// Build and enqueue a single MIDI 2.0 Note On for a resolved target
    /// (group 0 when the instance is ungrouped).
    pub fn send_note_on(&self, target: i32, note: u8) {
        let Some(route) = self.resolve_target(target) else {
            tracing::warn!(target, "send_note_on: unresolved target");
            return;
        };
        let group = self.group_of(&route.track, route.instance_id).unwrap_or(0);
        let words = builder::note_on(group, 0, note, DEFAULT_NOTE_VELOCITY);
        if !route.track.schedule_events(0, &words) {
            tracing::warn!(target, note, "failed to enqueue note on event");
        }
    }

    /// Build and enqueue a single MIDI 2.0 Note Off for a resolved target.
    pub fn send_note_off(&self, target: i32, note: u8) {
        let Some(route) = self.resolve_target(target) else {
            tracing::warn!(target, "send_note_off: unresolved target");
            return;
        };
        let group = self.group_of(&route.track, route.instance_id).unwrap_or(0);
        let words = builder::note_off(group, 0, note, DEFAULT_NOTE_VELOCITY);
        if !route.track.schedule_events(0, &words) {
            tracing::warn!(target, note, "failed to enqueue note off event");
        }
    }

    /// Build and enqueue a channel pitch bend from a normalized value in
    /// [-1, 1].
    pub fn send_pitch_bend(&self, target: i32, normalized: f32) {
        let Some(route) = self.resolve_target(target) else {
            tracing::warn!(target, "send_pitch_bend: unresolved target");
            return;
        };
        let group = self.group_of(&route.track, route.instance_id).unwrap_or(0);
        let words = builder::pitch_bend_from_normalized(group, 0, normalized);
        route.track.schedule_events(0, &words);
    }

    /// Route a plugin's outbound UMP buffer: decode NRPN parameter echoes
    /// into the pending-update queue, rewrite every packet's group, and
    /// forward to the configured sink. A no-op for instances without an
    /// assigned group.
    pub fn dispatch_plugin_output(&self, instance_id: InstanceId, words: &mut [u32]) {
        let Some(node) = self.registry.get(instance_id) else {
            return;
        };
        self.handle_plugin_output(&node, words);
    }

    fn handle_plugin_output(&self, node: &PluginNode, words: &mut [u32]) {
        let Some(group) = node.group() else {
            return;
        };
        let instance_id = node.instance_id();

        let mut offset = 0;
        while offset < words.len() {
            let len = packet_words(words[offset]);
            if offset + len > words.len() {
                break;
            }
            if let Some(msg) = nrpn::decode(&words[offset..offset + len]) {
                self.pending_params
                    .lock()
                    .entry(instance_id)
                    .or_default()
                    .push(ParameterUpdate {
                        index: msg.param_id() as i32,
                        value: msg.normalized_value(),
                    });
            }
            words[offset] = with_group(words[offset], group);
            offset += len;
        }

        if let Some(sink) = self.output_sinks.load().get(&instance_id) {
            sink(words);
        }
    }

    /// Install (or clear, with `None`) the outbound sink for an instance.
    pub fn set_plugin_output_sink(&self, instance_id: InstanceId, sink: Option<PluginOutputSink>) {
        let current = self.output_sinks.load_full();
        let mut next: HashMap<InstanceId, PluginOutputSink> = (*current).clone();
        match sink {
            Some(sink) => {
                next.insert(instance_id, sink);
            }
            None => {
                next.remove(&instance_id);
            }
        }
        self.output_sinks.store(Arc::new(next));
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Drain the pending parameter updates for an instance.
    pub fn take_parameter_updates(&self, instance_id: InstanceId) -> Vec<ParameterUpdate> {
        self.pending_params
            .lock()
            .remove(&instance_id)
            .unwrap_or_default()
    }

    pub fn set_parameter(&self, instance_id: InstanceId, index: u32, value: f64) -> Result<()> {
        let node = self
            .registry
            .get(instance_id)
            .ok_or(Error::AlreadyInvalidState(instance_id))?;
        node.instance().lock().set_parameter(index, value, 0);
        Ok(())
    }

    pub fn get_parameter(&self, instance_id: InstanceId, index: u32) -> Result<f64> {
        let node = self
            .registry
            .get(instance_id)
            .ok_or(Error::AlreadyInvalidState(instance_id))?;
        let value = node.instance().lock().get_parameter(index);
        Ok(value)
    }

    /// Parameter metadata exposed by an instance.
    pub fn parameter_list(&self, instance_id: InstanceId) -> Result<Vec<ripieno_plugin::ParameterInfo>> {
        let node = self
            .registry
            .get(instance_id)
            .ok_or(Error::AlreadyInvalidState(instance_id))?;
        let parameters = node.instance().lock().parameters();
        Ok(parameters)
    }

    pub fn set_plugin_bypassed(&self, instance_id: InstanceId, bypassed: bool) {
        if !self.registry.set_bypassed(instance_id, bypassed) {
            tracing::warn!(instance_id, "bypass requested for unknown plugin instance");
        }
    }

    pub fn is_plugin_bypassed(&self, instance_id: InstanceId) -> bool {
        self.registry.is_bypassed(instance_id)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.registry.instance_ids()
    }

    pub fn track_count(&self) -> usize {
        self.engine.track_count()
    }

    pub fn find_track_index_for_instance(&self, instance_id: InstanceId) -> Option<usize> {
        self.engine
            .tracks()
            .iter()
            .position(|track| track.find_node(instance_id).is_some())
    }

    /// Per-track plugin chains with catalog display names.
    pub fn track_infos(&self) -> Vec<TrackInfo> {
        let catalog = self.host.catalog();
        self.engine
            .tracks()
            .iter()
            .enumerate()
            .map(|(track_index, track)| TrackInfo {
                track_index,
                nodes: track
                    .nodes()
                    .iter()
                    .map(|node| {
                        let (format, plugin_id) = {
                            let instance = node.instance().lock();
                            (instance.format(), instance.plugin_id().to_string())
                        };
                        PluginNodeInfo {
                            instance_id: node.instance_id(),
                            display_name: catalog.display_name_for(format, &plugin_id),
                            plugin_id,
                            format,
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn plugin_name(&self, instance_id: InstanceId) -> Option<String> {
        let node = self.registry.get(instance_id)?;
        let (format, plugin_id) = {
            let instance = node.instance().lock();
            (instance.format(), instance.plugin_id().to_string())
        };
        Some(self.host.catalog().display_name_for(format, &plugin_id))
    }

    pub fn plugin_format(&self, instance_id: InstanceId) -> Option<PluginFormat> {
        let node = self.registry.get(instance_id)?;
        let format = node.instance().lock().format();
        Some(format)
    }

    // ------------------------------------------------------------------
    // Playback control
    // ------------------------------------------------------------------

    pub fn start_playback(&self) {
        self.engine.transport().set_position(0);
        self.engine.transport().set_playing(true);
    }

    pub fn stop_playback(&self) {
        self.engine.transport().set_playing(false);
        self.engine.transport().set_position(0);
    }

    pub fn pause_playback(&self) {
        self.engine.transport().set_playing(false);
    }

    pub fn resume_playback(&self) {
        self.engine.transport().set_playing(true);
    }

    pub fn is_playback_active(&self) -> bool {
        self.engine.transport().is_playing()
    }

    pub fn playback_position(&self) -> i64 {
        self.engine.transport().position()
    }

    pub fn set_playback_position(&self, samples: i64) {
        self.engine.transport().set_position(samples);
    }

    pub fn tempo(&self) -> f64 {
        self.engine.transport().tempo()
    }

    pub fn set_tempo(&self, bpm: f64) {
        self.engine.transport().set_tempo(bpm);
    }

    // ------------------------------------------------------------------
    // Audio file playback
    // ------------------------------------------------------------------

    pub fn load_audio_file(&self, buffer: AudioFileBuffer) {
        self.engine.load_audio_file(buffer);
    }

    pub fn unload_audio_file(&self) {
        self.engine.unload_audio_file();
    }

    pub fn audio_file_duration_seconds(&self) -> f64 {
        self.engine.audio_file_duration_seconds()
    }

    // ------------------------------------------------------------------
    // Spectrum
    // ------------------------------------------------------------------

    /// Copy the latest merged-input spectrum into `out` (up to
    /// [`crate::spectrum::SPECTRUM_BARS`] bars). Non-blocking.
    pub fn input_spectrum(&self, out: &mut [f32]) {
        self.engine.spectrum().read_input(out);
    }

    /// Copy the latest clipped-output spectrum into `out`. Non-blocking.
    pub fn output_spectrum(&self, out: &mut [f32]) {
        self.engine.spectrum().read_output(out);
    }

    // ------------------------------------------------------------------
    // Audio callback entry point
    // ------------------------------------------------------------------

    /// Drive one buffer through the pipeline. Called by the audio driver;
    /// at most one call is in flight at a time.
    pub fn process_audio(&self, process: &mut AudioProcessContext) -> Result<()> {
        self.engine
            .process_audio(process, &mut |node: &Arc<PluginNode>, events: &mut EventBuffer| {
                self.handle_plugin_output(node, events.words_mut());
            })
    }
}
