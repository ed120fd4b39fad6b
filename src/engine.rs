//! RipienoEngine facade over the sequencing/routing core.

use std::sync::Arc;

use ripieno_core::{
    AudioFileBuffer, AudioPluginSequencer, AudioProcessContext, InstanceId, ParameterUpdate,
    PluginOutputSink, TrackInfo,
};
use ripieno_plugin::{PluginCatalog, PluginFormat};

use crate::Result;

/// Main engine handle.
///
/// Cheap to clone via the shared sequencer; the audio driver typically
/// holds one clone for its callback while the application drives the
/// control plane through another.
#[derive(Clone)]
pub struct RipienoEngine {
    sequencer: Arc<AudioPluginSequencer>,
}

impl std::fmt::Debug for RipienoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RipienoEngine").finish_non_exhaustive()
    }
}

impl RipienoEngine {
    /// Create a new engine builder.
    pub fn builder() -> crate::RipienoEngineBuilder {
        crate::RipienoEngineBuilder::default()
    }

    pub(crate) fn from_parts(sequencer: Arc<AudioPluginSequencer>) -> Self {
        Self { sequencer }
    }

    /// Direct access to the sequencer (advanced use).
    pub fn sequencer(&self) -> &Arc<AudioPluginSequencer> {
        &self.sequencer
    }

    pub fn sample_rate(&self) -> u32 {
        self.sequencer.sample_rate()
    }

    // =========================================================================
    // Plugin hosting
    // =========================================================================

    /// Snapshot of the hosting layer's plugin catalog.
    pub fn catalog(&self) -> PluginCatalog {
        self.sequencer.catalog()
    }

    /// (Re)scan installed plugins.
    pub fn scan_plugins(&self, rescan: bool) {
        self.sequencer.perform_plugin_scanning(rescan);
    }

    // =========================================================================
    // Track / plugin lifecycle (control thread)
    // =========================================================================

    /// Create a new track around a freshly instantiated plugin and return
    /// the instance id.
    pub async fn add_track(&self, format: PluginFormat, plugin_id: &str) -> Result<InstanceId> {
        Ok(self.sequencer.add_simple_track(format, plugin_id).await?)
    }

    /// Append a plugin to an existing track's chain.
    pub async fn add_plugin_to_track(
        &self,
        track_index: usize,
        format: PluginFormat,
        plugin_id: &str,
    ) -> Result<InstanceId> {
        Ok(self
            .sequencer
            .add_plugin_to_track(track_index, format, plugin_id)
            .await?)
    }

    /// Remove a plugin instance (and its track, when it was the last
    /// plugin). Returns whether the instance existed.
    pub fn remove_plugin(&self, instance_id: InstanceId) -> bool {
        self.sequencer.remove_plugin_instance(instance_id)
    }

    pub fn track_count(&self) -> usize {
        self.sequencer.track_count()
    }

    /// Per-track plugin chains with catalog display names.
    ///
    /// Track indices are only stable until the next lifecycle operation.
    pub fn track_infos(&self) -> Vec<TrackInfo> {
        self.sequencer.track_infos()
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.sequencer.instance_ids()
    }

    // =========================================================================
    // UMP routing
    // =========================================================================

    /// Enqueue UMP packets for a routing target (instance id, group number,
    /// or track index). Packets are rewritten to carry the resolved
    /// instance's group.
    pub fn enqueue_ump(&self, target: i32, words: &mut [u32], timestamp: i64) {
        self.sequencer.enqueue_ump(target, words, timestamp);
    }

    /// Enqueue UMP packets directly for a known instance.
    pub fn enqueue_ump_for_instance(
        &self,
        instance_id: InstanceId,
        words: &mut [u32],
        timestamp: i64,
    ) {
        self.sequencer
            .enqueue_ump_for_instance(instance_id, words, timestamp);
    }

    /// Send a MIDI 2.0 Note On to a routing target.
    pub fn note_on(&self, target: i32, note: u8) -> &Self {
        self.sequencer.send_note_on(target, note);
        self
    }

    /// Send a MIDI 2.0 Note Off to a routing target.
    pub fn note_off(&self, target: i32, note: u8) -> &Self {
        self.sequencer.send_note_off(target, note);
        self
    }

    /// Send a channel pitch bend (normalized -1..1) to a routing target.
    pub fn pitch_bend(&self, target: i32, normalized: f32) -> &Self {
        self.sequencer.send_pitch_bend(target, normalized);
        self
    }

    /// Route a plugin's outbound UMP buffer (NRPN parameter echo decode +
    /// group rewrite + sink forward).
    pub fn dispatch_plugin_output(&self, instance_id: InstanceId, words: &mut [u32]) {
        self.sequencer.dispatch_plugin_output(instance_id, words);
    }

    /// Install (or clear) the outbound UMP sink for an instance.
    pub fn set_plugin_output_sink(&self, instance_id: InstanceId, sink: Option<PluginOutputSink>) {
        self.sequencer.set_plugin_output_sink(instance_id, sink);
    }

    /// Group currently assigned to an instance.
    pub fn plugin_group(&self, instance_id: InstanceId) -> Option<u8> {
        self.sequencer.plugin_group(instance_id)
    }

    /// Instance currently holding a group.
    pub fn instance_for_group(&self, group: u8) -> Option<InstanceId> {
        self.sequencer.instance_for_group(group)
    }

    // =========================================================================
    // Parameters and bypass
    // =========================================================================

    pub fn set_parameter(&self, instance_id: InstanceId, index: u32, value: f64) -> Result<()> {
        Ok(self.sequencer.set_parameter(instance_id, index, value)?)
    }

    pub fn get_parameter(&self, instance_id: InstanceId, index: u32) -> Result<f64> {
        Ok(self.sequencer.get_parameter(instance_id, index)?)
    }

    /// Parameter metadata exposed by an instance.
    pub fn parameter_list(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<ripieno_plugin::ParameterInfo>> {
        Ok(self.sequencer.parameter_list(instance_id)?)
    }

    /// Drain the pending parameter updates for an instance (plugin-side
    /// changes and decoded NRPN echoes).
    pub fn take_parameter_updates(&self, instance_id: InstanceId) -> Vec<ParameterUpdate> {
        self.sequencer.take_parameter_updates(instance_id)
    }

    pub fn set_bypassed(&self, instance_id: InstanceId, bypassed: bool) -> &Self {
        self.sequencer.set_plugin_bypassed(instance_id, bypassed);
        self
    }

    pub fn is_bypassed(&self, instance_id: InstanceId) -> bool {
        self.sequencer.is_plugin_bypassed(instance_id)
    }

    // =========================================================================
    // Playback
    // =========================================================================

    pub fn start_playback(&self) -> &Self {
        self.sequencer.start_playback();
        self
    }

    pub fn stop_playback(&self) -> &Self {
        self.sequencer.stop_playback();
        self
    }

    pub fn pause_playback(&self) -> &Self {
        self.sequencer.pause_playback();
        self
    }

    pub fn resume_playback(&self) -> &Self {
        self.sequencer.resume_playback();
        self
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playback_active()
    }

    pub fn playback_position(&self) -> i64 {
        self.sequencer.playback_position()
    }

    pub fn set_playback_position(&self, samples: i64) -> &Self {
        self.sequencer.set_playback_position(samples);
        self
    }

    pub fn tempo(&self) -> f64 {
        self.sequencer.tempo()
    }

    pub fn set_tempo(&self, bpm: f64) -> &Self {
        self.sequencer.set_tempo(bpm);
        self
    }

    // =========================================================================
    // Audio file playback
    // =========================================================================

    /// Install an already-decoded audio file as the playback source merged
    /// into every track's input.
    pub fn load_audio_file(&self, buffer: AudioFileBuffer) -> &Self {
        self.sequencer.load_audio_file(buffer);
        self
    }

    pub fn unload_audio_file(&self) -> &Self {
        self.sequencer.unload_audio_file();
        self
    }

    pub fn audio_file_duration_seconds(&self) -> f64 {
        self.sequencer.audio_file_duration_seconds()
    }

    // =========================================================================
    // Analysis
    // =========================================================================

    /// Copy the latest merged-input spectrum (non-blocking).
    pub fn input_spectrum(&self, out: &mut [f32]) {
        self.sequencer.input_spectrum(out);
    }

    /// Copy the latest clipped-output spectrum (non-blocking).
    pub fn output_spectrum(&self, out: &mut [f32]) {
        self.sequencer.output_spectrum(out);
    }

    // =========================================================================
    // Audio callback
    // =========================================================================

    /// Process one audio buffer. Called by the audio driver with at most
    /// one call in flight.
    pub fn process_audio(&self, process: &mut AudioProcessContext) -> Result<()> {
        Ok(self.sequencer.process_audio(process)?)
    }
}
