//! Per-buffer audio pipeline over an atomically swapped track topology.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use ripieno_plugin::{AudioBus, ProcessContext};
use ripieno_ump::EventBuffer;

use crate::audio_file::{AudioFileBuffer, AudioFilePlayback};
use crate::error::{Error, Result};
use crate::spectrum::{magnitude_bars, SpectrumPair, SPECTRUM_BARS};
use crate::track::{PluginNode, Track};
use crate::transport::TransportState;
use crate::InstanceId;

/// Device-side view of one audio callback: the driver's input samples and
/// the primary output bus to fill.
pub struct AudioProcessContext {
    frames: usize,
    pub input: AudioBus,
    pub output: AudioBus,
}

impl AudioProcessContext {
    pub fn new(input_channels: usize, output_channels: usize, frames: usize) -> Self {
        Self {
            frames,
            input: AudioBus::new(input_channels, frames),
            output: AudioBus::new(output_channels, frames),
        }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }
}

/// Immutable snapshot of the track list and the per-track process
/// contexts, swapped wholesale on every lifecycle mutation.
///
/// The audio thread loads one snapshot per callback and iterates it
/// unmolested; a track removed mid-callback finishes that callback and is
/// dropped with the old snapshot.
pub(crate) struct TrackTopology {
    pub tracks: Vec<Arc<Track>>,
    pub contexts: Vec<Arc<Mutex<ProcessContext>>>,
}

impl TrackTopology {
    fn empty() -> Self {
        Self {
            tracks: Vec::new(),
            contexts: Vec::new(),
        }
    }
}

/// Scratch reused across process calls; resized, never reallocated, once
/// warmed up.
struct ProcessScratch {
    merged_input: Vec<Vec<f32>>,
    input_bars: [f32; SPECTRUM_BARS],
    output_bars: [f32; SPECTRUM_BARS],
}

/// Owns the track topology and drives the per-buffer pipeline: input
/// merge, fan-out, per-track processing, additive mix, soft clip, and
/// spectrum sampling.
pub struct SequencerEngine {
    sample_rate: u32,
    buffer_frames: usize,
    event_capacity_words: usize,
    topology: ArcSwap<TrackTopology>,
    transport: TransportState,
    audio_file: AudioFilePlayback,
    spectrum: SpectrumPair,
    scratch: Mutex<ProcessScratch>,
    default_inputs: AtomicU32,
    default_outputs: AtomicU32,
}

impl SequencerEngine {
    pub fn new(sample_rate: u32, buffer_frames: usize, event_capacity_words: usize) -> Self {
        Self {
            sample_rate,
            buffer_frames,
            event_capacity_words,
            topology: ArcSwap::from_pointee(TrackTopology::empty()),
            transport: TransportState::new(sample_rate),
            audio_file: AudioFilePlayback::new(),
            spectrum: SpectrumPair::new(),
            scratch: Mutex::new(ProcessScratch {
                merged_input: Vec::new(),
                input_bars: [0.0; SPECTRUM_BARS],
                output_bars: [0.0; SPECTRUM_BARS],
            }),
            default_inputs: AtomicU32::new(2),
            default_outputs: AtomicU32::new(2),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn spectrum(&self) -> &SpectrumPair {
        &self.spectrum
    }

    pub fn set_default_channels(&self, inputs: u32, outputs: u32) {
        self.default_inputs.store(inputs, Ordering::Relaxed);
        self.default_outputs.store(outputs, Ordering::Relaxed);
    }

    // ------------------------------------------------------------------
    // Audio file playback
    // ------------------------------------------------------------------

    pub fn load_audio_file(&self, buffer: AudioFileBuffer) {
        self.audio_file.load(buffer);
    }

    pub fn unload_audio_file(&self) {
        self.audio_file.unload();
    }

    pub fn audio_file_duration_seconds(&self) -> f64 {
        self.audio_file.duration_seconds()
    }

    // ------------------------------------------------------------------
    // Topology (mutators are called under the sequencer's control lock,
    // which serializes all lifecycle operations)
    // ------------------------------------------------------------------

    pub(crate) fn topology_snapshot(&self) -> Arc<TrackTopology> {
        self.topology.load_full()
    }

    pub fn track_count(&self) -> usize {
        self.topology.load().tracks.len()
    }

    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.topology.load().tracks.clone()
    }

    pub fn track_at(&self, index: usize) -> Option<Arc<Track>> {
        self.topology.load().tracks.get(index).cloned()
    }

    /// Append a new single-node track; returns the track and its index.
    pub(crate) fn push_track(&self, node: Arc<PluginNode>) -> (Arc<Track>, usize) {
        let track = Arc::new(Track::new());
        track.append_node(node);

        let mut context = ProcessContext::new(self.event_capacity_words);
        context.configure_main_bus(
            self.default_inputs.load(Ordering::Relaxed) as usize,
            self.default_outputs.load(Ordering::Relaxed) as usize,
            self.buffer_frames,
        );

        let current = self.topology.load_full();
        let mut tracks = current.tracks.clone();
        let mut contexts = current.contexts.clone();
        tracks.push(track.clone());
        contexts.push(Arc::new(Mutex::new(context)));
        let index = tracks.len() - 1;
        self.topology.store(Arc::new(TrackTopology { tracks, contexts }));

        (track, index)
    }

    /// Append a node to an existing track's chain.
    pub(crate) fn append_node_to_track(
        &self,
        track_index: usize,
        node: Arc<PluginNode>,
    ) -> Result<Arc<Track>> {
        let topology = self.topology.load();
        let track = topology
            .tracks
            .get(track_index)
            .ok_or(Error::InvalidTrackIndex(track_index))?;
        track.append_node(node);
        Ok(track.clone())
    }

    /// Remove the node owning `instance_id`; a track left empty is removed
    /// together with its process context. Returns whether the node was
    /// found.
    pub(crate) fn remove_instance_node(&self, instance_id: InstanceId) -> bool {
        let current = self.topology.load_full();
        for (index, track) in current.tracks.iter().enumerate() {
            if !track.remove_node(instance_id) {
                continue;
            }
            if track.is_empty() {
                let mut tracks = current.tracks.clone();
                let mut contexts = current.contexts.clone();
                tracks.remove(index);
                contexts.remove(index);
                self.topology.store(Arc::new(TrackTopology { tracks, contexts }));
            }
            return true;
        }
        false
    }

    // ------------------------------------------------------------------
    // The per-buffer pipeline
    // ------------------------------------------------------------------

    /// Process one audio buffer.
    ///
    /// `on_plugin_output` receives each node's UMP output for NRPN
    /// decoding, group rewriting, and outbound dispatch.
    ///
    /// Must not allocate on the steady-state path and never blocks beyond
    /// the documented bounded critical sections. On error the buffer is
    /// left untouched (caller zeroes or passes it through).
    pub fn process_audio(
        &self,
        process: &mut AudioProcessContext,
        on_plugin_output: &mut dyn FnMut(&Arc<PluginNode>, &mut EventBuffer),
    ) -> Result<()> {
        let topology = self.topology.load();
        if topology.tracks.len() != topology.contexts.len() {
            return Err(Error::TopologyMismatch {
                tracks: topology.tracks.len(),
                contexts: topology.contexts.len(),
            });
        }

        let frames = process.frames();
        let playing = self.transport.is_playing();
        self.transport.set_sample_rate(self.sample_rate);

        // Snapshot audio-file state under the shortest possible lock.
        let (file_channels, file_position) = {
            let guard = self.audio_file.buffer();
            match guard.as_ref() {
                Some(buffer) => (buffer.channels.len(), self.audio_file.read_position()),
                None => (0, 0),
            }
        };
        let has_file = file_channels > 0;

        // Merged input: device input plus file playback, defaulting to
        // stereo when both are absent.
        let device_inputs = process.input.channel_count();
        let mut merged_channels = device_inputs.max(file_channels);
        if merged_channels == 0 {
            merged_channels = 2;
        }

        let mut scratch = self.scratch.lock();
        scratch.merged_input.resize_with(merged_channels, Vec::new);
        for channel in &mut scratch.merged_input {
            channel.resize(frames, 0.0);
            channel.fill(0.0);
        }

        for ch in 0..merged_channels.min(device_inputs) {
            scratch.merged_input[ch].copy_from_slice(&process.input.channel(ch)[..frames]);
        }

        if has_file && playing {
            let guard = self.audio_file.buffer();
            if let Some(buffer) = guard.as_ref() {
                for (ch, merged) in scratch.merged_input.iter_mut().enumerate() {
                    let Some(data) = buffer.channels.get(ch) else {
                        continue;
                    };
                    for (frame, sample) in merged.iter_mut().enumerate() {
                        let position = file_position + frame;
                        if position < data.len() {
                            *sample += data[position];
                        }
                    }
                }
            }
        }

        // Fan the merged input out to every track, channel-matched, and
        // reset each track's output-event write position.
        for context in &topology.contexts {
            let mut ctx = context.lock();
            ctx.events_out.clear();
            let (in_channels, out_channels) =
                (ctx.input.channel_count(), ctx.output.channel_count());
            ctx.input.configure(in_channels, frames);
            ctx.output.configure(out_channels, frames);
            ctx.set_frames(frames);
            for ch in 0..in_channels {
                if let Some(merged) = scratch.merged_input.get(ch) {
                    ctx.input.channel_mut(ch).copy_from_slice(merged);
                } else {
                    ctx.input.channel_mut(ch).fill(0.0);
                }
            }
        }

        if has_file && playing {
            self.audio_file.advance(frames);
        }

        // Per-track processing in creation order; event-in positions are
        // reset afterwards so the next cycle starts clean.
        for (track, context) in topology.tracks.iter().zip(&topology.contexts) {
            let mut ctx = context.lock();
            track.process(&mut ctx, on_plugin_output)?;
            ctx.events_in.clear();
        }

        // Additive mix of every track's primary bus into the cleared
        // device output, channel-matched.
        process.output.clear();
        for context in &topology.contexts {
            let ctx = context.lock();
            let channels = ctx.output.channel_count().min(process.output.channel_count());
            for ch in 0..channels {
                let src = ctx.output.channel(ch);
                let dst = process.output.channel_mut(ch);
                for (d, s) in dst.iter_mut().zip(src) {
                    *d += s;
                }
            }
        }

        // Soft clip so summed tracks stay bounded without hard edges.
        for ch in 0..process.output.channel_count() {
            for sample in process.output.channel_mut(ch).iter_mut() {
                *sample = sample.tanh();
            }
        }

        // Spectra into thread-local scratch, then one non-blocking publish.
        let input_bars = magnitude_bars(scratch.merged_input.iter().map(Vec::as_slice), frames);
        let output_bars = magnitude_bars(
            (0..process.output.channel_count()).map(|ch| process.output.channel(ch)),
            frames,
        );
        scratch.input_bars = input_bars;
        scratch.output_bars = output_bars;
        self.spectrum
            .try_publish(&scratch.input_bars, &scratch.output_bars);

        if playing {
            self.transport.advance(frames as i64);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestInstance;
    use approx::assert_relative_eq;

    fn engine() -> SequencerEngine {
        SequencerEngine::new(48_000, 128, 256)
    }

    fn const_node(id: InstanceId, value: f32) -> Arc<PluginNode> {
        let (instance, _) = TestInstance::new(value);
        Arc::new(PluginNode::new(id, Box::new(instance)))
    }

    #[test]
    fn test_two_tracks_mix_through_soft_clip() {
        let engine = engine();
        engine.push_track(const_node(1, 0.5));
        engine.push_track(const_node(2, 0.5));

        let mut process = AudioProcessContext::new(0, 2, 128);
        engine.process_audio(&mut process, &mut |_, _| {}).unwrap();

        // 0.5 + 0.5 mixes to 1.0, published as tanh(1.0).
        let expected = 1.0f32.tanh();
        for ch in 0..2 {
            for &sample in process.output.channel(ch) {
                assert_relative_eq!(sample, expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_output_spectrum_reflects_clipped_mix() {
        let engine = engine();
        engine.push_track(const_node(1, 0.5));
        engine.push_track(const_node(2, 0.5));

        let mut process = AudioProcessContext::new(0, 2, 128);
        engine.process_audio(&mut process, &mut |_, _| {}).unwrap();

        let mut bars = [0.0f32; SPECTRUM_BARS];
        engine.spectrum().read_output(&mut bars);
        for &bar in &bars {
            assert_relative_eq!(bar, 1.0f32.tanh(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_file_playback_merges_and_advances() {
        let engine = engine();
        engine.push_track(const_node(1, 0.0));
        engine.load_audio_file(AudioFileBuffer::new(vec![vec![0.25; 1024]; 2], 48_000));

        // Not playing: input spectrum stays silent, position does not move.
        let mut process = AudioProcessContext::new(0, 2, 128);
        engine.process_audio(&mut process, &mut |_, _| {}).unwrap();
        let mut bars = [0.0f32; SPECTRUM_BARS];
        engine.spectrum().read_input(&mut bars);
        assert_eq!(bars, [0.0; SPECTRUM_BARS]);

        // Playing: file samples land in the merged input.
        engine.transport().set_playing(true);
        engine.process_audio(&mut process, &mut |_, _| {}).unwrap();
        engine.spectrum().read_input(&mut bars);
        for &bar in &bars {
            assert_relative_eq!(bar, 0.25, epsilon = 1e-6);
        }
        assert_eq!(engine.transport().position(), 128);
    }

    #[test]
    fn test_empty_engine_produces_silence() {
        let engine = engine();
        let mut process = AudioProcessContext::new(0, 2, 128);
        process.output.channel_mut(0).fill(1.0);
        engine.process_audio(&mut process, &mut |_, _| {}).unwrap();
        assert!(process.output.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_remove_last_node_removes_track() {
        let engine = engine();
        engine.push_track(const_node(1, 0.5));
        engine.push_track(const_node(2, 0.5));
        assert_eq!(engine.track_count(), 2);

        assert!(engine.remove_instance_node(1));
        assert_eq!(engine.track_count(), 1);
        assert!(!engine.remove_instance_node(1));
    }

    #[test]
    fn test_append_node_to_missing_track_fails() {
        let engine = engine();
        let err = engine
            .append_node_to_track(3, const_node(1, 0.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTrackIndex(3)));
    }
}
