//! Audio/event process context shared between the engine and plugin
//! instances.

use ripieno_ump::EventBuffer;

/// A bus of planar float channels.
///
/// Channel buffers are resized on (re)configuration and reused across
/// process calls; the audio path never reallocates once warmed up.
#[derive(Default)]
pub struct AudioBus {
    channels: Vec<Vec<f32>>,
}

impl AudioBus {
    pub fn new(channel_count: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count],
        }
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Resize to `channel_count` x `frames`, keeping existing allocations
    /// where possible.
    pub fn configure(&mut self, channel_count: usize, frames: usize) {
        self.channels.resize_with(channel_count, Vec::new);
        for channel in &mut self.channels {
            channel.resize(frames, 0.0);
        }
    }

    /// Zero every sample.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }
}

/// Per-track process context: one input bus, one output bus, and the
/// event-in/event-out UMP sequences, plus the frame count of the current
/// buffer cycle.
pub struct ProcessContext {
    frames: usize,
    pub input: AudioBus,
    pub output: AudioBus,
    pub events_in: EventBuffer,
    pub events_out: EventBuffer,
}

impl ProcessContext {
    pub fn new(event_capacity_words: usize) -> Self {
        Self {
            frames: 0,
            input: AudioBus::default(),
            output: AudioBus::default(),
            events_in: EventBuffer::new(event_capacity_words),
            events_out: EventBuffer::new(event_capacity_words),
        }
    }

    /// Configure the main input/output busses for the given channel counts
    /// and buffer length.
    pub fn configure_main_bus(&mut self, inputs: usize, outputs: usize, frames: usize) {
        self.input.configure(inputs, frames);
        self.output.configure(outputs, frames);
        self.frames = frames;
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames;
    }

    /// Feed this node's output into the next node of a chain: output
    /// becomes input (channel-matched), output is cleared.
    pub fn advance_chain(&mut self) {
        let channels = self.input.channel_count().min(self.output.channel_count());
        let (input, output) = (&mut self.input, &self.output);
        for ch in 0..channels {
            input.channel_mut(ch).copy_from_slice(output.channel(ch));
        }
        for ch in channels..self.input.channel_count() {
            self.input.channel_mut(ch).fill(0.0);
        }
        self.output.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_main_bus() {
        let mut ctx = ProcessContext::new(64);
        ctx.configure_main_bus(2, 2, 128);
        assert_eq!(ctx.input.channel_count(), 2);
        assert_eq!(ctx.output.channel_count(), 2);
        assert_eq!(ctx.input.channel(0).len(), 128);
        assert_eq!(ctx.frames(), 128);
    }

    #[test]
    fn test_advance_chain_copies_output_to_input() {
        let mut ctx = ProcessContext::new(64);
        ctx.configure_main_bus(2, 2, 4);
        ctx.output.channel_mut(0).copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);
        ctx.output.channel_mut(1).copy_from_slice(&[0.5, 0.5, 0.5, 0.5]);

        ctx.advance_chain();

        assert_eq!(ctx.input.channel(0), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(ctx.input.channel(1), &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(ctx.output.channel(0), &[0.0; 4]);
    }

    #[test]
    fn test_bus_configure_reuses_and_zero_fills() {
        let mut bus = AudioBus::new(1, 4);
        bus.channel_mut(0).fill(1.0);
        bus.configure(2, 8);
        assert_eq!(bus.channel_count(), 2);
        assert_eq!(bus.channel(0).len(), 8);
        // Newly grown tail and new channels start zeroed.
        assert_eq!(&bus.channel(0)[4..], &[0.0; 4]);
        assert_eq!(bus.channel(1), &[0.0; 8]);
    }
}
