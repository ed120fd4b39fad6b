//! Decoded audio-file playback source.
//!
//! File decoding lives outside the engine; playback consumes an
//! already-decoded planar buffer. The buffer pointer changes only from the
//! control thread before playback, guarded by a short mutex; the read
//! position is an atomic advanced by the audio thread while playing.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// An in-memory decoded audio file: planar channels at a fixed rate.
pub struct AudioFileBuffer {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioFileBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

pub(crate) struct AudioFilePlayback {
    buffer: Mutex<Option<AudioFileBuffer>>,
    read_position: AtomicUsize,
}

impl AudioFilePlayback {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(None),
            read_position: AtomicUsize::new(0),
        }
    }

    pub fn load(&self, buffer: AudioFileBuffer) {
        *self.buffer.lock() = Some(buffer);
        self.read_position.store(0, Ordering::Release);
    }

    pub fn unload(&self) {
        *self.buffer.lock() = None;
        self.read_position.store(0, Ordering::Release);
    }

    pub fn duration_seconds(&self) -> f64 {
        self.buffer
            .lock()
            .as_ref()
            .map_or(0.0, AudioFileBuffer::duration_seconds)
    }

    /// Short lock around the decoded buffer for the merge step.
    pub fn buffer(&self) -> MutexGuard<'_, Option<AudioFileBuffer>> {
        self.buffer.lock()
    }

    #[inline]
    pub fn read_position(&self) -> usize {
        self.read_position.load(Ordering::Acquire)
    }

    pub fn advance(&self, frames: usize) {
        self.read_position.fetch_add(frames, Ordering::Release);
    }
}
