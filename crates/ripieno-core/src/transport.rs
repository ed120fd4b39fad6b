//! Master/transport state shared across threads.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Playback state written by the audio thread once per callback and read by
/// the control thread.
///
/// Readers get eventual consistency: a read may be one callback stale,
/// which is acceptable for transport display and polling.
pub struct TransportState {
    sample_rate: AtomicU32,
    playing: AtomicBool,
    position_samples: AtomicI64,
    tempo_bits: AtomicU64,
}

impl TransportState {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: AtomicU32::new(sample_rate),
            playing: AtomicBool::new(false),
            position_samples: AtomicI64::new(0),
            tempo_bits: AtomicU64::new(120.0f64.to_bits()),
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.position_samples.load(Ordering::Acquire)
    }

    pub fn set_position(&self, samples: i64) {
        self.position_samples.store(samples, Ordering::Release);
    }

    /// Advance the playback position by one buffer.
    pub fn advance(&self, frames: i64) {
        self.position_samples.fetch_add(frames, Ordering::Release);
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::Release);
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        f64::from_bits(self.tempo_bits.load(Ordering::Acquire))
    }

    pub fn set_tempo(&self, bpm: f64) {
        self.tempo_bits.store(bpm.to_bits(), Ordering::Release);
    }
}
