//! Coarse magnitude spectra for visualization.
//!
//! The audio thread computes fixed-width magnitude bars into thread-local
//! scratch, then attempts one non-blocking publish per callback. A single
//! atomic "reading" flag arbitrates with the occasional control-thread
//! reader: when a read is in progress the publish is skipped, trading one
//! stale visual frame for zero audio-thread blocking. Never a mutex.

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF32;

/// Number of magnitude bars per spectrum.
pub const SPECTRUM_BARS: usize = 32;

/// Shared input/output spectrum snapshots with single-writer,
/// occasional-reader semantics.
pub struct SpectrumPair {
    input: [AtomicF32; SPECTRUM_BARS],
    output: [AtomicF32; SPECTRUM_BARS],
    /// true = a reader owns the snapshot, false = the writer may publish.
    reading: AtomicBool,
}

impl SpectrumPair {
    pub fn new() -> Self {
        Self {
            input: std::array::from_fn(|_| AtomicF32::new(0.0)),
            output: std::array::from_fn(|_| AtomicF32::new(0.0)),
            reading: AtomicBool::new(false),
        }
    }

    /// Publish both spectra unless a reader currently holds the snapshot.
    /// Returns whether the publish happened. Audio thread only.
    pub fn try_publish(
        &self,
        input: &[f32; SPECTRUM_BARS],
        output: &[f32; SPECTRUM_BARS],
    ) -> bool {
        if self
            .reading
            .compare_exchange(false, false, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        for (slot, &value) in self.input.iter().zip(input) {
            slot.store(value, Ordering::Relaxed);
        }
        for (slot, &value) in self.output.iter().zip(output) {
            slot.store(value, Ordering::Relaxed);
        }
        true
    }

    /// Copy the input spectrum into `out` (up to [`SPECTRUM_BARS`] bars).
    /// Always returns without blocking.
    pub fn read_input(&self, out: &mut [f32]) {
        self.read(&self.input, out);
    }

    /// Copy the output spectrum into `out`.
    pub fn read_output(&self, out: &mut [f32]) {
        self.read(&self.output, out);
    }

    fn read(&self, bars: &[AtomicF32; SPECTRUM_BARS], out: &mut [f32]) {
        self.reading.store(true, Ordering::Release);
        for (dst, src) in out.iter_mut().zip(bars.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        self.reading.store(false, Ordering::Release);
    }
}

impl Default for SpectrumPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Average absolute sample magnitude per equal-width window, summed over
/// all channels. Buffers shorter than [`SPECTRUM_BARS`] frames produce
/// all-zero bars.
pub fn magnitude_bars<'a>(
    channels: impl Iterator<Item = &'a [f32]>,
    frames: usize,
) -> [f32; SPECTRUM_BARS] {
    let mut sums = [0.0f32; SPECTRUM_BARS];
    let mut counts = [0usize; SPECTRUM_BARS];
    let samples_per_bar = frames / SPECTRUM_BARS;

    if samples_per_bar > 0 {
        for channel in channels {
            for bar in 0..SPECTRUM_BARS {
                let start = bar * samples_per_bar;
                let end = ((bar + 1) * samples_per_bar).min(frames).min(channel.len());
                for &sample in &channel[start.min(end)..end] {
                    sums[bar] += sample.abs();
                }
                counts[bar] += end.saturating_sub(start);
            }
        }
    }

    let mut bars = [0.0f32; SPECTRUM_BARS];
    for bar in 0..SPECTRUM_BARS {
        if counts[bar] > 0 {
            bars[bar] = sums[bar] / counts[bar] as f32;
        }
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_read() {
        let pair = SpectrumPair::new();
        let input = [0.5f32; SPECTRUM_BARS];
        let output = [0.25f32; SPECTRUM_BARS];
        assert!(pair.try_publish(&input, &output));

        let mut read = [0.0f32; SPECTRUM_BARS];
        pair.read_input(&mut read);
        assert_eq!(read, input);
        pair.read_output(&mut read);
        assert_eq!(read, output);
    }

    #[test]
    fn test_publish_skipped_while_reading() {
        let pair = SpectrumPair::new();
        pair.reading.store(true, Ordering::Release);
        assert!(!pair.try_publish(&[1.0; SPECTRUM_BARS], &[1.0; SPECTRUM_BARS]));
        pair.reading.store(false, Ordering::Release);
        assert!(pair.try_publish(&[1.0; SPECTRUM_BARS], &[1.0; SPECTRUM_BARS]));
    }

    #[test]
    fn test_reading_flag_cleared_after_read() {
        let pair = SpectrumPair::new();
        let mut out = [0.0f32; SPECTRUM_BARS];
        for _ in 0..1000 {
            pair.read_input(&mut out);
        }
        assert!(!pair.reading.load(Ordering::Acquire));
    }

    #[test]
    fn test_magnitude_bars_constant_signal() {
        let channel = vec![0.5f32; 320];
        let bars = magnitude_bars(std::iter::once(channel.as_slice()), 320);
        for &bar in &bars {
            assert!((bar - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_magnitude_bars_short_buffer_is_silent() {
        let channel = vec![1.0f32; SPECTRUM_BARS - 1];
        let bars = magnitude_bars(std::iter::once(channel.as_slice()), SPECTRUM_BARS - 1);
        assert_eq!(bars, [0.0; SPECTRUM_BARS]);
    }

    #[test]
    fn test_magnitude_bars_averages_channels() {
        // Two channels of constant 0.2 and 0.6: the per-bar average over all
        // samples of both channels is 0.4.
        let a = vec![0.2f32; 64];
        let b = vec![0.6f32; 64];
        let bars = magnitude_bars([a.as_slice(), b.as_slice()].into_iter(), 64);
        for &bar in &bars {
            assert!((bar - 0.4).abs() < 1e-6);
        }
    }
}
