//! Builder for configuring and constructing a `RipienoEngine`.

use std::sync::Arc;

use ripieno_core::AudioPluginSequencer;
use ripieno_plugin::PluginHost;

use crate::{Error, Result, RipienoEngine};

/// The plugin hosting layer is a required dependency: it is injected here
/// rather than reached through a process-wide singleton, so tests and
/// embedders can substitute their own.
///
/// # Example
///
/// ```ignore
/// use ripieno::prelude::*;
///
/// let engine = RipienoEngine::builder()
///     .sample_rate(48_000)
///     .buffer_frames(256)
///     .channels(2, 2)
///     .host(host)
///     .build()?;
/// ```
pub struct RipienoEngineBuilder {
    sample_rate: u32,
    buffer_frames: usize,
    event_buffer_words: usize,
    inputs: u32,
    outputs: u32,
    host: Option<Arc<dyn PluginHost>>,
}

impl Default for RipienoEngineBuilder {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            buffer_frames: 512,
            event_buffer_words: 1024,
            inputs: 2,
            outputs: 2,
            host: None,
        }
    }
}

impl RipienoEngineBuilder {
    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Audio buffer length in frames. Default: 512
    pub fn buffer_frames(mut self, frames: usize) -> Self {
        self.buffer_frames = frames;
        self
    }

    /// Per-track UMP event buffer capacity in 32-bit words. Default: 1024
    pub fn event_buffer_words(mut self, words: usize) -> Self {
        self.event_buffer_words = words;
        self
    }

    /// Default channel counts for newly created tracks. Default: 2 in, 2 out
    pub fn channels(mut self, inputs: u32, outputs: u32) -> Self {
        self.inputs = inputs;
        self.outputs = outputs;
        self
    }

    /// The plugin hosting layer (required).
    pub fn host(mut self, host: Arc<dyn PluginHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Result<RipienoEngine> {
        let host = self
            .host
            .ok_or_else(|| Error::InvalidConfig("a plugin host is required".into()))?;
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be non-zero".into()));
        }
        if self.buffer_frames == 0 {
            return Err(Error::InvalidConfig("buffer frames must be non-zero".into()));
        }

        let sequencer = Arc::new(AudioPluginSequencer::new(
            self.sample_rate,
            self.buffer_frames,
            self.event_buffer_words,
            host,
        ));
        sequencer.set_default_channels(self.inputs, self.outputs);

        Ok(RipienoEngine::from_parts(sequencer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_host() {
        let err = RipienoEngineBuilder::default().build().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}

