//! # Ripieno - MIDI 2.0 plugin sequencer
//!
//! Hosts third-party audio/MIDI plugins (VST3, LV2, AU, CLAP) on tracks,
//! addresses each live instance with a MIDI 2.0 function-block group, routes
//! Universal MIDI Packet traffic between external endpoints and the owning
//! instance, and mixes the per-track audio under one real-time callback.
//!
//! ## Architecture
//!
//! Ripieno is an umbrella crate that coordinates:
//! - **ripieno-core** - Sequencing/routing engine (tracks, groups, routes,
//!   registry, mix pipeline, spectrum analysis)
//! - **ripieno-plugin** - Uniform plugin hosting capability surface
//! - **ripieno-ump** - MIDI 2.0 UMP packet plumbing and the NRPN codec
//!
//! ## Quick start
//!
//! ```ignore
//! use ripieno::prelude::*;
//!
//! // The hosting layer (plugin format adapters) is injected, never global.
//! let engine = RipienoEngine::builder()
//!     .sample_rate(48_000)
//!     .buffer_frames(512)
//!     .host(my_plugin_host)
//!     .build()?;
//!
//! // Control plane: async lifecycle.
//! let synth = engine.add_track(PluginFormat::Clap, "org.surge.xt").await?;
//! engine.note_on(synth, 60);
//!
//! // Audio callback: one call per buffer.
//! let mut ctx = AudioProcessContext::new(2, 2, 512);
//! engine.process_audio(&mut ctx)?;
//! ```

/// Re-export of ripieno-core for direct access.
pub use ripieno_core as core;

/// Re-export of ripieno-plugin for direct access.
pub use ripieno_plugin as plugin;

/// Re-export of ripieno-ump for direct access.
pub use ripieno_ump as ump;

// Core types
pub use ripieno_core::{
    AudioFileBuffer, AudioPluginSequencer, AudioProcessContext, InstanceId, ParameterUpdate,
    PluginOutputSink, Route, SpectrumPair, TrackInfo, TransportState, SPECTRUM_BARS,
};

// Plugin capability surface
pub use ripieno_plugin::{
    AudioBus, HostError, InstanceRequest, ParameterInfo, PluginCatalog, PluginFormat, PluginHost,
    PluginInfo, PluginInstance, ProcessContext,
};

// UMP plumbing
pub use ripieno_ump::{EventBuffer, NrpnMessage};

mod builder;
mod engine;
mod error;

pub use builder::RipienoEngineBuilder;
pub use engine::RipienoEngine;
pub use error::{Error, Result};

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::{
        AudioFileBuffer, AudioProcessContext, Error, InstanceId, PluginFormat, Result,
        RipienoEngine, RipienoEngineBuilder,
    };

    pub use crate::plugin::{PluginHost, PluginInstance};
}
