//! UMP sequencing/routing engine core.
//!
//! Hosts plugin instances on tracks, addresses each live instance with a
//! MIDI 2.0 function-block group, routes UMP traffic between external
//! endpoints and the owning track, and mixes per-track audio under a single
//! hard-real-time callback.
//!
//! # Threads
//!
//! Two execution contexts share the engine:
//!
//! - The **control thread** drives lifecycle operations (add/remove tracks
//!   and plugin instances), parameter access, and UMP enqueueing. Lifecycle
//!   mutations are serialized against each other by a control-state lock.
//! - The **audio thread** calls [`AudioPluginSequencer::process_audio`] once
//!   per buffer. It iterates an immutable, atomically swapped snapshot of
//!   the track topology, so a concurrent track removal finishes the buffer
//!   it is in and disappears from the next one. Its remaining lock
//!   acquisitions (per-track contexts, instance boxes, the decoded
//!   audio-file buffer, pending parameter updates) are short, bounded
//!   critical sections that are uncontended in the common case.

pub mod audio_file;
pub mod engine;
pub mod error;
pub mod groups;
pub mod registry;
pub mod routing;
pub mod sequencer;
pub mod spectrum;
pub mod track;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_util;

pub use audio_file::AudioFileBuffer;
pub use engine::{AudioProcessContext, SequencerEngine};
pub use error::{Error, Result};
pub use groups::{GroupAllocator, GROUP_COUNT};
pub use routing::Route;
pub use sequencer::{
    AudioPluginSequencer, ParameterUpdate, PluginNodeInfo, PluginOutputSink, TrackInfo,
};
pub use spectrum::{SpectrumPair, SPECTRUM_BARS};
pub use track::{PluginNode, Track};
pub use transport::TransportState;

/// Process-unique identifier of a live plugin instance.
///
/// Never reused while the instance is alive; the engine mints ids from a
/// monotonic counter, so in practice an id is never reused at all.
pub type InstanceId = i32;
