//! MIDI 2.0 Universal MIDI Packet plumbing.
//!
//! UMP traffic is exchanged as buffers of 32-bit words holding back-to-back
//! variable-length packets (1-4 words each, sized by the message-type nibble).
//! This crate provides the word-level tools the routing engine needs:
//!
//! - [`packet`]: packet length derivation, group field access, in-place group
//!   rewriting, and a zero-copy packet iterator over word buffers.
//! - [`buffer`]: a bounded [`EventBuffer`](buffer::EventBuffer) used as the
//!   per-track event-in/event-out sequence handed to plugin instances.
//! - [`builder`]: MIDI 2.0 channel-voice packet constructors (note on/off,
//!   pitch bend) built on the `midi2` crate.
//! - [`nrpn`]: the assignable-controller (NRPN) codec used as a parameter
//!   echo side channel.

pub mod buffer;
pub mod builder;
pub mod nrpn;
pub mod packet;

pub use buffer::EventBuffer;
pub use nrpn::NrpnMessage;
pub use packet::{group, packet_words, rewrite_group, with_group, Packets, MAX_PACKET_WORDS};
