//! MIDI 2.0 channel-voice packet constructors.

use midi2::channel_voice2::{ChannelPitchBend, NoteOff, NoteOn};
use midi2::prelude::*;

/// Build a MIDI 2.0 Note On packet (64-bit) with a 16-bit velocity.
pub fn note_on(group: u8, channel: u8, note: u8, velocity: u16) -> [u32; 2] {
    let mut msg = NoteOn::<[u32; 2]>::new();
    msg.set_group(u4::new(group & 0x0F));
    msg.set_channel(u4::new(channel & 0x0F));
    msg.set_note_number(u7::new(note & 0x7F));
    msg.set_velocity(velocity);
    let data = msg.data();
    [data[0], data[1]]
}

/// Build a MIDI 2.0 Note Off packet (64-bit) with a 16-bit velocity.
pub fn note_off(group: u8, channel: u8, note: u8, velocity: u16) -> [u32; 2] {
    let mut msg = NoteOff::<[u32; 2]>::new();
    msg.set_group(u4::new(group & 0x0F));
    msg.set_channel(u4::new(channel & 0x0F));
    msg.set_note_number(u7::new(note & 0x7F));
    msg.set_velocity(velocity);
    let data = msg.data();
    [data[0], data[1]]
}

/// Build a MIDI 2.0 channel pitch bend packet from a 32-bit value
/// (center at `0x8000_0000`).
pub fn pitch_bend(group: u8, channel: u8, bend: u32) -> [u32; 2] {
    let mut msg = ChannelPitchBend::<[u32; 2]>::new();
    msg.set_group(u4::new(group & 0x0F));
    msg.set_channel(u4::new(channel & 0x0F));
    msg.set_pitch_bend_data(bend);
    let data = msg.data();
    [data[0], data[1]]
}

/// Map a normalized bend in [-1, 1] onto the 32-bit pitch bend range.
pub fn pitch_bend_from_normalized(group: u8, channel: u8, normalized: f32) -> [u32; 2] {
    let clamped = ((normalized + 1.0) * 0.5).clamp(0.0, 1.0);
    pitch_bend(group, channel, (f64::from(clamped) * f64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{group as packet_group, message_type, packet_words};

    #[test]
    fn test_note_on_layout() {
        let words = note_on(3, 5, 60, 0xF800);
        assert_eq!(message_type(words[0]), 0x4);
        assert_eq!(packet_words(words[0]), 2);
        assert_eq!(packet_group(words[0]), 3);
        // Opcode 0x9, channel 5, note 60.
        assert_eq!((words[0] >> 20) & 0x0F, 0x9);
        assert_eq!((words[0] >> 16) & 0x0F, 5);
        assert_eq!((words[0] >> 8) & 0x7F, 60);
        // Velocity left-justified in the upper 16 bits of the second word.
        assert_eq!(words[1] >> 16, 0xF800);
    }

    #[test]
    fn test_note_off_layout() {
        let words = note_off(0, 0, 64, 0);
        assert_eq!((words[0] >> 20) & 0x0F, 0x8);
        assert_eq!((words[0] >> 8) & 0x7F, 64);
        assert_eq!(words[1], 0);
    }

    #[test]
    fn test_pitch_bend_center() {
        let words = pitch_bend_from_normalized(0, 0, 0.0);
        assert_eq!((words[0] >> 20) & 0x0F, 0xE);
        // Center of the range, within rounding of the normalization.
        let center = 0x8000_0000u32;
        assert!(words[1].abs_diff(center) <= 1);
    }

    #[test]
    fn test_pitch_bend_extremes() {
        assert_eq!(pitch_bend_from_normalized(0, 0, -1.0)[1], 0);
        assert_eq!(pitch_bend_from_normalized(0, 0, 1.0)[1], u32::MAX);
    }
}
