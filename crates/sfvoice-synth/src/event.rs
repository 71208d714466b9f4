//! Control-plane events accepted by [`crate::Synth::handle_event`].

/// One MIDI-level event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthEvent {
    /// Start a note; velocity 0 is a note-off
    NoteOn {
        /// MIDI channel
        channel: u8,
        /// MIDI key
        key: u8,
        /// Velocity
        velocity: u8,
        /// Automatic note-off after this many ticks
        duration: Option<u64>,
    },
    /// Release a note
    NoteOff {
        /// MIDI channel
        channel: u8,
        /// MIDI key
        key: u8,
    },
    /// Controller change
    ControlChange {
        /// MIDI channel
        channel: u8,
        /// Controller number
        controller: u8,
        /// Value 0..=127
        value: u8,
    },
    /// Pitch wheel, 0..=16383 with 8192 at center
    PitchBend {
        /// MIDI channel
        channel: u8,
        /// Wheel position
        value: u16,
    },
    /// Channel aftertouch
    ChannelPressure {
        /// MIDI channel
        channel: u8,
        /// Pressure
        value: u8,
    },
    /// Polyphonic aftertouch
    KeyPressure {
        /// MIDI channel
        channel: u8,
        /// MIDI key
        key: u8,
        /// Pressure
        value: u8,
    },
    /// Pitch wheel range in semitones
    PitchWheelSensitivity {
        /// MIDI channel
        channel: u8,
        /// Semitones
        semitones: u8,
    },
    /// Power-on controller reset of one channel
    AllControllersReset {
        /// MIDI channel
        channel: u8,
    },
    /// Exclusive-class kill of one voice
    ExclusiveClassKill {
        /// Target voice id
        voice_id: u32,
    },
}
