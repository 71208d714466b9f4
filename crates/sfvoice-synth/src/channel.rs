//! Per-channel performance controller state.

extern crate alloc;

use crate::zone::Preset;
use alloc::sync::Arc;

/// Number of MIDI channels.
pub const MIDI_CHANNELS: usize = 16;

/// Continuous controller numbers the engine interprets.
pub mod cc {
    /// Bank select (MSB)
    pub const BANK_SELECT: u8 = 0;
    /// Modulation wheel
    pub const MODULATION: u8 = 1;
    /// Channel volume
    pub const VOLUME: u8 = 7;
    /// Pan
    pub const PAN: u8 = 10;
    /// Expression
    pub const EXPRESSION: u8 = 11;
    /// Bank select (LSB)
    pub const BANK_SELECT_LSB: u8 = 32;
    /// Sustain pedal
    pub const SUSTAIN: u8 = 64;
    /// Reverb send level
    pub const REVERB: u8 = 91;
    /// Chorus send level
    pub const CHORUS: u8 = 93;
    /// All sound off
    pub const ALL_SOUND_OFF: u8 = 120;
    /// Reset all controllers
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    /// All notes off
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Centre value of the 14-bit pitch wheel.
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Default pitch-wheel range in semitones.
pub const DEFAULT_PITCH_WHEEL_SENSITIVITY: u8 = 2;

/// Live controller values of one MIDI channel.
///
/// Modulators read their sources from here when a voice starts and whenever
/// a controller changes.
#[derive(Debug, Clone)]
pub struct ChannelState {
    cc: [u8; 128],
    key_pressure: [u8; 128],
    channel_pressure: u8,
    pitch_bend: u16,
    pitch_wheel_sensitivity: u8,
    preset: Option<Arc<Preset>>,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    /// Creates a channel with MIDI power-on controller values.
    pub fn new() -> Self {
        let mut state = Self {
            cc: [0; 128],
            key_pressure: [0; 128],
            channel_pressure: 0,
            pitch_bend: PITCH_BEND_CENTER,
            pitch_wheel_sensitivity: DEFAULT_PITCH_WHEEL_SENSITIVITY,
            preset: None,
        };
        state.reset_controllers(true);
        state
    }

    /// Restores controller defaults.
    ///
    /// A full reset (power-on, engine reset) also restores volume, pan, the
    /// effect sends and bank select. A partial reset, as sent by CC121,
    /// leaves those alone.
    pub fn reset_controllers(&mut self, full: bool) {
        for (n, value) in self.cc.iter_mut().enumerate() {
            let n = n as u8;
            let preserved = matches!(
                n,
                cc::BANK_SELECT | cc::VOLUME | cc::PAN | cc::BANK_SELECT_LSB | 70..=79 | 91..=95
            ) || n >= cc::ALL_SOUND_OFF;
            if full || !preserved {
                *value = 0;
            }
        }
        if full {
            self.cc[usize::from(cc::VOLUME)] = 100;
            self.cc[usize::from(cc::PAN)] = 64;
            self.pitch_wheel_sensitivity = DEFAULT_PITCH_WHEEL_SENSITIVITY;
        }
        self.cc[usize::from(cc::EXPRESSION)] = 127;
        self.key_pressure = [0; 128];
        self.channel_pressure = 0;
        self.pitch_bend = PITCH_BEND_CENTER;
    }

    /// Controller value.
    #[inline]
    pub fn cc(&self, n: u8) -> u8 {
        self.cc[usize::from(n & 0x7f)]
    }

    /// Stores a controller value.
    pub fn set_cc(&mut self, n: u8, value: u8) {
        self.cc[usize::from(n & 0x7f)] = value.min(127);
    }

    /// Whether the sustain pedal is down.
    #[inline]
    pub fn sustain_held(&self) -> bool {
        self.cc(cc::SUSTAIN) >= 64
    }

    /// Polyphonic pressure on `key`.
    #[inline]
    pub fn key_pressure(&self, key: u8) -> u8 {
        self.key_pressure[usize::from(key & 0x7f)]
    }

    /// Stores polyphonic pressure for `key`.
    pub fn set_key_pressure(&mut self, key: u8, value: u8) {
        self.key_pressure[usize::from(key & 0x7f)] = value.min(127);
    }

    /// Channel pressure.
    #[inline]
    pub fn channel_pressure(&self) -> u8 {
        self.channel_pressure
    }

    /// Stores channel pressure.
    pub fn set_channel_pressure(&mut self, value: u8) {
        self.channel_pressure = value.min(127);
    }

    /// 14-bit pitch wheel position, 8192 is centre.
    #[inline]
    pub fn pitch_bend(&self) -> u16 {
        self.pitch_bend
    }

    /// Stores the pitch wheel position.
    pub fn set_pitch_bend(&mut self, value: u16) {
        self.pitch_bend = value.min(16383);
    }

    /// Pitch wheel range in semitones.
    #[inline]
    pub fn pitch_wheel_sensitivity(&self) -> u8 {
        self.pitch_wheel_sensitivity
    }

    /// Stores the pitch wheel range.
    pub fn set_pitch_wheel_sensitivity(&mut self, semitones: u8) {
        self.pitch_wheel_sensitivity = semitones.min(127);
    }

    /// Preset notes on this channel play.
    pub fn preset(&self) -> Option<&Arc<Preset>> {
        self.preset.as_ref()
    }

    /// Assigns or clears the channel preset.
    pub fn set_preset(&mut self, preset: Option<Arc<Preset>>) {
        self.preset = preset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_defaults() {
        let ch = ChannelState::new();
        assert_eq!(ch.cc(cc::VOLUME), 100);
        assert_eq!(ch.cc(cc::PAN), 64);
        assert_eq!(ch.cc(cc::EXPRESSION), 127);
        assert_eq!(ch.pitch_bend(), PITCH_BEND_CENTER);
        assert_eq!(ch.pitch_wheel_sensitivity(), 2);
        assert!(!ch.sustain_held());
    }

    #[test]
    fn partial_reset_keeps_volume() {
        let mut ch = ChannelState::new();
        ch.set_cc(cc::VOLUME, 40);
        ch.set_cc(cc::MODULATION, 90);
        ch.set_cc(cc::SUSTAIN, 127);
        ch.set_pitch_bend(0);
        ch.reset_controllers(false);
        assert_eq!(ch.cc(cc::VOLUME), 40);
        assert_eq!(ch.cc(cc::MODULATION), 0);
        assert!(!ch.sustain_held());
        assert_eq!(ch.pitch_bend(), PITCH_BEND_CENTER);

        ch.reset_controllers(true);
        assert_eq!(ch.cc(cc::VOLUME), 100);
    }
}
