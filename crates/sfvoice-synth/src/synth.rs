//! The engine: channels, voice pool and block rendering.

extern crate alloc;

use crate::channel::{ChannelState, MIDI_CHANNELS, cc};
use crate::error::SynthError;
use crate::event::SynthEvent;
use crate::modulator::GeneralController;
use crate::pool::VoicePool;
use crate::resolver::for_each_match;
use crate::settings::{EngineSettings, MAX_BUFFER_SIZE};
use crate::voice::{Voice, VoiceNote, VoiceStatus};
use crate::zone::Preset;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::ControlFlow;

const PITCH_BEND_MAX: u16 = 16383;

/// Polyphonic sample-playback engine.
///
/// Control operations (`note_on`, `control_change`, ...) and
/// [`Synth::render_block`] are meant to be called from the same thread,
/// typically the audio callback draining an event queue before rendering.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use sfvoice_synth::{EngineSettings, Instrument, Preset, Sample, Synth, Zone};
///
/// let data: Vec<i16> = (0..4410).map(|i| ((i % 100) as i16 - 50) * 300).collect();
/// let sample = Arc::new(Sample::new("saw", Arc::from(data), 44100, 60));
/// let inst = Arc::new(Instrument::new("lead").with_zone(Zone::new(sample)));
/// let preset = Arc::new(Preset::new("lead", 0, 0).with_zone(Zone::new(inst)));
///
/// let mut synth = Synth::new(EngineSettings::default()).unwrap();
/// synth.set_channel_preset(0, Some(preset)).unwrap();
/// assert_eq!(synth.note_on(0, 60, 100, None).unwrap(), 1);
///
/// let (mut left, mut right) = (vec![0.0; 64], vec![0.0; 64]);
/// synth.render_block(&mut left, &mut right, None, None).unwrap();
/// ```
#[derive(Debug)]
pub struct Synth {
    settings: EngineSettings,
    channels: [ChannelState; MIDI_CHANNELS],
    pool: VoicePool,
    started: Vec<usize>,
    clock: u64,
}

impl Synth {
    /// Creates an engine with all voices preallocated.
    pub fn new(settings: EngineSettings) -> Result<Self, SynthError> {
        if !settings.has_valid_buffer_size() {
            return Err(SynthError::InvalidBufferSize {
                expected: MAX_BUFFER_SIZE,
                actual: settings.buffer_size,
            });
        }
        sfvoice_core::init_tables();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate = settings.sample_rate,
            buffer_size = settings.buffer_size,
            polyphony = settings.polyphony,
            "engine created"
        );

        Ok(Self {
            settings,
            channels: core::array::from_fn(|_| ChannelState::new()),
            pool: VoicePool::new(&settings),
            started: Vec::with_capacity(settings.polyphony),
            clock: 0,
        })
    }

    fn check_channel(channel: u8) -> Result<usize, SynthError> {
        let ch = usize::from(channel);
        if ch < MIDI_CHANNELS {
            Ok(ch)
        } else {
            Err(SynthError::InvalidChannel(channel))
        }
    }

    /// Engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// State of one channel.
    pub fn channel(&self, channel: u8) -> Result<&ChannelState, SynthError> {
        Ok(&self.channels[Self::check_channel(channel)?])
    }

    /// All voices, playing or not.
    pub fn voices(&self) -> &[Voice] {
        self.pool.voices()
    }

    /// Number of voices currently playing.
    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Engine clock in ticks.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Assigns a preset to a channel.
    pub fn set_channel_preset(
        &mut self,
        channel: u8,
        preset: Option<Arc<Preset>>,
    ) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        self.channels[ch].set_preset(preset);
        Ok(())
    }

    /// Starts one voice per matching zone of the channel's preset.
    ///
    /// Returns the number of voices started. A velocity of 0 is a note-off.
    pub fn note_on(
        &mut self,
        channel: u8,
        key: u8,
        velocity: u8,
        duration: Option<u64>,
    ) -> Result<usize, SynthError> {
        let ch = Self::check_channel(channel)?;
        if velocity == 0 {
            self.note_off(channel, key)?;
            return Ok(0);
        }
        let key = key.min(127);
        let velocity = velocity.min(127);

        let Some(preset) = self.channels[ch].preset().cloned() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(channel, key, "note-on on channel without preset");
            return Err(SynthError::NoPreset(channel));
        };

        for v in self.pool.voices_mut() {
            if v.is_playing() && v.channel() == channel && v.key() == key {
                v.release();
            }
        }

        let start_time = self.clock;
        let first_only = self.settings.first_voice_only;
        let state = &self.channels[ch];
        let pool = &mut self.pool;
        let started = &mut self.started;
        started.clear();
        let mut exhausted = false;

        for_each_match(&preset, key, velocity, |m| {
            let Some(idx) = pool.allocate(started.as_slice()) else {
                exhausted = true;
                return ControlFlow::Break(());
            };
            let id = pool.next_id();
            let voices = pool.voices_mut();
            voices[idx].init(
                VoiceNote {
                    id,
                    channel,
                    key,
                    velocity,
                    start_time,
                    duration,
                },
                Arc::clone(m.sample),
            );
            voices[idx].apply_zone(&m);

            let class = voices[idx].exclusive_class();
            if class != 0 {
                for (j, other) in voices.iter_mut().enumerate() {
                    if j != idx
                        && !started.contains(&j)
                        && other.is_playing()
                        && other.channel() == channel
                        && other.exclusive_class() == class
                    {
                        other.kill_exclusive();
                    }
                }
            }

            voices[idx].start(state);
            started.push(idx);
            if first_only {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        if exhausted {
            #[cfg(feature = "tracing")]
            tracing::warn!(channel, key, started = self.started.len(), "no voice available");
            if self.started.is_empty() {
                return Err(SynthError::NoFreeVoice);
            }
        }
        if self.started.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(channel, key, velocity, preset = %preset.name, "no zone matched");
        }
        Ok(self.started.len())
    }

    /// Releases the voices playing `key` on `channel`, or marks them
    /// sustained while the pedal is down.
    pub fn note_off(&mut self, channel: u8, key: u8) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        let sustain = self.channels[ch].sustain_held();
        for v in self.pool.voices_mut() {
            if v.status() == VoiceStatus::On && v.channel() == channel && v.key() == key {
                v.note_off(sustain);
            }
        }
        Ok(())
    }

    /// Applies a controller change and updates the voices that depend on it.
    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        let controller = controller.min(127);
        let value = value.min(127);
        self.channels[ch].set_cc(controller, value);

        let state = &mut self.channels[ch];
        let voices = self.pool.voices_mut().iter_mut().filter(|v| v.channel() == channel);
        match controller {
            cc::SUSTAIN => {
                if !state.sustain_held() {
                    for v in voices.filter(|v| v.status() == VoiceStatus::Sustained) {
                        v.release();
                    }
                }
            }
            cc::ALL_SOUND_OFF => {
                for v in voices {
                    v.force_release();
                }
            }
            cc::RESET_ALL_CONTROLLERS => {
                state.reset_controllers(false);
                for v in voices {
                    v.modulate_all(state);
                    if v.status() == VoiceStatus::Sustained {
                        v.release();
                    }
                }
            }
            cc::ALL_NOTES_OFF => {
                let sustain = state.sustain_held();
                for v in voices {
                    v.note_off(sustain);
                }
            }
            _ => {
                for v in voices {
                    v.modulate(state, true, controller);
                }
            }
        }
        Ok(())
    }

    fn modulate_channel(&mut self, ch: usize, ctrl: GeneralController, key: Option<u8>) {
        let channel = ch as u8;
        let state = &self.channels[ch];
        for v in self.pool.voices_mut() {
            if v.channel() == channel && key.is_none_or(|k| v.key() == k) {
                v.modulate(state, false, ctrl as u8);
            }
        }
    }

    /// Sets the pitch wheel (0..=16383, 8192 centered).
    pub fn pitch_bend(&mut self, channel: u8, value: u16) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        self.channels[ch].set_pitch_bend(value.min(PITCH_BEND_MAX));
        self.modulate_channel(ch, GeneralController::PitchWheel, None);
        Ok(())
    }

    /// Sets channel aftertouch.
    pub fn channel_pressure(&mut self, channel: u8, value: u8) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        self.channels[ch].set_channel_pressure(value.min(127));
        self.modulate_channel(ch, GeneralController::ChannelPressure, None);
        Ok(())
    }

    /// Sets polyphonic aftertouch for one key.
    pub fn key_pressure(&mut self, channel: u8, key: u8, value: u8) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        let key = key.min(127);
        self.channels[ch].set_key_pressure(key, value.min(127));
        self.modulate_channel(ch, GeneralController::PolyPressure, Some(key));
        Ok(())
    }

    /// Sets the pitch wheel range in semitones.
    pub fn set_pitch_wheel_sensitivity(&mut self, channel: u8, semitones: u8) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        self.channels[ch].set_pitch_wheel_sensitivity(semitones);
        self.modulate_channel(ch, GeneralController::PitchWheelSensitivity, None);
        Ok(())
    }

    /// Restores every controller of a channel to its power-on value.
    pub fn all_controllers_reset(&mut self, channel: u8) -> Result<(), SynthError> {
        let ch = Self::check_channel(channel)?;
        let state = &mut self.channels[ch];
        state.reset_controllers(true);
        for v in self.pool.voices_mut() {
            if v.channel() == channel {
                v.modulate_all(state);
                if v.status() == VoiceStatus::Sustained {
                    v.release();
                }
            }
        }
        Ok(())
    }

    /// Fast-releases one voice by id. Returns whether it was found playing.
    pub fn kill_exclusive(&mut self, voice_id: u32) -> bool {
        match self
            .pool
            .voices_mut()
            .iter_mut()
            .find(|v| v.is_playing() && v.id() == voice_id)
        {
            Some(v) => {
                v.kill_exclusive();
                true
            }
            None => false,
        }
    }

    /// Dispatches one event.
    pub fn handle_event(&mut self, event: SynthEvent) -> Result<(), SynthError> {
        match event {
            SynthEvent::NoteOn {
                channel,
                key,
                velocity,
                duration,
            } => self.note_on(channel, key, velocity, duration).map(|_| ()),
            SynthEvent::NoteOff { channel, key } => self.note_off(channel, key),
            SynthEvent::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(channel, controller, value),
            SynthEvent::PitchBend { channel, value } => self.pitch_bend(channel, value),
            SynthEvent::ChannelPressure { channel, value } => self.channel_pressure(channel, value),
            SynthEvent::KeyPressure {
                channel,
                key,
                value,
            } => self.key_pressure(channel, key, value),
            SynthEvent::PitchWheelSensitivity { channel, semitones } => {
                self.set_pitch_wheel_sensitivity(channel, semitones)
            }
            SynthEvent::AllControllersReset { channel } => self.all_controllers_reset(channel),
            SynthEvent::ExclusiveClassKill { voice_id } => {
                self.kill_exclusive(voice_id);
                Ok(())
            }
        }
    }

    /// Renders one buffer of every playing voice.
    ///
    /// All buffers must be exactly `buffer_size` long. `left` and `right`
    /// are overwritten; the effect sends, when given, receive the dry send
    /// signal.
    pub fn render_block(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        mut reverb: Option<&mut [f32]>,
        mut chorus: Option<&mut [f32]>,
    ) -> Result<(), SynthError> {
        let expected = self.settings.buffer_size;
        let lengths = [
            Some(left.len()),
            Some(right.len()),
            reverb.as_deref().map(<[f32]>::len),
            chorus.as_deref().map(<[f32]>::len),
        ];
        if let Some(actual) = lengths.into_iter().flatten().find(|&len| len != expected) {
            return Err(SynthError::InvalidBufferSize { expected, actual });
        }

        left.fill(0.0);
        right.fill(0.0);
        if let Some(bus) = reverb.as_deref_mut() {
            bus.fill(0.0);
        }
        if let Some(bus) = chorus.as_deref_mut() {
            bus.fill(0.0);
        }

        let now = self.clock;
        for v in self.pool.voices_mut() {
            v.render(now, left, right, reverb.as_deref_mut(), chorus.as_deref_mut());
        }
        self.clock += expected as u64;
        Ok(())
    }
}
