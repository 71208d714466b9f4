//! A single playing note.
//!
//! A voice is set up in three steps: [`Voice::init`] binds it to a sample and
//! installs the default modulators, the resolver stacks zone generators and
//! modulators on top through [`Voice::apply_zone`], and [`Voice::start`]
//! evaluates the modulators and converts every generator into a DSP
//! parameter. After that, [`Voice::render`] is called once per buffer.
//!
//! Status moves `Clean -> On -> (Sustained) -> Off` and never backwards
//! within one note.

extern crate alloc;

use crate::channel::ChannelState;
use crate::dsp::PlaybackCursor;
use crate::envelope::{Envelope, EnvelopePhase};
use crate::error::ParamError;
use crate::generator::{GeneratorTable, GeneratorType};
use crate::modulator::{DEFAULT_MODULATORS, MAX_MODULATORS, MergeMode, ModulatorList};
use crate::resolver::ZoneMatch;
use crate::settings::{EngineSettings, EnvelopeClock};
use crate::zone::{LoopMode, Sample};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::LN_10;
use libm::logf;
use sfvoice_core::{
    FilterType, MAX_ATTENUATION_CB, NO_DELAY_TIMECENTS, PEAK_ATTENUATION_CB, Phase,
    ResonantFilter, TriangleLfo, cb_to_amp, cents_to_hz, convex, pan, tc_to_secs_attack,
    tc_to_secs_delay, tc_to_secs_release, timecents_to_secs,
};

use GeneratorType as G;

/// Loops shorter than this many frames play unlooped.
pub const MIN_LOOP_SIZE: u32 = 2;

/// Release time forced on voices killed by an exclusive class or sound-off.
const FAST_RELEASE_TC: f32 = -200.0;

/// Voice lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceStatus {
    /// Never used since construction
    #[default]
    Clean,
    /// Playing
    On,
    /// Note-off arrived while the sustain pedal was held
    Sustained,
    /// Finished; free for reuse
    Off,
}

/// Identity of the note a voice is started for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceNote {
    /// Engine-unique, increasing voice id
    pub id: u32,
    /// MIDI channel
    pub channel: u8,
    /// MIDI key
    pub key: u8,
    /// Note-on velocity
    pub velocity: u8,
    /// Engine tick at note-on
    pub start_time: u64,
    /// Automatic note-off after this many ticks
    pub duration: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Sanity {
    #[default]
    Clean,
    Dirty,
    Startup,
}

/// One sample being played with its envelopes, LFOs and filter.
#[derive(Debug)]
pub struct Voice {
    settings: EngineSettings,
    note: VoiceNote,
    status: VoiceStatus,
    sample: Option<Arc<Sample>>,
    ticks: u64,
    ms_stepped: u64,
    noteoff_at: Option<u64>,

    gens: GeneratorTable,
    mods: ModulatorList<MAX_MODULATORS>,

    cursor: PlaybackCursor,
    loop_mode: LoopMode,
    sanity: Sanity,

    pitch: f32,
    root_pitch_hz: f32,
    attenuation: f32,
    min_attenuation: f32,
    amp: f32,
    pan: f32,
    amp_left: f32,
    amp_right: f32,
    amp_reverb: f32,
    amp_chorus: f32,

    volenv: Envelope,
    modenv: Envelope,
    modlfo: TriangleLfo,
    viblfo: TriangleLfo,
    modlfo_to_pitch: f32,
    modlfo_to_vol: f32,
    modlfo_to_fc: f32,
    viblfo_to_pitch: f32,
    modenv_to_pitch: f32,
    modenv_to_fc: f32,

    filter: ResonantFilter,
    filter_fc_offset: f32,
    dsp_buf: Vec<f32>,
}

impl Voice {
    /// Creates an idle voice with its render buffer preallocated.
    pub fn new(settings: &EngineSettings) -> Self {
        let mut filter = ResonantFilter::new(settings.filter_precision);
        filter.set_ramp_length(settings.buffer_size as u32);
        Self {
            settings: *settings,
            note: VoiceNote::default(),
            status: VoiceStatus::Clean,
            sample: None,
            ticks: 0,
            ms_stepped: 0,
            noteoff_at: None,
            gens: GeneratorTable::default(),
            mods: ModulatorList::new(),
            cursor: PlaybackCursor::default(),
            loop_mode: LoopMode::Unlooped,
            sanity: Sanity::Clean,
            pitch: 0.0,
            root_pitch_hz: 0.0,
            attenuation: 0.0,
            min_attenuation: 0.0,
            amp: 0.0,
            pan: 0.0,
            amp_left: 0.0,
            amp_right: 0.0,
            amp_reverb: 0.0,
            amp_chorus: 0.0,
            volenv: Envelope::default(),
            modenv: Envelope::default(),
            modlfo: TriangleLfo::default(),
            viblfo: TriangleLfo::default(),
            modlfo_to_pitch: 0.0,
            modlfo_to_vol: 0.0,
            modlfo_to_fc: 0.0,
            viblfo_to_pitch: 0.0,
            modenv_to_pitch: 0.0,
            modenv_to_fc: 0.0,
            filter,
            filter_fc_offset: 0.0,
            dsp_buf: vec![0.0; settings.buffer_size],
        }
    }

    /// Binds the voice to a note and sample, resetting all state.
    ///
    /// Generators start at their defaults and the default modulators are
    /// installed. The voice stays [`VoiceStatus::Clean`] until
    /// [`Voice::start`].
    pub fn init(&mut self, note: VoiceNote, sample: Arc<Sample>) {
        self.note = note;
        self.status = VoiceStatus::Clean;
        self.sample = Some(sample);
        self.ticks = 0;
        self.ms_stepped = 0;
        self.noteoff_at = note.duration.map(|d| note.start_time.saturating_add(d));

        self.gens = GeneratorTable::default();
        self.mods.clear();
        for m in DEFAULT_MODULATORS {
            self.mods.add(m, MergeMode::Default);
        }

        self.cursor = PlaybackCursor::default();
        self.loop_mode = LoopMode::Unlooped;
        self.sanity = Sanity::Startup;
        self.amp = 0.0;
        self.min_attenuation = 0.0;
        self.filter_fc_offset = 0.0;

        self.volenv.reset();
        self.modenv.reset();
        self.modlfo.reset();
        self.viblfo.reset();

        let filter_type = if self.settings.filter_enabled {
            self.settings.filter_type
        } else {
            FilterType::Disabled
        };
        self.filter.init(filter_type, self.settings.filter_flags);
    }

    /// Stacks one resolved zone match onto this voice.
    pub fn apply_zone(&mut self, m: &ZoneMatch<'_>) {
        m.apply_generators(&mut self.gens);
        m.apply_modulators(&mut self.mods);
    }

    /// Evaluates every modulator, derives every parameter and starts playing.
    pub fn start(&mut self, channel: &ChannelState) {
        let (key, vel) = (self.effective_key(), self.effective_velocity());

        for ty in GeneratorType::ALL {
            self.gens.set_modulation(ty, 0.0);
        }
        for m in self.mods.iter() {
            let v = m.evaluate(channel, key, vel);
            self.gens[m.dest].modulation += v;
        }

        let scale = self.gens.value(G::ScaleTuning);
        self.gens.set(G::Pitch, scale * (f32::from(key) - 60.0) + 6000.0);

        for ty in GeneratorType::ALL {
            self.update_param_logged(ty);
        }

        self.min_attenuation = self.attenuation_floor(channel);
        self.status = VoiceStatus::On;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            voice = self.note.id,
            channel = self.note.channel,
            key,
            vel,
            sample = self.sample.as_deref().map_or("", |s| s.name.as_str()),
            "voice started"
        );
    }

    /// Lowest attenuation the live modulators could bring this voice to.
    ///
    /// Used to decide early whether a releasing voice has become inaudible.
    fn attenuation_floor(&self, channel: &ChannelState) -> f32 {
        let (key, vel) = (self.effective_key(), self.effective_velocity());
        let reduction: f32 = self
            .mods
            .iter()
            .filter(|m| m.dest == G::Attenuation && m.is_live())
            .map(|m| {
                let current = m.evaluate(channel, key, vel);
                (current - m.lower_bound()).max(0.0)
            })
            .sum();
        (self.attenuation - reduction).max(0.0)
    }

    fn update_param_logged(&mut self, ty: GeneratorType) {
        if let Err(err) = self.update_param(ty) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                voice = self.note.id,
                sample = self.sample.as_deref().map_or("", |s| s.name.as_str()),
                generator = ty.name(),
                %err,
                "generator update failed"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }

    /// Converts one generator's current value into its DSP parameter.
    pub fn update_param(&mut self, ty: GeneratorType) -> Result<(), ParamError> {
        let x = self.gens.value(ty);
        if !x.is_finite() {
            return Err(ParamError::NonFinite {
                generator: ty,
                value: x,
            });
        }
        let gain = self.settings.gain;

        match ty {
            G::Pan => {
                self.pan = ty.clamp(x);
                self.amp_left = pan(self.pan, true) * gain;
                self.amp_right = pan(self.pan, false) * gain;
            }
            G::Attenuation => self.attenuation = x.clamp(0.0, MAX_ATTENUATION_CB),
            G::Pitch | G::CoarseTune | G::FineTune => {
                self.pitch = self.gens.value(G::Pitch)
                    + 100.0 * self.gens.value(G::CoarseTune)
                    + self.gens.value(G::FineTune);
            }
            G::ReverbSend => self.amp_reverb = (x / 1000.0).clamp(0.0, 1.0) * gain,
            G::ChorusSend => self.amp_chorus = (x / 1000.0).clamp(0.0, 1.0) * gain,
            G::OverrideRootKey => {
                let sample = self
                    .sample
                    .as_deref()
                    .ok_or(ParamError::MissingSample { generator: ty })?;
                let root_cents = if x >= 0.0 {
                    x * 100.0
                } else {
                    f32::from(sample.root_key) * 100.0
                } - f32::from(sample.pitch_adjust);
                self.root_pitch_hz = cents_to_hz(root_cents) * self.settings.sample_rate
                    / sample.sample_rate.max(1) as f32;
            }
            G::FilterFc => {
                self.filter.set_cutoff_cents(self.gens[ty].base);
                self.filter_fc_offset = self.gens[ty].modulation;
            }
            G::FilterQ => self.filter.set_q(self.gens[ty].base, self.gens[ty].modulation),
            G::ModLfoToPitch => self.modlfo_to_pitch = ty.clamp(x),
            G::ModLfoToVol => self.modlfo_to_vol = ty.clamp(x),
            G::ModLfoToFilterFc => self.modlfo_to_fc = ty.clamp(x),
            G::VibLfoToPitch => self.viblfo_to_pitch = ty.clamp(x),
            G::ModEnvToPitch => self.modenv_to_pitch = ty.clamp(x),
            G::ModEnvToFilterFc => self.modenv_to_fc = ty.clamp(x),
            G::ModLfoDelay => self.modlfo.set_delay(self.secs_to_samples(tc_to_secs_delay(x))),
            G::VibLfoDelay => self.viblfo.set_delay(self.secs_to_samples(tc_to_secs_delay(x))),
            G::ModLfoFreq => self.modlfo.set_frequency_cents(
                x,
                self.settings.sample_rate,
                self.settings.buffer_size,
            ),
            G::VibLfoFreq => self.viblfo.set_frequency_cents(
                x,
                self.settings.sample_rate,
                self.settings.buffer_size,
            ),
            G::StartAddrOfs | G::StartAddrCoarseOfs => {
                let base = self.sample_field(ty, |s| s.start)?;
                self.cursor.start = self.offset_address(base, G::StartAddrOfs, G::StartAddrCoarseOfs);
                self.mark_dirty();
            }
            G::EndAddrOfs | G::EndAddrCoarseOfs => {
                let base = self.sample_field(ty, |s| s.end)?;
                self.cursor.end = self.offset_address(base, G::EndAddrOfs, G::EndAddrCoarseOfs);
                self.mark_dirty();
            }
            G::StartLoopAddrOfs | G::StartLoopAddrCoarseOfs => {
                let base = self.sample_field(ty, |s| s.loop_start)?;
                self.cursor.loop_start =
                    self.offset_address(base, G::StartLoopAddrOfs, G::StartLoopAddrCoarseOfs);
                self.mark_dirty();
            }
            G::EndLoopAddrOfs | G::EndLoopAddrCoarseOfs => {
                let base = self.sample_field(ty, |s| s.loop_end)?;
                self.cursor.loop_end =
                    self.offset_address(base, G::EndLoopAddrOfs, G::EndLoopAddrCoarseOfs);
                self.mark_dirty();
            }
            G::SampleModes => {
                self.loop_mode = LoopMode::from_generator(x);
                self.mark_dirty();
            }
            G::VolEnvDelay => self.volenv.set_delay(self.env_count(tc_to_secs_delay(x), false)),
            G::VolEnvAttack => self
                .volenv
                .set_attack(self.env_count(tc_to_secs_attack(x), true).max(1)),
            G::VolEnvHold | G::KeyToVolEnvHold => {
                let count = self.hold_decay_count(G::VolEnvHold, G::KeyToVolEnvHold, false);
                self.volenv.set_hold(count);
            }
            G::VolEnvDecay | G::VolEnvSustain | G::KeyToVolEnvDecay => {
                let count = self.hold_decay_count(G::VolEnvDecay, G::KeyToVolEnvDecay, true);
                let level = 1.0 - 0.001 * self.gens.value(G::VolEnvSustain);
                self.volenv.set_decay(count, level);
            }
            G::VolEnvRelease => {
                let tc = x.max(self.settings.min_volenv_release_tc);
                self.volenv.set_release(self.env_count(tc_to_secs_release(tc), true));
            }
            G::ModEnvDelay => self.modenv.set_delay(self.env_count(tc_to_secs_delay(x), false)),
            G::ModEnvAttack => self
                .modenv
                .set_attack(self.env_count(tc_to_secs_attack(x), true).max(1)),
            G::ModEnvHold | G::KeyToModEnvHold => {
                let count = self.hold_decay_count(G::ModEnvHold, G::KeyToModEnvHold, false);
                self.modenv.set_hold(count);
            }
            G::ModEnvDecay | G::ModEnvSustain | G::KeyToModEnvDecay => {
                let count = self.hold_decay_count(G::ModEnvDecay, G::KeyToModEnvDecay, true);
                let level = 1.0 - 0.001 * self.gens.value(G::ModEnvSustain);
                self.modenv.set_decay(count, level);
            }
            G::ModEnvRelease => self
                .modenv
                .set_release(self.env_count(tc_to_secs_release(x), true)),
            _ => {}
        }
        Ok(())
    }

    fn sample_field(&self, ty: GeneratorType, f: impl Fn(&Sample) -> u32) -> Result<u32, ParamError> {
        self.sample
            .as_deref()
            .map(f)
            .ok_or(ParamError::MissingSample { generator: ty })
    }

    fn offset_address(&self, base: u32, fine: GeneratorType, coarse: GeneratorType) -> u32 {
        let v = i64::from(base)
            + self.gens.value(fine) as i64
            + 32768 * self.gens.value(coarse) as i64;
        v.clamp(0, i64::from(u32::MAX)) as u32
    }

    fn mark_dirty(&mut self) {
        if self.sanity != Sanity::Startup {
            self.sanity = Sanity::Dirty;
        }
    }

    fn secs_to_samples(&self, secs: f32) -> u32 {
        (secs * self.settings.sample_rate) as u32
    }

    /// Number of envelope steps covering `secs`.
    fn env_count(&self, secs: f32, round: bool) -> u32 {
        let steps_per_sec = match self.settings.envelope_clock {
            EnvelopeClock::Buffer => self.settings.sample_rate / self.settings.buffer_size as f32,
            EnvelopeClock::Millisecond => 1000.0,
        };
        let count = secs * steps_per_sec + if round { 0.5 } else { 0.0 };
        count.max(0.0) as u32
    }

    /// Hold or decay length with key scaling applied.
    fn hold_decay_count(&self, time_gen: GeneratorType, key_gen: GeneratorType, is_decay: bool) -> u32 {
        let base = self.gens.value(time_gen);
        if !is_decay && base <= NO_DELAY_TIMECENTS {
            return 0;
        }
        let key = f32::from(self.effective_key());
        let tc = base + self.gens.value(key_gen) * (60.0 - key);
        let tc = tc.clamp(-12000.0, if is_decay { 8000.0 } else { 5000.0 });
        self.env_count(timecents_to_secs(tc), true)
    }

    /// Recomputes every modulator that reads controller `ctrl`.
    ///
    /// `is_cc` selects between MIDI CC numbers and general controllers.
    pub fn modulate(&mut self, channel: &ChannelState, is_cc: bool, ctrl: u8) {
        if !self.is_playing() {
            return;
        }
        let (key, vel) = (self.effective_key(), self.effective_velocity());
        for i in 0..self.mods.len() {
            let m = self.mods.as_slice()[i];
            if !m.depends_on(is_cc, ctrl) {
                continue;
            }
            let total = self.mods.total_for(m.dest, channel, key, vel);
            self.gens.set_modulation(m.dest, total);
            self.update_param_logged(m.dest);
        }
    }

    /// Recomputes the modulation of every modulated generator.
    pub fn modulate_all(&mut self, channel: &ChannelState) {
        if !self.is_playing() {
            return;
        }
        let (key, vel) = (self.effective_key(), self.effective_velocity());
        for i in 0..self.mods.len() {
            let mods = self.mods.as_slice();
            let dest = mods[i].dest;
            if mods[..i].iter().any(|m| m.dest == dest) {
                continue;
            }
            let total = self.mods.total_for(dest, channel, key, vel);
            self.gens.set_modulation(dest, total);
            self.update_param_logged(dest);
        }
    }

    /// Handles a note-off for this voice's key.
    ///
    /// With the sustain pedal held the voice only moves to
    /// [`VoiceStatus::Sustained`]; otherwise both envelopes release.
    pub fn note_off(&mut self, sustain_held: bool) {
        if self.status != VoiceStatus::On || self.is_released() {
            return;
        }
        if sustain_held {
            self.status = VoiceStatus::Sustained;
        } else {
            self.release();
        }
    }

    /// Moves both envelopes into release.
    ///
    /// An envelope caught mid-attack is rescaled so the release starts at
    /// the level currently heard instead of jumping.
    pub fn release(&mut self) {
        if !self.is_playing() {
            return;
        }
        if self.volenv.phase() == EnvelopePhase::Attack {
            let env = self.volenv.value();
            if env > 0.0 {
                let lfo = self.modlfo.value() * -self.modlfo_to_vol;
                let amp = env * cb_to_amp(lfo);
                let cb = -200.0 / LN_10 * logf(amp);
                let v = 1.0 - (cb - lfo) / PEAK_ATTENUATION_CB;
                self.volenv.set_value(v.clamp(0.0, 1.0));
            }
        }
        if self.modenv.phase() == EnvelopePhase::Attack {
            let env = self.modenv.value();
            if env > 0.0 {
                self.modenv.set_value(convex(127.0 * env));
            }
        }
        self.volenv.release();
        self.modenv.release();
    }

    /// Releases the voice over a short fixed time.
    pub fn force_release(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.gens.set(G::VolEnvRelease, FAST_RELEASE_TC);
        self.update_param_logged(G::VolEnvRelease);
        self.gens.set(G::ModEnvRelease, FAST_RELEASE_TC);
        self.update_param_logged(G::ModEnvRelease);
        self.release();
    }

    /// Silences the voice because a note of the same exclusive class started.
    pub fn kill_exclusive(&mut self) {
        if !self.is_playing() {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(voice = self.note.id, class = self.exclusive_class(), "exclusive class kill");
        self.gens.set(G::ExclusiveClass, 0.0);
        self.force_release();
    }

    /// Turns the voice off immediately.
    pub fn off(&mut self) {
        self.status = VoiceStatus::Off;
        self.volenv.set_phase(EnvelopePhase::Finished);
        self.modenv.set_phase(EnvelopePhase::Finished);
    }

    fn is_looping(&self) -> bool {
        match self.loop_mode {
            LoopMode::Unlooped => false,
            LoopMode::Continuous => true,
            LoopMode::UntilRelease => self.volenv.phase() < EnvelopePhase::Release,
        }
    }

    /// Keeps the playback region inside the sample after address changes.
    ///
    /// Returns `false` if the region is empty and the voice must stop.
    fn check_sample_sanity(&mut self) -> bool {
        if self.sanity == Sanity::Clean {
            return true;
        }
        let Some(sample) = self.sample.as_deref() else {
            return false;
        };
        let (min, max) = (sample.start, sample.end);
        let max_loop = sample.end.saturating_add(1);
        let c = &mut self.cursor;

        c.start = c.start.clamp(min, max);
        c.end = c.end.clamp(min, max);
        if c.start > c.end {
            core::mem::swap(&mut c.start, &mut c.end);
        }
        if c.start == c.end {
            return false;
        }

        if self.loop_mode != LoopMode::Unlooped {
            c.loop_start = c.loop_start.clamp(min, max_loop);
            c.loop_end = c.loop_end.clamp(min, max_loop);
            if c.loop_start > c.loop_end {
                core::mem::swap(&mut c.loop_start, &mut c.loop_end);
            }
            if c.loop_end - c.loop_start < MIN_LOOP_SIZE {
                self.loop_mode = LoopMode::Unlooped;
            }
        }

        if self.sanity == Sanity::Startup {
            c.phase = Phase::from_index(c.start);
            c.has_looped = false;
        } else if self.loop_mode != LoopMode::Unlooped && c.phase.index() >= c.loop_end {
            c.phase.set_index(c.loop_start);
        }
        self.sanity = Sanity::Clean;
        true
    }

    fn envelope_steps(&mut self, n: usize) -> u64 {
        match self.settings.envelope_clock {
            EnvelopeClock::Buffer => 1,
            EnvelopeClock::Millisecond => {
                let elapsed = (self.ticks + n as u64) as f64 * 1000.0
                    / f64::from(self.settings.sample_rate);
                let now_ms = elapsed as u64;
                let steps = now_ms.saturating_sub(self.ms_stepped);
                self.ms_stepped = now_ms;
                steps
            }
        }
    }

    /// Renders one buffer and mixes it into the output buses.
    ///
    /// `now` is the engine clock in ticks. Returns the number of samples
    /// produced; the voice turns itself off when it produces fewer than a
    /// full buffer.
    pub fn render(
        &mut self,
        now: u64,
        left: &mut [f32],
        right: &mut [f32],
        reverb: Option<&mut [f32]>,
        chorus: Option<&mut [f32]>,
    ) -> usize {
        if !self.is_playing() {
            return 0;
        }
        let n = self.dsp_buf.len().min(left.len()).min(right.len());

        if let Some(at) = self.noteoff_at
            && now >= at
        {
            self.noteoff_at = None;
            let ride_out = self.settings.ride_out_unlooped && self.loop_mode == LoopMode::Unlooped;
            if !ride_out {
                self.release();
            }
        }

        if !self.check_sample_sanity() {
            #[cfg(feature = "tracing")]
            tracing::debug!(voice = self.note.id, "empty playback region, voice off");
            self.off();
            return 0;
        }

        let steps = self.envelope_steps(n);
        for _ in 0..steps {
            self.volenv.step();
        }
        let env_phase = self.volenv.phase();
        if env_phase == EnvelopePhase::Finished {
            self.off();
            return 0;
        }
        if env_phase == EnvelopePhase::Delay {
            self.ticks += n as u64;
            return 0;
        }

        let env = self.volenv.value();
        let lfo_vol = self.modlfo.value() * -self.modlfo_to_vol;
        let target_amp = if env_phase == EnvelopePhase::Attack {
            cb_to_amp(self.attenuation) * cb_to_amp(lfo_vol) * env
        } else {
            cb_to_amp(self.attenuation) * cb_to_amp(PEAK_ATTENUATION_CB * (1.0 - env) + lfo_vol)
        };

        if env_phase > EnvelopePhase::Hold {
            let amp_max = cb_to_amp(self.min_attenuation) * env;
            if amp_max < self.settings.noise_floor / self.settings.gain.max(f32::MIN_POSITIVE) {
                #[cfg(feature = "tracing")]
                tracing::debug!(voice = self.note.id, amp_max, "below noise floor, voice off");
                self.off();
                return 0;
            }
        }

        for _ in 0..steps {
            self.modenv.step();
        }
        self.modlfo.step(self.ticks);
        self.viblfo.step(self.ticks);

        let modenv = self.modenv.value();
        let pitch = self.pitch
            + self.modlfo.value() * self.modlfo_to_pitch
            + self.viblfo.value() * self.viblfo_to_pitch
            + modenv * self.modenv_to_pitch;
        let incr = cents_to_hz(pitch) / self.root_pitch_hz;
        let incr = if incr.is_finite() { incr } else { 1.0 };

        let fc_mod = self.modlfo.value() * self.modlfo_to_fc + modenv * self.modenv_to_fc;
        self.filter
            .recalculate_coefficients(self.settings.sample_rate, fc_mod, self.filter_fc_offset);

        let looping = self.is_looping();
        let amp_incr = (target_amp - self.amp) / n.max(1) as f32;
        let Some(sample) = self.sample.as_deref() else {
            self.off();
            return 0;
        };
        let produced = self.cursor.render(
            &sample.data,
            &mut self.dsp_buf[..n],
            self.settings.interpolation,
            Phase::from_f32(incr),
            &mut self.amp,
            amp_incr,
            looping,
        );

        let buf = &mut self.dsp_buf[..produced];
        self.filter.apply(buf);

        let outs = left.iter_mut().zip(right.iter_mut()).zip(buf.iter());
        if self.pan.abs() < 0.5 {
            for ((l, r), &s) in outs {
                let v = s * self.amp_left;
                *l += v;
                *r += v;
            }
        } else {
            for ((l, r), &s) in outs {
                *l += s * self.amp_left;
                *r += s * self.amp_right;
            }
        }
        if let Some(bus) = reverb
            && self.amp_reverb > 0.0
        {
            for (o, &s) in bus.iter_mut().zip(buf.iter()) {
                *o += s * self.amp_reverb;
            }
        }
        if let Some(bus) = chorus
            && self.amp_chorus > 0.0
        {
            for (o, &s) in bus.iter_mut().zip(buf.iter()) {
                *o += s * self.amp_chorus;
            }
        }

        self.ticks += n as u64;
        if produced < n {
            self.off();
        }
        produced
    }

    fn effective_key(&self) -> u8 {
        let k = self.gens.value(G::KeyNum);
        if k >= 0.0 { k.min(127.0) as u8 } else { self.note.key }
    }

    fn effective_velocity(&self) -> u8 {
        let v = self.gens.value(G::Velocity);
        if v >= 0.0 { v.min(127.0) as u8 } else { self.note.velocity }
    }

    /// Engine-unique voice id.
    pub fn id(&self) -> u32 {
        self.note.id
    }

    /// Note this voice was started for.
    pub fn note(&self) -> &VoiceNote {
        &self.note
    }

    /// MIDI channel.
    pub fn channel(&self) -> u8 {
        self.note.channel
    }

    /// MIDI key as played (before any key-number override).
    pub fn key(&self) -> u8 {
        self.note.key
    }

    /// Lifecycle status.
    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    /// On or sustained.
    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self.status, VoiceStatus::On | VoiceStatus::Sustained)
    }

    /// Clean or off; can be reused without stealing.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self.status, VoiceStatus::Clean | VoiceStatus::Off)
    }

    /// Whether the volume envelope has reached release.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.volenv.phase() >= EnvelopePhase::Release
    }

    /// Exclusive class; 0 means none.
    pub fn exclusive_class(&self) -> i32 {
        self.gens.value(G::ExclusiveClass) as i32
    }

    /// Sample being played.
    pub fn sample(&self) -> Option<&Arc<Sample>> {
        self.sample.as_ref()
    }

    /// Generator table.
    pub fn generators(&self) -> &GeneratorTable {
        &self.gens
    }

    /// Replaces a generator's base value and re-derives its parameter.
    pub fn set_generator(&mut self, ty: GeneratorType, value: f32) {
        self.gens.set(ty, value);
        if self.is_playing() {
            self.update_param_logged(ty);
        }
    }

    /// Modulator list.
    pub fn modulators(&self) -> &ModulatorList<MAX_MODULATORS> {
        &self.mods
    }

    /// Volume envelope.
    pub fn volume_envelope(&self) -> &Envelope {
        &self.volenv
    }

    /// Modulation envelope.
    pub fn modulation_envelope(&self) -> &Envelope {
        &self.modenv
    }

    /// Playback cursor.
    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    /// Effective loop mode after sanity checks.
    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Attenuation in centibels.
    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }

    /// Lowest attenuation reachable through live modulators.
    pub fn min_attenuation(&self) -> f32 {
        self.min_attenuation
    }

    /// Pitch in cents before LFO and envelope modulation.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Reverb send amplitude.
    pub fn reverb_send(&self) -> f32 {
        self.amp_reverb
    }

    /// Chorus send amplitude.
    pub fn chorus_send(&self) -> f32 {
        self.amp_chorus
    }

    /// Ticks rendered since start.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Engine tick at note-on.
    pub fn start_time(&self) -> u64 {
        self.note.start_time
    }
}
