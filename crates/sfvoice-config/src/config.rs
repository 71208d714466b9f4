//! Engine configuration file format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use sfvoice_synth::{
    EngineSettings, EnvelopeClock, FilterFlags, FilterPrecision, FilterType, Interpolation,
};

use crate::error::{ConfigError, FileOp};
use crate::validation::validate_config;

/// Engine configuration as stored on disk.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # TOML Format
///
/// ```toml
/// [audio]
/// sample_rate = 44100
/// buffer_size = 64
/// gain = 0.2
/// interpolation = "cubic"
///
/// [voices]
/// polyphony = 256
/// drum_channel = 9
/// noise_floor = 0.00003
/// first_voice_only = false
/// ride_out_unlooped = false
///
/// [filter]
/// enabled = true
/// type = "lowpass"
/// precision = "double"
/// q_linear = false
/// q_zero_off = false
/// no_gain_amp = false
///
/// [envelope]
/// clock = "buffer"
/// min_release_tc = -7200.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SynthConfig {
    /// Output format and interpolation.
    pub audio: AudioConfig,
    /// Voice pool behaviour.
    pub voices: VoiceConfig,
    /// Per-voice filter.
    pub filter: FilterConfig,
    /// Envelope timing.
    pub envelope: EnvelopeConfig,
}

/// `[audio]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per render call.
    pub buffer_size: usize,
    /// Master gain.
    pub gain: f32,
    /// Sample interpolation kernel.
    pub interpolation: InterpolationMode,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let d = EngineSettings::default();
        Self {
            sample_rate: d.sample_rate as u32,
            buffer_size: d.buffer_size,
            gain: d.gain,
            interpolation: d.interpolation.into(),
        }
    }
}

/// `[voices]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Number of preallocated voices.
    pub polyphony: usize,
    /// Channel protected from voice stealing.
    pub drum_channel: u8,
    /// Amplitude below which releasing voices are retired.
    pub noise_floor: f32,
    /// Start only the first matching zone per note.
    pub first_voice_only: bool,
    /// Let unlooped samples play past a note duration.
    pub ride_out_unlooped: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        let d = EngineSettings::default();
        Self {
            polyphony: d.polyphony,
            drum_channel: d.drum_channel,
            noise_floor: d.noise_floor,
            first_voice_only: d.first_voice_only,
            ride_out_unlooped: d.ride_out_unlooped,
        }
    }
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Global filter switch.
    pub enabled: bool,
    /// Filter response.
    #[serde(rename = "type")]
    pub filter_type: FilterMode,
    /// Coefficient and state precision.
    pub precision: PrecisionMode,
    /// Read the Q generator as linear instead of centibels.
    pub q_linear: bool,
    /// Make a Q of zero mean "no resonance".
    pub q_zero_off: bool,
    /// Disable resonance gain compensation.
    pub no_gain_amp: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let d = EngineSettings::default();
        Self {
            enabled: d.filter_enabled,
            filter_type: d.filter_type.into(),
            precision: d.filter_precision.into(),
            q_linear: d.filter_flags.contains(FilterFlags::Q_LINEAR),
            q_zero_off: d.filter_flags.contains(FilterFlags::Q_ZERO_OFF),
            no_gain_amp: d.filter_flags.contains(FilterFlags::NO_GAIN_AMP),
        }
    }
}

impl FilterConfig {
    /// Flags value for the engine.
    pub fn flags(&self) -> FilterFlags {
        [
            (self.q_linear, FilterFlags::Q_LINEAR),
            (self.q_zero_off, FilterFlags::Q_ZERO_OFF),
            (self.no_gain_amp, FilterFlags::NO_GAIN_AMP),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FilterFlags::NONE, |acc, (_, f)| acc.union(f))
    }
}

/// `[envelope]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Envelope counting unit.
    pub clock: ClockMode,
    /// Shortest volume release in timecents.
    pub min_release_tc: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        let d = EngineSettings::default();
        Self {
            clock: d.envelope_clock.into(),
            min_release_tc: d.min_volenv_release_tc,
        }
    }
}

/// Interpolation kernel names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Nearest sample
    None,
    /// Two-point linear
    Linear,
    /// Four-point cubic
    Cubic,
    /// Seven-point windowed sinc
    Sinc7,
}

impl From<Interpolation> for InterpolationMode {
    fn from(i: Interpolation) -> Self {
        match i {
            Interpolation::None => Self::None,
            Interpolation::Linear => Self::Linear,
            Interpolation::Cubic => Self::Cubic,
            Interpolation::Sinc7 => Self::Sinc7,
        }
    }
}

impl From<InterpolationMode> for Interpolation {
    fn from(i: InterpolationMode) -> Self {
        match i {
            InterpolationMode::None => Self::None,
            InterpolationMode::Linear => Self::Linear,
            InterpolationMode::Cubic => Self::Cubic,
            InterpolationMode::Sinc7 => Self::Sinc7,
        }
    }
}

/// Filter response names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Bypassed
    Disabled,
    /// Resonant low-pass
    Lowpass,
    /// Resonant high-pass
    Highpass,
}

impl From<FilterType> for FilterMode {
    fn from(t: FilterType) -> Self {
        match t {
            FilterType::Disabled => Self::Disabled,
            FilterType::LowPass => Self::Lowpass,
            FilterType::HighPass => Self::Highpass,
        }
    }
}

impl From<FilterMode> for FilterType {
    fn from(t: FilterMode) -> Self {
        match t {
            FilterMode::Disabled => Self::Disabled,
            FilterMode::Lowpass => Self::LowPass,
            FilterMode::Highpass => Self::HighPass,
        }
    }
}

/// Filter precision names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionMode {
    /// `f32` state
    Single,
    /// `f64` state
    Double,
}

impl From<FilterPrecision> for PrecisionMode {
    fn from(p: FilterPrecision) -> Self {
        match p {
            FilterPrecision::Single => Self::Single,
            FilterPrecision::Double => Self::Double,
        }
    }
}

impl From<PrecisionMode> for FilterPrecision {
    fn from(p: PrecisionMode) -> Self {
        match p {
            PrecisionMode::Single => Self::Single,
            PrecisionMode::Double => Self::Double,
        }
    }
}

/// Envelope clock names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// One step per render buffer
    Buffer,
    /// One step per millisecond
    Millisecond,
}

impl From<EnvelopeClock> for ClockMode {
    fn from(c: EnvelopeClock) -> Self {
        match c {
            EnvelopeClock::Buffer => Self::Buffer,
            EnvelopeClock::Millisecond => Self::Millisecond,
        }
    }
}

impl From<ClockMode> for EnvelopeClock {
    fn from(c: ClockMode) -> Self {
        match c {
            ClockMode::Buffer => Self::Buffer,
            ClockMode::Millisecond => Self::Millisecond,
        }
    }
}

impl SynthConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(FileOp::Read, path, e))?;
        toml::from_str(&content).map_err(|e| ConfigError::parse(Some(path), e))
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::parse(None, e))
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::io(FileOp::CreateDir, parent, e))?;
            }
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(FileOp::Write, path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self)?;
        Ok(())
    }

    /// Validated engine settings.
    pub fn to_settings(&self) -> Result<EngineSettings, ConfigError> {
        self.validate()?;
        Ok(EngineSettings {
            sample_rate: self.audio.sample_rate as f32,
            buffer_size: self.audio.buffer_size,
            polyphony: self.voices.polyphony,
            interpolation: self.audio.interpolation.into(),
            filter_type: self.filter.filter_type.into(),
            filter_flags: self.filter.flags(),
            filter_precision: self.filter.precision.into(),
            filter_enabled: self.filter.enabled,
            envelope_clock: self.envelope.clock.into(),
            min_volenv_release_tc: self.envelope.min_release_tc,
            noise_floor: self.voices.noise_floor,
            gain: self.audio.gain,
            ride_out_unlooped: self.voices.ride_out_unlooped,
            first_voice_only: self.voices.first_voice_only,
            drum_channel: self.voices.drum_channel,
        })
    }
}

impl From<&EngineSettings> for SynthConfig {
    fn from(s: &EngineSettings) -> Self {
        Self {
            audio: AudioConfig {
                sample_rate: s.sample_rate as u32,
                buffer_size: s.buffer_size,
                gain: s.gain,
                interpolation: s.interpolation.into(),
            },
            voices: VoiceConfig {
                polyphony: s.polyphony,
                drum_channel: s.drum_channel,
                noise_floor: s.noise_floor,
                first_voice_only: s.first_voice_only,
                ride_out_unlooped: s.ride_out_unlooped,
            },
            filter: FilterConfig {
                enabled: s.filter_enabled,
                filter_type: s.filter_type.into(),
                precision: s.filter_precision.into(),
                q_linear: s.filter_flags.contains(FilterFlags::Q_LINEAR),
                q_zero_off: s.filter_flags.contains(FilterFlags::Q_ZERO_OFF),
                no_gain_amp: s.filter_flags.contains(FilterFlags::NO_GAIN_AMP),
            },
            envelope: EnvelopeConfig {
                clock: s.envelope_clock.into(),
                min_release_tc: s.min_volenv_release_tc,
            },
        }
    }
}
