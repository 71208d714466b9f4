//! Engine-wide settings shared by every voice.

use sfvoice_core::{FilterFlags, FilterPrecision, FilterType, Interpolation};

/// Largest render buffer the engine accepts.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Unit the envelope segment lengths are counted in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeClock {
    /// One envelope step per render buffer
    #[default]
    Buffer,
    /// One envelope step per elapsed millisecond
    Millisecond,
}

/// Settings fixed for the lifetime of a [`crate::Synth`].
///
/// Voices copy what they need at construction so the render path never
/// reaches back into the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    /// Output sample rate in Hz
    pub sample_rate: f32,
    /// Samples per render call
    pub buffer_size: usize,
    /// Number of preallocated voices
    pub polyphony: usize,
    /// Sample interpolation kernel
    pub interpolation: Interpolation,
    /// Response of the per-voice filter
    pub filter_type: FilterType,
    /// Q interpretation flags of the per-voice filter
    pub filter_flags: FilterFlags,
    /// Numeric precision of the per-voice filter
    pub filter_precision: FilterPrecision,
    /// Global filter switch
    pub filter_enabled: bool,
    /// Envelope counting unit
    pub envelope_clock: EnvelopeClock,
    /// Shortest allowed volume envelope release in timecents
    pub min_volenv_release_tc: f32,
    /// Amplitude below which a releasing voice is retired
    pub noise_floor: f32,
    /// Master gain applied to every voice
    pub gain: f32,
    /// Let unlooped samples play to their end past a note duration
    pub ride_out_unlooped: bool,
    /// Start only the first matching zone per note-on
    pub first_voice_only: bool,
    /// Channel whose voices are protected from stealing
    pub drum_channel: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            buffer_size: 64,
            polyphony: 256,
            interpolation: Interpolation::Cubic,
            filter_type: FilterType::LowPass,
            filter_flags: FilterFlags::NONE,
            filter_precision: FilterPrecision::Double,
            filter_enabled: true,
            envelope_clock: EnvelopeClock::Buffer,
            min_volenv_release_tc: -7200.0,
            noise_floor: 0.00003,
            gain: 0.2,
            ride_out_unlooped: false,
            first_voice_only: false,
            drum_channel: 9,
        }
    }
}

impl EngineSettings {
    /// Whether the buffer size is within `1..=MAX_BUFFER_SIZE`.
    pub fn has_valid_buffer_size(&self) -> bool {
        (1..=MAX_BUFFER_SIZE).contains(&self.buffer_size)
    }
}
