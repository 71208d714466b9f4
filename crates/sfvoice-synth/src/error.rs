//! Error types for the voice engine.
//!
//! None of these are fatal: the worst outcome of any of them is a missing
//! or slightly wrong note.

use crate::generator::GeneratorType;
use thiserror::Error;

/// Errors returned by the control-plane operations of [`crate::Synth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SynthError {
    /// Channel number outside `0..16`
    #[error("invalid MIDI channel {0}")]
    InvalidChannel(u8),

    /// Note-on on a channel without an assigned preset
    #[error("no preset assigned to channel {0}")]
    NoPreset(u8),

    /// Every voice is busy and none could be stolen
    #[error("no free voice available")]
    NoFreeVoice,

    /// Output buffers do not match the configured buffer size
    #[error("buffer length {actual} does not match configured buffer size {expected}")]
    InvalidBufferSize {
        /// Configured buffer size.
        expected: usize,
        /// Length of the buffer that was passed in.
        actual: usize,
    },
}

/// Failure while deriving one voice parameter from its generator.
///
/// Returned by [`crate::Voice::update_param`]. The voice logs and discards
/// it so that the remaining generators are still applied.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParamError {
    /// Generator value plus modulation is NaN or infinite
    #[error("generator {generator:?} has non-finite value {value}")]
    NonFinite {
        /// Offending generator.
        generator: GeneratorType,
        /// Its base plus modulation value.
        value: f32,
    },

    /// Generator needs sample metadata but the voice has no sample
    #[error("generator {generator:?} requires a sample")]
    MissingSample {
        /// Offending generator.
        generator: GeneratorType,
    },
}
