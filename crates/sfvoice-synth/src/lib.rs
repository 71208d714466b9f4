//! sfvoice Synth - SoundFont-style voice engine
//!
//! This crate turns note events into audio by playing PCM samples through
//! per-voice envelopes, LFOs and a resonant filter, configured by the
//! generator/modulator parameter model of the SoundFont 2 format.
//!
//! # Core Components
//!
//! ## Bank model
//!
//! The in-memory structure a bank loader fills in:
//!
//! - [`Sample`] - shared 16-bit PCM plus loop points and root key
//! - [`Zone`] - key/velocity range with generator and modulator overrides
//! - [`Instrument`] / [`Preset`] - zone collections, each with an optional global zone
//!
//! ## Parameter model
//!
//! - [`GeneratorType`] / [`GeneratorTable`] - the 60 synthesis parameters
//! - [`Modulator`] / [`ModulatorList`] - controller-driven parameter offsets
//! - [`ZoneMatch`] / [`for_each_match`] - zone matching and precedence
//!
//! ## Voices
//!
//! - [`Voice`] - one playing sample with envelopes, LFOs and filter
//! - [`Envelope`] - six-phase DAHDSR segment envelope
//! - [`VoicePool`] - preallocated voices with priority-based stealing
//! - [`Synth`] - channels, note handling and block rendering
//!
//! ```rust
//! use std::sync::Arc;
//! use sfvoice_synth::{
//!     EngineSettings, GeneratorType, Instrument, Preset, Sample, Synth, Zone,
//! };
//!
//! let data: Vec<i16> = (0..100).map(|i| if i < 50 { 12000 } else { -12000 }).collect();
//! let sample = Arc::new(Sample::new("square", Arc::from(data), 44100, 60).with_loop(0, 100));
//! let inst = Arc::new(
//!     Instrument::new("square").with_zone(
//!         Zone::new(sample)
//!             .with_generator(GeneratorType::SampleModes, 1.0)
//!             .with_generator(GeneratorType::VolEnvRelease, -1200.0),
//!     ),
//! );
//! let preset = Arc::new(Preset::new("square", 0, 0).with_zone(Zone::new(inst)));
//!
//! let mut synth = Synth::new(EngineSettings::default()).unwrap();
//! synth.set_channel_preset(0, Some(preset)).unwrap();
//! synth.note_on(0, 69, 100, None).unwrap();
//!
//! let (mut left, mut right) = (vec![0.0; 64], vec![0.0; 64]);
//! for _ in 0..100 {
//!     synth.render_block(&mut left, &mut right, None, None).unwrap();
//! }
//! synth.note_off(0, 69).unwrap();
//! assert_eq!(synth.active_voice_count(), 1);
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! sfvoice-synth = { version = "0.1", default-features = false }
//! ```
//!
//! # Logging
//!
//! With the `tracing` feature, parameter failures, voice stealing and
//! retirement are reported through `tracing` events. Nothing is logged on
//! the per-sample path.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod channel;
pub mod dsp;
pub mod envelope;
pub mod error;
pub mod event;
pub mod generator;
pub mod modulator;
pub mod pool;
pub mod resolver;
pub mod settings;
pub mod synth;
pub mod voice;
pub mod zone;

// Re-export main types at crate root
pub use channel::{ChannelState, MIDI_CHANNELS, PITCH_BEND_CENTER, cc};
pub use dsp::PlaybackCursor;
pub use envelope::{Envelope, EnvelopePhase, EnvelopeSegment};
pub use error::{ParamError, SynthError};
pub use event::SynthEvent;
pub use generator::{GEN_COUNT, GenFlag, Generator, GeneratorInfo, GeneratorTable, GeneratorType};
pub use modulator::{
    DEFAULT_MODULATORS, GeneralController, MAX_MODULATORS, MergeMode, ModFlags, ModSource,
    Modulator, ModulatorList, VEL_TO_FILTER_FC, transform,
};
pub use pool::VoicePool;
pub use resolver::{ZoneMatch, for_each_match};
pub use settings::{EngineSettings, EnvelopeClock, MAX_BUFFER_SIZE};
pub use synth::Synth;
pub use voice::{MIN_LOOP_SIZE, Voice, VoiceNote, VoiceStatus};
pub use zone::{Instrument, InstrumentZone, LoopMode, NoteRange, Preset, PresetZone, Sample, Zone};

// Re-export commonly used types from sfvoice-core
pub use sfvoice_core::{FilterFlags, FilterPrecision, FilterType, Interpolation};
