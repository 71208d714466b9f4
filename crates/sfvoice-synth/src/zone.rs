//! In-memory instrument bank model: samples, zones, instruments, presets.
//!
//! This is the interface a bank loader fills in. Everything here is
//! immutable once built and shared between voices through [`Arc`].

extern crate alloc;

use crate::generator::{GeneratorTable, GeneratorType};
use crate::modulator::Modulator;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use once_cell::race::OnceBox;

/// PCM sample data plus playback metadata.
///
/// `end` is the index of the last valid frame; `loop_end` is the first frame
/// after the loop, as in the bank format.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Display name
    pub name: String,
    /// Mono 16-bit PCM, shared read-only by every voice playing it
    pub data: Arc<[i16]>,
    /// First frame
    pub start: u32,
    /// Last frame (inclusive)
    pub end: u32,
    /// First frame of the loop
    pub loop_start: u32,
    /// Frame after the last loop frame
    pub loop_end: u32,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// MIDI key at which the sample plays at its recorded pitch
    pub root_key: u8,
    /// Pitch correction in cents
    pub pitch_adjust: i8,
}

impl Sample {
    /// Creates an unlooped sample covering all of `data`.
    pub fn new(name: impl Into<String>, data: Arc<[i16]>, sample_rate: u32, root_key: u8) -> Self {
        let len = data.len() as u32;
        Self {
            name: name.into(),
            data,
            start: 0,
            end: len.saturating_sub(1),
            loop_start: 0,
            loop_end: len,
            sample_rate,
            root_key,
            pitch_adjust: 0,
        }
    }

    /// Sets the loop points.
    pub fn with_loop(mut self, loop_start: u32, loop_end: u32) -> Self {
        self.loop_start = loop_start;
        self.loop_end = loop_end;
        self
    }

    /// Sets the pitch correction.
    pub fn with_pitch_adjust(mut self, cents: i8) -> Self {
        self.pitch_adjust = cents;
        self
    }
}

/// Sample playback mode (`sampleModes` generator).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once from start to end
    #[default]
    Unlooped,
    /// Loop for the whole note, including release
    Continuous,
    /// Loop until note-off, then play through to the end
    UntilRelease,
}

impl LoopMode {
    /// Decodes the generator value. The reserved value 2 plays unlooped.
    pub fn from_generator(value: f32) -> Self {
        match value as i32 {
            1 => Self::Continuous,
            3 => Self::UntilRelease,
            _ => Self::Unlooped,
        }
    }
}

/// Inclusive key or velocity range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteRange {
    /// Lowest value
    pub lo: u8,
    /// Highest value
    pub hi: u8,
}

impl Default for NoteRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl NoteRange {
    /// Covers 0..=127.
    pub const FULL: Self = Self { lo: 0, hi: 127 };

    /// Creates a range, swapping the bounds if given backwards.
    pub fn new(lo: u8, hi: u8) -> Self {
        Self {
            lo: lo.min(hi),
            hi: lo.max(hi),
        }
    }

    /// Whether `v` is inside.
    #[inline]
    pub fn contains(&self, v: u8) -> bool {
        (self.lo..=self.hi).contains(&v)
    }
}

/// A key/velocity-ranged scope of generator and modulator overrides.
///
/// Zones without a target are global zones: they supply defaults for their
/// sibling zones and are never matched on their own.
pub struct Zone<T> {
    /// Keys this zone answers to
    pub key_range: NoteRange,
    /// Velocities this zone answers to
    pub vel_range: NoteRange,
    /// Referenced instrument or sample, `None` for a global zone
    pub target: Option<T>,
    generators: Vec<(GeneratorType, f32)>,
    modulators: Vec<Modulator>,
    dense: OnceBox<GeneratorTable>,
}

/// Zone of a preset, referencing an instrument.
pub type PresetZone = Zone<Arc<Instrument>>;

/// Zone of an instrument, referencing a sample.
pub type InstrumentZone = Zone<Arc<Sample>>;

impl<T> Zone<T> {
    /// Local zone referencing `target`.
    pub fn new(target: T) -> Self {
        Self::with_target(Some(target))
    }

    /// Global zone.
    pub fn global() -> Self {
        Self::with_target(None)
    }

    fn with_target(target: Option<T>) -> Self {
        Self {
            key_range: NoteRange::FULL,
            vel_range: NoteRange::FULL,
            target,
            generators: Vec::new(),
            modulators: Vec::new(),
            dense: OnceBox::new(),
        }
    }

    /// Restricts the key range.
    pub fn with_key_range(mut self, lo: u8, hi: u8) -> Self {
        self.key_range = NoteRange::new(lo, hi);
        self
    }

    /// Restricts the velocity range.
    pub fn with_vel_range(mut self, lo: u8, hi: u8) -> Self {
        self.vel_range = NoteRange::new(lo, hi);
        self
    }

    /// Adds a generator value.
    pub fn with_generator(mut self, ty: GeneratorType, value: f32) -> Self {
        self.generators.push((ty, value));
        self.dense = OnceBox::new();
        self
    }

    /// Adds a modulator.
    pub fn with_modulator(mut self, m: Modulator) -> Self {
        self.modulators.push(m);
        self
    }

    /// Whether the zone answers to this note.
    #[inline]
    pub fn matches(&self, key: u8, vel: u8) -> bool {
        self.key_range.contains(key) && self.vel_range.contains(vel)
    }

    /// Whether this is a global zone.
    pub fn is_global(&self) -> bool {
        self.target.is_none()
    }

    /// Generators as given, in order.
    pub fn generators(&self) -> &[(GeneratorType, f32)] {
        &self.generators
    }

    /// Modulators as given, in order.
    pub fn modulators(&self) -> &[Modulator] {
        &self.modulators
    }

    /// Dense generator table, built on first use and cached on the zone.
    ///
    /// Unspecified generators are flagged unused.
    pub fn dense_generators(&self) -> &GeneratorTable {
        self.dense
            .get_or_init(|| Box::new(GeneratorTable::from_sparse(&self.generators)))
    }
}

impl<T: fmt::Debug> fmt::Debug for Zone<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("key_range", &self.key_range)
            .field("vel_range", &self.vel_range)
            .field("target", &self.target)
            .field("generators", &self.generators)
            .field("modulators", &self.modulators)
            .field("dense_cached", &self.dense.get().is_some())
            .finish()
    }
}

/// A set of sample zones.
#[derive(Debug)]
pub struct Instrument {
    /// Display name
    pub name: String,
    /// Defaults for the local zones
    pub global_zone: Option<InstrumentZone>,
    /// Local zones
    pub zones: Vec<InstrumentZone>,
}

impl Instrument {
    /// Creates an instrument without zones.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_zone: None,
            zones: Vec::new(),
        }
    }

    /// Sets the global zone.
    pub fn with_global_zone(mut self, zone: InstrumentZone) -> Self {
        self.global_zone = Some(zone);
        self
    }

    /// Adds a local zone.
    pub fn with_zone(mut self, zone: InstrumentZone) -> Self {
        self.zones.push(zone);
        self
    }
}

/// A playable program: a set of instrument zones.
#[derive(Debug)]
pub struct Preset {
    /// Display name
    pub name: String,
    /// Bank number
    pub bank: u16,
    /// Program number
    pub program: u8,
    /// Defaults for the local zones
    pub global_zone: Option<PresetZone>,
    /// Local zones
    pub zones: Vec<PresetZone>,
}

impl Preset {
    /// Creates a preset without zones.
    pub fn new(name: impl Into<String>, bank: u16, program: u8) -> Self {
        Self {
            name: name.into(),
            bank,
            program,
            global_zone: None,
            zones: Vec::new(),
        }
    }

    /// Sets the global zone.
    pub fn with_global_zone(mut self, zone: PresetZone) -> Self {
        self.global_zone = Some(zone);
        self
    }

    /// Adds a local zone.
    pub fn with_zone(mut self, zone: PresetZone) -> Self {
        self.zones.push(zone);
        self
    }
}
