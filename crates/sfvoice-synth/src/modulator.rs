//! Modulators: controller-to-generator routing rules.
//!
//! A modulator reads up to two sources (a MIDI CC or one of the general
//! controllers), normalizes each to `0.0..=1.0`, shapes it with one of five
//! curves, and adds `amount * shaped1 * shaped2` to its destination
//! generator's modulation offset.
//!
//! ## Curves
//!
//! | Curve | Unipolar | Bipolar |
//! |-------|----------|---------|
//! | linear | `x` | `2x - 1` |
//! | concave | `concave(127x)` | split at 0.5, mirrored |
//! | convex | `convex(127x)` | split at 0.5, mirrored |
//! | switch | `x >= 0.5` | `±1` |
//! | sine | `sin(π/2 · 0.87 · x)` | split at 0.5, mirrored |
//!
//! Each can be negated (`NEGATIVE`), giving 20 shapes in total.

use crate::channel::{ChannelState, cc};
use crate::generator::GeneratorType;
use libm::sinf;
use sfvoice_core::{concave, convex};

/// Source transform flags, in the bank-format bit layout plus a sine bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ModFlags(u8);

impl ModFlags {
    /// Increasing, unipolar, linear, general controller.
    pub const NONE: Self = Self(0);
    /// Source runs from max to min
    pub const NEGATIVE: Self = Self(1);
    /// Source is mapped to -1..=1
    pub const BIPOLAR: Self = Self(2);
    /// Concave curve
    pub const CONCAVE: Self = Self(4);
    /// Convex curve
    pub const CONVEX: Self = Self(8);
    /// Switch (step at 0.5)
    pub const SWITCH: Self = Self(12);
    /// Source id is a MIDI continuous controller
    pub const CC: Self = Self(16);
    /// Sine curve
    pub const SINE: Self = Self(0x80);

    const CURVE_MASK: u8 = 12;

    /// Builds flags from the raw byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the source is a continuous controller.
    #[inline]
    pub const fn is_cc(self) -> bool {
        self.0 & Self::CC.0 != 0
    }

    /// Whether the source maps to -1..=1.
    #[inline]
    pub const fn is_bipolar(self) -> bool {
        self.0 & Self::BIPOLAR.0 != 0
    }

    /// Whether the source direction is inverted.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 & Self::NEGATIVE.0 != 0
    }

    fn curve(self) -> Curve {
        if self.0 & Self::SINE.0 != 0 {
            return Curve::Sine;
        }
        match self.0 & Self::CURVE_MASK {
            4 => Curve::Concave,
            8 => Curve::Convex,
            12 => Curve::Switch,
            _ => Curve::Linear,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Curve {
    Linear,
    Concave,
    Convex,
    Switch,
    Sine,
}

/// Non-CC modulator sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneralController {
    /// No source
    None = 0,
    /// Note-on velocity
    NoteOnVelocity = 2,
    /// Note-on key number
    NoteOnKey = 3,
    /// Polyphonic key pressure
    PolyPressure = 10,
    /// Channel pressure
    ChannelPressure = 13,
    /// Pitch wheel
    PitchWheel = 14,
    /// Pitch wheel sensitivity
    PitchWheelSensitivity = 16,
}

impl GeneralController {
    /// Decodes a general controller index.
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::None,
            2 => Self::NoteOnVelocity,
            3 => Self::NoteOnKey,
            10 => Self::PolyPressure,
            13 => Self::ChannelPressure,
            14 => Self::PitchWheel,
            16 => Self::PitchWheelSensitivity,
            _ => return None,
        })
    }
}

/// One modulator input: controller id plus transform flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ModSource {
    /// CC number or [`GeneralController`] index
    pub id: u8,
    /// Transform flags
    pub flags: ModFlags,
}

impl ModSource {
    /// The "no source" source.
    pub const NONE: Self = Self {
        id: 0,
        flags: ModFlags::NONE,
    };

    /// General-controller source.
    pub const fn general(controller: GeneralController, flags: ModFlags) -> Self {
        Self {
            id: controller as u8,
            flags,
        }
    }

    /// Continuous-controller source.
    pub const fn cc(number: u8, flags: ModFlags) -> Self {
        Self {
            id: number & 0x7f,
            flags: flags.union(ModFlags::CC),
        }
    }

    /// Decodes a raw bank-format source enumerator.
    ///
    /// Bits 0-6 index, bit 7 CC flag, bit 8 direction, bit 9 polarity,
    /// bits 10-15 curve type (0 linear, 1 concave, 2 convex, 3 switch).
    pub fn from_sf2(raw: u16) -> Self {
        let mut flags = 0u8;
        if raw & 0x80 != 0 {
            flags |= ModFlags::CC.0;
        }
        if raw & 0x100 != 0 {
            flags |= ModFlags::NEGATIVE.0;
        }
        if raw & 0x200 != 0 {
            flags |= ModFlags::BIPOLAR.0;
        }
        flags |= match raw >> 10 {
            1 => ModFlags::CONCAVE.0,
            2 => ModFlags::CONVEX.0,
            3 => ModFlags::SWITCH.0,
            _ => 0,
        };
        Self {
            id: (raw & 0x7f) as u8,
            flags: ModFlags(flags),
        }
    }

    /// Whether this is the "no source" general controller.
    #[inline]
    pub fn is_none(&self) -> bool {
        !self.flags.is_cc() && self.id == GeneralController::None as u8
    }

    /// Whether the engine can read this source.
    pub fn is_supported(&self) -> bool {
        if self.flags.is_cc() {
            // bank select, data entry, (N)RPN and channel mode messages are not sources
            !matches!(self.id, 0 | 6 | 32 | 38 | 98..=101 | 120..=127)
        } else {
            GeneralController::from_id(self.id).is_some()
        }
    }

    /// Whether the source is `controller` of the given kind.
    #[inline]
    pub fn is(&self, is_cc: bool, controller: u8) -> bool {
        self.flags.is_cc() == is_cc && self.id == controller
    }

    /// Whether the value can change while the note sounds.
    fn is_live(&self) -> bool {
        self.flags.is_cc()
            || matches!(
                GeneralController::from_id(self.id),
                Some(
                    GeneralController::PolyPressure
                        | GeneralController::ChannelPressure
                        | GeneralController::PitchWheel
                        | GeneralController::PitchWheelSensitivity
                )
            )
    }

    /// Raw value and its range.
    fn raw_value(&self, channel: &ChannelState, key: u8, vel: u8) -> (f32, f32) {
        if self.flags.is_cc() {
            return (f32::from(channel.cc(self.id)), 128.0);
        }
        match GeneralController::from_id(self.id) {
            Some(GeneralController::NoteOnVelocity) => (f32::from(vel), 128.0),
            Some(GeneralController::NoteOnKey) => (f32::from(key), 128.0),
            Some(GeneralController::PolyPressure) => (f32::from(channel.key_pressure(key)), 128.0),
            Some(GeneralController::ChannelPressure) => {
                (f32::from(channel.channel_pressure()), 128.0)
            }
            Some(GeneralController::PitchWheel) => (f32::from(channel.pitch_bend()), 16384.0),
            Some(GeneralController::PitchWheelSensitivity) => {
                (f32::from(channel.pitch_wheel_sensitivity()), 128.0)
            }
            Some(GeneralController::None) | None => (0.0, 128.0),
        }
    }

    /// Normalized and shaped source value.
    pub fn value(&self, channel: &ChannelState, key: u8, vel: u8) -> f32 {
        let (val, range) = self.raw_value(channel, key, vel);
        transform(val / range, self.flags)
    }
}

/// Shapes a normalized source value.
pub fn transform(norm: f32, flags: ModFlags) -> f32 {
    const SINE_SCALE: f32 = core::f32::consts::FRAC_PI_2 * 0.87;

    let shape = |x: f32| -> f32 {
        match flags.curve() {
            Curve::Linear => x,
            Curve::Concave => concave(127.0 * x),
            Curve::Convex => convex(127.0 * x),
            Curve::Sine => sinf(SINE_SCALE * x),
            Curve::Switch => {
                if x >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    };

    let x = if flags.is_negative() { 1.0 - norm } else { norm };

    if !flags.is_bipolar() {
        return shape(x);
    }

    match flags.curve() {
        Curve::Linear => 2.0 * x - 1.0,
        Curve::Switch => {
            if x >= 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        _ => {
            if x > 0.5 {
                shape(2.0 * (x - 0.5))
            } else {
                -shape(2.0 * (0.5 - x))
            }
        }
    }
}

/// A controller-to-generator routing rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Modulator {
    /// Generator the contribution is added to
    pub dest: GeneratorType,
    /// Primary source
    pub src1: ModSource,
    /// Secondary (scaling) source
    pub src2: ModSource,
    /// Scale of the contribution in destination units
    pub amount: f32,
}

impl Modulator {
    /// Empty placeholder.
    pub const EMPTY: Self = Self {
        dest: GeneratorType::Unused1,
        src1: ModSource::NONE,
        src2: ModSource::NONE,
        amount: 0.0,
    };

    /// Creates a modulator.
    pub const fn new(dest: GeneratorType, src1: ModSource, src2: ModSource, amount: f32) -> Self {
        Self {
            dest,
            src1,
            src2,
            amount,
        }
    }

    /// Same destination, same sources and flags. Amount is not compared.
    pub fn is_identical(&self, other: &Self) -> bool {
        self.dest == other.dest && self.src1 == other.src1 && self.src2 == other.src2
    }

    /// Whether a change of `controller` affects this modulator.
    pub fn depends_on(&self, is_cc: bool, controller: u8) -> bool {
        self.src1.is(is_cc, controller) || self.src2.is(is_cc, controller)
    }

    /// Whether either source can change after note-on.
    pub fn is_live(&self) -> bool {
        self.src1.is_live() || self.src2.is_live()
    }

    /// Current contribution to the destination generator.
    ///
    /// A "none" primary source yields exactly 0; a "none" secondary source
    /// is the multiplicative identity. The default velocity-to-cutoff
    /// modulator always contributes 0.
    pub fn evaluate(&self, channel: &ChannelState, key: u8, vel: u8) -> f32 {
        if self.is_identical(&VEL_TO_FILTER_FC) {
            return 0.0;
        }
        if self.src1.is_none() {
            return 0.0;
        }
        let v1 = self.src1.value(channel, key, vel);
        if v1 == 0.0 {
            return 0.0;
        }
        let v2 = if self.src2.is_none() {
            1.0
        } else {
            self.src2.value(channel, key, vel)
        };
        self.amount * v1 * v2
    }

    /// Smallest value [`Modulator::evaluate`] can reach, assuming the sources
    /// can move anywhere in their range.
    pub fn lower_bound(&self) -> f32 {
        if self.src1.is(false, GeneralController::PitchWheel as u8)
            || self.src1.flags.is_bipolar()
            || self.src2.flags.is_bipolar()
            || self.amount < 0.0
        {
            -self.amount.abs()
        } else {
            0.0
        }
    }
}

const UNIPOLAR_NEGATIVE_CONCAVE: ModFlags = ModFlags::NEGATIVE.union(ModFlags::CONCAVE);

/// The velocity-to-filter-cutoff default modulator. It is installed for
/// completeness but always evaluates to 0, matching common hardware.
pub const VEL_TO_FILTER_FC: Modulator = Modulator::new(
    GeneratorType::FilterFc,
    ModSource::general(GeneralController::NoteOnVelocity, ModFlags::NEGATIVE),
    ModSource::general(GeneralController::NoteOnVelocity, ModFlags::SWITCH),
    -2400.0,
);

/// Modulators every voice starts with.
pub const DEFAULT_MODULATORS: [Modulator; 10] = [
    Modulator::new(
        GeneratorType::Attenuation,
        ModSource::general(GeneralController::NoteOnVelocity, UNIPOLAR_NEGATIVE_CONCAVE),
        ModSource::NONE,
        960.0,
    ),
    VEL_TO_FILTER_FC,
    Modulator::new(
        GeneratorType::VibLfoToPitch,
        ModSource::general(GeneralController::ChannelPressure, ModFlags::NONE),
        ModSource::NONE,
        50.0,
    ),
    Modulator::new(
        GeneratorType::VibLfoToPitch,
        ModSource::cc(cc::MODULATION, ModFlags::NONE),
        ModSource::NONE,
        50.0,
    ),
    Modulator::new(
        GeneratorType::Attenuation,
        ModSource::cc(cc::VOLUME, UNIPOLAR_NEGATIVE_CONCAVE),
        ModSource::NONE,
        960.0,
    ),
    Modulator::new(
        GeneratorType::Pan,
        ModSource::cc(cc::PAN, ModFlags::BIPOLAR),
        ModSource::NONE,
        500.0,
    ),
    Modulator::new(
        GeneratorType::Attenuation,
        ModSource::cc(cc::EXPRESSION, UNIPOLAR_NEGATIVE_CONCAVE),
        ModSource::NONE,
        960.0,
    ),
    Modulator::new(
        GeneratorType::ReverbSend,
        ModSource::cc(cc::REVERB, ModFlags::NONE),
        ModSource::NONE,
        200.0,
    ),
    Modulator::new(
        GeneratorType::ChorusSend,
        ModSource::cc(cc::CHORUS, ModFlags::NONE),
        ModSource::NONE,
        200.0,
    ),
    Modulator::new(
        GeneratorType::Pitch,
        ModSource::general(GeneralController::PitchWheel, ModFlags::BIPOLAR),
        ModSource::general(GeneralController::PitchWheelSensitivity, ModFlags::NONE),
        12700.0,
    ),
];

/// How [`ModulatorList::add`] treats a modulator identical to one already
/// in the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Append without looking for duplicates
    Default,
    /// Replace the amount of an identical modulator
    Overwrite,
    /// Add to the amount of an identical modulator
    Add,
}

/// Maximum number of modulators per voice.
pub const MAX_MODULATORS: usize = 64;

/// Fixed-capacity modulator list.
///
/// # Example
///
/// ```rust
/// use sfvoice_synth::{DEFAULT_MODULATORS, MergeMode, ModulatorList};
///
/// let mut mods: ModulatorList<64> = ModulatorList::new();
/// for m in DEFAULT_MODULATORS {
///     mods.add(m, MergeMode::Default);
/// }
///
/// // A second, identical CC7 modulator only changes the amount
/// let mut louder = DEFAULT_MODULATORS[4];
/// louder.amount = 480.0;
/// mods.add(louder, MergeMode::Overwrite);
/// assert_eq!(mods.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ModulatorList<const N: usize> {
    mods: [Modulator; N],
    len: usize,
}

impl<const N: usize> Default for ModulatorList<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ModulatorList<N> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            mods: [Modulator::EMPTY; N],
            len: 0,
        }
    }

    /// Adds `m` according to `mode`.
    ///
    /// Returns `false` if the modulator was dropped: its sources are not
    /// supported, or the list is full.
    pub fn add(&mut self, m: Modulator, mode: MergeMode) -> bool {
        if !m.src1.is_supported() || !m.src2.is_supported() {
            #[cfg(feature = "tracing")]
            tracing::warn!(?m, "modulator with unsupported source ignored");
            return false;
        }

        match mode {
            MergeMode::Default => {}
            MergeMode::Overwrite | MergeMode::Add => {
                if let Some(existing) = self.as_mut_slice().iter_mut().find(|e| e.is_identical(&m))
                {
                    if mode == MergeMode::Add {
                        existing.amount += m.amount;
                    } else {
                        existing.amount = m.amount;
                    }
                    return true;
                }
            }
        }

        if self.len >= N {
            #[cfg(feature = "tracing")]
            tracing::warn!(capacity = N, dest = ?m.dest, "modulator list full, dropping modulator");
            return false;
        }
        self.mods[self.len] = m;
        self.len += 1;
        true
    }

    /// Removes all modulators.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Number of modulators.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of modulators.
    pub fn capacity(&self) -> usize {
        N
    }

    /// Active modulators.
    pub fn as_slice(&self) -> &[Modulator] {
        &self.mods[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [Modulator] {
        &mut self.mods[..self.len]
    }

    /// Iterates over the active modulators.
    pub fn iter(&self) -> impl Iterator<Item = &Modulator> {
        self.as_slice().iter()
    }

    /// Sum of all contributions targeting `dest`.
    pub fn total_for(&self, dest: GeneratorType, channel: &ChannelState, key: u8, vel: u8) -> f32 {
        self.iter()
            .filter(|m| m.dest == dest)
            .map(|m| m.evaluate(channel, key, vel))
            .sum()
    }
}
