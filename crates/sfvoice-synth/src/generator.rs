//! Generators: the scalar synthesis parameters of a voice.
//!
//! Generator types use the SoundFont 2.01 numbering (0..=58, unused and
//! reserved slots included) so a bank loader can index them directly. One
//! extra, engine-internal generator, [`GeneratorType::Pitch`], carries the
//! key-derived pitch so pitch-wheel modulators have a destination.

use core::ops::{Index, IndexMut};

/// Number of generator slots per table.
pub const GEN_COUNT: usize = 60;

/// Generator type, numbered as in the bank format.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GeneratorType {
    StartAddrOfs = 0,
    EndAddrOfs = 1,
    StartLoopAddrOfs = 2,
    EndLoopAddrOfs = 3,
    StartAddrCoarseOfs = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    FilterFc = 8,
    FilterQ = 9,
    ModLfoToFilterFc = 10,
    ModEnvToFilterFc = 11,
    EndAddrCoarseOfs = 12,
    ModLfoToVol = 13,
    Unused1 = 14,
    ChorusSend = 15,
    ReverbSend = 16,
    Pan = 17,
    Unused2 = 18,
    Unused3 = 19,
    Unused4 = 20,
    ModLfoDelay = 21,
    ModLfoFreq = 22,
    VibLfoDelay = 23,
    VibLfoFreq = 24,
    ModEnvDelay = 25,
    ModEnvAttack = 26,
    ModEnvHold = 27,
    ModEnvDecay = 28,
    ModEnvSustain = 29,
    ModEnvRelease = 30,
    KeyToModEnvHold = 31,
    KeyToModEnvDecay = 32,
    VolEnvDelay = 33,
    VolEnvAttack = 34,
    VolEnvHold = 35,
    VolEnvDecay = 36,
    VolEnvSustain = 37,
    VolEnvRelease = 38,
    KeyToVolEnvHold = 39,
    KeyToVolEnvDecay = 40,
    Instrument = 41,
    Reserved1 = 42,
    KeyRange = 43,
    VelRange = 44,
    StartLoopAddrCoarseOfs = 45,
    KeyNum = 46,
    Velocity = 47,
    Attenuation = 48,
    Reserved2 = 49,
    EndLoopAddrCoarseOfs = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    Reserved3 = 55,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverrideRootKey = 58,
    /// Key-derived pitch in cents, not part of the bank format
    Pitch = 59,
}

/// Static range and default of one generator type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorInfo {
    /// Display name
    pub name: &'static str,
    /// Value when no zone sets the generator
    pub default: f32,
    /// Smallest meaningful value
    pub min: f32,
    /// Largest meaningful value
    pub max: f32,
    /// Whether preset zones may contribute this generator
    pub preset_level: bool,
}

const fn info(name: &'static str, default: f32, min: f32, max: f32, preset_level: bool) -> GeneratorInfo {
    GeneratorInfo {
        name,
        default,
        min,
        max,
        preset_level,
    }
}

const OFS: f32 = 1e10;

#[rustfmt::skip]
static GENERATOR_INFO: [GeneratorInfo; GEN_COUNT] = [
    info("startAddrsOffset",          0.0,      0.0,      OFS,     false),
    info("endAddrsOffset",            0.0,      -OFS,     0.0,     false),
    info("startloopAddrsOffset",      0.0,      -OFS,     OFS,     false),
    info("endloopAddrsOffset",        0.0,      -OFS,     OFS,     false),
    info("startAddrsCoarseOffset",    0.0,      0.0,      OFS,     false),
    info("modLfoToPitch",             0.0,      -12000.0, 12000.0, true),
    info("vibLfoToPitch",             0.0,      -12000.0, 12000.0, true),
    info("modEnvToPitch",             0.0,      -12000.0, 12000.0, true),
    info("initialFilterFc",           13500.0,  1500.0,   13500.0, true),
    info("initialFilterQ",            0.0,      0.0,      960.0,   true),
    info("modLfoToFilterFc",          0.0,      -12000.0, 12000.0, true),
    info("modEnvToFilterFc",          0.0,      -12000.0, 12000.0, true),
    info("endAddrsCoarseOffset",      0.0,      -OFS,     0.0,     false),
    info("modLfoToVolume",            0.0,      -960.0,   960.0,   true),
    info("unused1",                   0.0,      0.0,      0.0,     false),
    info("chorusEffectsSend",         0.0,      0.0,      1000.0,  true),
    info("reverbEffectsSend",         0.0,      0.0,      1000.0,  true),
    info("pan",                       0.0,      -500.0,   500.0,   true),
    info("unused2",                   0.0,      0.0,      0.0,     false),
    info("unused3",                   0.0,      0.0,      0.0,     false),
    info("unused4",                   0.0,      0.0,      0.0,     false),
    info("delayModLFO",               -12000.0, -12000.0, 5000.0,  true),
    info("freqModLFO",                0.0,      -16000.0, 4500.0,  true),
    info("delayVibLFO",               -12000.0, -12000.0, 5000.0,  true),
    info("freqVibLFO",                0.0,      -16000.0, 4500.0,  true),
    info("delayModEnv",               -12000.0, -12000.0, 5000.0,  true),
    info("attackModEnv",              -12000.0, -12000.0, 8000.0,  true),
    info("holdModEnv",                -12000.0, -12000.0, 5000.0,  true),
    info("decayModEnv",               -12000.0, -12000.0, 8000.0,  true),
    info("sustainModEnv",             0.0,      0.0,      1000.0,  true),
    info("releaseModEnv",             -12000.0, -12000.0, 8000.0,  true),
    info("keynumToModEnvHold",        0.0,      -1200.0,  1200.0,  true),
    info("keynumToModEnvDecay",       0.0,      -1200.0,  1200.0,  true),
    info("delayVolEnv",               -12000.0, -12000.0, 5000.0,  true),
    info("attackVolEnv",              -12000.0, -12000.0, 8000.0,  true),
    info("holdVolEnv",                -12000.0, -12000.0, 5000.0,  true),
    info("decayVolEnv",               -12000.0, -12000.0, 8000.0,  true),
    info("sustainVolEnv",             0.0,      0.0,      1440.0,  true),
    info("releaseVolEnv",             -12000.0, -12000.0, 8000.0,  true),
    info("keynumToVolEnvHold",        0.0,      -1200.0,  1200.0,  true),
    info("keynumToVolEnvDecay",       0.0,      -1200.0,  1200.0,  true),
    info("instrument",                0.0,      0.0,      0.0,     false),
    info("reserved1",                 0.0,      0.0,      0.0,     false),
    info("keyRange",                  0.0,      0.0,      127.0,   false),
    info("velRange",                  0.0,      0.0,      127.0,   false),
    info("startloopAddrsCoarseOffset", 0.0,     -OFS,     OFS,     false),
    info("keynum",                    -1.0,     0.0,      127.0,   false),
    info("velocity",                  -1.0,     0.0,      127.0,   false),
    info("initialAttenuation",        0.0,      0.0,      1440.0,  true),
    info("reserved2",                 0.0,      0.0,      0.0,     false),
    info("endloopAddrsCoarseOffset",  0.0,      -OFS,     OFS,     false),
    info("coarseTune",                0.0,      -120.0,   120.0,   true),
    info("fineTune",                  0.0,      -99.0,    99.0,    true),
    info("sampleID",                  0.0,      0.0,      0.0,     false),
    info("sampleModes",               0.0,      0.0,      3.0,     false),
    info("reserved3",                 0.0,      0.0,      0.0,     false),
    info("scaleTuning",               100.0,    0.0,      1200.0,  true),
    info("exclusiveClass",            0.0,      0.0,      127.0,   false),
    info("overridingRootKey",         -1.0,     0.0,      127.0,   false),
    info("pitch",                     0.0,      0.0,      12700.0, false),
];

impl GeneratorType {
    /// Every generator type in index order.
    pub const ALL: [GeneratorType; GEN_COUNT] = {
        use GeneratorType::*;
        [
            StartAddrOfs, EndAddrOfs, StartLoopAddrOfs, EndLoopAddrOfs, StartAddrCoarseOfs,
            ModLfoToPitch, VibLfoToPitch, ModEnvToPitch, FilterFc, FilterQ, ModLfoToFilterFc,
            ModEnvToFilterFc, EndAddrCoarseOfs, ModLfoToVol, Unused1, ChorusSend, ReverbSend, Pan,
            Unused2, Unused3, Unused4, ModLfoDelay, ModLfoFreq, VibLfoDelay, VibLfoFreq,
            ModEnvDelay, ModEnvAttack, ModEnvHold, ModEnvDecay, ModEnvSustain, ModEnvRelease,
            KeyToModEnvHold, KeyToModEnvDecay, VolEnvDelay, VolEnvAttack, VolEnvHold, VolEnvDecay,
            VolEnvSustain, VolEnvRelease, KeyToVolEnvHold, KeyToVolEnvDecay, Instrument,
            Reserved1, KeyRange, VelRange, StartLoopAddrCoarseOfs, KeyNum, Velocity, Attenuation,
            Reserved2, EndLoopAddrCoarseOfs, CoarseTune, FineTune, SampleId, SampleModes,
            Reserved3, ScaleTuning, ExclusiveClass, OverrideRootKey, Pitch,
        ]
    };

    /// Table index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks up a generator by its bank-format number.
    pub fn from_index(index: u16) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Static range and default.
    #[inline]
    pub fn info(self) -> &'static GeneratorInfo {
        &GENERATOR_INFO[self.index()]
    }

    /// Bank-format name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Whether a preset zone may contribute this generator.
    ///
    /// Sample address offsets, key/velocity overrides, sample mode,
    /// exclusive class, the root-key override and the structural
    /// range/reference generators are instrument-level only.
    #[inline]
    pub fn is_preset_level(self) -> bool {
        self.info().preset_level
    }

    /// Clamps `value` to this generator's documented range.
    pub fn clamp(self, value: f32) -> f32 {
        let info = self.info();
        value.clamp(info.min, info.max)
    }
}

/// Origin of a generator value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenFlag {
    /// Not specified
    #[default]
    Unused,
    /// Engine default in effect
    Default,
    /// Explicitly set by a zone or at run time
    Set,
}

/// One generator slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Generator {
    /// Value from zones (or default)
    pub base: f32,
    /// Sum of all modulator contributions
    pub modulation: f32,
    /// Where `base` came from
    pub flag: GenFlag,
}

impl Generator {
    /// Effective value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.base + self.modulation
    }

    /// Whether a zone or the engine set this slot.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag != GenFlag::Unused
    }
}

/// Fixed-size generator array indexed by [`GeneratorType`].
///
/// A voice owns one of these; zones keep a lazily built one as a dense view
/// of their sparse generator list.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorTable([Generator; GEN_COUNT]);

impl Default for GeneratorTable {
    /// All generators at their bank-format default, flagged [`GenFlag::Default`].
    fn default() -> Self {
        Self(core::array::from_fn(|i| Generator {
            base: GENERATOR_INFO[i].default,
            modulation: 0.0,
            flag: GenFlag::Default,
        }))
    }
}

impl GeneratorTable {
    /// Table with every slot zeroed and [`GenFlag::Unused`].
    pub fn unused() -> Self {
        Self([Generator::default(); GEN_COUNT])
    }

    /// Builds a dense table from a sparse `(type, value)` list.
    ///
    /// Later entries for the same type replace earlier ones.
    pub fn from_sparse(list: &[(GeneratorType, f32)]) -> Self {
        let mut table = Self::unused();
        for &(ty, value) in list {
            table.set(ty, value);
        }
        table
    }

    /// Effective value (`base + modulation`).
    #[inline]
    pub fn value(&self, ty: GeneratorType) -> f32 {
        self.0[ty.index()].value()
    }

    /// Replaces the base value and marks the slot as set.
    #[inline]
    pub fn set(&mut self, ty: GeneratorType, value: f32) {
        let g = &mut self.0[ty.index()];
        g.base = value;
        g.flag = GenFlag::Set;
    }

    /// Adds to the base value and marks the slot as set.
    #[inline]
    pub fn add(&mut self, ty: GeneratorType, value: f32) {
        let g = &mut self.0[ty.index()];
        g.base += value;
        g.flag = GenFlag::Set;
    }

    /// Replaces the modulation offset.
    #[inline]
    pub fn set_modulation(&mut self, ty: GeneratorType, value: f32) {
        self.0[ty.index()].modulation = value;
    }

    /// Whether the slot holds a value.
    #[inline]
    pub fn is_set(&self, ty: GeneratorType) -> bool {
        self.0[ty.index()].is_set()
    }

    /// Iterates `(type, generator)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (GeneratorType, &Generator)> {
        GeneratorType::ALL.iter().copied().zip(self.0.iter())
    }
}

impl Index<GeneratorType> for GeneratorTable {
    type Output = Generator;

    #[inline]
    fn index(&self, ty: GeneratorType) -> &Generator {
        &self.0[ty.index()]
    }
}

impl IndexMut<GeneratorType> for GeneratorTable {
    #[inline]
    fn index_mut(&mut self, ty: GeneratorType) -> &mut Generator {
        &mut self.0[ty.index()]
    }
}
