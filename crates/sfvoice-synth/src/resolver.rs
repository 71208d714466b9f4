//! Generator resolver: matches a note against a preset and stacks zone
//! parameters into a voice.
//!
//! ## Precedence
//!
//! For every generator, starting from the engine defaults:
//!
//! 1. the local instrument zone value replaces it, or else the global
//!    instrument zone value does
//! 2. the local preset zone value is added to it, or else the global
//!    preset zone value is (preset-level generators only)
//!
//! Modulators follow the same pattern: the local list plus every global
//! modulator without an identical local one. Instrument modulators
//! overwrite identical voice modulators, preset modulators add to them.

extern crate alloc;

use crate::generator::{GeneratorTable, GeneratorType};
use crate::modulator::{MergeMode, Modulator, ModulatorList};
use crate::zone::{Instrument, InstrumentZone, Preset, PresetZone, Sample};
use alloc::sync::Arc;
use core::ops::ControlFlow;

/// One (preset zone, instrument zone, sample) triple that answers a note.
#[derive(Debug, Clone, Copy)]
pub struct ZoneMatch<'a> {
    /// Matching local preset zone
    pub preset_zone: &'a PresetZone,
    /// Global zone of the preset
    pub preset_global: Option<&'a PresetZone>,
    /// Instrument referenced by the preset zone
    pub instrument: &'a Instrument,
    /// Matching local instrument zone
    pub instrument_zone: &'a InstrumentZone,
    /// Global zone of the instrument
    pub instrument_global: Option<&'a InstrumentZone>,
    /// Sample referenced by the instrument zone
    pub sample: &'a Arc<Sample>,
}

impl ZoneMatch<'_> {
    /// Stacks this match's generators onto `gens`.
    pub fn apply_generators(&self, gens: &mut GeneratorTable) {
        let inst_local = self.instrument_zone.dense_generators();
        let inst_global = self.instrument_global.map(|z| z.dense_generators());
        let preset_local = self.preset_zone.dense_generators();
        let preset_global = self.preset_global.map(|z| z.dense_generators());

        for ty in GeneratorType::ALL {
            if inst_local.is_set(ty) {
                gens.set(ty, inst_local[ty].base);
            } else if let Some(g) = inst_global.filter(|g| g.is_set(ty)) {
                gens.set(ty, g[ty].base);
            }
        }

        for ty in GeneratorType::ALL {
            if !ty.is_preset_level() {
                continue;
            }
            if preset_local.is_set(ty) {
                gens.add(ty, preset_local[ty].base);
            } else if let Some(g) = preset_global.filter(|g| g.is_set(ty)) {
                gens.add(ty, g[ty].base);
            }
        }
    }

    /// Merges this match's modulators into `mods`.
    pub fn apply_modulators<const N: usize>(&self, mods: &mut ModulatorList<N>) {
        merge_zone_modulators(
            mods,
            self.instrument_zone.modulators(),
            self.instrument_global.map(|z| z.modulators()).unwrap_or_default(),
            MergeMode::Overwrite,
        );
        merge_zone_modulators(
            mods,
            self.preset_zone.modulators(),
            self.preset_global.map(|z| z.modulators()).unwrap_or_default(),
            MergeMode::Add,
        );
    }
}

/// Local modulators, then global ones without an identical local one.
/// Modulators with a zero amount are skipped.
fn merge_zone_modulators<const N: usize>(
    mods: &mut ModulatorList<N>,
    local: &[Modulator],
    global: &[Modulator],
    mode: MergeMode,
) {
    let globals = global
        .iter()
        .filter(|g| !local.iter().any(|l| l.is_identical(g)));
    for m in local.iter().chain(globals) {
        if m.amount != 0.0 {
            mods.add(*m, mode);
        }
    }
}

/// Calls `f` for every zone triple of `preset` that answers `key`/`vel`,
/// in zone order, until `f` breaks.
///
/// Returns the number of matches visited.
pub fn for_each_match<'a, F>(preset: &'a Preset, key: u8, vel: u8, mut f: F) -> usize
where
    F: FnMut(ZoneMatch<'a>) -> ControlFlow<()>,
{
    let mut visited = 0;
    for preset_zone in &preset.zones {
        if !preset_zone.matches(key, vel) {
            continue;
        }
        let Some(instrument) = preset_zone.target.as_deref() else {
            continue;
        };
        for instrument_zone in &instrument.zones {
            if !instrument_zone.matches(key, vel) {
                continue;
            }
            let Some(sample) = instrument_zone.target.as_ref() else {
                #[cfg(feature = "tracing")]
                tracing::debug!(instrument = %instrument.name, "instrument zone without sample skipped");
                continue;
            };
            visited += 1;
            let m = ZoneMatch {
                preset_zone,
                preset_global: preset.global_zone.as_ref(),
                instrument,
                instrument_zone,
                instrument_global: instrument.global_zone.as_ref(),
                sample,
            };
            if f(m).is_break() {
                return visited;
            }
        }
    }
    visited
}
