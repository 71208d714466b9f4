//! Built-in demo instrument: one looped single-cycle wavetable.

use std::f32::consts::TAU;
use std::sync::Arc;

use clap::ValueEnum;
use sfvoice_synth::{GeneratorType, Instrument, Preset, Sample, Zone};

/// Frames in one wavetable cycle.
pub const TABLE_LEN: usize = 512;

/// Key the wavetable plays at its recorded pitch.
pub const ROOT_KEY: u8 = 60;

const HARMONICS: usize = 24;

/// Wavetable shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
}

/// Envelope of the demo instrument, in seconds and linear sustain level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemoEnvelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for DemoEnvelope {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.3,
            sustain: 0.7,
            release: 0.5,
        }
    }
}

/// Timecents for a duration in seconds.
pub fn secs_to_timecents(secs: f32) -> f32 {
    if secs <= 0.001 {
        -12000.0
    } else {
        (1200.0 * secs.log2()).clamp(-12000.0, 8000.0)
    }
}

/// Centibels of attenuation for a linear level.
pub fn level_to_centibels(level: f32) -> f32 {
    if level <= 0.0 {
        1440.0
    } else {
        (-200.0 * level.log10()).clamp(0.0, 1440.0)
    }
}

/// Absolute cents for a frequency in Hz.
pub fn hz_to_cents(hz: f32) -> f32 {
    6900.0 + 1200.0 * (hz / 440.0).log2()
}

/// One band-limited cycle of `waveform` as 16-bit PCM.
pub fn wavetable(waveform: Waveform) -> Vec<i16> {
    let cycle: Vec<f32> = (0..TABLE_LEN)
        .map(|i| {
            let x = i as f32 / TABLE_LEN as f32 * TAU;
            match waveform {
                Waveform::Sine => x.sin(),
                Waveform::Saw => (1..=HARMONICS).map(|k| (k as f32 * x).sin() / k as f32).sum(),
                Waveform::Square => (1..=HARMONICS)
                    .step_by(2)
                    .map(|k| (k as f32 * x).sin() / k as f32)
                    .sum(),
            }
        })
        .collect();

    let peak = cycle.iter().fold(0.0f32, |m, s| m.max(s.abs())).max(1e-6);
    cycle
        .iter()
        .map(|s| (s / peak * 0.9 * f32::from(i16::MAX)) as i16)
        .collect()
}

/// Preset with one instrument zone spanning the keyboard.
pub fn preset(waveform: Waveform, env: DemoEnvelope, cutoff_hz: f32) -> Arc<Preset> {
    let root_hz = 440.0 * 2f32.powf((f32::from(ROOT_KEY) - 69.0) / 12.0);
    let rate = (root_hz * TABLE_LEN as f32).round() as u32;
    let sample = Arc::new(
        Sample::new("demo-cycle", Arc::from(wavetable(waveform)), rate, ROOT_KEY)
            .with_loop(0, TABLE_LEN as u32),
    );

    let instrument = Instrument::new("demo")
        .with_global_zone(
            Zone::global()
                .with_generator(GeneratorType::VolEnvAttack, secs_to_timecents(env.attack))
                .with_generator(GeneratorType::VolEnvDecay, secs_to_timecents(env.decay))
                .with_generator(GeneratorType::VolEnvSustain, level_to_centibels(env.sustain))
                .with_generator(GeneratorType::VolEnvRelease, secs_to_timecents(env.release))
                .with_generator(GeneratorType::FilterFc, hz_to_cents(cutoff_hz)),
        )
        .with_zone(Zone::new(sample).with_generator(GeneratorType::SampleModes, 1.0));

    Arc::new(Preset::new("demo", 0, 0).with_zone(Zone::new(Arc::new(instrument))))
}
