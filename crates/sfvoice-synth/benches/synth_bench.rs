//! Criterion benchmarks for sfvoice-synth components
//!
//! Run with: cargo bench -p sfvoice-synth
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sfvoice_synth::{
    ChannelState, DEFAULT_MODULATORS, EngineSettings, Envelope, GeneratorType, Instrument,
    Interpolation, MergeMode, ModulatorList, Preset, Sample, Synth, Zone,
};

const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn preset() -> Arc<Preset> {
    let data: Vec<i16> = (0..2048)
        .map(|i| ((i as f32 / 2048.0 * std::f32::consts::TAU * 4.0).sin() * 20000.0) as i16)
        .collect();
    let sample = Arc::new(Sample::new("sine", Arc::from(data), 44100, 60).with_loop(0, 2048));
    let inst = Arc::new(Instrument::new("pad").with_zone(
        Zone::new(sample)
            .with_generator(GeneratorType::SampleModes, 1.0)
            .with_generator(GeneratorType::FilterFc, 6000.0)
            .with_generator(GeneratorType::FilterQ, 60.0)
            .with_generator(GeneratorType::VibLfoToPitch, 20.0),
    ));
    Arc::new(Preset::new("pad", 0, 0).with_zone(Zone::new(inst)))
}

// ============================================================================
// Engine rendering
// ============================================================================

fn bench_render_polyphony(c: &mut Criterion) {
    let mut group = c.benchmark_group("Render");

    for &voices in &[1usize, 16, 64] {
        for &block_size in BLOCK_SIZES {
            let settings = EngineSettings {
                buffer_size: block_size,
                ..EngineSettings::default()
            };
            let mut synth = Synth::new(settings).unwrap();
            synth.set_channel_preset(0, Some(preset())).unwrap();
            for i in 0..voices {
                synth.note_on(0, 36 + (i % 64) as u8, 100, None).unwrap();
            }
            let (mut l, mut r) = (vec![0.0; block_size], vec![0.0; block_size]);

            group.bench_with_input(
                BenchmarkId::new(format!("{voices}_voices"), block_size),
                &block_size,
                |b, _| {
                    b.iter(|| {
                        synth.render_block(&mut l, &mut r, None, None).unwrap();
                        black_box(l[0])
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Interpolation");

    for (name, method) in [
        ("None", Interpolation::None),
        ("Linear", Interpolation::Linear),
        ("Cubic", Interpolation::Cubic),
        ("Sinc7", Interpolation::Sinc7),
    ] {
        let settings = EngineSettings {
            interpolation: method,
            filter_enabled: false,
            ..EngineSettings::default()
        };
        let mut synth = Synth::new(settings).unwrap();
        synth.set_channel_preset(0, Some(preset())).unwrap();
        for key in [48, 55, 60, 64, 67, 72, 79, 84] {
            synth.note_on(0, key, 100, None).unwrap();
        }
        let (mut l, mut r) = (vec![0.0; 64], vec![0.0; 64]);

        group.bench_function(name, |b| {
            b.iter(|| {
                synth.render_block(&mut l, &mut r, None, None).unwrap();
                black_box(l[0])
            })
        });
    }

    group.finish();
}

// ============================================================================
// Control plane
// ============================================================================

fn bench_note_on(c: &mut Criterion) {
    let mut synth = Synth::new(EngineSettings::default()).unwrap();
    synth.set_channel_preset(0, Some(preset())).unwrap();
    let mut key = 0u8;

    c.bench_function("NoteOn", |b| {
        b.iter(|| {
            key = (key + 1) % 128;
            black_box(synth.note_on(0, key, 100, None).unwrap())
        })
    });
}

fn bench_controller_sweep(c: &mut Criterion) {
    let mut synth = Synth::new(EngineSettings::default()).unwrap();
    synth.set_channel_preset(0, Some(preset())).unwrap();
    for key in 40..72 {
        synth.note_on(0, key, 100, None).unwrap();
    }
    let mut bend = 0u16;

    c.bench_function("PitchBend_32_voices", |b| {
        b.iter(|| {
            bend = (bend + 97) % 16384;
            synth.pitch_bend(0, black_box(bend)).unwrap();
        })
    });
}

fn bench_modulator_total(c: &mut Criterion) {
    let mut mods: ModulatorList<64> = ModulatorList::new();
    for m in DEFAULT_MODULATORS {
        mods.add(m, MergeMode::Default);
    }
    let channel = ChannelState::new();

    c.bench_function("ModulatorTotal_Attenuation", |b| {
        b.iter(|| black_box(mods.total_for(GeneratorType::Attenuation, &channel, 60, 100)))
    });
}

fn bench_envelope(c: &mut Criterion) {
    let mut env = Envelope::default();
    env.set_attack(100);
    env.set_hold(10);
    env.set_decay(200, 0.5);
    env.set_release(100);

    c.bench_function("Envelope_step", |b| {
        b.iter(|| {
            env.step();
            if env.value() == 0.5 {
                env.reset();
            }
            black_box(env.value())
        })
    });
}

criterion_group!(
    benches,
    bench_render_polyphony,
    bench_interpolation,
    bench_note_on,
    bench_controller_sweep,
    bench_modulator_total,
    bench_envelope,
);
criterion_main!(benches);
