//! Integration tests for sfvoice-synth.
//!
//! Tests cover the note lifecycle through the public engine API: envelope
//! timing, zone resolution, controllers, voice stealing, exclusive classes
//! and buffer handling.

use std::sync::Arc;

use sfvoice_synth::{
    EngineSettings, EnvelopePhase, GeneralController, GeneratorType, Instrument, InstrumentZone,
    ModFlags, ModSource, Modulator, Preset, Sample, Synth, SynthError, SynthEvent, Voice,
    VoiceStatus, Zone, cc,
};

const BUF: usize = 64;

fn looped_sample() -> Arc<Sample> {
    let data: Vec<i16> = (0..441)
        .map(|i| ((i as f32 / 441.0 * std::f32::consts::TAU).sin() * 16000.0) as i16)
        .collect();
    Arc::new(Sample::new("sine", Arc::from(data), 44100, 60).with_loop(0, 441))
}

fn looped_zone() -> InstrumentZone {
    Zone::new(looped_sample()).with_generator(GeneratorType::SampleModes, 1.0)
}

fn preset_from(inst: Instrument) -> Arc<Preset> {
    Arc::new(Preset::new("test", 0, 0).with_zone(Zone::new(Arc::new(inst))))
}

fn synth_with(settings: EngineSettings, preset: Arc<Preset>) -> Synth {
    let mut synth = Synth::new(settings).expect("valid settings");
    for ch in 0..16 {
        synth.set_channel_preset(ch, Some(preset.clone())).expect("channel");
    }
    synth
}

fn synth(preset: Arc<Preset>) -> Synth {
    synth_with(EngineSettings::default(), preset)
}

fn render(synth: &mut Synth, blocks: usize) -> (Vec<f32>, Vec<f32>) {
    let (mut l, mut r) = (vec![0.0; BUF], vec![0.0; BUF]);
    let (mut out_l, mut out_r) = (Vec::new(), Vec::new());
    for _ in 0..blocks {
        synth.render_block(&mut l, &mut r, None, None).expect("render");
        out_l.extend_from_slice(&l);
        out_r.extend_from_slice(&r);
    }
    (out_l, out_r)
}

fn playing(synth: &Synth) -> Vec<&Voice> {
    synth.voices().iter().filter(|v| v.is_playing()).collect()
}

// ---------------------------------------------------------------------------
// 1. Envelope timing
// ---------------------------------------------------------------------------

#[test]
fn one_second_attack_reaches_peak() {
    let preset = preset_from(
        Instrument::new("slow").with_zone(looped_zone().with_generator(GeneratorType::VolEnvAttack, 0.0)),
    );
    let mut synth = synth(preset);
    assert_eq!(synth.note_on(0, 60, 127, None).unwrap(), 1);

    // 1 s at 44.1 kHz is ~689 buffers of 64
    render(&mut synth, 600);
    let env = playing(&synth)[0].volume_envelope().clone();
    assert_eq!(env.phase(), EnvelopePhase::Attack);
    assert!(env.value() > 0.8 && env.value() < 0.9, "{}", env.value());

    render(&mut synth, 100);
    let env = playing(&synth)[0].volume_envelope().clone();
    assert!(env.phase() > EnvelopePhase::Attack);
    assert!(env.value() > 0.99);
}

#[test]
fn release_finishes_and_stays_non_negative() {
    let preset = preset_from(Instrument::new("fast").with_zone(looped_zone()));
    let mut synth = synth(preset);
    synth.note_on(0, 60, 100, None).unwrap();
    render(&mut synth, 20);
    synth.note_off(0, 60).unwrap();

    let v = playing(&synth)[0];
    assert_eq!(v.volume_envelope().phase(), EnvelopePhase::Release);

    let mut blocks = 0;
    while synth.active_voice_count() > 0 {
        render(&mut synth, 1);
        for v in synth.voices() {
            assert!(v.volume_envelope().value() >= 0.0);
        }
        blocks += 1;
        assert!(blocks < 50, "voice never finished");
    }
    assert_eq!(synth.voices()[0].status(), VoiceStatus::Off);
}

#[test]
fn output_is_silent_after_release() {
    let preset = preset_from(Instrument::new("fast").with_zone(looped_zone()));
    let mut synth = synth(preset);
    synth.note_on(0, 60, 100, None).unwrap();
    let (l, _) = render(&mut synth, 10);
    assert!(l.iter().any(|s| s.abs() > 1e-3));

    synth.note_off(0, 60).unwrap();
    render(&mut synth, 60);
    let (l, r) = render(&mut synth, 2);
    assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
}

#[test]
fn duration_releases_note() {
    let preset = preset_from(Instrument::new("fast").with_zone(looped_zone()));
    let mut synth = synth(preset);
    synth.note_on(0, 60, 100, Some(10 * BUF as u64)).unwrap();
    render(&mut synth, 11);
    assert!(synth.voices()[0].volume_envelope().phase() >= EnvelopePhase::Release);
}

// ---------------------------------------------------------------------------
// 2. Zone resolution
// ---------------------------------------------------------------------------

#[test]
fn layered_zones_start_one_voice_each() {
    let inst = Instrument::new("layers")
        .with_zone(looped_zone().with_key_range(0, 64))
        .with_zone(looped_zone().with_key_range(60, 127))
        .with_zone(looped_zone().with_vel_range(0, 40));
    let mut synth = synth(preset_from(inst));

    assert_eq!(synth.note_on(0, 62, 100, None).unwrap(), 2);
    assert_eq!(synth.note_on(0, 30, 100, None).unwrap(), 1);
    assert_eq!(synth.note_on(0, 90, 20, None).unwrap(), 2);
    assert_eq!(synth.active_voice_count(), 5);
}

#[test]
fn first_voice_only_starts_one() {
    let inst = Instrument::new("layers")
        .with_zone(looped_zone())
        .with_zone(looped_zone());
    let settings = EngineSettings {
        first_voice_only: true,
        ..EngineSettings::default()
    };
    let mut synth = synth_with(settings, preset_from(inst));
    assert_eq!(synth.note_on(0, 60, 100, None).unwrap(), 1);
}

#[test]
fn unmatched_note_starts_nothing() {
    let inst = Instrument::new("narrow").with_zone(looped_zone().with_key_range(60, 61));
    let mut synth = synth(preset_from(inst));
    assert_eq!(synth.note_on(0, 20, 100, None).unwrap(), 0);
    assert_eq!(synth.active_voice_count(), 0);
}

#[test]
fn preset_generators_add_to_instrument() {
    let inst = Arc::new(
        Instrument::new("i").with_zone(looped_zone().with_generator(GeneratorType::CoarseTune, 2.0)),
    );
    let preset = Arc::new(
        Preset::new("p", 0, 0)
            .with_global_zone(Zone::global().with_generator(GeneratorType::CoarseTune, 12.0))
            .with_zone(Zone::new(inst).with_generator(GeneratorType::FineTune, -10.0)),
    );
    let mut synth = synth(preset);
    synth.note_on(0, 60, 100, None).unwrap();
    let v = playing(&synth)[0];
    assert_eq!(v.generators().value(GeneratorType::CoarseTune), 14.0);
    assert!((v.pitch() - (6000.0 + 1400.0 - 10.0)).abs() < 1e-3);
}

#[test]
fn local_modulator_replaces_identical_global() {
    let fc = |amount| {
        Modulator::new(
            GeneratorType::FilterFc,
            ModSource::cc(74, ModFlags::NONE),
            ModSource::NONE,
            amount,
        )
    };
    let inst = Instrument::new("i")
        .with_global_zone(Zone::global().with_modulator(fc(1200.0)))
        .with_zone(looped_zone().with_modulator(fc(-2400.0)));
    let mut synth = synth(preset_from(inst));
    synth.note_on(0, 60, 100, None).unwrap();

    let v = playing(&synth)[0];
    let matching: Vec<_> = v.modulators().iter().filter(|m| m.is_identical(&fc(0.0))).collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].amount, -2400.0);
}

// ---------------------------------------------------------------------------
// 3. Controllers
// ---------------------------------------------------------------------------

#[test]
fn pitch_bend_moves_pitch() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth.note_on(0, 60, 100, None).unwrap();
    assert!((playing(&synth)[0].pitch() - 6000.0).abs() < 1e-3);

    synth.pitch_bend(0, 16383).unwrap();
    // 12700 * ~1.0 * 2/128 cents
    assert!((playing(&synth)[0].pitch() - 6198.4).abs() < 0.5);

    synth.pitch_bend(0, 8192).unwrap();
    assert!((playing(&synth)[0].pitch() - 6000.0).abs() < 1e-3);
}

#[test]
fn volume_controller_changes_attenuation() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth.note_on(0, 60, 127, None).unwrap();
    let before = playing(&synth)[0].attenuation();
    synth.control_change(0, cc::VOLUME, 20).unwrap();
    let after = playing(&synth)[0].attenuation();
    assert!(after > before, "{before} -> {after}");

    // partial reset keeps volume
    synth.control_change(0, cc::RESET_ALL_CONTROLLERS, 0).unwrap();
    assert_eq!(synth.channel(0).unwrap().cc(cc::VOLUME), 20);
    // full reset restores it
    synth.all_controllers_reset(0).unwrap();
    assert_eq!(synth.channel(0).unwrap().cc(cc::VOLUME), 100);
    assert!((playing(&synth)[0].attenuation() - before).abs() < 1e-3);
}

#[test]
fn channel_pressure_only_touches_its_channel() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth.note_on(0, 60, 100, None).unwrap();
    synth.note_on(1, 60, 100, None).unwrap();
    synth.channel_pressure(1, 127).unwrap();
    let vib: Vec<f32> = playing(&synth)
        .iter()
        .map(|v| v.generators().value(GeneratorType::VibLfoToPitch))
        .collect();
    assert_eq!(vib.len(), 2);
    assert_eq!(vib.iter().filter(|&&x| x == 0.0).count(), 1);
    assert_eq!(vib.iter().filter(|&&x| x > 40.0).count(), 1);
}

#[test]
fn sustain_pedal_holds_notes() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth.control_change(0, cc::SUSTAIN, 127).unwrap();
    synth.note_on(0, 60, 100, None).unwrap();
    synth.note_off(0, 60).unwrap();

    let v = playing(&synth)[0];
    assert_eq!(v.status(), VoiceStatus::Sustained);
    assert!(!v.is_released());

    synth.control_change(0, cc::SUSTAIN, 0).unwrap();
    assert!(playing(&synth)[0].is_released());
}

#[test]
fn controller_reset_releases_sustained_notes() {
    for full in [false, true] {
        let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
        synth.control_change(0, cc::SUSTAIN, 127).unwrap();
        synth.note_on(0, 60, 100, None).unwrap();
        synth.note_off(0, 60).unwrap();
        assert!(!playing(&synth)[0].is_released());

        if full {
            synth.all_controllers_reset(0).unwrap();
        } else {
            synth.control_change(0, cc::RESET_ALL_CONTROLLERS, 0).unwrap();
        }
        assert!(!synth.channel(0).unwrap().sustain_held());
        assert!(playing(&synth)[0].is_released(), "full reset: {full}");
    }
}

#[test]
fn all_sound_off_releases_everything() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    for key in [60, 64, 67] {
        synth.note_on(0, key, 100, None).unwrap();
    }
    synth.control_change(0, cc::ALL_SOUND_OFF, 0).unwrap();
    assert!(playing(&synth).iter().all(|v| v.is_released()));
    // -200 timecents is just under a second
    render(&mut synth, 700);
    assert_eq!(synth.active_voice_count(), 0);
}

#[test]
fn unlooped_voice_tolerates_inverted_loop_points() {
    let data: Vec<i16> = (0..256).map(|i| (i * 100 - 12800) as i16).collect();
    let inverted = Arc::new(Sample::new("inv", Arc::from(data.clone()), 44100, 60).with_loop(200, 100));
    let plain = Arc::new(Sample::new("plain", Arc::from(data), 44100, 60));

    let zones = [
        Zone::new(inverted),
        Zone::new(plain).with_generator(GeneratorType::StartLoopAddrOfs, 1000.0),
    ];
    for zone in zones {
        let mut synth = synth(preset_from(Instrument::new("i").with_zone(zone)));
        synth.note_on(0, 60, 100, None).unwrap();
        let (l, r) = render(&mut synth, 10);
        assert!(l.iter().chain(&r).all(|s| s.is_finite()));
        assert!(l.iter().any(|&s| s != 0.0));
        assert_eq!(synth.active_voice_count(), 0);
    }
}

#[test]
fn velocity_zero_is_note_off() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth.note_on(0, 60, 100, None).unwrap();
    assert_eq!(synth.note_on(0, 60, 0, None).unwrap(), 0);
    assert!(playing(&synth)[0].is_released());
}

#[test]
fn modulator_with_none_source_contributes_nothing() {
    let m = Modulator::new(
        GeneratorType::FilterFc,
        ModSource::NONE,
        ModSource::general(GeneralController::NoteOnVelocity, ModFlags::NONE),
        5000.0,
    );
    let inst = Instrument::new("i").with_zone(looped_zone().with_modulator(m));
    let mut synth = synth(preset_from(inst));
    synth.note_on(0, 60, 127, None).unwrap();
    assert_eq!(playing(&synth)[0].generators()[GeneratorType::FilterFc].modulation, 0.0);
}

// ---------------------------------------------------------------------------
// 4. Voice pool
// ---------------------------------------------------------------------------

#[test]
fn stealing_keeps_polyphony_limit() {
    let settings = EngineSettings {
        polyphony: 2,
        ..EngineSettings::default()
    };
    let mut synth = synth_with(settings, preset_from(Instrument::new("i").with_zone(looped_zone())));
    for key in [60, 62, 64] {
        assert_eq!(synth.note_on(0, key, 100, None).unwrap(), 1);
        render(&mut synth, 5);
    }
    assert_eq!(synth.active_voice_count(), 2);
    let keys: Vec<u8> = playing(&synth).iter().map(|v| v.key()).collect();
    assert!(!keys.contains(&60));
    assert!(keys.contains(&64));
}

#[test]
fn layered_note_never_steals_its_own_voices() {
    let settings = EngineSettings {
        polyphony: 1,
        ..EngineSettings::default()
    };
    let inst = Instrument::new("layers")
        .with_zone(looped_zone())
        .with_zone(looped_zone());
    let mut synth = synth_with(settings, preset_from(inst));

    assert_eq!(synth.note_on(0, 60, 100, None).unwrap(), 1);
    assert_eq!(synth.active_voice_count(), 1);

    // the next note may steal the previous one
    assert_eq!(synth.note_on(0, 62, 100, None).unwrap(), 1);
    assert_eq!(playing(&synth)[0].key(), 62);
}

#[test]
fn exclusive_class_cuts_previous_note() {
    let inst = Instrument::new("hats")
        .with_zone(looped_zone().with_generator(GeneratorType::ExclusiveClass, 1.0));
    let mut synth = synth(preset_from(inst));
    synth.note_on(9, 42, 100, None).unwrap();
    synth.note_on(9, 46, 100, None).unwrap();

    let open = synth.voices().iter().find(|v| v.key() == 46).unwrap();
    let closed = synth.voices().iter().find(|v| v.key() == 42).unwrap();
    assert!(!open.is_released());
    assert!(closed.is_released());

    // another channel is unaffected
    synth.note_on(0, 42, 100, None).unwrap();
    assert!(!synth.voices().iter().find(|v| v.key() == 46).unwrap().is_released());
}

#[test]
fn retrigger_releases_same_key() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth.note_on(0, 60, 100, None).unwrap();
    synth.note_on(0, 60, 100, None).unwrap();
    let states: Vec<bool> = playing(&synth).iter().map(|v| v.is_released()).collect();
    assert_eq!(states.len(), 2);
    assert_eq!(states.iter().filter(|&&r| r).count(), 1);
}

// ---------------------------------------------------------------------------
// 5. Buffers, sends and errors
// ---------------------------------------------------------------------------

#[test]
fn reverb_send_without_bus() {
    let inst = Instrument::new("i")
        .with_zone(looped_zone().with_generator(GeneratorType::ReverbSend, 500.0));
    let mut synth = synth(preset_from(inst));
    synth.note_on(0, 60, 100, None).unwrap();

    let (mut l, mut r) = (vec![0.0; BUF], vec![0.0; BUF]);
    for _ in 0..4 {
        synth.render_block(&mut l, &mut r, None, None).unwrap();
    }
    assert!(l.iter().any(|s| s.abs() > 0.0));

    let mut rev = vec![0.0; BUF];
    synth.render_block(&mut l, &mut r, Some(&mut rev), None).unwrap();
    assert!(rev.iter().any(|s| s.abs() > 0.0));
    // send level 0.5 against the centered pan gain of the dry path
    let expected = 0.5 / sfvoice_core::pan(0.0, true);
    for (&d, &w) in l.iter().zip(&rev) {
        if d.abs() > 1e-4 {
            assert!((w / d - expected).abs() < 1e-3, "{w} / {d}");
        }
    }
}

#[test]
fn wrong_buffer_size_rejected() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    let (mut l, mut r) = (vec![0.0; 32], vec![0.0; 32]);
    assert_eq!(
        synth.render_block(&mut l, &mut r, None, None),
        Err(SynthError::InvalidBufferSize {
            expected: BUF,
            actual: 32
        })
    );
}

#[test]
fn invalid_settings_rejected() {
    let settings = EngineSettings {
        buffer_size: 0,
        ..EngineSettings::default()
    };
    assert!(matches!(
        Synth::new(settings),
        Err(SynthError::InvalidBufferSize { actual: 0, .. })
    ));
}

#[test]
fn channel_errors() {
    let mut synth = Synth::new(EngineSettings::default()).unwrap();
    assert_eq!(synth.note_on(16, 60, 100, None), Err(SynthError::InvalidChannel(16)));
    assert_eq!(synth.note_on(0, 60, 100, None), Err(SynthError::NoPreset(0)));
    assert!(synth.note_off(3, 60).is_ok());
}

#[test]
fn events_dispatch() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    synth
        .handle_event(SynthEvent::NoteOn {
            channel: 0,
            key: 60,
            velocity: 100,
            duration: None,
        })
        .unwrap();
    let id = playing(&synth)[0].id();
    synth
        .handle_event(SynthEvent::ExclusiveClassKill { voice_id: id })
        .unwrap();
    assert!(playing(&synth)[0].is_released());
    assert_eq!(
        synth.handle_event(SynthEvent::PitchBend {
            channel: 20,
            value: 0
        }),
        Err(SynthError::InvalidChannel(20))
    );
}

#[test]
fn clock_advances_per_block() {
    let mut synth = synth(preset_from(Instrument::new("i").with_zone(looped_zone())));
    render(&mut synth, 3);
    assert_eq!(synth.clock(), 3 * BUF as u64);
}
