//! Property-based tests for sfvoice-core primitives.
//!
//! Tests conversion round trips, curve monotonicity, and filter stability
//! using proptest for randomized input generation.

use proptest::prelude::*;
use sfvoice_core::{
    Biquad, FilterFlags, FilterPrecision, FilterType, ResonantFilter, TriangleLfo, cb_to_amp,
    cents_to_hz, concave, convex, highpass_coefficients, hz_to_cents, lowpass_coefficients,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Hz -> cents -> Hz stays within one cent of the input.
    #[test]
    fn cents_round_trip(hz in 8.0f32..20000.0f32) {
        let back = cents_to_hz(hz_to_cents(hz));
        let error_cents = (hz_to_cents(back) - hz_to_cents(hz)).abs();
        prop_assert!(error_cents < 1.0, "{} Hz came back as {} Hz", hz, back);
    }

    /// Attenuation never amplifies and more centibels never mean more gain.
    #[test]
    fn cb_to_amp_monotonic(a in -100.0f32..2000.0f32, delta in 0.0f32..500.0f32) {
        let x = cb_to_amp(a);
        let y = cb_to_amp(a + delta);
        prop_assert!((0.0..=1.0).contains(&x));
        prop_assert!(y <= x + 1e-6, "cb {} -> {}, cb {} -> {}", a, x, a + delta, y);
    }

    /// Shaping curves are non-decreasing over the 7-bit controller range.
    #[test]
    fn curves_monotonic(v in 0.0f32..126.0f32) {
        prop_assert!(concave(v + 1.0) >= concave(v));
        prop_assert!(convex(v + 1.0) >= convex(v));
    }

    /// For any valid cutoff and Q, both biquad responses and both precisions
    /// produce finite output for random finite input.
    #[test]
    fn biquad_stability(
        freq in 5.0f64..21000.0f64,
        q in 0.1f64..200.0f64,
        highpass in any::<bool>(),
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let c = if highpass {
            highpass_coefficients(freq, q, 48000.0)
        } else {
            lowpass_coefficients(freq, q, 48000.0)
        };
        let mut single = Biquad::<f32>::new();
        let mut double = Biquad::<f64>::new();
        single.set_coefficients(c);
        double.set_coefficients(c);

        let mut a = input;
        let mut b = input;
        for _ in 0..32 {
            single.process_block(&mut a);
            double.process_block(&mut b);
            prop_assert!(a.iter().all(|s| s.is_finite()), "f32 diverged at {} Hz q {}", freq, q);
            prop_assert!(b.iter().all(|s| s.is_finite()), "f64 diverged at {} Hz q {}", freq, q);
            a = input;
            b = input;
        }
    }

    /// Cutoff sweeps with ramped coefficients never blow up.
    #[test]
    fn resonant_filter_sweep_is_stable(
        start in 1500.0f32..13500.0f32,
        end in 1500.0f32..13500.0f32,
        q_cb in 0.0f32..960.0f32,
    ) {
        let mut filter = ResonantFilter::new(FilterPrecision::Single);
        filter.init(FilterType::LowPass, FilterFlags::NONE);
        filter.set_ramp_length(64);
        filter.set_q(q_cb, 0.0);
        filter.set_cutoff_cents(start);

        let mut block = [0.0f32; 64];
        for step in 0..50 {
            let t = step as f32 / 49.0;
            let modulation = (end - start) * t;
            filter.recalculate_coefficients(44100.0, modulation, 0.0);
            for (i, s) in block.iter_mut().enumerate() {
                *s = if i % 2 == 0 { 0.5 } else { -0.5 };
            }
            filter.apply(&mut block);
            prop_assert!(block.iter().all(|s| s.is_finite()));
        }
    }

    /// The LFO never leaves [-1, 1] for any rate or buffer length.
    #[test]
    fn lfo_bounded(cents in -16000.0f32..4500.0f32, buffer in 1usize..4096) {
        let mut lfo = TriangleLfo::default();
        lfo.set_frequency_cents(cents, 22050.0, buffer);
        for i in 0..512u64 {
            lfo.step(i * buffer as u64);
            prop_assert!(lfo.value().abs() <= 1.0 + 1e-5, "value {}", lfo.value());
        }
    }
}
