//! SoundFont unit conversions.
//!
//! Bank parameters are stored in logarithmic units: cents for pitch and
//! filter frequency, centibels for attenuation, timecents for envelope and
//! LFO timing. This module maps them to the linear units the DSP code needs.
//!
//! The mappings that sit on the render path are table driven. The tables are
//! built once, on first use or through [`init_tables`], and are never mutated
//! afterwards, so any number of render threads can read them concurrently.
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`cents_to_hz`] | absolute cents (6900 = A4) | Hz |
//! | [`hz_to_cents`] | Hz | absolute cents |
//! | [`filter_cents_to_hz`] | cents, clamped to 1500..=13500 | Hz |
//! | [`abs_cents_to_hz`] | LFO frequency cents | Hz |
//! | [`cb_to_amp`] | attenuation in centibels | linear gain |
//! | [`timecents_to_secs`] | timecents | seconds |
//! | [`concave`] / [`convex`] | 0..=127 | 0.0..=1.0 |
//! | [`pan`] | -500..=500 (0.1 % units) | channel gain |

extern crate alloc;

use alloc::boxed::Box;
use libm::{exp2f, floorf, log2f, powf, sinf};
use once_cell::race::OnceBox;

/// Frequency of absolute cent 0 (MIDI key 0).
pub const CENT_ZERO_HZ: f32 = 8.175_798_9;

/// Centibels beyond which output is treated as silence.
pub const PEAK_ATTENUATION_CB: f32 = 960.0;

/// Largest attenuation the amplitude table covers.
pub const MAX_ATTENUATION_CB: f32 = 1440.0;

/// Timecent value that means "no delay at all".
pub const NO_DELAY_TIMECENTS: f32 = -32768.0;

const CENTS_TABLE_SIZE: usize = 1201;
const CB_TABLE_SIZE: usize = 1441;
const CURVE_TABLE_SIZE: usize = 128;
const PAN_TABLE_SIZE: usize = 1001;

/// Precomputed lookup tables for the logarithmic-to-linear conversions.
///
/// Obtain the shared instance with [`tables`]. The slices are exposed
/// read-only for callers that want to do their own interpolation.
#[derive(Debug)]
pub struct ConversionTables {
    /// `2^(i / 1200)` for one octave, inclusive of both ends.
    octave_cents: [f32; CENTS_TABLE_SIZE],
    /// `10^(-i / 200)` for 0..=1440 centibels.
    cb_amp: [f32; CB_TABLE_SIZE],
    concave: [f32; CURVE_TABLE_SIZE],
    convex: [f32; CURVE_TABLE_SIZE],
    /// Sine pan law, index 0 = silent side, 1000 = full side.
    pan: [f32; PAN_TABLE_SIZE],
}

impl ConversionTables {
    fn build() -> Self {
        let mut octave_cents = [0.0; CENTS_TABLE_SIZE];
        for (i, v) in octave_cents.iter_mut().enumerate() {
            *v = exp2f(i as f32 / 1200.0);
        }

        let mut cb_amp = [0.0; CB_TABLE_SIZE];
        for (i, v) in cb_amp.iter_mut().enumerate() {
            *v = powf(10.0, i as f32 / -200.0);
        }

        // Both curves follow the bank format's "amplitude squared" law:
        // x = -(20/96) * log10(i^2 / 127^2), clipped to [0, 1].
        let mut concave = [0.0; CURVE_TABLE_SIZE];
        let mut convex = [0.0; CURVE_TABLE_SIZE];
        let top = (CURVE_TABLE_SIZE - 1) as f32;
        for i in 1..CURVE_TABLE_SIZE - 1 {
            let ratio = (i * i) as f32 / (top * top);
            let x = ((-200.0 * 2.0 / PEAK_ATTENUATION_CB) * libm::log10f(ratio)).clamp(0.0, 1.0);
            convex[i] = 1.0 - x;
            concave[CURVE_TABLE_SIZE - 1 - i] = x;
        }
        concave[0] = 0.0;
        concave[CURVE_TABLE_SIZE - 1] = 1.0;
        convex[0] = 0.0;
        convex[CURVE_TABLE_SIZE - 1] = 1.0;

        let mut pan = [0.0; PAN_TABLE_SIZE];
        let step = core::f32::consts::FRAC_PI_2 / (PAN_TABLE_SIZE - 1) as f32;
        for (i, v) in pan.iter_mut().enumerate() {
            *v = sinf(i as f32 * step);
        }

        Self {
            octave_cents,
            cb_amp,
            concave,
            convex,
            pan,
        }
    }

    /// One octave of `2^(cents/1200)` ratios, 1201 entries.
    pub fn octave_cents(&self) -> &[f32] {
        &self.octave_cents
    }

    /// Centibel-to-amplitude table, 1441 entries.
    pub fn cb_amp(&self) -> &[f32] {
        &self.cb_amp
    }

    /// Concave curve, 128 entries.
    pub fn concave(&self) -> &[f32] {
        &self.concave
    }

    /// Convex curve, 128 entries.
    pub fn convex(&self) -> &[f32] {
        &self.convex
    }

    /// Sine pan law, 1001 entries.
    pub fn pan(&self) -> &[f32] {
        &self.pan
    }
}

static TABLES: OnceBox<ConversionTables> = OnceBox::new();

/// Returns the process-wide conversion tables, building them on first call.
#[inline]
pub fn tables() -> &'static ConversionTables {
    TABLES.get_or_init(|| {
        #[cfg(feature = "tracing")]
        tracing::debug!("building conversion tables");
        Box::new(ConversionTables::build())
    })
}

/// Builds every lookup table of this crate.
///
/// Call once during engine start-up so the first note-on does not pay for
/// the table construction.
pub fn init_tables() {
    let _ = tables();
    let _ = crate::interp::interpolation_tables();
}

/// Converts absolute cents to Hz (6900 cents = 440 Hz).
///
/// Negative cents are valid and fall below 8.18 Hz.
#[inline]
pub fn cents_to_hz(cents: f32) -> f32 {
    let octave = floorf(cents / 1200.0);
    let within = cents - octave * 1200.0;
    let idx = (within as usize).min(CENTS_TABLE_SIZE - 2);
    let frac = within - idx as f32;
    let t = &tables().octave_cents;
    let ratio = t[idx] + (t[idx + 1] - t[idx]) * frac;
    CENT_ZERO_HZ * ratio * exp2f(octave)
}

/// Converts Hz to absolute cents.
#[inline]
pub fn hz_to_cents(hz: f32) -> f32 {
    6900.0 + 1200.0 * log2f(hz.max(1e-6) / 440.0)
}

/// Filter cutoff conversion, clamping the input to the bank-format range
/// of 1500..=13500 cents (about 20 Hz to 20 kHz).
#[inline]
pub fn filter_cents_to_hz(cents: f32) -> f32 {
    cents_to_hz(cents.clamp(1500.0, 13500.0))
}

/// LFO frequency conversion: absolute cents relative to 8.176 Hz.
#[inline]
pub fn abs_cents_to_hz(cents: f32) -> f32 {
    CENT_ZERO_HZ * exp2f(cents / 1200.0)
}

/// Converts attenuation in centibels to linear amplitude.
///
/// `0` and below yields exactly `1.0`; `1440` and above yields exactly `0.0`.
#[inline]
pub fn cb_to_amp(cb: f32) -> f32 {
    if cb <= 0.0 {
        return 1.0;
    }
    if cb >= MAX_ATTENUATION_CB {
        return 0.0;
    }
    let t = &tables().cb_amp;
    let idx = cb as usize;
    let frac = cb - idx as f32;
    t[idx] + (t[idx + 1] - t[idx]) * frac
}

/// Converts timecents to seconds without clamping.
#[inline]
pub fn timecents_to_secs(tc: f32) -> f32 {
    exp2f(tc / 1200.0)
}

/// Delay-segment conversion. [`NO_DELAY_TIMECENTS`] or below means zero.
#[inline]
pub fn tc_to_secs_delay(tc: f32) -> f32 {
    if tc <= NO_DELAY_TIMECENTS {
        return 0.0;
    }
    timecents_to_secs(tc.clamp(-12000.0, 5000.0))
}

/// Attack-segment conversion, clamped to -12000..=8000 timecents.
#[inline]
pub fn tc_to_secs_attack(tc: f32) -> f32 {
    if tc <= NO_DELAY_TIMECENTS {
        return 0.0;
    }
    timecents_to_secs(tc.clamp(-12000.0, 8000.0))
}

/// Release-segment conversion, clamped to -12000..=8000 timecents.
#[inline]
pub fn tc_to_secs_release(tc: f32) -> f32 {
    if tc <= NO_DELAY_TIMECENTS {
        return 0.0;
    }
    timecents_to_secs(tc.clamp(-12000.0, 8000.0))
}

#[inline]
fn curve_lookup(table: &[f32; CURVE_TABLE_SIZE], val: f32) -> f32 {
    if val < 0.0 {
        0.0
    } else if val >= (CURVE_TABLE_SIZE - 1) as f32 {
        1.0
    } else {
        table[val as usize]
    }
}

/// Concave transfer curve over a 7-bit controller value.
#[inline]
pub fn concave(val: f32) -> f32 {
    curve_lookup(&tables().concave, val)
}

/// Convex transfer curve over a 7-bit controller value.
#[inline]
pub fn convex(val: f32) -> f32 {
    curve_lookup(&tables().convex, val)
}

/// Sine pan law.
///
/// `c` is the pan generator value in 0.1 % units (-500 = hard left,
/// 500 = hard right). Returns the gain for the left or right channel.
#[inline]
pub fn pan(c: f32, left: bool) -> f32 {
    let idx = (c.clamp(-500.0, 500.0) + 500.0) as usize;
    let t = &tables().pan;
    if left { t[PAN_TABLE_SIZE - 1 - idx] } else { t[idx] }
}

/// Converts MIDI key number (with fractional cents) to absolute cents.
#[inline]
pub fn key_to_cents(key: f32) -> f32 {
    key * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((cents_to_hz(6900.0) - 440.0).abs() < 0.01);
        assert!((hz_to_cents(440.0) - 6900.0).abs() < 0.01);
    }

    #[test]
    fn cents_round_trip_within_one_cent() {
        for hz in [20.0_f32, 55.0, 261.63, 1000.0, 4186.0, 19000.0] {
            let back = cents_to_hz(hz_to_cents(hz));
            let err_cents = 1200.0 * log2f(back / hz);
            assert!(err_cents.abs() < 1.0, "{hz} Hz -> {back} Hz ({err_cents} cents)");
        }
    }

    #[test]
    fn negative_cents_below_key_zero() {
        let hz = cents_to_hz(-1200.0);
        assert!((hz - CENT_ZERO_HZ / 2.0).abs() < 1e-3, "got {hz}");
    }

    #[test]
    fn cb_endpoints() {
        assert_eq!(cb_to_amp(0.0), 1.0);
        assert_eq!(cb_to_amp(-10.0), 1.0);
        assert_eq!(cb_to_amp(1440.0), 0.0);
        assert_eq!(cb_to_amp(5000.0), 0.0);
        // 200 cB = 20 dB = amplitude 0.1
        assert!((cb_to_amp(200.0) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn curve_endpoints() {
        assert_eq!(concave(0.0), 0.0);
        assert_eq!(concave(127.0), 1.0);
        assert_eq!(convex(0.0), 0.0);
        assert_eq!(convex(127.0), 1.0);
    }

    #[test]
    fn curves_are_monotonic() {
        let mut prev_cc = -1.0;
        let mut prev_cx = -1.0;
        for i in 0..128 {
            let cc = concave(i as f32);
            let cx = convex(i as f32);
            assert!(cc >= prev_cc, "concave dips at {i}");
            assert!(cx >= prev_cx, "convex dips at {i}");
            prev_cc = cc;
            prev_cx = cx;
        }
        // Concave stays below the diagonal, convex above it.
        assert!(concave(64.0) < 0.5);
        assert!(convex(64.0) > 0.5);
    }

    #[test]
    fn pan_law() {
        let l = pan(0.0, true);
        let r = pan(0.0, false);
        assert_eq!(l, r);
        assert!((l - core::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!(pan(-500.0, false).abs() < 1e-6);
        assert!((pan(-500.0, true) - 1.0).abs() < 1e-6);
        assert!((pan(700.0, false) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn timecent_ranges() {
        assert_eq!(tc_to_secs_delay(NO_DELAY_TIMECENTS), 0.0);
        assert!((timecents_to_secs(0.0) - 1.0).abs() < 1e-6);
        assert!((timecents_to_secs(1200.0) - 2.0).abs() < 1e-5);
        // delay clamps at 5000 tc, attack at 8000 tc
        assert!((tc_to_secs_delay(9000.0) - timecents_to_secs(5000.0)).abs() < 1e-3);
        assert!((tc_to_secs_attack(9000.0) - timecents_to_secs(8000.0)).abs() < 1e-3);
        assert!((tc_to_secs_release(-20000.0) - timecents_to_secs(-12000.0)).abs() < 1e-7);
    }

    #[test]
    fn filter_cents_clamped() {
        assert_eq!(filter_cents_to_hz(20000.0), filter_cents_to_hz(13500.0));
        assert_eq!(filter_cents_to_hz(0.0), filter_cents_to_hz(1500.0));
    }
}
