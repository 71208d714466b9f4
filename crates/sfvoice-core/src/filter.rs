//! Per-voice resonant filter.
//!
//! A low-pass (or high-pass) biquad whose cutoff and resonance come from
//! the voice's filter generators. The cutoff is held in absolute cents so
//! LFO and envelope modulation can be added linearly before the single
//! cents-to-Hz conversion per render buffer.
//!
//! The coefficient precision is chosen once, when the voice is built, via
//! [`FilterPrecision`]; the render loop then runs a monomorphized
//! [`Biquad<f32>`] or [`Biquad<f64>`] without per-sample dispatch.

use crate::biquad::{Biquad, BiquadCoefficients, highpass_coefficients, lowpass_coefficients};
use crate::conv::{filter_cents_to_hz, hz_to_cents};
use libm::{powf, sqrtf};

/// Filter response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    /// Filter never processes
    Disabled,
    /// Resonant low-pass (bank-format default)
    #[default]
    LowPass,
    /// Resonant high-pass
    HighPass,
}

/// Numeric precision of the filter state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterPrecision {
    /// `f32` coefficients and delay line
    Single,
    /// `f64` coefficients and delay line
    #[default]
    Double,
}

/// Behaviour flags for [`ResonantFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FilterFlags(u8);

impl FilterFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Q values are linear factors instead of centibels of resonance.
    pub const Q_LINEAR: Self = Self(1 << 0);
    /// A Q of zero switches the filter off.
    pub const Q_ZERO_OFF: Self = Self(1 << 1);
    /// Skip the `1/sqrt(Q)` gain correction of the resonance peak.
    pub const NO_GAIN_AMP: Self = Self(1 << 2);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

#[derive(Debug, Clone)]
enum Kernel {
    Single(Biquad<f32>),
    Double(Biquad<f64>),
}

impl Kernel {
    fn new(precision: FilterPrecision) -> Self {
        match precision {
            FilterPrecision::Single => Self::Single(Biquad::new()),
            FilterPrecision::Double => Self::Double(Biquad::new()),
        }
    }

    fn set(&mut self, c: BiquadCoefficients) {
        match self {
            Self::Single(b) => b.set_coefficients(c),
            Self::Double(b) => b.set_coefficients(c),
        }
    }

    fn ramp(&mut self, c: BiquadCoefficients, samples: u32) {
        match self {
            Self::Single(b) => b.ramp_to(c, samples),
            Self::Double(b) => b.ramp_to(c, samples),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Single(b) => b.clear(),
            Self::Double(b) => b.clear(),
        }
    }

    fn process_block(&mut self, buf: &mut [f32]) {
        match self {
            Self::Single(b) => b.process_block(buf),
            Self::Double(b) => b.process_block(buf),
        }
    }
}

/// Highest cutoff as a fraction of the output rate.
const MAX_CUTOFF_RATIO: f32 = 0.45;
/// Lowest cutoff in Hz.
const MIN_CUTOFF_HZ: f32 = 5.0;
/// Cutoff changes below this many Hz do not trigger a recalculation.
const CUTOFF_EPSILON_HZ: f32 = 0.01;

/// Resonant per-voice filter.
///
/// ## Parameters
/// - cutoff: absolute cents, bank range 1500..=13500 (default 13500)
/// - Q: centibels of resonance above DC gain, 0..=960 (default 0)
///
/// # Example
///
/// ```rust
/// use sfvoice_core::{FilterFlags, FilterPrecision, FilterType, ResonantFilter};
///
/// let mut filter = ResonantFilter::new(FilterPrecision::Double);
/// filter.init(FilterType::LowPass, FilterFlags::NONE);
/// filter.set_cutoff(2000.0);
/// filter.set_q(60.0, 0.0);
/// filter.recalculate_coefficients(48000.0, 0.0, 0.0);
///
/// let mut block = [0.5_f32; 64];
/// filter.apply(&mut block);
/// ```
#[derive(Debug, Clone)]
pub struct ResonantFilter {
    filter_type: FilterType,
    flags: FilterFlags,
    kernel: Kernel,
    /// Static cutoff in absolute cents
    cutoff_cents: f32,
    q_lin: f32,
    /// Feedforward gain compensating the resonance peak
    gain: f32,
    /// Cutoff of the coefficients currently loaded, `None` forces recalculation
    last_cutoff_hz: Option<f32>,
    /// First coefficient set after reset is loaded without a ramp
    startup: bool,
    /// Whether the filter currently alters the signal
    active: bool,
    ramp_samples: u32,
}

impl ResonantFilter {
    /// Creates a low-pass filter with the given state precision.
    pub fn new(precision: FilterPrecision) -> Self {
        Self {
            filter_type: FilterType::LowPass,
            flags: FilterFlags::NONE,
            kernel: Kernel::new(precision),
            cutoff_cents: 13500.0,
            q_lin: 0.0,
            gain: 1.0,
            last_cutoff_hz: None,
            startup: true,
            active: false,
            ramp_samples: 64,
        }
    }

    /// Selects response and flags. Also resets the filter.
    pub fn init(&mut self, filter_type: FilterType, flags: FilterFlags) {
        self.filter_type = filter_type;
        self.flags = flags;
        self.reset();
    }

    /// Number of samples a coefficient change is spread over.
    ///
    /// Set to the render buffer size so that each buffer ends on its target.
    pub fn set_ramp_length(&mut self, samples: u32) {
        self.ramp_samples = samples;
    }

    /// Clears the delay line and forces the next coefficients to load
    /// without a ramp.
    pub fn reset(&mut self) {
        self.kernel.clear();
        self.last_cutoff_hz = None;
        self.startup = true;
        self.active = false;
    }

    /// Sets the static cutoff frequency in Hz.
    pub fn set_cutoff(&mut self, hz: f32) {
        self.set_cutoff_cents(hz_to_cents(hz));
    }

    /// Sets the static cutoff in absolute cents.
    pub fn set_cutoff_cents(&mut self, cents: f32) {
        self.cutoff_cents = cents;
        self.last_cutoff_hz = None;
    }

    /// Static cutoff in absolute cents.
    pub fn cutoff_cents(&self) -> f32 {
        self.cutoff_cents
    }

    /// Sets resonance from `q` plus a modulation `offset`.
    ///
    /// Both are centibels of resonance unless [`FilterFlags::Q_LINEAR`] is set.
    pub fn set_q(&mut self, q: f32, offset: f32) {
        let q = q + offset;

        if self.flags.contains(FilterFlags::Q_ZERO_OFF) && q <= 0.0 {
            self.q_lin = 0.0;
        } else if self.flags.contains(FilterFlags::Q_LINEAR) {
            self.q_lin = q.max(0.001);
        } else {
            // Bank Q is the resonance peak in cB above DC. Subtracting
            // 3.01 dB makes Q = 0 a flat (Butterworth) response.
            let q_db = (q / 10.0).clamp(0.0, 96.0) - 3.01;
            self.q_lin = powf(10.0, q_db / 20.0);
        }

        self.gain = if self.flags.contains(FilterFlags::NO_GAIN_AMP) || self.q_lin <= 0.0 {
            1.0
        } else {
            1.0 / sqrtf(self.q_lin)
        };
        self.last_cutoff_hz = None;
    }

    /// Linear Q currently in effect.
    pub fn q_linear(&self) -> f32 {
        self.q_lin
    }

    /// Whether the last recalculation left the filter audible.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Derives coefficients for the coming render buffer.
    ///
    /// `modulation_cents` is the LFO/envelope contribution, `offset_cents`
    /// the modulator offset of the cutoff generator. Call once per buffer.
    pub fn recalculate_coefficients(
        &mut self,
        output_rate: f32,
        modulation_cents: f32,
        offset_cents: f32,
    ) {
        if self.filter_type == FilterType::Disabled || self.q_lin <= 0.0 {
            self.active = false;
            return;
        }

        let total_cents = self.cutoff_cents + offset_cents + modulation_cents;
        let max_hz = MAX_CUTOFF_RATIO * output_rate;
        let cutoff_hz = filter_cents_to_hz(total_cents).clamp(MIN_CUTOFF_HZ, max_hz);

        // A flat response at the edge of the range is inaudible.
        let flat = self.q_lin <= core::f32::consts::FRAC_1_SQRT_2 + 1e-4;
        let transparent = flat
            && match self.filter_type {
                FilterType::LowPass => total_cents >= 13500.0 || cutoff_hz >= max_hz,
                FilterType::HighPass => total_cents <= 1500.0,
                FilterType::Disabled => true,
            };
        if transparent {
            if self.active {
                self.kernel.clear();
                self.startup = true;
                self.last_cutoff_hz = None;
            }
            self.active = false;
            return;
        }

        if let Some(last) = self.last_cutoff_hz
            && (cutoff_hz - last).abs() <= CUTOFF_EPSILON_HZ
        {
            self.active = true;
            return;
        }
        self.last_cutoff_hz = Some(cutoff_hz);

        let coeffs = match self.filter_type {
            FilterType::HighPass => highpass_coefficients(
                f64::from(cutoff_hz),
                f64::from(self.q_lin),
                f64::from(output_rate),
            ),
            _ => lowpass_coefficients(
                f64::from(cutoff_hz),
                f64::from(self.q_lin),
                f64::from(output_rate),
            ),
        }
        .with_gain(f64::from(self.gain));

        if self.startup || !self.active {
            self.kernel.set(coeffs);
            self.startup = false;
        } else {
            self.kernel.ramp(coeffs, self.ramp_samples);
        }
        self.active = true;
    }

    /// Filters `buf` in place. No-op while the filter is inactive.
    pub fn apply(&mut self, buf: &mut [f32]) {
        if self.active {
            self.kernel.process_block(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::sinf;

    fn sine_rms(filter: &mut ResonantFilter, freq: f32, rate: f32) -> f32 {
        let mut buf = [0.0_f32; 64];
        let mut sum = 0.0;
        let mut n = 0;
        for block in 0..200 {
            for (i, s) in buf.iter_mut().enumerate() {
                let t = (block * 64 + i) as f32 / rate;
                *s = sinf(2.0 * core::f32::consts::PI * freq * t);
            }
            filter.recalculate_coefficients(rate, 0.0, 0.0);
            filter.apply(&mut buf);
            if block >= 100 {
                sum += buf.iter().map(|s| s * s).sum::<f32>();
                n += buf.len();
            }
        }
        sqrtf(sum / n as f32)
    }

    #[test]
    fn default_cutoff_is_transparent() {
        let mut filter = ResonantFilter::new(FilterPrecision::Single);
        filter.init(FilterType::LowPass, FilterFlags::NONE);
        filter.set_cutoff_cents(13500.0);
        filter.set_q(0.0, 0.0);
        filter.recalculate_coefficients(44100.0, 0.0, 0.0);
        assert!(!filter.is_active());
    }

    #[test]
    fn resonance_keeps_filter_active() {
        let mut filter = ResonantFilter::new(FilterPrecision::Double);
        filter.init(FilterType::LowPass, FilterFlags::NONE);
        filter.set_cutoff_cents(13500.0);
        filter.set_q(100.0, 0.0);
        filter.recalculate_coefficients(44100.0, 0.0, 0.0);
        assert!(filter.is_active());
    }

    #[test]
    fn lowpass_attenuates_above_cutoff() {
        for precision in [FilterPrecision::Single, FilterPrecision::Double] {
            let mut filter = ResonantFilter::new(precision);
            filter.init(FilterType::LowPass, FilterFlags::NONE);
            filter.set_cutoff(500.0);
            filter.set_q(0.0, 0.0);
            let low = sine_rms(&mut filter, 100.0, 48000.0);
            filter.reset();
            let high = sine_rms(&mut filter, 8000.0, 48000.0);
            assert!(low > 0.6, "{precision:?} passband rms {low}");
            assert!(high < 0.05, "{precision:?} stopband rms {high}");
        }
    }

    #[test]
    fn highpass_attenuates_below_cutoff() {
        let mut filter = ResonantFilter::new(FilterPrecision::Double);
        filter.init(FilterType::HighPass, FilterFlags::NONE);
        filter.set_cutoff(4000.0);
        filter.set_q(0.0, 0.0);
        let low = sine_rms(&mut filter, 100.0, 48000.0);
        assert!(low < 0.05, "high-pass leaked {low}");
    }

    #[test]
    fn q_zero_off_disables() {
        let mut filter = ResonantFilter::new(FilterPrecision::Single);
        filter.init(FilterType::LowPass, FilterFlags::Q_ZERO_OFF);
        filter.set_cutoff(500.0);
        filter.set_q(0.0, 0.0);
        filter.recalculate_coefficients(48000.0, 0.0, 0.0);
        assert!(!filter.is_active());
    }

    #[test]
    fn modulation_moves_cutoff() {
        let mut filter = ResonantFilter::new(FilterPrecision::Double);
        filter.init(FilterType::LowPass, FilterFlags::NONE);
        filter.set_cutoff_cents(13500.0);
        filter.set_q(0.0, 0.0);
        filter.recalculate_coefficients(48000.0, -6000.0, 0.0);
        assert!(filter.is_active(), "negative modulation should pull cutoff down");
    }
}
