//! Biquad (bi-quadratic) filter structure.
//!
//! Provides a second-order IIR section generic over its state precision,
//! with per-sample coefficient ramping so that a cutoff sweep between two
//! render buffers does not produce zipper noise.
//!
//! Coefficient calculation uses the RBJ Audio EQ Cookbook formulas.

use core::f64::consts::PI;
use core::fmt::Debug;
use core::ops::{Add, Mul, Sub};
use libm::{cos, sin};

/// Numeric type a [`Biquad`] keeps its coefficients and delay line in.
pub trait FilterSample:
    Copy + Default + Debug + PartialEq + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
    /// Converts a coefficient computed in `f64`.
    fn from_f64(v: f64) -> Self;
    /// Converts an input sample.
    fn from_f32(v: f32) -> Self;
    /// Converts back to an output sample.
    fn to_f32(self) -> f32;
    /// Replaces denormal-range values with zero.
    fn flush(self) -> Self;
}

impl FilterSample for f32 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline]
    fn flush(self) -> Self {
        if self.abs() < 1e-20 { 0.0 } else { self }
    }
}

impl FilterSample for f64 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        f64::from(v)
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn flush(self) -> Self {
        if self.abs() < 1e-20 { 0.0 } else { self }
    }
}

/// Normalized biquad coefficients.
///
/// `b0` equals `b2` for both low-pass and high-pass responses, so the pair
/// is stored once as `b02`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    /// Shared feedforward coefficient for `x[n]` and `x[n-2]`
    pub b02: f64,
    /// Feedforward coefficient for `x[n-1]`
    pub b1: f64,
    /// Feedback coefficient for `y[n-1]`
    pub a1: f64,
    /// Feedback coefficient for `y[n-2]`
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Scales the feedforward path by `gain`.
    pub fn with_gain(mut self, gain: f64) -> Self {
        self.b02 *= gain;
        self.b1 *= gain;
        self
    }
}

/// Second-order IIR filter section.
///
/// Implements the Direct Form I biquad structure:
/// ```text
/// y[n] = b02*x[n] + b1*x[n-1] + b02*x[n-2]
///                 - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone, Default)]
pub struct Biquad<T: FilterSample> {
    b02: T,
    b1: T,
    a1: T,
    a2: T,

    /// Per-sample coefficient increments while a ramp is running
    b02_incr: T,
    b1_incr: T,
    a1_incr: T,
    a2_incr: T,
    ramp_remaining: u32,

    /// Input delay line: x[n-1], x[n-2]
    x1: T,
    x2: T,

    /// Output delay line: y[n-1], y[n-2]
    y1: T,
    y2: T,
}

impl<T: FilterSample> Biquad<T> {
    /// Creates a biquad with zeroed coefficients and history.
    ///
    /// Call [`Biquad::set_coefficients`] before processing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets coefficients immediately, cancelling any running ramp.
    pub fn set_coefficients(&mut self, c: BiquadCoefficients) {
        self.b02 = T::from_f64(c.b02);
        self.b1 = T::from_f64(c.b1);
        self.a1 = T::from_f64(c.a1);
        self.a2 = T::from_f64(c.a2);
        self.ramp_remaining = 0;
    }

    /// Moves linearly to `c` over the next `samples` processed samples.
    pub fn ramp_to(&mut self, c: BiquadCoefficients, samples: u32) {
        if samples == 0 {
            self.set_coefficients(c);
            return;
        }
        let inv = T::from_f64(1.0 / f64::from(samples));
        self.b02_incr = (T::from_f64(c.b02) - self.b02) * inv;
        self.b1_incr = (T::from_f64(c.b1) - self.b1) * inv;
        self.a1_incr = (T::from_f64(c.a1) - self.a1) * inv;
        self.a2_incr = (T::from_f64(c.a2) - self.a2) * inv;
        self.ramp_remaining = samples;
    }

    /// Processes a single sample.
    #[inline]
    pub fn process(&mut self, input: T) -> T {
        let output = self.b02 * (input + self.x2) + self.b1 * self.x1
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        if self.ramp_remaining > 0 {
            self.b02 = self.b02 + self.b02_incr;
            self.b1 = self.b1 + self.b1_incr;
            self.a1 = self.a1 + self.a1_incr;
            self.a2 = self.a2 + self.a2_incr;
            self.ramp_remaining -= 1;
        }

        output
    }

    /// Filters `buf` in place.
    pub fn process_block(&mut self, buf: &mut [f32]) {
        for s in buf.iter_mut() {
            *s = self.process(T::from_f32(*s)).to_f32();
        }
        self.y1 = self.y1.flush();
        self.y2 = self.y2.flush();
    }

    /// Clears the delay lines, keeping coefficients.
    pub fn clear(&mut self) {
        self.x1 = T::default();
        self.x2 = T::default();
        self.y1 = T::default();
        self.y2 = T::default();
    }

    /// Whether a coefficient ramp is still in progress.
    pub fn is_ramping(&self) -> bool {
        self.ramp_remaining > 0
    }
}

/// Calculates low-pass filter coefficients using the RBJ cookbook formula.
///
/// # Arguments
///
/// * `frequency` - Cutoff frequency in Hz
/// * `q` - Linear Q factor (0.707 for a Butterworth response)
/// * `sample_rate` - Sample rate in Hz
pub fn lowpass_coefficients(frequency: f64, q: f64, sample_rate: f64) -> BiquadCoefficients {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cos(omega);
    let alpha = sin(omega) / (2.0 * q);
    let a0_inv = 1.0 / (1.0 + alpha);

    let b1 = (1.0 - cos_omega) * a0_inv;
    BiquadCoefficients {
        b02: b1 * 0.5,
        b1,
        a1: -2.0 * cos_omega * a0_inv,
        a2: (1.0 - alpha) * a0_inv,
    }
}

/// Calculates high-pass filter coefficients using the RBJ cookbook formula.
///
/// Arguments as for [`lowpass_coefficients`].
pub fn highpass_coefficients(frequency: f64, q: f64, sample_rate: f64) -> BiquadCoefficients {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cos(omega);
    let alpha = sin(omega) / (2.0 * q);
    let a0_inv = 1.0 / (1.0 + alpha);

    let b1 = -(1.0 + cos_omega) * a0_inv;
    BiquadCoefficients {
        b02: -b1 * 0.5,
        b1,
        a1: -2.0 * cos_omega * a0_inv,
        a2: (1.0 - alpha) * a0_inv,
    }
}
