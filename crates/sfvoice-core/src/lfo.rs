//! Triangle low-frequency oscillator for per-voice modulation.
//!
//! Each voice carries two of these: the modulation LFO (pitch, filter and
//! volume) and the vibrato LFO (pitch only). They are stepped once per render
//! buffer rather than per sample, so the increment is scaled by the buffer
//! length.

use crate::conv::abs_cents_to_hz;

/// Triangle LFO stepped once per render buffer.
///
/// The output moves between -1.0 and 1.0. Before the configured delay has
/// elapsed the LFO holds its value (0.0 after [`TriangleLfo::reset`]).
///
/// # Example
///
/// ```rust
/// use sfvoice_core::TriangleLfo;
///
/// let mut lfo = TriangleLfo::default();
/// lfo.set_frequency_cents(0.0, 44100.0, 64); // 8.176 Hz
/// lfo.set_delay(0);
///
/// let mut elapsed = 0;
/// for _ in 0..100 {
///     elapsed += 64;
///     lfo.step(elapsed);
///     assert!(lfo.value().abs() <= 1.0);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TriangleLfo {
    /// Current output in [-1.0, 1.0]
    value: f32,
    /// Change per buffer, sign encodes direction
    incr: f32,
    /// Samples that must elapse before the LFO moves
    delay_samples: u32,
}

impl TriangleLfo {
    /// Lowest LFO frequency the bank format allows, in absolute cents.
    pub const MIN_FREQ_CENTS: f32 = -16000.0;
    /// Highest LFO frequency the bank format allows, in absolute cents.
    pub const MAX_FREQ_CENTS: f32 = 4500.0;

    /// Returns the output to zero, keeping frequency and delay.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.incr = self.incr.abs();
    }

    /// Sets the rate from a frequency generator in absolute cents.
    ///
    /// One full cycle spans four unit steps (0 → 1 → -1 → 0), so the
    /// per-buffer increment is `4 * buffer_len * hz / output_rate`.
    pub fn set_frequency_cents(&mut self, cents: f32, output_rate: f32, buffer_len: usize) {
        let hz = abs_cents_to_hz(cents.clamp(Self::MIN_FREQ_CENTS, Self::MAX_FREQ_CENTS));
        let magnitude = 4.0 * buffer_len as f32 * hz / output_rate;
        self.incr = if self.incr < 0.0 { -magnitude } else { magnitude };
    }

    /// Sets the onset delay in samples.
    pub fn set_delay(&mut self, samples: u32) {
        self.delay_samples = samples;
    }

    /// Onset delay in samples.
    pub fn delay(&self) -> u32 {
        self.delay_samples
    }

    /// Per-buffer increment magnitude.
    pub fn increment(&self) -> f32 {
        self.incr.abs()
    }

    /// Current output.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advances one buffer. `ticks` is the voice age in samples.
    #[inline]
    pub fn step(&mut self, ticks: u64) {
        if ticks < u64::from(self.delay_samples) {
            return;
        }
        self.value += self.incr;
        if self.value > 1.0 {
            self.value = 2.0 - self.value;
            self.incr = -self.incr;
        } else if self.value < -1.0 {
            self.value = -2.0 - self.value;
            self.incr = -self.incr;
        }
        // increments above 2 (very fast LFO, long buffer) overshoot the reflection
        self.value = self.value.clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_during_delay() {
        let mut lfo = TriangleLfo::default();
        lfo.set_frequency_cents(0.0, 44100.0, 64);
        lfo.set_delay(1000);
        lfo.step(64);
        lfo.step(960);
        assert_eq!(lfo.value(), 0.0);
        lfo.step(1024);
        assert!(lfo.value() > 0.0);
    }

    #[test]
    fn reflects_at_bounds() {
        let mut lfo = TriangleLfo::default();
        lfo.set_frequency_cents(4500.0, 44100.0, 512);
        let mut max: f32 = 0.0;
        let mut min: f32 = 0.0;
        for i in 0..1000 {
            lfo.step(i * 512);
            assert!(lfo.value().abs() <= 1.0 + 1e-6, "value {}", lfo.value());
            max = max.max(lfo.value());
            min = min.min(lfo.value());
        }
        assert!(max > 0.5 && min < -0.5);
    }

    #[test]
    fn period_matches_frequency() {
        // 8.176 Hz at 44100 Hz with one-sample "buffers"
        let mut lfo = TriangleLfo::default();
        lfo.set_frequency_cents(0.0, 44100.0, 1);
        let period = (44100.0 / 8.175_798_9) as u64;
        let mut crossings = 0;
        let mut prev = lfo.value();
        for t in 0..period * 4 {
            lfo.step(t);
            if prev <= 0.0 && lfo.value() > 0.0 {
                crossings += 1;
            }
            prev = lfo.value();
        }
        assert!((3..=5).contains(&crossings), "crossings {crossings}");
    }

    #[test]
    fn frequency_is_clamped() {
        let mut a = TriangleLfo::default();
        let mut b = TriangleLfo::default();
        a.set_frequency_cents(10_000.0, 44100.0, 64);
        b.set_frequency_cents(4500.0, 44100.0, 64);
        assert_eq!(a.increment(), b.increment());
    }
}
