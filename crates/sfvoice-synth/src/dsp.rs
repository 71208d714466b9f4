//! Sample playback kernels.
//!
//! Reads a voice's sample region at a fractional, pitch-dependent rate into
//! a mono buffer, applying a per-sample amplitude ramp. Handles loop
//! wrap-around and the end of unlooped samples.

use sfvoice_core::{Interpolation, Phase, SINC_TAPS, interpolation_tables};

const I16_SCALE: f32 = 1.0 / 32768.0;

/// Read position and the region boundaries it moves in.
///
/// `end` is the last playable frame; `loop_end` is the first frame after
/// the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackCursor {
    /// 32.32 read position
    pub phase: Phase,
    /// First playable frame
    pub start: u32,
    /// Last playable frame
    pub end: u32,
    /// First loop frame
    pub loop_start: u32,
    /// Frame after the last loop frame
    pub loop_end: u32,
    /// Set once the cursor has wrapped at least once
    pub has_looped: bool,
}

impl PlaybackCursor {
    /// Sample value at `idx`, resolving loop wrap and region edges.
    #[inline]
    fn tap(&self, data: &[i16], idx: i64, looping: bool) -> f32 {
        let mut i = idx;
        if looping {
            let len = i64::from(self.loop_end.saturating_sub(self.loop_start));
            if i >= i64::from(self.loop_end) {
                i -= len;
            } else if self.has_looped && i < i64::from(self.loop_start) {
                i += len;
            }
        }
        let i = i.clamp(i64::from(self.start), i64::from(self.end));
        data.get(i as usize).map_or(0.0, |&s| f32::from(s) * I16_SCALE)
    }

    /// Fills `out` with interpolated samples scaled by a linear amplitude
    /// ramp starting at `*amp`.
    ///
    /// Returns the number of samples written. Fewer than `out.len()` means
    /// the end of an unlooped region was reached.
    pub fn render(
        &mut self,
        data: &[i16],
        out: &mut [f32],
        method: Interpolation,
        incr: Phase,
        amp: &mut f32,
        amp_incr: f32,
        looping: bool,
    ) -> usize {
        let looping = looping && self.loop_end > self.loop_start;
        let tables = interpolation_tables();

        match method {
            Interpolation::None => self.run(out, incr, amp, amp_incr, looping, |c, p| {
                c.tap(data, i64::from(p.index_rounded()), looping)
            }),
            Interpolation::Linear => self.run(out, incr, amp, amp_incr, looping, |c, p| {
                let w = tables.linear(p.table_row());
                let n = i64::from(p.index());
                w[0] * c.tap(data, n, looping) + w[1] * c.tap(data, n + 1, looping)
            }),
            Interpolation::Cubic => self.run(out, incr, amp, amp_incr, looping, |c, p| {
                let w = tables.cubic(p.table_row());
                let n = i64::from(p.index());
                w[0] * c.tap(data, n - 1, looping)
                    + w[1] * c.tap(data, n, looping)
                    + w[2] * c.tap(data, n + 1, looping)
                    + w[3] * c.tap(data, n + 2, looping)
            }),
            Interpolation::Sinc7 => self.run(out, incr, amp, amp_incr, looping, |c, p| {
                let w = tables.sinc7(p.table_row());
                let first = i64::from(p.index()) - (SINC_TAPS / 2) as i64;
                w.iter()
                    .enumerate()
                    .map(|(k, wk)| wk * c.tap(data, first + k as i64, looping))
                    .sum()
            }),
        }
    }

    #[inline]
    fn run<F>(
        &mut self,
        out: &mut [f32],
        incr: Phase,
        amp: &mut f32,
        amp_incr: f32,
        looping: bool,
        kernel: F,
    ) -> usize
    where
        F: Fn(&Self, Phase) -> f32,
    {
        // zero when unlooped; loop points may be out of order then
        let loop_len = self.loop_end.saturating_sub(self.loop_start);
        for (i, o) in out.iter_mut().enumerate() {
            if looping {
                while self.phase.index() >= self.loop_end {
                    self.phase.rewind(loop_len);
                    self.has_looped = true;
                }
            } else if self.phase.index() > self.end {
                return i;
            }
            *o = *amp * kernel(self, self.phase);
            *amp += amp_incr;
            self.phase.advance(incr);
        }
        out.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<i16> {
        (0..len).map(|i| (i as i16) * 100).collect()
    }

    fn cursor(len: u32) -> PlaybackCursor {
        PlaybackCursor {
            phase: Phase::from_index(0),
            start: 0,
            end: len - 1,
            loop_start: 0,
            loop_end: len,
            has_looped: false,
        }
    }

    #[test]
    fn unlooped_stops_at_end() {
        let data = ramp(10);
        let mut c = cursor(10);
        let mut out = [0.0; 64];
        let mut amp = 1.0;
        let n = c.render(&data, &mut out, Interpolation::Linear, Phase::from_f32(1.0), &mut amp, 0.0, false);
        assert_eq!(n, 10);
        assert!((out[3] - 300.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn loop_wraps() {
        let data = ramp(16);
        let mut c = cursor(16);
        c.loop_start = 4;
        c.loop_end = 12;
        let mut out = [0.0; 64];
        let mut amp = 1.0;
        let n = c.render(&data, &mut out, Interpolation::None, Phase::from_f32(1.0), &mut amp, 0.0, true);
        assert_eq!(n, 64);
        assert!(c.has_looped);
        // frame 12 maps back to frame 4
        assert!((out[12] - 400.0 / 32768.0).abs() < 1e-6);
        assert!(c.phase.index() >= 4 && c.phase.index() < 12);
    }

    #[test]
    fn half_speed_interpolates() {
        let data = ramp(32);
        for method in [Interpolation::Linear, Interpolation::Cubic] {
            let mut c = cursor(32);
            c.phase = Phase::from_index(8);
            let mut out = [0.0; 4];
            let mut amp = 1.0;
            c.render(&data, &mut out, method, Phase::from_f32(0.5), &mut amp, 0.0, false);
            // linear ramp is reproduced exactly by both kernels
            assert!((out[1] - 850.0 / 32768.0).abs() < 1e-5, "{method:?}: {}", out[1]);
        }
    }

    #[test]
    fn unlooped_ignores_inverted_loop_points() {
        let data = ramp(16);
        let mut c = cursor(16);
        c.loop_start = 12;
        c.loop_end = 4;
        let mut out = [0.0; 64];
        let mut amp = 1.0;
        let n = c.render(&data, &mut out, Interpolation::Cubic, Phase::from_f32(1.0), &mut amp, 0.0, false);
        assert_eq!(n, 16);
        assert!(!c.has_looped);
        assert!((out[15] - 1500.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn amplitude_ramp_applied() {
        let data = vec![16384i16; 16];
        let mut c = cursor(16);
        let mut out = [0.0; 8];
        let mut amp = 0.0;
        c.render(&data, &mut out, Interpolation::Sinc7, Phase::from_f32(1.0), &mut amp, 0.125, false);
        assert_eq!(out[0], 0.0);
        assert!((amp - 1.0).abs() < 1e-6);
        assert!(out[4] > out[2]);
    }
}
