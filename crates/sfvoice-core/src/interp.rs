//! Sample interpolation kernels and their coefficient tables.
//!
//! Wavetable playback reads the sample at a fractional position. The
//! fractional part of the 32.32 fixed-point read cursor is quantized to
//! [`INTERP_ROWS`] rows, and each row holds the tap weights for one kernel.
//!
//! | Kernel | Taps | Window |
//! |--------|------|--------|
//! | [`Interpolation::None`] | 1 | nearest sample |
//! | [`Interpolation::Linear`] | 2 | `x[n]`, `x[n+1]` |
//! | [`Interpolation::Cubic`] | 4 | `x[n-1]` ..= `x[n+2]` |
//! | [`Interpolation::Sinc7`] | 7 | `x[n-3]` ..= `x[n+3]` |

extern crate alloc;

use alloc::boxed::Box;
use core::f32::consts::PI;
use libm::{cosf, sinf};
use once_cell::race::OnceBox;

/// Number of fractional rows per kernel table.
pub const INTERP_ROWS: usize = 256;

/// Number of taps of the windowed-sinc kernel.
pub const SINC_TAPS: usize = 7;

/// Interpolation method used when reading a sample at a fractional position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// No interpolation (round to the nearest sample)
    None,
    /// Linear interpolation between two samples
    Linear,
    /// Cubic interpolation (4-point, smoother)
    #[default]
    Cubic,
    /// 7th-order windowed sinc
    Sinc7,
}

/// Tap weights for every kernel, indexed by fractional row.
#[derive(Debug)]
pub struct InterpolationTables {
    linear: [[f32; 2]; INTERP_ROWS],
    cubic: [[f32; 4]; INTERP_ROWS],
    sinc7: [[f32; SINC_TAPS]; INTERP_ROWS],
}

impl InterpolationTables {
    fn build() -> Self {
        let mut linear = [[0.0; 2]; INTERP_ROWS];
        let mut cubic = [[0.0; 4]; INTERP_ROWS];
        let mut sinc7 = [[0.0; SINC_TAPS]; INTERP_ROWS];

        for row in 0..INTERP_ROWS {
            let x = row as f32 / INTERP_ROWS as f32;

            linear[row] = [1.0 - x, x];

            // Catmull-Rom spline through x[n-1], x[n], x[n+1], x[n+2]
            cubic[row] = [
                x * (-0.5 + x * (1.0 - 0.5 * x)),
                1.0 + x * x * (1.5 * x - 2.5),
                x * (0.5 + x * (2.0 - 1.5 * x)),
                0.5 * x * x * (x - 1.0),
            ];

            let half = (SINC_TAPS / 2) as f32;
            for (tap, w) in sinc7[row].iter_mut().enumerate() {
                // distance of tap from the read position
                let t = tap as f32 - half - x;
                let sinc = if t.abs() > 1e-6 { sinf(PI * t) / (PI * t) } else { 1.0 };
                let window = 0.5 * (1.0 + cosf(2.0 * PI * t / SINC_TAPS as f32));
                *w = sinc * window;
            }
        }

        Self {
            linear,
            cubic,
            sinc7,
        }
    }

    /// Linear weights for a fractional row.
    #[inline]
    pub fn linear(&self, row: usize) -> &[f32; 2] {
        &self.linear[row]
    }

    /// Cubic weights for a fractional row.
    #[inline]
    pub fn cubic(&self, row: usize) -> &[f32; 4] {
        &self.cubic[row]
    }

    /// Windowed-sinc weights for a fractional row.
    #[inline]
    pub fn sinc7(&self, row: usize) -> &[f32; SINC_TAPS] {
        &self.sinc7[row]
    }
}

static INTERP_TABLES: OnceBox<InterpolationTables> = OnceBox::new();

/// Returns the process-wide interpolation tables, building them on first call.
#[inline]
pub fn interpolation_tables() -> &'static InterpolationTables {
    INTERP_TABLES.get_or_init(|| Box::new(InterpolationTables::build()))
}

/// 32.32 fixed-point sample read position.
///
/// The upper 32 bits are the integer sample index, the lower 32 bits the
/// fraction. Keeps sub-sample accuracy over arbitrarily long loops where an
/// `f32` accumulator would drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Phase(u64);

impl Phase {
    const FRACT_BITS: u32 = 32;
    const FRACT_MASK: u64 = 0xFFFF_FFFF;

    /// Phase positioned exactly on sample `index`.
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Self((index as u64) << Self::FRACT_BITS)
    }

    /// Phase increment for a playback rate (1.0 = native pitch).
    #[inline]
    pub fn from_f32(value: f32) -> Self {
        let v = f64::from(value.max(0.0)) * (1u64 << Self::FRACT_BITS) as f64;
        Self(v as u64)
    }

    /// Integer sample index.
    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 >> Self::FRACT_BITS) as u32
    }

    /// Index of the nearest sample.
    #[inline]
    pub const fn index_rounded(self) -> u32 {
        ((self.0 + 0x8000_0000) >> Self::FRACT_BITS) as u32
    }

    /// Fractional part as a kernel table row.
    #[inline]
    pub const fn table_row(self) -> usize {
        ((self.0 & Self::FRACT_MASK) >> 24) as usize
    }

    /// Fractional part in `0.0..1.0`.
    #[inline]
    pub fn fract(self) -> f32 {
        (self.0 & Self::FRACT_MASK) as f32 / (1u64 << Self::FRACT_BITS) as f32
    }

    /// Advances by `incr`.
    #[inline]
    pub fn advance(&mut self, incr: Phase) {
        self.0 = self.0.wrapping_add(incr.0);
    }

    /// Moves back by `samples` whole samples (loop wrap-around).
    #[inline]
    pub fn rewind(&mut self, samples: u32) {
        self.0 = self.0.saturating_sub(u64::from(samples) << Self::FRACT_BITS);
    }

    /// Moves the integer index to `index`, keeping the fraction.
    #[inline]
    pub fn set_index(&mut self, index: u32) {
        self.0 = (u64::from(index) << Self::FRACT_BITS) | (self.0 & Self::FRACT_MASK);
    }

    /// Raw fixed-point value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}
