//! sfvoice Core - DSP primitives for a SoundFont-style voice engine
//!
//! This crate provides the stateless and per-voice building blocks the
//! synthesis engine in `sfvoice-synth` is assembled from. Nothing here
//! allocates on the render path.
//!
//! # Core Abstractions
//!
//! ## Unit conversion
//!
//! SoundFont parameters live in logarithmic units. The [`conv`] module maps
//! them to linear values through process-wide immutable tables:
//!
//! - [`cents_to_hz`], [`hz_to_cents`], [`filter_cents_to_hz`], [`abs_cents_to_hz`]
//! - [`cb_to_amp`] - centibels of attenuation to linear gain
//! - [`tc_to_secs_delay`], [`tc_to_secs_attack`], [`tc_to_secs_release`]
//! - [`concave`], [`convex`], [`pan`] - controller shaping curves
//!
//! ## Sample playback
//!
//! - [`Phase`] - 32.32 fixed-point read cursor
//! - [`Interpolation`] - none / linear / cubic / 7-point sinc kernels
//! - [`InterpolationTables`] - per-fraction tap weights
//!
//! ## Filtering & modulation
//!
//! - [`Biquad`] - Direct Form I section with coefficient ramping
//! - [`ResonantFilter`] - per-voice low-pass/high-pass driven by cutoff cents and Q
//! - [`TriangleLfo`] - per-buffer triangle LFO
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc` for the lazily built
//! tables). Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sfvoice-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use sfvoice_core::{cb_to_amp, cents_to_hz, init_tables};
//!
//! init_tables();
//! assert!((cents_to_hz(6900.0) - 440.0).abs() < 0.1);
//! assert_eq!(cb_to_amp(0.0), 1.0);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Build once**: Lookup tables are immutable after first use

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod conv;
pub mod filter;
pub mod interp;
pub mod lfo;

// Re-export main types at crate root
pub use biquad::{Biquad, BiquadCoefficients, FilterSample, highpass_coefficients, lowpass_coefficients};
pub use conv::{
    CENT_ZERO_HZ, ConversionTables, MAX_ATTENUATION_CB, NO_DELAY_TIMECENTS, PEAK_ATTENUATION_CB,
    abs_cents_to_hz, cb_to_amp, cents_to_hz, concave, convex, filter_cents_to_hz, hz_to_cents,
    init_tables, key_to_cents, pan, tables, tc_to_secs_attack, tc_to_secs_delay,
    tc_to_secs_release, timecents_to_secs,
};
pub use filter::{FilterFlags, FilterPrecision, FilterType, ResonantFilter};
pub use interp::{INTERP_ROWS, Interpolation, InterpolationTables, Phase, SINC_TAPS, interpolation_tables};
pub use lfo::TriangleLfo;
