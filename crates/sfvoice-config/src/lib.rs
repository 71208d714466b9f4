//! Configuration files for the sfvoice engine.
//!
//! Loads, validates and saves [`SynthConfig`], the TOML form of
//! [`sfvoice_synth::EngineSettings`].
//!
//! # Example
//!
//! ```rust
//! use sfvoice_config::SynthConfig;
//!
//! let config = SynthConfig::from_toml(r#"
//! [audio]
//! sample_rate = 48000
//! interpolation = "linear"
//! "#).unwrap();
//!
//! let settings = config.to_settings().unwrap();
//! assert_eq!(settings.sample_rate, 48000.0);
//! ```

pub mod config;
pub mod error;
pub mod paths;
pub mod validation;

pub use config::{
    AudioConfig, ClockMode, EnvelopeConfig, FilterConfig, FilterMode, InterpolationMode,
    PrecisionMode, SynthConfig, VoiceConfig,
};
pub use error::{ConfigError, FileOp};
pub use paths::{find_config, user_config_dir, user_config_path};
pub use validation::{ValidationError, ValidationResult, validate_config};
