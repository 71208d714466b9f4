//! Range checks for engine configuration.
//!
//! Every problem found is collected so a user fixing a config file sees
//! all of them at once.

use thiserror::Error;

use sfvoice_synth::MAX_BUFFER_SIZE;

use crate::config::SynthConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Field value out of range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the field.
        field: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Field value not usable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted path of the field.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Dotted names of every rejected field.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationError::OutOfRange { field, .. } | ValidationError::InvalidValue { field, .. } => {
                vec![field.as_str()]
            }
            ValidationError::Multiple(all) => all.iter().flat_map(|e| e.fields()).collect(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !(min..=max).contains(&value) {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
    }

    fn invalid(&mut self, field: &str, reason: &str) {
        self.errors.push(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        });
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

/// Check a configuration against the ranges the engine accepts.
pub fn validate_config(config: &SynthConfig) -> ValidationResult<()> {
    let mut c = Checker { errors: Vec::new() };

    c.range(
        "audio.sample_rate",
        f64::from(config.audio.sample_rate),
        8000.0,
        192_000.0,
    );
    c.range(
        "audio.buffer_size",
        config.audio.buffer_size as f64,
        1.0,
        MAX_BUFFER_SIZE as f64,
    );
    if !config.audio.gain.is_finite() {
        c.invalid("audio.gain", "must be finite");
    } else {
        c.range("audio.gain", f64::from(config.audio.gain), 0.0, 10.0);
    }

    c.range(
        "voices.polyphony",
        config.voices.polyphony as f64,
        1.0,
        65535.0,
    );
    c.range(
        "voices.drum_channel",
        f64::from(config.voices.drum_channel),
        0.0,
        15.0,
    );
    if !config.voices.noise_floor.is_finite() {
        c.invalid("voices.noise_floor", "must be finite");
    } else {
        c.range(
            "voices.noise_floor",
            f64::from(config.voices.noise_floor),
            0.0,
            1.0,
        );
    }

    if !config.envelope.min_release_tc.is_finite() {
        c.invalid("envelope.min_release_tc", "must be finite");
    } else {
        c.range(
            "envelope.min_release_tc",
            f64::from(config.envelope.min_release_tc),
            -12000.0,
            8000.0,
        );
    }

    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(validate_config(&SynthConfig::default()), Ok(()));
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let mut cfg = SynthConfig::default();
        cfg.audio.buffer_size = 0;
        let err = validate_config(&cfg).unwrap_err();
        assert!(
            matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "audio.buffer_size")
        );
    }

    #[test]
    fn errors_are_collected() {
        let mut cfg = SynthConfig::default();
        cfg.voices.drum_channel = 16;
        cfg.audio.gain = f32::NAN;
        cfg.voices.polyphony = 0;
        let ValidationError::Multiple(errors) = validate_config(&cfg).unwrap_err() else {
            panic!("expected Multiple");
        };
        assert_eq!(errors.len(), 3);
        assert_eq!(
            ValidationError::Multiple(errors.clone()).fields(),
            vec!["audio.gain", "voices.polyphony", "voices.drum_channel"]
        );
        let msg = ValidationError::Multiple(errors).to_string();
        assert!(msg.contains("audio.gain"), "got: {msg}");
        assert!(msg.contains("voices.drum_channel"), "got: {msg}");
        assert_eq!(msg.matches("; ").count(), 2);
    }

    #[test]
    fn out_of_range_display() {
        let err = ValidationError::OutOfRange {
            field: "audio.sample_rate".to_string(),
            value: 100.0,
            min: 8000.0,
            max: 192000.0,
        };
        assert_eq!(
            err.to_string(),
            "'audio.sample_rate' value 100 out of range [8000, 192000]"
        );
    }
}
