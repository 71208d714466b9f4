//! Errors raised while reading, writing or checking engine configuration.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validation::ValidationError;

/// Where a configuration file operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    /// Reading an existing file
    Read,
    /// Writing the file
    Write,
    /// Creating its parent directory
    CreateDir,
}

impl FileOp {
    fn verb(self) -> &'static str {
        match self {
            FileOp::Read => "read config",
            FileOp::Write => "write config",
            FileOp::CreateDir => "create config directory",
        }
    }
}

/// Errors from [`crate::SynthConfig`] operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system access failed
    #[error("cannot {} '{}': {source}", .op.verb(), .path.display())]
    Io {
        /// Operation that failed
        op: FileOp,
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Text is not a valid configuration document
    #[error("invalid config in {origin}: {source}")]
    Parse {
        /// File path, or `<string>` for in-memory text
        origin: String,
        /// TOML error with line and column
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be rendered as TOML
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// One or more fields hold values the engine rejects
    #[error("invalid engine settings: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn io(op: FileOp, path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(origin: Option<&Path>, source: toml::de::Error) -> Self {
        ConfigError::Parse {
            origin: origin.map_or_else(|| "<string>".to_string(), |p| p.display().to_string()),
            source,
        }
    }

    /// Dotted field names rejected by validation, empty for other errors.
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            ConfigError::Validation(v) => v.fields(),
            _ => Vec::new(),
        }
    }
}
