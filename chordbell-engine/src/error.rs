//! Error types for rendering and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid block configuration. Reported to the host; the block is left as it
/// was handed in.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum EngineError {
    /// The host asked for zero output channels.
    #[error("channel count must be at least 1")]
    ZeroChannels,

    /// Sample rate was zero, negative or not finite.
    #[error("invalid sample rate {0} Hz (must be finite and positive)")]
    InvalidSampleRate(f32),
}

impl EngineError {
    /// Negative status code handed across the C ABI.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::ZeroChannels => -1,
            Self::InvalidSampleRate(_) => -2,
        }
    }
}

/// Errors that can occur while loading or validating a [`SynthConfig`](crate::SynthConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field is out of range
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: &'static str, reason: String },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile { path: path.into(), source }
    }

    pub fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter { param, reason: reason.into() }
    }
}
